use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use crate::money::Money;
use super::core::{CouponId, EventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Fixed,
    /// `value` is read as a percentage, so `10.00` means ten percent.
    Percentage,
}

/// When a coupon applies. Only `Code` coupons require the shopper to type
/// the code; the others are discovered automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ruleType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRule {
    Code,
    Threshold {
        #[serde(rename = "minAmount")]
        min_amount: Money,
    },
    SeatCount {
        #[serde(rename = "minSeats")]
        min_seats: u32,
    },
}

impl CouponRule {
    pub fn is_automatic(&self) -> bool {
        !matches!(self, CouponRule::Code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(rename = "discountType")]
    pub discount_type: DiscountType,
    pub value: Money,
    #[serde(flatten)]
    pub rule: CouponRule,
    #[serde(rename = "maxUses")]
    pub max_uses: u32,
    #[serde(rename = "usedCount", default)]
    pub used_count: u32,
    #[serde(rename = "expiryDate")]
    pub expiry_date: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(rename = "eventId", default)]
    pub event_id: Option<EventId>,
    #[serde(rename = "organizerId", default)]
    pub organizer_id: Option<UserId>,
}

fn default_active() -> bool {
    true
}

impl Coupon {
    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.used_count)
    }

    /// Whether the coupon may be offered for an event of this organizer.
    pub fn is_scoped_to(&self, event_id: &str, organizer_id: &str) -> bool {
        match (&self.event_id, &self.organizer_id) {
            (Some(eid), _) => eid == event_id,
            (None, Some(oid)) => oid == organizer_id,
            (None, None) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountContext<'a> {
    pub subtotal: Money,
    pub seats_count: u32,
    pub requested_code: Option<&'a str>,
    pub event_id: &'a str,
    pub organizer_id: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discount {
    pub amount: Money,
    pub usage_increment: u32,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,

    #[error("Coupon has been deleted")]
    Deleted,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit reached")]
    Exhausted,

    #[error("Coupon is not valid for this event")]
    WrongEvent,

    #[error("Coupon code does not match")]
    CodeMismatch,

    #[error("Order total is below the coupon minimum")]
    BelowThreshold,

    #[error("Not enough seats for this coupon")]
    TooFewSeats,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Fixed => write!(f, "FIXED"),
            DiscountType::Percentage => write!(f, "PERCENTAGE"),
        }
    }
}

fn check_usable(coupon: &Coupon, ctx: &DiscountContext<'_>, now: DateTime<Utc>) -> Result<(), CouponRejection> {
    if coupon.deleted {
        return Err(CouponRejection::Deleted);
    }
    if !coupon.active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.expiry_date < now {
        return Err(CouponRejection::Expired);
    }
    if coupon.used_count >= coupon.max_uses {
        return Err(CouponRejection::Exhausted);
    }
    if !coupon.is_scoped_to(ctx.event_id, ctx.organizer_id) {
        return Err(CouponRejection::WrongEvent);
    }
    Ok(())
}

fn check_rule(coupon: &Coupon, ctx: &DiscountContext<'_>) -> Result<(), CouponRejection> {
    match &coupon.rule {
        CouponRule::Threshold { min_amount } if ctx.subtotal < *min_amount => {
            Err(CouponRejection::BelowThreshold)
        }
        CouponRule::SeatCount { min_seats } if ctx.seats_count < *min_seats => {
            Err(CouponRejection::TooFewSeats)
        }
        CouponRule::Code if ctx.requested_code != Some(coupon.code.as_str()) => {
            Err(CouponRejection::CodeMismatch)
        }
        _ => Ok(()),
    }
}

/// Evaluates one coupon against a candidate order. Pure: the caller supplies
/// the coupon snapshot and the clock.
pub fn compute_discount(coupon: &Coupon, ctx: &DiscountContext<'_>, now: DateTime<Utc>) -> Result<Discount, CouponRejection> {
    check_usable(coupon, ctx, now)?;
    check_rule(coupon, ctx)?;

    let raw = match coupon.discount_type {
        DiscountType::Percentage => ctx.subtotal.percent(coupon.value),
        DiscountType::Fixed => coupon.value.min(ctx.subtotal),
    };

    Ok(Discount {
        amount: raw.clamp(Money::ZERO, ctx.subtotal.max(Money::ZERO)),
        usage_increment: coupon.remaining_uses().min(1),
    })
}

/// Picks the automatically applicable coupon with the largest discount.
/// Code-only coupons never match here. Equal discounts go to the lowest id.
pub fn best_coupon<'c>(candidates: &'c [Coupon], ctx: &DiscountContext<'_>, now: DateTime<Utc>) -> Option<(&'c Coupon, Discount)> {
    let auto_ctx = DiscountContext { requested_code: None, ..ctx.clone() };

    candidates
        .iter()
        .filter(|coupon| coupon.rule.is_automatic())
        .filter_map(|coupon| {
            compute_discount(coupon, &auto_ctx, now)
                .ok()
                .filter(|d| !d.amount.is_zero())
                .map(|d| (coupon, d))
        })
        .fold(None, |best: Option<(&Coupon, Discount)>, (coupon, discount)| match best {
            Some((current, current_discount))
                if current_discount.amount > discount.amount
                    || (current_discount.amount == discount.amount && current.id <= coupon.id) =>
            {
                Some((current, current_discount))
            }
            _ => Some((coupon, discount)),
        })
}
