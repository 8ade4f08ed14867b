use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;
use thiserror::Error;
use crate::domain::orders::DEFAULT_MAX_TICKETS_PER_ORDER;
use crate::domain::{best_coupon, compute_discount, Coupon, CouponRejection, Discount, DiscountContext, Errors, Event, EventId, Selection};
use crate::money::Money;
use crate::persistence::{CouponStore, EventStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountError {
    #[error("Unknown coupon code: {0}")]
    UnknownCode(String),

    #[error(transparent)]
    Rejected(#[from] CouponRejection),

    #[error(transparent)]
    Domain(#[from] Errors),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DiscountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => DiscountError::Domain(Errors::UnknownEvent(id)),
            other => DiscountError::Store(other),
        }
    }
}

/// A coupon chosen for an order and what it is worth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub discount: Discount,
}

/// Looks coupons up in the store and runs the pure discount rules on them.
#[derive(Clone)]
pub struct DiscountService {
    coupons: Arc<dyn CouponStore>,
    events: Arc<dyn EventStore>,
    max_tickets: u32,
}

impl DiscountService {
    pub fn new(coupons: Arc<dyn CouponStore>, events: Arc<dyn EventStore>) -> Self {
        DiscountService { coupons, events, max_tickets: DEFAULT_MAX_TICKETS_PER_ORDER }
    }

    pub fn with_max_tickets(mut self, max_tickets: u32) -> Self {
        self.max_tickets = max_tickets;
        self
    }

    /// With a coupon id, evaluates exactly that coupon as if its code had
    /// been typed. Without one, picks the best automatic coupon. A coupon
    /// that does not apply yields no discount rather than an error.
    pub fn resolve(
        &self,
        event: &Event,
        subtotal: Money,
        seats_count: u32,
        coupon_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<AppliedCoupon>, StoreError> {
        let mut ctx = DiscountContext {
            subtotal,
            seats_count,
            requested_code: None,
            event_id: &event.id,
            organizer_id: &event.organizer_id,
        };

        match coupon_id {
            Some(id) => {
                let Some(coupon) = self.coupons.find(id)? else {
                    warn!("Order for event {} names unknown coupon {}", event.id, id);
                    return Ok(None);
                };
                ctx.requested_code = Some(coupon.code.as_str());
                match compute_discount(&coupon, &ctx, now) {
                    Ok(discount) => Ok(Some(AppliedCoupon { coupon: coupon.clone(), discount })),
                    Err(rejection) => {
                        warn!("Coupon {} not applied to event {}: {}", coupon.id, event.id, rejection);
                        Ok(None)
                    }
                }
            }
            None => {
                let candidates = self.coupons.candidates_for(&event.id, &event.organizer_id)?;
                let best = best_coupon(&candidates, &ctx, now)
                    .map(|(coupon, discount)| AppliedCoupon { coupon: coupon.clone(), discount });
                if let Some(applied) = &best {
                    debug!("Auto-applied coupon {} worth {} on event {}", applied.coupon.id, applied.discount.amount, event.id);
                }
                Ok(best)
            }
        }
    }

    /// Explicit code entry at checkout, before any order exists.
    pub fn validate(&self, code: &str, event_id: &EventId, selection: &Selection, now: DateTime<Utc>) -> Result<AppliedCoupon, DiscountError> {
        let event = self.events.load(event_id)?.value;
        event.ensure_live()?;
        let (subtotal, seats_count) = selection.price(&event, self.max_tickets)?;

        let coupon = self
            .coupons
            .find_by_code(code)?
            .into_iter()
            .find(|c| c.is_scoped_to(&event.id, &event.organizer_id))
            .ok_or_else(|| DiscountError::UnknownCode(code.to_string()))?;

        let ctx = DiscountContext {
            subtotal,
            seats_count,
            requested_code: Some(coupon.code.as_str()),
            event_id: &event.id,
            organizer_id: &event.organizer_id,
        };
        let discount = compute_discount(&coupon, &ctx, now)?;
        Ok(AppliedCoupon { coupon, discount })
    }

    /// Takes one use before the order is paid for. Returns false when the
    /// coupon ran out in the meantime.
    pub fn redeem(&self, applied: &AppliedCoupon) -> Result<bool, StoreError> {
        if applied.discount.usage_increment == 0 {
            return Ok(false);
        }
        Ok(self.coupons.redeem(&applied.coupon.id)? > 0)
    }

    /// Returns a use taken by [`redeem`](Self::redeem) for an order that
    /// was not placed.
    pub fn give_back(&self, applied: &AppliedCoupon) -> Result<(), StoreError> {
        self.coupons.give_back(&applied.coupon.id)
    }
}
