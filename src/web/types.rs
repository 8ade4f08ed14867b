use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{conflict_ids, Admission, Coupon, Customer, EventId, Order, PaymentMode, Seat, SeatConflict, SeatId, SeatStatus, Selection, Ticket};
use crate::money::Money;
use crate::services::{AppliedCoupon, OrderRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Organizer,
    Customer,
}

impl Role {
    pub fn can_override_seats(&self) -> bool {
        matches!(self, Role::Admin | Role::Organizer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HoldRequest {
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    #[serde(rename = "seatId")]
    pub seat_id: SeatId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatIdsRequest {
    #[serde(rename = "seatIds", default)]
    pub seat_ids: Vec<SeatId>,
}

/// Beacon-style release: `?seatIds=A1,A2`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeatIdsQuery {
    #[serde(rename = "seatIds")]
    pub seat_ids: Option<String>,
}

impl SeatIdsQuery {
    pub fn seat_ids(&self) -> Vec<SeatId> {
        self.seat_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LockResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<SeatId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<SeatConflict>,
    #[serde(rename = "holdUntil", default, skip_serializing_if = "Option::is_none")]
    pub hold_until: Option<DateTime<Utc>>,
}

impl LockResponse {
    pub fn locked(hold_until: Option<DateTime<Utc>>) -> Self {
        LockResponse { success: true, conflicts: Vec::new(), reasons: Vec::new(), hold_until }
    }

    pub fn rejected(reasons: Vec<SeatConflict>) -> Self {
        LockResponse { success: false, conflicts: conflict_ids(&reasons), reasons, hold_until: None }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOverrideRequest {
    #[serde(rename = "seatIds")]
    pub seat_ids: Vec<SeatId>,
    pub status: SeatStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOverrideResponse {
    pub success: bool,
    /// Distinct seats whose status was set.
    #[serde(default)]
    pub updated: usize,
    /// Sold or unknown seats that were left as they were.
    #[serde(default)]
    pub skipped: Vec<SeatConflict>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatMap {
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: Customer,
    #[serde(alias = "eventId")]
    pub event: EventId,
    #[serde(alias = "seatIds", default)]
    pub seats: Vec<SeatId>,
    #[serde(default)]
    pub admissions: Vec<Admission>,
    #[serde(rename = "serviceFee", default)]
    pub service_fee: Money,
    #[serde(rename = "couponId", default)]
    pub coupon_id: Option<String>,
    #[serde(rename = "paymentMode")]
    pub payment_mode: PaymentMode,
    #[serde(rename = "transactionId", default)]
    pub transaction_id: Option<String>,
}

impl CreateOrderRequest {
    pub fn into_order_request(self) -> OrderRequest {
        OrderRequest {
            customer: self.customer,
            event_id: self.event,
            selection: Selection { seat_ids: self.seats, admissions: self.admissions },
            service_fee: self.service_fee,
            coupon_id: self.coupon_id.filter(|id| !id.is_empty()),
            payment_mode: self.payment_mode,
            transaction_id: self.transaction_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CouponValidateRequest {
    pub code: String,
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    #[serde(alias = "seatIds", default)]
    pub seats: Vec<SeatId>,
    #[serde(default)]
    pub admissions: Vec<Admission>,
}

impl CouponValidateRequest {
    pub fn selection(&self) -> Selection {
        Selection { seat_ids: self.seats.clone(), admissions: self.admissions.clone() }
    }
}

/// The coupon record with the discount it would give this selection.
#[derive(Debug, Serialize)]
pub struct CouponValidateResponse {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub discount: Money,
}

impl From<AppliedCoupon> for CouponValidateResponse {
    fn from(applied: AppliedCoupon) -> Self {
        CouponValidateResponse { coupon: applied.coupon, discount: applied.discount.amount }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "customerName")]
    pub customer_name: String,
}

impl TicketDetail {
    pub fn new(order: &Order, ticket: Ticket) -> Self {
        TicketDetail {
            ticket,
            order_id: order.id.clone(),
            event_id: order.event_id.clone(),
            event_name: order.event_name.clone(),
            customer_name: order.customer.name.clone(),
        }
    }
}
