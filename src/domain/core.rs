use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use crate::money::Money;

pub type EventId = String;
pub type SeatId = String;
pub type CouponId = String;
pub type OrderId = String;
pub type TicketId = String;
pub type UserId = String;

/// Why a seat could not be locked or sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictReason {
    NotFound,
    Sold,
    Held,
    Unavailable,
    BookingInProgress,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::NotFound => write!(f, "NOT_FOUND"),
            ConflictReason::Sold => write!(f, "SOLD"),
            ConflictReason::Held => write!(f, "HELD"),
            ConflictReason::Unavailable => write!(f, "UNAVAILABLE"),
            ConflictReason::BookingInProgress => write!(f, "BOOKING_IN_PROGRESS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatConflict {
    #[serde(rename = "seatId")]
    pub seat_id: SeatId,
    pub reason: ConflictReason,
}

impl SeatConflict {
    pub fn new(seat_id: impl Into<SeatId>, reason: ConflictReason) -> Self {
        SeatConflict { seat_id: seat_id.into(), reason }
    }
}

pub fn conflict_ids(conflicts: &[SeatConflict]) -> Vec<SeatId> {
    conflicts.iter().map(|c| c.seat_id.clone()).collect()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Errors {
    #[error("Unknown event: {0}")]
    UnknownEvent(EventId),

    #[error("Event has been deleted: {0}")]
    EventDeleted(EventId),

    #[error("Some seats are not available: {0:?}")]
    SeatsUnavailable(Vec<SeatConflict>),

    #[error("Unknown ticket type: {0}")]
    UnknownTicketType(String),

    #[error("Ticket type {0} is sold out")]
    TicketTypeSoldOut(String),

    #[error("Seat status cannot be set to {0}")]
    InvalidStatusOverride(String),

    #[error("Order contains no seats or tickets")]
    EmptyOrder,

    #[error("Seat selection does not match the event's seating type")]
    SeatingTypeMismatch,

    #[error("Service fee cannot be negative: {0}")]
    NegativeServiceFee(Money),

    #[error("At most {0} tickets can be bought in one order")]
    TooManyTickets(u32),
}
