use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::money::Money;
use super::core::{CouponId, Errors, EventId, OrderId, SeatId, TicketId};
use super::events::{Event, TicketType};
use super::seats::Seat;

pub const TICKET_ID_LENGTH: usize = 12;

pub const DEFAULT_MAX_TICKETS_PER_ORDER: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Paid through the payment provider; requires a transaction reference.
    Online,
    /// Zero-amount booking; no provider involved.
    Free,
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMode::Online => write!(f, "ONLINE"),
            PaymentMode::Free => write!(f, "FREE"),
        }
    }
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONLINE" => Ok(PaymentMode::Online),
            "FREE" => Ok(PaymentMode::Free),
            _ => Err(format!("Unknown payment mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    #[serde(rename = "ticketTypeId")]
    pub ticket_type_id: String,
    pub quantity: u32,
}

/// What the shopper wants to buy: seat ids for reserved seating, or
/// quantities per ticket type for general admission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(rename = "seatIds", default)]
    pub seat_ids: Vec<SeatId>,
    #[serde(default)]
    pub admissions: Vec<Admission>,
}

impl Selection {
    pub fn seats(seat_ids: Vec<SeatId>) -> Self {
        Selection { seat_ids, admissions: Vec::new() }
    }

    pub fn admissions(admissions: Vec<Admission>) -> Self {
        Selection { seat_ids: Vec::new(), admissions }
    }

    pub fn admission_pairs(&self) -> Vec<(String, u32)> {
        self.admissions.iter().map(|a| (a.ticket_type_id.clone(), a.quantity)).collect()
    }

    /// Subtotal and unit count against the event's stored prices. Unknown
    /// seats price at zero here; the commit reports them as conflicts.
    /// More than `max_units` tickets rejects the selection.
    pub fn price(&self, event: &Event, max_units: u32) -> Result<(Money, u32), Errors> {
        if event.is_general_admission() {
            if !self.seat_ids.is_empty() {
                return Err(Errors::SeatingTypeMismatch);
            }
            let units = self
                .admissions
                .iter()
                .try_fold(0u32, |total, a| total.checked_add(a.quantity))
                .filter(|units| *units <= max_units)
                .ok_or(Errors::TooManyTickets(max_units))?;
            if units == 0 {
                return Err(Errors::EmptyOrder);
            }
            let mut subtotal = Money::ZERO;
            for admission in &self.admissions {
                let ticket_type = event.ticket_type(&admission.ticket_type_id)
                    .ok_or_else(|| Errors::UnknownTicketType(admission.ticket_type_id.clone()))?;
                subtotal = subtotal + ticket_type.price.times(admission.quantity);
            }
            Ok((subtotal, units))
        } else {
            if !self.admissions.is_empty() {
                return Err(Errors::SeatingTypeMismatch);
            }
            let mut unique = self.seat_ids.clone();
            unique.sort();
            unique.dedup();
            if unique.is_empty() {
                return Err(Errors::EmptyOrder);
            }
            let units = u32::try_from(unique.len())
                .ok()
                .filter(|units| *units <= max_units)
                .ok_or(Errors::TooManyTickets(max_units))?;
            let subtotal: Money = unique.iter().filter_map(|id| event.seat(id)).map(|s| s.price).sum();
            Ok((subtotal, units))
        }
    }
}

/// One admission. The id doubles as the QR payload. Everything else is a
/// snapshot taken at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    #[serde(rename = "seatId")]
    pub seat_id: Option<SeatId>,
    #[serde(rename = "seatLabel")]
    pub seat_label: Option<String>,
    #[serde(rename = "ticketTypeId")]
    pub ticket_type_id: Option<String>,
    #[serde(rename = "ticketTypeName")]
    pub ticket_type_name: Option<String>,
    pub color: Option<String>,
    pub price: Money,
    #[serde(rename = "checkedIn", default)]
    pub checked_in: bool,
    #[serde(rename = "checkInDate", default)]
    pub check_in_date: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn for_seat(id: TicketId, seat: &Seat, event: &Event) -> Self {
        let ticket_type = seat.ticket_type_id.as_deref().and_then(|tt| event.ticket_type(tt));
        Ticket {
            id,
            seat_id: Some(seat.id.clone()),
            seat_label: Some(if seat.label.is_empty() { seat.id.clone() } else { seat.label.clone() }),
            ticket_type_id: seat.ticket_type_id.clone(),
            ticket_type_name: ticket_type.map(|t| t.name.clone()).or_else(|| seat.tier.clone()),
            color: seat.color.clone().or_else(|| ticket_type.and_then(|t| t.color.clone())),
            price: seat.price,
            checked_in: false,
            check_in_date: None,
        }
    }

    pub fn for_admission(id: TicketId, ticket_type: &TicketType) -> Self {
        Ticket {
            id,
            seat_id: None,
            seat_label: None,
            ticket_type_id: Some(ticket_type.id.clone()),
            ticket_type_name: Some(ticket_type.name.clone()),
            color: ticket_type.color.clone(),
            price: ticket_type.price,
            checked_in: false,
            check_in_date: None,
        }
    }

    /// Flips the check-in flag; the date follows the flag.
    pub fn toggle_check_in(&mut self, now: DateTime<Utc>) {
        self.checked_in = !self.checked_in;
        self.check_in_date = if self.checked_in { Some(now) } else { None };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    #[serde(rename = "serviceFee")]
    pub service_fee: Money,
    #[serde(rename = "totalAmount")]
    pub total_amount: Money,
}

impl Totals {
    /// `max(0, subtotal - discount) + fee`.
    pub fn compute(subtotal: Money, discount: Money, service_fee: Money) -> Self {
        Totals {
            subtotal,
            discount,
            service_fee,
            total_amount: subtotal.saturating_sub(discount) + service_fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    #[serde(rename = "eventName")]
    pub event_name: String,
    pub customer: Customer,
    pub tickets: Vec<Ticket>,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(rename = "couponId")]
    pub coupon_id: Option<CouponId>,
    #[serde(rename = "couponCode")]
    pub coupon_code: Option<String>,
    #[serde(rename = "paymentMode")]
    pub payment_mode: PaymentMode,
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn ticket(&self, ticket_id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == ticket_id)
    }

    pub fn ticket_mut(&mut self, ticket_id: &str) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|t| t.id == ticket_id)
    }
}

/// Random uppercase alphanumeric id. Uniqueness is checked by the caller
/// against the order store.
pub fn generate_ticket_id<R: Rng>(rng: &mut R) -> TicketId {
    rng.sample_iter(&Alphanumeric)
        .take(TICKET_ID_LENGTH)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}
