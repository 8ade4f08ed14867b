use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::money::Money;
use super::core::{Errors, EventId, SeatConflict, SeatId, UserId};
use super::seats::{self, Seat, SeatStatus, StatusOverride};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatingType {
    Reserved,
    GeneralAdmission,
}

impl fmt::Display for SeatingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatingType::Reserved => write!(f, "RESERVED"),
            SeatingType::GeneralAdmission => write!(f, "GENERAL_ADMISSION"),
        }
    }
}

impl FromStr for SeatingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(SeatingType::Reserved),
            "GENERAL_ADMISSION" => Ok(SeatingType::GeneralAdmission),
            _ => Err(format!("Unknown seating type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub color: Option<String>,
    /// `None` means the event does not cap this ticket type.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub sold: u32,
}

impl TicketType {
    pub fn remaining(&self) -> Option<u32> {
        self.capacity.map(|cap| cap.saturating_sub(self.sold))
    }
}

/// The aggregate root. Seats are embedded so that locking or selling any
/// subset of them is a single-document read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    #[serde(rename = "organizerId")]
    pub organizer_id: UserId,
    #[serde(rename = "organizerEmail", default)]
    pub organizer_email: Option<String>,
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    #[serde(rename = "seatingType")]
    pub seating_type: SeatingType,
    #[serde(default)]
    pub seats: Vec<Seat>,
    #[serde(rename = "ticketTypes", default)]
    pub ticket_types: Vec<TicketType>,
    #[serde(default)]
    pub deleted: bool,
}

impl Event {
    pub fn is_general_admission(&self) -> bool {
        self.seating_type == SeatingType::GeneralAdmission
    }

    pub fn ticket_type(&self, id: &str) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.id == id)
    }

    pub fn seat(&self, id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn ensure_live(&self) -> Result<(), Errors> {
        if self.deleted {
            return Err(Errors::EventDeleted(self.id.clone()));
        }
        Ok(())
    }

    pub fn probe_seat(&self, seat_id: &str) -> bool {
        self.is_general_admission() || seats::probe(&self.seats, seat_id)
    }

    pub fn lock_seats(&mut self, seat_ids: &[SeatId], hold_until: DateTime<Utc>) -> Result<(), Vec<SeatConflict>> {
        if self.is_general_admission() {
            return Ok(());
        }
        seats::lock(&mut self.seats, seat_ids, hold_until)
    }

    pub fn release_seats(&mut self, seat_ids: &[SeatId]) -> usize {
        seats::release(&mut self.seats, seat_ids)
    }

    pub fn reap_expired_holds(&mut self, now: DateTime<Utc>) -> usize {
        seats::reap_expired(&mut self.seats, now)
    }

    pub fn has_expired_holds(&self, now: DateTime<Utc>) -> bool {
        seats::has_expired_holds(&self.seats, now)
    }

    pub fn sell_seats(&mut self, seat_ids: &[SeatId]) -> Result<Vec<Seat>, Errors> {
        if seat_ids.is_empty() {
            return Err(Errors::EmptyOrder);
        }
        seats::mark_sold(&mut self.seats, seat_ids).map_err(Errors::SeatsUnavailable)
    }

    /// Bumps the sold counter of each ticket type. All-or-nothing: a type
    /// without enough remaining capacity rejects the whole selection.
    pub fn sell_general_admission(&mut self, selections: &[(String, u32)]) -> Result<Vec<TicketType>, Errors> {
        if selections.iter().all(|(_, qty)| *qty == 0) {
            return Err(Errors::EmptyOrder);
        }

        for (type_id, qty) in selections {
            let requested: u32 = selections
                .iter()
                .filter(|(id, _)| id == type_id)
                .fold(0u32, |total, (_, q)| total.saturating_add(*q));
            let ticket_type = self.ticket_type(type_id)
                .ok_or_else(|| Errors::UnknownTicketType(type_id.clone()))?;
            if *qty > 0 && ticket_type.remaining().is_some_and(|left| left < requested) {
                return Err(Errors::TicketTypeSoldOut(type_id.clone()));
            }
        }

        let mut touched = Vec::new();
        for (type_id, qty) in selections.iter().filter(|(_, qty)| *qty > 0) {
            if let Some(ticket_type) = self.ticket_types.iter_mut().find(|t| &t.id == type_id) {
                ticket_type.sold = ticket_type.sold.saturating_add(*qty);
                touched.push(ticket_type.clone());
            }
        }
        Ok(touched)
    }

    pub fn override_seat_status(&mut self, seat_ids: &[SeatId], status: SeatStatus) -> Result<StatusOverride, Errors> {
        match status {
            SeatStatus::Available | SeatStatus::Held | SeatStatus::Unavailable => {
                Ok(seats::override_status(&mut self.seats, seat_ids, status))
            }
            other => Err(Errors::InvalidStatusOverride(other.to_string())),
        }
    }
}
