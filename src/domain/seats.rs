use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use crate::money::Money;
use super::core::{ConflictReason, SeatConflict, SeatId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    BookingInProgress,
    Held,
    Sold,
    /// Not sellable at all (no ticket type mapped), as opposed to sold.
    Unavailable,
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatStatus::Available => write!(f, "AVAILABLE"),
            SeatStatus::BookingInProgress => write!(f, "BOOKING_IN_PROGRESS"),
            SeatStatus::Held => write!(f, "HELD"),
            SeatStatus::Sold => write!(f, "SOLD"),
            SeatStatus::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SeatStatus::Available),
            "BOOKING_IN_PROGRESS" => Ok(SeatStatus::BookingInProgress),
            "HELD" => Ok(SeatStatus::Held),
            "SOLD" => Ok(SeatStatus::Sold),
            "UNAVAILABLE" => Ok(SeatStatus::Unavailable),
            _ => Err(format!("Unknown seat status: {}", s)),
        }
    }
}

/// A seat embedded in its event. Price, tier and color are copied from the
/// ticket-type catalog when the layout is assigned and never re-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
    pub status: SeatStatus,
    #[serde(rename = "holdUntil", default)]
    pub hold_until: Option<DateTime<Utc>>,
    pub price: Money,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "ticketTypeId", default)]
    pub ticket_type_id: Option<String>,
}

impl Seat {
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SeatStatus::BookingInProgress
            && self.hold_until.map_or(true, |until| until < now)
    }

    fn hold(&mut self, until: DateTime<Utc>) {
        self.status = SeatStatus::BookingInProgress;
        self.hold_until = Some(until);
    }

    /// The only downgrade shared by explicit release and the sweep. No-op
    /// unless the seat is currently on hold.
    fn revert_hold(&mut self) -> bool {
        if self.status != SeatStatus::BookingInProgress {
            return false;
        }
        self.status = SeatStatus::Available;
        self.hold_until = None;
        true
    }

    fn sell(&mut self) {
        self.status = SeatStatus::Sold;
        self.hold_until = None;
    }
}

fn find<'a>(seats: &'a [Seat], seat_id: &str) -> Option<&'a Seat> {
    seats.iter().find(|s| s.id == seat_id)
}

fn dedup(seat_ids: &[SeatId]) -> Vec<&SeatId> {
    let mut seen = HashSet::new();
    seat_ids.iter().filter(|id| seen.insert(id.as_str())).collect()
}

fn unavailable_reason(status: SeatStatus) -> ConflictReason {
    match status {
        SeatStatus::Available => ConflictReason::NotFound,
        SeatStatus::BookingInProgress => ConflictReason::BookingInProgress,
        SeatStatus::Held => ConflictReason::Held,
        SeatStatus::Sold => ConflictReason::Sold,
        SeatStatus::Unavailable => ConflictReason::Unavailable,
    }
}

/// Non-binding availability check for a single seat.
pub fn probe(seats: &[Seat], seat_id: &str) -> bool {
    find(seats, seat_id).is_some_and(Seat::is_available)
}

/// Places a hold on every requested seat, or on none of them.
///
/// The first pass only reads; if any seat is missing or not `AVAILABLE` the
/// seats are left untouched and the conflicts are returned.
pub fn lock(seats: &mut [Seat], seat_ids: &[SeatId], hold_until: DateTime<Utc>) -> Result<(), Vec<SeatConflict>> {
    let requested = dedup(seat_ids);
    let snapshot: &[Seat] = seats;

    let conflicts: Vec<SeatConflict> = requested
        .iter()
        .filter_map(|id| match find(snapshot, id) {
            None => Some(SeatConflict::new(id.as_str(), ConflictReason::NotFound)),
            Some(seat) if !seat.is_available() => {
                Some(SeatConflict::new(id.as_str(), unavailable_reason(seat.status)))
            }
            Some(_) => None,
        })
        .collect();

    if !conflicts.is_empty() {
        return Err(conflicts);
    }

    for seat in seats.iter_mut().filter(|s| requested.contains(&&s.id)) {
        seat.hold(hold_until);
    }
    Ok(())
}

/// Returns every requested seat that is on hold to `AVAILABLE`. Seats in any
/// other state, and unknown ids, are ignored. Returns how many seats changed.
pub fn release(seats: &mut [Seat], seat_ids: &[SeatId]) -> usize {
    let mut released = 0;
    for seat in seats.iter_mut().filter(|s| seat_ids.contains(&s.id)) {
        if seat.revert_hold() {
            released += 1;
        }
    }
    released
}

/// Returns every seat whose hold ended before `now` to `AVAILABLE`.
pub fn reap_expired(seats: &mut [Seat], now: DateTime<Utc>) -> usize {
    let mut reaped = 0;
    for seat in seats.iter_mut().filter(|s| s.is_hold_expired(now)) {
        if seat.revert_hold() {
            reaped += 1;
        }
    }
    reaped
}

pub fn has_expired_holds(seats: &[Seat], now: DateTime<Utc>) -> bool {
    seats.iter().any(|s| s.is_hold_expired(now))
}

/// Commit-time check: a seat can be sold if it is `AVAILABLE` or on hold.
/// Hold ownership is not tracked, so an expired hold is claimable by anyone.
pub fn check_claimable(seats: &[Seat], seat_ids: &[SeatId]) -> Result<(), Vec<SeatConflict>> {
    let conflicts: Vec<SeatConflict> = dedup(seat_ids)
        .into_iter()
        .filter_map(|id| {
            let reason = match find(seats, id) {
                None => Some(ConflictReason::NotFound),
                Some(seat) => match seat.status {
                    SeatStatus::Available | SeatStatus::BookingInProgress => None,
                    other => Some(unavailable_reason(other)),
                },
            };
            reason.map(|r| SeatConflict::new(id.as_str(), r))
        })
        .collect();

    if conflicts.is_empty() { Ok(()) } else { Err(conflicts) }
}

/// Validates and sells in one step. Nothing is modified on conflict.
pub fn mark_sold(seats: &mut [Seat], seat_ids: &[SeatId]) -> Result<Vec<Seat>, Vec<SeatConflict>> {
    check_claimable(seats, seat_ids)?;

    let requested = dedup(seat_ids);
    let mut sold = Vec::with_capacity(requested.len());
    for id in requested {
        if let Some(seat) = seats.iter_mut().find(|s| &s.id == id) {
            seat.sell();
            sold.push(seat.clone());
        }
    }
    Ok(sold)
}

/// Result of an administrative status change. Each seat id counts once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusOverride {
    pub updated: usize,
    /// Sold or unknown seats that were left as they were.
    pub skipped: Vec<SeatConflict>,
}

/// Administrative status change. Bypasses holds entirely, but never touches
/// a sold seat; those ids (and unknown ones) are returned as skipped.
pub fn override_status(seats: &mut [Seat], seat_ids: &[SeatId], status: SeatStatus) -> StatusOverride {
    let mut outcome = StatusOverride::default();
    for id in dedup(seat_ids) {
        match seats.iter_mut().find(|s| &s.id == id) {
            None => outcome.skipped.push(SeatConflict::new(id.as_str(), ConflictReason::NotFound)),
            Some(seat) if seat.status == SeatStatus::Sold => {
                outcome.skipped.push(SeatConflict::new(id.as_str(), ConflictReason::Sold))
            }
            Some(seat) => {
                seat.status = status;
                seat.hold_until = None;
                outcome.updated += 1;
            }
        }
    }
    outcome
}
