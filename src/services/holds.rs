use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;
use crate::domain::{ConflictReason, Errors, EventId, SeatConflict, SeatId, SeatStatus, StatusOverride};
use crate::persistence::{modify, EventStore, ModifyError, StoreError};

pub const DEFAULT_HOLD_SECONDS: i64 = 300;

/// Downgrades are safe to re-run on a fresh snapshot; this bounds how often.
const DOWNGRADE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Locked { hold_until: Option<DateTime<Utc>> },
    Conflicts(Vec<SeatConflict>),
}

impl LockOutcome {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockOutcome::Locked { .. })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HoldError {
    #[error(transparent)]
    Domain(#[from] Errors),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for HoldError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => HoldError::Domain(Errors::UnknownEvent(id)),
            other => HoldError::Store(other),
        }
    }
}

/// Places, releases and reaps seat holds. Apart from the final sale this is
/// the only writer of seat status and hold expiry.
#[derive(Clone)]
pub struct HoldManager {
    events: Arc<dyn EventStore>,
    hold_duration: Duration,
}

impl HoldManager {
    pub fn new(events: Arc<dyn EventStore>, hold_duration: Duration) -> Self {
        HoldManager { events, hold_duration }
    }

    pub fn hold_duration(&self) -> Duration {
        self.hold_duration
    }

    /// Advisory availability probe. Never mutates; a `true` may be stale by
    /// the time the shopper checks out.
    pub fn hold_seat(&self, event_id: &EventId, seat_id: &str) -> Result<bool, HoldError> {
        let event = self.events.load(event_id)?.value;
        event.ensure_live()?;
        let available = event.probe_seat(seat_id);
        debug!("Probe {}/{} -> {}", event_id, seat_id, available);
        Ok(available)
    }

    /// Holds all requested seats or none. A concurrent writer on the same
    /// event makes this attempt fail with every requested seat in conflict;
    /// the caller re-reads seat state and tries again.
    pub fn lock_seats(&self, event_id: &EventId, seat_ids: &[SeatId], now: DateTime<Utc>) -> Result<LockOutcome, HoldError> {
        let hold_until = now + self.hold_duration;

        let result = modify(self.events.as_ref(), event_id, |event| {
            event.ensure_live().map_err(LockRejection::Domain)?;
            if event.is_general_admission() {
                return Ok(None);
            }
            event.lock_seats(seat_ids, hold_until).map_err(LockRejection::Seats)?;
            Ok(Some(hold_until))
        });

        match result {
            Ok((hold_until, version)) => {
                info!("Locked {:?} on event {} until {:?} (v{})", seat_ids, event_id, hold_until, version);
                Ok(LockOutcome::Locked { hold_until })
            }
            Err(ModifyError::Rejected(LockRejection::Seats(conflicts))) => {
                debug!("Lock on event {} rejected: {:?}", event_id, conflicts);
                Ok(LockOutcome::Conflicts(conflicts))
            }
            Err(ModifyError::Rejected(LockRejection::Domain(err))) => Err(err.into()),
            Err(ModifyError::Store(StoreError::VersionConflict { .. })) => {
                warn!("Lock on event {} lost a concurrent write; reporting {:?} as taken", event_id, seat_ids);
                Ok(LockOutcome::Conflicts(
                    seat_ids
                        .iter()
                        .map(|id| SeatConflict::new(id.as_str(), ConflictReason::BookingInProgress))
                        .collect(),
                ))
            }
            Err(ModifyError::Store(err)) => Err(err.into()),
        }
    }

    /// Idempotent. Only seats currently on hold are returned to the pool;
    /// sold, available and unknown seats are ignored. Returns the number of
    /// seats released.
    pub fn release_seats(&self, event_id: &EventId, seat_ids: &[SeatId]) -> Result<usize, HoldError> {
        let released = self.downgrade(event_id, |event| event.release_seats(seat_ids))?;
        if released > 0 {
            info!("Released {} seat(s) on event {}", released, event_id);
        }
        Ok(released)
    }

    /// Sweep for one event: every hold that ended before `now` goes back to
    /// `AVAILABLE`, through the same transition as an explicit release.
    pub fn reap_expired(&self, event_id: &EventId, now: DateTime<Utc>) -> Result<usize, HoldError> {
        let reaped = self.downgrade(event_id, |event| event.reap_expired_holds(now))?;
        if reaped > 0 {
            info!("Reclaimed {} expired hold(s) on event {}", reaped, event_id);
        }
        Ok(reaped)
    }

    /// Administrative override. Ignores holds; sold seats are skipped and
    /// returned.
    pub fn set_status(&self, event_id: &EventId, seat_ids: &[SeatId], status: SeatStatus) -> Result<StatusOverride, HoldError> {
        let (outcome, _) = modify(self.events.as_ref(), event_id, |event| {
            event.ensure_live()?;
            event.override_seat_status(seat_ids, status)
        })
        .map_err(|err| match err {
            ModifyError::Rejected(domain) => HoldError::Domain(domain),
            ModifyError::Store(store) => store.into(),
        })?;

        info!("Set {} seat(s) on event {} to {}", outcome.updated, event_id, status);
        Ok(outcome)
    }

    fn downgrade<F>(&self, event_id: &EventId, mutate: F) -> Result<usize, HoldError>
    where
        F: Fn(&mut crate::domain::Event) -> usize,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = modify(self.events.as_ref(), event_id, |event| {
                let changed = mutate(event);
                if changed == 0 { Err(Unchanged) } else { Ok(changed) }
            });

            match result {
                Ok((changed, _)) => return Ok(changed),
                Err(ModifyError::Rejected(Unchanged)) => return Ok(0),
                Err(ModifyError::Store(StoreError::VersionConflict { .. })) if attempt < DOWNGRADE_ATTEMPTS => {
                    debug!("Retrying downgrade on event {} against a fresh snapshot", event_id);
                }
                Err(ModifyError::Store(err)) => return Err(err.into()),
            }
        }
    }
}

#[derive(Debug)]
enum LockRejection {
    Domain(Errors),
    Seats(Vec<SeatConflict>),
}

impl std::fmt::Display for LockRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockRejection::Domain(err) => write!(f, "{}", err),
            LockRejection::Seats(conflicts) => write!(f, "{} seat(s) unavailable", conflicts.len()),
        }
    }
}

/// Nothing to write back; skips the commit entirely.
#[derive(Debug)]
struct Unchanged;

impl std::fmt::Display for Unchanged {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no change")
    }
}
