use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use crate::persistence::EventStore;
use super::holds::HoldManager;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub events: usize,
    pub seats: usize,
}

/// Periodically returns lapsed holds to the pool. Lazy reclamation at
/// checkout keeps correctness on its own; this keeps the seat map honest for
/// shoppers who are only browsing.
#[derive(Clone)]
pub struct ExpirySweeper {
    holds: HoldManager,
    events: Arc<dyn EventStore>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(holds: HoldManager, events: Arc<dyn EventStore>, interval: Duration) -> Self {
        ExpirySweeper { holds, events, interval }
    }

    /// One pass over every event with an expired hold. A failure on one
    /// event is logged and the pass moves on.
    pub fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let ids = match self.events.events_with_expired_holds(now) {
            Ok(ids) => ids,
            Err(err) => {
                error!("Hold sweep could not list events: {}", err);
                return SweepReport::default();
            }
        };

        let mut report = SweepReport::default();
        for id in ids {
            match self.holds.reap_expired(&id, now) {
                Ok(0) => {}
                Ok(seats) => {
                    report.events += 1;
                    report.seats += seats;
                }
                Err(err) => error!("Hold sweep failed for event {}: {}", id, err),
            }
        }

        if report.seats > 0 {
            info!("Hold sweep reclaimed {} seat(s) across {} event(s)", report.seats, report.events);
        } else {
            debug!("Hold sweep found nothing to reclaim");
        }
        report
    }

    /// Runs the sweep on the actix runtime until the process exits.
    pub fn spawn(self) {
        actix_web::rt::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once(Utc::now());
            }
        });
    }
}
