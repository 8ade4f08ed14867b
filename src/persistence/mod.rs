//! Storage boundary.
//!
//! Events are stored as whole documents with a version number. Every change
//! to a seat goes through [`modify`]: one load, a pure mutation of the
//! snapshot, and one compare-and-swap. Two writers racing on the same event
//! cannot both commit.

pub mod json_file;
pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;
use crate::domain::{Coupon, Event, EventId, Order};

pub type Version = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: Version,
    pub value: T,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Concurrent update of {id}: expected version {expected}, found {actual}")]
    VersionConflict { id: String, expected: Version, actual: Version },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub trait EventStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Versioned<Event>, StoreError>;

    /// Replaces the stored event only if its version is still `expected`.
    /// Returns the new version.
    fn compare_and_swap(&self, id: &str, expected: Version, event: Event) -> Result<Version, StoreError>;

    fn insert(&self, event: Event) -> Result<(), StoreError>;

    /// Ids of events holding at least one seat whose hold ended before `now`.
    fn events_with_expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<EventId>, StoreError>;

    fn all(&self) -> Result<Vec<Event>, StoreError>;
}

pub trait CouponStore: Send + Sync {
    fn find(&self, id: &str) -> Result<Option<Coupon>, StoreError>;

    fn find_by_code(&self, code: &str) -> Result<Vec<Coupon>, StoreError>;

    /// Coupons not deleted and scoped to the event, its organizer, or global.
    fn candidates_for(&self, event_id: &str, organizer_id: &str) -> Result<Vec<Coupon>, StoreError>;

    /// Atomically adds one use, never beyond `max_uses`. Returns the
    /// increment actually applied (0 once the coupon is exhausted).
    fn redeem(&self, id: &str) -> Result<u32, StoreError>;

    /// Undoes one `redeem`. Never takes the count below zero.
    fn give_back(&self, id: &str) -> Result<(), StoreError>;

    fn insert(&self, coupon: Coupon) -> Result<(), StoreError>;

    fn all(&self) -> Result<Vec<Coupon>, StoreError>;
}

pub trait OrderStore: Send + Sync {
    fn insert(&self, order: Order) -> Result<(), StoreError>;

    fn find(&self, id: &str) -> Result<Option<Order>, StoreError>;

    fn ticket_id_taken(&self, ticket_id: &str) -> Result<bool, StoreError>;

    /// The order holding this ticket.
    fn find_by_ticket(&self, ticket_id: &str) -> Result<Option<Order>, StoreError>;

    /// Applies `f` to the order holding the ticket under the store's lock.
    fn update_ticket(&self, ticket_id: &str, f: &mut dyn FnMut(&mut Order)) -> Result<Order, StoreError>;

    fn all(&self) -> Result<Vec<Order>, StoreError>;
}

#[derive(Debug, Error)]
pub enum ModifyError<E> {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Rejected: {0}")]
    Rejected(E),
}

/// Loads the event, runs `mutate` on a private copy, and commits the copy if
/// nobody else wrote in between. A rejected mutation writes nothing.
pub fn modify<S, R, E, F>(store: &S, id: &EventId, mutate: F) -> Result<(R, Version), ModifyError<E>>
where
    S: EventStore + ?Sized,
    F: FnOnce(&mut Event) -> Result<R, E>,
{
    let Versioned { version, mut value } = store.load(id)?;
    let result = mutate(&mut value).map_err(ModifyError::Rejected)?;
    let new_version = store.compare_and_swap(id, version, value)?;
    Ok((result, new_version))
}
