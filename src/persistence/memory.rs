//! In-memory store. One mutex per collection; each event document carries
//! its own version so compare-and-swap is exact per event.

use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::domain::{Coupon, Event, EventId, Order, OrderId, TicketId};
use super::{CouponStore, EventStore, OrderStore, StoreError, Version, Versioned};

#[derive(Default)]
struct Orders {
    by_id: HashMap<OrderId, Order>,
    by_ticket: HashMap<TicketId, OrderId>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    events: Arc<Mutex<HashMap<EventId, Versioned<Event>>>>,
    coupons: Arc<Mutex<HashMap<String, Coupon>>>,
    orders: Arc<Mutex<Orders>>,
}

fn guard<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Unavailable(format!("{} lock poisoned", name)))
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    pub fn with_catalog(events: Vec<Event>, coupons: Vec<Coupon>) -> Result<Self, StoreError> {
        let store = InMemoryStore::new();
        for event in events {
            EventStore::insert(&store, event)?;
        }
        for coupon in coupons {
            CouponStore::insert(&store, coupon)?;
        }
        Ok(store)
    }

    /// Adds previously placed orders, keeping their tickets reachable.
    pub fn with_orders(self, orders: Vec<Order>) -> Result<Self, StoreError> {
        for order in orders {
            OrderStore::insert(&self, order)?;
        }
        Ok(self)
    }
}

impl EventStore for InMemoryStore {
    fn load(&self, id: &str) -> Result<Versioned<Event>, StoreError> {
        guard(&self.events, "events")?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn compare_and_swap(&self, id: &str, expected: Version, event: Event) -> Result<Version, StoreError> {
        let mut events = guard(&self.events, "events")?;
        let current = events
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if current.version != expected {
            debug!("CAS on event {} lost: expected v{}, found v{}", id, expected, current.version);
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected,
                actual: current.version,
            });
        }

        current.version += 1;
        current.value = event;
        Ok(current.version)
    }

    fn insert(&self, event: Event) -> Result<(), StoreError> {
        let mut events = guard(&self.events, "events")?;
        if events.contains_key(&event.id) {
            return Err(StoreError::AlreadyExists(format!("event {}", event.id)));
        }
        events.insert(event.id.clone(), Versioned { version: 1, value: event });
        Ok(())
    }

    fn events_with_expired_holds(&self, now: DateTime<Utc>) -> Result<Vec<EventId>, StoreError> {
        let events = guard(&self.events, "events")?;
        let mut ids: Vec<EventId> = events
            .values()
            .filter(|doc| !doc.value.deleted && doc.value.has_expired_holds(now))
            .map(|doc| doc.value.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn all(&self) -> Result<Vec<Event>, StoreError> {
        let events = guard(&self.events, "events")?;
        let mut all: Vec<Event> = events.values().map(|doc| doc.value.clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

impl CouponStore for InMemoryStore {
    fn find(&self, id: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(guard(&self.coupons, "coupons")?.get(id).cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Vec<Coupon>, StoreError> {
        let coupons = guard(&self.coupons, "coupons")?;
        let mut found: Vec<Coupon> = coupons
            .values()
            .filter(|c| !c.deleted && c.code.eq_ignore_ascii_case(code))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn candidates_for(&self, event_id: &str, organizer_id: &str) -> Result<Vec<Coupon>, StoreError> {
        let coupons = guard(&self.coupons, "coupons")?;
        let mut found: Vec<Coupon> = coupons
            .values()
            .filter(|c| !c.deleted && c.is_scoped_to(event_id, organizer_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn redeem(&self, id: &str) -> Result<u32, StoreError> {
        let mut coupons = guard(&self.coupons, "coupons")?;
        let coupon = coupons
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let increment = coupon.remaining_uses().min(1);
        coupon.used_count += increment;
        Ok(increment)
    }

    fn give_back(&self, id: &str) -> Result<(), StoreError> {
        let mut coupons = guard(&self.coupons, "coupons")?;
        let coupon = coupons
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        coupon.used_count = coupon.used_count.saturating_sub(1);
        Ok(())
    }

    fn insert(&self, coupon: Coupon) -> Result<(), StoreError> {
        let mut coupons = guard(&self.coupons, "coupons")?;
        if coupons.contains_key(&coupon.id) {
            return Err(StoreError::AlreadyExists(format!("coupon {}", coupon.id)));
        }
        coupons.insert(coupon.id.clone(), coupon);
        Ok(())
    }

    fn all(&self) -> Result<Vec<Coupon>, StoreError> {
        let coupons = guard(&self.coupons, "coupons")?;
        let mut all: Vec<Coupon> = coupons.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

impl OrderStore for InMemoryStore {
    fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = guard(&self.orders, "orders")?;
        if orders.by_id.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists(format!("order {}", order.id)));
        }
        if let Some(taken) = order.tickets.iter().find(|t| orders.by_ticket.contains_key(&t.id)) {
            return Err(StoreError::AlreadyExists(format!("ticket {}", taken.id)));
        }
        for ticket in &order.tickets {
            orders.by_ticket.insert(ticket.id.clone(), order.id.clone());
        }
        orders.by_id.insert(order.id.clone(), order);
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(guard(&self.orders, "orders")?.by_id.get(id).cloned())
    }

    fn ticket_id_taken(&self, ticket_id: &str) -> Result<bool, StoreError> {
        Ok(guard(&self.orders, "orders")?.by_ticket.contains_key(ticket_id))
    }

    fn find_by_ticket(&self, ticket_id: &str) -> Result<Option<Order>, StoreError> {
        let orders = guard(&self.orders, "orders")?;
        Ok(orders
            .by_ticket
            .get(ticket_id)
            .and_then(|order_id| orders.by_id.get(order_id))
            .cloned())
    }

    fn update_ticket(&self, ticket_id: &str, f: &mut dyn FnMut(&mut Order)) -> Result<Order, StoreError> {
        let mut orders = guard(&self.orders, "orders")?;
        let order_id = orders
            .by_ticket
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(ticket_id.to_string()))?;
        let order = orders
            .by_id
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(order_id.clone()))?;
        f(order);
        Ok(order.clone())
    }

    fn all(&self) -> Result<Vec<Order>, StoreError> {
        let orders = guard(&self.orders, "orders")?;
        let mut all: Vec<Order> = orders.by_id.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}
