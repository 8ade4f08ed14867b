use chrono::{DateTime, Duration, TimeZone, Utc};
use seat_inventory::domain::{
    Coupon, CouponRule, Customer, DiscountType, Event, PaymentMode, Seat, SeatStatus, SeatingType, Selection,
    TicketType,
};
use seat_inventory::money::Money;
use seat_inventory::persistence::memory::InMemoryStore;
use seat_inventory::persistence::{CouponStore, EventStore, OrderStore};
use seat_inventory::services::notifications::LogNotifier;
use seat_inventory::services::payments::MockPaymentProvider;
use seat_inventory::services::{DiscountService, HoldManager, Notifier, OrderRequest, OrderService, PaymentProvider};
use std::sync::Arc;
// See https://users.rust-lang.org/t/sharing-code-and-macros-in-tests-directory/3098/7

pub const EVENT_ID: &str = "concert";
pub const GA_EVENT_ID: &str = "festival";
pub const ORGANIZER_ID: &str = "organizer-1";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 19, 0, 0).unwrap()
}

pub fn at(seconds_after_t0: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds_after_t0)
}

pub fn hold_duration() -> Duration {
    Duration::seconds(300)
}

pub fn usd(units: i64) -> Money {
    Money::from_units(units)
}

pub fn seat(id: &str, price: i64) -> Seat {
    Seat {
        id: id.to_string(),
        label: format!("Row {} Seat {}", &id[..1], &id[1..]),
        row: 0,
        col: 0,
        status: SeatStatus::Available,
        hold_until: None,
        price: usd(price),
        tier: Some("Standard".to_string()),
        color: Some("#3366ff".to_string()),
        ticket_type_id: Some("standard".to_string()),
    }
}

pub fn standard_ticket_type(capacity: Option<u32>) -> TicketType {
    TicketType {
        id: "standard".to_string(),
        name: "Standard".to_string(),
        price: usd(50),
        color: Some("#3366ff".to_string()),
        capacity,
        sold: 0,
    }
}

/// Four reserved seats at 50.00 each.
pub fn sample_event() -> Event {
    reserved_event(EVENT_ID)
}

pub fn reserved_event(id: &str) -> Event {
    Event {
        id: id.to_string(),
        name: "Spring Concert".to_string(),
        organizer_id: ORGANIZER_ID.to_string(),
        organizer_email: Some("organizer@example.com".to_string()),
        starts_at: at(86_400 * 30),
        seating_type: SeatingType::Reserved,
        seats: vec![seat("A1", 50), seat("A2", 50), seat("A3", 50), seat("A4", 50)],
        ticket_types: vec![standard_ticket_type(None)],
        deleted: false,
    }
}

pub fn ga_event(capacity: u32) -> Event {
    Event {
        id: GA_EVENT_ID.to_string(),
        name: "Open Air".to_string(),
        organizer_id: ORGANIZER_ID.to_string(),
        organizer_email: None,
        starts_at: at(86_400 * 60),
        seating_type: SeatingType::GeneralAdmission,
        seats: Vec::new(),
        ticket_types: vec![standard_ticket_type(Some(capacity))],
        deleted: false,
    }
}

pub fn coupon(id: &str, code: &str, discount_type: DiscountType, value: i64, rule: CouponRule) -> Coupon {
    Coupon {
        id: id.to_string(),
        code: code.to_string(),
        discount_type,
        value: usd(value),
        rule,
        max_uses: 100,
        used_count: 0,
        expiry_date: Utc.with_ymd_and_hms(2099, 12, 31, 0, 0, 0).unwrap(),
        active: true,
        deleted: false,
        event_id: None,
        organizer_id: Some(ORGANIZER_ID.to_string()),
    }
}

pub fn customer() -> Customer {
    Customer {
        id: Some("customer-1".to_string()),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
    }
}

pub fn store_with(events: Vec<Event>, coupons: Vec<Coupon>) -> InMemoryStore {
    InMemoryStore::with_catalog(events, coupons).unwrap()
}

pub fn hold_manager(store: &InMemoryStore) -> HoldManager {
    HoldManager::new(Arc::new(store.clone()), hold_duration())
}

pub fn order_service(store: &InMemoryStore) -> OrderService {
    order_service_with(store, MockPaymentProvider::shared(), LogNotifier::shared())
}

pub fn order_service_with(
    store: &InMemoryStore,
    payments: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
) -> OrderService {
    let events: Arc<dyn EventStore> = Arc::new(store.clone());
    let coupons: Arc<dyn CouponStore> = Arc::new(store.clone());
    let orders: Arc<dyn OrderStore> = Arc::new(store.clone());
    let discounts = DiscountService::new(coupons, events.clone());
    OrderService::new(events, orders, discounts, payments, notifier, Some("admin@example.com".to_string()))
}

pub fn seat_order(event_id: &str, seat_ids: &[&str], fee: i64) -> OrderRequest {
    OrderRequest {
        customer: customer(),
        event_id: event_id.to_string(),
        selection: Selection::seats(seat_ids.iter().map(|s| s.to_string()).collect()),
        service_fee: usd(fee),
        coupon_id: None,
        payment_mode: PaymentMode::Online,
        transaction_id: Some("txn_0001".to_string()),
    }
}

pub fn seat_status(store: &InMemoryStore, event_id: &str, seat_id: &str) -> SeatStatus {
    EventStore::load(store, event_id).unwrap().value.seat(seat_id).unwrap().status
}

pub fn seat_ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}
