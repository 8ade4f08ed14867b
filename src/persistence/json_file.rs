use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_string_pretty};
use crate::domain::{Coupon, Event, Order};
use super::memory::InMemoryStore;
use super::{CouponStore, EventStore, OrderStore, StoreError};

/// Everything the store holds: events with their hydrated seat maps,
/// coupons, and the orders behind any sold seats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

pub fn read_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, String> {
    let file = File::open(&path)
        .map_err(|e| format!("Failed to open {}: {}", path.as_ref().display(), e))?;
    let reader = BufReader::new(file);

    from_reader(reader).map_err(|e| format!("Failed to parse catalog: {}", e))
}

pub fn write_catalog<P: AsRef<Path>>(path: P, catalog: &Catalog) -> Result<(), String> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| format!("Failed to open file for writing: {}", e))?;

    let json = to_string_pretty(catalog).map_err(|e| format!("Failed to serialize catalog: {}", e))?;

    file.write_all(json.as_bytes())
        .map_err(|e| format!("Failed to write to file: {}", e))?;

    Ok(())
}

/// Snapshot of the whole store, e.g. for writing back on shutdown.
pub fn snapshot(store: &InMemoryStore) -> Result<Catalog, StoreError> {
    Ok(Catalog {
        events: EventStore::all(store)?,
        coupons: CouponStore::all(store)?,
        orders: OrderStore::all(store)?,
    })
}

pub fn load_store<P: AsRef<Path>>(path: P) -> Result<InMemoryStore, String> {
    let catalog = read_catalog(path)?;
    InMemoryStore::with_catalog(catalog.events, catalog.coupons)
        .and_then(|store| store.with_orders(catalog.orders))
        .map_err(|e| e.to_string())
}
