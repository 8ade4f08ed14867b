use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use crate::domain::{Event, Order};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Everything the correspondence needs about a completed sale.
#[derive(Debug, Clone)]
pub struct Confirmation<'a> {
    pub order: &'a Order,
    pub event: &'a Event,
    pub customer_email: &'a str,
    pub organizer_email: Option<&'a str>,
    pub admin_email: Option<&'a str>,
}

pub trait Notifier: Send + Sync {
    fn order_confirmed(&self, confirmation: &Confirmation<'_>) -> Result<(), NotifyError>;
}

/// Writes the confirmation to the log instead of sending mail.
#[derive(Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn shared() -> Arc<dyn Notifier> {
        Arc::new(LogNotifier)
    }
}

impl Notifier for LogNotifier {
    fn order_confirmed(&self, confirmation: &Confirmation<'_>) -> Result<(), NotifyError> {
        info!(
            "Order {} for '{}' confirmed: {} ticket(s), total {} -> {} (organizer: {:?}, admin: {:?})",
            confirmation.order.id,
            confirmation.event.name,
            confirmation.order.tickets.len(),
            confirmation.order.totals.total_amount,
            confirmation.customer_email,
            confirmation.organizer_email,
            confirmation.admin_email,
        );
        Ok(())
    }
}

/// Fire-and-forget dispatch. A failure is logged and never reaches the order.
pub fn dispatch(notifier: &dyn Notifier, confirmation: &Confirmation<'_>) {
    if let Err(err) = notifier.order_confirmed(confirmation) {
        warn!("Confirmation for order {} not sent: {}", confirmation.order.id, err);
    }
}
