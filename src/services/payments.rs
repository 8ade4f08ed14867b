//! Payment provider boundary. Capture happens outside this service; here we
//! only confirm that a transaction reference is real and settled.

use log::info;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use crate::money::Money;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Transaction id is required for online payments")]
    MissingTransaction,

    #[error("Payment {0} was not confirmed by the provider")]
    NotConfirmed(String),

    #[error("Free booking requested but the order total is {0}")]
    NotFree(Money),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),
}

pub trait PaymentProvider: Send + Sync {
    /// Confirms the transaction has succeeded with the provider.
    fn confirm(&self, transaction_id: &str) -> Result<(), PaymentError>;
}

/// Development provider: every reference with the `txn_` prefix counts as
/// settled unless it has been explicitly declined.
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    declined: Arc<Mutex<HashSet<String>>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        MockPaymentProvider::default()
    }

    pub fn shared() -> Arc<dyn PaymentProvider> {
        Arc::new(MockPaymentProvider::new())
    }

    pub fn decline(&self, transaction_id: &str) {
        if let Ok(mut declined) = self.declined.lock() {
            declined.insert(transaction_id.to_string());
        }
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn confirm(&self, transaction_id: &str) -> Result<(), PaymentError> {
        let declined = self
            .declined
            .lock()
            .map_err(|_| PaymentError::ProviderUnavailable("mock provider lock poisoned".to_string()))?;

        if !transaction_id.starts_with("txn_") || declined.contains(transaction_id) {
            return Err(PaymentError::NotConfirmed(transaction_id.to_string()));
        }

        info!("Mock payment {} confirmed", transaction_id);
        Ok(())
    }
}
