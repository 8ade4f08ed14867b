use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::{CouponRejection, Errors, SeatConflict};
use crate::persistence::StoreError;
use crate::services::{DiscountError, HoldError, OrderError, PaymentError};

/// JSON body of every error response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<SeatConflict>,
    #[serde(rename = "transactionId", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            body: ErrorBody { message: message.into(), ..ErrorBody::default() },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized() -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden() -> Self {
        ApiError::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    /// 409 listing the seats the shopper has to deselect.
    pub fn conflict(conflicts: Vec<SeatConflict>) -> Self {
        let mut err = ApiError::new(StatusCode::CONFLICT, "Some seats are not available");
        err.body.conflicts = conflicts;
        err
    }

    pub fn with_transaction(mut self, transaction_id: Option<String>) -> Self {
        self.body.transaction_id = transaction_id;
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.body.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(&self.body)
    }
}

impl From<Errors> for ApiError {
    fn from(err: Errors) -> Self {
        match err {
            Errors::UnknownEvent(_) | Errors::EventDeleted(_) => ApiError::not_found(err.to_string()),
            Errors::SeatsUnavailable(conflicts) => ApiError::conflict(conflicts),
            Errors::TicketTypeSoldOut(_) => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            Errors::UnknownTicketType(_)
            | Errors::InvalidStatusOverride(_)
            | Errors::EmptyOrder
            | Errors::SeatingTypeMismatch
            | Errors::NegativeServiceFee(_)
            | Errors::TooManyTickets(_) => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::not_found(format!("Not found: {}", id)),
            StoreError::AlreadyExists(_) | StoreError::VersionConflict { .. } => {
                ApiError::new(StatusCode::CONFLICT, err.to_string())
            }
            StoreError::Unavailable(_) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        }
    }
}

impl From<HoldError> for ApiError {
    fn from(err: HoldError) -> Self {
        match err {
            HoldError::Domain(err) => err.into(),
            HoldError::Store(err) => err.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::ProviderUnavailable(_) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            PaymentError::NotConfirmed(_) => ApiError::new(StatusCode::PAYMENT_REQUIRED, err.to_string()),
            PaymentError::MissingTransaction | PaymentError::NotFree(_) => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<CouponRejection> for ApiError {
    fn from(err: CouponRejection) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<DiscountError> for ApiError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::UnknownCode(_) => ApiError::bad_request(err.to_string()),
            DiscountError::Rejected(rejection) => rejection.into(),
            DiscountError::Domain(err) => err.into(),
            DiscountError::Store(err) => err.into(),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Domain(err) => err.into(),
            OrderError::Conflict { conflicts, transaction_id } => {
                ApiError::conflict(conflicts).with_transaction(transaction_id)
            }
            OrderError::Payment(err) => err.into(),
            OrderError::UnknownTicket(_) | OrderError::UnknownOrder(_) => ApiError::not_found(err.to_string()),
            OrderError::Store { source, transaction_id } => {
                let mut api: ApiError = source.into();
                if transaction_id.is_some() {
                    api.status = StatusCode::INTERNAL_SERVER_ERROR;
                    api.body.message = "Payment captured but the order was not recorded".to_string();
                }
                api.with_transaction(transaction_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConflictReason;

    #[test]
    fn seat_conflicts_become_409_with_ids() {
        let err: ApiError = Errors::SeatsUnavailable(vec![SeatConflict::new("A1", ConflictReason::Sold)]).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.body.conflicts[0].seat_id, "A1");
    }

    #[test]
    fn paid_but_unrecorded_order_keeps_transaction_id() {
        let err: ApiError = OrderError::Store {
            source: StoreError::Unavailable("orders".to_string()),
            transaction_id: Some("txn_1".to_string()),
        }
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.transaction_id.as_deref(), Some("txn_1"));
    }
}
