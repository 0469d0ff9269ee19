//! Domain layer: the entities, invariants, and error vocabulary of the
//! settlement engine. No I/O lives here.

pub mod attempt;
pub mod currency;
pub mod graph;
pub mod invoice;
pub mod money;
pub mod payment_system;
pub mod transaction;
pub mod wallet;

pub use attempt::{Attempt, AttemptStatus};
pub use currency::{ConversionRate, Currency, CurrencyCode};
pub use graph::{ConversionGraph, RateCache};
pub use invoice::{Invoice, InvoiceStatus};
pub use money::Money;
pub use payment_system::{PaymentSystem, PaymentSystemDescriptor, SendResult, SystemType};
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
pub use wallet::{MerchantId, Wallet};

/// Every error kind the engine can surface. The HTTP boundary (out of scope
/// for this crate) is responsible for mapping these to status codes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no conversion path between the given currencies")]
    NoConversion,

    #[error("neither amount nor effective_amount was supplied")]
    Underspecified,

    #[error("effective_amount exceeds the invoice's unpaid amount")]
    Overpay,

    #[error("invoice is already complete")]
    InvoiceComplete,

    #[error("transaction is not in a refundable state")]
    NotRefundable,

    #[error("webhook payload failed to decrypt or authenticate")]
    DecryptionError,

    #[error("serialization conflict, retry the request")]
    SerializationConflict,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // Postgres SERIALIZABLE/deadlock failure codes: reported as a
            // retryable conflict, distinct from every other database error.
            if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
                return EngineError::SerializationConflict;
            }
        }
        if matches!(err, sqlx::Error::RowNotFound) {
            return EngineError::NotFound("row not found".to_string());
        }
        EngineError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            EngineError::Overpay.to_string(),
            "effective_amount exceeds the invoice's unpaid amount"
        );
        assert_eq!(EngineError::InvoiceComplete.to_string(), "invoice is already complete");
    }
}
