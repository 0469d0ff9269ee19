//! Transactions: a single payer's commitment to pay part of an invoice.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    External,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Fail,
    Refunded,
}

/// `amount` is in the payer's currency; `effective_amount` is `amount`
/// converted into the invoice's currency. `from_wallet` is set only for
/// `Internal` transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub token: Uuid,
    pub kind: TransactionKind,
    pub amount: Money,
    pub effective_amount: Money,
    pub status: TransactionStatus,
    pub invoice_id: i64,
    pub from_wallet: Option<i64>,
}

impl Transaction {
    pub fn new_external(id: i64, invoice_id: i64, amount: Money, effective_amount: Money) -> Self {
        Self {
            id,
            token: Uuid::new_v4(),
            kind: TransactionKind::External,
            amount,
            effective_amount,
            status: TransactionStatus::Pending,
            invoice_id,
            from_wallet: None,
        }
    }

    pub fn new_internal(
        id: i64,
        invoice_id: i64,
        amount: Money,
        effective_amount: Money,
        from_wallet: i64,
    ) -> Self {
        Self {
            id,
            token: Uuid::new_v4(),
            kind: TransactionKind::Internal,
            amount,
            effective_amount,
            status: TransactionStatus::Pending,
            invoice_id,
            from_wallet: Some(from_wallet),
        }
    }

    pub fn is_refundable(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}
