//! Invoices: a merchant's request to be paid a fixed amount in a fixed
//! currency. Immutable except for `status`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Incomplete,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub token: Uuid,
    pub amount: Money,
    pub currency_id: i64,
    pub status: InvoiceStatus,
    pub to_wallet: i64,
}

impl Invoice {
    pub fn new(id: i64, currency_id: i64, amount: Money, to_wallet: i64) -> Self {
        Self {
            id,
            token: Uuid::new_v4(),
            amount,
            currency_id,
            status: InvoiceStatus::Pending,
            to_wallet,
        }
    }

    /// Unpaid remainder given the sum of successful transactions so far.
    pub fn unpaid(&self, paid: Money) -> Money {
        self.amount - paid
    }

    /// Advances a `Pending` invoice to `Incomplete` the first time any
    /// transaction reaches a terminal status. Never regresses an
    /// already-advanced invoice.
    pub fn advance_past_pending(&mut self) {
        if self.status == InvoiceStatus::Pending {
            self.status = InvoiceStatus::Incomplete;
        }
    }

    pub fn mark_complete(&mut self) {
        self.status = InvoiceStatus::Complete;
    }

    /// A refund demotes a `Complete` invoice back to `Incomplete`.
    pub fn demote_to_incomplete(&mut self) {
        self.status = InvoiceStatus::Incomplete;
    }
}
