//! Merchant wallets: one balance per `(merchant, currency)` pair.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;

pub type MerchantId = Uuid;

/// A merchant's balance in a single currency. Unique on `(merchant, currency)`;
/// `amount` must never go negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub merchant_id: MerchantId,
    pub currency_id: i64,
    pub amount: Money,
}

impl Wallet {
    pub fn new(id: i64, merchant_id: MerchantId, currency_id: i64) -> Self {
        Self {
            id,
            merchant_id,
            currency_id,
            amount: Money::ZERO,
        }
    }

    /// Whether this wallet can afford to debit `amount` without going negative.
    pub fn can_debit(&self, amount: Money) -> bool {
        self.amount >= amount
    }

    pub fn credit(&mut self, amount: Money) {
        self.amount = self.amount + amount;
    }

    /// Debits `amount`. Callers must check [`Wallet::can_debit`] first — this
    /// is a raw mutation, not a guarded one.
    pub fn debit(&mut self, amount: Money) {
        self.amount = self.amount - amount;
    }
}
