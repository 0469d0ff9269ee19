//! Invoice Engine: the wallet/invoice side of settlement. Every public
//! operation runs inside the caller's [`Scope`] and locks exactly the rows
//! `fetch` names before reading or mutating them.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::domain::{
    currency::Currency,
    graph::{ConversionGraph, RateCache},
    invoice::Invoice,
    money::Money,
    transaction::{Transaction, TransactionStatus},
    wallet::{MerchantId, Wallet},
    EngineError,
};
use crate::infrastructure::database::repositories::{
    CurrencyRepository, InvoiceRepository, TransactionRepository, WalletRepository,
};

use super::scope::Scope;

/// Everything `fetch` locks and derives: the invoice, its destination
/// wallet, and the totals computed from its successful transactions.
pub struct InvoiceSnapshot {
    pub invoice: Invoice,
    pub wallet: Wallet,
    pub paid: Money,
    pub unpaid: Money,
}

pub struct PaymentInfo {
    pub wallet_id: i64,
    pub currency_id: i64,
    pub amount: Money,
    pub paid: Money,
    pub unpaid: Money,
}

pub struct InvoiceEngine {
    currency_repo: Arc<dyn CurrencyRepository>,
    wallet_repo: Arc<dyn WalletRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    rate_cache: Arc<RateCache>,
}

impl InvoiceEngine {
    pub fn new(
        currency_repo: Arc<dyn CurrencyRepository>,
        wallet_repo: Arc<dyn WalletRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        rate_cache: Arc<RateCache>,
    ) -> Self {
        Self {
            currency_repo,
            wallet_repo,
            invoice_repo,
            transaction_repo,
            rate_cache,
        }
    }

    /// Locks the invoice, its destination wallet, and its successful
    /// transactions, then derives `paid`/`unpaid` from them.
    #[instrument(skip(self, scope))]
    pub async fn fetch(&self, scope: &mut Scope<'_>, invoice_id: i64) -> Result<InvoiceSnapshot, EngineError> {
        let conn = scope.conn();
        let invoice = self.invoice_repo.lock_by_id(conn, invoice_id).await?;
        let wallet = self.wallet_repo.lock_by_id(conn, invoice.to_wallet).await?;
        let successful = self.transaction_repo.lock_successful_for_invoice(conn, invoice_id).await?;

        let paid = successful
            .iter()
            .fold(Money::ZERO, |acc, tx| acc + tx.effective_amount);
        let unpaid = invoice.unpaid(paid);

        Ok(InvoiceSnapshot {
            invoice,
            wallet,
            paid,
            unpaid,
        })
    }

    /// Every currency the engine knows, for a caller building a currency
    /// picker or validating a code before it reaches `currency_id`-keyed
    /// operations like `create_transaction`.
    pub async fn list_currencies(&self, scope: &mut Scope<'_>) -> Result<Vec<Currency>, EngineError> {
        self.currency_repo.list(scope.conn()).await
    }

    pub async fn get_payment_info(&self, scope: &mut Scope<'_>, invoice_id: i64) -> Result<PaymentInfo, EngineError> {
        let snapshot = self.fetch(scope, invoice_id).await?;
        Ok(PaymentInfo {
            wallet_id: snapshot.wallet.id,
            currency_id: snapshot.invoice.currency_id,
            amount: snapshot.invoice.amount,
            paid: snapshot.paid,
            unpaid: snapshot.unpaid,
        })
    }

    /// Cheapest conversion rate `from -> to`, consulting the TTL cache.
    pub async fn rate(
        &self,
        scope: &mut Scope<'_>,
        from: i64,
        to: i64,
        fresh: bool,
    ) -> Result<Option<Decimal>, EngineError> {
        let rates = self.currency_repo.load_all_rates(scope.conn()).await?;
        let graph = ConversionGraph::build(&rates);
        Ok(self.rate_cache.rate(&graph, from, to, fresh))
    }

    pub async fn rates_from(
        &self,
        scope: &mut Scope<'_>,
        from: i64,
        fresh: bool,
    ) -> Result<HashMap<i64, Decimal>, EngineError> {
        let rates = self.currency_repo.load_all_rates(scope.conn()).await?;
        let graph = ConversionGraph::build(&rates);
        Ok(self.rate_cache.rates_from(&graph, from, fresh))
    }

    /// Creates an `external` transaction against `invoice_id`. Returns
    /// `Ok(None)` when the supplied amount would overpay the invoice — no
    /// transaction is created in that case, it is not an error.
    #[instrument(skip(self, scope))]
    pub async fn create_transaction(
        &self,
        scope: &mut Scope<'_>,
        invoice_id: i64,
        currency_id: i64,
        amount: Option<Money>,
        effective_amount: Option<Money>,
    ) -> Result<Option<Transaction>, EngineError> {
        let snapshot = self.fetch(scope, invoice_id).await?;
        let rate = self
            .rate(scope, currency_id, snapshot.invoice.currency_id, false)
            .await?
            .ok_or(EngineError::NoConversion)?;
        let (amount, effective_amount) = compute_amounts(rate, amount, effective_amount)?;

        if effective_amount > snapshot.unpaid {
            return Ok(None);
        }

        let transaction = Transaction::new_external(0, invoice_id, amount, effective_amount);
        let inserted = self.transaction_repo.insert(scope.conn(), &transaction).await?;
        Ok(Some(inserted))
    }

    /// Creates an `internal` transaction debiting `wallet_id` and attempts
    /// immediate settlement. Returns `Ok(None)` when the supplied amount
    /// would overpay the invoice — no transaction is created in that case,
    /// matching `create_transaction`. Otherwise always returns the
    /// transaction, even one left `fail`, so the caller can surface its
    /// status.
    #[instrument(skip(self, scope))]
    pub async fn pay_with_wallet(
        &self,
        scope: &mut Scope<'_>,
        invoice_id: i64,
        merchant_id: MerchantId,
        wallet_id: i64,
        amount: Option<Money>,
        effective_amount: Option<Money>,
    ) -> Result<Option<Transaction>, EngineError> {
        let snapshot = self.fetch(scope, invoice_id).await?;
        let source_wallet = self
            .wallet_repo
            .lock_owned_by(scope.conn(), merchant_id, wallet_id)
            .await
            .map_err(|_| EngineError::NotFound(format!("wallet {wallet_id} for merchant {merchant_id}")))?;

        let rate = self
            .rate(scope, source_wallet.currency_id, snapshot.invoice.currency_id, false)
            .await?
            .ok_or(EngineError::NoConversion)?;
        let (amount, effective_amount) = compute_amounts(rate, amount, effective_amount)?;

        if effective_amount > snapshot.unpaid {
            return Ok(None);
        }

        let transaction = Transaction::new_internal(0, invoice_id, amount, effective_amount, wallet_id);
        let mut transaction = self.transaction_repo.insert(scope.conn(), &transaction).await?;
        let mut invoice = snapshot.invoice;
        invoice.advance_past_pending();
        self.invoice_repo
            .update_status(scope.conn(), invoice.id, invoice.status)
            .await?;

        match self
            .settle(
                scope,
                &transaction,
                source_wallet,
                snapshot.wallet,
                amount,
                effective_amount,
                snapshot.unpaid,
                invoice,
            )
            .await
        {
            Ok(status) => transaction.status = status,
            Err(err) => {
                warn!(transaction_id = transaction.id, error = %err, "internal settlement failed, marking transaction failed");
                self.transaction_repo
                    .update_status(scope.conn(), transaction.id, TransactionStatus::Fail)
                    .await?;
                transaction.status = TransactionStatus::Fail;
            }
        }

        Ok(Some(transaction))
    }

    async fn settle(
        &self,
        scope: &mut Scope<'_>,
        transaction: &Transaction,
        mut source_wallet: Wallet,
        mut destination_wallet: Wallet,
        amount: Money,
        effective_amount: Money,
        unpaid_at_fetch: Money,
        mut invoice: Invoice,
    ) -> Result<TransactionStatus, EngineError> {
        if !source_wallet.can_debit(amount) {
            self.transaction_repo
                .update_status(scope.conn(), transaction.id, TransactionStatus::Fail)
                .await?;
            return Ok(TransactionStatus::Fail);
        }

        source_wallet.debit(amount);
        destination_wallet.credit(effective_amount);
        self.wallet_repo
            .update_amount(scope.conn(), source_wallet.id, source_wallet.amount)
            .await?;
        self.wallet_repo
            .update_amount(scope.conn(), destination_wallet.id, destination_wallet.amount)
            .await?;
        self.transaction_repo
            .update_status(scope.conn(), transaction.id, TransactionStatus::Success)
            .await?;

        if effective_amount >= unpaid_at_fetch {
            invoice.mark_complete();
            self.invoice_repo.update_status(scope.conn(), invoice.id, invoice.status).await?;
            info!(invoice_id = transaction.invoice_id, "invoice settled in full");
        }

        Ok(TransactionStatus::Success)
    }
}

/// Exactly one of `amount`/`effective_amount` is the caller's input; the
/// other is derived through `rate = rate(transaction_currency,
/// invoice_currency)`: `effective_amount = amount / rate` when `amount` is
/// given, `amount = effective_amount * rate` when `effective_amount` is
/// given.
fn compute_amounts(
    rate: Decimal,
    amount: Option<Money>,
    effective_amount: Option<Money>,
) -> Result<(Money, Money), EngineError> {
    match (amount, effective_amount) {
        (Some(amount), _) => Ok((amount, amount / rate)),
        (None, Some(effective_amount)) => Ok((effective_amount * rate, effective_amount)),
        (None, None) => Err(EngineError::Underspecified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn compute_amounts_divides_when_amount_given() {
        let (amount, effective) = compute_amounts(dec!(2), Some(Money::from_i64(10)), None).unwrap();
        assert_eq!(amount, Money::from_i64(10));
        assert_eq!(effective, Money::from_i64(5));
    }

    #[test]
    fn compute_amounts_multiplies_when_effective_given() {
        let (amount, effective) = compute_amounts(dec!(2), None, Some(Money::new(dec!(19.9)))).unwrap();
        assert_eq!(effective, Money::new(dec!(19.9)));
        assert_eq!(amount, Money::new(dec!(39.8)));
    }

    #[test]
    fn compute_amounts_rejects_neither_supplied() {
        assert!(matches!(compute_amounts(dec!(2), None, None), Err(EngineError::Underspecified)));
    }
}
