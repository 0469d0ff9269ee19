//! Transaction Engine: moves a transaction from `pending` payment intent to
//! an attempt, and handles refunds of settled transactions.

use std::sync::Arc;

use tracing::instrument;

use crate::domain::{
    attempt::Attempt,
    invoice::InvoiceStatus,
    payment_system::{PaymentSystem, PaymentSystemDescriptor},
    transaction::TransactionStatus,
    EngineError,
};
use crate::infrastructure::database::repositories::{AttemptRepository, InvoiceRepository, PaymentSystemRepository, TransactionRepository};

use super::scope::Scope;

pub struct TransactionEngine {
    transaction_repo: Arc<dyn TransactionRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    attempt_repo: Arc<dyn AttemptRepository>,
    payment_system_repo: Arc<dyn PaymentSystemRepository>,
}

impl TransactionEngine {
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        attempt_repo: Arc<dyn AttemptRepository>,
        payment_system_repo: Arc<dyn PaymentSystemRepository>,
    ) -> Self {
        Self {
            transaction_repo,
            invoice_repo,
            attempt_repo,
            payment_system_repo,
        }
    }

    /// Locks the transaction with its invoice and rejects attempts against
    /// an already-`complete` invoice.
    #[instrument(skip(self, scope))]
    pub async fn create_attempt(
        &self,
        scope: &mut Scope<'_>,
        transaction_id: i64,
        payment_system_id: i64,
    ) -> Result<Attempt, EngineError> {
        let (transaction, invoice) = self
            .transaction_repo
            .lock_by_id_with_invoice(scope.conn(), transaction_id)
            .await?;
        if invoice.status == InvoiceStatus::Complete {
            return Err(EngineError::InvoiceComplete);
        }

        let attempt = Attempt::new(0, transaction.id, payment_system_id);
        self.attempt_repo.insert(scope.conn(), &attempt).await
    }

    #[instrument(skip(self, scope))]
    pub async fn get_payment_info(
        &self,
        scope: &mut Scope<'_>,
        transaction_id: i64,
    ) -> Result<Vec<PaymentSystemDescriptor>, EngineError> {
        let (_transaction, invoice) = self
            .transaction_repo
            .lock_by_id_with_invoice(scope.conn(), transaction_id)
            .await?;
        if invoice.status == InvoiceStatus::Complete {
            return Err(EngineError::InvoiceComplete);
        }

        let systems: Vec<PaymentSystem> = self.payment_system_repo.list(scope.conn()).await?;
        Ok(systems.iter().map(PaymentSystemDescriptor::from).collect())
    }

    #[instrument(skip(self, scope))]
    pub async fn refund(&self, scope: &mut Scope<'_>, transaction_id: i64) -> Result<(), EngineError> {
        let transaction = self.transaction_repo.lock_by_id(scope.conn(), transaction_id).await?;
        if !transaction.is_refundable() {
            return Err(EngineError::NotRefundable);
        }

        self.transaction_repo
            .update_status(scope.conn(), transaction_id, TransactionStatus::Refunded)
            .await?;

        let mut invoice = self.invoice_repo.lock_by_id(scope.conn(), transaction.invoice_id).await?;
        invoice.demote_to_incomplete();
        self.invoice_repo.update_status(scope.conn(), invoice.id, invoice.status).await?;
        Ok(())
    }
}
