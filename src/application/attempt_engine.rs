//! Attempt Engine: the critical section. Every terminal transition begins
//! with a single locking join over `(Attempt, Transaction, Invoice)` filtered
//! on `Attempt.status = pending`, so a second transition on an
//! already-terminated attempt fails closed with `NotFound` rather than
//! silently double-applying.

use std::sync::Arc;

use tracing::instrument;

use crate::domain::{
    attempt::AttemptStatus, money::Money, payment_system::SendResult, transaction::TransactionStatus, EngineError,
};
use crate::infrastructure::database::repositories::{AttemptRepository, InvoiceRepository, PaymentSystemRepository, TransactionRepository};

use super::scope::Scope;

pub struct AttemptEngine {
    attempt_repo: Arc<dyn AttemptRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    payment_system_repo: Arc<dyn PaymentSystemRepository>,
}

impl AttemptEngine {
    pub fn new(
        attempt_repo: Arc<dyn AttemptRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        payment_system_repo: Arc<dyn PaymentSystemRepository>,
    ) -> Self {
        Self {
            attempt_repo,
            transaction_repo,
            invoice_repo,
            payment_system_repo,
        }
    }

    #[instrument(skip(self, scope))]
    pub async fn success(&self, scope: &mut Scope<'_>, attempt_id: i64) -> Result<(), EngineError> {
        let (mut attempt, transaction, mut invoice) = self
            .attempt_repo
            .lock_pending_with_transaction_and_invoice(scope.conn(), attempt_id)
            .await?;

        let others = self
            .transaction_repo
            .lock_successful_for_invoice(scope.conn(), invoice.id)
            .await?;
        let paid_so_far = others.iter().fold(Money::ZERO, |acc, tx| acc + tx.effective_amount);

        attempt.status = AttemptStatus::Success;
        self.attempt_repo.update(scope.conn(), &attempt).await?;
        self.transaction_repo
            .update_status(scope.conn(), transaction.id, TransactionStatus::Success)
            .await?;

        let previous_status = invoice.status;
        if paid_so_far + transaction.effective_amount >= invoice.amount {
            invoice.mark_complete();
        } else {
            invoice.advance_past_pending();
        }
        if invoice.status != previous_status {
            self.invoice_repo.update_status(scope.conn(), invoice.id, invoice.status).await?;
        }

        Ok(())
    }

    #[instrument(skip(self, scope))]
    pub async fn fail(&self, scope: &mut Scope<'_>, attempt_id: i64) -> Result<(), EngineError> {
        self.terminate_as_failed(scope, attempt_id).await
    }

    /// A logical "error" report from a payment system; persisted identically
    /// to [`AttemptEngine::fail`], kept as a separate method for call-site
    /// clarity between an explicit decline and an unexpected fault.
    #[instrument(skip(self, scope))]
    pub async fn error(&self, scope: &mut Scope<'_>, attempt_id: i64) -> Result<(), EngineError> {
        self.terminate_as_failed(scope, attempt_id).await
    }

    async fn terminate_as_failed(&self, scope: &mut Scope<'_>, attempt_id: i64) -> Result<(), EngineError> {
        let (mut attempt, transaction, mut invoice) = self
            .attempt_repo
            .lock_pending_with_transaction_and_invoice(scope.conn(), attempt_id)
            .await?;

        attempt.status = AttemptStatus::Fail;
        self.attempt_repo.update(scope.conn(), &attempt).await?;
        self.transaction_repo
            .update_status(scope.conn(), transaction.id, TransactionStatus::Fail)
            .await?;

        let previous_status = invoice.status;
        invoice.advance_past_pending();
        if invoice.status != previous_status {
            self.invoice_repo.update_status(scope.conn(), invoice.id, invoice.status).await?;
        }

        Ok(())
    }

    pub async fn send(&self, scope: &mut Scope<'_>, payment_system_id: i64) -> Result<SendResult, EngineError> {
        let system = self.payment_system_repo.find_by_id(scope.conn(), payment_system_id).await?;
        Ok(system.send())
    }
}
