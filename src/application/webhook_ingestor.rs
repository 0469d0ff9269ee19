//! Webhook Ingestor (Visa): decrypt, JSON-decode, dispatch. The decrypted
//! plaintext never reaches a log line — only identifiers do.

use std::sync::Arc;

use serde::Deserialize;
use tracing::instrument;

use crate::domain::{payment_system::SystemType, EngineError};
use crate::infrastructure::crypto::PaymentCipher;
use crate::infrastructure::database::repositories::{AttemptRepository, PaymentSystemRepository};

use super::attempt_engine::AttemptEngine;
use super::scope::Scope;

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    attempt_id: i64,
    status: String,
}

/// Builds the cipher for a payment system's stored key. Injected so the
/// concrete AEAD primitive stays swappable without touching the ingestor.
pub type CipherFactory = dyn Fn(&[u8]) -> Result<Box<dyn PaymentCipher>, EngineError> + Send + Sync;

pub struct WebhookIngestor {
    payment_system_repo: Arc<dyn PaymentSystemRepository>,
    attempt_repo: Arc<dyn AttemptRepository>,
    attempt_engine: Arc<AttemptEngine>,
    cipher_factory: Arc<CipherFactory>,
}

impl WebhookIngestor {
    pub fn new(
        payment_system_repo: Arc<dyn PaymentSystemRepository>,
        attempt_repo: Arc<dyn AttemptRepository>,
        attempt_engine: Arc<AttemptEngine>,
        cipher_factory: Arc<CipherFactory>,
    ) -> Self {
        Self {
            payment_system_repo,
            attempt_repo,
            attempt_engine,
            cipher_factory,
        }
    }

    #[instrument(skip(self, scope, ciphertext))]
    pub async fn ingest(
        &self,
        scope: &mut Scope<'_>,
        payment_system_id: i64,
        ciphertext: &[u8],
    ) -> Result<(), EngineError> {
        let system = self
            .payment_system_repo
            .find_by_id_and_type(scope.conn(), payment_system_id, SystemType::Visa)
            .await?;

        let cipher = (self.cipher_factory)(&system.decryption_key)?;
        let plaintext = cipher.decrypt(ciphertext)?;

        let payload: WebhookPayload =
            serde_json::from_slice(&plaintext).map_err(|e| EngineError::Internal(e.to_string()))?;

        let (mut attempt, _transaction, _invoice) = self
            .attempt_repo
            .lock_pending_with_transaction_and_invoice(scope.conn(), payload.attempt_id)
            .await?;
        attempt.response = plaintext;
        self.attempt_repo.update(scope.conn(), &attempt).await?;

        match payload.status.as_str() {
            "success" => self.attempt_engine.success(scope, payload.attempt_id).await,
            "fail" => self.attempt_engine.fail(scope, payload.attempt_id).await,
            "error" => self.attempt_engine.error(scope, payload.attempt_id).await,
            other => Err(EngineError::Internal(format!("unknown webhook status: {other}"))),
        }
    }
}
