//! Webhook payload decryption.
//!
//! Each payment system calls back with an encrypted body; decrypting it is
//! the one step the engine delegates to an external collaborator rather than
//! owning outright. [`PaymentCipher`] is that seam — a single method, so the
//! concrete AEAD primitive behind it can change without touching the
//! ingestor. [`AesGcmPaymentCipher`] is the concrete adapter: a 96-bit nonce
//! prepended to the ciphertext, decrypted and authenticated with AES-256-GCM
//! under the payment system's stored key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::domain::EngineError;

const NONCE_LEN: usize = 12;

pub trait PaymentCipher: Send + Sync {
    fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, EngineError>;
}

pub struct AesGcmPaymentCipher {
    cipher: Aes256Gcm,
}

impl AesGcmPaymentCipher {
    pub fn new(key: &[u8]) -> Result<Self, EngineError> {
        if key.len() != 32 {
            return Err(EngineError::Internal(format!(
                "payment system key must be 32 bytes for AES-256-GCM, got {}",
                key.len()
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(key);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }
}

impl PaymentCipher for AesGcmPaymentCipher {
    fn decrypt(&self, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
        if payload.len() < NONCE_LEN {
            return Err(EngineError::DecryptionError);
        }
        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| EngineError::DecryptionError)
    }
}
