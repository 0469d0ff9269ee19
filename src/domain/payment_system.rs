//! Registered external payment systems.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemType {
    Visa,
}

/// `decryption_key` is the symmetric key used to authenticate and decrypt
/// this system's webhook callbacks; it never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSystem {
    pub id: i64,
    pub name: String,
    pub system_type: SystemType,
    #[serde(skip_serializing)]
    pub decryption_key: Vec<u8>,
}

/// What a payer sees when enumerating the payment systems available for a
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSystemDescriptor {
    pub id: i64,
    pub name: String,
    pub system_type: SystemType,
}

impl From<&PaymentSystem> for PaymentSystemDescriptor {
    fn from(system: &PaymentSystem) -> Self {
        Self {
            id: system.id,
            name: system.name.clone(),
            system_type: system.system_type,
        }
    }
}

/// What initiating an attempt hands back to the payer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SendResult {
    Url(String),
    Error(String),
}

impl PaymentSystem {
    /// Builds the redirect/approval response for initiating an attempt.
    pub fn send(&self) -> SendResult {
        match self.system_type {
            SystemType::Visa => SendResult::Url(format!("https://pay.example/visa/{}", self.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visa_send_returns_a_url() {
        let system = PaymentSystem {
            id: 7,
            name: "Visa".into(),
            system_type: SystemType::Visa,
            decryption_key: vec![0; 32],
        };
        match system.send() {
            SendResult::Url(url) => assert!(url.contains("7")),
            SendResult::Error(_) => panic!("expected url"),
        }
    }
}
