//! Attempts: one externally-mediated try to complete a transaction via a
//! payment system. Terminal statuses are sinks: a terminal attempt never
//! moves again.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Pending,
    Success,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub token: Uuid,
    #[serde(with = "response_as_base64")]
    pub response: Vec<u8>,
    pub status: AttemptStatus,
    pub transaction_id: i64,
    pub payment_system_id: i64,
}

impl Attempt {
    pub fn new(id: i64, transaction_id: i64, payment_system_id: i64) -> Self {
        Self {
            id,
            token: Uuid::new_v4(),
            response: Vec::new(),
            status: AttemptStatus::Pending,
            transaction_id,
            payment_system_id,
        }
    }

}

mod response_as_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_attempt_is_pending() {
        let attempt = Attempt::new(1, 1, 1);
        assert_eq!(attempt.status, AttemptStatus::Pending);
    }
}
