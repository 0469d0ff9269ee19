//! End-to-end settlement scenarios against a real Postgres instance.
//!
//! Requires `TEST_DATABASE_URL` to point at a database this process may
//! freely migrate and write to. Each test seeds its own currencies, wallets,
//! and invoices so tests never interfere with each other's rows.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use billing_engine::application::{AttemptEngine, InvoiceEngine, Scope, TransactionEngine, WebhookIngestor};
use billing_engine::domain::{money::Money, EngineError};
use billing_engine::infrastructure::crypto::{AesGcmPaymentCipher, PaymentCipher};
use billing_engine::infrastructure::database::repositories::{PostgresAttemptRepository, PostgresPaymentSystemRepository};

mod support;
use support::*;

/// Two external transactions, neither alone covering the invoice, together
/// complete it; completion only fires once the running total reaches the
/// invoice amount.
#[tokio::test]
async fn split_payment_completes_an_invoice_once_fully_paid() {
    let pool = pool().await;
    let usd = currency(&pool, "USD").await;
    let dest_wallet = wallet(&pool, Uuid::new_v4(), usd, dec!(0)).await;
    let invoice_id = invoice(&pool, usd, dec!(100), dest_wallet).await;
    let payment_system_id = payment_system(&pool, &[9u8; 32]).await;

    let invoices = invoice_engine(&pool);
    let transactions = transaction_engine();
    let attempts = attempt_engine();

    settle_external(&pool, &invoices, &transactions, &attempts, invoice_id, usd, payment_system_id, 60).await;
    assert_eq!(invoice_status(&pool, invoice_id).await, "incomplete");

    settle_external(&pool, &invoices, &transactions, &attempts, invoice_id, usd, payment_system_id, 40).await;
    assert_eq!(invoice_status(&pool, invoice_id).await, "complete");
}

/// A payer settling in a different currency than the invoice goes through
/// the conversion graph; the stored amounts reflect the configured rate.
#[tokio::test]
async fn cross_currency_external_transaction_converts_through_the_rate() {
    let pool = pool().await;
    let usd = currency(&pool, "USD").await;
    let eur = currency(&pool, "EUR").await;
    rate(&pool, usd, eur, dec!(2), false).await;

    let dest_wallet = wallet(&pool, Uuid::new_v4(), eur, dec!(0)).await;
    let invoice_id = invoice(&pool, eur, dec!(5), dest_wallet).await;

    let engine = invoice_engine(&pool);
    let mut scope = Scope::open(&pool).await.unwrap();
    let transaction = engine
        .create_transaction(&mut scope, invoice_id, usd, Some(Money::from_i64(10)), None)
        .await
        .unwrap()
        .expect("10 USD does not overpay a 5 EUR invoice");
    scope.commit().await.unwrap();

    assert_eq!(transaction.amount, Money::from_i64(10));
    assert_eq!(transaction.effective_amount, Money::from_i64(5));
}

/// An internal transfer the source wallet cannot afford fails the
/// transaction without moving either wallet's balance.
#[tokio::test]
async fn internal_transfer_with_insufficient_funds_fails_the_transaction() {
    let pool = pool().await;
    let usd = currency(&pool, "USD").await;
    let merchant = Uuid::new_v4();
    let source_wallet = wallet(&pool, merchant, usd, dec!(10)).await;
    let dest_wallet = wallet(&pool, Uuid::new_v4(), usd, dec!(0)).await;
    let invoice_id = invoice(&pool, usd, dec!(100), dest_wallet).await;

    let engine = invoice_engine(&pool);
    let mut scope = Scope::open(&pool).await.unwrap();
    let transaction = engine
        .pay_with_wallet(&mut scope, invoice_id, merchant, source_wallet, Some(Money::from_i64(50)), None)
        .await
        .unwrap()
        .expect("50 does not overpay a 100 invoice");
    scope.commit().await.unwrap();

    assert_eq!(format!("{:?}", transaction.status), "Fail");
    assert_eq!(wallet_balance(&pool, source_wallet).await, dec!(10));
    assert_eq!(wallet_balance(&pool, dest_wallet).await, dec!(0));
}

/// A fully-funded internal transfer settles immediately: both wallets move
/// and the invoice completes in the same call.
#[tokio::test]
async fn internal_transfer_with_sufficient_funds_settles_and_completes_invoice() {
    let pool = pool().await;
    let usd = currency(&pool, "USD").await;
    let merchant = Uuid::new_v4();
    let source_wallet = wallet(&pool, merchant, usd, dec!(100)).await;
    let dest_wallet = wallet(&pool, Uuid::new_v4(), usd, dec!(0)).await;
    let invoice_id = invoice(&pool, usd, dec!(100), dest_wallet).await;

    let engine = invoice_engine(&pool);
    let mut scope = Scope::open(&pool).await.unwrap();
    let transaction = engine
        .pay_with_wallet(&mut scope, invoice_id, merchant, source_wallet, Some(Money::from_i64(100)), None)
        .await
        .unwrap()
        .expect("100 does not overpay a 100 invoice");
    scope.commit().await.unwrap();

    assert_eq!(format!("{:?}", transaction.status), "Success");
    assert_eq!(wallet_balance(&pool, source_wallet).await, dec!(0));
    assert_eq!(wallet_balance(&pool, dest_wallet).await, dec!(100));
    assert_eq!(invoice_status(&pool, invoice_id).await, "complete");
}

/// A webhook callback settles the attempt it names; a second delivery of the
/// same payload is rejected, because the attempt is no longer pending.
#[tokio::test]
async fn webhook_settles_once_and_rejects_a_repeat_delivery() {
    let pool = pool().await;
    let usd = currency(&pool, "USD").await;
    let dest_wallet = wallet(&pool, Uuid::new_v4(), usd, dec!(0)).await;
    let invoice_id = invoice(&pool, usd, dec!(100), dest_wallet).await;
    let key = [3u8; 32];
    let payment_system_id = payment_system(&pool, &key).await;

    let invoices = invoice_engine(&pool);
    let transactions = transaction_engine();
    let attempt_engine = Arc::new(attempt_engine());

    let mut scope = Scope::open(&pool).await.unwrap();
    let transaction = invoices
        .create_transaction(&mut scope, invoice_id, usd, Some(Money::from_i64(100)), None)
        .await
        .unwrap()
        .unwrap();
    let attempt = transactions
        .create_attempt(&mut scope, transaction.id, payment_system_id)
        .await
        .unwrap();
    scope.commit().await.unwrap();

    let ciphertext = encrypt(&key, &format!("{{\"attempt_id\":{},\"status\":\"success\"}}", attempt.id));
    let ingestor = WebhookIngestor::new(
        Arc::new(PostgresPaymentSystemRepository),
        Arc::new(PostgresAttemptRepository),
        attempt_engine,
        Arc::new(|key: &[u8]| AesGcmPaymentCipher::new(key).map(|c| Box::new(c) as Box<dyn PaymentCipher>)),
    );

    let mut scope = Scope::open(&pool).await.unwrap();
    ingestor.ingest(&mut scope, payment_system_id, &ciphertext).await.unwrap();
    scope.commit().await.unwrap();

    assert_eq!(invoice_status(&pool, invoice_id).await, "complete");

    let mut scope = Scope::open(&pool).await.unwrap();
    let err = ingestor.ingest(&mut scope, payment_system_id, &ciphertext).await.unwrap_err();
    scope.rollback().await.ok();
    assert!(matches!(err, EngineError::NotFound(_)));
}

/// Creates an external transaction, attempts it, and reports the attempt
/// successful, all as separate logical requests.
#[allow(clippy::too_many_arguments)]
async fn settle_external(
    pool: &PgPool,
    invoices: &InvoiceEngine,
    transactions: &TransactionEngine,
    attempts: &AttemptEngine,
    invoice_id: i64,
    currency_id: i64,
    payment_system_id: i64,
    amount: i64,
) {
    let mut scope = Scope::open(pool).await.unwrap();
    let transaction = invoices
        .create_transaction(&mut scope, invoice_id, currency_id, Some(Money::from_i64(amount)), None)
        .await
        .unwrap()
        .expect("amount does not overpay");
    let attempt = transactions
        .create_attempt(&mut scope, transaction.id, payment_system_id)
        .await
        .unwrap();
    scope.commit().await.unwrap();

    let mut scope = Scope::open(pool).await.unwrap();
    attempts.success(&mut scope, attempt.id).await.unwrap();
    scope.commit().await.unwrap();
}

fn encrypt(key: &[u8; 32], plaintext: &str) -> Vec<u8> {
    use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
    use aes_gcm::{Aes256Gcm, Key};

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher.encrypt(&nonce, plaintext.as_bytes()).unwrap();
    let mut payload = nonce.to_vec();
    payload.extend_from_slice(&ciphertext);
    payload
}

async fn wallet_balance(pool: &PgPool, wallet_id: i64) -> Decimal {
    sqlx::query_scalar("SELECT amount FROM wallets WHERE id = $1")
        .bind(wallet_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
