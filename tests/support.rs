//! Shared fixtures for the settlement scenario tests: a migrated pool and
//! thin seeding helpers over the raw schema.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use billing_engine::application::{AttemptEngine, InvoiceEngine, TransactionEngine};
use billing_engine::domain::RateCache;
use billing_engine::infrastructure::database::repositories::{
    PostgresAttemptRepository, PostgresCurrencyRepository, PostgresInvoiceRepository,
    PostgresPaymentSystemRepository, PostgresTransactionRepository, PostgresWalletRepository,
};

pub async fn pool() -> PgPool {
    let database_url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/billing_engine_test".to_string());
    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    sqlx::query(
        "TRUNCATE TABLE attempts, transactions, invoices, wallets, conversion_rates, currencies, payment_systems RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .expect("failed to reset test database state");
    pool
}

pub async fn currency(pool: &PgPool, code: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO currencies (code) VALUES ($1) RETURNING id")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn rate(pool: &PgPool, from: i64, to: i64, rate: Decimal, allow_reversed: bool) {
    sqlx::query(
        "INSERT INTO conversion_rates (from_currency, to_currency, rate, allow_reversed) VALUES ($1, $2, $3, $4)",
    )
    .bind(from)
    .bind(to)
    .bind(rate)
    .bind(allow_reversed)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn wallet(pool: &PgPool, merchant_id: Uuid, currency_id: i64, amount: Decimal) -> i64 {
    sqlx::query_scalar("INSERT INTO wallets (merchant_id, currency_id, amount) VALUES ($1, $2, $3) RETURNING id")
        .bind(merchant_id)
        .bind(currency_id)
        .bind(amount)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn invoice(pool: &PgPool, currency_id: i64, amount: Decimal, to_wallet: i64) -> i64 {
    sqlx::query_scalar("INSERT INTO invoices (amount, currency_id, to_wallet) VALUES ($1, $2, $3) RETURNING id")
        .bind(amount)
        .bind(currency_id)
        .bind(to_wallet)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn invoice_status(pool: &PgPool, invoice_id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn payment_system(pool: &PgPool, key: &[u8]) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO payment_systems (name, system_type, decryption_key) VALUES ($1, 'visa', $2) RETURNING id",
    )
    .bind("Visa")
    .bind(key)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn invoice_engine(pool: &PgPool) -> InvoiceEngine {
    let _ = pool;
    InvoiceEngine::new(
        Arc::new(PostgresCurrencyRepository),
        Arc::new(PostgresWalletRepository),
        Arc::new(PostgresInvoiceRepository),
        Arc::new(PostgresTransactionRepository),
        Arc::new(RateCache::new(3600)),
    )
}

pub fn transaction_engine() -> TransactionEngine {
    TransactionEngine::new(
        Arc::new(PostgresTransactionRepository),
        Arc::new(PostgresInvoiceRepository),
        Arc::new(PostgresAttemptRepository),
        Arc::new(PostgresPaymentSystemRepository),
    )
}

pub fn attempt_engine() -> AttemptEngine {
    AttemptEngine::new(
        Arc::new(PostgresAttemptRepository),
        Arc::new(PostgresTransactionRepository),
        Arc::new(PostgresInvoiceRepository),
        Arc::new(PostgresPaymentSystemRepository),
    )
}
