//! Postgres-backed repositories for the settlement engine.
//!
//! Every method takes the live connection explicitly (`&mut PgConnection`,
//! borrowed from the caller's [`crate::application::scope::Scope`]) rather
//! than owning a pool, so that a whole request's reads and writes run inside
//! one `SERIALIZABLE` transaction. Locking queries use `SELECT ... FOR
//! UPDATE` to serialize concurrent writers on the rows a request touches.

use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::{
    attempt::Attempt,
    currency::{ConversionRate, Currency},
    invoice::{Invoice, InvoiceStatus},
    money::Money,
    payment_system::PaymentSystem,
    transaction::{Transaction, TransactionStatus},
    wallet::{MerchantId, Wallet},
    EngineError,
};

use super::models::{
    attempt_status_to_db, invoice_status_to_db, transaction_kind_to_db, transaction_status_to_db, AttemptRow,
    ConversionRateRow, CurrencyRow, InvoiceRow, PaymentSystemRow, TransactionRow, WalletRow,
};

#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    async fn load_all_rates(&self, conn: &mut PgConnection) -> Result<Vec<ConversionRate>, EngineError>;

    /// Every currency the engine knows, for callers building a currency
    /// picker or validating a code before it reaches `currency_id`-keyed
    /// operations.
    async fn list(&self, conn: &mut PgConnection) -> Result<Vec<Currency>, EngineError>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Locks and returns the destination wallet for an invoice's `to_wallet`.
    async fn lock_by_id(&self, conn: &mut PgConnection, wallet_id: i64) -> Result<Wallet, EngineError>;

    /// Locks a wallet the caller claims to own, failing closed on mismatch
    /// rather than on absence, so a wrong owner looks the same as missing.
    async fn lock_owned_by(
        &self,
        conn: &mut PgConnection,
        merchant_id: MerchantId,
        wallet_id: i64,
    ) -> Result<Wallet, EngineError>;

    async fn update_amount(&self, conn: &mut PgConnection, wallet_id: i64, amount: Money) -> Result<(), EngineError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn lock_by_id(&self, conn: &mut PgConnection, invoice_id: i64) -> Result<Invoice, EngineError>;
    async fn find_by_token(&self, conn: &mut PgConnection, token: Uuid) -> Result<Invoice, EngineError>;
    async fn update_status(&self, conn: &mut PgConnection, invoice_id: i64, status: InvoiceStatus) -> Result<(), EngineError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Locks every `Success` transaction against an invoice, used to compute
    /// how much of it has already been paid.
    async fn lock_successful_for_invoice(
        &self,
        conn: &mut PgConnection,
        invoice_id: i64,
    ) -> Result<Vec<Transaction>, EngineError>;

    async fn insert(&self, conn: &mut PgConnection, transaction: &Transaction) -> Result<Transaction, EngineError>;

    async fn lock_by_id(&self, conn: &mut PgConnection, transaction_id: i64) -> Result<Transaction, EngineError>;

    async fn lock_by_id_with_invoice(
        &self,
        conn: &mut PgConnection,
        transaction_id: i64,
    ) -> Result<(Transaction, Invoice), EngineError>;

    async fn find_by_token(&self, conn: &mut PgConnection, token: Uuid) -> Result<Transaction, EngineError>;

    async fn update_status(
        &self,
        conn: &mut PgConnection,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<(), EngineError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn insert(&self, conn: &mut PgConnection, attempt: &Attempt) -> Result<Attempt, EngineError>;

    /// Locks an attempt together with its transaction and that transaction's
    /// invoice, failing if the attempt is not `Pending`.
    async fn lock_pending_with_transaction_and_invoice(
        &self,
        conn: &mut PgConnection,
        attempt_id: i64,
    ) -> Result<(Attempt, Transaction, Invoice), EngineError>;

    async fn update(&self, conn: &mut PgConnection, attempt: &Attempt) -> Result<(), EngineError>;
}

#[async_trait]
pub trait PaymentSystemRepository: Send + Sync {
    async fn find_by_id(&self, conn: &mut PgConnection, payment_system_id: i64) -> Result<PaymentSystem, EngineError>;

    async fn find_by_id_and_type(
        &self,
        conn: &mut PgConnection,
        payment_system_id: i64,
        system_type: crate::domain::payment_system::SystemType,
    ) -> Result<PaymentSystem, EngineError>;

    async fn list(&self, conn: &mut PgConnection) -> Result<Vec<PaymentSystem>, EngineError>;
}

pub struct PostgresCurrencyRepository;

#[async_trait]
impl CurrencyRepository for PostgresCurrencyRepository {
    async fn load_all_rates(&self, conn: &mut PgConnection) -> Result<Vec<ConversionRate>, EngineError> {
        let rows: Vec<ConversionRateRow> =
            sqlx::query_as("SELECT from_currency, to_currency, rate, allow_reversed FROM conversion_rates")
                .fetch_all(conn)
                .await?;
        Ok(rows.into_iter().map(ConversionRate::from).collect())
    }

    async fn list(&self, conn: &mut PgConnection) -> Result<Vec<Currency>, EngineError> {
        let rows: Vec<CurrencyRow> = sqlx::query_as("SELECT id, code FROM currencies").fetch_all(conn).await?;
        rows.into_iter().map(CurrencyRow::into_domain).collect()
    }
}

pub struct PostgresWalletRepository;

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    async fn lock_by_id(&self, conn: &mut PgConnection, wallet_id: i64) -> Result<Wallet, EngineError> {
        let row: WalletRow = sqlx::query_as(
            "SELECT id, merchant_id, currency_id, amount FROM wallets WHERE id = $1 FOR UPDATE",
        )
        .bind(wallet_id)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    async fn lock_owned_by(
        &self,
        conn: &mut PgConnection,
        merchant_id: MerchantId,
        wallet_id: i64,
    ) -> Result<Wallet, EngineError> {
        let row: WalletRow = sqlx::query_as(
            "SELECT id, merchant_id, currency_id, amount FROM wallets WHERE id = $1 AND merchant_id = $2 FOR UPDATE",
        )
        .bind(wallet_id)
        .bind(merchant_id)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    async fn update_amount(&self, conn: &mut PgConnection, wallet_id: i64, amount: Money) -> Result<(), EngineError> {
        sqlx::query("UPDATE wallets SET amount = $1 WHERE id = $2")
            .bind(amount.as_decimal())
            .bind(wallet_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

pub struct PostgresInvoiceRepository;

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn lock_by_id(&self, conn: &mut PgConnection, invoice_id: i64) -> Result<Invoice, EngineError> {
        let row: InvoiceRow = sqlx::query_as(
            "SELECT id, token, amount, currency_id, status, to_wallet FROM invoices WHERE id = $1 FOR UPDATE",
        )
        .bind(invoice_id)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn find_by_token(&self, conn: &mut PgConnection, token: Uuid) -> Result<Invoice, EngineError> {
        let row: InvoiceRow = sqlx::query_as(
            "SELECT id, token, amount, currency_id, status, to_wallet FROM invoices WHERE token = $1",
        )
        .bind(token)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn update_status(&self, conn: &mut PgConnection, invoice_id: i64, status: InvoiceStatus) -> Result<(), EngineError> {
        sqlx::query("UPDATE invoices SET status = $1 WHERE id = $2")
            .bind(invoice_status_to_db(status))
            .bind(invoice_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

pub struct PostgresTransactionRepository;

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn lock_successful_for_invoice(
        &self,
        conn: &mut PgConnection,
        invoice_id: i64,
    ) -> Result<Vec<Transaction>, EngineError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT id, token, kind, amount, effective_amount, status, invoice_id, from_wallet \
             FROM transactions WHERE invoice_id = $1 AND status = 'success' FOR UPDATE",
        )
        .bind(invoice_id)
        .fetch_all(conn)
        .await?;
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn insert(&self, conn: &mut PgConnection, transaction: &Transaction) -> Result<Transaction, EngineError> {
        let row: TransactionRow = sqlx::query_as(
            "INSERT INTO transactions (token, kind, amount, effective_amount, status, invoice_id, from_wallet) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, token, kind, amount, effective_amount, status, invoice_id, from_wallet",
        )
        .bind(transaction.token)
        .bind(transaction_kind_to_db(transaction.kind))
        .bind(transaction.amount.as_decimal())
        .bind(transaction.effective_amount.as_decimal())
        .bind(transaction_status_to_db(transaction.status))
        .bind(transaction.invoice_id)
        .bind(transaction.from_wallet)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn lock_by_id(&self, conn: &mut PgConnection, transaction_id: i64) -> Result<Transaction, EngineError> {
        let row: TransactionRow = sqlx::query_as(
            "SELECT id, token, kind, amount, effective_amount, status, invoice_id, from_wallet \
             FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn lock_by_id_with_invoice(
        &self,
        conn: &mut PgConnection,
        transaction_id: i64,
    ) -> Result<(Transaction, Invoice), EngineError> {
        let tx_row: TransactionRow = sqlx::query_as(
            "SELECT id, token, kind, amount, effective_amount, status, invoice_id, from_wallet \
             FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_one(&mut *conn)
        .await?;
        let invoice_id = tx_row.invoice_id;
        let invoice_row: InvoiceRow = sqlx::query_as(
            "SELECT id, token, amount, currency_id, status, to_wallet FROM invoices WHERE id = $1 FOR UPDATE",
        )
        .bind(invoice_id)
        .fetch_one(conn)
        .await?;
        Ok((tx_row.into_domain()?, invoice_row.into_domain()?))
    }

    async fn find_by_token(&self, conn: &mut PgConnection, token: Uuid) -> Result<Transaction, EngineError> {
        let row: TransactionRow = sqlx::query_as(
            "SELECT id, token, kind, amount, effective_amount, status, invoice_id, from_wallet \
             FROM transactions WHERE token = $1",
        )
        .bind(token)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn update_status(
        &self,
        conn: &mut PgConnection,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> Result<(), EngineError> {
        sqlx::query("UPDATE transactions SET status = $1 WHERE id = $2")
            .bind(transaction_status_to_db(status))
            .bind(transaction_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

pub struct PostgresAttemptRepository;

#[async_trait]
impl AttemptRepository for PostgresAttemptRepository {
    async fn insert(&self, conn: &mut PgConnection, attempt: &Attempt) -> Result<Attempt, EngineError> {
        let row: AttemptRow = sqlx::query_as(
            "INSERT INTO attempts (token, response, status, transaction_id, payment_system_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, token, response, status, transaction_id, payment_system_id",
        )
        .bind(attempt.token)
        .bind(&attempt.response)
        .bind(attempt_status_to_db(attempt.status))
        .bind(attempt.transaction_id)
        .bind(attempt.payment_system_id)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn lock_pending_with_transaction_and_invoice(
        &self,
        conn: &mut PgConnection,
        attempt_id: i64,
    ) -> Result<(Attempt, Transaction, Invoice), EngineError> {
        let attempt_row: AttemptRow = sqlx::query_as(
            "SELECT id, token, response, status, transaction_id, payment_system_id \
             FROM attempts WHERE id = $1 AND status = 'pending' FOR UPDATE",
        )
        .bind(attempt_id)
        .fetch_one(&mut *conn)
        .await?;
        let transaction_id = attempt_row.transaction_id;
        let tx_row: TransactionRow = sqlx::query_as(
            "SELECT id, token, kind, amount, effective_amount, status, invoice_id, from_wallet \
             FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_one(&mut *conn)
        .await?;
        let invoice_id = tx_row.invoice_id;
        let invoice_row: InvoiceRow = sqlx::query_as(
            "SELECT id, token, amount, currency_id, status, to_wallet FROM invoices WHERE id = $1 FOR UPDATE",
        )
        .bind(invoice_id)
        .fetch_one(conn)
        .await?;
        Ok((
            attempt_row.into_domain()?,
            tx_row.into_domain()?,
            invoice_row.into_domain()?,
        ))
    }

    async fn update(&self, conn: &mut PgConnection, attempt: &Attempt) -> Result<(), EngineError> {
        sqlx::query("UPDATE attempts SET response = $1, status = $2 WHERE id = $3")
            .bind(&attempt.response)
            .bind(attempt_status_to_db(attempt.status))
            .bind(attempt.id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

pub struct PostgresPaymentSystemRepository;

#[async_trait]
impl PaymentSystemRepository for PostgresPaymentSystemRepository {
    async fn find_by_id(&self, conn: &mut PgConnection, payment_system_id: i64) -> Result<PaymentSystem, EngineError> {
        let row: PaymentSystemRow =
            sqlx::query_as("SELECT id, name, system_type, decryption_key FROM payment_systems WHERE id = $1")
                .bind(payment_system_id)
                .fetch_one(conn)
                .await?;
        row.into_domain()
    }

    async fn find_by_id_and_type(
        &self,
        conn: &mut PgConnection,
        payment_system_id: i64,
        system_type: crate::domain::payment_system::SystemType,
    ) -> Result<PaymentSystem, EngineError> {
        let type_str = match system_type {
            crate::domain::payment_system::SystemType::Visa => "visa",
        };
        let row: PaymentSystemRow = sqlx::query_as(
            "SELECT id, name, system_type, decryption_key FROM payment_systems WHERE id = $1 AND system_type = $2",
        )
        .bind(payment_system_id)
        .bind(type_str)
        .fetch_one(conn)
        .await?;
        row.into_domain()
    }

    async fn list(&self, conn: &mut PgConnection) -> Result<Vec<PaymentSystem>, EngineError> {
        let rows: Vec<PaymentSystemRow> =
            sqlx::query_as("SELECT id, name, system_type, decryption_key FROM payment_systems")
                .fetch_all(conn)
                .await?;
        rows.into_iter().map(PaymentSystemRow::into_domain).collect()
    }
}
