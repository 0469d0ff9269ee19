//! Row shapes for the relational store. These structs exist only to carry
//! `sqlx::FromRow` data between a query and the domain type; every business
//! rule lives on the domain types themselves.

use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    attempt::{Attempt, AttemptStatus},
    currency::{ConversionRate, Currency, CurrencyCode},
    invoice::{Invoice, InvoiceStatus},
    money::Money,
    payment_system::{PaymentSystem, SystemType},
    transaction::{Transaction, TransactionKind, TransactionStatus},
    wallet::Wallet,
    EngineError,
};

#[derive(Debug, FromRow)]
pub struct CurrencyRow {
    pub id: i64,
    pub code: String,
}

impl CurrencyRow {
    pub fn into_domain(self) -> Result<Currency, EngineError> {
        let code: CurrencyCode = self
            .code
            .parse()
            .map_err(|e: crate::domain::currency::UnknownCurrencyCode| EngineError::Internal(e.to_string()))?;
        Ok(Currency { id: self.id, code })
    }
}

#[derive(Debug, FromRow)]
pub struct ConversionRateRow {
    pub from_currency: i64,
    pub to_currency: i64,
    pub rate: Decimal,
    pub allow_reversed: bool,
}

impl From<ConversionRateRow> for ConversionRate {
    fn from(row: ConversionRateRow) -> Self {
        ConversionRate::new(row.from_currency, row.to_currency, row.rate, row.allow_reversed)
    }
}

#[derive(Debug, FromRow)]
pub struct WalletRow {
    pub id: i64,
    pub merchant_id: Uuid,
    pub currency_id: i64,
    pub amount: Decimal,
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Wallet {
            id: row.id,
            merchant_id: row.merchant_id,
            currency_id: row.currency_id,
            amount: Money::new(row.amount),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct InvoiceRow {
    pub id: i64,
    pub token: Uuid,
    pub amount: Decimal,
    pub currency_id: i64,
    pub status: String,
    pub to_wallet: i64,
}

impl InvoiceRow {
    pub fn into_domain(self) -> Result<Invoice, EngineError> {
        Ok(Invoice {
            id: self.id,
            token: self.token,
            amount: Money::new(self.amount),
            currency_id: self.currency_id,
            status: parse_invoice_status(&self.status)?,
            to_wallet: self.to_wallet,
        })
    }
}

fn parse_invoice_status(s: &str) -> Result<InvoiceStatus, EngineError> {
    match s {
        "pending" => Ok(InvoiceStatus::Pending),
        "incomplete" => Ok(InvoiceStatus::Incomplete),
        "complete" => Ok(InvoiceStatus::Complete),
        other => Err(EngineError::Internal(format!("unknown invoice status in database: {other}"))),
    }
}

pub fn invoice_status_to_db(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Pending => "pending",
        InvoiceStatus::Incomplete => "incomplete",
        InvoiceStatus::Complete => "complete",
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub token: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub effective_amount: Decimal,
    pub status: String,
    pub invoice_id: i64,
    pub from_wallet: Option<i64>,
}

impl TransactionRow {
    pub fn into_domain(self) -> Result<Transaction, EngineError> {
        Ok(Transaction {
            id: self.id,
            token: self.token,
            kind: parse_transaction_kind(&self.kind)?,
            amount: Money::new(self.amount),
            effective_amount: Money::new(self.effective_amount),
            status: parse_transaction_status(&self.status)?,
            invoice_id: self.invoice_id,
            from_wallet: self.from_wallet,
        })
    }
}

fn parse_transaction_kind(s: &str) -> Result<TransactionKind, EngineError> {
    match s {
        "external" => Ok(TransactionKind::External),
        "internal" => Ok(TransactionKind::Internal),
        other => Err(EngineError::Internal(format!("unknown transaction kind in database: {other}"))),
    }
}

pub fn transaction_kind_to_db(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::External => "external",
        TransactionKind::Internal => "internal",
    }
}

fn parse_transaction_status(s: &str) -> Result<TransactionStatus, EngineError> {
    match s {
        "pending" => Ok(TransactionStatus::Pending),
        "success" => Ok(TransactionStatus::Success),
        "fail" => Ok(TransactionStatus::Fail),
        "refunded" => Ok(TransactionStatus::Refunded),
        other => Err(EngineError::Internal(format!("unknown transaction status in database: {other}"))),
    }
}

pub fn transaction_status_to_db(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "pending",
        TransactionStatus::Success => "success",
        TransactionStatus::Fail => "fail",
        TransactionStatus::Refunded => "refunded",
    }
}

#[derive(Debug, FromRow)]
pub struct AttemptRow {
    pub id: i64,
    pub token: Uuid,
    pub response: Vec<u8>,
    pub status: String,
    pub transaction_id: i64,
    pub payment_system_id: i64,
}

impl AttemptRow {
    pub fn into_domain(self) -> Result<Attempt, EngineError> {
        Ok(Attempt {
            id: self.id,
            token: self.token,
            response: self.response,
            status: parse_attempt_status(&self.status)?,
            transaction_id: self.transaction_id,
            payment_system_id: self.payment_system_id,
        })
    }
}

fn parse_attempt_status(s: &str) -> Result<AttemptStatus, EngineError> {
    match s {
        "pending" => Ok(AttemptStatus::Pending),
        "success" => Ok(AttemptStatus::Success),
        "fail" => Ok(AttemptStatus::Fail),
        other => Err(EngineError::Internal(format!("unknown attempt status in database: {other}"))),
    }
}

pub fn attempt_status_to_db(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Pending => "pending",
        AttemptStatus::Success => "success",
        AttemptStatus::Fail => "fail",
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentSystemRow {
    pub id: i64,
    pub name: String,
    pub system_type: String,
    pub decryption_key: Vec<u8>,
}

impl PaymentSystemRow {
    pub fn into_domain(self) -> Result<PaymentSystem, EngineError> {
        Ok(PaymentSystem {
            id: self.id,
            name: self.name,
            system_type: parse_system_type(&self.system_type)?,
            decryption_key: self.decryption_key,
        })
    }
}

fn parse_system_type(s: &str) -> Result<SystemType, EngineError> {
    match s {
        "visa" => Ok(SystemType::Visa),
        other => Err(EngineError::Internal(format!("unknown payment system type in database: {other}"))),
    }
}
