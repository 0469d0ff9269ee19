//! Multi-currency billing and settlement core.
//!
//! Records merchant wallets, issues invoices, and settles them through
//! transactions and attempts against pluggable external payment systems,
//! under concurrent requests against the same invoice. HTTP routing, auth,
//! and the relational store itself are out of scope here; this crate exposes
//! [`Config`], the engine structs, and the repository traits they depend on,
//! for a caller to wire into a server.
//!
//! # Architecture
//!
//! - `domain` — entities, invariants, and [`domain::EngineError`]. No I/O.
//! - `application` — the engines (`InvoiceEngine`, `TransactionEngine`,
//!   `AttemptEngine`, `WebhookIngestor`) and the [`application::Scope`] they
//!   thread through.
//! - `infrastructure` — Postgres repository implementations and the webhook
//!   cipher adapter.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{run_scoped, AttemptEngine, InvoiceEngine, Scope, TransactionEngine, WebhookIngestor};
pub use config::Config;
pub use domain::EngineError;
