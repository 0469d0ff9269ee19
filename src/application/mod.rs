//! Application layer: the engines that orchestrate domain logic against the
//! repository traits, and the scope machinery every engine call threads
//! through.

pub mod attempt_engine;
pub mod invoice_engine;
pub mod scope;
pub mod transaction_engine;
pub mod webhook_ingestor;

pub use attempt_engine::AttemptEngine;
pub use invoice_engine::InvoiceEngine;
pub use scope::{run_scoped, Scope};
pub use transaction_engine::TransactionEngine;
pub use webhook_ingestor::WebhookIngestor;
