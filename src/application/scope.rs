//! Scoped serializable transactions.
//!
//! A request session is acquired ambiently in some designs (a
//! dynamically-scoped variable bound for the life of a request) and released
//! on exit. Rust has no dynamic scoping that survives `.await` points safely,
//! so the ambient session becomes an explicit value: [`Scope`] owns the one
//! `SERIALIZABLE` transaction for an entire logical request, and nested
//! engine calls simply borrow it (`&mut Scope<'_>`) instead of opening their
//! own. Nesting is then free: there is nothing for an inner call to open or
//! close.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::domain::EngineError;

/// One `SERIALIZABLE` transaction, held open for the life of a single
/// outermost engine operation (and everything it calls).
pub struct Scope<'c> {
    tx: Option<Transaction<'c, Postgres>>,
}

impl<'c> Scope<'c> {
    /// Opens the outermost scope. Call this once per request; pass `&mut
    /// scope` into every engine call made within that request.
    pub async fn open(pool: &'c PgPool) -> Result<Self, EngineError> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Self { tx: Some(tx) })
    }

    /// The live connection, for issuing locking queries against.
    pub fn conn(&mut self) -> &mut PgConnection {
        self.tx.as_mut().expect("scope used after commit/rollback")
    }

    /// Commits if called on the outermost scope after no error escaped.
    pub async fn commit(mut self) -> Result<(), EngineError> {
        let tx = self.tx.take().expect("scope used after commit/rollback");
        tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), EngineError> {
        let tx = self.tx.take().expect("scope used after commit/rollback");
        tx.rollback().await?;
        Ok(())
    }
}

/// Runs `body` inside a fresh outermost scope: commits on `Ok`, rolls back on
/// `Err`. Lifts that commit/rollback decision out of every call site.
pub async fn run_scoped<T, F, Fut>(pool: &PgPool, body: F) -> Result<T, EngineError>
where
    F: FnOnce(&mut Scope<'_>) -> Fut,
    Fut: std::future::Future<Output = Result<T, EngineError>>,
{
    let mut scope = Scope::open(pool).await?;
    match body(&mut scope).await {
        Ok(value) => {
            scope.commit().await?;
            Ok(value)
        }
        Err(err) => {
            let _ = scope.rollback().await;
            Err(err)
        }
    }
}
