//! Storage capability shared by plain pool access and open transactions.
//!
//! Repositories are written against [`Execer`] and never care whether they
//! run on a pooled connection ([`Db`]) or inside a transaction ([`DbTx`]).
//! Every call is timed and recorded in the owning request's
//! [`RequestMetrics`].

use std::time::Instant;

use async_trait::async_trait;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteQueryResult, SqliteRow};
use sqlx::{Execute, FromRow, SqlitePool, Transaction};

use super::metrics::RequestMetrics;

const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// Query and exec operations available on every storage handle.
#[async_trait]
pub trait Execer: Send {
    /// Runs a query expected to yield at most one row.
    async fn fetch_optional<'q, T>(
        &mut self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::Result<Option<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, SqliteRow>;

    /// Runs a query and collects every row.
    async fn fetch_all<'q, T>(
        &mut self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::Result<Vec<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, SqliteRow>;

    /// Runs a statement that returns no rows.
    async fn execute<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::Result<SqliteQueryResult>;
}

/// Per-request handle on the shared connection pool.
///
/// Each call checks a connection out of the pool for its own duration only.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
    metrics: RequestMetrics,
}

impl Db {
    pub fn new(pool: SqlitePool, metrics: RequestMetrics) -> Self {
        Self { pool, metrics }
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Opens a write transaction on a dedicated pooled connection.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`), so concurrent
    /// writers queue on the busy timeout instead of failing to upgrade a
    /// read snapshot. The transaction rolls back when dropped without
    /// [`DbTx::commit`], including when the request future is cancelled.
    pub async fn begin(&self) -> sqlx::Result<DbTx> {
        let start = Instant::now();
        let tx = self.pool.begin_with(BEGIN_IMMEDIATE).await;
        self.metrics.record(BEGIN_IMMEDIATE, start.elapsed());

        Ok(DbTx {
            tx: tx?,
            metrics: self.metrics.clone(),
        })
    }
}

#[async_trait]
impl Execer for Db {
    async fn fetch_optional<'q, T>(
        &mut self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::Result<Option<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        let sql = query.sql();
        let start = Instant::now();
        let result = query.fetch_optional(&self.pool).await;
        self.metrics.record(sql, start.elapsed());
        result
    }

    async fn fetch_all<'q, T>(
        &mut self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::Result<Vec<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        let sql = query.sql();
        let start = Instant::now();
        let result = query.fetch_all(&self.pool).await;
        self.metrics.record(sql, start.elapsed());
        result
    }

    async fn execute<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::Result<SqliteQueryResult> {
        let sql = query.sql();
        let start = Instant::now();
        let result = query.execute(&self.pool).await;
        self.metrics.record(sql, start.elapsed());
        result
    }
}

/// Open transaction bound to one request.
#[derive(Debug)]
pub struct DbTx {
    tx: Transaction<'static, Sqlite>,
    metrics: RequestMetrics,
}

impl DbTx {
    pub async fn commit(self) -> sqlx::Result<()> {
        let start = Instant::now();
        let result = self.tx.commit().await;
        self.metrics.record("COMMIT", start.elapsed());
        result
    }

    pub async fn rollback(self) -> sqlx::Result<()> {
        let start = Instant::now();
        let result = self.tx.rollback().await;
        self.metrics.record("ROLLBACK", start.elapsed());
        result
    }
}

#[async_trait]
impl Execer for DbTx {
    async fn fetch_optional<'q, T>(
        &mut self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::Result<Option<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        let sql = query.sql();
        let start = Instant::now();
        let result = query.fetch_optional(&mut *self.tx).await;
        self.metrics.record(sql, start.elapsed());
        result
    }

    async fn fetch_all<'q, T>(
        &mut self,
        query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    ) -> sqlx::Result<Vec<T>>
    where
        T: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        let sql = query.sql();
        let start = Instant::now();
        let result = query.fetch_all(&mut *self.tx).await;
        self.metrics.record(sql, start.elapsed());
        result
    }

    async fn execute<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::Result<SqliteQueryResult> {
        let sql = query.sql();
        let start = Instant::now();
        let result = query.execute(&mut *self.tx).await;
        self.metrics.record(sql, start.elapsed());
        result
    }
}
