//! A client wrapper with named-parameter entry points.
//!
//! `NamedClient` wraps any [`GenericClient`] (a `tokio_postgres::Client`, a transaction, or a
//! pooled connection) and adds `named_*` methods that take `:name` SQL plus an
//! [`ArgumentBag`]. The wrapped client stays reachable through `Deref`, so its own
//! positional API is unchanged.
//!
//! # Example
//!
//! ```ignore
//! use pgnamed::{NamedArgs, NamedClient, ClientConfig};
//! use std::time::Duration;
//!
//! let pg = pgnamed::connect_with_config(&database_url, ClientConfig::new()
//!     .timeout(Duration::from_secs(5))).await?;
//!
//! pg.named_execute(
//!     "INSERT INTO test(id, test_1, test_2) VALUES (:id, :test_1, :test_2)",
//!     &NamedArgs::new().set("id", 1_i32).set("test_1", "1").set("test_2", "2"),
//! ).await?;
//!
//! let rows = pg.named_fetch("SELECT * FROM test WHERE id = :id", &NamedArgs::new().set("id", 1_i32)).await?;
//! ```

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::config::ClientConfig;
use crate::error::{NamedError, NamedResult};
use crate::params::{ArgumentBag, SqlArg};
use crate::row::FromRow;
use crate::statement::{Cursor, NamedStatement};
use std::ops::Deref;
use tokio_postgres::types::{FromSql, ToSql};
use tokio_postgres::{Row, Statement, Transaction};

/// A client with named-parameter entry points, per-call timeouts and SQL debug events.
pub struct NamedClient<C> {
    client: C,
    config: ClientConfig,
}

impl<C: GenericClient> NamedClient<C> {
    /// Wrap `client` with default configuration.
    pub fn new(client: C) -> Self {
        Self::with_config(client, ClientConfig::default())
    }

    /// Wrap `client` with custom configuration.
    pub fn with_config(client: C, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the underlying client.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Consume the wrapper and return the underlying client.
    pub fn into_inner(self) -> C {
        self.client
    }

    /// Translate `sql` and compile it on this connection.
    pub async fn prepare(&self, sql: &str) -> NamedResult<NamedStatement> {
        NamedStatement::prepare(self, sql).await
    }

    // ==================== Named execution ====================

    /// Execute `sql` with named arguments and return the number of affected rows.
    pub async fn named_execute<B>(&self, sql: &str, args: &B) -> NamedResult<u64>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).execute(self, args).await
    }

    /// Execute `sql` once per bag and return the total number of affected rows.
    ///
    /// All bags are validated before any row is sent.
    pub async fn named_execute_many<B>(&self, sql: &str, args: &[B]) -> NamedResult<u64>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        #[cfg(feature = "tracing")]
        tracing::debug!(rows = args.len(), "named batch execute");

        NamedStatement::new(sql).execute_many(self, args).await
    }

    /// Execute `sql` with named arguments and return all rows.
    pub async fn named_fetch<B>(&self, sql: &str, args: &B) -> NamedResult<Vec<Row>>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).fetch_all(self, args).await
    }

    /// Execute `sql` with named arguments and return all rows mapped to `T`.
    pub async fn named_fetch_as<T, B>(&self, sql: &str, args: &B) -> NamedResult<Vec<T>>
    where
        T: FromRow,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).fetch_all_as(self, args).await
    }

    /// Execute `sql` with named arguments and return the first row.
    pub async fn named_fetch_one<B>(&self, sql: &str, args: &B) -> NamedResult<Row>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).fetch_one(self, args).await
    }

    /// Execute `sql` with named arguments and return the first row mapped to `T`.
    pub async fn named_fetch_one_as<T, B>(&self, sql: &str, args: &B) -> NamedResult<T>
    where
        T: FromRow,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).fetch_one_as(self, args).await
    }

    /// Execute `sql` with named arguments and return the first row, if any.
    pub async fn named_fetch_opt<B>(&self, sql: &str, args: &B) -> NamedResult<Option<Row>>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).fetch_opt(self, args).await
    }

    /// Execute `sql` with named arguments and return the first column of the first row.
    pub async fn named_fetch_scalar<T, B>(&self, sql: &str, args: &B) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).fetch_scalar(self, args).await
    }

    /// Execute `sql` with named arguments and return column `column` of the first row.
    pub async fn named_fetch_scalar_at<T, B>(
        &self,
        sql: &str,
        args: &B,
        column: usize,
    ) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql)
            .fetch_scalar_at(self, args, column)
            .await
    }

    /// Execute with timeout if configured.
    async fn execute_with_timeout<T, F>(&self, future: F) -> NamedResult<T>
    where
        F: std::future::Future<Output = NamedResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future).await.map_err(|_| {
                if let Some(cancel_token) = self.client.cancel_token() {
                    tokio::spawn(async move {
                        let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::warn!(?timeout, "query timed out");
                NamedError::Timeout(timeout)
            })?,
            None => future.await,
        }
    }

    #[cfg(feature = "tracing")]
    fn trace_sql(&self, op: &'static str, sql: &str, params: usize) {
        let sql = truncate_sql(sql, self.config.max_log_sql_length);
        tracing::debug!(op, params, sql = %sql, "executing");
    }

    #[cfg(not(feature = "tracing"))]
    fn trace_sql(&self, _op: &'static str, _sql: &str, _params: usize) {}
}

impl<C: StreamingClient> NamedClient<C> {
    /// Execute `sql` with named arguments and return a row stream.
    pub async fn named_stream<B>(&self, sql: &str, args: &B) -> NamedResult<RowStream>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql).stream(self, args).await
    }
}

impl<'t> NamedClient<Transaction<'t>> {
    /// Open a cursor over `sql` using the configured prefetch size.
    pub async fn named_cursor<'a, B>(&'a self, sql: &str, args: &B) -> NamedResult<Cursor<'a>>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        NamedStatement::new(sql)
            .cursor(&self.client, args, Some(self.config.cursor_prefetch))
            .await
    }
}

#[cfg(feature = "tracing")]
fn truncate_sql(sql: &str, max: Option<usize>) -> std::borrow::Cow<'_, str> {
    match max {
        Some(max) if sql.len() > max => {
            let mut end = max;
            while !sql.is_char_boundary(end) {
                end -= 1;
            }
            std::borrow::Cow::Owned(format!("{}...", &sql[..end]))
        }
        _ => std::borrow::Cow::Borrowed(sql),
    }
}

impl<C> Deref for NamedClient<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl<C: GenericClient> GenericClient for NamedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<Vec<Row>> {
        self.trace_sql("query", sql, params.len());
        self.execute_with_timeout(self.client.query(sql, params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<u64> {
        self.trace_sql("execute", sql, params.len());
        self.execute_with_timeout(self.client.execute(sql, params))
            .await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<Option<Row>> {
        self.trace_sql("query_opt", sql, params.len());
        self.execute_with_timeout(self.client.query_opt(sql, params))
            .await
    }

    async fn execute_batch(
        &self,
        sql: &str,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> NamedResult<u64> {
        self.trace_sql("execute_batch", sql, batch.first().map_or(0, Vec::len));
        if self.config.prepare_batches && self.client.supports_prepared_statements() {
            let stmt = self
                .execute_with_timeout(self.client.prepare_statement(sql))
                .await?;
            return self.execute_prepared_batch(&stmt, batch).await;
        }

        let mut affected = 0;
        for params in batch {
            affected += self
                .execute_with_timeout(self.client.execute(sql, params))
                .await?;
        }
        Ok(affected)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        self.client.cancel_token()
    }

    fn supports_prepared_statements(&self) -> bool {
        self.client.supports_prepared_statements()
    }

    async fn prepare_statement(&self, sql: &str) -> NamedResult<Statement> {
        self.trace_sql("prepare", sql, 0);
        self.execute_with_timeout(self.client.prepare_statement(sql))
            .await
    }

    async fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<Vec<Row>> {
        self.execute_with_timeout(self.client.query_prepared(stmt, params))
            .await
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<u64> {
        self.execute_with_timeout(self.client.execute_prepared(stmt, params))
            .await
    }

    async fn execute_prepared_batch(
        &self,
        stmt: &Statement,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> NamedResult<u64> {
        let mut affected = 0;
        for params in batch {
            affected += self
                .execute_with_timeout(self.client.execute_prepared(stmt, params))
                .await?;
        }
        Ok(affected)
    }
}

impl<C: StreamingClient> StreamingClient for NamedClient<C> {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        self.trace_sql("query_stream", sql, params.len());
        self.execute_with_timeout(self.client.query_stream(sql, params))
            .await
    }

    async fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        self.execute_with_timeout(self.client.query_stream_prepared(stmt, params))
            .await
    }
}

/// Connect to `database_url` without TLS and wrap the client.
///
/// The connection task is spawned on the current tokio runtime.
pub async fn connect(database_url: &str) -> NamedResult<NamedClient<tokio_postgres::Client>> {
    connect_with_config(database_url, ClientConfig::default()).await
}

/// Connect to `database_url` without TLS and wrap the client with `config`.
pub async fn connect_with_config(
    database_url: &str,
    config: ClientConfig,
) -> NamedResult<NamedClient<tokio_postgres::Client>> {
    let (client, connection) = tokio_postgres::connect(database_url, tokio_postgres::NoTls).await?;

    tokio::spawn(async move {
        if let Err(_e) = connection.await {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_e, "postgres connection error");
        }
    });

    Ok(NamedClient::with_config(client, config))
}
