//! Driver seam: the operations named-parameter execution needs from a Postgres client.

use crate::error::{NamedError, NamedResult};
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_postgres::Row;
use tokio_postgres::Statement;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Implementations forward to the driver and return its errors as [`NamedError::Query`]
/// without reinterpreting them.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`NamedError::NotFound`]
    /// - 1 or more rows: returns the first row
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Row>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            rows.into_iter()
                .next()
                .ok_or_else(|| NamedError::not_found("Expected one row, got none"))
        }
    }

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute the same statement once per parameter set and return the total affected rows.
    ///
    /// The default runs the sets one after another with [`GenericClient::execute`].
    fn execute_batch(
        &self,
        sql: &str,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        async move {
            let mut affected = 0;
            for params in batch {
                affected += self.execute(sql, params).await?;
            }
            Ok(affected)
        }
    }

    /// Return a cancellation token for the underlying connection, if supported.
    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        None
    }

    /// Whether this client supports prepared statement APIs.
    ///
    /// The default implementation returns `false`, and prepared APIs will error if called.
    fn supports_prepared_statements(&self) -> bool {
        false
    }

    /// Prepare a statement on this connection.
    ///
    /// Prepared statements are **per-connection** and must not be used across connections.
    fn prepare_statement(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = NamedResult<Statement>> + Send {
        let _ = sql;
        async { Err(unsupported_prepared()) }
    }

    /// Execute a prepared statement and return all rows.
    fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Vec<Row>>> + Send {
        let _ = (stmt, params);
        async { Err(unsupported_prepared()) }
    }

    /// Execute a prepared statement and return affected row count.
    fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        let _ = (stmt, params);
        async { Err(unsupported_prepared()) }
    }

    /// Execute a prepared statement once per parameter set and return the total affected rows.
    fn execute_prepared_batch(
        &self,
        stmt: &Statement,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        async move {
            let mut affected = 0;
            for params in batch {
                affected += self.execute_prepared(stmt, params).await?;
            }
            Ok(affected)
        }
    }
}

fn unsupported_prepared() -> NamedError {
    NamedError::Unsupported("prepared statements are not supported by this client".to_string())
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<u64> {
        Ok(tokio_postgres::Client::execute(self, sql, params).await?)
    }

    async fn execute_batch(
        &self,
        sql: &str,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> NamedResult<u64> {
        // Parse once, then reuse the unnamed plan for every row.
        let stmt = tokio_postgres::Client::prepare(self, sql).await?;
        self.execute_prepared_batch(&stmt, batch).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Client::cancel_token(self))
    }

    fn supports_prepared_statements(&self) -> bool {
        true
    }

    async fn prepare_statement(&self, sql: &str) -> NamedResult<Statement> {
        Ok(tokio_postgres::Client::prepare(self, sql).await?)
    }

    async fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, stmt, params).await?)
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<u64> {
        Ok(tokio_postgres::Client::execute(self, stmt, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, sql, params).await?)
    }

    async fn execute_batch(
        &self,
        sql: &str,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> NamedResult<u64> {
        let stmt = tokio_postgres::Transaction::prepare(self, sql).await?;
        self.execute_prepared_batch(&stmt, batch).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Transaction::cancel_token(self))
    }

    fn supports_prepared_statements(&self) -> bool {
        true
    }

    async fn prepare_statement(&self, sql: &str) -> NamedResult<Statement> {
        Ok(tokio_postgres::Transaction::prepare(self, sql).await?)
    }

    async fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, stmt, params).await?)
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<u64> {
        Ok(tokio_postgres::Transaction::execute(self, stmt, params).await?)
    }
}

/// A stream of database rows.
///
/// This is a type-erased wrapper around a `Stream<Item = NamedResult<Row>>` so that different
/// client implementations can return a uniform streaming type. Rows arrive as the driver
/// receives them; the stream is forward-only and cannot be restarted.
#[must_use]
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = NamedResult<Row>> + Send>>,
}

impl RowStream {
    /// Create a new `RowStream` from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = NamedResult<Row>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for RowStream {
    type Item = NamedResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Streaming query support (RowStream).
///
/// Separate from [`GenericClient`] so that only clients that can stream rows (via
/// `tokio-postgres`'s `query_raw`) need to implement it.
pub trait StreamingClient: GenericClient {
    /// Execute a query and return a `RowStream` for incremental consumption.
    fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<RowStream>> + Send;

    /// Execute a prepared statement and return a `RowStream`.
    fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<RowStream>> + Send;
}

struct MapDbRowStream<S> {
    inner: Pin<Box<S>>,
}

impl<S> MapDbRowStream<S> {
    fn new(stream: S) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl<S> Stream for MapDbRowStream<S>
where
    S: Stream<Item = Result<Row, tokio_postgres::Error>> + Send + 'static,
{
    type Item = NamedResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(Ok(row))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(NamedError::Query(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl StreamingClient for tokio_postgres::Client {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        let stream = tokio_postgres::Client::query_raw(self, sql, params.iter().copied()).await?;
        Ok(RowStream::new(MapDbRowStream::new(stream)))
    }

    async fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        let stream = tokio_postgres::Client::query_raw(self, stmt, params.iter().copied()).await?;
        Ok(RowStream::new(MapDbRowStream::new(stream)))
    }
}

impl StreamingClient for tokio_postgres::Transaction<'_> {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        let stream =
            tokio_postgres::Transaction::query_raw(self, sql, params.iter().copied()).await?;
        Ok(RowStream::new(MapDbRowStream::new(stream)))
    }

    async fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        let stream =
            tokio_postgres::Transaction::query_raw(self, stmt, params.iter().copied()).await?;
        Ok(RowStream::new(MapDbRowStream::new(stream)))
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        GenericClient::query(&***self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> NamedResult<u64> {
        GenericClient::execute(&***self, sql, params).await
    }

    async fn execute_batch(
        &self,
        sql: &str,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> NamedResult<u64> {
        // deadpool caches statements per connection.
        let stmt = self.prepare_cached(sql).await?;
        self.execute_prepared_batch(&stmt, batch).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        GenericClient::cancel_token(&***self)
    }

    fn supports_prepared_statements(&self) -> bool {
        true
    }

    async fn prepare_statement(&self, sql: &str) -> NamedResult<Statement> {
        GenericClient::prepare_statement(&***self, sql).await
    }

    async fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<Vec<Row>> {
        GenericClient::query_prepared(&***self, stmt, params).await
    }

    async fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<u64> {
        GenericClient::execute_prepared(&***self, stmt, params).await
    }
}

#[cfg(feature = "pool")]
impl StreamingClient for deadpool_postgres::Client {
    async fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        StreamingClient::query_stream(&***self, sql, params).await
    }

    async fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> NamedResult<RowStream> {
        StreamingClient::query_stream_prepared(&***self, stmt, params).await
    }
}

// ===== Reference implementations =====
// These allow NamedClient to wrap &Client instead of owned Client

impl<C: GenericClient> GenericClient for &C {
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Vec<Row>>> + Send {
        (*self).query(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        (*self).execute(sql, params)
    }

    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Row>> + Send {
        (*self).query_one(sql, params)
    }

    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Option<Row>>> + Send {
        (*self).query_opt(sql, params)
    }

    fn execute_batch(
        &self,
        sql: &str,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        (*self).execute_batch(sql, batch)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        (*self).cancel_token()
    }

    fn supports_prepared_statements(&self) -> bool {
        (*self).supports_prepared_statements()
    }

    fn prepare_statement(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = NamedResult<Statement>> + Send {
        (*self).prepare_statement(sql)
    }

    fn query_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<Vec<Row>>> + Send {
        (*self).query_prepared(stmt, params)
    }

    fn execute_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        (*self).execute_prepared(stmt, params)
    }

    fn execute_prepared_batch(
        &self,
        stmt: &Statement,
        batch: &[Vec<&(dyn ToSql + Sync)>],
    ) -> impl std::future::Future<Output = NamedResult<u64>> + Send {
        (*self).execute_prepared_batch(stmt, batch)
    }
}

impl<C: StreamingClient> StreamingClient for &C {
    fn query_stream(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<RowStream>> + Send {
        (*self).query_stream(sql, params)
    }

    fn query_stream_prepared(
        &self,
        stmt: &Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = NamedResult<RowStream>> + Send {
        (*self).query_stream_prepared(stmt, params)
    }
}
