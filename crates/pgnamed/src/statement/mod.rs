//! Reusable named statements.
//!
//! A [`NamedStatement`] translates its SQL once and keeps the parameter name list, so each
//! execution only binds arguments. When created with [`NamedStatement::prepare`] it also holds
//! the driver's compiled statement for the connection it was prepared on.
//!
//! # Example
//!
//! ```ignore
//! use pgnamed::{NamedArgs, NamedStatement};
//!
//! let stmt = NamedStatement::prepare(&client, "SELECT * FROM users WHERE id = :id").await?;
//! for id in [1_i64, 2, 3] {
//!     let row = stmt.fetch_one(&client, &NamedArgs::new().set("id", id)).await?;
//! }
//! ```

mod cursor;


pub use cursor::Cursor;

use crate::client::{GenericClient, RowStream, StreamingClient};
use crate::config::DEFAULT_CURSOR_PREFETCH;
use crate::error::{NamedError, NamedResult};
use crate::params::{ArgumentBag, SqlArg, TranslatedQuery, bind, bind_many, params_ref, translate};
use crate::row::{FromRow, RowExt, map_rows};
use tokio_postgres::types::{FromSql, ToSql};
use tokio_postgres::{Row, Statement, Transaction};

/// A translated query, optionally compiled by the driver, ready for repeated execution.
///
/// Argument errors are reported before anything is sent to the database. Driver errors are
/// returned as [`NamedError::Query`].
#[must_use]
#[derive(Debug)]
pub struct NamedStatement {
    raw_sql: String,
    query: TranslatedQuery,
    prepared: Option<Statement>,
}

impl NamedStatement {
    /// Translate `raw_sql` without compiling it on a connection.
    pub fn new(raw_sql: impl Into<String>) -> Self {
        let raw_sql = raw_sql.into();
        let query = translate(&raw_sql);
        Self {
            raw_sql,
            query,
            prepared: None,
        }
    }

    /// Translate `raw_sql` and compile it on `conn`.
    ///
    /// Clients without prepared statement support get a translated-only statement. The compiled
    /// statement belongs to `conn`'s connection; execute it there only.
    pub async fn prepare(conn: &impl GenericClient, raw_sql: impl Into<String>) -> NamedResult<Self> {
        let mut stmt = Self::new(raw_sql);
        if conn.supports_prepared_statements() {
            stmt.prepared = Some(conn.prepare_statement(stmt.query.sql()).await?);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            params = stmt.query.param_count(),
            prepared = stmt.prepared.is_some(),
            "prepared named statement"
        );

        Ok(stmt)
    }

    /// The SQL as written, with `:name` placeholders.
    pub fn raw_sql(&self) -> &str {
        &self.raw_sql
    }

    /// The positional SQL sent to the driver.
    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    /// Parameter names in marker order.
    pub fn names(&self) -> &[String] {
        self.query.names()
    }

    pub fn translated(&self) -> &TranslatedQuery {
        &self.query
    }

    /// The driver's compiled statement, if this statement was prepared.
    pub fn prepared(&self) -> Option<&Statement> {
        self.prepared.as_ref()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Release the statement.
    ///
    /// Dropping the compiled statement closes it on the server once no clone of it remains.
    pub fn release(self) {
        drop(self);
    }

    // ==================== Binding ====================

    /// Resolve `args` into positional values for this statement.
    pub fn bind<B: ArgumentBag>(&self, args: &B) -> NamedResult<Vec<B::Value>> {
        bind(args, self.query.names())
    }

    /// Resolve each bag in `args` into positional values for this statement.
    pub fn bind_many<B: ArgumentBag>(&self, args: &[B]) -> NamedResult<Vec<Vec<B::Value>>> {
        bind_many(args, self.query.names())
    }

    // ==================== Execution ====================

    /// Execute the statement and return the number of affected rows.
    pub async fn execute<B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<u64>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let values = self.bind(args)?;
        let params = params_ref(&values);
        match &self.prepared {
            Some(stmt) => conn.execute_prepared(stmt, &params).await,
            None => conn.execute(self.sql(), &params).await,
        }
    }

    /// Execute the statement once per bag and return the total number of affected rows.
    ///
    /// Every bag is validated before the first row is sent; one bad bag fails the whole call.
    pub async fn execute_many<B>(&self, conn: &impl GenericClient, args: &[B]) -> NamedResult<u64>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let rows = self.bind_many(args)?;
        let batch: Vec<Vec<&(dyn ToSql + Sync)>> = rows.iter().map(|v| params_ref(v)).collect();
        match &self.prepared {
            Some(stmt) => conn.execute_prepared_batch(stmt, &batch).await,
            None => conn.execute_batch(self.sql(), &batch).await,
        }
    }

    /// Execute the query and return all rows.
    pub async fn fetch_all<B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<Vec<Row>>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let values = self.bind(args)?;
        let params = params_ref(&values);
        match &self.prepared {
            Some(stmt) => conn.query_prepared(stmt, &params).await,
            None => conn.query(self.sql(), &params).await,
        }
    }

    /// Execute the query and return all rows mapped to `T`.
    pub async fn fetch_all_as<T, B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<Vec<T>>
    where
        T: FromRow,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let rows = self.fetch_all(conn, args).await?;
        map_rows(&rows)
    }

    /// Execute the query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`NamedError::NotFound`]
    /// - 1 or more rows: returns the first row
    pub async fn fetch_one<B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<Row>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        self.fetch_opt(conn, args)
            .await?
            .ok_or_else(|| NamedError::not_found("Expected one row, got none"))
    }

    /// Execute the query and return the **first** row mapped to `T`.
    pub async fn fetch_one_as<T, B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<T>
    where
        T: FromRow,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let row = self.fetch_one(conn, args).await?;
        T::from_row(&row)
    }

    /// Execute the query and return the first row, if any.
    pub async fn fetch_opt<B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<Option<Row>>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let values = self.bind(args)?;
        let params = params_ref(&values);
        match &self.prepared {
            Some(stmt) => Ok(conn.query_prepared(stmt, &params).await?.into_iter().next()),
            None => conn.query_opt(self.sql(), &params).await,
        }
    }

    /// Execute the query and return at most one row mapped to `T`.
    pub async fn fetch_opt_as<T, B>(
        &self,
        conn: &impl GenericClient,
        args: &B,
    ) -> NamedResult<Option<T>>
    where
        T: FromRow,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let row = self.fetch_opt(conn, args).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute the query and return the first column of the first row.
    pub async fn fetch_scalar<T, B>(&self, conn: &impl GenericClient, args: &B) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        self.fetch_scalar_at(conn, args, 0).await
    }

    /// Execute the query and return column `column` of the first row.
    pub async fn fetch_scalar_at<T, B>(
        &self,
        conn: &impl GenericClient,
        args: &B,
        column: usize,
    ) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>,
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let row = self.fetch_one(conn, args).await?;
        row.try_get_index(column)
    }

    // ==================== Streaming execution ====================

    /// Execute the query and return a row stream.
    ///
    /// Rows are pulled from the connection as the stream is polled.
    pub async fn stream<B>(&self, conn: &impl StreamingClient, args: &B) -> NamedResult<RowStream>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let values = self.bind(args)?;
        let params = params_ref(&values);
        match &self.prepared {
            Some(stmt) => conn.query_stream_prepared(stmt, &params).await,
            None => conn.query_stream(self.sql(), &params).await,
        }
    }

    /// Open a cursor that fetches `prefetch` rows per round trip (50 when `None`).
    ///
    /// Cursors live inside a transaction and end with it.
    pub async fn cursor<'a, B>(
        &self,
        tx: &'a Transaction<'a>,
        args: &B,
        prefetch: Option<u32>,
    ) -> NamedResult<Cursor<'a>>
    where
        B: ArgumentBag,
        B::Value: SqlArg,
    {
        let values = self.bind(args)?;
        let params = params_ref(&values);
        let portal = match &self.prepared {
            Some(stmt) => tx.bind(stmt, &params).await?,
            None => tx.bind(self.sql(), &params).await?,
        };
        Ok(Cursor::new(
            tx,
            portal,
            prefetch.unwrap_or(DEFAULT_CURSOR_PREFETCH),
        ))
    }
}
