use crate::error::NamedResult;
use crate::row::FromRow;
use std::collections::VecDeque;
use tokio_postgres::{Portal, Row, Transaction};

/// A forward-only cursor over a bound portal.
///
/// Rows are fetched from the server `prefetch` at a time, when the local buffer runs empty.
/// Once the server returns a short batch the cursor is exhausted; it cannot be rewound.
#[must_use]
pub struct Cursor<'a> {
    tx: &'a Transaction<'a>,
    portal: Portal,
    prefetch: i32,
    buffer: VecDeque<Row>,
    exhausted: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tx: &'a Transaction<'a>, portal: Portal, prefetch: u32) -> Self {
        let prefetch = i32::try_from(prefetch.max(1)).unwrap_or(i32::MAX);
        Self {
            tx,
            portal,
            prefetch,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Rows fetched per round trip.
    pub fn prefetch(&self) -> u32 {
        self.prefetch.unsigned_abs()
    }

    /// `true` once every row has been fetched from the server and handed out.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }

    /// Return the next row, fetching a new batch if needed.
    pub async fn next(&mut self) -> NamedResult<Option<Row>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        Ok(self.buffer.pop_front())
    }

    /// Return the next row mapped to `T`.
    pub async fn next_as<T: FromRow>(&mut self) -> NamedResult<Option<T>> {
        let row = self.next().await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Return up to `n` rows.
    ///
    /// Fewer than `n` rows means the cursor is exhausted.
    pub async fn fetch(&mut self, n: usize) -> NamedResult<Vec<Row>> {
        let mut rows = Vec::with_capacity(n.min(self.buffer.len().max(1)));
        while rows.len() < n {
            match self.next().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    async fn fill(&mut self) -> NamedResult<()> {
        let rows = self.tx.query_portal(&self.portal, self.prefetch).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(rows = rows.len(), prefetch = self.prefetch, "fetched cursor batch");

        if rows.len() < self.prefetch.unsigned_abs() as usize {
            self.exhausted = true;
        }
        self.buffer.extend(rows);
        Ok(())
    }
}
