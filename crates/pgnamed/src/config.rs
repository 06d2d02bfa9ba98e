use std::time::Duration;

/// Rows fetched per round trip by [`crate::Cursor`] when no prefetch is given.
pub const DEFAULT_CURSOR_PREFETCH: u32 = 50;

/// Configuration for [`crate::NamedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout applied to each driver call.
    pub query_timeout: Option<Duration>,
    /// Rows fetched per round trip by cursors.
    pub cursor_prefetch: u32,
    /// Compile the statement once for `named_execute_many` instead of parsing it per row.
    pub prepare_batches: bool,
    /// Truncate SQL in log events (in bytes). `None` means no truncation.
    pub max_log_sql_length: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            cursor_prefetch: DEFAULT_CURSOR_PREFETCH,
            prepare_batches: true,
            max_log_sql_length: Some(200),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set query timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Remove the query timeout.
    pub fn no_timeout(mut self) -> Self {
        self.query_timeout = None;
        self
    }

    /// Set the cursor prefetch size. Zero is raised to one.
    pub fn cursor_prefetch(mut self, rows: u32) -> Self {
        self.cursor_prefetch = rows.max(1);
        self
    }

    /// Send every row of a batch as its own parse/execute round.
    pub fn no_batch_prepare(mut self) -> Self {
        self.prepare_batches = false;
        self
    }

    /// Set maximum SQL length in log events.
    pub fn max_log_sql_length(mut self, len: usize) -> Self {
        self.max_log_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in log events.
    pub fn no_log_truncate(mut self) -> Self {
        self.max_log_sql_length = None;
        self
    }
}
