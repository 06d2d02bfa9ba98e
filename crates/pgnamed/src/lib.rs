//! # pgnamed
//!
//! Named `:param` placeholders for `tokio-postgres`.
//!
//! ## Features
//!
//! - **Named placeholders**: write `WHERE id = :id`, get `WHERE id = $1` plus the name list
//! - **Strict binding**: a placeholder without a value and a value without a placeholder are
//!   both errors, reported before anything reaches the database
//! - **Reusable statements**: translate (and optionally prepare) once, bind many times
//! - **Batches, streams and cursors**: `execute_many`, `stream` and portal-backed `cursor`
//! - **Composition over the driver**: `NamedClient` wraps a client, transaction or pooled
//!   connection; the driver's own API stays available
//!
//! ```ignore
//! use pgnamed::{named_args, NamedStatement};
//!
//! let pg = pgnamed::connect(&database_url).await?;
//!
//! pg.named_execute(
//!     "INSERT INTO users (id, name) VALUES (:id, :name)",
//!     &named_args! { "id" => 7_i64, "name" => "bob" },
//! )
//! .await?;
//!
//! let by_id = pg.prepare("SELECT name FROM users WHERE id = :id").await?;
//! let name: String = by_id.fetch_scalar(&pg, &named_args! { "id" => 7_i64 }).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod named_client;
pub mod params;
pub mod row;
pub mod statement;

pub use client::{GenericClient, RowStream, StreamingClient};
pub use config::ClientConfig;
pub use error::{NamedError, NamedResult};
pub use named_client::{NamedClient, connect, connect_with_config};
pub use params::{
    ArgumentBag, BagConverter, BatchConverter, NamedArgs, Param, ParamsConverter, SqlArg,
    TranslatedQuery, bind, bind_many, params_ref, translate,
};
pub use row::{FromRow, RowExt, map_rows};
pub use statement::{Cursor, NamedStatement};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{
    create_pool, create_pool_with_config, create_pool_with_manager_config, get_named,
    get_named_with_config,
};

// Re-export the driver so callers can name its types without a separate dependency.
pub use tokio_postgres;
