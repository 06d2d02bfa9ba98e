//! Named placeholders and argument binding.
//!
//! This module turns `:name` SQL into the positional form `tokio-postgres` understands and
//! resolves named arguments into positional argument vectors:
//! - [`translate`] rewrites placeholders and records the name of each one, in order.
//! - [`bind`] / [`bind_many`] look those names up in one bag, or in one bag per row.
//!
//! Binding is strict: a name with no value and a value with no name are both errors.
//!
//! # Example
//!
//! ```
//! use pgnamed::{bind, translate, NamedArgs};
//!
//! let q = translate("SELECT * FROM t WHERE id=:id AND name=:name;");
//! assert_eq!(q.sql(), "SELECT * FROM t WHERE id=$1 AND name=$2;");
//!
//! let args = NamedArgs::new().set("name", "bob").set("id", 7_i32);
//! let values = bind(&args, q.names())?;
//! assert_eq!(values.len(), 2);
//! # Ok::<(), pgnamed::NamedError>(())
//! ```

mod bind;
mod translate;

#[cfg(test)]
mod tests;

pub use bind::{
    ArgumentBag, BagConverter, BatchConverter, NamedArgs, Param, ParamsConverter, SqlArg,
    bind, bind_many, params_ref,
};
pub use translate::{TranslatedQuery, translate};
