//! Row mapping traits and utilities

use crate::error::{NamedError, NamedResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust value.
///
/// # Example
///
/// ```ignore
/// use pgnamed::{FromRow, NamedResult, RowExt};
/// use tokio_postgres::Row;
///
/// struct User {
///     id: i64,
///     username: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> NamedResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             username: row.try_get_column("username")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> NamedResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> NamedResult<Self> {
        Ok(row.clone())
    }
}

macro_rules! impl_from_row_tuple {
    ($($idx:tt => $ty:ident),+) => {
        /// Maps columns by position.
        impl<$($ty),+> FromRow for ($($ty,)+)
        where
            $($ty: for<'a> FromSql<'a>,)+
        {
            fn from_row(row: &Row) -> NamedResult<Self> {
                Ok(($(row.try_get_index::<$ty>($idx)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(0 => A);
impl_from_row_tuple!(0 => A, 1 => B);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C, 3 => D);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_from_row_tuple!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);

/// Map every row with [`FromRow`], stopping at the first failure.
pub fn map_rows<T: FromRow>(rows: &[Row]) -> NamedResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value by name, returning NamedError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Try to get a column value by position, returning NamedError::Decode on failure
    fn try_get_index<T>(&self, index: usize) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| NamedError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, index: usize) -> NamedResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(index)
            .map_err(|e| NamedError::decode(index.to_string(), e.to_string()))
    }
}
