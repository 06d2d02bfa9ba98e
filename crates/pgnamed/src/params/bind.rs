use crate::error::{NamedError, NamedResult};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A driver value as stored in [`NamedArgs`].
pub type Param = Arc<dyn ToSql + Sync + Send>;

/// A set of named arguments for one statement execution.
///
/// Validation only looks at keys; values are handed to the driver untouched.
pub trait ArgumentBag {
    type Value: Clone;

    /// Look up the value for `name`.
    fn get_arg(&self, name: &str) -> Option<&Self::Value>;

    /// All argument names in this bag.
    fn arg_names(&self) -> impl Iterator<Item = &str>;
}

impl<K, V, S> ArgumentBag for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    type Value = V;

    fn get_arg(&self, name: &str) -> Option<&V> {
        self.get(name)
    }

    fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.keys().map(|k| Borrow::<str>::borrow(k))
    }
}

impl<K, V> ArgumentBag for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Clone,
{
    type Value = V;

    fn get_arg(&self, name: &str) -> Option<&V> {
        self.get(name)
    }

    fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.keys().map(|k| Borrow::<str>::borrow(k))
    }
}

impl<B: ArgumentBag + ?Sized> ArgumentBag for &B {
    type Value = B::Value;

    fn get_arg(&self, name: &str) -> Option<&B::Value> {
        (**self).get_arg(name)
    }

    fn arg_names(&self) -> impl Iterator<Item = &str> {
        (**self).arg_names()
    }
}

/// Named arguments holding `tokio-postgres` values of mixed types.
///
/// # Example
///
/// ```
/// use pgnamed::NamedArgs;
///
/// let args = NamedArgs::new().set("id", 7_i64).set("name", "bob");
/// assert_eq!(args.len(), 2);
/// assert!(args.contains("name"));
/// ```
#[derive(Clone, Default)]
pub struct NamedArgs {
    values: BTreeMap<String, Param>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any previous value.
    pub fn set<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.insert(name, value);
        self
    }

    /// In-place version of [`NamedArgs::set`].
    pub fn insert<T>(&mut self, name: impl Into<String>, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.values.insert(name.into(), Arc::new(value));
        self
    }

    /// Set `name` to an already shared value.
    pub fn insert_param(&mut self, name: impl Into<String>, value: Param) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Param> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for NamedArgs {
    // Values are not `Debug`; only names are shown.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

impl ArgumentBag for NamedArgs {
    type Value = Param;

    fn get_arg(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    fn arg_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Build [`NamedArgs`] from `name => value` pairs.
///
/// ```
/// let args = pgnamed::named_args! { "id" => 1_i32, "name" => "bob" };
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! named_args {
    () => {
        $crate::NamedArgs::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::NamedArgs::new()$(.set($name, $value))+
    };
}

/// Converts caller arguments into positional argument vectors for a name list.
pub trait ParamsConverter {
    type Input: ?Sized;
    type Output;

    /// Produce positional arguments for `names` from `input`.
    fn convert(&self, input: &Self::Input, names: &[String]) -> NamedResult<Self::Output>;
}

/// Converts a single bag into one argument vector.
pub struct BagConverter<B>(PhantomData<fn(&B)>);

impl<B> BagConverter<B> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for BagConverter<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ArgumentBag> ParamsConverter for BagConverter<B> {
    type Input = B;
    type Output = Vec<B::Value>;

    fn convert(&self, bag: &B, names: &[String]) -> NamedResult<Vec<B::Value>> {
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let value = bag
                .get_arg(name)
                .ok_or_else(|| NamedError::missing(name.as_str()))?;
            values.push(value.clone());
        }

        let used: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let unused: BTreeSet<String> = bag
            .arg_names()
            .filter(|name| !used.contains(name))
            .map(str::to_string)
            .collect();
        if !unused.is_empty() {
            return Err(NamedError::UnusedArguments(unused));
        }

        Ok(values)
    }
}

/// Converts a sequence of bags into one argument vector per bag.
pub struct BatchConverter<B>(PhantomData<fn(&B)>);

impl<B> BatchConverter<B> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for BatchConverter<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ArgumentBag> ParamsConverter for BatchConverter<B> {
    type Input = [B];
    type Output = Vec<Vec<B::Value>>;

    fn convert(&self, bags: &[B], names: &[String]) -> NamedResult<Vec<Vec<B::Value>>> {
        let single = BagConverter::<B>::new();
        bags.iter().map(|bag| single.convert(bag, names)).collect()
    }
}

/// Resolve `names` against `bag`, in order.
///
/// Fails with [`NamedError::MissingRequiredArgument`] at the first name the bag lacks, then
/// with [`NamedError::UnusedArguments`] if the bag has keys no name references.
///
/// ```
/// use std::collections::HashMap;
///
/// let bag = HashMap::from([("name", "bob"), ("id", "7")]);
/// let names = ["id".to_string(), "name".to_string()];
/// assert_eq!(pgnamed::bind(&bag, &names).unwrap(), ["7", "bob"]);
/// ```
pub fn bind<B: ArgumentBag>(bag: &B, names: &[String]) -> NamedResult<Vec<B::Value>> {
    BagConverter::<B>::new().convert(bag, names)
}

/// Resolve `names` against every bag in `bags`, preserving order.
///
/// The first failing bag aborts the whole batch with its error.
pub fn bind_many<B: ArgumentBag>(bags: &[B], names: &[String]) -> NamedResult<Vec<Vec<B::Value>>> {
    BatchConverter::<B>::new().convert(bags, names)
}

/// A bound value that can be handed to `tokio-postgres` as a parameter.
pub trait SqlArg {
    fn as_sql_arg(&self) -> &(dyn ToSql + Sync);
}

impl SqlArg for Param {
    fn as_sql_arg(&self) -> &(dyn ToSql + Sync) {
        self.as_ref()
    }
}

impl SqlArg for Box<dyn ToSql + Sync + Send> {
    fn as_sql_arg(&self) -> &(dyn ToSql + Sync) {
        self.as_ref()
    }
}

impl SqlArg for &(dyn ToSql + Sync) {
    fn as_sql_arg(&self) -> &(dyn ToSql + Sync) {
        *self
    }
}

/// Borrow bound values as the parameter slice `tokio-postgres` expects.
pub fn params_ref<V: SqlArg>(values: &[V]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(SqlArg::as_sql_arg).collect()
}
