//! Parallel invocation helper
//!
//! Runs one async call per input with a bounded number of calls in flight
//! and hands the results back in input order.
//!
//! # Calling conventions
//!
//! - [`ParallelInvoker::map`]: one argument per call
//! - [`ParallelInvoker::map_with`]: one argument plus fixed trailing arguments
//!   repeated for every call
//! - [`ParallelInvoker::starmap`]: each input is a tuple unpacked into the
//!   function's parameters
//!
//! # Folding
//!
//! Results come back as a [`ResultCollection`], which can be flattened
//! ([`ResultCollection::fold_list`]) or merged into one map
//! ([`ResultCollection::fold_dict`], later inputs win on key collisions).
//! [`parallel_call`] offers the same through [`ParallelOptions`] for
//! functions producing `serde_json::Value`.
//!
//! # Failures
//!
//! The first failed call fails the whole invocation and its error is
//! returned. Calls still running are dropped or aborted.

mod mapper;
mod starmap;

pub use mapper::{BoundedMapper, SpawnMapper, StreamMapper};
pub use starmap::Starmap;

use crate::error::{Result, UtilError};
use crate::sort::kind_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tracing::debug;

/// Default number of calls in flight
pub const DEFAULT_POOL_SIZE: usize = 32;

/// How per-item results are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fold {
    /// Keep one result per input
    #[default]
    None,
    /// Concatenate array results
    List,
    /// Merge object results
    Dict,
}

/// Options for [`parallel_call`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelOptions {
    /// Maximum number of calls in flight
    pub pool_size: usize,
    /// Post-processing of the results
    pub fold: Fold,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            fold: Fold::None,
        }
    }
}

impl ParallelOptions {
    /// Create options with the default pool size and no folding
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from independent fold flags
    ///
    /// Requesting both folds at once is rejected.
    pub fn from_flags(fold_list: bool, fold_dict: bool, pool_size: usize) -> Result<Self> {
        let fold = match (fold_list, fold_dict) {
            (true, true) => {
                return Err(UtilError::invalid_config(
                    "fold_list and fold_dict cannot be requested together",
                ))
            }
            (true, false) => Fold::List,
            (false, true) => Fold::Dict,
            (false, false) => Fold::None,
        };
        Self { pool_size, fold }.validate()
    }

    pub const fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub const fn with_fold(mut self, fold: Fold) -> Self {
        self.fold = fold;
        self
    }

    /// Check that the options describe a runnable invocation
    pub fn validate(self) -> Result<Self> {
        if self.pool_size == 0 {
            return Err(UtilError::invalid_config("pool size must be at least 1"));
        }
        Ok(self)
    }
}

/// Ordered results of a parallel invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCollection<T> {
    results: Vec<T>,
}

impl<T> ResultCollection<T> {
    pub const fn new(results: Vec<T>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.results.iter()
    }

    /// One result per input, in input order
    pub fn into_vec(self) -> Vec<T> {
        self.results
    }

    /// Concatenate every result into one sequence, preserving input order
    pub fn fold_list(self) -> Vec<T::Item>
    where
        T: IntoIterator,
    {
        self.results.into_iter().flatten().collect()
    }

    /// Merge every result into one map; a later result overrides an earlier one
    pub fn fold_dict<K, V>(self) -> HashMap<K, V>
    where
        T: IntoIterator<Item = (K, V)>,
        K: Eq + Hash,
    {
        self.results.into_iter().flatten().collect()
    }
}

impl<T> IntoIterator for ResultCollection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl ResultCollection<Value> {
    /// Combine JSON results according to `fold`
    ///
    /// `Fold::List` needs every result to be an array and `Fold::Dict` needs
    /// every result to be an object.
    pub fn fold_values(self, fold: Fold) -> Result<Value> {
        match fold {
            Fold::None => Ok(Value::Array(self.results)),
            Fold::List => {
                let mut combined = Vec::new();
                for (index, result) in self.results.into_iter().enumerate() {
                    match result {
                        Value::Array(items) => combined.extend(items),
                        other => return Err(fold_shape(index, "array", &other)),
                    }
                }
                Ok(Value::Array(combined))
            }
            Fold::Dict => {
                let mut combined = Map::new();
                for (index, result) in self.results.into_iter().enumerate() {
                    match result {
                        Value::Object(entries) => combined.extend(entries),
                        other => return Err(fold_shape(index, "object", &other)),
                    }
                }
                Ok(Value::Object(combined))
            }
        }
    }
}

fn fold_shape(index: usize, expected: &'static str, found: &Value) -> UtilError {
    UtilError::FoldShape {
        index,
        expected,
        found: kind_name(found),
    }
}

/// Runs calls through a [`BoundedMapper`]
#[derive(Debug, Clone)]
pub struct ParallelInvoker<M = StreamMapper> {
    mapper: M,
}

impl ParallelInvoker<StreamMapper> {
    /// Cooperative invoker allowing `pool_size` calls in flight
    pub fn new(pool_size: usize) -> Result<Self> {
        Ok(Self::with_mapper(StreamMapper::new(pool_size)?))
    }
}

impl ParallelInvoker<SpawnMapper> {
    /// Invoker spawning each call as a tokio task
    pub fn spawning(pool_size: usize) -> Result<Self> {
        Ok(Self::with_mapper(SpawnMapper::new(pool_size)?))
    }
}

impl<M: BoundedMapper> ParallelInvoker<M> {
    pub const fn with_mapper(mapper: M) -> Self {
        Self { mapper }
    }

    pub fn pool_size(&self) -> usize {
        self.mapper.pool_size()
    }

    /// Call `function` once per argument
    pub async fn map<A, T, F, Fut>(&self, args: Vec<A>, function: F) -> Result<ResultCollection<T>>
    where
        A: Send + 'static,
        T: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        debug!("Invoking {} calls, pool size {}", args.len(), self.pool_size());
        let results = self.mapper.map(args, function).await?;
        Ok(ResultCollection::new(results))
    }

    /// Call `function(arg, repeatable)` once per argument
    ///
    /// `repeatable` is cloned for every call.
    pub async fn map_with<A, R, T, F, Fut>(
        &self,
        args: Vec<A>,
        repeatable: R,
        function: F,
    ) -> Result<ResultCollection<T>>
    where
        A: Send + 'static,
        R: Clone + Send + Sync + 'static,
        T: Send + 'static,
        F: Fn(A, R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.map(args, move |arg| function(arg, repeatable.clone())).await
    }

    /// Call `function` once per argument tuple, unpacking the tuple
    pub async fn starmap<Args, T, F>(&self, args: Vec<Args>, function: F) -> Result<ResultCollection<T>>
    where
        Args: Send + 'static,
        T: Send + 'static,
        F: Starmap<Args>,
        F::Future: Future<Output = Result<T>>,
    {
        self.map(args, move |packed| function.apply(packed)).await
    }
}

/// Run `function` over `args` and fold the JSON results per `options`
///
/// # Example
///
/// ```rust
/// use mtgjson_util::parallel::{parallel_call, Fold, ParallelOptions};
/// use serde_json::{json, Value};
///
/// # tokio_test::block_on(async {
/// let options = ParallelOptions::new().with_fold(Fold::List);
/// let flat = parallel_call(
///     |v: Value| async move { Ok(v) },
///     vec![json!([1]), json!([2, 3]), json!([])],
///     options,
/// )
/// .await
/// .unwrap();
/// assert_eq!(flat, json!([1, 2, 3]));
/// # });
/// ```
pub async fn parallel_call<A, F, Fut>(function: F, args: Vec<A>, options: ParallelOptions) -> Result<Value>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    let options = options.validate()?;
    ParallelInvoker::new(options.pool_size)?
        .map(args, function)
        .await?
        .fold_values(options.fold)
}

/// [`parallel_call`] with fixed trailing arguments cloned into every call
pub async fn parallel_call_with<A, R, F, Fut>(
    function: F,
    args: Vec<A>,
    repeatable: R,
    options: ParallelOptions,
) -> Result<Value>
where
    A: Send + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(A, R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    let options = options.validate()?;
    ParallelInvoker::new(options.pool_size)?
        .map_with(args, repeatable, function)
        .await?
        .fold_values(options.fold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn identity(value: Value) -> Result<Value> {
        Ok(value)
    }

    #[tokio::test]
    async fn test_doubles_in_input_order_for_any_pool_size() {
        for pool_size in [1, 2, 3, 32] {
            let invoker = ParallelInvoker::new(pool_size).unwrap();
            let out = invoker
                .map(vec![1, 2, 3, 4, 5], |x: i32| async move { Ok(x * 2) })
                .await
                .unwrap()
                .into_vec();
            assert_eq!(out, vec![2, 4, 6, 8, 10]);
        }
    }

    #[tokio::test]
    async fn test_fold_list_flattens() {
        let options = ParallelOptions::from_flags(true, false, DEFAULT_POOL_SIZE).unwrap();
        let out = parallel_call(identity, vec![json!([1]), json!([2, 3]), json!([])], options)
            .await
            .unwrap();
        assert_eq!(out, json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_fold_dict_merges() {
        let options = ParallelOptions::from_flags(false, true, DEFAULT_POOL_SIZE).unwrap();
        let out = parallel_call(identity, vec![json!({"a": 1}), json!({"b": 2})], options)
            .await
            .unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn test_fold_dict_later_item_wins() {
        let options = ParallelOptions::new().with_fold(Fold::Dict);
        let out = parallel_call(identity, vec![json!({"k": "first"}), json!({"k": "second"})], options)
            .await
            .unwrap();
        assert_eq!(out, json!({"k": "second"}));

        let typed = ParallelInvoker::new(4)
            .unwrap()
            .map(vec![1_u8, 2, 3], |i: u8| async move { Ok(vec![("key", i)]) })
            .await
            .unwrap()
            .fold_dict();
        assert_eq!(typed.get("key"), Some(&3));
    }

    #[tokio::test]
    async fn test_no_fold_returns_array() {
        let out = parallel_call(identity, vec![json!(1), json!("two")], ParallelOptions::new())
            .await
            .unwrap();
        assert_eq!(out, json!([1, "two"]));
    }

    #[tokio::test]
    async fn test_fold_shape_mismatch() {
        let options = ParallelOptions::new().with_fold(Fold::List);
        let err = parallel_call(identity, vec![json!([1]), json!({"a": 1})], options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UtilError::FoldShape { index: 1, expected: "array", found: "object" }
        ));
    }

    #[test]
    fn test_both_folds_rejected() {
        let err = ParallelOptions::from_flags(true, true, 8).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_zero_pool_rejected() {
        assert!(ParallelOptions::from_flags(false, false, 0).is_err());
        assert!(ParallelInvoker::new(0).is_err());
        assert!(ParallelInvoker::spawning(0).is_err());
    }

    #[tokio::test]
    async fn test_repeatable_args_reach_every_call() {
        let invoker = ParallelInvoker::new(2).unwrap();
        let out = invoker
            .map_with(
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                ('-', 3_usize),
                |arg: String, (sep, n): (char, usize)| async move { Ok(format!("{arg}{sep}{n}")) },
            )
            .await
            .unwrap()
            .into_vec();
        assert_eq!(out, vec!["a-3", "b-3", "c-3"]);
    }

    #[tokio::test]
    async fn test_parallel_call_with_repeatable() {
        let out = parallel_call_with(
            |v: Value, offset: i64| async move { Ok(json!([v.as_i64().unwrap_or(0) + offset])) },
            vec![json!(1), json!(2)],
            10_i64,
            ParallelOptions::new().with_fold(Fold::List),
        )
        .await
        .unwrap();
        assert_eq!(out, json!([11, 12]));
    }

    #[tokio::test]
    async fn test_starmap_unpacks_tuples() {
        let invoker = ParallelInvoker::spawning(3).unwrap();
        let out = invoker
            .starmap(vec![(1, 2), (3, 4), (5, 6)], |a: i32, b: i32| async move { Ok(a * b) })
            .await
            .unwrap()
            .into_vec();
        assert_eq!(out, vec![2, 12, 30]);
    }

    #[tokio::test]
    async fn test_typed_fold_list() {
        let out = ParallelInvoker::new(2)
            .unwrap()
            .map(vec![vec![1], vec![2, 3], vec![]], |v: Vec<i32>| async move { Ok(v) })
            .await
            .unwrap()
            .fold_list();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_error_propagates() {
        let err = ParallelInvoker::new(4)
            .unwrap()
            .map(vec![1, 2, 3], |i: i32| async move {
                if i == 2 {
                    Err(UtilError::custom("bad input"))
                } else {
                    Ok(i)
                }
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad input");
    }
}
