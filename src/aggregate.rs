//! Concurrent fan-out over several datasets.
//!
//! Every dataset is loaded on its own task. All tasks run to completion and
//! the call fails as a whole if any of them failed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{Cacheable, DatasetLoader};
use crate::sheets::{
  BankAccount, Color, Driver, Location, PhoneCarrier, Product, ShippingMethod, SheetRecord, SheetRow, StoreError,
  TeamPage,
};

/// Loaded datasets keyed by result key.
pub type StaticData = BTreeMap<String, Value>;

type LoadFn = fn(DatasetLoader, String) -> BoxFuture<'static, Result<Value, StoreError>>;

/// One dataset to load: where it comes from, what it must decode as, and
/// where the result goes.
#[derive(Clone)]
pub struct DatasetSpec {
  pub dataset: String,
  pub result_key: String,
  load: LoadFn,
}

impl DatasetSpec {
  /// Load `dataset` as `Vec<T>` and store it under `result_key`.
  pub fn of<T: Cacheable + 'static>(dataset: impl Into<String>, result_key: impl Into<String>) -> Self {
    Self {
      dataset: dataset.into(),
      result_key: result_key.into(),
      load: load_as::<T>,
    }
  }

  /// Load the sheet bound to `R`.
  pub fn record<R: SheetRecord>(result_key: impl Into<String>) -> Self {
    Self::of::<R>(R::sheet(), result_key)
  }
}

impl fmt::Debug for DatasetSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DatasetSpec")
      .field("dataset", &self.dataset)
      .field("result_key", &self.result_key)
      .finish_non_exhaustive()
  }
}

fn load_as<T: Cacheable + 'static>(loader: DatasetLoader, dataset: String) -> BoxFuture<'static, Result<Value, StoreError>> {
  Box::pin(async move {
    let rows: Vec<T> = loader.load_default(&dataset).await?;
    serde_json::to_value(rows).map_err(|e| StoreError::InvalidResponse(format!("failed to encode {}: {}", dataset, e)))
  })
}

/// Reference data the order form needs in one round trip.
pub fn static_data_specs() -> Vec<DatasetSpec> {
  vec![
    DatasetSpec::record::<TeamPage>("pages"),
    DatasetSpec::record::<Product>("products"),
    DatasetSpec::record::<Location>("locations"),
    DatasetSpec::record::<ShippingMethod>("shippingMethods"),
    DatasetSpec::of::<SheetRow>("Settings", "settings"),
    DatasetSpec::record::<Color>("colors"),
    DatasetSpec::record::<Driver>("drivers"),
    DatasetSpec::record::<BankAccount>("bankAccounts"),
    DatasetSpec::record::<PhoneCarrier>("phoneCarriers"),
  ]
}

/// Why a single dataset of a fan-out failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureCause {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error("load task panicked: {0}")]
  Panicked(String),
  #[error("result key requested more than once")]
  DuplicateKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFailure {
  pub result_key: String,
  pub cause: FailureCause,
}

/// One or more datasets of a fan-out failed. Failures are listed in request order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_failures(.failures))]
pub struct AggregateError {
  pub failures: Vec<DatasetFailure>,
}

impl AggregateError {
  pub fn failed_keys(&self) -> Vec<&str> {
    self.failures.iter().map(|f| f.result_key.as_str()).collect()
  }
}

fn render_failures(failures: &[DatasetFailure]) -> String {
  failures
    .iter()
    .map(|f| format!("Failed to fetch {}: {}", f.result_key, f.cause))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Load every dataset in parallel and wait for all of them.
///
/// There is no early cancellation: a failing dataset does not stop the
/// others. Specs that reuse a result key are rejected before anything is
/// fetched.
pub async fn load_all(loader: &DatasetLoader, specs: Vec<DatasetSpec>) -> Result<StaticData, AggregateError> {
  check_distinct_keys(&specs)?;

  let count = specs.len();
  let tasks: Vec<_> = specs
    .into_iter()
    .map(|spec| {
      let handle = tokio::spawn((spec.load)(loader.clone(), spec.dataset));
      (spec.result_key, handle)
    })
    .collect();

  let mut data = StaticData::new();
  let mut failures = Vec::new();
  for (result_key, handle) in tasks {
    match handle.await {
      Ok(Ok(value)) => {
        data.insert(result_key, value);
      }
      Ok(Err(e)) => {
        warn!(result_key, error = %e, "Dataset load failed");
        failures.push(DatasetFailure {
          result_key,
          cause: e.into(),
        });
      }
      Err(e) => {
        warn!(result_key, error = %e, "Dataset load task did not complete");
        failures.push(DatasetFailure {
          result_key,
          cause: FailureCause::Panicked(e.to_string()),
        });
      }
    }
  }

  if failures.is_empty() {
    info!(datasets = count, "Loaded datasets");
    Ok(data)
  } else {
    Err(AggregateError { failures })
  }
}

fn check_distinct_keys(specs: &[DatasetSpec]) -> Result<(), AggregateError> {
  let mut seen = BTreeSet::new();
  let mut reported = BTreeSet::new();
  let failures: Vec<_> = specs
    .iter()
    .filter(|spec| !seen.insert(spec.result_key.as_str()) && reported.insert(spec.result_key.as_str()))
    .map(|spec| DatasetFailure {
      result_key: spec.result_key.clone(),
      cause: FailureCause::DuplicateKey,
    })
    .collect();

  if failures.is_empty() {
    Ok(())
  } else {
    Err(AggregateError { failures })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{TtlCache, TtlPolicy};
  use crate::sheets::testing::MemoryStore;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn store() -> MemoryStore {
    MemoryStore::new()
      .with_sheet("Colors", json!([{"ColorName": "Red"}, {"ColorName": "Blue"}]))
      .with_sheet("Drivers", json!([{"DriverName": "Sok", "ImageURL": ""}]))
      .with_sheet("Products", json!([{"ProductName": "Serum", "Price": 3}]))
  }

  fn loader(store: Arc<MemoryStore>) -> DatasetLoader {
    DatasetLoader::new(store, Arc::new(TtlCache::new()), TtlPolicy::default())
  }

  fn specs() -> Vec<DatasetSpec> {
    vec![
      DatasetSpec::record::<Color>("colors"),
      DatasetSpec::record::<Driver>("drivers"),
      DatasetSpec::record::<Product>("products"),
    ]
  }

  #[tokio::test]
  async fn test_load_all_returns_every_result_key() {
    let store = Arc::new(store());
    let data = load_all(&loader(store), specs()).await.unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data["colors"][1]["ColorName"], "Blue");
    assert_eq!(data["drivers"][0]["DriverName"], "Sok");
    assert_eq!(data["products"][0]["Price"], 3.0);
  }

  #[tokio::test]
  async fn test_one_failure_fails_all_but_every_fetch_is_issued() {
    let store = Arc::new(store());
    store.fail_reads("Drivers", StoreError::Transport("timed out".into()));

    let err = load_all(&loader(store.clone()), specs()).await.unwrap_err();

    assert_eq!(err.failed_keys(), vec!["drivers"]);
    assert_eq!(store.read_count("Colors"), 1);
    assert_eq!(store.read_count("Drivers"), 1);
    assert_eq!(store.read_count("Products"), 1);
    assert!(err.to_string().contains("Failed to fetch drivers"));
  }

  #[tokio::test]
  async fn test_every_failing_key_is_reported() {
    let store = Arc::new(store());
    store.fail_reads("Colors", StoreError::RemoteRejected("Sheet not found".into()));
    store.set_sheet("Products", json!([{"Price": "abc"}]));

    let err = load_all(&loader(store), specs()).await.unwrap_err();

    assert_eq!(err.failed_keys(), vec!["colors", "products"]);
    assert!(matches!(
      err.failures[1].cause,
      FailureCause::Store(StoreError::InvalidResponse(_))
    ));
    assert_eq!(
      err.to_string().matches("; ").count(),
      1,
      "failures are joined into one message"
    );
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_datasets_are_fetched_in_parallel() {
    let store = Arc::new(store().with_read_delay(Duration::from_millis(50)));

    load_all(&loader(store.clone()), specs()).await.unwrap();

    assert!(store.max_concurrent_reads() > 1);
  }

  #[tokio::test]
  async fn test_cached_datasets_are_not_refetched() {
    let store = Arc::new(store());
    let loader = loader(store.clone());

    load_all(&loader, specs()).await.unwrap();
    load_all(&loader, specs()).await.unwrap();

    assert_eq!(store.reads().len(), 3);
  }

  #[tokio::test]
  async fn test_duplicate_result_keys_are_rejected_before_fetching() {
    let store = Arc::new(store());
    let specs = vec![
      DatasetSpec::record::<Color>("colors"),
      DatasetSpec::record::<Product>("colors"),
      DatasetSpec::record::<Driver>("colors"),
    ];

    let err = load_all(&loader(store.clone()), specs).await.unwrap_err();

    assert_eq!(err.failed_keys(), vec!["colors"]);
    assert_eq!(err.failures[0].cause, FailureCause::DuplicateKey);
    assert!(store.reads().is_empty());
  }

  #[test]
  fn test_static_data_keys() {
    let keys: Vec<_> = static_data_specs().into_iter().map(|s| s.result_key).collect();
    assert_eq!(
      keys,
      vec![
        "pages",
        "products",
        "locations",
        "shippingMethods",
        "settings",
        "colors",
        "drivers",
        "bankAccounts",
        "phoneCarriers"
      ]
    );
  }
}
