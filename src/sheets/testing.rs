//! In-memory [`RemoteStore`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::api_types::{FileUpload, SheetWrite, WriteAck};
use super::client::RemoteStore;
use super::error::StoreError;

/// Counting store backed by a map of sheet name to JSON rows.
#[derive(Default)]
pub struct MemoryStore {
  sheets: Mutex<HashMap<String, Value>>,
  failing: Mutex<HashMap<String, StoreError>>,
  busy_writes: Mutex<HashSet<String>>,
  reads: Mutex<Vec<String>>,
  writes: Mutex<Vec<(String, SheetWrite)>>,
  activity: Mutex<Vec<(String, String)>>,
  read_delay: Mutex<Option<Duration>>,
  blank_upload_url: Mutex<bool>,
  in_flight: AtomicUsize,
  max_in_flight: AtomicUsize,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_sheet(self, name: &str, rows: Value) -> Self {
    self.sheets.lock().insert(name.to_string(), rows);
    self
  }

  pub fn set_sheet(&self, name: &str, rows: Value) {
    self.sheets.lock().insert(name.to_string(), rows);
  }

  /// Make reads of `name` fail with `err`.
  pub fn fail_reads(&self, name: &str, err: StoreError) {
    self.failing.lock().insert(name.to_string(), err);
  }

  /// Make writes to `name` fail as if the spreadsheet were locked.
  pub fn busy_writes(&self, name: &str) {
    self.busy_writes.lock().insert(name.to_string());
  }

  pub fn with_read_delay(self, delay: Duration) -> Self {
    *self.read_delay.lock() = Some(delay);
    self
  }

  /// Acknowledge uploads with an empty URL.
  pub fn with_blank_upload_url(self) -> Self {
    *self.blank_upload_url.lock() = true;
    self
  }

  pub fn read_count(&self, name: &str) -> usize {
    self.reads.lock().iter().filter(|n| *n == name).count()
  }

  pub fn reads(&self) -> Vec<String> {
    self.reads.lock().clone()
  }

  pub fn writes(&self) -> Vec<(String, SheetWrite)> {
    self.writes.lock().clone()
  }

  pub fn writes_to(&self, name: &str) -> Vec<SheetWrite> {
    self
      .writes
      .lock()
      .iter()
      .filter(|(n, _)| n == name)
      .map(|(_, w)| w.clone())
      .collect()
  }

  pub fn activity(&self) -> Vec<(String, String)> {
    self.activity.lock().clone()
  }

  /// Highest number of reads observed running at the same time.
  pub fn max_concurrent_reads(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl RemoteStore for MemoryStore {
  async fn read_dataset(&self, name: &str) -> Result<Value, StoreError> {
    self.reads.lock().push(name.to_string());
    let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let delay = *self.read_delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    if let Some(err) = self.failing.lock().get(name) {
      return Err(err.clone());
    }
    let sheets = self.sheets.lock();
    sheets
      .get(name)
      .cloned()
      .ok_or_else(|| StoreError::RemoteRejected(format!("Sheet '{}' not found", name)))
  }

  async fn write_dataset(&self, name: &str, write: SheetWrite) -> Result<WriteAck, StoreError> {
    if self.busy_writes.lock().contains(name) {
      return Err(StoreError::RemoteBusy("Sheet is locked".into()));
    }
    self.writes.lock().push((name.to_string(), write));
    Ok(WriteAck::default())
  }

  async fn log_activity(&self, username: &str, action: &str, _details: Value) -> Result<(), StoreError> {
    self.activity.lock().push((username.to_string(), action.to_string()));
    Ok(())
  }

  async fn upload_file(&self, file: FileUpload) -> Result<WriteAck, StoreError> {
    let url = if *self.blank_upload_url.lock() {
      String::new()
    } else {
      format!("https://drive.example/{}", file.file_name)
    };
    Ok(WriteAck { message: None, url: Some(url) })
  }
}

