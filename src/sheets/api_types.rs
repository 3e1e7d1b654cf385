//! Serde types matching the Apps Script web app protocol.
//!
//! These types are separate from domain records to keep the wire envelope
//! (action, secret, status) out of the rest of the crate.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::StoreError;

// ============================================================================
// Requests
// ============================================================================

/// POST body understood by the Apps Script `doPost` handler.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppsScriptRequest {
  pub action: String,
  pub secret: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sheet_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub row_data: Option<Vec<Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub row: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_data: Option<Map<String, Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_data: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_data: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mime_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Vec<Vec<Value>>>,
}

/// A write against a single sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetWrite {
  /// Append one row after the last populated row.
  Append(Vec<Value>),
  /// Replace the whole sheet content with these rows.
  Overwrite(Vec<Vec<Value>>),
  /// Update named columns of a 1-based sheet row.
  Update { row: usize, values: Map<String, Value> },
}

impl SheetWrite {
  /// Apps Script action name for this write.
  pub fn action(&self) -> &'static str {
    match self {
      Self::Append(_) => "appendRow",
      Self::Overwrite(_) => "overwriteSheetData",
      Self::Update { .. } => "updateRow",
    }
  }

  pub(crate) fn into_request(self, sheet: &str) -> AppsScriptRequest {
    let mut request = AppsScriptRequest {
      action: self.action().to_string(),
      sheet_name: Some(sheet.to_string()),
      ..Default::default()
    };
    match self {
      Self::Append(row) => request.row_data = Some(row),
      Self::Overwrite(rows) => request.data = Some(rows),
      Self::Update { row, values } => {
        request.row = Some(row);
        request.updated_data = Some(values);
      }
    }
    request
  }
}

/// File payload forwarded to the `uploadImage` action.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
  /// Base64 file content
  pub file_data: String,
  pub file_name: String,
  pub mime_type: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Envelope returned by both `doGet` and `doPost`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppsScriptResponse {
  pub status: String,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub data: Option<Value>,
  #[serde(default)]
  pub url: Option<String>,
}

/// Acknowledgement of a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteAck {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

impl From<AppsScriptResponse> for WriteAck {
  fn from(response: AppsScriptResponse) -> Self {
    Self {
      message: response.message,
      url: response.url,
    }
  }
}

/// Classify a raw Apps Script reply into a success envelope or a typed error.
///
/// `status == "success"` is the only success. A `"locked"` status means the
/// script could not take its document lock.
pub fn classify_response(http_status: u16, body: &str) -> Result<AppsScriptResponse, StoreError> {
  let response: AppsScriptResponse = serde_json::from_str(body).map_err(|e| {
    StoreError::InvalidResponse(format!("{} (HTTP {}, body: {})", e, http_status, truncate(body)))
  })?;

  let message = response.message.clone().unwrap_or_default();
  match response.status.as_str() {
    "locked" => Err(StoreError::RemoteBusy(message)),
    "success" if (200..300).contains(&http_status) => Ok(response),
    "success" => Err(StoreError::RemoteRejected(format!("HTTP {}", http_status))),
    _ if message.is_empty() => Err(StoreError::RemoteRejected(format!(
      "status '{}' (HTTP {})",
      response.status, http_status
    ))),
    _ => Err(StoreError::RemoteRejected(message)),
  }
}

fn truncate(body: &str) -> &str {
  match body.char_indices().nth(200) {
    Some((idx, _)) => &body[..idx],
    None => body,
  }
}

// ============================================================================
// Cell decoding
// ============================================================================
//
// Spreadsheet cells are loosely typed: a numeric column can hold numbers,
// numeric strings, or "" for blank cells.

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
  Number(f64),
  Bool(bool),
  Text(String),
  Null,
}

/// Numeric column. Blank cells decode as `0.0`.
pub fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  match Cell::deserialize(deserializer)? {
    Cell::Number(n) => Ok(n),
    Cell::Null => Ok(0.0),
    Cell::Text(s) if s.trim().is_empty() => Ok(0.0),
    Cell::Text(s) => s
      .trim()
      .replace(',', "")
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("expected a number, got '{}'", s))),
    Cell::Bool(b) => Err(serde::de::Error::custom(format!("expected a number, got {}", b))),
  }
}

/// Integer column. Blank cells decode as `0`.
pub fn de_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  let n = de_number(deserializer)?;
  if n.fract() != 0.0 {
    return Err(serde::de::Error::custom(format!("expected an integer, got {}", n)));
  }
  Ok(n as i64)
}

/// Checkbox column. Accepts booleans and `TRUE`/`FALSE` text; blank is `false`.
pub fn de_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  match Cell::deserialize(deserializer)? {
    Cell::Bool(b) => Ok(b),
    Cell::Null => Ok(false),
    Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
      "" | "false" | "no" | "0" => Ok(false),
      "true" | "yes" | "1" => Ok(true),
      _ => Err(serde::de::Error::custom(format!("expected a boolean, got '{}'", s))),
    },
    Cell::Number(n) => Ok(n != 0.0),
  }
}

/// Text column. Numbers are rendered back to text (barcodes, phone numbers).
pub fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match Cell::deserialize(deserializer)? {
    Cell::Text(s) => Ok(s),
    Cell::Null => Ok(String::new()),
    Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(format!("{}", n as i64)),
    Cell::Number(n) => Ok(n.to_string()),
    Cell::Bool(b) => Ok(b.to_string()),
  }
}
