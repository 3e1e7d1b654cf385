//! Image upload proxy and the follow-up cell update.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::cache::DatasetLoader;
use crate::sheets::{FileUpload, SheetRow, SheetWrite, StoreError};

/// Upload request from the admin UI.
///
/// When `sheet_name`, `primary_key` and `column_name` are all present, the
/// uploaded file's URL is also written into that cell.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadRequest {
  #[serde(flatten)]
  pub file: FileUpload,
  #[serde(default)]
  pub sheet_name: Option<String>,
  /// Single `{header: value}` pair identifying the row
  #[serde(default)]
  pub primary_key: Option<BTreeMap<String, String>>,
  #[serde(default)]
  pub column_name: Option<String>,
}

/// The cell an uploaded file's URL goes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTarget {
  pub sheet: String,
  pub key_header: String,
  pub key_value: String,
  pub column: String,
}

impl ImageUploadRequest {
  /// Cell to update after upload, if the request names one completely.
  pub fn cell_target(&self) -> Option<CellTarget> {
    let sheet = self.sheet_name.as_deref().filter(|s| !s.is_empty())?;
    let column = self.column_name.as_deref().filter(|c| !c.is_empty())?;
    let (key_header, key_value) = self.primary_key.as_ref()?.iter().next()?;
    if key_header.is_empty() || key_value.is_empty() {
      warn!(sheet, column, "Missing primary key info for image update");
      return None;
    }
    Some(CellTarget {
      sheet: sheet.to_string(),
      key_header: key_header.clone(),
      key_value: key_value.clone(),
      column: column.to_string(),
    })
  }
}

/// 1-based sheet row of the first row whose `header` cell renders as `value`.
///
/// Row 1 is the header row, so the first data row is row 2.
pub fn locate_row(rows: &[SheetRow], header: &str, value: &str) -> Option<usize> {
  rows
    .iter()
    .position(|row| row.get(header).is_some_and(|cell| cell_text(cell) == value))
    .map(|index| index + 2)
}

fn cell_text(cell: &Value) -> String {
  match cell {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Write `url` into the target cell and invalidate the sheet's cache.
///
/// Cached rows are used to find the row when available, otherwise the sheet
/// is read live.
pub async fn update_cell(loader: &DatasetLoader, target: &CellTarget, url: &str) -> Result<(), StoreError> {
  let rows = match loader.peek::<SheetRow>(&target.sheet) {
    Some(rows) if !rows.is_empty() => rows,
    _ => {
      let raw = loader.remote().read_dataset(&target.sheet).await?;
      serde_json::from_value(raw)
        .map_err(|e| StoreError::InvalidResponse(format!("mismatched data structure for {}: {}", target.sheet, e)))?
    }
  };

  let Some(row) = locate_row(&rows, &target.key_header, &target.key_value) else {
    warn!(
      sheet = %target.sheet,
      key = %target.key_header,
      value = %target.key_value,
      "Row not found for image update"
    );
    return Ok(());
  };

  let mut values = Map::new();
  values.insert(target.column.clone(), Value::String(url.to_string()));
  loader
    .remote()
    .write_dataset(&target.sheet, SheetWrite::Update { row, values })
    .await?;

  info!(sheet = %target.sheet, row, column = %target.column, "Updated sheet with image URL");
  loader.invalidate(&target.sheet);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn rows() -> Vec<SheetRow> {
    serde_json::from_value(json!([
      {"ProductName": "Serum", "Barcode": 111},
      {"ProductName": "Toner", "Barcode": "222"},
    ]))
    .unwrap()
  }

  #[test]
  fn test_locate_row_accounts_for_header() {
    assert_eq!(locate_row(&rows(), "ProductName", "Serum"), Some(2));
    assert_eq!(locate_row(&rows(), "ProductName", "Toner"), Some(3));
    assert_eq!(locate_row(&rows(), "ProductName", "Lotion"), None);
  }

  #[test]
  fn test_locate_row_matches_numeric_cells_as_text() {
    assert_eq!(locate_row(&rows(), "Barcode", "111"), Some(2));
    assert_eq!(locate_row(&rows(), "Barcode", "222"), Some(3));
  }

  #[test]
  fn test_cell_target_requires_every_part() {
    let request: ImageUploadRequest = serde_json::from_value(json!({
      "fileData": "aGVsbG8=",
      "fileName": "serum.png",
      "mimeType": "image/png",
      "sheetName": "Products",
      "primaryKey": {"ProductName": "Serum"},
      "columnName": "ImageURL",
    }))
    .unwrap();
    assert_eq!(
      request.cell_target(),
      Some(CellTarget {
        sheet: "Products".into(),
        key_header: "ProductName".into(),
        key_value: "Serum".into(),
        column: "ImageURL".into(),
      })
    );

    let bare: ImageUploadRequest = serde_json::from_value(json!({
      "fileData": "aGVsbG8=",
      "fileName": "serum.png",
      "mimeType": "image/png",
    }))
    .unwrap();
    assert_eq!(bare.cell_target(), None);
  }
}
