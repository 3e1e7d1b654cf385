use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};
use url::Url;

use crate::config::Config;

use super::api_types::{classify_response, AppsScriptRequest, FileUpload, SheetWrite, WriteAck};
use super::error::StoreError;

/// Read/write access to the spreadsheet store.
///
/// The store is authoritative. Implementations own transport concerns
/// (timeouts, authentication) and report failures as [`StoreError`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// Read every row of a sheet as a JSON array of header-keyed objects.
  async fn read_dataset(&self, name: &str) -> Result<Value, StoreError>;

  /// Apply a write to a sheet.
  async fn write_dataset(&self, name: &str, write: SheetWrite) -> Result<WriteAck, StoreError>;

  /// Append an entry to the user activity log.
  async fn log_activity(&self, username: &str, action: &str, details: Value) -> Result<(), StoreError>;

  /// Store a file in the backing drive and return its public URL in the ack.
  async fn upload_file(&self, file: FileUpload) -> Result<WriteAck, StoreError>;
}

/// Apps Script web app client
#[derive(Clone)]
pub struct AppsScriptClient {
  client: reqwest::Client,
  url: Url,
  secret: String,
}

impl AppsScriptClient {
  pub fn new(config: &Config) -> color_eyre::Result<Self> {
    let secret = Config::get_apps_script_secret()?;
    let url = Url::parse(&config.apps_script.url)
      .map_err(|e| color_eyre::eyre::eyre!("Invalid Apps Script URL '{}': {}", config.apps_script.url, e))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.apps_script.timeout_secs))
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, url, secret })
  }

  async fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<super::AppsScriptResponse, StoreError> {
    let mut url = self.url.clone();
    url
      .query_pairs_mut()
      .append_pair("action", action)
      .append_pair("secret", &self.secret)
      .extend_pairs(params);

    debug!(action, "Apps Script GET");
    let response = self.client.get(url).send().await.map_err(|e| {
      error!(action, error = %e, "Apps Script GET failed");
      StoreError::from(e)
    })?;

    let status = response.status().as_u16();
    let body = response
      .text()
      .await
      .map_err(|e| StoreError::Transport(format!("failed to read response: {}", e)))?;

    classify_response(status, &body).inspect_err(|e| error!(action, error = %e, "Apps Script GET error"))
  }

  async fn post(&self, mut request: AppsScriptRequest) -> Result<super::AppsScriptResponse, StoreError> {
    request.secret = self.secret.clone();
    let action = request.action.clone();

    debug!(action, sheet = ?request.sheet_name, "Apps Script POST");
    let response = self
      .client
      .post(self.url.clone())
      .json(&request)
      .send()
      .await
      .map_err(|e| {
        error!(action, error = %e, "Apps Script POST failed");
        StoreError::from(e)
      })?;

    let status = response.status().as_u16();
    let body = response
      .text()
      .await
      .map_err(|e| StoreError::Transport(format!("failed to read response: {}", e)))?;

    classify_response(status, &body).inspect_err(|e| error!(action, error = %e, "Apps Script POST error"))
  }
}

#[async_trait]
impl RemoteStore for AppsScriptClient {
  async fn read_dataset(&self, name: &str) -> Result<Value, StoreError> {
    let response = self.get("getSheetData", &[("sheetName", name)]).await?;
    // An empty sheet comes back without a data field.
    Ok(response.data.unwrap_or_else(|| json!([])))
  }

  async fn write_dataset(&self, name: &str, write: SheetWrite) -> Result<WriteAck, StoreError> {
    let response = self.post(write.into_request(name)).await?;
    Ok(response.into())
  }

  async fn log_activity(&self, username: &str, action: &str, details: Value) -> Result<(), StoreError> {
    let request = AppsScriptRequest {
      action: "logUserActivity".to_string(),
      sheet_name: Some(super::USER_ACTIVITY_SHEET.to_string()),
      log_data: Some(json!({
        "username": username,
        "action": action,
        "details": details,
      })),
      ..Default::default()
    };
    self.post(request).await?;
    Ok(())
  }

  async fn upload_file(&self, file: FileUpload) -> Result<WriteAck, StoreError> {
    let request = AppsScriptRequest {
      action: "uploadImage".to_string(),
      file_data: Some(file.file_data),
      file_name: Some(file.file_name),
      mime_type: Some(file.mime_type),
      ..Default::default()
    };
    let response = self.post(request).await?;
    Ok(response.into())
  }
}
