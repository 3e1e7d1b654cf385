//! Failures surfaced by the remote store.

/// Error returned by [`RemoteStore`](super::RemoteStore) operations and by the dataset loader.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
  /// The upstream could not be reached or the response body could not be read.
  #[error("failed to reach sheet store: {0}")]
  Transport(String),
  /// The upstream answered but the payload does not match the expected shape.
  #[error("invalid response from sheet store: {0}")]
  InvalidResponse(String),
  /// The upstream reported a business-level failure.
  #[error("sheet store rejected request: {0}")]
  RemoteRejected(String),
  /// The upstream spreadsheet is locked by another writer.
  #[error("sheet store is busy, please try again: {0}")]
  RemoteBusy(String),
}

impl StoreError {
  /// Whether the caller may retry the same request later.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transport(_) | Self::RemoteBusy(_))
  }
}

impl From<reqwest::Error> for StoreError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      Self::InvalidResponse(err.to_string())
    } else {
      Self::Transport(err.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_retryable_classification() {
    assert!(StoreError::Transport("timeout".into()).is_retryable());
    assert!(StoreError::RemoteBusy("locked".into()).is_retryable());
    assert!(!StoreError::InvalidResponse("bad".into()).is_retryable());
    assert!(!StoreError::RemoteRejected("no sheet".into()).is_retryable());
  }
}
