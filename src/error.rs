use crate::aggregate::AggregateError;
use crate::sheets::StoreError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by [`SheetService`](crate::service::SheetService).
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Aggregate(#[from] AggregateError),

  /// The caller sent something the service cannot act on.
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("configuration error: {0}")]
  Config(String),
}

impl Error {
  /// Whether retrying the same call later may succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Store(e) => e.is_retryable(),
      Self::Aggregate(e) => e.failures.iter().any(|f| match &f.cause {
        crate::aggregate::FailureCause::Store(e) => e.is_retryable(),
        crate::aggregate::FailureCause::Panicked(_) | crate::aggregate::FailureCause::DuplicateKey => false,
      }),
      Self::InvalidRequest(_) | Self::Config(_) => false,
    }
  }
}
