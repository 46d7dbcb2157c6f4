//! Per-call-site failure handling. Each flow states how it reacts when an
//! upstream stage fails, instead of sharing one global handler.

use std::future::Future;

use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
  /// Hand the error to the caller unchanged.
  Propagate,
  /// Log the error and answer from the model-only search path instead.
  FallbackToModelSearch,
  /// Log the error and answer with an empty result.
  SuppressToEmpty,
}

/// What trend discovery does when no YouTube key was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKeyPolicy {
  RequireKey,
  ModelSearch,
}

impl MissingKeyPolicy {
  pub fn parse(value: &str) -> Option<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "require_key" | "require" => Some(MissingKeyPolicy::RequireKey),
      "model_search" | "fallback" => Some(MissingKeyPolicy::ModelSearch),
      _ => None,
    }
  }
}

/// Applies `policy` to the outcome of `stage`. `fallback` is only awaited
/// for `FallbackToModelSearch`; configuration errors are never swallowed.
pub async fn apply<T, Fb, Fut>(
  flow: &'static str,
  policy: FailurePolicy,
  result: Result<T, AppError>,
  fallback: Fb,
) -> Result<T, AppError>
where
  T: Default,
  Fb: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, AppError>>,
{
  let err = match result {
    Ok(v) => return Ok(v),
    Err(e) => e,
  };
  if err.is_configuration() {
    return Err(err);
  }

  match policy {
    FailurePolicy::Propagate => Err(err),
    FailurePolicy::FallbackToModelSearch => {
      warn!(flow, error = %err, "primary path failed, falling back to model search");
      fallback().await
    }
    FailurePolicy::SuppressToEmpty => {
      warn!(flow, error = %err, "suppressing failure to empty result");
      Ok(T::default())
    }
  }
}
