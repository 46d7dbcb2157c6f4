use thiserror::Error;

/// A non-success answer (or a transport failure) from one of the external
/// services. `status` is `None` when the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
  pub service: &'static str,
  pub status: Option<u16>,
  pub message: String,
}

impl UpstreamError {
  pub fn transport(service: &'static str, message: impl Into<String>) -> Self {
    Self {
      service,
      status: None,
      message: message.into(),
    }
  }

  pub fn http(service: &'static str, status: u16, message: impl Into<String>) -> Self {
    Self {
      service,
      status: Some(status),
      message: message.into(),
    }
  }
}

impl std::fmt::Display for UpstreamError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.status {
      Some(code) => write!(f, "{} error (status={}): {}", self.service, code, self.message),
      None => write!(f, "{} error: {}", self.service, self.message),
    }
  }
}

impl std::error::Error for UpstreamError {}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("YouTube API key required")]
  MissingCredential,

  #[error("Missing GEMINI_API_KEY")]
  MissingGeminiKey,

  #[error(transparent)]
  Upstream(#[from] UpstreamError),

  #[error("Invalid model output: {0}")]
  Parse(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

impl AppError {
  /// Stable machine-readable code for the JSON error envelope.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::MissingCredential => "key_required",
      AppError::MissingGeminiKey => "config_error",
      AppError::Upstream(_) => "upstream_error",
      AppError::Parse(_) => "parse_error",
      AppError::InvalidInput(_) => "bad_request",
    }
  }

  pub fn is_configuration(&self) -> bool {
    matches!(self, AppError::MissingCredential | AppError::MissingGeminiKey)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upstream_error_display_includes_status() {
    let err = UpstreamError::http("youtube", 403, "quotaExceeded");
    assert_eq!(err.to_string(), "youtube error (status=403): quotaExceeded");

    let err = UpstreamError::transport("gemini", "connection refused");
    assert_eq!(err.to_string(), "gemini error: connection refused");
  }

  #[test]
  fn app_error_codes_are_stable() {
    assert_eq!(AppError::MissingCredential.code(), "key_required");
    assert!(AppError::MissingCredential.is_configuration());
    let upstream: AppError = UpstreamError::http("youtube", 500, "boom").into();
    assert_eq!(upstream.code(), "upstream_error");
    assert!(!upstream.is_configuration());
  }
}
