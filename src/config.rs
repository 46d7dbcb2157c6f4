use crate::error::AppError;
use crate::outlier_engine::OutlierConfig;
use crate::policy::MissingKeyPolicy;
use crate::providers::gemini::GeminiConfig;
use crate::providers::youtube_data::YoutubeDataConfig;

/// Everything a flow needs to reach the outside world. The YouTube key is
/// supplied by the caller per request rather than read from global state.
#[derive(Debug, Clone)]
pub struct AppContext {
  pub gemini: Option<GeminiConfig>,
  pub youtube: Option<YoutubeDataConfig>,
  pub trends_missing_key: MissingKeyPolicy,
  pub outliers: OutlierConfig,
}

impl AppContext {
  pub fn from_env(youtube_api_key: Option<&str>) -> Self {
    let trends_missing_key = std::env::var("TRENDS_MISSING_KEY_POLICY")
      .ok()
      .and_then(|v| MissingKeyPolicy::parse(&v))
      .unwrap_or(MissingKeyPolicy::RequireKey);

    Self {
      gemini: GeminiConfig::from_env_optional(),
      youtube: youtube_api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(YoutubeDataConfig::new),
      trends_missing_key,
      outliers: OutlierConfig::default(),
    }
  }

  pub fn gemini(&self) -> Result<&GeminiConfig, AppError> {
    self.gemini.as_ref().ok_or(AppError::MissingGeminiKey)
  }

  pub fn youtube(&self) -> Result<&YoutubeDataConfig, AppError> {
    self.youtube.as_ref().ok_or(AppError::MissingCredential)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_key_counts_as_missing() {
    let ctx = AppContext {
      gemini: None,
      youtube: None,
      trends_missing_key: MissingKeyPolicy::RequireKey,
      outliers: OutlierConfig::default(),
    };
    assert!(matches!(ctx.youtube(), Err(AppError::MissingCredential)));
    assert!(matches!(ctx.gemini(), Err(AppError::MissingGeminiKey)));

    let ctx = AppContext::from_env(Some("   "));
    assert!(ctx.youtube.is_none());
    let ctx = AppContext::from_env(Some(" key "));
    assert_eq!(ctx.youtube().unwrap().api_key, "key");
  }
}
