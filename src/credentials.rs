use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCredentials {
  #[serde(default)]
  youtube_api_key: Option<String>,
}

/// The one locally persisted value: the user's YouTube Data API key.
#[derive(Debug, Clone)]
pub struct CredentialStore {
  path: PathBuf,
}

impl CredentialStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `TRENDSCOUT_CREDENTIALS_PATH`, else `<config dir>/trendscout/credentials.json`.
  pub fn default_location() -> Option<Self> {
    if let Some(p) = std::env::var("TRENDSCOUT_CREDENTIALS_PATH")
      .ok()
      .filter(|v| !v.trim().is_empty())
    {
      return Some(Self::new(p.trim()));
    }
    dirs::config_dir().map(|dir| Self::new(dir.join("trendscout").join("credentials.json")))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Missing or unreadable files load as "no key".
  pub fn load(&self) -> Option<String> {
    let raw = match std::fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "could not read credential file");
        return None;
      }
    };
    match serde_json::from_str::<StoredCredentials>(&raw) {
      Ok(stored) => stored
        .youtube_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty()),
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "ignoring malformed credential file");
        None
      }
    }
  }

  pub fn save(&self, youtube_api_key: &str) -> std::io::Result<()> {
    let key = youtube_api_key.trim();
    if key.is_empty() {
      return self.clear();
    }
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let stored = StoredCredentials {
      youtube_api_key: Some(key.to_string()),
    };
    let body = serde_json::to_vec_pretty(&stored).map_err(std::io::Error::other)?;
    std::fs::write(&self.path, body)
  }

  pub fn clear(&self) -> std::io::Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e),
    }
  }
}
