use std::cmp::Ordering;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct OutlierConfig {
  /// Videos must have strictly more views than this to be considered.
  pub min_views: u64,
  pub explosive_ratio: f64,
  pub viral_anomaly_ratio: f64,
}

impl Default for OutlierConfig {
  fn default() -> Self {
    Self {
      min_views: 1_000,
      explosive_ratio: 5.0,
      viral_anomaly_ratio: 10.0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutlierTier {
  Outlier,
  Explosive,
  ViralAnomaly,
}

impl OutlierTier {
  pub fn label(&self) -> &'static str {
    match self {
      OutlierTier::Outlier => "Outlier",
      OutlierTier::Explosive => "Explosive",
      OutlierTier::ViralAnomaly => "Viral Anomaly",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierClassification {
  /// Full-precision views / typical views; used for tiering and sorting.
  pub ratio: f64,
  pub tier: OutlierTier,
}

impl OutlierClassification {
  /// Ratio rounded to two decimals for display and storage.
  pub fn display_ratio(&self) -> f64 {
    round_to_hundredths(self.ratio)
  }
}

pub fn round_to_hundredths(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

fn tier_for_ratio(ratio: f64, cfg: &OutlierConfig) -> OutlierTier {
  if ratio > cfg.viral_anomaly_ratio {
    OutlierTier::ViralAnomaly
  } else if ratio > cfg.explosive_ratio {
    OutlierTier::Explosive
  } else {
    OutlierTier::Outlier
  }
}

pub fn classify_outlier_with(
  view_count: u64,
  typical_views: u64,
  cfg: &OutlierConfig,
) -> Option<OutlierClassification> {
  if typical_views == 0 {
    return None;
  }
  let ratio = view_count as f64 / typical_views as f64;
  Some(OutlierClassification {
    ratio,
    tier: tier_for_ratio(ratio, cfg),
  })
}

/// Ratio and tier for a video against its channel baseline. A zero baseline
/// means the video is excluded, not scored.
pub fn classify_outlier(view_count: u64, typical_views: u64) -> Option<OutlierClassification> {
  classify_outlier_with(view_count, typical_views, &OutlierConfig::default())
}

pub fn passes_inclusion_filter(view_count: u64, typical_views: u64, cfg: &OutlierConfig) -> bool {
  view_count > cfg.min_views && typical_views > 0
}

/// Descending by ratio; equal ratios fall back to ascending id so repeated
/// runs over the same data produce the same order.
pub fn compare_ranked(a_ratio: f64, a_id: &str, b_ratio: f64, b_id: &str) -> Ordering {
  b_ratio
    .partial_cmp(&a_ratio)
    .unwrap_or(Ordering::Equal)
    .then_with(|| a_id.cmp(b_id))
}

pub fn rank_by_ratio<T, F>(items: &mut [T], key: F)
where
  F: Fn(&T) -> (f64, &str),
{
  items.sort_by(|a, b| {
    let (a_ratio, a_id) = key(a);
    let (b_ratio, b_id) = key(b);
    compare_ranked(a_ratio, a_id, b_ratio, b_id)
  });
}
