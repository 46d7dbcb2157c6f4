use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::baseline::{ChannelBaseline, SubscriberCount};
use crate::outlier_engine::{
  classify_outlier_with, passes_inclusion_filter, rank_by_ratio, OutlierClassification, OutlierConfig,
  OutlierTier,
};
use crate::trend_nature::{classify_trend_nature, TrendNature};

/// One platform video observation, with counts already parsed to integers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
  pub id: String,
  pub channel_id: String,
  pub title: String,
  pub channel_title: String,
  pub description: String,
  pub published_at: Option<DateTime<Utc>>,
  pub thumbnail_url: Option<String>,
  pub tags: Vec<String>,
  pub view_count: u64,
  pub like_count: u64,
  pub comment_count: u64,
}

impl VideoRecord {
  pub fn watch_url(&self) -> String {
    format!("https://www.youtube.com/watch?v={}", self.id)
  }
}

/// Channel ids in first-seen order, each once.
pub fn distinct_channel_ids(videos: &[VideoRecord]) -> Vec<String> {
  let mut seen = HashSet::new();
  videos
    .iter()
    .map(|v| v.channel_id.trim())
    .filter(|id| !id.is_empty())
    .filter(|id| seen.insert(id.to_string()))
    .map(|id| id.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierResult {
  pub video: VideoRecord,
  pub channel: ChannelBaseline,
  pub typical_views: u64,
  pub classification: OutlierClassification,
}

impl OutlierResult {
  pub fn performance_ratio(&self) -> f64 {
    self.classification.display_ratio()
  }

  pub fn tier(&self) -> OutlierTier {
    self.classification.tier
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutlierResultJson<'a> {
  id: &'a str,
  title: &'a str,
  channel_id: &'a str,
  channel_title: &'a str,
  thumbnail: Option<&'a str>,
  published_at: Option<DateTime<Utc>>,
  view_count: u64,
  like_count: u64,
  comment_count: u64,
  channel_subscriber_count: SubscriberCount,
  channel_typical_views: u64,
  performance_ratio: f64,
  tier: OutlierTier,
  tier_label: &'static str,
  video_url: String,
}

impl Serialize for OutlierResult {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    OutlierResultJson {
      id: &self.video.id,
      title: &self.video.title,
      channel_id: &self.video.channel_id,
      channel_title: &self.video.channel_title,
      thumbnail: self.video.thumbnail_url.as_deref(),
      published_at: self.video.published_at,
      view_count: self.video.view_count,
      like_count: self.video.like_count,
      comment_count: self.video.comment_count,
      channel_subscriber_count: self.channel.subscriber_count,
      channel_typical_views: self.typical_views,
      performance_ratio: self.performance_ratio(),
      tier: self.tier(),
      tier_label: self.tier().label(),
      video_url: self.video.watch_url(),
    }
    .serialize(serializer)
  }
}

fn baseline_for(channels: &HashMap<String, ChannelBaseline>, channel_id: &str) -> ChannelBaseline {
  channels
    .get(channel_id)
    .cloned()
    .unwrap_or_else(|| ChannelBaseline::unknown(channel_id))
}

/// Joins videos with their channel baselines, drops everything that fails
/// the inclusion filter, and returns the rest ranked by ratio.
pub fn assemble_outliers(
  videos: &[VideoRecord],
  channels: &HashMap<String, ChannelBaseline>,
  cfg: &OutlierConfig,
) -> Vec<OutlierResult> {
  let mut out: Vec<OutlierResult> = videos
    .iter()
    .filter_map(|video| {
      let channel = baseline_for(channels, &video.channel_id);
      let typical_views = channel.typical_views();
      if !passes_inclusion_filter(video.view_count, typical_views, cfg) {
        return None;
      }
      let classification = classify_outlier_with(video.view_count, typical_views, cfg)?;
      Some(OutlierResult {
        video: video.clone(),
        channel,
        typical_views,
        classification,
      })
    })
    .collect();

  rank_by_ratio(&mut out, |r| (r.classification.ratio, r.video.id.as_str()));
  out
}

/// Deterministic aggregate over a fetched sample, computed alongside the
/// model's clustering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSummary {
  pub video_count: usize,
  pub average_views: u64,
  /// Mean over channels with a known subscriber count; `None` if there are none.
  pub average_subscriber_count: Option<u64>,
  pub nature: Option<TrendNature>,
}

pub fn summarize_sample(videos: &[VideoRecord], channels: &HashMap<String, ChannelBaseline>) -> SampleSummary {
  let video_count = videos.len();
  let total_views: u128 = videos.iter().map(|v| v.view_count as u128).sum();
  let average_views = if video_count > 0 {
    (total_views / video_count as u128) as u64
  } else {
    0
  };

  let subs: Vec<u64> = videos
    .iter()
    .filter_map(|v| channels.get(&v.channel_id))
    .filter_map(|c| c.subscriber_count.known())
    .collect();
  let average_subscriber_count = if subs.is_empty() {
    None
  } else {
    let total: u128 = subs.iter().map(|s| *s as u128).sum();
    Some((total / subs.len() as u128) as u64)
  };

  SampleSummary {
    video_count,
    average_views,
    average_subscriber_count,
    nature: average_subscriber_count.map(|avg| classify_trend_nature(avg as f64)),
  }
}
