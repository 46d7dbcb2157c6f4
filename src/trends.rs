use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::assembly::{distinct_channel_ids, summarize_sample, SampleSummary, VideoRecord};
use crate::baseline::{ChannelBaseline, SubscriberCount};
use crate::compact_number::parse_compact_number;
use crate::config::AppContext;
use crate::error::AppError;
use crate::model_json::{parse_model_json_array, truncate_chars};
use crate::niche::Niche;
use crate::outlier_engine::round_to_hundredths;
use crate::policy::{self, FailurePolicy, MissingKeyPolicy};
use crate::providers::gemini::{generate, GenerateRequest, GeminiConfig};
use crate::providers::youtube_data::{
  fetch_channel_baselines, fetch_most_popular, fetch_videos, search_video_ids, SearchOrder, VideoSearch,
  YoutubeDataConfig,
};
use crate::trend_nature::prompt_rule;

const SAMPLE_SIZE: u32 = 25;
const RECENCY_DAYS: i64 = 30;
const INTENSITY_POINTS: usize = 7;
const REGION_CODE: &str = "US";

/// Failure handling for the platform-data path of trend discovery.
const YOUTUBE_PATH_POLICY: FailurePolicy = FailurePolicy::FallbackToModelSearch;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSource {
  #[serde(default, deserialize_with = "lenient_string")]
  pub title: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub uri: String,
}

/// Averages as the model formats them ("1.2M", "4.5%").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendStats {
  #[serde(default, deserialize_with = "lenient_string")]
  pub average_views: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub average_likes: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub average_comments: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub engagement_rate: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub average_subscriber_count: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub average_channel_views: String,
}

impl TrendStats {
  /// How far the cluster's videos run above their channels' usual views,
  /// from the model's formatted averages. `None` when either side is
  /// unparseable or zero.
  pub fn channel_multiplier(&self) -> Option<f64> {
    let views = parse_compact_number(&self.average_views);
    let channel_views = parse_compact_number(&self.average_channel_views);
    if !views.is_finite() || !channel_views.is_finite() || channel_views <= 0.0 {
      return None;
    }
    Some(round_to_hundredths(views / channel_views))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
  #[serde(default, deserialize_with = "lenient_string")]
  pub id: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub title: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub description: String,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub relevance_score: u32,
  #[serde(default, deserialize_with = "lenient_string")]
  pub search_query: String,
  #[serde(default)]
  pub sources: Vec<TrendSource>,
  #[serde(default)]
  pub stats: Option<TrendStats>,
  #[serde(default, deserialize_with = "lenient_u32_vec")]
  pub intensity: Vec<u32>,
  #[serde(default, deserialize_with = "lenient_opt_u32")]
  pub video_count: Option<u32>,
  /// Label assigned by the model. Carried as-is and never reconciled with
  /// the local classifier, which may disagree.
  #[serde(default)]
  pub trend_nature: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TrendOrigin {
  YouTube,
  #[default]
  ModelSearch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
  pub origin: TrendOrigin,
  pub trends: Vec<Trend>,
  /// Deterministic aggregate over the fetched videos (YouTube origin only).
  pub sample: Option<SampleSummary>,
}

#[derive(Debug, Clone)]
pub struct TrendRequest {
  pub niche: Niche,
  pub keyword: Option<String>,
}

impl TrendRequest {
  fn keyword(&self) -> Option<&str> {
    self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }

  fn subject(&self) -> String {
    match self.keyword() {
      Some(k) => format!("the keyword \"{k}\""),
      None => format!("the niche \"{}\"", self.niche),
    }
  }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(match Value::deserialize(d)? {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  })
}

fn value_to_u32(v: &Value) -> Option<u32> {
  let n = match v {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => parse_compact_number(s),
    _ => return None,
  };
  if !n.is_finite() {
    return None;
  }
  Some(n.max(0.0).min(u32::MAX as f64).round() as u32)
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
  Ok(value_to_u32(&Value::deserialize(d)?).unwrap_or(0))
}

fn lenient_opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
  Ok(value_to_u32(&Value::deserialize(d)?))
}

fn lenient_u32_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u32>, D::Error> {
  Ok(match Value::deserialize(d)? {
    Value::Array(items) => items.iter().map(|v| value_to_u32(v).unwrap_or(0)).collect(),
    _ => Vec::new(),
  })
}

/// Left-pads with zeros (or keeps the most recent points) so every trend
/// has exactly seven intensity values in 0..=100.
fn normalize_intensity(points: &[u32]) -> Vec<u32> {
  if points.is_empty() {
    return Vec::new();
  }
  let tail = if points.len() > INTENSITY_POINTS {
    &points[points.len() - INTENSITY_POINTS..]
  } else {
    points
  };
  let mut out = vec![0; INTENSITY_POINTS - tail.len()];
  out.extend(tail.iter().map(|p| (*p).min(100)));
  out
}

/// Turns raw model items into trends: unparseable or untitled items are
/// skipped, missing ids are filled as `trend-<unix_ms>-<index>`.
pub fn normalize_trends(items: Vec<Value>, now_ms: i64) -> Vec<Trend> {
  items
    .into_iter()
    .enumerate()
    .filter_map(|(i, item)| match serde_json::from_value::<Trend>(item) {
      Ok(t) => Some((i, t)),
      Err(e) => {
        warn!(index = i, error = %e, "skipping malformed trend item");
        None
      }
    })
    .filter(|(_, t)| !t.title.trim().is_empty())
    .map(|(i, mut t)| {
      if t.id.trim().is_empty() {
        t.id = format!("trend-{now_ms}-{i}");
      }
      t.relevance_score = t.relevance_score.min(100);
      t.intensity = normalize_intensity(&t.intensity);
      t.sources.retain(|s| !s.uri.trim().is_empty());
      t
    })
    .collect()
}

/// Parse failures are logged and treated as "no trends".
fn parse_trends(flow: &'static str, text: &str) -> Vec<Trend> {
  if text.trim().is_empty() {
    return Vec::new();
  }
  match parse_model_json_array(text) {
    Some(items) => normalize_trends(items, Utc::now().timestamp_millis()),
    None => {
      warn!(flow, output = %truncate_chars(text, 300), "failed to parse trends JSON");
      Vec::new()
    }
  }
}

/// Clustering output of the YouTube path. Unparseable text is an error so the
/// flow's fallback takes over; empty text still means "no trends".
fn parse_clustered_trends(text: &str) -> Result<Vec<Trend>, AppError> {
  if text.trim().is_empty() {
    return Ok(Vec::new());
  }
  parse_model_json_array(text)
    .map(|items| normalize_trends(items, Utc::now().timestamp_millis()))
    .ok_or_else(|| AppError::Parse(format!("clustering output is not JSON: {}", truncate_chars(text, 200))))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoSummary<'a> {
  id: &'a str,
  title: &'a str,
  channel: &'a str,
  views: u64,
  likes: u64,
  comments: u64,
  channel_subscribers: SubscriberCount,
  channel_typical_views: u64,
  description: String,
}

fn summarize_videos<'a>(
  videos: &'a [VideoRecord],
  channels: &HashMap<String, ChannelBaseline>,
) -> Vec<VideoSummary<'a>> {
  videos
    .iter()
    .map(|v| {
      let channel = channels.get(&v.channel_id);
      let description = if v.description.is_empty() {
        String::new()
      } else {
        format!("{}...", truncate_chars(&v.description, 100))
      };
      VideoSummary {
        id: &v.id,
        title: &v.title,
        channel: &v.channel_title,
        views: v.view_count,
        likes: v.like_count,
        comments: v.comment_count,
        channel_subscribers: channel
          .map(|c| c.subscriber_count)
          .unwrap_or(SubscriberCount::Unknown),
        channel_typical_views: channel.map(|c| c.typical_views()).unwrap_or(0),
        description,
      }
    })
    .collect()
}

fn clustering_prompt(request: &TrendRequest, video_count: usize, raw_json: &str) -> String {
  format!(
    r#"I have a list of {video_count} currently popular YouTube videos related to {subject}.

Raw Video Data:
{raw_json}

YOUR TASK:
Analyze this data to identify 5 DISTINCT MACRO TRENDS or TOPICS.
Do NOT simply list the video titles. Cluster similar videos together and identify the underlying subject matter or format that is trending.

Output requirements for each trend:
1. 'title': the abstract name of the trend (2-5 words).
2. 'description': the pattern you see and why this topic is exploding.
3. 'relevanceScore': 80-100, based on the aggregate views of the cluster.
4. 'searchQuery': a generic search query to find more content on this topic.
5. 'sources': 1-3 objects {{"title": "Video Title", "uri": "https://youtube.com/watch?v=ID"}} from the raw data that best exemplify the trend.
6. 'stats': {{"averageViews", "averageLikes", "averageComments", "engagementRate", "averageSubscriberCount", "averageChannelViews"}} for the cluster, formatted as short strings such as "1.2M" or "4.5%".
7. 'intensity': an array of exactly 7 integers (0-100) describing momentum over the last 7 days, oldest first.
8. 'videoCount': how many of the raw videos belong to the cluster.
9. {nature_rule}

Return a JSON array of these 5 trend objects."#,
    subject = request.subject(),
    nature_rule = prompt_rule(),
  )
}

fn model_search_prompt(request: &TrendRequest) -> String {
  let context = match request.keyword() {
    Some(k) => format!("specifically related to the keyword: \"{k}\"."),
    None => format!("specifically within the '{}' niche.", request.niche),
  };
  format!(
    r#"Identify 5 currently exploding TOPICS or VIRAL CONCEPTS on YouTube {context}
Use Google Search to find real-time, up-to-date information for today.

Do not return a specific video title. Return the topic that is trending.

For each trend provide:
1. A catchy title for the trend.
2. A brief description of why it is trending right now and what makes it viral.
3. A relevance score (1-100) based on popularity.
4. A generic search query to find these videos on YouTube.

Return a clean JSON array of objects shaped like:
[{{"id": "1", "title": "...", "description": "...", "relevanceScore": 85, "searchQuery": "..."}}]"#
  )
}

async fn fetch_sample(yt: &YoutubeDataConfig, request: &TrendRequest) -> Result<Vec<VideoRecord>, AppError> {
  match request.keyword() {
    Some(keyword) => {
      let ids = search_video_ids(
        yt,
        &VideoSearch {
          keyword: Some(keyword),
          category_id: None,
          order: SearchOrder::Relevance,
          published_after: Utc::now() - Duration::days(RECENCY_DAYS),
          max_results: SAMPLE_SIZE,
        },
      )
      .await?;
      if ids.is_empty() {
        return Ok(Vec::new());
      }
      Ok(fetch_videos(yt, &ids).await?)
    }
    None => Ok(fetch_most_popular(yt, Some(request.niche.category_id()), REGION_CODE, SAMPLE_SIZE).await?),
  }
}

/// Real platform sample, clustered by the model.
pub async fn fetch_trends_from_youtube(
  gemini: &GeminiConfig,
  yt: &YoutubeDataConfig,
  request: &TrendRequest,
) -> Result<TrendReport, AppError> {
  let videos = fetch_sample(yt, request).await?;
  if videos.is_empty() {
    return Ok(TrendReport {
      origin: TrendOrigin::YouTube,
      trends: Vec::new(),
      sample: None,
    });
  }

  let channels = fetch_channel_baselines(yt, &distinct_channel_ids(&videos)).await?;
  let summaries = summarize_videos(&videos, &channels);
  let raw_json = serde_json::to_string(&summaries).map_err(|e| AppError::Parse(e.to_string()))?;
  let prompt = clustering_prompt(request, videos.len(), &raw_json);

  let resp = generate(
    gemini,
    &GenerateRequest {
      model: &gemini.model,
      user: &prompt,
      json_output: true,
      ..Default::default()
    },
  )
  .await?;

  let trends = parse_clustered_trends(&resp.text)?;
  info!(videos = videos.len(), trends = trends.len(), "clustered youtube sample");
  Ok(TrendReport {
    origin: TrendOrigin::YouTube,
    trends,
    sample: Some(summarize_sample(&videos, &channels)),
  })
}

/// Model-only discovery grounded on Google Search. Grounding sources are
/// attached to the first trend only.
pub async fn fetch_trends_from_model_search(
  gemini: &GeminiConfig,
  request: &TrendRequest,
) -> Result<TrendReport, AppError> {
  let prompt = model_search_prompt(request);
  let resp = generate(
    gemini,
    &GenerateRequest {
      model: &gemini.model,
      user: &prompt,
      json_output: true,
      google_search: true,
      ..Default::default()
    },
  )
  .await?;

  let mut trends = parse_trends("trends.model_search", &resp.text);
  let grounding: Vec<TrendSource> = resp
    .grounding_sources
    .into_iter()
    .map(|s| TrendSource {
      title: s.title,
      uri: s.uri,
    })
    .collect();
  for (i, trend) in trends.iter_mut().enumerate() {
    trend.sources = if i == 0 { grounding.clone() } else { Vec::new() };
  }

  Ok(TrendReport {
    origin: TrendOrigin::ModelSearch,
    trends,
    sample: None,
  })
}

/// Trend discovery. With a key, real platform data is clustered and any
/// upstream or parse failure falls back to model search. Without one, behavior
/// follows `ctx.trends_missing_key`.
pub async fn fetch_trends(ctx: &AppContext, request: &TrendRequest) -> Result<TrendReport, AppError> {
  let gemini = ctx.gemini()?;

  let yt = match ctx.youtube() {
    Ok(yt) => yt,
    Err(missing) => {
      return match ctx.trends_missing_key {
        MissingKeyPolicy::RequireKey => Err(missing),
        MissingKeyPolicy::ModelSearch => fetch_trends_from_model_search(gemini, request).await,
      };
    }
  };

  let primary = fetch_trends_from_youtube(gemini, yt, request).await;
  policy::apply("trends", YOUTUBE_PATH_POLICY, primary, || {
    fetch_trends_from_model_search(gemini, request)
  })
  .await
}
