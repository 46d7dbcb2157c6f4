use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::assembly::VideoRecord;
use crate::baseline::{ChannelBaseline, SubscriberCount};
use crate::error::UpstreamError;
use crate::http_client::get_json;

const SERVICE: &str = "youtube";
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
/// Upper bound on ids the videos/channels endpoints accept per call.
pub const MAX_IDS_PER_REQUEST: usize = 50;

/// API-key access to the public YouTube Data API v3.
#[derive(Debug, Clone)]
pub struct YoutubeDataConfig {
  pub api_key: String,
  pub base_url: String,
}

impl YoutubeDataConfig {
  pub fn new(api_key: &str) -> Self {
    let base_url = std::env::var("YOUTUBE_API_BASE_URL")
      .ok()
      .filter(|v| !v.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    Self::with_base_url(api_key, &base_url)
  }

  pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
    Self {
      api_key: api_key.trim().to_string(),
      base_url: base_url.trim().trim_end_matches('/').to_string(),
    }
  }

  fn url(&self, resource: &str, query: &[(&str, String)]) -> String {
    let mut url = format!("{}/{}?", self.base_url, resource);
    for (k, v) in query {
      url.push_str(k);
      url.push('=');
      url.push_str(v);
      url.push('&');
    }
    url.push_str("key=");
    url.push_str(&urlencoding::encode(&self.api_key));
    url
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
  Relevance,
  ViewCount,
}

impl SearchOrder {
  fn as_param(&self) -> &'static str {
    match self {
      SearchOrder::Relevance => "relevance",
      SearchOrder::ViewCount => "viewCount",
    }
  }
}

#[derive(Debug, Clone)]
pub struct VideoSearch<'a> {
  pub keyword: Option<&'a str>,
  pub category_id: Option<&'a str>,
  pub order: SearchOrder,
  pub published_after: DateTime<Utc>,
  pub max_results: u32,
}

/// Counts arrive as decimal strings; a missing or garbled count is zero.
fn parse_count(value: Option<&Value>) -> u64 {
  match value {
    Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
    Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
    _ => 0,
  }
}

fn str_field(obj: &Value, key: &str) -> String {
  obj.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string()
}

fn best_thumbnail_url(snippet: &Value) -> Option<String> {
  let thumbs = snippet.get("thumbnails")?;
  for key in ["maxres", "standard", "high", "medium", "default"] {
    if let Some(url) = thumbs.get(key).and_then(|v| v.get("url")).and_then(|v| v.as_str()) {
      let url = url.trim();
      if !url.is_empty() {
        return Some(url.to_string());
      }
    }
  }
  None
}

pub fn parse_video_item(item: &Value) -> Option<VideoRecord> {
  let id = item.get("id").and_then(|v| v.as_str())?.trim().to_string();
  if id.is_empty() {
    return None;
  }
  let empty = Value::Null;
  let snippet = item.get("snippet").unwrap_or(&empty);
  let stats = item.get("statistics").unwrap_or(&empty);

  let published_at = snippet
    .get("publishedAt")
    .and_then(|v| v.as_str())
    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    .map(|dt| dt.with_timezone(&Utc));

  let tags = snippet
    .get("tags")
    .and_then(|v| v.as_array())
    .map(|arr| {
      arr
        .iter()
        .filter_map(|t| t.as_str().map(|s| s.to_string()))
        .collect::<Vec<_>>()
    })
    .unwrap_or_default();

  Some(VideoRecord {
    id,
    channel_id: str_field(snippet, "channelId"),
    title: str_field(snippet, "title"),
    channel_title: str_field(snippet, "channelTitle"),
    description: str_field(snippet, "description"),
    published_at,
    thumbnail_url: best_thumbnail_url(snippet),
    tags,
    view_count: parse_count(stats.get("viewCount")),
    like_count: parse_count(stats.get("likeCount")),
    comment_count: parse_count(stats.get("commentCount")),
  })
}

pub fn parse_channel_item(item: &Value) -> Option<ChannelBaseline> {
  let channel_id = item.get("id").and_then(|v| v.as_str())?.trim().to_string();
  if channel_id.is_empty() {
    return None;
  }
  let empty = Value::Null;
  let stats = item.get("statistics").unwrap_or(&empty);

  let hidden = stats
    .get("hiddenSubscriberCount")
    .and_then(|v| v.as_bool())
    .unwrap_or(false);
  let subscriber_count = match stats.get("subscriberCount") {
    Some(v) if !hidden && !v.is_null() => SubscriberCount::Known(parse_count(Some(v))),
    _ => SubscriberCount::Unknown,
  };

  Some(ChannelBaseline {
    channel_id,
    subscriber_count,
    total_views: parse_count(stats.get("viewCount")),
    total_video_count: parse_count(stats.get("videoCount")),
  })
}

fn items(json: &Value) -> Vec<Value> {
  json
    .get("items")
    .and_then(|v| v.as_array())
    .cloned()
    .unwrap_or_default()
}

pub async fn search_video_ids(cfg: &YoutubeDataConfig, search: &VideoSearch<'_>) -> Result<Vec<String>, UpstreamError> {
  let mut query = vec![
    ("part", "id".to_string()),
    ("type", "video".to_string()),
    ("order", search.order.as_param().to_string()),
    (
      "publishedAfter",
      urlencoding::encode(&search.published_after.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)).into_owned(),
    ),
    ("maxResults", search.max_results.min(50).to_string()),
  ];
  if let Some(keyword) = search.keyword.map(str::trim).filter(|k| !k.is_empty()) {
    query.push(("q", urlencoding::encode(keyword).into_owned()));
  }
  if let Some(category_id) = search.category_id {
    query.push(("videoCategoryId", urlencoding::encode(category_id).into_owned()));
  }

  let json = get_json(SERVICE, &cfg.url("search", &query)).await?;
  let ids: Vec<String> = items(&json)
    .iter()
    .filter_map(|item| item.get("id").and_then(|id| id.get("videoId")).and_then(|v| v.as_str()))
    .map(|s| s.to_string())
    .collect();
  debug!(count = ids.len(), "youtube search returned video ids");
  Ok(ids)
}

/// Snippet + statistics for the given ids. An empty id list makes no call.
pub async fn fetch_videos(cfg: &YoutubeDataConfig, ids: &[String]) -> Result<Vec<VideoRecord>, UpstreamError> {
  let mut out = Vec::new();
  for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
    let query = [
      ("part", "snippet,statistics".to_string()),
      ("id", chunk.join(",")),
    ];
    let json = get_json(SERVICE, &cfg.url("videos", &query)).await?;
    out.extend(items(&json).iter().filter_map(parse_video_item));
  }
  Ok(out)
}

pub async fn fetch_most_popular(
  cfg: &YoutubeDataConfig,
  category_id: Option<&str>,
  region_code: &str,
  max_results: u32,
) -> Result<Vec<VideoRecord>, UpstreamError> {
  let mut query = vec![
    ("part", "snippet,statistics".to_string()),
    ("chart", "mostPopular".to_string()),
    ("regionCode", urlencoding::encode(region_code).into_owned()),
    ("maxResults", max_results.min(50).to_string()),
  ];
  if let Some(category_id) = category_id {
    query.push(("videoCategoryId", urlencoding::encode(category_id).into_owned()));
  }

  let json = get_json(SERVICE, &cfg.url("videos", &query)).await?;
  Ok(items(&json).iter().filter_map(parse_video_item).collect())
}

/// Lifetime statistics for a set of distinct channel ids, keyed by id.
/// Up to `MAX_IDS_PER_REQUEST` ids go out as one batch call; an empty set
/// makes no call at all.
pub async fn fetch_channel_baselines(
  cfg: &YoutubeDataConfig,
  channel_ids: &[String],
) -> Result<HashMap<String, ChannelBaseline>, UpstreamError> {
  let mut out = HashMap::new();
  for chunk in channel_ids.chunks(MAX_IDS_PER_REQUEST) {
    let query = [("part", "statistics".to_string()), ("id", chunk.join(","))];
    let json = get_json(SERVICE, &cfg.url("channels", &query)).await?;
    for baseline in items(&json).iter().filter_map(parse_channel_item) {
      out.insert(baseline.channel_id.clone(), baseline);
    }
  }
  debug!(requested = channel_ids.len(), found = out.len(), "fetched channel baselines");
  Ok(out)
}

pub async fn fetch_video(cfg: &YoutubeDataConfig, video_id: &str) -> Result<VideoRecord, UpstreamError> {
  let video_id = video_id.trim();
  if video_id.is_empty() {
    return Err(UpstreamError {
      service: SERVICE,
      status: None,
      message: "missing video_id".to_string(),
    });
  }

  fetch_videos(cfg, &[video_id.to_string()])
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| UpstreamError::http(SERVICE, 404, "Video not found"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_server;
  use chrono::TimeZone;

  fn video_json(id: &str, channel: &str, views: &str) -> Value {
    serde_json::json!({
      "id": id,
      "snippet": {
        "title": format!("Title {id}"),
        "channelId": channel,
        "channelTitle": format!("Channel {channel}"),
        "publishedAt": "2026-09-30T12:00:00Z",
        "description": "desc",
        "thumbnails": {"high": {"url": format!("https://i.ytimg.com/vi/{id}/hq.jpg")}}
      },
      "statistics": {"viewCount": views, "likeCount": "10"}
    })
  }

  #[test]
  fn parse_video_item_defaults_missing_counts_to_zero() {
    let video = parse_video_item(&video_json("v1", "UC1", "12345")).unwrap();
    assert_eq!(video.view_count, 12_345);
    assert_eq!(video.like_count, 10);
    assert_eq!(video.comment_count, 0);
    assert_eq!(video.channel_id, "UC1");
    assert_eq!(
      video.published_at,
      Some(Utc.with_ymd_and_hms(2026, 9, 30, 12, 0, 0).unwrap())
    );
    assert_eq!(video.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/v1/hq.jpg"));
  }

  #[test]
  fn parse_channel_item_marks_hidden_subscribers_unknown() {
    let hidden = serde_json::json!({
      "id": "UC1",
      "statistics": {"viewCount": "1000", "videoCount": "10", "subscriberCount": "0", "hiddenSubscriberCount": true}
    });
    let c = parse_channel_item(&hidden).unwrap();
    assert_eq!(c.subscriber_count, SubscriberCount::Unknown);
    assert_eq!(c.typical_views(), 100);

    let shown = serde_json::json!({
      "id": "UC2",
      "statistics": {"viewCount": "50", "subscriberCount": "1200"}
    });
    let c = parse_channel_item(&shown).unwrap();
    assert_eq!(c.subscriber_count, SubscriberCount::Known(1_200));
    assert_eq!(c.total_video_count, 0);
    assert_eq!(c.typical_views(), 0);
  }

  #[tokio::test]
  async fn search_sends_filters_and_collects_ids() {
    let server = test_server::start(|_, _| {
      (
        200,
        r#"{"items":[{"id":{"kind":"youtube#video","videoId":"a1"}},{"id":{"kind":"youtube#video","videoId":"b2"}}]}"#
          .to_string(),
      )
    })
    .await;
    let cfg = YoutubeDataConfig::with_base_url("k1", &server.base_url);

    let ids = search_video_ids(
      &cfg,
      &VideoSearch {
        keyword: Some("GTA 6"),
        category_id: None,
        order: SearchOrder::ViewCount,
        published_after: Utc.with_ymd_and_hms(2026, 9, 19, 0, 0, 0).unwrap(),
        max_results: 50,
      },
    )
    .await
    .unwrap();
    assert_eq!(ids, vec!["a1".to_string(), "b2".to_string()]);

    let reqs = server.requests_to("/search");
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].query_param("q").as_deref(), Some("GTA%206"));
    assert_eq!(reqs[0].query_param("order").as_deref(), Some("viewCount"));
    assert_eq!(reqs[0].query_param("key").as_deref(), Some("k1"));
    assert_eq!(
      reqs[0].query_param("publishedAfter").as_deref(),
      Some("2026-09-19T00%3A00%3A00Z")
    );
  }

  #[tokio::test]
  async fn empty_id_lists_make_no_requests() {
    let server = test_server::start(|_, _| (500, "{}".to_string())).await;
    let cfg = YoutubeDataConfig::with_base_url("k", &server.base_url);

    assert!(fetch_videos(&cfg, &[]).await.unwrap().is_empty());
    assert!(fetch_channel_baselines(&cfg, &[]).await.unwrap().is_empty());
    assert!(server.requests().is_empty());
  }

  #[tokio::test]
  async fn surfaces_google_error_message() {
    let server = test_server::start(|_, _| {
      (
        403,
        r#"{"error":{"code":403,"message":"API key not valid. Please pass a valid API key."}}"#.to_string(),
      )
    })
    .await;
    let cfg = YoutubeDataConfig::with_base_url("bad", &server.base_url);

    let err = fetch_most_popular(&cfg, Some("20"), "US", 25).await.unwrap_err();
    assert_eq!(err.status, Some(403));
    assert_eq!(err.message, "API key not valid. Please pass a valid API key.");
  }

  #[tokio::test]
  async fn fetch_video_reports_not_found() {
    let server = test_server::start(|_, _| (200, r#"{"items":[]}"#.to_string())).await;
    let cfg = YoutubeDataConfig::with_base_url("k", &server.base_url);

    let err = fetch_video(&cfg, "dQw4w9WgXcQ").await.unwrap_err();
    assert_eq!(err.status, Some(404));
  }
}
