use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::assembly::VideoRecord;
use crate::config::AppContext;
use crate::error::AppError;
use crate::model_json::{parse_model_json, truncate_chars};
use crate::providers::gemini::{generate, GenerateRequest, InlineData};
use crate::providers::youtube_data::fetch_video;

const VIDEO_ID_LEN: usize = 11;
const URL_MARKERS: [&str; 6] = ["youtu.be/", "v/", "embed/", "shorts/", "watch?v=", "&v="];

fn is_video_id(candidate: &str) -> bool {
  candidate.len() == VIDEO_ID_LEN
    && candidate
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Pulls the 11-character video id out of the common link shapes (watch,
/// short link, embed, `/v/`, shorts). A bare id is accepted as-is. When
/// several markers appear, the rightmost one wins.
pub fn extract_video_id(url: &str) -> Option<String> {
  let url = url.trim();
  if is_video_id(url) {
    return Some(url.to_string());
  }

  let (start, marker) = URL_MARKERS
    .iter()
    .filter_map(|m| url.rfind(m).map(|pos| (pos, *m)))
    .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.len().cmp(&a.1.len())))?;

  let rest = &url[start + marker.len()..];
  let id: &str = rest.split(['#', '&', '?']).next().unwrap_or("");
  is_video_id(id).then(|| id.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
  pub id: String,
  pub title: String,
  pub description: String,
  pub tags: Vec<String>,
  pub channel_title: String,
  pub thumbnail_url: Option<String>,
  pub published_at: Option<DateTime<Utc>>,
  pub view_count: u64,
  pub like_count: u64,
  pub comment_count: u64,
}

impl From<VideoRecord> for VideoDetails {
  fn from(v: VideoRecord) -> Self {
    Self {
      id: v.id,
      title: v.title,
      description: v.description,
      tags: v.tags,
      channel_title: v.channel_title,
      thumbnail_url: v.thumbnail_url,
      published_at: v.published_at,
      view_count: v.view_count,
      like_count: v.like_count,
      comment_count: v.comment_count,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOptimization {
  pub critique: String,
  #[serde(default)]
  pub improved_titles: Vec<String>,
  #[serde(default)]
  pub improved_description: String,
  #[serde(default)]
  pub improved_tags: Vec<String>,
  #[serde(default)]
  pub thumbnail_suggestions: String,
}

/// Metadata for one video. Requires the caller's YouTube key; an id the
/// platform does not know is an upstream 404.
pub async fn fetch_video_details(ctx: &AppContext, video_id: &str) -> Result<VideoDetails, AppError> {
  let yt = ctx.youtube()?;
  Ok(fetch_video(yt, video_id).await?.into())
}

fn optimization_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "critique": {"type": "STRING"},
      "improvedTitles": {"type": "ARRAY", "items": {"type": "STRING"}},
      "improvedDescription": {"type": "STRING"},
      "improvedTags": {"type": "ARRAY", "items": {"type": "STRING"}},
      "thumbnailSuggestions": {"type": "STRING"}
    },
    "required": ["critique", "improvedTitles", "improvedDescription", "improvedTags", "thumbnailSuggestions"]
  })
}

pub async fn analyze_video_for_optimization(
  ctx: &AppContext,
  details: &VideoDetails,
) -> Result<VideoOptimization, AppError> {
  let gemini = ctx.gemini()?;
  let prompt = format!(
    "Act as a YouTube growth strategist. Review this video's metadata:\n\
     Title: {title}\n\
     Channel: {channel}\n\
     Views: {views} | Likes: {likes} | Comments: {comments}\n\
     Tags: {tags}\n\
     Description:\n{description}\n\n\
     Provide:\n\
     1. 'critique': a short, honest critique of the title, description and packaging.\n\
     2. 'improvedTitles': 3 higher-CTR alternative titles.\n\
     3. 'improvedDescription': a rewritten, SEO-optimized description in Markdown.\n\
     4. 'improvedTags': 10-15 high-traffic tags.\n\
     5. 'thumbnailSuggestions': concrete advice for a more clickable thumbnail.\n\n\
     Return the result as JSON.",
    title = details.title,
    channel = details.channel_title,
    views = details.view_count,
    likes = details.like_count,
    comments = details.comment_count,
    tags = if details.tags.is_empty() {
      "(none)".to_string()
    } else {
      details.tags.join(", ")
    },
    description = truncate_chars(&details.description, 2000),
  );

  let resp = generate(
    gemini,
    &GenerateRequest {
      model: &gemini.model,
      user: &prompt,
      json_output: true,
      response_schema: Some(optimization_schema()),
      ..Default::default()
    },
  )
  .await?;

  if resp.text.trim().is_empty() {
    return Err(AppError::Parse("no optimization generated".to_string()));
  }
  let value = parse_model_json(&resp.text)
    .ok_or_else(|| AppError::Parse(format!("optimization output is not JSON: {}", truncate_chars(&resp.text, 200))))?;
  serde_json::from_value(value).map_err(|e| AppError::Parse(format!("optimization: {e}")))
}

/// Applies a text instruction to an uploaded thumbnail (given as a data URL).
/// Returns the edited image as a data URL, or `None` when the model fails or
/// answers without an image.
pub async fn edit_thumbnail_image(
  ctx: &AppContext,
  image_data_url: &str,
  instruction: &str,
) -> Result<Option<String>, AppError> {
  let gemini = ctx.gemini()?;
  let image = InlineData::from_data_url(image_data_url)
    .ok_or_else(|| AppError::InvalidInput("image must be a base64 data URL".to_string()))?;
  let instruction = instruction.trim();
  if instruction.is_empty() {
    return Err(AppError::InvalidInput("edit instruction is required".to_string()));
  }

  let prompt = format!(
    "Edit this YouTube thumbnail: {instruction}. Keep it high contrast and clickable. Return the edited image."
  );
  match generate(
    gemini,
    &GenerateRequest {
      model: &gemini.image_model,
      user: &prompt,
      image: Some(&image),
      ..Default::default()
    },
  )
  .await
  {
    Ok(resp) => Ok(resp.images.first().map(|img| img.to_data_url())),
    Err(e) => {
      warn!(error = %e, "thumbnail edit failed");
      Ok(None)
    }
  }
}
