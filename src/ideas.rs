use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::AppContext;
use crate::error::AppError;
use crate::model_json::{parse_model_json, parse_model_json_array, truncate_chars};
use crate::policy::{self, FailurePolicy};
use crate::providers::gemini::{generate, GenerateRequest, GeminiConfig};
use crate::trends::Trend;

const IDEAS_POLICY: FailurePolicy = FailurePolicy::SuppressToEmpty;
const SCRIPT_THINKING_BUDGET: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
  #[serde(alias = "low", alias = "LOW")]
  Low,
  #[serde(alias = "medium", alias = "MEDIUM")]
  Medium,
  #[serde(alias = "high", alias = "HIGH")]
  High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoIdea {
  pub title: String,
  pub hook: String,
  pub thumbnail_description: String,
  pub target_audience: String,
  pub estimated_effort: Effort,
  #[serde(default)]
  pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAnalysis {
  pub channel_name: String,
  pub summary: String,
  #[serde(default)]
  pub subscriber_count_estimate: Option<String>,
  #[serde(default)]
  pub ideas: Vec<VideoIdea>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptData {
  pub title: String,
  pub outline: String,
  pub full_script: String,
}

fn idea_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "title": {"type": "STRING"},
      "hook": {"type": "STRING"},
      "thumbnailDescription": {"type": "STRING"},
      "targetAudience": {"type": "STRING"},
      "estimatedEffort": {"type": "STRING", "enum": ["Low", "Medium", "High"]},
      "tags": {"type": "ARRAY", "items": {"type": "STRING"}}
    },
    "required": ["title", "hook", "thumbnailDescription", "targetAudience", "estimatedEffort", "tags"]
  })
}

fn ideas_schema() -> Value {
  json!({"type": "ARRAY", "items": idea_schema()})
}

fn channel_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "channelName": {"type": "STRING"},
      "summary": {"type": "STRING"},
      "subscriberCountEstimate": {"type": "STRING"},
      "ideas": {"type": "ARRAY", "items": idea_schema()}
    },
    "required": ["channelName", "summary", "ideas"]
  })
}

fn script_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "title": {"type": "STRING"},
      "outline": {"type": "STRING"},
      "fullScript": {"type": "STRING"}
    },
    "required": ["title", "outline", "fullScript"]
  })
}

/// Items that do not match the idea shape are dropped individually.
fn parse_ideas(text: &str) -> Result<Vec<VideoIdea>, AppError> {
  let items = parse_model_json_array(text)
    .ok_or_else(|| AppError::Parse(format!("ideas output is not JSON: {}", truncate_chars(text, 200))))?;
  Ok(
    items
      .into_iter()
      .filter_map(|item| match serde_json::from_value::<VideoIdea>(item) {
        Ok(idea) => Some(idea),
        Err(e) => {
          warn!(error = %e, "skipping malformed idea");
          None
        }
      })
      .collect(),
  )
}

/// Decodes a single JSON object answer into `T`.
fn parse_object<T: serde::de::DeserializeOwned>(what: &str, text: &str) -> Result<T, AppError> {
  if text.trim().is_empty() {
    return Err(AppError::Parse(format!("no {what} generated")));
  }
  let value = parse_model_json(text)
    .ok_or_else(|| AppError::Parse(format!("{what} output is not JSON: {}", truncate_chars(text, 200))))?;
  serde_json::from_value(value).map_err(|e| AppError::Parse(format!("{what}: {e}")))
}

fn ideas_prompt(trend: &Trend) -> String {
  let mut prompt = format!(
    "Based on the YouTube trend/topic: \"{}\"\nContext: {}\n",
    trend.title, trend.description
  );
  if let Some(nature) = trend.trend_nature.as_deref().filter(|n| !n.is_empty()) {
    prompt.push_str(&format!("Competitive landscape: {nature}\n"));
  }
  prompt.push_str(
    "\nGenerate 4 distinct, viral-worthy video ideas that capitalize on this trend.\n\
     Focus on high CTR (Click-Through Rate) titles and engaging hooks.\n\
     Also generate 5-10 high-traffic SEO tags (keywords) for each video idea.",
  );
  prompt
}

async fn request_ideas(gemini: &GeminiConfig, trend: &Trend) -> Result<Vec<VideoIdea>, AppError> {
  let prompt = ideas_prompt(trend);
  let resp = generate(
    gemini,
    &GenerateRequest {
      model: &gemini.model,
      user: &prompt,
      json_output: true,
      response_schema: Some(ideas_schema()),
      ..Default::default()
    },
  )
  .await?;
  if resp.text.trim().is_empty() {
    return Ok(Vec::new());
  }
  parse_ideas(&resp.text)
}

/// Four ideas for a trend. Upstream and parse failures produce an empty list.
pub async fn generate_video_ideas(ctx: &AppContext, trend: &Trend) -> Result<Vec<VideoIdea>, AppError> {
  let gemini = ctx.gemini()?;
  let result = request_ideas(gemini, trend).await;
  policy::apply("ideas", IDEAS_POLICY, result, || async { Ok(Vec::new()) }).await
}

/// Search-grounded read on an existing channel, with five fresh ideas.
pub async fn analyze_channel(ctx: &AppContext, channel_name: &str) -> Result<ChannelAnalysis, AppError> {
  let gemini = ctx.gemini()?;
  let channel_name = channel_name.trim();
  if channel_name.is_empty() {
    return Err(AppError::InvalidInput("channel name is required".to_string()));
  }

  let prompt = format!(
    "Search for the YouTube channel '{channel_name}'.\n\
     Use Google Search to find their recent videos, most popular content, and overall style.\n\n\
     Based on your analysis:\n\
     1. Identify the correct channel name.\n\
     2. Write a 2-sentence summary of their content strategy and niche.\n\
     3. Estimate their subscriber count if available in search snippets (e.g., \"1.2M\", \"500K\").\n\
     4. Generate 5 new video ideas that perfectly fit their style but offer a fresh angle.\n\
     5. Include 5-8 relevant tags for each idea.\n\n\
     Return the result as JSON."
  );
  let resp = generate(
    gemini,
    &GenerateRequest {
      model: &gemini.model,
      user: &prompt,
      json_output: true,
      response_schema: Some(channel_schema()),
      google_search: true,
      ..Default::default()
    },
  )
  .await?;

  let mut analysis: ChannelAnalysis = parse_object("channel analysis", &resp.text)?;
  if analysis
    .subscriber_count_estimate
    .as_deref()
    .is_some_and(|s| s.trim().is_empty())
  {
    analysis.subscriber_count_estimate = None;
  }
  Ok(analysis)
}

pub async fn generate_script(ctx: &AppContext, idea: &VideoIdea) -> Result<ScriptData, AppError> {
  let gemini = ctx.gemini()?;
  let prompt = format!(
    "Write a complete YouTube video script for the following idea:\n\
     Title: {}\n\
     Target Audience: {}\n\
     Hook: {}\n\n\
     The output should be in JSON format with the following fields:\n\
     - title: The final polished title.\n\
     - outline: A bulleted list of the video structure (Intro, Points, Outro).\n\
     - fullScript: The actual spoken script formatted in Markdown, including cues for visuals [Visual Cue].",
    idea.title, idea.target_audience, idea.hook
  );
  let resp = generate(
    gemini,
    &GenerateRequest {
      model: &gemini.script_model,
      user: &prompt,
      json_output: true,
      response_schema: Some(script_schema()),
      thinking_budget: Some(SCRIPT_THINKING_BUDGET),
      ..Default::default()
    },
  )
  .await?;
  parse_object("script", &resp.text)
}

/// Data URL of the first generated image. Generation failures yield `None`;
/// a missing model key is still an error.
pub async fn generate_thumbnail_image(ctx: &AppContext, description: &str) -> Result<Option<String>, AppError> {
  let gemini = ctx.gemini()?;
  let prompt = format!(
    "Generate a high-quality, vibrant YouTube thumbnail image based on this description: {}. \
     Make it colorful, high contrast, and clickable. No text overlay.",
    description.trim()
  );
  match generate(
    gemini,
    &GenerateRequest {
      model: &gemini.image_model,
      user: &prompt,
      ..Default::default()
    },
  )
  .await
  {
    Ok(resp) => Ok(resp.images.first().map(|img| img.to_data_url())),
    Err(e) => {
      warn!(error = %e, "thumbnail generation failed");
      Ok(None)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::outlier_engine::OutlierConfig;
  use crate::policy::MissingKeyPolicy;
  use crate::test_server::{self, gemini_reply};

  fn ctx(base_url: &str) -> AppContext {
    AppContext {
      gemini: Some(GeminiConfig::with_base_url("gk", base_url)),
      youtube: None,
      trends_missing_key: MissingKeyPolicy::RequireKey,
      outliers: OutlierConfig::default(),
    }
  }

  fn idea_json(title: &str, effort: &str) -> Value {
    json!({
      "title": title,
      "hook": "You won't believe this",
      "thumbnailDescription": "Shocked face, red arrow",
      "targetAudience": "Gamers",
      "estimatedEffort": effort,
      "tags": ["gta", "gaming"]
    })
  }

  fn sample_trend() -> Trend {
    Trend {
      title: "GTA 6 Hype".to_string(),
      description: "Leaks everywhere".to_string(),
      trend_nature: Some("Viral Opportunity".to_string()),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn ideas_request_uses_schema_and_drops_bad_items() {
    let answer = json!([idea_json("A", "Low"), idea_json("B", "high"), {"title": "no hook"}]).to_string();
    let server = test_server::start(move |_, _| (200, gemini_reply(&answer))).await;

    let ideas = generate_video_ideas(&ctx(&server.base_url), &sample_trend()).await.unwrap();
    assert_eq!(ideas.len(), 2);
    assert_eq!(ideas[1].estimated_effort, Effort::High);

    let body: Value = serde_json::from_str(&server.requests()[0].body).unwrap();
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("GTA 6 Hype"));
    assert!(prompt.contains("Competitive landscape: Viral Opportunity"));
  }

  #[tokio::test]
  async fn ideas_failures_become_empty() {
    let server = test_server::start(|_, _| (500, r#"{"error":{"message":"boom"}}"#.to_string())).await;
    let ideas = generate_video_ideas(&ctx(&server.base_url), &sample_trend()).await.unwrap();
    assert!(ideas.is_empty());

    let server = test_server::start(|_, _| (200, gemini_reply("not json at all"))).await;
    let ideas = generate_video_ideas(&ctx(&server.base_url), &sample_trend()).await.unwrap();
    assert!(ideas.is_empty());
  }

  #[tokio::test]
  async fn missing_gemini_key_is_not_suppressed() {
    let ctx = AppContext {
      gemini: None,
      ..ctx("http://127.0.0.1:9")
    };
    let err = generate_video_ideas(&ctx, &sample_trend()).await.unwrap_err();
    assert!(matches!(err, AppError::MissingGeminiKey));
  }

  #[tokio::test]
  async fn channel_analysis_is_grounded_and_parsed() {
    let answer = format!(
      "```json\n{}\n```",
      json!({
        "channelName": "MKBHD",
        "summary": "Tech reviews.",
        "subscriberCountEstimate": "",
        "ideas": [idea_json("Phone teardown", "Medium")]
      })
    );
    let server = test_server::start(move |_, _| (200, gemini_reply(&answer))).await;

    let analysis = analyze_channel(&ctx(&server.base_url), " mkbhd ").await.unwrap();
    assert_eq!(analysis.channel_name, "MKBHD");
    assert_eq!(analysis.subscriber_count_estimate, None);
    assert_eq!(analysis.ideas.len(), 1);
    assert!(server.requests()[0].body.contains("googleSearch"));
  }

  #[tokio::test]
  async fn channel_analysis_errors_propagate() {
    let server = test_server::start(|_, _| (200, gemini_reply(""))).await;
    let err = analyze_channel(&ctx(&server.base_url), "someone").await.unwrap_err();
    assert!(matches!(err, AppError::Parse(_)));

    let err = analyze_channel(&ctx(&server.base_url), "  ").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
  }

  #[tokio::test]
  async fn script_uses_script_model_and_thinking_budget() {
    let answer = json!({"title": "T", "outline": "- Intro", "fullScript": "# Script"}).to_string();
    let server = test_server::start(move |_, _| (200, gemini_reply(&answer))).await;

    let idea: VideoIdea = serde_json::from_value(idea_json("A", "Low")).unwrap();
    let script = generate_script(&ctx(&server.base_url), &idea).await.unwrap();
    assert_eq!(script.full_script, "# Script");

    let req = &server.requests()[0];
    assert!(req.path_and_query.starts_with("/models/gemini-3-pro-preview:generateContent"));
    let body: Value = serde_json::from_str(&req.body).unwrap();
    assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 1024);
  }

  #[tokio::test]
  async fn thumbnail_returns_data_url_or_none() {
    let server = test_server::start(|_, _| {
      (
        200,
        r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"iVBOR"}}]}}]}"#.to_string(),
      )
    })
    .await;
    let url = generate_thumbnail_image(&ctx(&server.base_url), "a red car").await.unwrap();
    assert_eq!(url.as_deref(), Some("data:image/png;base64,iVBOR"));
    assert!(server.requests()[0]
      .path_and_query
      .starts_with("/models/gemini-2.5-flash-image:generateContent"));

    let server = test_server::start(|_, _| (503, "{}".to_string())).await;
    assert_eq!(generate_thumbnail_image(&ctx(&server.base_url), "x").await.unwrap(), None);
  }
}
