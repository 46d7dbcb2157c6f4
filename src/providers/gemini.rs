use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, UpstreamError};
use crate::http_client::post_json;

const SERVICE: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiUsage {
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Fast model for clustering, ideas, channel analysis and critique.
    pub model: String,
    /// Slower model for full scripts.
    pub script_model: String,
    pub image_model: String,
    pub api_base_url: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .trim()
        .to_string()
}

impl GeminiConfig {
    pub fn from_env_optional() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok().unwrap_or_default();
        if api_key.trim().is_empty() {
            return None;
        }

        Some(Self {
            api_key: api_key.trim().to_string(),
            model: env_or("GEMINI_MODEL", "gemini-3-flash-preview"),
            script_model: env_or("GEMINI_SCRIPT_MODEL", "gemini-3-pro-preview"),
            image_model: env_or("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            api_base_url: env_or(
                "GEMINI_API_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
        })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::from_env_optional().ok_or(AppError::MissingGeminiKey)
    }

    pub fn with_base_url(api_key: &str, api_base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: "gemini-3-flash-preview".to_string(),
            script_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            api_base_url: api_base_url.to_string(),
        }
    }
}

/// Base64 payload plus mime type, as Gemini exchanges images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl InlineData {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.trim().strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        if mime_type.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub image: Option<&'a InlineData>,
    pub json_output: bool,
    pub response_schema: Option<Value>,
    pub google_search: bool,
    pub thinking_budget: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub text: String,
    pub usage: Option<GeminiUsage>,
    pub grounding_sources: Vec<GroundingSource>,
    pub images: Vec<InlineData>,
}

fn model_path(model: &str) -> String {
    let m = model.trim();
    if m.starts_with("models/") {
        m.to_string()
    } else {
        format!("models/{m}")
    }
}

fn build_url(cfg: &GeminiConfig, model: &str) -> String {
    let base = cfg.api_base_url.trim_end_matches('/');
    let model = model_path(model);
    format!("{base}/{model}:generateContent?key={}", cfg.api_key)
}

fn build_request_json(req: &GenerateRequest<'_>) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = req.image {
        parts.push(serde_json::json!({
            "inlineData": {"mimeType": image.mime_type, "data": image.data}
        }));
    }
    parts.push(serde_json::json!({"text": req.user}));

    let mut generation_config = serde_json::Map::new();
    if req.json_output {
        generation_config.insert("responseMimeType".to_string(), "application/json".into());
    }
    if let Some(schema) = &req.response_schema {
        generation_config.insert("responseSchema".to_string(), schema.clone());
    }
    if let Some(budget) = req.thinking_budget {
        generation_config.insert(
            "thinkingConfig".to_string(),
            serde_json::json!({"thinkingBudget": budget}),
        );
    }
    if let Some(t) = req.temperature {
        generation_config.insert("temperature".to_string(), t.into());
    }

    let mut obj = serde_json::Map::new();
    obj.insert(
        "contents".to_string(),
        serde_json::json!([{"role": "user", "parts": parts}]),
    );
    if let Some(system) = req.system {
        obj.insert(
            "systemInstruction".to_string(),
            serde_json::json!({"parts": [{"text": system}]}),
        );
    }
    if !generation_config.is_empty() {
        obj.insert(
            "generationConfig".to_string(),
            Value::Object(generation_config),
        );
    }
    if req.google_search {
        obj.insert(
            "tools".to_string(),
            serde_json::json!([{"googleSearch": {}}]),
        );
    }
    Value::Object(obj)
}

fn candidate_parts(json: &Value) -> Vec<Value> {
    json.get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|c| c.first())
        .and_then(|cand| cand.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

fn extract_text_from_response_json(json: &Value) -> String {
    let mut out = String::new();
    for part in candidate_parts(json) {
        // Thought summaries are not part of the answer.
        if part.get("thought").and_then(|v| v.as_bool()).unwrap_or(false) {
            continue;
        }
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            out.push_str(text);
        }
    }
    out
}

fn extract_images(json: &Value) -> Vec<InlineData> {
    candidate_parts(json)
        .iter()
        .filter_map(|part| part.get("inlineData"))
        .filter_map(|inline| {
            let mime_type = inline.get("mimeType").and_then(|v| v.as_str())?;
            let data = inline.get("data").and_then(|v| v.as_str())?;
            Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            })
        })
        .collect()
}

fn extract_grounding_sources(json: &Value) -> Vec<GroundingSource> {
    json.get("candidates")
        .and_then(|v| v.as_array())
        .and_then(|c| c.first())
        .and_then(|cand| cand.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(|v| v.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| chunk.get("web"))
                .filter_map(|web| {
                    let uri = web.get("uri").and_then(|v| v.as_str())?.trim();
                    let title = web.get("title").and_then(|v| v.as_str())?.trim();
                    if uri.is_empty() || title.is_empty() {
                        return None;
                    }
                    Some(GroundingSource {
                        uri: uri.to_string(),
                        title: title.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_usage(json: &Value) -> Option<GeminiUsage> {
    let usage = json.get("usageMetadata")?;
    let prompt = usage.get("promptTokenCount")?.as_i64()? as i32;
    let completion = usage
        .get("candidatesTokenCount")
        .and_then(|v| v.as_i64())
        .unwrap_or(0) as i32;
    Some(GeminiUsage {
        prompt_tokens: prompt,
        completion_tokens: completion,
    })
}

pub async fn generate(
    cfg: &GeminiConfig,
    req: &GenerateRequest<'_>,
) -> Result<GenerateResponse, UpstreamError> {
    let model = if req.model.trim().is_empty() {
        cfg.model.as_str()
    } else {
        req.model
    };
    let url = build_url(cfg, model);
    let payload = build_request_json(req);

    let json = post_json(SERVICE, &url, &payload).await?;

    let usage = extract_usage(&json);
    if let Some(u) = &usage {
        debug!(
            model,
            prompt_tokens = u.prompt_tokens,
            completion_tokens = u.completion_tokens,
            "gemini call complete"
        );
    }

    Ok(GenerateResponse {
        text: extract_text_from_response_json(&json),
        usage,
        grounding_sources: extract_grounding_sources(&json),
        images: extract_images(&json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;

    #[test]
    fn model_path_prefixes_models() {
        assert_eq!(model_path("gemini-1.5-flash"), "models/gemini-1.5-flash");
        assert_eq!(
            model_path("models/gemini-1.5-flash"),
            "models/gemini-1.5-flash"
        );
    }

    #[test]
    fn extract_text_pulls_candidate_parts() {
        let json: Value = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"plan","thought":true},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_from_response_json(&json), "ab");
    }

    #[test]
    fn extracts_grounding_sources_with_uri_and_title() {
        let json: Value = serde_json::from_str(
            r#"{"candidates":[{"groundingMetadata":{"groundingChunks":[
                {"web":{"uri":"https://a.example","title":"A"}},
                {"web":{"uri":"","title":"empty"}},
                {"retrievedContext":{}}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            extract_grounding_sources(&json),
            vec![GroundingSource {
                uri: "https://a.example".to_string(),
                title: "A".to_string()
            }]
        );
    }

    #[test]
    fn request_json_carries_schema_search_and_image() {
        let image = InlineData {
            mime_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        };
        let req = GenerateRequest {
            model: "m",
            user: "hello",
            image: Some(&image),
            json_output: true,
            response_schema: Some(serde_json::json!({"type": "ARRAY"})),
            google_search: true,
            thinking_budget: Some(1024),
            ..Default::default()
        };
        let json = build_request_json(&req);
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "hello");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(json["generationConfig"]["thinkingConfig"]["thinkingBudget"], 1024);
        assert!(json["tools"][0].get("googleSearch").is_some());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn data_url_round_trips() {
        let inline = InlineData::from_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
        assert_eq!(inline.data, "/9j/4AAQ");
        assert_eq!(inline.to_data_url(), "data:image/jpeg;base64,/9j/4AAQ");
        assert!(InlineData::from_data_url("https://example.com/a.png").is_none());
    }

    #[tokio::test]
    async fn generate_posts_to_model_endpoint() {
        let server = test_server::start(|_, _| {
            (
                200,
                r#"{"candidates":[{"content":{"parts":[{"text":"[]"},{"inlineData":{"mimeType":"image/png","data":"QUJD"}}]}}],
                    "usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":3}}"#
                    .to_string(),
            )
        })
        .await;
        let cfg = GeminiConfig::with_base_url("gk", &server.base_url);

        let resp = generate(
            &cfg,
            &GenerateRequest {
                user: "cluster these",
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.text, "[]");
        assert_eq!(resp.images.len(), 1);
        assert_eq!(resp.usage.unwrap().prompt_tokens, 12);

        let reqs = server.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].method, "POST");
        assert!(reqs[0]
            .path_and_query
            .starts_with("/models/gemini-3-flash-preview:generateContent?key=gk"));
        assert!(reqs[0].body.contains("cluster these"));
    }

    #[tokio::test]
    async fn generate_surfaces_error_status() {
        let server = test_server::start(|_, _| {
            (
                429,
                r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#.to_string(),
            )
        })
        .await;
        let cfg = GeminiConfig::with_base_url("gk", &server.base_url);

        let err = generate(
            &cfg,
            &GenerateRequest {
                user: "x",
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "Resource has been exhausted");
    }
}
