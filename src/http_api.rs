//! Shared plumbing for the serverless endpoints under `api/`.

use bytes::Bytes;
use hyper::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use vercel_runtime::{Error, Response, ResponseBody};

use crate::error::AppError;
use crate::niche::Niche;

pub const YOUTUBE_KEY_HEADER: &str = "x-youtube-api-key";

/// Installs the fmt subscriber once per process; `RUST_LOG` overrides the
/// default `info` filter. Later calls are no-ops.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_target(false))
    .try_init();
}

pub fn json_response(status: StatusCode, value: Value) -> Result<Response<ResponseBody>, Error> {
  Ok(
    Response::builder()
      .status(status)
      .header("content-type", "application/json; charset=utf-8")
      .body(ResponseBody::from(value))?,
  )
}

/// `{"ok": true, <field>: payload}`.
pub fn ok_response<T: Serialize>(field: &str, payload: &T) -> Result<Response<ResponseBody>, Error> {
  let payload = serde_json::to_value(payload).map_err(|e| -> Error { Box::new(e) })?;
  let mut body = serde_json::Map::new();
  body.insert("ok".to_string(), Value::Bool(true));
  body.insert(field.to_string(), payload);
  json_response(StatusCode::OK, Value::Object(body))
}

fn status_for(err: &AppError) -> StatusCode {
  match err {
    AppError::MissingCredential => StatusCode::UNAUTHORIZED,
    AppError::MissingGeminiKey => StatusCode::NOT_IMPLEMENTED,
    AppError::Upstream(e) if e.status == Some(404) => StatusCode::NOT_FOUND,
    AppError::Upstream(_) | AppError::Parse(_) => StatusCode::BAD_GATEWAY,
    AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
  }
}

/// The dismissible error envelope: `{"ok": false, "error": <code>, "message": ...}`.
pub fn error_response(err: &AppError) -> Result<Response<ResponseBody>, Error> {
  let status = status_for(err);
  if status.is_server_error() {
    warn!(code = err.code(), error = %err, "request failed");
  }
  json_response(
    status,
    serde_json::json!({"ok": false, "error": err.code(), "message": err.to_string()}),
  )
}

pub fn method_not_allowed() -> Result<Response<ResponseBody>, Error> {
  json_response(
    StatusCode::METHOD_NOT_ALLOWED,
    serde_json::json!({"ok": false, "error": "method_not_allowed"}),
  )
}

pub fn query_param(uri: &hyper::Uri, key: &str) -> Option<String> {
  let q = uri.query()?;
  q.split('&').find_map(|pair| {
    let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
    (k == key).then(|| {
      let plus = v.replace('+', " ");
      urlencoding::decode(&plus).map(|c| c.into_owned()).unwrap_or(plus)
    })
  })
}

/// Query parameter with surrounding whitespace removed; blank counts as absent.
pub fn non_empty_param(uri: &hyper::Uri, key: &str) -> Option<String> {
  query_param(uri, key)
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

/// `?niche=`; absent means Gaming, unknown names are rejected.
pub fn niche_param(uri: &hyper::Uri) -> Result<Niche, AppError> {
  match non_empty_param(uri, "niche") {
    None => Ok(Niche::Gaming),
    Some(raw) => Niche::parse(&raw).ok_or_else(|| AppError::InvalidInput(format!("unknown niche: {raw}"))),
  }
}

/// The caller's YouTube Data API key, if one was sent.
pub fn youtube_api_key(headers: &HeaderMap) -> Option<String> {
  headers
    .get(YOUTUBE_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
  if body.is_empty() {
    return Err(AppError::InvalidInput("request body is required".to_string()));
  }
  serde_json::from_slice(body).map_err(|e| AppError::InvalidInput(format!("invalid json body: {e}")))
}

#[cfg(test)]
mod tests {
  use http_body_util::BodyExt;

  use super::*;
  use crate::error::UpstreamError;

  async fn body_json(resp: Response<ResponseBody>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[test]
  fn query_param_decodes_plus_and_escapes() {
    let uri: hyper::Uri = "/api/trends?keyword=gta+6&q=caf%C3%A9%20bar".parse().unwrap();
    assert_eq!(query_param(&uri, "keyword").as_deref(), Some("gta 6"));
    assert_eq!(query_param(&uri, "q").as_deref(), Some("café bar"));
    let uri: hyper::Uri = "/api/trends?keyword=caf%C3".parse().unwrap();
    assert_eq!(query_param(&uri, "keyword").as_deref(), Some("caf%C3"));
  }

  #[test]
  fn query_param_finds_and_trims() {
    let uri: hyper::Uri = "/api/trends?niche=tech&keyword=%20%20&x".parse().unwrap();
    assert_eq!(query_param(&uri, "niche").as_deref(), Some("tech"));
    assert_eq!(non_empty_param(&uri, "keyword"), None);
    assert_eq!(query_param(&uri, "x").as_deref(), Some(""));
    assert_eq!(query_param(&uri, "missing"), None);
  }

  #[test]
  fn niche_param_defaults_and_rejects_unknown() {
    let uri: hyper::Uri = "/api/outliers".parse().unwrap();
    assert_eq!(niche_param(&uri).unwrap(), Niche::Gaming);
    let uri: hyper::Uri = "/api/outliers?niche=artificial_intelligence".parse().unwrap();
    assert_eq!(niche_param(&uri).unwrap(), Niche::ArtificialIntelligence);
    let uri: hyper::Uri = "/api/outliers?niche=cooking".parse().unwrap();
    assert!(matches!(niche_param(&uri), Err(AppError::InvalidInput(_))));
  }

  #[test]
  fn reads_key_header() {
    let mut headers = HeaderMap::new();
    assert_eq!(youtube_api_key(&headers), None);
    headers.insert(YOUTUBE_KEY_HEADER, " AIza ".parse().unwrap());
    assert_eq!(youtube_api_key(&headers).as_deref(), Some("AIza"));
  }

  #[tokio::test]
  async fn error_envelope_carries_code_and_status() {
    let resp = error_response(&AppError::MissingCredential).unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "key_required");
    assert_eq!(json["message"], "YouTube API key required");

    let resp = error_response(&UpstreamError::http("youtube", 404, "Video not found").into()).unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = error_response(&UpstreamError::http("youtube", 403, "quota").into()).unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await["error"], "upstream_error");
  }

  #[tokio::test]
  async fn ok_response_wraps_payload() {
    let resp = ok_response("items", &vec![1, 2]).unwrap();
    let json = body_json(resp).await;
    assert_eq!(json, serde_json::json!({"ok": true, "items": [1, 2]}));
  }
}
