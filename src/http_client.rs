use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use serde_json::Value;

use crate::error::UpstreamError;

pub type HttpsClient<B> = Client<HttpsConnector<HttpConnector>, B>;

const AGENT: &str = "trendscout-rust";

fn build_client<B>(service: &'static str) -> Result<HttpsClient<B>, UpstreamError>
where
  B: hyper::body::Body + Send + 'static,
  B::Data: Send,
{
  let connector = hyper_rustls::HttpsConnectorBuilder::new()
    .with_native_roots()
    .map_err(|e| UpstreamError::transport(service, e.to_string()))?
    .https_or_http()
    .enable_http1()
    .build();

  Ok(Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector))
}

/// Pulls `error.message` out of a Google-style error body, falling back to
/// the raw body text.
pub fn upstream_error_message(body: &[u8]) -> String {
  let raw = String::from_utf8_lossy(body).to_string();
  serde_json::from_slice::<Value>(body)
    .ok()
    .and_then(|json| {
      json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
    })
    .filter(|m| !m.trim().is_empty())
    .unwrap_or_else(|| raw.chars().take(800).collect())
}

async fn send<B>(
  service: &'static str,
  client: HttpsClient<B>,
  req: Request<B>,
) -> Result<Value, UpstreamError>
where
  B: hyper::body::Body + Send + Unpin + 'static,
  B::Data: Send,
  B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
  let resp = client
    .request(req)
    .await
    .map_err(|e| UpstreamError::transport(service, e.to_string()))?;

  let status = resp.status();
  let body_bytes = resp
    .into_body()
    .collect()
    .await
    .map_err(|e| UpstreamError::http(service, status.as_u16(), e.to_string()))?
    .to_bytes();

  if status != StatusCode::OK {
    return Err(UpstreamError::http(
      service,
      status.as_u16(),
      upstream_error_message(&body_bytes),
    ));
  }

  serde_json::from_slice::<Value>(&body_bytes).map_err(|e| {
    UpstreamError::http(service, status.as_u16(), format!("invalid json response: {e}"))
  })
}

pub async fn get_json(service: &'static str, url: &str) -> Result<Value, UpstreamError> {
  let client = build_client::<Empty<Bytes>>(service)?;

  let req = Request::builder()
    .method(Method::GET)
    .uri(url)
    .header(ACCEPT, "application/json")
    .header(USER_AGENT, AGENT)
    .body(Empty::<Bytes>::new())
    .map_err(|e| UpstreamError::transport(service, e.to_string()))?;

  send(service, client, req).await
}

pub async fn post_json(service: &'static str, url: &str, body: &Value) -> Result<Value, UpstreamError> {
  let client = build_client::<Full<Bytes>>(service)?;

  let body = serde_json::to_vec(body).map_err(|e| UpstreamError::transport(service, e.to_string()))?;

  let req = Request::builder()
    .method(Method::POST)
    .uri(url)
    .header(CONTENT_TYPE, "application/json")
    .header(ACCEPT, "application/json")
    .header(USER_AGENT, AGENT)
    .body(Full::new(Bytes::from(body)))
    .map_err(|e| UpstreamError::transport(service, e.to_string()))?;

  send(service, client, req).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upstream_error_message_prefers_google_error_message() {
    let body = br#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota."}}"#;
    assert_eq!(
      upstream_error_message(body),
      "The request cannot be completed because you have exceeded your quota."
    );
    assert_eq!(upstream_error_message(b"bad gateway"), "bad gateway");
  }
}
