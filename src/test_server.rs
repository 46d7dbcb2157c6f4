//! One-shot HTTP servers for exercising the providers against canned
//! responses.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub path_and_query: String,
  pub body: String,
}

impl RecordedRequest {
  pub fn query_param(&self, key: &str) -> Option<String> {
    let (_, query) = self.path_and_query.split_once('?')?;
    query.split('&').find_map(|pair| {
      let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
      (k == key).then(|| v.to_string())
    })
  }
}

pub struct MockServer {
  pub base_url: String,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
  task: JoinHandle<()>,
}

impl MockServer {
  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn requests_to(&self, path_prefix: &str) -> Vec<RecordedRequest> {
    self
      .requests()
      .into_iter()
      .filter(|r| r.path_and_query.starts_with(path_prefix))
      .collect()
  }
}

impl Drop for MockServer {
  fn drop(&mut self) {
    self.task.abort();
  }
}

/// Serves every connection with `route(path_and_query, body) -> (status, json)`.
pub async fn start<F>(route: F) -> MockServer
where
  F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
{
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
  let route = Arc::new(route);

  let recorded = requests.clone();
  let task = tokio::spawn(async move {
    loop {
      let (stream, _) = match listener.accept().await {
        Ok(conn) => conn,
        Err(_) => return,
      };
      let route = route.clone();
      let recorded = recorded.clone();
      tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let _ = http1::Builder::new()
          .serve_connection(
            io,
            service_fn(move |req: Request<Incoming>| {
              let route = route.clone();
              let recorded = recorded.clone();
              async move {
                let method = req.method().to_string();
                let path_and_query = req
                  .uri()
                  .path_and_query()
                  .map(|p| p.to_string())
                  .unwrap_or_default();
                let body = match req.into_body().collect().await {
                  Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).to_string(),
                  Err(_) => String::new(),
                };
                recorded.lock().unwrap().push(RecordedRequest {
                  method,
                  path_and_query: path_and_query.clone(),
                  body: body.clone(),
                });

                let (status, payload) = route(&path_and_query, &body);
                Ok::<_, Infallible>(
                  Response::builder()
                    .status(StatusCode::from_u16(status).unwrap())
                    .header("content-type", "application/json")
                    .body(Full::new(Bytes::from(payload)))
                    .unwrap(),
                )
              }
            }),
          )
          .await;
      });
    }
  });

  MockServer {
    base_url: format!("http://{}", addr),
    requests,
    task,
  }
}

/// A `generateContent` response whose single candidate answers with `text`.
pub fn gemini_reply(text: &str) -> String {
  serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
}

/// Like [`gemini_reply`], with one web grounding chunk attached.
pub fn gemini_grounded_reply(text: &str, uri: &str, title: &str) -> String {
  serde_json::json!({"candidates": [{
    "content": {"parts": [{"text": text}]},
    "groundingMetadata": {"groundingChunks": [{"web": {"uri": uri, "title": title}}]}
  }]})
  .to_string()
}
