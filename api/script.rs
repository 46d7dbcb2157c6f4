use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method};
use serde::Deserialize;
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use trendscout_rust::config::AppContext;
use trendscout_rust::http_api::{error_response, init_tracing, method_not_allowed, ok_response, parse_json_body};
use trendscout_rust::ideas::{generate_script, VideoIdea};

#[derive(Deserialize)]
struct ScriptRequest {
  idea: VideoIdea,
}

async fn handle_script(
  method: &Method,
  _headers: &HeaderMap,
  _uri: &hyper::Uri,
  body: Bytes,
) -> Result<Response<ResponseBody>, Error> {
  if *method != Method::POST {
    return method_not_allowed();
  }

  let parsed: ScriptRequest = match parse_json_body(&body) {
    Ok(p) => p,
    Err(e) => return error_response(&e),
  };

  let ctx = AppContext::from_env(None);
  match generate_script(&ctx, &parsed.idea).await {
    Ok(script) => ok_response("script", &script),
    Err(e) => error_response(&e),
  }
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let headers = req.headers().clone();
  let uri = req.uri().clone();
  let bytes = req.into_body().collect().await?.to_bytes();
  handle_script(&method, &headers, &uri, bytes).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  run(service_fn(handler)).await
}
