use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method, StatusCode};
use tracing::warn;
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use trendscout_rust::config::AppContext;
use trendscout_rust::error::AppError;
use trendscout_rust::http_api::{
  error_response, init_tracing, json_response, method_not_allowed, non_empty_param, youtube_api_key,
};
use trendscout_rust::optimizer::{analyze_video_for_optimization, extract_video_id, fetch_video_details};

async fn handle_optimizer(
  method: &Method,
  headers: &HeaderMap,
  uri: &hyper::Uri,
  _body: Bytes,
) -> Result<Response<ResponseBody>, Error> {
  if *method != Method::GET {
    return method_not_allowed();
  }

  let Some(video_id) = non_empty_param(uri, "url").and_then(|u| extract_video_id(&u)) else {
    return error_response(&AppError::InvalidInput(
      "Invalid YouTube URL. Please paste a full video link.".to_string(),
    ));
  };

  let ctx = AppContext::from_env(youtube_api_key(headers).as_deref());
  let details = match fetch_video_details(&ctx, &video_id).await {
    Ok(d) => d,
    Err(e) => return error_response(&e),
  };

  // The details are still useful when the critique fails.
  let optimization = match analyze_video_for_optimization(&ctx, &details).await {
    Ok(o) => Some(o),
    Err(e) => {
      warn!(video_id = %video_id, error = %e, "optimization analysis failed");
      None
    }
  };

  json_response(
    StatusCode::OK,
    serde_json::json!({"ok": true, "video": details, "optimization": optimization}),
  )
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let headers = req.headers().clone();
  let uri = req.uri().clone();
  let bytes = req.into_body().collect().await?.to_bytes();
  handle_optimizer(&method, &headers, &uri, bytes).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  run(service_fn(handler)).await
}
