use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use trendscout_rust::config::AppContext;
use trendscout_rust::error::AppError;
use trendscout_rust::http_api::{error_response, init_tracing, method_not_allowed, non_empty_param, ok_response};
use trendscout_rust::ideas::analyze_channel;

async fn handle_channel(
  method: &Method,
  _headers: &HeaderMap,
  uri: &hyper::Uri,
  _body: Bytes,
) -> Result<Response<ResponseBody>, Error> {
  if *method != Method::GET {
    return method_not_allowed();
  }

  let Some(name) = non_empty_param(uri, "name") else {
    return error_response(&AppError::InvalidInput("name is required".to_string()));
  };

  let ctx = AppContext::from_env(None);
  match analyze_channel(&ctx, &name).await {
    Ok(analysis) => ok_response("analysis", &analysis),
    Err(e) => error_response(&e),
  }
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let headers = req.headers().clone();
  let uri = req.uri().clone();
  let bytes = req.into_body().collect().await?.to_bytes();
  handle_channel(&method, &headers, &uri, bytes).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  run(service_fn(handler)).await
}
