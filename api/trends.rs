use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use trendscout_rust::config::AppContext;
use trendscout_rust::http_api::{
  error_response, init_tracing, method_not_allowed, niche_param, non_empty_param, ok_response, youtube_api_key,
};
use trendscout_rust::trends::{fetch_trends, TrendRequest};

async fn handle_trends(
  method: &Method,
  headers: &HeaderMap,
  uri: &hyper::Uri,
  _body: Bytes,
) -> Result<Response<ResponseBody>, Error> {
  if *method != Method::GET {
    return method_not_allowed();
  }

  let ctx = AppContext::from_env(youtube_api_key(headers).as_deref());
  respond_trends(&ctx, uri).await
}

async fn respond_trends(ctx: &AppContext, uri: &hyper::Uri) -> Result<Response<ResponseBody>, Error> {
  let niche = match niche_param(uri) {
    Ok(n) => n,
    Err(e) => return error_response(&e),
  };
  let request = TrendRequest {
    niche,
    keyword: non_empty_param(uri, "keyword"),
  };

  match fetch_trends(ctx, &request).await {
    Ok(report) => ok_response("report", &report),
    Err(e) => error_response(&e),
  }
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let headers = req.headers().clone();
  let uri = req.uri().clone();
  let bytes = req.into_body().collect().await?.to_bytes();
  handle_trends(&method, &headers, &uri, bytes).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  run(service_fn(handler)).await
}
