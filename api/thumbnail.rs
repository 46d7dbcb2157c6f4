use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method};
use serde::Deserialize;
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use trendscout_rust::config::AppContext;
use trendscout_rust::error::AppError;
use trendscout_rust::http_api::{error_response, init_tracing, method_not_allowed, ok_response, parse_json_body};
use trendscout_rust::ideas::generate_thumbnail_image;
use trendscout_rust::optimizer::edit_thumbnail_image;

/// Either `description` (generate) or `image` + `instruction` (edit).
#[derive(Deserialize)]
struct ThumbnailRequest {
  #[serde(default)]
  description: Option<String>,
  #[serde(default)]
  image: Option<String>,
  #[serde(default)]
  instruction: Option<String>,
}

enum ThumbnailJob {
  Generate(String),
  Edit { image: String, instruction: String },
}

fn non_blank(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ThumbnailRequest {
  fn into_job(self) -> Result<ThumbnailJob, AppError> {
    match (non_blank(self.image), non_blank(self.description)) {
      (Some(image), _) => Ok(ThumbnailJob::Edit {
        image,
        instruction: self.instruction.unwrap_or_default(),
      }),
      (None, Some(description)) => Ok(ThumbnailJob::Generate(description)),
      (None, None) => Err(AppError::InvalidInput(
        "description (generate) or image + instruction (edit) is required".to_string(),
      )),
    }
  }
}

async fn handle_thumbnail(
  method: &Method,
  _headers: &HeaderMap,
  _uri: &hyper::Uri,
  body: Bytes,
) -> Result<Response<ResponseBody>, Error> {
  if *method != Method::POST {
    return method_not_allowed();
  }

  let job = match parse_json_body::<ThumbnailRequest>(&body).and_then(ThumbnailRequest::into_job) {
    Ok(job) => job,
    Err(e) => return error_response(&e),
  };

  let ctx = AppContext::from_env(None);
  let result = match job {
    ThumbnailJob::Generate(description) => generate_thumbnail_image(&ctx, &description).await,
    ThumbnailJob::Edit { image, instruction } => edit_thumbnail_image(&ctx, &image, &instruction).await,
  };
  match result {
    Ok(image) => ok_response("image", &image),
    Err(e) => error_response(&e),
  }
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let headers = req.headers().clone();
  let uri = req.uri().clone();
  let bytes = req.into_body().collect().await?.to_bytes();
  handle_thumbnail(&method, &headers, &uri, bytes).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  init_tracing();
  run(service_fn(handler)).await
}
