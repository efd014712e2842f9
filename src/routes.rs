use std::sync::Arc;

use axum::{
  body::{self, StreamBody},
  extract::{rejection::QueryRejection, Query, State},
  headers::ContentType,
  http::{header, Response, StatusCode},
  response::IntoResponse,
  routing::get,
  Json, Router, TypedHeader,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::{
  util::attachment_name,
  ytdlp::{MediaInfo, OutputKind, YtDlp},
  Error, Result,
};

pub const HOMEPAGE_TEXT: &str = "YTB Downloader API\n\
  Use /info?url=... or /download?url=...&format=mp4|mp3\n";

pub fn router(ytdlp: Arc<YtDlp>) -> Router {
  Router::new()
    .route("/", get(homepage))
    .route("/health", get(health))
    .route("/info", get(info))
    .route("/download", get(download))
    .layer(CorsLayer::permissive())
    .with_state(ytdlp)
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
  url: Option<String>,
  format: Option<String>,
}

impl MediaQuery {
  fn url(&self) -> Result<&str> {
    self
      .url
      .as_deref()
      .filter(|url| !url.is_empty())
      .ok_or(Error::MissingParameter("url"))
  }

  fn output_kind(&self) -> Result<OutputKind> {
    self.format.as_deref().unwrap_or_default().parse()
  }
}

async fn homepage() -> impl IntoResponse {
  (TypedHeader(ContentType::text_utf8()), HOMEPAGE_TEXT)
}

async fn health() -> impl IntoResponse {
  "ok".to_owned()
}

async fn info(
  State(ytdlp): State<Arc<YtDlp>>,
  query: Result<Query<MediaQuery>, QueryRejection>,
) -> Result<Json<MediaInfo>> {
  let Query(query) = query?;
  let url = query.url()?;
  Ok(Json(ytdlp.fetch_info(url).await?))
}

async fn download(
  State(ytdlp): State<Arc<YtDlp>>,
  query: Result<Query<MediaQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
  let Query(query) = query?;
  let url = query.url()?;
  let kind = query.output_kind()?;

  let download = ytdlp.download(url, kind).await?;
  debug!("streaming {}", download.path().display());

  let size = download.size();
  let download_kind = download.kind();
  let name = attachment_name(&download.file_name());
  let disposition = format!("attachment; filename=\"{name}\"");
  let stream = download.into_stream().await?;

  // the file goes away together with the body, finished or aborted
  let resp = Response::builder()
    .status(StatusCode::OK)
    .header(header::CONTENT_TYPE, download_kind.mime_type())
    .header(header::CONTENT_LENGTH, size)
    .header(header::CONTENT_DISPOSITION, disposition)
    .body(body::boxed(StreamBody::new(stream)))?;

  Ok(resp)
}

#[cfg(test)]
mod test {
  use std::path::Path;

  use axum::{body::Body, http::Request};
  use serde_json::Value;
  use tower::ServiceExt;

  use super::*;
  use crate::{process::fake::FakeRunner, ytdlp::test_support};

  async fn send(
    runner: Arc<FakeRunner>,
    workspace: &Path,
    uri: &str,
  ) -> Response<axum::body::BoxBody> {
    let app = router(Arc::new(test_support::ytdlp(runner, workspace)));
    app
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap()
  }

  async fn body_bytes(resp: Response<axum::body::BoxBody>) -> Vec<u8> {
    hyper::body::to_bytes(resp.into_body())
      .await
      .unwrap()
      .to_vec()
  }

  async fn error_message(resp: Response<axum::body::BoxBody>) -> String {
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    body["error"].as_str().unwrap().to_string()
  }

  #[tokio::test]
  async fn test_homepage() {
    let dir = tempfile::tempdir().unwrap();
    let resp = send(Arc::new(FakeRunner::exiting(0)), dir.path(), "/").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, HOMEPAGE_TEXT.as_bytes());
  }

  #[tokio::test]
  async fn test_missing_url_is_rejected_without_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::exiting(0));

    for uri in ["/info", "/info?url=", "/download?format=mp4"] {
      let resp = send(runner.clone(), dir.path(), uri).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
      assert!(error_message(resp).await.contains("url"));
    }
    assert_eq!(runner.calls(), 0);
  }

  #[tokio::test]
  async fn test_malformed_query_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::exiting(0));

    for uri in ["/info?url=a&url=b", "/download?url=a&format=mp4&format=mp3"]
    {
      let resp = send(runner.clone(), dir.path(), uri).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
      assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
      assert!(error_message(resp).await.contains("duplicate field"));
    }
    assert_eq!(runner.calls(), 0);
  }

  #[tokio::test]
  async fn test_invalid_format_is_rejected_without_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::exiting(0));

    for uri in [
      "/download?url=https%3A%2F%2Fexample.com%2Fv",
      "/download?url=https%3A%2F%2Fexample.com%2Fv&format=webm",
      "/download?url=https%3A%2F%2Fexample.com%2Fv&format=MP3",
    ] {
      let resp = send(runner.clone(), dir.path(), uri).await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(runner.calls(), 0);
  }

  #[tokio::test]
  async fn test_info_returns_projection() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::exiting(0).stdout(
      r#"{"title": "t", "formats": [
        {"format_id": "18", "ext": "mp4", "height": 360},
        {"format_id": "251", "ext": "webm", "acodec": "opus"},
        {"format_id": "sb0", "ext": "mhtml"}
      ]}"#,
    ));

    let resp = send(
      runner.clone(),
      dir.path(),
      "/info?url=https%3A%2F%2Fexample.com%2Fv",
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let formats = body["formats"].as_array().unwrap();
    assert_eq!(formats.len(), 3);
    assert!(formats[1].get("fps").is_none());
    assert!(formats[1].get("height").is_none());
    assert!(body.get("uploader").is_none());
    assert_eq!(runner.last_args().last().unwrap(), "https://example.com/v");
  }

  #[tokio::test]
  async fn test_info_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::exiting(0).stdout("not json"));

    let resp = send(runner, dir.path(), "/info?url=x").await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(resp).await.contains("parse"));
  }

  #[tokio::test]
  async fn test_info_launch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::unlaunchable("python3: not found"));

    let resp = send(runner, dir.path(), "/info?url=x").await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(resp).await.contains("unable to launch"));
  }

  #[tokio::test]
  async fn test_download_streams_and_deletes_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("My_\"Song\".mp3");
    std::fs::write(&file, b"ID3 audio bytes").unwrap();
    let runner = Arc::new(
      FakeRunner::exiting(0)
        .stdout("[ExtractAudio] Destination: My_Song.mp3\n")
        .stdout(format!("{}\n", file.display())),
    );

    let resp = send(
      runner,
      dir.path(),
      "/download?url=https%3A%2F%2Fexample.com%2Fv&format=mp3",
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(headers[header::CONTENT_LENGTH], "15");
    assert_eq!(
      headers[header::CONTENT_DISPOSITION],
      "attachment; filename=\"My_Song.mp3\""
    );

    assert_eq!(body_bytes(resp).await, b"ID3 audio bytes");
    assert!(!file.exists());
  }

  #[tokio::test]
  async fn test_download_video_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("clip.mp4");
    std::fs::write(&file, b"ftyp").unwrap();
    let runner =
      Arc::new(FakeRunner::exiting(0).stdout(format!("{}\n", file.display())));

    let resp = send(runner, dir.path(), "/download?url=x&format=mp4").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");
    drop(resp);
    assert!(!file.exists());
  }

  #[tokio::test]
  async fn test_download_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(
      FakeRunner::exiting(1).stderr("ERROR: Unsupported URL: x\n"),
    );

    let resp = send(runner, dir.path(), "/download?url=x&format=mp4").await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      resp.headers()[header::CONTENT_TYPE],
      "application/json"
    );
    let msg = error_message(resp).await;
    assert!(msg.contains("exit code 1"));
    assert!(msg.contains("Unsupported URL"));
  }

  #[tokio::test]
  async fn test_download_launch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(FakeRunner::unlaunchable("yt-dlp: not found"));

    let resp = send(runner, dir.path(), "/download?url=x&format=mp3").await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(resp).await.contains("unable to launch"));
  }
}
