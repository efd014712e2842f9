use axum::{
  extract::rejection::QueryRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("missing query parameter ?{0}=")]
  MissingParameter(&'static str),
  #[error("format must be mp4 or mp3, got {0:?}")]
  InvalidFormat(String),
  #[error("invalid query string: {0}")]
  InvalidQuery(String),
  #[error("unable to launch yt-dlp: {0}")]
  LaunchFailed(String),
  #[error("{0}")]
  ExtractionFailed(String),
  #[error("unable to parse media info: {0}")]
  MetadataParse(#[source] serde_json::Error),
  #[error("download failed ({}). {}", exit_code(.code), .stderr)]
  DownloadFailed { code: Option<i32>, stderr: String },
  #[error(transparent)]
  IO(#[from] std::io::Error),
  #[error(transparent)]
  Http(#[from] axum::http::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::MissingParameter(_)
      | Error::InvalidFormat(_)
      | Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      warn!("request failed: {}", self);
    }

    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self {
    Error::InvalidQuery(rejection.body_text())
  }
}

fn exit_code(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {code}"),
    None => "terminated by signal".to_string(),
  }
}
