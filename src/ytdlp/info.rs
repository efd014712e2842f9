use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::YtDlp;
use crate::{Error, Result};

/// The subset of yt-dlp's metadata that is forwarded to callers.
#[derive(Debug, Serialize, PartialEq)]
pub struct MediaInfo {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub uploader: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub thumbnails: Option<Value>,
  pub formats: Vec<FormatInfo>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FormatInfo {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ext: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub vcodec: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub acodec: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fps: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub height: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

// the shape of `yt-dlp -j` output, as far as we care
#[derive(Debug, Deserialize)]
struct Dump {
  title: Option<String>,
  uploader: Option<String>,
  duration: Option<f64>,
  thumbnails: Option<Value>,
  formats: Option<Vec<Format>>,
}

#[derive(Debug, Deserialize)]
struct Format {
  format_id: Option<String>,
  ext: Option<String>,
  vcodec: Option<String>,
  acodec: Option<String>,
  fps: Option<f64>,
  height: Option<u32>,
  format_note: Option<String>,
}

impl From<Dump> for MediaInfo {
  fn from(d: Dump) -> Self {
    Self {
      title: d.title,
      uploader: d.uploader,
      duration: d.duration,
      thumbnails: d.thumbnails,
      formats: d
        .formats
        .unwrap_or_default()
        .into_iter()
        .map(Into::into)
        .collect(),
    }
  }
}

impl From<Format> for FormatInfo {
  fn from(f: Format) -> Self {
    Self {
      id: f.format_id,
      ext: f.ext,
      vcodec: f.vcodec,
      acodec: f.acodec,
      fps: f.fps,
      height: f.height,
      note: f.format_note,
    }
  }
}

pub(super) fn info_args() -> Vec<String> {
  vec!["-j".into(), "--no-playlist".into()]
}

impl YtDlp {
  pub async fn fetch_info(&self, url: &str) -> Result<MediaInfo> {
    let invocation = self.invocation(info_args(), url);
    let output = self.runner.invoke(&invocation).await?.collect().await?;

    let stderr = output.stderr_text();
    self.ensure_launched(output.code, &stderr)?;

    if !output.success() {
      return Err(Error::ExtractionFailed(if stderr.is_empty() {
        "yt-dlp failed".to_string()
      } else {
        stderr
      }));
    }

    let dump: Dump =
      serde_json::from_slice(&output.stdout).map_err(Error::MetadataParse)?;
    Ok(dump.into())
  }
}
