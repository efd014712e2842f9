use std::{io, path::Path};

use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::info;

use super::{LastExistingPath, OutputKind, OutputLocator, YtDlp};
use crate::{
  process::drain,
  util::{TempFile, TempFileStream},
  workspace, Error, Result,
};

const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

// h264 + aac up to 720p, else any premuxed mp4, else anything up to 720p
const VIDEO_FORMAT: &str = "bv*[vcodec^=avc1][height<=720]+ba[acodec^=mp4a]\
                            /b[ext=mp4][height<=720]\
                            /b[height<=720]";

/// A finished download. Dropping it deletes the file.
#[derive(Debug)]
pub struct Download {
  file: TempFile,
  size: u64,
  kind: OutputKind,
}

impl Download {
  pub fn path(&self) -> &Path {
    self.file.path()
  }

  pub fn size(&self) -> u64 {
    self.size
  }

  pub fn kind(&self) -> OutputKind {
    self.kind
  }

  pub fn file_name(&self) -> String {
    self.file.file_name()
  }

  /// Open the file as a byte stream that deletes it once dropped.
  pub async fn into_stream(
    self,
  ) -> Result<TempFileStream<ReaderStream<tokio::fs::File>>> {
    let file = tokio::fs::File::open(self.file.path()).await?;
    Ok(TempFileStream::new(ReaderStream::new(file), self.file))
  }
}

pub(super) fn download_args(
  kind: OutputKind,
  workspace: &Path,
) -> Vec<String> {
  // up to 4 fragments in parallel
  let mut args: Vec<String> =
    vec!["--no-playlist".into(), "-N".into(), "4".into()];

  match kind {
    OutputKind::Video => args.extend([
      "-f".into(),
      VIDEO_FORMAT.into(),
      "--merge-output-format".into(),
      "mp4".into(),
      "-P".into(),
      workspace.display().to_string(),
      "-o".into(),
      OUTPUT_TEMPLATE.into(),
    ]),
    OutputKind::Audio => args.extend([
      "-f".into(),
      "ba/b".into(),
      "-P".into(),
      workspace.display().to_string(),
      "-o".into(),
      OUTPUT_TEMPLATE.into(),
      "-x".into(),
      "--audio-format".into(),
      "mp3".into(),
      "--audio-quality".into(),
      "192K".into(),
    ]),
  }

  args.extend([
    "--print".into(),
    "after_move:filepath".into(),
    "--restrict-filenames".into(),
  ]);
  args
}

// feed every stdout line to the locator. Lines may span chunks and need
// not be valid utf-8.
async fn scan_lines(
  stdout: BoxStream<'static, io::Result<Bytes>>,
  locator: &mut impl OutputLocator,
) -> io::Result<()> {
  let mut lines = StreamReader::new(stdout).split(b'\n');
  while let Some(line) = lines.next_segment().await? {
    locator.observe(&String::from_utf8_lossy(&line)).await;
  }
  Ok(())
}

impl YtDlp {
  pub async fn download(
    &self,
    url: &str,
    kind: OutputKind,
  ) -> Result<Download> {
    workspace::ensure(&self.workspace).await?;

    let args = download_args(kind, &self.workspace);
    let invocation = self.invocation(args, url);
    let handle = self.runner.invoke(&invocation).await?;

    let mut locator = LastExistingPath::new(&invocation.working_dir);
    let (scanned, stderr, code) = tokio::join!(
      scan_lines(handle.stdout, &mut locator),
      drain(handle.stderr),
      handle.exit
    );
    scanned?;
    let stderr = String::from_utf8_lossy(&stderr?).trim().to_string();
    let code = code?;
    self.ensure_launched(code, &stderr)?;

    let path = match (code, locator.located()) {
      (Some(0), Some(path)) => path.to_path_buf(),
      _ => return Err(Error::DownloadFailed { code, stderr }),
    };

    // owned from here on: any failure below still removes the file
    let file = TempFile::new(path);
    let size = tokio::fs::metadata(file.path()).await?.len();
    info!("downloaded {} ({} bytes)", file.path().display(), size);

    Ok(Download { file, size, kind })
  }
}
