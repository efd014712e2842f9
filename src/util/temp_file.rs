use std::{
  io,
  path::{Path, PathBuf},
  pin::Pin,
  task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use tracing::{debug, warn};

/// A file produced for a single request. The file is deleted when this
/// value is dropped.
#[derive(Debug)]
pub struct TempFile {
  path: PathBuf,
}

impl TempFile {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn file_name(&self) -> String {
    self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default()
  }
}

impl Drop for TempFile {
  fn drop(&mut self) {
    match std::fs::remove_file(&self.path) {
      Ok(()) => debug!("deleted file: {}", self.path.display()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => {
        warn!("failed to delete file {}: {}", self.path.display(), e)
      }
    }
  }
}

/// Passes through the wrapped byte stream and keeps the file alive until
/// the stream itself is dropped, whether it was read to the end or not.
pub struct TempFileStream<T> {
  stream: T,
  _file: TempFile,
}

impl<T> TempFileStream<T> {
  pub fn new(stream: T, file: TempFile) -> Self {
    TempFileStream {
      stream,
      _file: file,
    }
  }
}

impl<T> Stream for TempFileStream<T>
where
  T: Stream<Item = io::Result<Bytes>> + Unpin,
{
  type Item = io::Result<Bytes>;

  fn poll_next(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    Pin::new(&mut this.stream).poll_next(cx)
  }
}
