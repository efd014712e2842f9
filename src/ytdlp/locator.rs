use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Recovers the produced file from what yt-dlp prints on stdout.
#[async_trait]
pub trait OutputLocator: Send {
  async fn observe(&mut self, line: &str);
  fn located(&self) -> Option<&Path>;
}

// yt-dlp is asked to `--print after_move:filepath`, which interleaves the
// final path with progress lines. Any line naming a file that exists is a
// candidate; the last one wins.
#[derive(Debug)]
pub struct LastExistingPath {
  base_dir: PathBuf,
  candidate: Option<PathBuf>,
}

impl LastExistingPath {
  /// `base_dir` resolves relative lines; it is the child's working dir.
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: base_dir.into(),
      candidate: None,
    }
  }
}

#[async_trait]
impl OutputLocator for LastExistingPath {
  async fn observe(&mut self, line: &str) {
    let line = line.trim();
    if line.is_empty() {
      return;
    }

    let path = self.base_dir.join(line);
    let is_file = tokio::fs::metadata(&path)
      .await
      .map(|meta| meta.is_file())
      .unwrap_or(false);
    if is_file {
      self.candidate = Some(path);
    }
  }

  fn located(&self) -> Option<&Path> {
    self.candidate.as_deref()
  }
}
