mod download;
mod info;
mod locator;

use std::{path::PathBuf, str::FromStr, sync::Arc};

use crate::{
  config::Config,
  process::ProcessRunner,
  tool::{Executable, Invocation},
  Error, Result,
};

pub use info::MediaInfo;
pub use locator::{LastExistingPath, OutputLocator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
  Video,
  Audio,
}

impl OutputKind {
  pub fn mime_type(self) -> &'static str {
    match self {
      OutputKind::Video => "video/mp4",
      OutputKind::Audio => "audio/mpeg",
    }
  }
}

impl FromStr for OutputKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "mp4" => Ok(OutputKind::Video),
      "mp3" => Ok(OutputKind::Audio),
      other => Err(Error::InvalidFormat(other.to_string())),
    }
  }
}

/// Entry point to the wrapped yt-dlp tool. One child process per call,
/// nothing shared between calls apart from the workspace directory.
pub struct YtDlp {
  runner: Arc<dyn ProcessRunner>,
  executable: Executable,
  working_dir: PathBuf,
  workspace: PathBuf,
  proxy: Option<String>,
}

impl YtDlp {
  pub fn new(
    runner: Arc<dyn ProcessRunner>,
    executable: Executable,
    config: &Config,
  ) -> Self {
    Self {
      runner,
      executable,
      working_dir: config.base_dir.clone(),
      workspace: config.workspace.clone(),
      proxy: config.proxy.clone(),
    }
  }

  // a python fallback without the yt_dlp module counts as a launch
  // failure, not as a failed extraction or download
  fn ensure_launched(&self, code: Option<i32>, stderr: &str) -> Result<()> {
    if self.executable.missing_module(code, stderr) {
      return Err(Error::LaunchFailed(format!(
        "{}: {}",
        self.executable,
        stderr.trim()
      )));
    }
    Ok(())
  }

  // common trailer of every invocation: optional proxy, then the url
  // behind `--` so it is never taken for an option.
  fn invocation(&self, mut args: Vec<String>, url: &str) -> Invocation {
    if let Some(proxy) = &self.proxy {
      args.push("--proxy".into());
      args.push(proxy.clone());
    }
    args.push("--".into());
    args.push(url.to_string());

    Invocation {
      executable: self.executable.clone(),
      args,
      working_dir: self.working_dir.clone(),
    }
  }
}
