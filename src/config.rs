use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_PORT: u16 = 2626;

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
  pub port: u16,
  /// Directory holding the bundled `bin/` folder. Also the working
  /// directory of every yt-dlp child.
  pub base_dir: PathBuf,
  /// Scratch directory the downloads are written into.
  pub workspace: PathBuf,
  /// Interpreter used when no bundled yt-dlp binary is found.
  pub python: String,
  pub proxy: Option<String>,
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    // blank values are treated as unset
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let port = match var("PORT") {
      Some(port) => port
        .trim()
        .parse()
        .with_context(|| format!("invalid PORT: {port}"))?,
      None => DEFAULT_PORT,
    };

    let base_dir = match var("YTB_HOME") {
      Some(dir) => PathBuf::from(dir),
      None => std::env::current_dir()
        .context("unable to determine current directory")?,
    };

    let workspace = var("YTB_WORKSPACE")
      .map(PathBuf::from)
      .unwrap_or_else(|| std::env::temp_dir().join("ytb-downloader"));

    let python = var("YTB_PYTHON").unwrap_or_else(default_python);

    Ok(Self {
      port,
      base_dir,
      workspace,
      python,
      proxy: var("YTDLP_PROXY"),
    })
  }

  pub fn bin_dir(&self) -> PathBuf {
    self.base_dir.join("bin")
  }
}

fn default_python() -> String {
  let python = if cfg!(windows) { "py" } else { "python3" };
  python.to_string()
}
