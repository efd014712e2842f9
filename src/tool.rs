use std::{
  fmt,
  path::{Path, PathBuf},
};

use tokio::process::Command;

#[cfg(windows)]
const BUNDLED_BINARY: &str = "yt-dlp.exe";
#[cfg(not(windows))]
const BUNDLED_BINARY: &str = "yt-dlp";

const PYTHON_MODULE: &str = "yt_dlp";

/// How yt-dlp gets launched. Decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executable {
  Bundled(PathBuf),
  Module { interpreter: String, module: String },
}

impl Executable {
  // prefer the binary shipped next to the service, fall back to
  // `python -m yt_dlp` otherwise.
  pub fn detect(bin_dir: &Path, interpreter: &str) -> Self {
    let bundled = bin_dir.join(BUNDLED_BINARY);
    if bundled.is_file() {
      return Executable::Bundled(bundled);
    }

    Executable::Module {
      interpreter: interpreter.to_string(),
      module: PYTHON_MODULE.to_string(),
    }
  }

  // `python -m` starts fine without the module and only reports it on
  // stderr, so a missing module is recognised after the fact.
  pub fn missing_module(&self, code: Option<i32>, stderr: &str) -> bool {
    match self {
      Executable::Bundled(_) => false,
      Executable::Module { module, .. } => {
        let marker = format!("No module named {module}");
        code != Some(0) && stderr.contains(&marker)
      }
    }
  }

  pub fn command(&self) -> Command {
    match self {
      Executable::Bundled(path) => Command::new(path),
      Executable::Module {
        interpreter,
        module,
      } => {
        let mut cmd = Command::new(interpreter);
        cmd.arg("-m").arg(module);
        cmd
      }
    }
  }
}

impl fmt::Display for Executable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Executable::Bundled(path) => write!(f, "{}", path.display()),
      Executable::Module {
        interpreter,
        module,
      } => write!(f, "{interpreter} -m {module}"),
    }
  }
}

/// A single yt-dlp run, built per request.
#[derive(Debug, Clone)]
pub struct Invocation {
  pub executable: Executable,
  pub args: Vec<String>,
  pub working_dir: PathBuf,
}

impl Invocation {
  pub fn command(&self) -> Command {
    let mut cmd = self.executable.command();
    cmd.args(&self.args).current_dir(&self.working_dir);
    cmd
  }
}
