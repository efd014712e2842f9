use std::{io, process::Stdio};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{
  future::BoxFuture, stream::BoxStream, FutureExt, StreamExt, TryStreamExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{tool::Invocation, Error, Result};

/// A running child. The two output streams advance independently of
/// each other and of `exit`.
pub struct ProcessHandle {
  pub stdout: BoxStream<'static, io::Result<Bytes>>,
  pub stderr: BoxStream<'static, io::Result<Bytes>>,
  /// Resolves to the exit code, `None` if the child was killed by a
  /// signal.
  pub exit: BoxFuture<'static, io::Result<Option<i32>>>,
}

/// Everything a child printed, collected after it exited.
pub struct ProcessOutput {
  pub code: Option<i32>,
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  pub fn stderr_text(&self) -> String {
    String::from_utf8_lossy(&self.stderr).trim().to_string()
  }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
  /// Launch the invocation. Failing to start the executable at all is
  /// reported as `Error::LaunchFailed`.
  async fn invoke(&self, invocation: &Invocation) -> Result<ProcessHandle>;
}

pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
  async fn invoke(&self, invocation: &Invocation) -> Result<ProcessHandle> {
    debug!(
      "running {} {:?} in {}",
      invocation.executable,
      invocation.args,
      invocation.working_dir.display()
    );

    let mut child = invocation
      .command()
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| {
        Error::LaunchFailed(format!("{}: {}", invocation.executable, e))
      })?;

    let missing = || Error::LaunchFailed("child output not captured".into());
    let stdout = child.stdout.take().ok_or_else(missing)?;
    let stderr = child.stderr.take().ok_or_else(missing)?;

    Ok(ProcessHandle {
      stdout: ReaderStream::new(stdout).boxed(),
      stderr: ReaderStream::new(stderr).boxed(),
      exit: async move { child.wait().await.map(|status| status.code()) }
        .boxed(),
    })
  }
}

pub async fn drain(
  mut stream: BoxStream<'static, io::Result<Bytes>>,
) -> io::Result<Vec<u8>> {
  let mut buf = Vec::new();
  while let Some(chunk) = stream.try_next().await? {
    buf.extend_from_slice(&chunk);
  }
  Ok(buf)
}

impl ProcessHandle {
  // both streams are drained before the exit code counts, so nothing a
  // fast-exiting child wrote gets lost.
  pub async fn collect(self) -> io::Result<ProcessOutput> {
    let (stdout, stderr, code) =
      tokio::join!(drain(self.stdout), drain(self.stderr), self.exit);

    Ok(ProcessOutput {
      code: code?,
      stdout: stdout?,
      stderr: stderr?,
    })
  }
}
