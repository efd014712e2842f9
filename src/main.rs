use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod process;
mod routes;
mod tool;
mod util;
mod workspace;
mod ytdlp;

pub use error::{Error, Result};

use crate::{
  config::Config, process::TokioProcessRunner, tool::Executable,
  util::redact_proxy, ytdlp::YtDlp,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
    .init();

  let config = Config::from_env()?;

  let executable = Executable::detect(&config.bin_dir(), &config.python);
  match &executable {
    Executable::Bundled(path) => {
      info!("using bundled yt-dlp: {}", path.display())
    }
    Executable::Module { .. } => warn!(
      "yt-dlp not found in {}, falling back to `{}`",
      config.bin_dir().display(),
      executable
    ),
  }

  if let Some(proxy) = &config.proxy {
    info!("using proxy: {}", redact_proxy(proxy));
  }

  workspace::ensure(&config.workspace).await.with_context(|| {
    format!("unable to create workspace {}", config.workspace.display())
  })?;
  info!("writing downloads to {}", config.workspace.display());

  let ytdlp = YtDlp::new(Arc::new(TokioProcessRunner), executable, &config);
  let app = routes::router(Arc::new(ytdlp));

  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
  info!("listening on http://{}", addr);

  axum::Server::try_bind(&addr)
    .with_context(|| format!("unable to bind {addr}"))?
    .serve(app.into_make_service())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

const DEFAULT_LOG_FILTER: &str = "info";

// RUST_LOG when it is set and parses, `info` otherwise
fn log_filter(directives: Option<String>) -> EnvFilter {
  directives
    .filter(|d| !d.trim().is_empty())
    .and_then(|d| EnvFilter::try_new(d).ok())
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("unable to listen for shutdown signal: {}", e);
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}
