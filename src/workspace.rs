use std::{io, path::Path};

/// Make sure the scratch directory (and its parents) exists. The
/// directory is shared by all in-flight downloads.
pub async fn ensure(path: &Path) -> io::Result<()> {
  tokio::fs::create_dir_all(path).await
}
