use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tokio::fs::{create_dir_all, try_exists};
use tracing::debug;

/// Scratch directory owning everything a single download writes.
///
/// The directory and all files in it (partials, intermediate streams, the
/// final artifact) are removed when the guard is dropped, whichever way the
/// download ends. Keep it alive until delivery is done.
#[derive(Debug)]
pub struct JobDir {
    dir: TempDir,
}

impl JobDir {
    /// Create a fresh directory under `root`, named after `stem`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if `root` cannot be created or written to.
    pub async fn create(root: &Path, stem: &str) -> Result<Self> {
        create_dir_all(root).await?;
        let dir = Builder::new()
            .prefix(&format!("{stem}-"))
            .tempdir_in(root)?;
        debug!(path = %dir.path().display(), "job dir created");
        Ok(Self { dir })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve the artifact the download was expected to produce.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingArtifact` if nothing exists at `expected`.
    pub async fn artifact(&self, expected: &Path) -> Result<PathBuf> {
        if try_exists(expected).await? {
            Ok(expected.to_path_buf())
        } else {
            Err(Error::MissingArtifact(expected.to_path_buf()))
        }
    }

    /// Remove the directory now and surface any cleanup error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory could not be removed.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
