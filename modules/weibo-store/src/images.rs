// On-disk image sink: `{dir}/{key}.jpg`. An existing file counts as already
// downloaded, independent of the post store.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ImageDir {
    root: PathBuf,
}

impl ImageDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target path for an image key. Keys must be a single path component.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image key {key:?}"),
            )
            .into());
        }
        Ok(self.root.join(format!("{key}.jpg")))
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)?).await?)
    }

    /// Write an image unless it is already on disk. Returns whether a file was
    /// written.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<bool> {
        let path = self.path_for(key)?;
        if tokio::fs::try_exists(&path).await? {
            debug!(key, "Image already on disk, skipping");
            return Ok(false);
        }
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        debug!(key, path = %path.display(), "Wrote image");
        Ok(true)
    }
}
