//! Key/value data stash for remote control surfaces
//!
//! Each key is stored as `<show_dir>/stash/<key>.dat`.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct Stash {
    dir: PathBuf,
}

/// Keys become file names, so only `[A-Za-z0-9_-]+` is accepted
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}

impl Stash {
    pub fn new(show_dir: &Path) -> Self {
        Self {
            dir: show_dir.join("stash"),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.dat")))
    }

    pub async fn store(&self, key: &str, data: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, data).await?;
        debug!("Stored {} bytes under '{}'", data.len(), key);
        Ok(())
    }

    pub async fn retrieve(&self, key: &str) -> Result<String> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::KeyNotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_then_retrieve() {
        let dir = TempDir::new().unwrap();
        let stash = Stash::new(dir.path());

        stash.store("layout_1", "{\"x\":1}").await.unwrap();
        assert_eq!(stash.retrieve("layout_1").await.unwrap(), "{\"x\":1}");
        assert!(dir.path().join("stash").join("layout_1.dat").exists());
    }

    #[tokio::test]
    async fn test_missing_and_invalid_keys() {
        let dir = TempDir::new().unwrap();
        let stash = Stash::new(dir.path());

        let err = stash.retrieve("nothing").await.unwrap_err();
        assert_eq!(err.to_string(), "Key 'nothing' not found.");

        let err = stash.store("../escape", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid key '../escape'.");
        assert!(matches!(stash.retrieve("").await, Err(Error::InvalidKey(_))));
    }
}
