use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorDetails};

/// A file reference after loading: the path as written in the config file
/// (relative to the directory containing it) and the file's contents.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PathWithContents {
    pub path: PathBuf,
    #[serde(rename = "content")]
    pub contents: String,
}

impl PathWithContents {
    /// Reads `base_path.join(path)`. The stored `path` is left exactly as written.
    /// Absolute paths are rejected, since joining them would ignore `base_path`.
    pub async fn from_path(path: PathBuf, base_path: &Path) -> Result<Self, Error> {
        if path.is_absolute() {
            return Err(ErrorDetails::Config {
                message: format!(
                    "File paths must be relative to the config file's directory: {}",
                    path.display()
                ),
            }
            .into());
        }
        let full_path = base_path.join(&path);
        tracing::debug!(path = %full_path.display(), "Reading file referenced by config");
        let contents = tokio::fs::read_to_string(&full_path).await.map_err(|e| {
            Error::new(ErrorDetails::FileRead {
                message: e.to_string(),
                file_path: full_path.to_string_lossy().to_string(),
            })
        })?;
        Ok(Self { path, contents })
    }
}

/// Loads an optional file slot. `None` stays `None` without touching the filesystem.
pub async fn load_optional_path(
    path: Option<PathBuf>,
    base_path: &Path,
) -> Result<Option<PathWithContents>, Error> {
    match path {
        Some(path) => PathWithContents::from_path(path, base_path).await.map(Some),
        None => Ok(None),
    }
}

/// The directory file references are resolved against.
pub fn base_path_for(config_path: &Path) -> Result<PathBuf, Error> {
    match config_path.parent() {
        Some(base_path) => Ok(base_path.to_path_buf()),
        None => Err(ErrorDetails::Config {
            message: format!(
                "Failed to get parent directory of config file: {}",
                config_path.display()
            ),
        }
        .into()),
    }
}
