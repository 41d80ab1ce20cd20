use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OnceCell, RwLock};

use crate::config::Config;
use crate::error::Error;

/// The environment variable selecting the config file.
pub const CONFIG_PATH_ENV_VAR: &str = "TENSORZERO_UI_CONFIG_PATH";

type ConfigCell = OnceCell<Result<Arc<Config>, Error>>;

/// Owns the loaded config for the lifetime of the process.
///
/// Construct one at startup and share it by `Arc`. The first `get` loads the config;
/// concurrent and later callers wait on the same load and receive the same `Arc<Config>`,
/// or the same error if the load failed. Only `reload` replaces the stored config.
#[derive(Debug)]
pub struct ConfigService {
    config_path: Option<PathBuf>,
    cell: RwLock<Arc<ConfigCell>>,
    load_count: AtomicUsize,
}

impl ConfigService {
    /// With no path, the service serves `Config::empty()`.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            cell: RwLock::new(Arc::new(OnceCell::new())),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var_os(CONFIG_PATH_ENV_VAR).map(PathBuf::from))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub async fn get(&self) -> Result<Arc<Config>, Error> {
        let cell = self.cell.read().await.clone();
        cell.get_or_init(|| self.load()).await.clone()
    }

    /// Loads the config again. On success the new config replaces the stored one
    /// and is returned by later `get` calls; on failure the stored one is kept.
    pub async fn reload(&self) -> Result<Arc<Config>, Error> {
        let config = self.load().await?;
        let cell = OnceCell::new_with(Some(Ok(config.clone())));
        *self.cell.write().await = Arc::new(cell);
        tracing::info!("Reloaded config");
        Ok(config)
    }

    /// How many times the config has been read from disk.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<Arc<Config>, Error> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        match &self.config_path {
            Some(config_path) => Ok(Arc::new(Config::load_from_path(config_path).await?)),
            None => {
                tracing::warn!(
                    "`{CONFIG_PATH_ENV_VAR}` is not set, so an empty config will be used. No functions or models will be available."
                );
                Ok(Arc::new(Config::empty()))
            }
        }
    }
}
