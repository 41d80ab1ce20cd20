use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::path::PathWithContents;
use crate::error::Error;
use crate::variant::chat_completion::ChatCompletionConfig;
use crate::variant::default_timeout_s;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MixtureOfNConfig<R = PathWithContents> {
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
    pub candidates: Vec<String>,
    /// Combines the candidate responses into one.
    pub fuser: ChatCompletionConfig<R>,
}

pub type UninitializedMixtureOfNConfig = MixtureOfNConfig<PathBuf>;

impl UninitializedMixtureOfNConfig {
    pub async fn load(self, base_path: &Path) -> Result<MixtureOfNConfig, Error> {
        Ok(MixtureOfNConfig {
            weight: self.weight,
            timeout_s: self.timeout_s,
            candidates: self.candidates,
            fuser: self.fuser.load(base_path).await?,
        })
    }
}
