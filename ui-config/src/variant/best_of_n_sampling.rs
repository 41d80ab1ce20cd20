use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::path::PathWithContents;
use crate::error::Error;
use crate::variant::chat_completion::ChatCompletionConfig;
use crate::variant::default_timeout_s;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BestOfNSamplingConfig<R = PathWithContents> {
    #[serde(default)]
    pub weight: f64,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
    pub candidates: Vec<String>,
    /// The chat completion config used to judge the candidates.
    pub evaluator: ChatCompletionConfig<R>,
}

pub type UninitializedBestOfNSamplingConfig = BestOfNSamplingConfig<PathBuf>;

impl UninitializedBestOfNSamplingConfig {
    pub async fn load(self, base_path: &Path) -> Result<BestOfNSamplingConfig, Error> {
        Ok(BestOfNSamplingConfig {
            weight: self.weight,
            timeout_s: self.timeout_s,
            candidates: self.candidates,
            evaluator: self.evaluator.load(base_path).await?,
        })
    }
}
