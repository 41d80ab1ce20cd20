use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::path::{PathWithContents, load_optional_path};
use crate::error::Error;
use crate::variant::{JsonMode, RetryConfig};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatCompletionConfig<R = PathWithContents> {
    #[serde(default)]
    pub weight: f64,
    pub model: String,
    pub system_template: Option<R>,
    pub user_template: Option<R>,
    pub assistant_template: Option<R>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub seed: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default)]
    pub json_mode: JsonMode,
    #[serde(default)]
    pub retries: RetryConfig,
}

pub type UninitializedChatCompletionConfig = ChatCompletionConfig<PathBuf>;

impl UninitializedChatCompletionConfig {
    pub async fn load(self, base_path: &Path) -> Result<ChatCompletionConfig, Error> {
        let (system_template, user_template, assistant_template) = tokio::try_join!(
            load_optional_path(self.system_template, base_path),
            load_optional_path(self.user_template, base_path),
            load_optional_path(self.assistant_template, base_path),
        )?;
        Ok(ChatCompletionConfig {
            weight: self.weight,
            model: self.model,
            system_template,
            user_template,
            assistant_template,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            seed: self.seed,
            stop_sequences: self.stop_sequences,
            json_mode: self.json_mode,
            retries: self.retries,
        })
    }
}

impl ChatCompletionConfig {
    pub fn get_all_template_paths(&self) -> Vec<&PathWithContents> {
        [
            &self.system_template,
            &self.user_template,
            &self.assistant_template,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
