use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::path::{PathWithContents, load_optional_path};
use crate::error::Error;
use crate::variant::{JsonMode, RetryConfig};

/// Dynamic in-context learning: retrieves the `k` nearest stored examples
/// with `embedding_model` and adds them to the prompt sent to `model`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiclConfig<R = PathWithContents> {
    #[serde(default)]
    pub weight: f64,
    pub embedding_model: String,
    pub k: u32,
    pub model: String,
    pub system_instructions: Option<R>,
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

pub type UninitializedDiclConfig = DiclConfig<PathBuf>;

impl UninitializedDiclConfig {
    pub async fn load(self, base_path: &Path) -> Result<DiclConfig, Error> {
        let system_instructions = load_optional_path(self.system_instructions, base_path).await?;
        Ok(DiclConfig {
            weight: self.weight,
            embedding_model: self.embedding_model,
            k: self.k,
            model: self.model,
            system_instructions,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_system_instructions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("dicl")).unwrap();
        std::fs::write(
            dir.path().join("dicl/instructions.txt"),
            "Answer like the examples.",
        )
        .unwrap();
        let raw: UninitializedDiclConfig = toml::from_str(
            r#"
            embedding_model = "text-embedding-3-small"
            k = 5
            model = "gpt-4o-mini"
            system_instructions = "dicl/instructions.txt"
            "#,
        )
        .unwrap();
        let loaded = raw.load(dir.path()).await.unwrap();
        assert_eq!(loaded.k, 5);
        assert_eq!(loaded.json_mode, JsonMode::On);
        assert_eq!(
            loaded.system_instructions,
            Some(PathWithContents {
                path: PathBuf::from("dicl/instructions.txt"),
                contents: "Answer like the examples.".to_string(),
            })
        );
    }

    #[test]
    fn test_k_is_required() {
        let err = toml::from_str::<UninitializedDiclConfig>(
            r#"
            embedding_model = "text-embedding-3-small"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("missing field `k`"),
            "Unexpected error: {err}"
        );
    }
}
