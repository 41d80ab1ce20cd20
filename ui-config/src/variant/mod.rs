use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::path::PathWithContents;
use crate::config::validation::{TaggedConfig, deserialize_fields, unknown_tag};
use crate::error::{Error, FieldError};

pub mod best_of_n_sampling;
pub mod chat_completion;
pub mod dicl;
pub mod mixture_of_n;

use best_of_n_sampling::BestOfNSamplingConfig;
use chat_completion::ChatCompletionConfig;
use dicl::DiclConfig;
use mixture_of_n::MixtureOfNConfig;

/// A variant of a function. `R` is the type of file references:
/// `PathBuf` as written in the config file, `PathWithContents` once loaded.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum VariantConfig<R = PathWithContents> {
    ChatCompletion(ChatCompletionConfig<R>),
    #[serde(rename = "experimental_best_of_n_sampling")]
    #[serde(alias = "best_of_n_sampling")]
    BestOfNSampling(BestOfNSamplingConfig<R>),
    #[serde(rename = "experimental_dynamic_in_context_learning")]
    #[serde(alias = "dicl")]
    Dicl(DiclConfig<R>),
    #[serde(rename = "experimental_mixture_of_n")]
    #[serde(alias = "mixture_of_n")]
    MixtureOfN(MixtureOfNConfig<R>),
}

pub type UninitializedVariantConfig = VariantConfig<PathBuf>;

impl TaggedConfig for UninitializedVariantConfig {
    const TAGS: &'static [&'static str] = &[
        "chat_completion",
        "experimental_best_of_n_sampling",
        "experimental_dynamic_in_context_learning",
        "experimental_mixture_of_n",
    ];

    fn from_fields(tag: &str, path: &str, fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        let fields = toml::Value::Table(fields);
        match tag {
            "chat_completion" => deserialize_fields(path, fields).map(VariantConfig::ChatCompletion),
            "experimental_best_of_n_sampling" | "best_of_n_sampling" => {
                deserialize_fields(path, fields).map(VariantConfig::BestOfNSampling)
            }
            "experimental_dynamic_in_context_learning" | "dicl" => {
                deserialize_fields(path, fields).map(VariantConfig::Dicl)
            }
            "experimental_mixture_of_n" | "mixture_of_n" => {
                deserialize_fields(path, fields).map(VariantConfig::MixtureOfN)
            }
            _ => Err(unknown_tag::<Self>(path, tag)),
        }
    }
}

/// This type is used to determine how to enforce JSON mode for a given variant.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonMode {
    Off,
    #[default]
    On,
    Strict,
    ImplicitTool,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub num_retries: usize,
    pub max_delay_s: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            num_retries: 0,
            max_delay_s: 10.0,
        }
    }
}

pub(crate) fn default_timeout_s() -> f64 {
    300.0
}

impl<R> VariantConfig<R> {
    pub fn weight(&self) -> f64 {
        match self {
            VariantConfig::ChatCompletion(params) => params.weight,
            VariantConfig::BestOfNSampling(params) => params.weight,
            VariantConfig::Dicl(params) => params.weight,
            VariantConfig::MixtureOfN(params) => params.weight,
        }
    }

    /// The name of the variant type, as written in the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            VariantConfig::ChatCompletion(_) => "chat_completion",
            VariantConfig::BestOfNSampling(_) => "experimental_best_of_n_sampling",
            VariantConfig::Dicl(_) => "experimental_dynamic_in_context_learning",
            VariantConfig::MixtureOfN(_) => "experimental_mixture_of_n",
        }
    }
}

impl UninitializedVariantConfig {
    #[instrument(skip_all)]
    pub async fn load(self, base_path: &Path) -> Result<VariantConfig, Error> {
        Ok(match self {
            VariantConfig::ChatCompletion(params) => {
                VariantConfig::ChatCompletion(params.load(base_path).await?)
            }
            VariantConfig::BestOfNSampling(params) => {
                VariantConfig::BestOfNSampling(params.load(base_path).await?)
            }
            VariantConfig::Dicl(params) => VariantConfig::Dicl(params.load(base_path).await?),
            VariantConfig::MixtureOfN(params) => {
                VariantConfig::MixtureOfN(params.load(base_path).await?)
            }
        })
    }
}

impl VariantConfig {
    /// Every file loaded for this variant, including those of nested evaluator/fuser configs.
    pub fn get_all_template_paths(&self) -> Vec<&PathWithContents> {
        match self {
            VariantConfig::ChatCompletion(params) => params.get_all_template_paths(),
            VariantConfig::BestOfNSampling(params) => params.evaluator.get_all_template_paths(),
            VariantConfig::Dicl(params) => params.system_instructions.iter().collect(),
            VariantConfig::MixtureOfN(params) => params.fuser.get_all_template_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_defaults() {
        let variant: UninitializedVariantConfig = toml::from_str(
            r#"
            type = "chat_completion"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        let VariantConfig::ChatCompletion(params) = &variant else {
            panic!("Expected a chat completion variant");
        };
        assert_eq!(params.weight, 0.0);
        assert_eq!(params.json_mode, JsonMode::On);
        assert_eq!(params.retries, RetryConfig::default());
        assert_eq!(params.retries.num_retries, 0);
        assert_eq!(params.retries.max_delay_s, 10.0);
        assert_eq!(variant.weight(), 0.0);
        assert_eq!(variant.type_name(), "chat_completion");
    }

    #[test]
    fn test_short_tag_aliases() {
        let variant: UninitializedVariantConfig = toml::from_str(
            r#"
            type = "best_of_n_sampling"
            candidates = ["a", "b"]
            evaluator = { model = "gpt-4o" }
            "#,
        )
        .unwrap();
        assert_eq!(variant.type_name(), "experimental_best_of_n_sampling");

        let variant: UninitializedVariantConfig = toml::from_str(
            r#"
            type = "dicl"
            embedding_model = "text-embedding-3-small"
            k = 3
            model = "gpt-4o"
            "#,
        )
        .unwrap();
        assert_eq!(variant.type_name(), "experimental_dynamic_in_context_learning");

        let variant: UninitializedVariantConfig = toml::from_str(
            r#"
            type = "mixture_of_n"
            candidates = ["a"]
            fuser = { model = "gpt-4o" }
            "#,
        )
        .unwrap();
        assert_eq!(variant.type_name(), "experimental_mixture_of_n");
    }

    #[test]
    fn test_unknown_variant_type() {
        let err = toml::from_str::<UninitializedVariantConfig>(
            r#"
            type = "chain_of_thought_extreme"
            model = "gpt-4o"
            "#,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("unknown variant `chain_of_thought_extreme`"),
            "Unexpected error: {err}"
        );
    }

    #[test]
    fn test_serialize_uses_canonical_tag() {
        let variant: UninitializedVariantConfig = toml::from_str(
            r#"
            type = "mixture_of_n"
            candidates = ["a"]
            fuser = { model = "gpt-4o" }
            "#,
        )
        .unwrap();
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["type"], "experimental_mixture_of_n");
        assert_eq!(json["timeout_s"], 300.0);
    }

    fn deserialize_variant(toml_str: &str) -> Result<UninitializedVariantConfig, Vec<FieldError>> {
        crate::config::validation::deserialize_tagged(
            "functions.f.variants.v",
            toml::Value::Table(toml_str.parse().unwrap()),
        )
    }

    #[test]
    fn test_every_invalid_variant_field_is_reported() {
        let errors = deserialize_variant(
            r#"
            type = "chat_completion"
            temperature = "hot"
            max_tokens = -3
            json_mode = "loose"
            "#,
        )
        .unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "functions.f.variants.v.temperature",
                "functions.f.variants.v.max_tokens",
                "functions.f.variants.v.json_mode",
                "functions.f.variants.v.model",
            ],
            "Unexpected errors: {errors:?}"
        );
        assert_eq!(errors[3].message, "missing field `model`");
    }

    #[test]
    fn test_tagged_dispatch_accepts_aliases() {
        let variant = deserialize_variant(
            r#"
            type = "dicl"
            embedding_model = "text-embedding-3-small"
            k = 3
            model = "gpt-4o"
            "#,
        )
        .unwrap();
        assert_eq!(variant.type_name(), "experimental_dynamic_in_context_learning");

        let errors = deserialize_variant(r#"type = "chain_of_thought""#).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "functions.f.variants.v.type");
        assert!(
            errors[0]
                .message
                .starts_with("unknown variant `chain_of_thought`, expected one of `chat_completion`"),
            "Unexpected error: {errors:?}"
        );

        let errors = deserialize_variant(r#"model = "gpt-4o""#).unwrap_err();
        assert_eq!(errors[0].path, "functions.f.variants.v.type");
        assert_eq!(errors[0].message, "missing field `type`");
    }
}
