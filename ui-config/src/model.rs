use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};
use url::Url;

use crate::config::validation::{TaggedConfig, deserialize_fields, unknown_tag};
use crate::error::{Error, ErrorDetails, FieldError};

/// A model: providers tried in `routing` order, first to last.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub routing: Vec<String>, // [provider name A, provider name B, ...]
    pub providers: IndexMap<String, ProviderConfig>, // provider name => provider config
}

/// Embedding models share the routing structure of regular models.
pub type EmbeddingModelConfig = ModelConfig;

impl ModelConfig {
    /// Create a model that routes to a single provider of the same name.
    pub fn single_provider(name: &str, provider: ProviderConfig) -> Self {
        ModelConfig {
            routing: vec![name.to_string()],
            providers: IndexMap::from([(name.to_string(), provider)]),
        }
    }

    /// Checks `routing` against `providers`. `section` is `models` or `embedding_models`.
    pub fn validate(&self, section: &str, model_name: &str) -> Result<(), Error> {
        // Ensure that the model has at least one provider
        if self.routing.is_empty() {
            return Err(ErrorDetails::Config {
                message: format!("`{section}.{model_name}`: `routing` must not be empty"),
            }
            .into());
        }

        // Ensure that routing entries are unique and exist as keys in providers
        let mut seen_providers = HashSet::new();
        for provider in &self.routing {
            if provider.starts_with("tensorzero::") {
                return Err(ErrorDetails::Config {
                    message: format!(
                        "`{section}.{model_name}.routing`: Provider name cannot start with 'tensorzero::': {provider}"
                    ),
                }
                .into());
            }
            if !seen_providers.insert(provider) {
                return Err(ErrorDetails::Config {
                    message: format!("`{section}.{model_name}.routing`: duplicate entry `{provider}`"),
                }
                .into());
            }
            if !self.providers.contains_key(provider) {
                return Err(ErrorDetails::Config {
                    message: format!(
                        "`{section}.{model_name}`: `routing` contains entry `{provider}` that does not exist in `providers`"
                    ),
                }
                .into());
            }
        }

        for provider_name in self.providers.keys() {
            if !seen_providers.contains(provider_name) {
                return Err(ErrorDetails::Config {
                    message: format!(
                        "`{section}.{model_name}`: Provider `{provider_name}` is not listed in `routing`"
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Every backend a model can be routed to. The `type` field selects the variant
/// and fixes which other fields are allowed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "anthropic")]
    Anthropic(ModelNameProviderConfig),
    #[serde(rename = "aws_bedrock")]
    AWSBedrock(AWSBedrockProviderConfig),
    #[serde(rename = "aws_sagemaker")]
    AWSSagemaker(AWSSagemakerProviderConfig),
    #[serde(rename = "azure")]
    Azure(AzureProviderConfig),
    #[serde(rename = "deepseek")]
    DeepSeek(ModelNameProviderConfig),
    #[serde(rename = "dummy")]
    Dummy(ModelNameProviderConfig),
    #[serde(rename = "fireworks")]
    Fireworks(ThinkBlocksProviderConfig),
    #[serde(rename = "gcp_vertex_anthropic")]
    GCPVertexAnthropic(GCPVertexProviderConfig),
    #[serde(rename = "gcp_vertex_gemini")]
    GCPVertexGemini(GCPVertexProviderConfig),
    #[serde(rename = "google_ai_studio_gemini")]
    GoogleAIStudioGemini(ModelNameProviderConfig),
    #[serde(rename = "groq")]
    Groq(ModelNameProviderConfig),
    #[serde(rename = "hyperbolic")]
    Hyperbolic(ModelNameProviderConfig),
    #[serde(rename = "mistral")]
    Mistral(ModelNameProviderConfig),
    #[serde(rename = "openai")]
    OpenAI(OpenAIProviderConfig),
    #[serde(rename = "openrouter")]
    OpenRouter(ModelNameProviderConfig),
    #[serde(rename = "sglang")]
    SGLang(SelfHostedProviderConfig),
    #[serde(rename = "tgi")]
    TGI(TGIProviderConfig),
    #[serde(rename = "together")]
    Together(ThinkBlocksProviderConfig),
    #[serde(rename = "vllm")]
    VLLM(SelfHostedProviderConfig),
    #[serde(rename = "xai")]
    XAI(ModelNameProviderConfig),
}

/// The `type` tags of `ProviderConfig`, usable without a full config.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    VariantNames,
)]
pub enum ProviderType {
    #[serde(rename = "anthropic")]
    #[strum(serialize = "anthropic")]
    Anthropic,
    #[serde(rename = "aws_bedrock")]
    #[strum(serialize = "aws_bedrock")]
    AWSBedrock,
    #[serde(rename = "aws_sagemaker")]
    #[strum(serialize = "aws_sagemaker")]
    AWSSagemaker,
    #[serde(rename = "azure")]
    #[strum(serialize = "azure")]
    Azure,
    #[serde(rename = "deepseek")]
    #[strum(serialize = "deepseek")]
    DeepSeek,
    #[serde(rename = "dummy")]
    #[strum(serialize = "dummy")]
    Dummy,
    #[serde(rename = "fireworks")]
    #[strum(serialize = "fireworks")]
    Fireworks,
    #[serde(rename = "gcp_vertex_anthropic")]
    #[strum(serialize = "gcp_vertex_anthropic")]
    GCPVertexAnthropic,
    #[serde(rename = "gcp_vertex_gemini")]
    #[strum(serialize = "gcp_vertex_gemini")]
    GCPVertexGemini,
    #[serde(rename = "google_ai_studio_gemini")]
    #[strum(serialize = "google_ai_studio_gemini")]
    GoogleAIStudioGemini,
    #[serde(rename = "groq")]
    #[strum(serialize = "groq")]
    Groq,
    #[serde(rename = "hyperbolic")]
    #[strum(serialize = "hyperbolic")]
    Hyperbolic,
    #[serde(rename = "mistral")]
    #[strum(serialize = "mistral")]
    Mistral,
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAI,
    #[serde(rename = "openrouter")]
    #[strum(serialize = "openrouter")]
    OpenRouter,
    #[serde(rename = "sglang")]
    #[strum(serialize = "sglang")]
    SGLang,
    #[serde(rename = "tgi")]
    #[strum(serialize = "tgi")]
    TGI,
    #[serde(rename = "together")]
    #[strum(serialize = "together")]
    Together,
    #[serde(rename = "vllm")]
    #[strum(serialize = "vllm")]
    VLLM,
    #[serde(rename = "xai")]
    #[strum(serialize = "xai")]
    XAI,
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::Anthropic(_) => ProviderType::Anthropic,
            ProviderConfig::AWSBedrock(_) => ProviderType::AWSBedrock,
            ProviderConfig::AWSSagemaker(_) => ProviderType::AWSSagemaker,
            ProviderConfig::Azure(_) => ProviderType::Azure,
            ProviderConfig::DeepSeek(_) => ProviderType::DeepSeek,
            ProviderConfig::Dummy(_) => ProviderType::Dummy,
            ProviderConfig::Fireworks(_) => ProviderType::Fireworks,
            ProviderConfig::GCPVertexAnthropic(_) => ProviderType::GCPVertexAnthropic,
            ProviderConfig::GCPVertexGemini(_) => ProviderType::GCPVertexGemini,
            ProviderConfig::GoogleAIStudioGemini(_) => ProviderType::GoogleAIStudioGemini,
            ProviderConfig::Groq(_) => ProviderType::Groq,
            ProviderConfig::Hyperbolic(_) => ProviderType::Hyperbolic,
            ProviderConfig::Mistral(_) => ProviderType::Mistral,
            ProviderConfig::OpenAI(_) => ProviderType::OpenAI,
            ProviderConfig::OpenRouter(_) => ProviderType::OpenRouter,
            ProviderConfig::SGLang(_) => ProviderType::SGLang,
            ProviderConfig::TGI(_) => ProviderType::TGI,
            ProviderConfig::Together(_) => ProviderType::Together,
            ProviderConfig::VLLM(_) => ProviderType::VLLM,
            ProviderConfig::XAI(_) => ProviderType::XAI,
        }
    }
}

impl TaggedConfig for ProviderConfig {
    const TAGS: &'static [&'static str] = ProviderType::VARIANTS;

    fn from_fields(tag: &str, path: &str, fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        let Ok(provider_type) = tag.parse::<ProviderType>() else {
            return Err(unknown_tag::<Self>(path, tag));
        };
        let fields = toml::Value::Table(fields);
        match provider_type {
            ProviderType::Anthropic => deserialize_fields(path, fields).map(Self::Anthropic),
            ProviderType::AWSBedrock => deserialize_fields(path, fields).map(Self::AWSBedrock),
            ProviderType::AWSSagemaker => deserialize_fields(path, fields).map(Self::AWSSagemaker),
            ProviderType::Azure => deserialize_fields(path, fields).map(Self::Azure),
            ProviderType::DeepSeek => deserialize_fields(path, fields).map(Self::DeepSeek),
            ProviderType::Dummy => deserialize_fields(path, fields).map(Self::Dummy),
            ProviderType::Fireworks => deserialize_fields(path, fields).map(Self::Fireworks),
            ProviderType::GCPVertexAnthropic => {
                deserialize_fields(path, fields).map(Self::GCPVertexAnthropic)
            }
            ProviderType::GCPVertexGemini => {
                deserialize_fields(path, fields).map(Self::GCPVertexGemini)
            }
            ProviderType::GoogleAIStudioGemini => {
                deserialize_fields(path, fields).map(Self::GoogleAIStudioGemini)
            }
            ProviderType::Groq => deserialize_fields(path, fields).map(Self::Groq),
            ProviderType::Hyperbolic => deserialize_fields(path, fields).map(Self::Hyperbolic),
            ProviderType::Mistral => deserialize_fields(path, fields).map(Self::Mistral),
            ProviderType::OpenAI => deserialize_fields(path, fields).map(Self::OpenAI),
            ProviderType::OpenRouter => deserialize_fields(path, fields).map(Self::OpenRouter),
            ProviderType::SGLang => deserialize_fields(path, fields).map(Self::SGLang),
            ProviderType::TGI => deserialize_fields(path, fields).map(Self::TGI),
            ProviderType::Together => deserialize_fields(path, fields).map(Self::Together),
            ProviderType::VLLM => deserialize_fields(path, fields).map(Self::VLLM),
            ProviderType::XAI => deserialize_fields(path, fields).map(Self::XAI),
        }
    }
}

/// Hosted APIs that only need a model name and, optionally, where to find the API key.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelNameProviderConfig {
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<CredentialLocation>,
}

/// Fireworks and Together can return reasoning wrapped in `<think>` blocks.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ThinkBlocksProviderConfig {
    pub model_name: String,
    #[serde(default = "default_parse_think_blocks")]
    pub parse_think_blocks: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<CredentialLocation>,
}

fn default_parse_think_blocks() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AWSBedrockProviderConfig {
    pub model_id: String,
    pub region: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AWSSagemakerProviderConfig {
    pub endpoint_name: String,
    pub model_name: String,
    /// The provider type whose API the endpoint exposes (e.g. `openai` or `tgi`).
    pub hosted_provider: String,
    pub region: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AzureProviderConfig {
    pub deployment_id: String,
    pub endpoint: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<CredentialLocation>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GCPVertexProviderConfig {
    pub model_id: String,
    pub location: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_location: Option<CredentialLocation>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAIProviderConfig {
    pub model_name: String,
    pub api_base: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<CredentialLocation>,
}

/// Self-hosted OpenAI-compatible servers (SGLang, vLLM).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelfHostedProviderConfig {
    pub model_name: String,
    pub api_base: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<CredentialLocation>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TGIProviderConfig {
    pub api_base: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_location: Option<CredentialLocation>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CredentialLocation {
    /// Environment variable containing the actual credential
    Env(String),
    /// Environment variable containing the path to a credential file
    PathFromEnv(String),
    /// For dynamic credential resolution
    Dynamic(String),
    /// Direct path to a credential file
    Path(String),
    None,
}

impl std::str::FromStr for CredentialLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = s.strip_prefix("env::") {
            Ok(CredentialLocation::Env(inner.to_string()))
        } else if let Some(inner) = s.strip_prefix("path_from_env::") {
            Ok(CredentialLocation::PathFromEnv(inner.to_string()))
        } else if let Some(inner) = s.strip_prefix("dynamic::") {
            Ok(CredentialLocation::Dynamic(inner.to_string()))
        } else if let Some(inner) = s.strip_prefix("path::") {
            Ok(CredentialLocation::Path(inner.to_string()))
        } else if s == "none" {
            Ok(CredentialLocation::None)
        } else {
            Err(format!("Invalid ApiKeyLocation format: {s}"))
        }
    }
}

impl std::fmt::Display for CredentialLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialLocation::Env(inner) => write!(f, "env::{inner}"),
            CredentialLocation::PathFromEnv(inner) => write!(f, "path_from_env::{inner}"),
            CredentialLocation::Dynamic(inner) => write!(f, "dynamic::{inner}"),
            CredentialLocation::Path(inner) => write!(f, "path::{inner}"),
            CredentialLocation::None => write!(f, "none"),
        }
    }
}

impl<'de> Deserialize<'de> for CredentialLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for CredentialLocation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
