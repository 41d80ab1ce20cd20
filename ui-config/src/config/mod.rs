use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Error, ErrorDetails, FieldError};
use crate::evaluations::{
    EvaluationConfig, EvaluatorConfig, LLMJudgeVariantConfig, UninitializedEvaluationConfig,
};
use crate::function::{FunctionConfig, UninitializedFunctionConfig};
use crate::model::{EmbeddingModelConfig, ModelConfig, ProviderConfig};
use crate::tool::{ToolConfig, UninitializedToolConfig};

pub mod metric;
pub mod path;
pub mod service;
pub(crate) mod validation;

use metric::{MetricConfig, RESERVED_METRIC_NAMES, implicit_metrics};
use path::{PathWithContents, base_path_for};
use validation::{
    deserialize_fields, deserialize_section, deserialize_tagged, merge_errors, take_children,
};

/// The fully loaded config: every file reference has been read from disk.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub models: IndexMap<String, ModelConfig>, // model name => model config
    pub embedding_models: IndexMap<String, EmbeddingModelConfig>, // embedding model name => embedding model config
    pub functions: IndexMap<String, FunctionConfig>, // function name => function config
    pub metrics: IndexMap<String, MetricConfig>, // metric name => metric config
    pub tools: IndexMap<String, ToolConfig>, // tool name => tool config
    pub evaluations: IndexMap<String, EvaluationConfig>, // evaluation name => evaluation config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
}

/// Settings of the gateway process itself. The gateway owns this table,
/// so fields the UI does not know about are ignored rather than rejected.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GatewayConfig {
    pub bind_address: Option<SocketAddr>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub export: ExportConfig,
    pub base_path: Option<String>,
}

const GATEWAY_KEYS: [&str; 5] = ["bind_address", "debug", "observability", "export", "base_path"];

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ObservabilityConfig {
    pub enabled: Option<bool>,
    #[serde(default)]
    pub async_writes: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub otlp: OtlpConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OtlpConfig {
    #[serde(default)]
    pub traces: OtlpTracesConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OtlpTracesConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// The config as written in the TOML file, with defaults applied.
/// File references are still paths relative to the config file's directory.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UninitializedConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
    #[serde(default)]
    pub embedding_models: IndexMap<String, EmbeddingModelConfig>,
    #[serde(default)]
    pub functions: IndexMap<String, UninitializedFunctionConfig>,
    #[serde(default)]
    pub metrics: IndexMap<String, MetricConfig>,
    #[serde(default)]
    pub tools: IndexMap<String, UninitializedToolConfig>,
    #[serde(default)]
    pub evaluations: IndexMap<String, UninitializedEvaluationConfig>,
}

const TOP_LEVEL_KEYS: [&str; 7] = [
    "gateway",
    "models",
    "embedding_models",
    "functions",
    "metrics",
    "tools",
    "evaluations",
];

impl UninitializedConfig {
    /// Read a file from the file system and parse it as TOML
    pub async fn read_toml_config(path: &Path) -> Result<toml::Table, Error> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::new(ErrorDetails::FileRead {
                message: format!("Failed to read config file: {e}"),
                file_path: path.to_string_lossy().to_string(),
            })
        })?;
        contents.parse::<toml::Table>().map_err(|e| {
            Error::new(ErrorDetails::TomlParse {
                message: format!("`{}`: {e}", path.to_string_lossy()),
            })
        })
    }

    /// Checks the names used in the config. Shape errors are caught earlier, during deserialization.
    fn validate(&self) -> Result<(), Error> {
        for function_name in self.functions.keys() {
            if function_name.starts_with("tensorzero::") {
                return Err(ErrorDetails::Config {
                    message: format!(
                        "Function name cannot start with 'tensorzero::': {function_name}"
                    ),
                }
                .into());
            }
        }

        // Ensure that no metrics are named "comment" or "demonstration"
        for metric_name in self.metrics.keys() {
            if RESERVED_METRIC_NAMES.contains(&metric_name.as_str()) {
                return Err(ErrorDetails::Config {
                    message: format!("Metric name '{metric_name}' is reserved and cannot be used"),
                }
                .into());
            }
            if metric_name.starts_with("tensorzero::") {
                return Err(ErrorDetails::Config {
                    message: format!("Metric name cannot start with 'tensorzero::': {metric_name}"),
                }
                .into());
            }
        }

        for (model_name, model) in &self.models {
            if model_name.starts_with("tensorzero::") {
                return Err(ErrorDetails::Config {
                    message: format!("Model name cannot start with 'tensorzero::': {model_name}"),
                }
                .into());
            }
            model.validate("models", model_name)?;
        }

        for (embedding_model_name, embedding_model) in &self.embedding_models {
            if embedding_model_name.starts_with("tensorzero::") {
                return Err(ErrorDetails::Config {
                    message: format!(
                        "Embedding model name cannot start with 'tensorzero::': {embedding_model_name}"
                    ),
                }
                .into());
            }
            embedding_model.validate("embedding_models", embedding_model_name)?;
        }

        for tool_name in self.tools.keys() {
            if tool_name.starts_with("tensorzero::") {
                return Err(ErrorDetails::Config {
                    message: format!("Tool name cannot start with 'tensorzero::': {tool_name}"),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Deserialize a TOML table into `UninitializedConfig`, reporting every invalid entry.
///
/// Each top-level entry is deserialized on its own so that one bad function does not hide
/// problems in another. When an entry fails, its variants, providers or evaluators are
/// checked one by one, since path tracking stops at internally tagged enums.
impl TryFrom<toml::Table> for UninitializedConfig {
    type Error = Error;

    fn try_from(table: toml::Table) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        let mut config = UninitializedConfig::default();

        for (key, value) in table {
            match key.as_str() {
                "gateway" => {
                    warn_unknown_gateway_keys(&value);
                    match deserialize_fields(&key, value) {
                        Ok(gateway) => config.gateway = gateway,
                        Err(gateway_errors) => errors.extend(gateway_errors),
                    }
                }
                "models" => {
                    config.models = deserialize_section(&key, value, &mut errors, deserialize_model);
                }
                "embedding_models" => {
                    config.embedding_models =
                        deserialize_section(&key, value, &mut errors, deserialize_model);
                }
                "functions" => {
                    config.functions = deserialize_section(
                        &key,
                        value,
                        &mut errors,
                        deserialize_tagged::<UninitializedFunctionConfig>,
                    );
                }
                "metrics" => {
                    config.metrics = deserialize_section(
                        &key,
                        value,
                        &mut errors,
                        deserialize_tagged::<MetricConfig>,
                    );
                }
                "tools" => {
                    config.tools = deserialize_section(
                        &key,
                        value,
                        &mut errors,
                        deserialize_fields::<UninitializedToolConfig>,
                    );
                }
                "evaluations" => {
                    config.evaluations = deserialize_section(
                        &key,
                        value,
                        &mut errors,
                        deserialize_tagged::<UninitializedEvaluationConfig>,
                    );
                }
                _ => {
                    let message = format!(
                        "unknown field `{key}`, expected one of {}",
                        TOP_LEVEL_KEYS
                            .iter()
                            .map(|k| format!("`{k}`"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    errors.push(FieldError { path: key, message });
                }
            }
        }

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(Error::new(ErrorDetails::Validation { errors }))
        }
    }
}

fn warn_unknown_gateway_keys(value: &toml::Value) {
    if let Some(table) = value.as_table() {
        for key in table.keys() {
            if !GATEWAY_KEYS.contains(&key.as_str()) {
                tracing::warn!("Ignoring unknown field `gateway.{key}`");
            }
        }
    }
}

/// Models and embedding models: the providers are checked one by one.
fn deserialize_model(path: &str, value: toml::Value) -> Result<ModelConfig, Vec<FieldError>> {
    let toml::Value::Table(mut fields) = value else {
        return deserialize_fields(path, value);
    };
    let (providers, provider_errors) =
        take_children::<ProviderConfig>(path, &mut fields, "providers");
    let model = deserialize_fields(path, toml::Value::Table(fields))
        .map(|model: ModelConfig| ModelConfig { providers, ..model });
    merge_errors(model, provider_errors)
}

impl Config {
    /// The config used when no config file is provided: no models or functions,
    /// only the implicit metrics.
    pub fn empty() -> Self {
        Config {
            gateway: GatewayConfig::default(),
            models: IndexMap::new(),
            embedding_models: IndexMap::new(),
            functions: IndexMap::new(),
            metrics: implicit_metrics().into_iter().collect(),
            tools: IndexMap::new(),
            evaluations: IndexMap::new(),
            config_path: None,
        }
    }

    #[instrument]
    pub async fn load_from_path(config_path: &Path) -> Result<Config, Error> {
        let table = UninitializedConfig::read_toml_config(config_path).await?;
        let base_path = base_path_for(config_path)?;
        let mut config = Self::load_from_toml(table, &base_path).await?;
        config.config_path = Some(config_path.to_path_buf());
        tracing::info!(
            functions = config.functions.len(),
            models = config.models.len(),
            metrics = config.metrics.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Validate a parsed TOML table and load every file it references from `base_path`.
    pub async fn load_from_toml(table: toml::Table, base_path: &Path) -> Result<Config, Error> {
        if table.is_empty() {
            tracing::info!("Config file is empty, so only the implicit metrics will be available.");
        }
        let uninitialized_config = UninitializedConfig::try_from(table)?;
        uninitialized_config.validate()?;
        Self::load_uninitialized(uninitialized_config, base_path).await
    }

    async fn load_uninitialized(
        uninitialized_config: UninitializedConfig,
        base_path: &Path,
    ) -> Result<Config, Error> {
        let UninitializedConfig {
            gateway,
            models,
            embedding_models,
            functions,
            mut metrics,
            tools,
            evaluations,
        } = uninitialized_config;

        let load_functions = try_join_all(functions.into_iter().map(|(name, config)| async move {
            config.load(&name, base_path).await.map(|c| (name, c))
        }));
        let load_tools = try_join_all(tools.into_iter().map(|(name, config)| async move {
            config.load(base_path).await.map(|c| (name, c))
        }));
        let load_evaluations =
            try_join_all(evaluations.into_iter().map(|(name, config)| async move {
                config.load(&name, base_path).await.map(|c| (name, c))
            }));
        let (functions, tools, evaluations) =
            tokio::try_join!(load_functions, load_tools, load_evaluations)?;

        metrics.extend(implicit_metrics());
        for (evaluation_name, evaluation) in &evaluations {
            for (metric_name, metric_config) in evaluation.metrics(evaluation_name) {
                if metrics.contains_key(&metric_name) {
                    return Err(ErrorDetails::Config {
                        message: format!(
                            "Duplicate evaluator metric name: `{metric_name}` already exists"
                        ),
                    }
                    .into());
                }
                metrics.insert(metric_name, metric_config);
            }
        }

        Ok(Config {
            gateway,
            models,
            embedding_models,
            functions: functions.into_iter().collect(),
            metrics,
            tools: tools.into_iter().collect(),
            evaluations: evaluations.into_iter().collect(),
            config_path: None,
        })
    }

    /// Get a function by name
    pub fn get_function<'a>(&'a self, function_name: &str) -> Result<&'a FunctionConfig, Error> {
        self.functions.get(function_name).ok_or_else(|| {
            Error::new(ErrorDetails::UnknownFunction {
                name: function_name.to_string(),
            })
        })
    }

    /// Get a model by name
    pub fn get_model<'a>(&'a self, model_name: &str) -> Result<&'a ModelConfig, Error> {
        self.models.get(model_name).ok_or_else(|| {
            Error::new(ErrorDetails::UnknownModel {
                name: model_name.to_string(),
            })
        })
    }

    /// Get a metric by name, producing an error if it's not found
    pub fn get_metric<'a>(&'a self, metric_name: &str) -> Result<&'a MetricConfig, Error> {
        self.metrics.get(metric_name).ok_or_else(|| {
            Error::new(ErrorDetails::UnknownMetric {
                name: metric_name.to_string(),
            })
        })
    }

    /// Get a tool by name
    pub fn get_tool<'a>(&'a self, tool_name: &str) -> Result<&'a ToolConfig, Error> {
        self.tools.get(tool_name).ok_or_else(|| {
            Error::new(ErrorDetails::UnknownTool {
                name: tool_name.to_string(),
            })
        })
    }

    pub fn get_evaluation<'a>(
        &'a self,
        evaluation_name: &str,
    ) -> Result<&'a EvaluationConfig, Error> {
        self.evaluations.get(evaluation_name).ok_or_else(|| {
            Error::new(ErrorDetails::UnknownEvaluation {
                name: evaluation_name.to_string(),
            })
        })
    }

    /// Get all templates from the config
    /// The HashMap returned is a mapping from the path as given in the TOML file
    /// (relative to the directory containing the TOML file) to the file contents.
    pub fn get_templates(&self) -> HashMap<String, String> {
        let variant_templates = self
            .functions
            .values()
            .flat_map(|function| function.variants().values())
            .flat_map(|variant| variant.get_all_template_paths());
        let judge_instructions = self
            .evaluations
            .values()
            .flat_map(|evaluation| evaluation.evaluators().values())
            .flat_map(|evaluator| match evaluator {
                EvaluatorConfig::ExactMatch(_) => Vec::new(),
                EvaluatorConfig::LLMJudge(judge) => judge
                    .variants
                    .values()
                    .map(|variant| match variant {
                        LLMJudgeVariantConfig::ChatCompletion(params) => {
                            &params.system_instructions
                        }
                    })
                    .collect(),
            });
        variant_templates
            .chain(judge_instructions)
            .map(|template: &PathWithContents| {
                (
                    template.path.to_string_lossy().to_string(),
                    template.contents.clone(),
                )
            })
            .collect()
    }
}
