use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::metric::{
    FeedbackMetricConfig, MetricConfig, MetricConfigLevel, MetricConfigOptimize,
};
use crate::config::path::PathWithContents;
use crate::config::validation::{
    TaggedConfig, deserialize_fields, merge_errors, take_children, unknown_tag,
};
use crate::error::{Error, ErrorDetails, FieldError};
use crate::variant::{JsonMode, RetryConfig};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum EvaluationConfig<R = PathWithContents> {
    #[serde(alias = "inference")]
    Static(StaticEvaluationConfig<R>),
}

pub type UninitializedEvaluationConfig = EvaluationConfig<PathBuf>;

/// Evaluates the inferences of `function_name` with every configured evaluator.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StaticEvaluationConfig<R = PathWithContents> {
    pub evaluators: IndexMap<String, EvaluatorConfig<R>>,
    pub function_name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorConfig<R = PathWithContents> {
    ExactMatch(ExactMatchConfig),
    #[serde(rename = "llm_judge")]
    LLMJudge(LLMJudgeConfig<R>),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExactMatchConfig {
    #[serde(default)]
    pub cutoff: Option<f32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LLMJudgeConfig<R = PathWithContents> {
    #[serde(default)]
    pub input_format: LLMJudgeInputFormat,
    pub output_type: LLMJudgeOutputType,
    pub optimize: MetricConfigOptimize,
    #[serde(default)]
    pub include: LLMJudgeIncludeConfig,
    #[serde(default)]
    pub cutoff: Option<f32>,
    pub variants: IndexMap<String, LLMJudgeVariantConfig<R>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LLMJudgeIncludeConfig {
    #[serde(default)]
    pub reference_output: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LLMJudgeInputFormat {
    #[default]
    Serialized,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LLMJudgeOutputType {
    Float,
    Boolean,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum LLMJudgeVariantConfig<R = PathWithContents> {
    ChatCompletion(LLMJudgeChatCompletionVariantConfig<R>),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LLMJudgeChatCompletionVariantConfig<R = PathWithContents> {
    #[serde(default)]
    pub active: Option<bool>,
    pub model: String,
    pub system_instructions: R,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub seed: Option<u32>,
    #[serde(default = "default_llm_judge_json_mode")]
    pub json_mode: JsonMode,
    #[serde(default)]
    pub retries: RetryConfig,
}

fn default_llm_judge_json_mode() -> JsonMode {
    JsonMode::Strict
}

impl TaggedConfig for UninitializedEvaluationConfig {
    const TAGS: &'static [&'static str] = &["static"];

    fn from_fields(tag: &str, path: &str, mut fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        if tag != "static" && tag != "inference" {
            return Err(unknown_tag::<Self>(path, tag));
        }
        let (evaluators, evaluator_errors) =
            take_children::<EvaluatorConfig<PathBuf>>(path, &mut fields, "evaluators");
        let evaluation = deserialize_fields(path, toml::Value::Table(fields)).map(
            |config: StaticEvaluationConfig<PathBuf>| {
                EvaluationConfig::Static(StaticEvaluationConfig {
                    evaluators,
                    ..config
                })
            },
        );
        merge_errors(evaluation, evaluator_errors)
    }
}

impl TaggedConfig for EvaluatorConfig<PathBuf> {
    const TAGS: &'static [&'static str] = &["exact_match", "llm_judge"];

    fn from_fields(tag: &str, path: &str, mut fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        match tag {
            "exact_match" => {
                deserialize_fields(path, toml::Value::Table(fields)).map(EvaluatorConfig::ExactMatch)
            }
            "llm_judge" => {
                let (variants, variant_errors) =
                    take_children::<LLMJudgeVariantConfig<PathBuf>>(path, &mut fields, "variants");
                let judge = deserialize_fields(path, toml::Value::Table(fields))
                    .map(|config: LLMJudgeConfig<PathBuf>| {
                        EvaluatorConfig::LLMJudge(LLMJudgeConfig { variants, ..config })
                    });
                merge_errors(judge, variant_errors)
            }
            _ => Err(unknown_tag::<Self>(path, tag)),
        }
    }
}

impl TaggedConfig for LLMJudgeVariantConfig<PathBuf> {
    const TAGS: &'static [&'static str] = &["chat_completion"];

    fn from_fields(tag: &str, path: &str, fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        match tag {
            "chat_completion" => deserialize_fields(path, toml::Value::Table(fields))
                .map(LLMJudgeVariantConfig::ChatCompletion),
            _ => Err(unknown_tag::<Self>(path, tag)),
        }
    }
}

pub fn get_evaluator_metric_name(evaluation_name: &str, evaluator_name: &str) -> String {
    format!("tensorzero::evaluation_name::{evaluation_name}::evaluator_name::{evaluator_name}")
}

impl<R> EvaluatorConfig<R> {
    pub fn cutoff(&self) -> Option<f32> {
        match self {
            EvaluatorConfig::ExactMatch(config) => config.cutoff,
            EvaluatorConfig::LLMJudge(config) => config.cutoff,
        }
    }

    /// The metric that stores this evaluator's results.
    pub fn metric_config(&self) -> MetricConfig {
        match self {
            EvaluatorConfig::ExactMatch(_) => MetricConfig::Boolean(FeedbackMetricConfig {
                optimize: MetricConfigOptimize::Max,
                level: MetricConfigLevel::Inference,
            }),
            EvaluatorConfig::LLMJudge(config) => {
                let metric = FeedbackMetricConfig {
                    optimize: config.optimize,
                    level: MetricConfigLevel::Inference,
                };
                match config.output_type {
                    LLMJudgeOutputType::Boolean => MetricConfig::Boolean(metric),
                    LLMJudgeOutputType::Float => MetricConfig::Float(metric),
                }
            }
        }
    }
}

impl<R> EvaluationConfig<R> {
    pub fn function_name(&self) -> &str {
        match self {
            EvaluationConfig::Static(config) => &config.function_name,
        }
    }

    pub fn evaluators(&self) -> &IndexMap<String, EvaluatorConfig<R>> {
        match self {
            EvaluationConfig::Static(config) => &config.evaluators,
        }
    }

    /// One metric per evaluator, named with `get_evaluator_metric_name`.
    pub fn metrics(&self, evaluation_name: &str) -> Vec<(String, MetricConfig)> {
        self.evaluators()
            .iter()
            .map(|(evaluator_name, evaluator)| {
                (
                    get_evaluator_metric_name(evaluation_name, evaluator_name),
                    evaluator.metric_config(),
                )
            })
            .collect()
    }
}

impl UninitializedEvaluationConfig {
    #[instrument(skip(self, base_path))]
    pub async fn load(
        self,
        evaluation_name: &str,
        base_path: &Path,
    ) -> Result<EvaluationConfig, Error> {
        // `::` is the delimiter of the generated metric and function names
        if evaluation_name.contains("::") {
            return Err(ErrorDetails::Config {
                message: format!(
                    "Evaluation names cannot contain \"::\" (referenced in `[evaluations.{evaluation_name}]`)"
                ),
            }
            .into());
        }
        match self {
            EvaluationConfig::Static(config) => {
                let evaluators =
                    try_join_all(config.evaluators.into_iter().map(|(name, evaluator)| async move {
                        evaluator
                            .load(evaluation_name, &name, base_path)
                            .await
                            .map(|evaluator| (name, evaluator))
                    }))
                    .await?;
                Ok(EvaluationConfig::Static(StaticEvaluationConfig {
                    evaluators: evaluators.into_iter().collect(),
                    function_name: config.function_name,
                }))
            }
        }
    }
}

impl EvaluatorConfig<PathBuf> {
    async fn load(
        self,
        evaluation_name: &str,
        evaluator_name: &str,
        base_path: &Path,
    ) -> Result<EvaluatorConfig, Error> {
        if evaluator_name.contains("::") {
            return Err(ErrorDetails::Config {
                message: format!(
                    "Evaluator names cannot contain \"::\" (referenced in `[evaluations.{evaluation_name}.evaluators.{evaluator_name}]`)"
                ),
            }
            .into());
        }
        match self {
            EvaluatorConfig::ExactMatch(config) => Ok(EvaluatorConfig::ExactMatch(config)),
            EvaluatorConfig::LLMJudge(config) => {
                let variants =
                    try_join_all(config.variants.into_iter().map(|(name, variant)| async move {
                        variant.load(base_path).await.map(|variant| (name, variant))
                    }))
                    .await?;
                Ok(EvaluatorConfig::LLMJudge(LLMJudgeConfig {
                    input_format: config.input_format,
                    output_type: config.output_type,
                    optimize: config.optimize,
                    include: config.include,
                    cutoff: config.cutoff,
                    variants: variants.into_iter().collect(),
                }))
            }
        }
    }
}

impl LLMJudgeVariantConfig<PathBuf> {
    async fn load(self, base_path: &Path) -> Result<LLMJudgeVariantConfig, Error> {
        match self {
            LLMJudgeVariantConfig::ChatCompletion(params) => {
                let system_instructions =
                    PathWithContents::from_path(params.system_instructions, base_path).await?;
                Ok(LLMJudgeVariantConfig::ChatCompletion(
                    LLMJudgeChatCompletionVariantConfig {
                        active: params.active,
                        model: params.model,
                        system_instructions,
                        temperature: params.temperature,
                        top_p: params.top_p,
                        max_tokens: params.max_tokens,
                        presence_penalty: params.presence_penalty,
                        frequency_penalty: params.frequency_penalty,
                        seed: params.seed,
                        json_mode: params.json_mode,
                        retries: params.retries,
                    },
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVALUATION: &str = r#"
        type = "static"
        function_name = "write_haiku"

        [evaluators.exact]
        type = "exact_match"
        cutoff = 0.6

        [evaluators.topic_starts_with_f]
        type = "llm_judge"
        output_type = "boolean"
        optimize = "max"

        [evaluators.topic_starts_with_f.variants.judge]
        type = "chat_completion"
        active = true
        model = "gpt-4o-mini"
        system_instructions = "evaluations/judge.txt"
    "#;

    #[tokio::test]
    async fn test_load_static_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("evaluations")).unwrap();
        std::fs::write(
            dir.path().join("evaluations/judge.txt"),
            "Does the topic start with F?",
        )
        .unwrap();
        let raw: UninitializedEvaluationConfig = toml::from_str(EVALUATION).unwrap();
        let loaded = raw.load("haiku", dir.path()).await.unwrap();
        assert_eq!(loaded.function_name(), "write_haiku");

        let names: Vec<_> = loaded.evaluators().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["exact", "topic_starts_with_f"]);
        assert_eq!(loaded.evaluators()["exact"].cutoff(), Some(0.6));

        let EvaluatorConfig::LLMJudge(judge) = &loaded.evaluators()["topic_starts_with_f"] else {
            panic!("Expected an LLM judge evaluator");
        };
        assert_eq!(judge.input_format, LLMJudgeInputFormat::Serialized);
        assert!(!judge.include.reference_output);
        let LLMJudgeVariantConfig::ChatCompletion(variant) = &judge.variants["judge"];
        assert_eq!(variant.json_mode, JsonMode::Strict);
        assert_eq!(
            variant.system_instructions,
            PathWithContents {
                path: PathBuf::from("evaluations/judge.txt"),
                contents: "Does the topic start with F?".to_string(),
            }
        );
    }

    #[test]
    fn test_evaluator_metrics() {
        let raw: UninitializedEvaluationConfig = toml::from_str(EVALUATION).unwrap();
        let metrics = raw.metrics("haiku");
        assert_eq!(
            metrics,
            vec![
                (
                    "tensorzero::evaluation_name::haiku::evaluator_name::exact".to_string(),
                    MetricConfig::Boolean(FeedbackMetricConfig {
                        optimize: MetricConfigOptimize::Max,
                        level: MetricConfigLevel::Inference,
                    }),
                ),
                (
                    "tensorzero::evaluation_name::haiku::evaluator_name::topic_starts_with_f"
                        .to_string(),
                    MetricConfig::Boolean(FeedbackMetricConfig {
                        optimize: MetricConfigOptimize::Max,
                        level: MetricConfigLevel::Inference,
                    }),
                ),
            ]
        );
    }

    #[test]
    fn test_inference_alias() {
        let raw: UninitializedEvaluationConfig = toml::from_str(
            r#"
            type = "inference"
            function_name = "f"
            evaluators = {}
            "#,
        )
        .unwrap();
        assert_eq!(raw.function_name(), "f");
    }

    #[tokio::test]
    async fn test_evaluation_name_cannot_contain_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let raw: UninitializedEvaluationConfig = toml::from_str(
            r#"
            type = "static"
            function_name = "f"
            evaluators = {}
            "#,
        )
        .unwrap();
        let err = raw.load("bad::name", dir.path()).await.unwrap_err();
        assert!(
            err.to_string().contains("cannot contain \"::\""),
            "Unexpected error: {err}"
        );

        let raw: UninitializedEvaluationConfig = toml::from_str(
            r#"
            type = "static"
            function_name = "f"

            [evaluators."bad::evaluator"]
            type = "exact_match"
            "#,
        )
        .unwrap();
        let err = raw.load("good", dir.path()).await.unwrap_err();
        assert!(
            err.to_string().contains("Evaluator names cannot contain"),
            "Unexpected error: {err}"
        );
    }

    #[test]
    fn test_nested_judge_errors_are_reported() {
        let errors = crate::config::validation::deserialize_tagged::<UninitializedEvaluationConfig>(
            "evaluations.haiku",
            toml::Value::Table(
                r#"
                type = "static"

                [evaluators.exact]
                type = "exact_match"
                cutoff = "high"

                [evaluators.judge]
                type = "llm_judge"
                output_type = "percentage"
                optimize = "max"

                [evaluators.judge.variants.v]
                type = "chat_completion"
                model = "gpt-4o-mini"
                "#
                .parse()
                .unwrap(),
            ),
        )
        .unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "evaluations.haiku.function_name",
                "evaluations.haiku.evaluators.exact.cutoff",
                "evaluations.haiku.evaluators.judge.output_type",
                "evaluations.haiku.evaluators.judge.variants.v.system_instructions",
            ],
            "Unexpected errors: {errors:?}"
        );
    }
}
