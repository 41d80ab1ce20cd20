use serde::{Deserialize, Serialize};

use crate::config::validation::{TaggedConfig, deserialize_fields, unknown_tag};
use crate::error::FieldError;

/// Metric names the UI always provides. They cannot be defined in the config file.
pub const RESERVED_METRIC_NAMES: [&str; 2] = ["comment", "demonstration"];

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum MetricConfig {
    Boolean(FeedbackMetricConfig),
    Float(FeedbackMetricConfig),
    Comment(CommentMetricConfig),
    Demonstration(DemonstrationMetricConfig),
}

impl TaggedConfig for MetricConfig {
    const TAGS: &'static [&'static str] = &["boolean", "float", "comment", "demonstration"];

    fn from_fields(tag: &str, path: &str, fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        let fields = toml::Value::Table(fields);
        match tag {
            "boolean" => deserialize_fields(path, fields).map(MetricConfig::Boolean),
            "float" => deserialize_fields(path, fields).map(MetricConfig::Float),
            "comment" => deserialize_fields(path, fields).map(MetricConfig::Comment),
            "demonstration" => deserialize_fields(path, fields).map(MetricConfig::Demonstration),
            _ => Err(unknown_tag::<Self>(path, tag)),
        }
    }
}

/// Boolean and float metrics carry an optimization direction and a level.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackMetricConfig {
    pub optimize: MetricConfigOptimize,
    pub level: MetricConfigLevel,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommentMetricConfig {}

/// Demonstrations are always given for a single inference.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DemonstrationMetricConfig {
    #[serde(default)]
    pub level: DemonstrationLevel,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemonstrationLevel {
    #[default]
    Inference,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricConfigOptimize {
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricConfigLevel {
    Inference,
    Episode,
}

impl std::fmt::Display for MetricConfigLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricConfigLevel::Inference => write!(f, "inference"),
            MetricConfigLevel::Episode => write!(f, "episode"),
        }
    }
}

impl MetricConfig {
    pub fn level(&self) -> MetricConfigLevel {
        match self {
            MetricConfig::Boolean(config) | MetricConfig::Float(config) => config.level,
            MetricConfig::Comment(_) => MetricConfigLevel::Inference,
            MetricConfig::Demonstration(_) => MetricConfigLevel::Inference,
        }
    }

    pub fn optimize(&self) -> Option<MetricConfigOptimize> {
        match self {
            MetricConfig::Boolean(config) | MetricConfig::Float(config) => Some(config.optimize),
            MetricConfig::Comment(_) | MetricConfig::Demonstration(_) => None,
        }
    }
}

/// The metrics injected into every loaded config.
pub fn implicit_metrics() -> [(String, MetricConfig); 2] {
    [
        (
            "comment".to_string(),
            MetricConfig::Comment(CommentMetricConfig {}),
        ),
        (
            "demonstration".to_string(),
            MetricConfig::Demonstration(DemonstrationMetricConfig::default()),
        ),
    ]
}
