use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::path::PathWithContents;
use crate::error::Error;
use crate::jsonschema_util::load_schema;

/// A tool that functions can offer to the model.
/// `parameters` references a JSON Schema file describing the tool's arguments.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig<R = PathWithContents> {
    pub description: String,
    pub parameters: R,
    #[serde(default)]
    pub strict: bool,
}

pub type UninitializedToolConfig = ToolConfig<PathBuf>;

impl UninitializedToolConfig {
    pub async fn load(self, base_path: &Path) -> Result<ToolConfig, Error> {
        Ok(ToolConfig {
            description: self.description,
            parameters: load_schema(self.parameters, base_path).await?,
            strict: self.strict,
        })
    }
}

/// Most inference providers allow the user to force a tool to be used
/// and even specify which tool to be used.
///
/// This enum is used to denote this tool choice.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[serde(deny_unknown_fields)]
pub enum ToolChoice {
    #[default]
    None,
    Auto,
    Required,
    // Forces the LLM to call a specific tool. The String is the name of the tool.
    Specific(String),
}
