use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::path::PathWithContents;
use crate::config::validation::{
    TaggedConfig, deserialize_fields, merge_errors, take_children, unknown_tag,
};
use crate::error::{Error, ErrorDetails, FieldError};
use crate::jsonschema_util::load_optional_schema;
use crate::tool::ToolChoice;
use crate::variant::{UninitializedVariantConfig, VariantConfig};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum FunctionConfig<R = PathWithContents> {
    Chat(FunctionConfigChat<R>),
    Json(FunctionConfigJson<R>),
}

pub type UninitializedFunctionConfig = FunctionConfig<PathBuf>;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionConfigChat<R = PathWithContents> {
    pub variants: IndexMap<String, VariantConfig<R>>, // variant name => variant config
    pub system_schema: Option<R>,
    pub user_schema: Option<R>,
    pub assistant_schema: Option<R>,
    #[serde(default)]
    pub tools: Vec<String>, // tool names
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default)]
    pub parallel_tool_calls: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionConfigJson<R = PathWithContents> {
    pub variants: IndexMap<String, VariantConfig<R>>, // variant name => variant config
    pub system_schema: Option<R>,
    pub user_schema: Option<R>,
    pub assistant_schema: Option<R>,
    pub output_schema: Option<R>,
}

impl TaggedConfig for UninitializedFunctionConfig {
    const TAGS: &'static [&'static str] = &["chat", "json"];

    fn from_fields(tag: &str, path: &str, mut fields: toml::Table) -> Result<Self, Vec<FieldError>> {
        if !Self::TAGS.contains(&tag) {
            return Err(unknown_tag::<Self>(path, tag));
        }
        // Variants are checked one by one; the function itself then sees an empty table.
        let (variants, variant_errors) =
            take_children::<UninitializedVariantConfig>(path, &mut fields, "variants");
        let fields = toml::Value::Table(fields);
        let function = if tag == "chat" {
            deserialize_fields(path, fields)
                .map(|params| FunctionConfig::Chat(FunctionConfigChat { variants, ..params }))
        } else {
            deserialize_fields(path, fields)
                .map(|params| FunctionConfig::Json(FunctionConfigJson { variants, ..params }))
        };
        merge_errors(function, variant_errors)
    }
}

impl<R> FunctionConfig<R> {
    pub fn variants(&self) -> &IndexMap<String, VariantConfig<R>> {
        match self {
            FunctionConfig::Chat(params) => &params.variants,
            FunctionConfig::Json(params) => &params.variants,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FunctionConfig::Chat(_) => "chat",
            FunctionConfig::Json(_) => "json",
        }
    }
}

impl FunctionConfig {
    pub fn get_variant(&self, variant_name: &str) -> Result<&VariantConfig, Error> {
        self.variants().get(variant_name).ok_or_else(|| {
            Error::new(ErrorDetails::UnknownVariant {
                name: variant_name.to_string(),
            })
        })
    }
}

/// Loads every variant concurrently. The result keeps the input order.
async fn load_variants(
    variants: IndexMap<String, UninitializedVariantConfig>,
    base_path: &Path,
) -> Result<IndexMap<String, VariantConfig>, Error> {
    let loaded = try_join_all(variants.into_iter().map(|(name, variant)| async move {
        variant.load(base_path).await.map(|variant| (name, variant))
    }))
    .await?;
    Ok(loaded.into_iter().collect())
}

impl UninitializedFunctionConfig {
    #[instrument(skip(self, base_path))]
    pub async fn load(self, function_name: &str, base_path: &Path) -> Result<FunctionConfig, Error> {
        match self {
            FunctionConfig::Chat(params) => {
                let (variants, system_schema, user_schema, assistant_schema) = tokio::try_join!(
                    load_variants(params.variants, base_path),
                    load_optional_schema(params.system_schema, base_path),
                    load_optional_schema(params.user_schema, base_path),
                    load_optional_schema(params.assistant_schema, base_path),
                )?;
                tracing::debug!(num_variants = variants.len(), "Loaded chat function");
                Ok(FunctionConfig::Chat(FunctionConfigChat {
                    variants,
                    system_schema,
                    user_schema,
                    assistant_schema,
                    tools: params.tools,
                    tool_choice: params.tool_choice,
                    parallel_tool_calls: params.parallel_tool_calls,
                }))
            }
            FunctionConfig::Json(params) => {
                let (variants, system_schema, user_schema, assistant_schema, output_schema) = tokio::try_join!(
                    load_variants(params.variants, base_path),
                    load_optional_schema(params.system_schema, base_path),
                    load_optional_schema(params.user_schema, base_path),
                    load_optional_schema(params.assistant_schema, base_path),
                    load_optional_schema(params.output_schema, base_path),
                )?;
                tracing::debug!(num_variants = variants.len(), "Loaded json function");
                Ok(FunctionConfig::Json(FunctionConfigJson {
                    variants,
                    system_schema,
                    user_schema,
                    assistant_schema,
                    output_schema,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::JsonMode;

    fn write_fixture(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_load_json_function() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "schemas/output.json", r#"{"type": "object"}"#);
        write_fixture(dir.path(), "schemas/system.json", r#"{"type": "object"}"#);
        write_fixture(dir.path(), "templates/system.minijinja", "Extract {{ entity }}");

        let raw: UninitializedFunctionConfig = toml::from_str(
            r#"
            type = "json"
            system_schema = "schemas/system.json"
            output_schema = "schemas/output.json"

            [variants.baseline]
            type = "chat_completion"
            model = "gpt-4o-mini"
            system_template = "templates/system.minijinja"
            json_mode = "strict"
            "#,
        )
        .unwrap();
        let loaded = raw.load("extract_entities", dir.path()).await.unwrap();
        let FunctionConfig::Json(params) = &loaded else {
            panic!("Expected a JSON function");
        };
        assert_eq!(
            params.output_schema,
            Some(PathWithContents {
                path: PathBuf::from("schemas/output.json"),
                contents: r#"{"type": "object"}"#.to_string(),
            })
        );
        assert_eq!(params.user_schema, None);
        let VariantConfig::ChatCompletion(variant) = loaded.get_variant("baseline").unwrap() else {
            panic!("Expected a chat completion variant");
        };
        assert_eq!(variant.json_mode, JsonMode::Strict);
        assert_eq!(
            variant.system_template.as_ref().map(|t| t.contents.as_str()),
            Some("Extract {{ entity }}")
        );
        assert!(loaded.get_variant("missing").is_err());
    }

    #[tokio::test]
    async fn test_variant_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let raw: UninitializedFunctionConfig = toml::from_str(
            r#"
            type = "chat"

            [variants.zeta]
            type = "chat_completion"
            model = "a"

            [variants.alpha]
            type = "chat_completion"
            model = "b"

            [variants.mu]
            type = "chat_completion"
            model = "c"
            "#,
        )
        .unwrap();
        let loaded = raw.load("ordered", dir.path()).await.unwrap();
        let names: Vec<_> = loaded.variants().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mu"]);
    }

    #[test]
    fn test_chat_defaults() {
        let raw: UninitializedFunctionConfig = toml::from_str(
            r#"
            type = "chat"
            variants = {}
            "#,
        )
        .unwrap();
        let FunctionConfig::Chat(params) = raw else {
            panic!("Expected a chat function");
        };
        assert_eq!(params.tool_choice, ToolChoice::None);
        assert!(params.tools.is_empty());
        assert_eq!(params.parallel_tool_calls, None);
    }

    #[test]
    fn test_json_function_rejects_tools() {
        let err = toml::from_str::<UninitializedFunctionConfig>(
            r#"
            type = "json"
            variants = {}
            tools = ["get_temperature"]
            "#,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("unknown field `tools`"),
            "Unexpected error: {err}"
        );
        let err = toml::from_str::<UninitializedFunctionConfig>(
            r#"
            type = "json"
            variants = {}
            tool_choice = "auto"
            "#,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("unknown field `tool_choice`"),
            "Unexpected error: {err}"
        );
    }

    #[test]
    fn test_chat_function_rejects_output_schema() {
        let err = toml::from_str::<UninitializedFunctionConfig>(
            r#"
            type = "chat"
            variants = {}
            output_schema = "output.json"
            "#,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("unknown field `output_schema`"),
            "Unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_loaded_json_function_never_exposes_tools() {
        let dir = tempfile::tempdir().unwrap();
        let raw: UninitializedFunctionConfig = toml::from_str(
            r#"
            type = "json"
            variants = {}
            "#,
        )
        .unwrap();
        let loaded = raw.load("json_fn", dir.path()).await.unwrap();
        let value = serde_json::to_value(&loaded).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("tools"));
        assert!(!object.contains_key("tool_choice"));
        assert!(object.contains_key("output_schema"));

        let raw: UninitializedFunctionConfig = toml::from_str(
            r#"
            type = "chat"
            variants = {}
            "#,
        )
        .unwrap();
        let loaded = raw.load("chat_fn", dir.path()).await.unwrap();
        let value = serde_json::to_value(&loaded).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("output_schema"));
        assert_eq!(object["tool_choice"], "none");
    }
}
