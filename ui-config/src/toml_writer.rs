//! Serializes single models and variants as TOML fragments that can be pasted into
//! `tensorzero.toml`, or merged into an existing document with `upsert_model`.

use serde::Serialize;
use toml_edit::{Array, DocumentMut, Item, Table, Value};

use crate::error::{Error, ErrorDetails};
use crate::model::{ModelConfig, ProviderConfig};
use crate::variant::UninitializedVariantConfig;

/// Serialize a value to a TOML table using toml_edit.
/// Nested tables are written inline so that the result can be placed under any header.
pub fn serialize_to_table<T: Serialize>(value: &T) -> Result<Table, Error> {
    // First serialize to toml string, then parse to toml_edit
    let toml_string = toml::to_string(value).map_err(|e| {
        Error::new(ErrorDetails::Serialization {
            message: format!("Failed to serialize to TOML: {e}"),
        })
    })?;
    let doc: DocumentMut = toml_string.parse().map_err(|e: toml_edit::TomlError| {
        Error::new(ErrorDetails::Serialization {
            message: format!("Failed to parse serialized TOML: {e}"),
        })
    })?;

    let mut table = Table::new();
    for (key, item) in doc.into_table() {
        let item = match item {
            Item::Value(mut value) => {
                value.decor_mut().clear();
                normalize_floats(&mut value);
                Item::Value(value)
            }
            Item::Table(nested) => {
                let mut value = Value::InlineTable(nested.into_inline_table());
                normalize_floats(&mut value);
                Item::Value(value)
            }
            item => item,
        };
        table.insert(&key, item);
    }
    Ok(table)
}

/// `f32` fields reach the serializer widened to `f64` (0.7 becomes 0.699999988079071).
/// Floats that are exactly representable as `f32` are rewritten with their shortest `f32` form.
fn normalize_floats(value: &mut Value) {
    let shortest = match value {
        Value::Float(float) => shortest_f32_repr(*float.value()),
        _ => None,
    };
    if let Some(shortest) = shortest {
        let decor = value.decor().clone();
        *value = Value::from(shortest);
        *value.decor_mut() = decor;
        return;
    }
    match value {
        Value::Array(array) => array.iter_mut().for_each(normalize_floats),
        Value::InlineTable(table) => table.iter_mut().for_each(|(_, value)| normalize_floats(value)),
        _ => {}
    }
}

fn shortest_f32_repr(value: f64) -> Option<f64> {
    let narrowed = value as f32;
    if f64::from(narrowed) != value {
        return None;
    }
    narrowed.to_string().parse().ok()
}

/// Ensure a table exists at the given path, creating implicit tables where necessary.
/// Returns a mutable reference to the table.
pub fn ensure_table<'a>(doc: &'a mut DocumentMut, path: &[&str]) -> Result<&'a mut Table, Error> {
    let mut current = doc.as_table_mut();
    for &key in path {
        current = current
            .entry(key)
            .or_insert_with(|| Item::Table(implicit_table()))
            .as_table_mut()
            .ok_or_else(|| {
                Error::new(ErrorDetails::Serialization {
                    message: format!("Expected `{}` to be a table", path.join(".")),
                })
            })?;
    }
    Ok(current)
}

fn implicit_table() -> Table {
    let mut table = Table::new();
    table.set_implicit(true);
    table
}

/// `[ "a", "b" ]`, with spaces inside the brackets.
fn spaced_array<'a>(values: impl IntoIterator<Item = &'a String>) -> Array {
    let mut array = Array::new();
    for value in values {
        array.push_formatted(Value::from(value.as_str()).decorated(" ", ""));
    }
    if !array.is_empty() {
        array.set_trailing(" ");
    }
    array
}

fn model_table(model: &ModelConfig) -> Result<Table, Error> {
    let mut table = Table::new();
    table.insert("routing", Item::Value(Value::Array(spaced_array(&model.routing))));
    let mut providers = implicit_table();
    for (provider_name, provider) in &model.providers {
        providers.insert(provider_name, Item::Table(serialize_to_table(provider)?));
    }
    table.insert("providers", Item::Table(providers));
    Ok(table)
}

fn fragment_to_string(doc: &DocumentMut) -> String {
    doc.to_string().trim_end().to_string()
}

/// Serializes a model that routes to a single provider of the same name:
///
/// ```toml
/// [models.<name>]
/// routing = [ "<name>" ]
///
/// [models.<name>.providers.<name>]
/// type = "..."
/// ```
pub fn dump_provider_config(name: &str, provider: &ProviderConfig) -> Result<String, Error> {
    dump_model_config(name, &ModelConfig::single_provider(name, provider.clone()))
}

/// Serializes a single-route model as a `[models.<name>]` fragment.
pub fn dump_model_config(name: &str, model: &ModelConfig) -> Result<String, Error> {
    let [route] = model.routing.as_slice() else {
        return Err(Error::new(ErrorDetails::Serialization {
            message: format!(
                "`models.{name}`: `routing` must contain exactly one entry, found {}",
                model.routing.len()
            ),
        }));
    };
    if !model.providers.contains_key(route) {
        return Err(Error::new(ErrorDetails::Serialization {
            message: format!(
                "`models.{name}`: provider config for routing target `{route}` must exist"
            ),
        }));
    }
    let mut doc = DocumentMut::new();
    let models = ensure_table(&mut doc, &["models"])?;
    models.insert(name, Item::Table(model_table(model)?));
    Ok(fragment_to_string(&doc))
}

/// Serializes a variant as a `[functions.<function_name>.variants.<variant_name>]` fragment.
pub fn dump_variant_config(
    function_name: &str,
    variant_name: &str,
    variant: &UninitializedVariantConfig,
) -> Result<String, Error> {
    let mut doc = DocumentMut::new();
    let variants = ensure_table(&mut doc, &["functions", function_name, "variants"])?;
    variants.insert(variant_name, Item::Table(serialize_to_table(variant)?));
    Ok(fragment_to_string(&doc))
}

/// Upsert a model into the `models` table of an existing document.
/// Everything else in the document, including comments, is left untouched.
pub fn upsert_model(doc: &mut DocumentMut, name: &str, model: &ModelConfig) -> Result<(), Error> {
    let item = Item::Table(model_table(model)?);
    let models = ensure_table(doc, &["models"])?;
    models.insert(name, item);
    Ok(())
}
