//! Deserialization of the raw config that reports every invalid field instead of the first one.
//!
//! Entries are deserialized with `serde_path_to_error`. When a field is rejected, it is
//! reported and removed (or replaced by a placeholder if it is required) and the entry is
//! deserialized again, so later fields are still checked. Tagged unions are dispatched on
//! their `type` field by hand, because serde buffers internally tagged enums and loses the
//! path of the offending field.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;

use crate::error::FieldError;

/// Upper bound on deserialization attempts for a single entry.
const MAX_ATTEMPTS: usize = 64;

/// A config entry selected by its `type` field.
pub(crate) trait TaggedConfig: Sized {
    /// The `type` values listed when an unknown one is found.
    const TAGS: &'static [&'static str];

    /// Deserializes the fields of an entry whose `type` is `tag`. `fields` no longer contains `type`.
    fn from_fields(tag: &str, path: &str, fields: toml::Table) -> Result<Self, Vec<FieldError>>;
}

/// Appends the path reported by `serde_path_to_error` to `prefix`.
fn join_path(prefix: &str, path: &serde_path_to_error::Path) -> String {
    let inner = path.to_string();
    if inner == "." {
        prefix.to_string()
    } else if inner.starts_with('[') {
        format!("{prefix}{inner}")
    } else {
        format!("{prefix}.{inner}")
    }
}

pub(crate) fn deserialize_at<T: DeserializeOwned>(
    path: &str,
    value: toml::Value,
) -> Result<T, FieldError> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        let path = join_path(path, e.path());
        FieldError {
            path,
            // Extract the underlying message from the toml error, as
            // the path-tracking from the toml crate will be incorrect
            message: e.into_inner().message().to_string(),
        }
    })
}

/// Deserializes a struct, reporting every field that is missing or invalid.
pub(crate) fn deserialize_fields<T: DeserializeOwned>(
    path: &str,
    value: toml::Value,
) -> Result<T, Vec<FieldError>> {
    let mut fields = match value {
        toml::Value::Table(fields) => fields,
        value => return deserialize_at(path, value).map_err(|e| vec![e]),
    };
    let mut errors = Vec::new();
    // Fields already reported; a later `missing field` error for them is a consequence.
    let mut reported = HashSet::new();
    // Required fields currently filled with a placeholder => attempt number
    let mut placeholders: HashMap<String, usize> = HashMap::new();

    for _ in 0..MAX_ATTEMPTS {
        let error = match serde_path_to_error::deserialize::<_, T>(toml::Value::Table(
            fields.clone(),
        )) {
            Ok(entry) if errors.is_empty() => return Ok(entry),
            Ok(_) => return Err(errors),
            Err(e) => e,
        };
        let located_key = match error.path().iter().next() {
            Some(Segment::Map { key }) => Some(key.clone()),
            _ => None,
        };
        let error_path = join_path(path, error.path());
        let message = error.into_inner().message().to_string();
        let Some(key) = located_key.clone().or_else(|| quoted_field(&message)) else {
            errors.push(FieldError {
                path: error_path,
                message,
            });
            return Err(errors);
        };

        if let Some(attempt) = placeholders.get_mut(&key) {
            // The placeholder does not have the field's type
            *attempt += 1;
            match next_placeholder(*attempt, &message) {
                Some(placeholder) => {
                    fields.insert(key, placeholder);
                    continue;
                }
                None => return Err(errors),
            }
        }

        if located_key.is_none() && message.starts_with("missing field") {
            if !reported.contains(&key) {
                errors.push(FieldError {
                    path: format!("{path}.{key}"),
                    message,
                });
            }
            match next_placeholder(0, "") {
                Some(placeholder) => {
                    fields.insert(key.clone(), placeholder);
                    placeholders.insert(key, 0);
                }
                None => return Err(errors),
            }
        } else {
            let path = match located_key {
                Some(_) => error_path,
                None => format!("{path}.{key}"),
            };
            errors.push(FieldError { path, message });
            fields.remove(&key);
            reported.insert(key);
        }
    }
    Err(errors)
}

/// The field named by serde's `missing field` and `unknown field` errors.
fn quoted_field(message: &str) -> Option<String> {
    if message.starts_with("missing field `") || message.starts_with("unknown field `") {
        message.split('`').nth(1).map(str::to_string)
    } else {
        None
    }
}

/// The first value listed by serde's `unknown variant` errors.
fn expected_variant(message: &str) -> Option<String> {
    let (_, expected) = message
        .strip_prefix("unknown variant `")?
        .split_once("expected ")?;
    expected.split('`').nth(1).map(str::to_string)
}

/// A stand-in for a required field, so that the remaining fields can be checked.
fn next_placeholder(attempt: usize, message: &str) -> Option<toml::Value> {
    if let Some(variant) = expected_variant(message) {
        return Some(toml::Value::String(variant));
    }
    match attempt {
        0 => Some(toml::Value::String(String::new())),
        1 => Some(toml::Value::Integer(0)),
        2 => Some(toml::Value::Float(0.0)),
        3 => Some(toml::Value::Boolean(false)),
        4 => Some(toml::Value::Array(Vec::new())),
        5 => Some(toml::Value::Table(toml::Table::new())),
        _ => None,
    }
}

/// Deserializes an entry of a tagged union, dispatching on its `type` field.
pub(crate) fn deserialize_tagged<T: TaggedConfig>(
    path: &str,
    value: toml::Value,
) -> Result<T, Vec<FieldError>> {
    let mut fields = match value {
        toml::Value::Table(fields) => fields,
        value => {
            return Err(vec![FieldError {
                path: path.to_string(),
                message: format!("invalid type: {}, expected a table", value.type_str()),
            }]);
        }
    };
    match fields.remove("type") {
        Some(toml::Value::String(tag)) => T::from_fields(&tag, path, fields),
        Some(value) => Err(vec![FieldError {
            path: format!("{path}.type"),
            message: format!("invalid type: {}, expected a string", value.type_str()),
        }]),
        None => Err(vec![FieldError {
            path: format!("{path}.type"),
            message: "missing field `type`".to_string(),
        }]),
    }
}

pub(crate) fn unknown_tag<T: TaggedConfig>(path: &str, tag: &str) -> Vec<FieldError> {
    use serde::de::Error as _;
    vec![FieldError {
        path: format!("{path}.type"),
        message: serde::de::value::Error::unknown_variant(tag, T::TAGS).to_string(),
    }]
}

/// Deserializes the tagged children stored under `key` (e.g. a function's variants) and
/// leaves an empty table in their place. If `key` does not hold a table, it is left for
/// the parent to report.
pub(crate) fn take_children<C: TaggedConfig>(
    path: &str,
    fields: &mut toml::Table,
    key: &str,
) -> (IndexMap<String, C>, Vec<FieldError>) {
    let mut children = IndexMap::new();
    let mut errors = Vec::new();
    let Some(toml::Value::Table(raw_children)) = fields.get_mut(key) else {
        return (children, errors);
    };
    for (name, child) in std::mem::take(raw_children) {
        match deserialize_tagged::<C>(&format!("{path}.{key}.{name}"), child) {
            Ok(child) => {
                children.insert(name, child);
            }
            Err(child_errors) => errors.extend(child_errors),
        }
    }
    (children, errors)
}

/// Combines an entry with the errors of its children, entry errors first.
pub(crate) fn merge_errors<T>(
    entry: Result<T, Vec<FieldError>>,
    child_errors: Vec<FieldError>,
) -> Result<T, Vec<FieldError>> {
    match entry {
        Ok(entry) if child_errors.is_empty() => Ok(entry),
        Ok(_) => Err(child_errors),
        Err(mut errors) => {
            errors.extend(child_errors);
            Err(errors)
        }
    }
}

/// Deserializes a `name => entry` table, collecting the errors of every entry.
pub(crate) fn deserialize_section<T>(
    section: &str,
    value: toml::Value,
    errors: &mut Vec<FieldError>,
    deserialize_entry: impl Fn(&str, toml::Value) -> Result<T, Vec<FieldError>>,
) -> IndexMap<String, T> {
    let entries: IndexMap<String, toml::Value> = match deserialize_at(section, value) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(e);
            return IndexMap::new();
        }
    };
    let mut section_map = IndexMap::new();
    for (name, entry) in entries {
        match deserialize_entry(&format!("{section}.{name}"), entry) {
            Ok(entry) => {
                section_map.insert(name, entry);
            }
            Err(entry_errors) => errors.extend(entry_errors),
        }
    }
    section_map
}
