use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::path::PathWithContents;
use crate::error::{Error, ErrorDetails};

/// Parses a loaded schema file and compiles it, so that invalid schemas fail at startup.
fn check_schema(file: &PathWithContents) -> Result<(), Error> {
    let value: Value = serde_json::from_str(&file.contents).map_err(|e| {
        Error::new(ErrorDetails::JsonSchema {
            message: format!(
                "Failed to parse JSON Schema `{}`: {e}",
                file.path.display()
            ),
        })
    })?;
    jsonschema::validator_for(&value).map_err(|e| {
        Error::new(ErrorDetails::JsonSchema {
            message: format!(
                "Failed to compile JSON Schema `{}`: {e}",
                file.path.display()
            ),
        })
    })?;
    Ok(())
}

/// Reads a schema file and checks that it is a valid JSON Schema.
/// The file is returned as written so the UI can display it.
pub async fn load_schema(path: PathBuf, base_path: &Path) -> Result<PathWithContents, Error> {
    let file = PathWithContents::from_path(path, base_path).await?;
    check_schema(&file)?;
    Ok(file)
}

pub async fn load_optional_schema(
    path: Option<PathBuf>,
    base_path: &Path,
) -> Result<Option<PathWithContents>, Error> {
    match path {
        Some(path) => load_schema(path, base_path).await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json() {
        let file = PathWithContents {
            path: PathBuf::from("schema.json"),
            contents: "{ not json".to_string(),
        };
        let err = check_schema(&file).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to parse JSON Schema `schema.json`"),
            "Unexpected error: {err}"
        );
    }

    #[test]
    fn test_invalid_schema() {
        let file = PathWithContents {
            path: PathBuf::from("schema.json"),
            contents: r#"{"type": "not_a_type"}"#.to_string(),
        };
        let err = check_schema(&file).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to compile JSON Schema `schema.json`"),
            "Unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_load_schema_rejects_invalid_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.json"), r#"{"type": 5}"#).unwrap();
        let err = load_schema(PathBuf::from("schema.json"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err.get_details(), ErrorDetails::JsonSchema { .. }));
    }

    #[tokio::test]
    async fn test_load_schema_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let contents = r#"{"type": "object"}"#;
        std::fs::write(dir.path().join("schema.json"), contents).unwrap();
        let file = load_schema(PathBuf::from("schema.json"), dir.path())
            .await
            .unwrap();
        assert_eq!(file.contents, contents);
        assert_eq!(file.path, PathBuf::from("schema.json"));
    }
}
