use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

#[derive(Clone, Debug, PartialEq)]
// As long as the struct member is private, we force people to use the `new` method and log the error.
pub struct Error(ErrorDetails);

impl Error {
    pub fn new(details: ErrorDetails) -> Self {
        details.log();
        Error(details)
    }

    pub fn new_without_logging(details: ErrorDetails) -> Self {
        Error(details)
    }

    pub fn status_code(&self) -> StatusCode {
        self.0.status_code()
    }

    pub fn get_details(&self) -> &ErrorDetails {
        &self.0
    }

    pub fn get_owned_details(self) -> ErrorDetails {
        self.0
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<ErrorDetails> for Error {
    fn from(details: ErrorDetails) -> Self {
        Error::new(details)
    }
}

/// A single violation found while validating the raw config.
/// `path` is the dotted TOML path of the offending field (e.g. `functions.f.variants.v.model`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorDetails {
    Config {
        message: String,
    },
    FileRead {
        message: String,
        file_path: String,
    },
    JsonSchema {
        message: String,
    },
    Observability {
        message: String,
    },
    Serialization {
        message: String,
    },
    TomlParse {
        message: String,
    },
    UnknownEvaluation {
        name: String,
    },
    UnknownFunction {
        name: String,
    },
    UnknownMetric {
        name: String,
    },
    UnknownModel {
        name: String,
    },
    UnknownTool {
        name: String,
    },
    UnknownVariant {
        name: String,
    },
    UnsupportedProvider {
        provider_type: String,
    },
    Validation {
        errors: Vec<FieldError>,
    },
}

impl ErrorDetails {
    /// Defines the error level for logging this error
    fn level(&self) -> tracing::Level {
        match self {
            ErrorDetails::Config { .. } => tracing::Level::ERROR,
            ErrorDetails::FileRead { .. } => tracing::Level::ERROR,
            ErrorDetails::JsonSchema { .. } => tracing::Level::ERROR,
            ErrorDetails::Observability { .. } => tracing::Level::ERROR,
            ErrorDetails::Serialization { .. } => tracing::Level::ERROR,
            ErrorDetails::TomlParse { .. } => tracing::Level::ERROR,
            ErrorDetails::UnknownEvaluation { .. } => tracing::Level::WARN,
            ErrorDetails::UnknownFunction { .. } => tracing::Level::WARN,
            ErrorDetails::UnknownMetric { .. } => tracing::Level::WARN,
            ErrorDetails::UnknownModel { .. } => tracing::Level::WARN,
            ErrorDetails::UnknownTool { .. } => tracing::Level::WARN,
            ErrorDetails::UnknownVariant { .. } => tracing::Level::WARN,
            ErrorDetails::UnsupportedProvider { .. } => tracing::Level::WARN,
            ErrorDetails::Validation { .. } => tracing::Level::ERROR,
        }
    }

    /// Defines the HTTP status code for responses involving this error
    fn status_code(&self) -> StatusCode {
        match self {
            ErrorDetails::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::FileRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::JsonSchema { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::Observability { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::TomlParse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetails::UnknownEvaluation { .. } => StatusCode::NOT_FOUND,
            ErrorDetails::UnknownFunction { .. } => StatusCode::NOT_FOUND,
            ErrorDetails::UnknownMetric { .. } => StatusCode::NOT_FOUND,
            ErrorDetails::UnknownModel { .. } => StatusCode::NOT_FOUND,
            ErrorDetails::UnknownTool { .. } => StatusCode::NOT_FOUND,
            ErrorDetails::UnknownVariant { .. } => StatusCode::NOT_FOUND,
            ErrorDetails::UnsupportedProvider { .. } => StatusCode::BAD_REQUEST,
            ErrorDetails::Validation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the error using the `tracing` library
    pub fn log(&self) {
        match self.level() {
            tracing::Level::ERROR => tracing::error!("{self}"),
            tracing::Level::WARN => tracing::warn!("{self}"),
            tracing::Level::INFO => tracing::info!("{self}"),
            tracing::Level::DEBUG => tracing::debug!("{self}"),
            tracing::Level::TRACE => tracing::trace!("{self}"),
        }
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetails::Config { message } => write!(f, "{message}"),
            ErrorDetails::FileRead { message, file_path } => {
                write!(f, "Error reading file `{file_path}`: {message}")
            }
            ErrorDetails::JsonSchema { message } => write!(f, "{message}"),
            ErrorDetails::Observability { message } => write!(f, "{message}"),
            ErrorDetails::Serialization { message } => write!(f, "{message}"),
            ErrorDetails::TomlParse { message } => {
                write!(f, "Failed to parse config file as valid TOML: {message}")
            }
            ErrorDetails::UnknownEvaluation { name } => write!(f, "Unknown evaluation: {name}"),
            ErrorDetails::UnknownFunction { name } => write!(f, "Unknown function: {name}"),
            ErrorDetails::UnknownMetric { name } => write!(f, "Unknown metric: {name}"),
            ErrorDetails::UnknownModel { name } => write!(f, "Unknown model: {name}"),
            ErrorDetails::UnknownTool { name } => write!(f, "Unknown tool: {name}"),
            ErrorDetails::UnknownVariant { name } => write!(f, "Unknown variant: {name}"),
            ErrorDetails::UnsupportedProvider { provider_type } => write!(
                f,
                "Provider type `{provider_type}` requires additional configuration and cannot be generated from a model name"
            ),
            ErrorDetails::Validation { errors } => {
                write!(f, "Invalid config ({} error", errors.len())?;
                if errors.len() != 1 {
                    write!(f, "s")?;
                }
                write!(f, "):")?;
                for error in errors {
                    write!(f, "\n  - {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    /// Log the error and convert it into an Axum response
    fn into_response(self) -> Response {
        let mut body = json!({"error": self.to_string()});
        if let ErrorDetails::Validation { errors } = self.get_details() {
            body["validation_errors"] = json!(errors);
        }
        (self.status_code(), Json(body)).into_response()
    }
}
