pub mod config;
pub mod error;
pub mod evaluations;
pub mod fine_tuning;
pub mod function;
pub mod jsonschema_util;
pub mod model;
pub mod observability;
pub mod toml_writer;
pub mod tool;
pub mod variant;
