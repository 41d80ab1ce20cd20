//! CLI argument definitions for `tensorzero-ui-config`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tensorzero_ui_config::config::service::CONFIG_PATH_ENV_VAR;
use tensorzero_ui_config::model::ProviderType;
use tensorzero_ui_config::observability::LogFormat;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to `tensorzero.toml`. Without it, an empty config is used.
    #[arg(long, env = CONFIG_PATH_ENV_VAR)]
    pub config_file: Option<PathBuf>,

    /// Sets the log format used for all logs.
    #[arg(long)]
    #[arg(value_enum)]
    #[clap(default_value_t = LogFormat::default())]
    pub log_format: LogFormat,

    /// Enable debug logs. `RUST_LOG` takes precedence.
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the config, resolving every referenced file, and print a summary.
    Validate,
    /// Print the loaded config as JSON.
    Show,
    /// Print the `[models.<name>]` TOML fragment for a fine-tuned model.
    FineTunedModel {
        /// The provider's name for the fine-tuned model.
        #[arg(long)]
        model_name: String,

        /// The provider that hosts the fine-tuned model (e.g. `openai`).
        #[arg(long)]
        provider_type: ProviderType,

        /// The model name to use in the config. Defaults to `--model-name`.
        #[arg(long)]
        name: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fine_tuned_model() {
        let args = Args::try_parse_from([
            "tensorzero-ui-config",
            "--config-file",
            "config/tensorzero.toml",
            "--log-format",
            "json",
            "fine-tuned-model",
            "--model-name",
            "ft:gpt-4o:my-org::abc",
            "--provider-type",
            "openai",
        ])
        .unwrap();
        assert_eq!(
            args.config_file,
            Some(PathBuf::from("config/tensorzero.toml"))
        );
        assert_eq!(args.log_format, LogFormat::Json);
        let Command::FineTunedModel {
            model_name,
            provider_type,
            name,
        } = args.command
        else {
            panic!("Expected the fine-tuned-model command");
        };
        assert_eq!(model_name, "ft:gpt-4o:my-org::abc");
        assert_eq!(provider_type, ProviderType::OpenAI);
        assert_eq!(name, None);
    }

    #[test]
    fn test_rejects_unknown_provider_type() {
        let err = Args::try_parse_from([
            "tensorzero-ui-config",
            "fine-tuned-model",
            "--model-name",
            "m",
            "--provider-type",
            "not_a_provider",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
