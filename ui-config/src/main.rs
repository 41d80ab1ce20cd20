use std::process::ExitCode;

use clap::Parser;
use tensorzero_ui_config::config::Config;
use tensorzero_ui_config::config::service::ConfigService;
use tensorzero_ui_config::error::{Error, ErrorDetails};
use tensorzero_ui_config::fine_tuning::get_fine_tuned_provider_config;
use tensorzero_ui_config::observability;
use tensorzero_ui_config::toml_writer::dump_provider_config;

use crate::cli::{Args, Command};

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = observability::setup_logs(args.debug, args.log_format) {
        print_setup_error(&e);
        return ExitCode::FAILURE;
    }
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        // The error was already logged when it was constructed
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(args: Args) -> Result<(), Error> {
    match args.command {
        Command::Validate => {
            let service = ConfigService::new(args.config_file);
            let config = service.get().await?;
            print_output(&summary(&config));
        }
        Command::Show => {
            let service = ConfigService::new(args.config_file);
            let config = service.get().await?;
            let json = serde_json::to_string_pretty(config.as_ref()).map_err(|e| {
                Error::new(ErrorDetails::Serialization {
                    message: format!("Failed to serialize config to JSON: {e}"),
                })
            })?;
            print_output(&json);
        }
        Command::FineTunedModel {
            model_name,
            provider_type,
            name,
        } => {
            let provider = get_fine_tuned_provider_config(&model_name, provider_type)?;
            let name = name.unwrap_or(model_name);
            print_output(&dump_provider_config(&name, &provider)?);
        }
    }
    Ok(())
}

fn summary(config: &Config) -> String {
    let source = match &config.config_path {
        Some(path) => format!("Config `{}` is valid", path.display()),
        None => "No config file provided; using the empty config".to_string(),
    };
    format!(
        "{source}: {} functions, {} models, {} embedding models, {} metrics, {} tools, {} evaluations",
        config.functions.len(),
        config.models.len(),
        config.embedding_models.len(),
        config.metrics.len(),
        config.tools.len(),
        config.evaluations.len(),
    )
}

#[expect(clippy::print_stdout)]
fn print_output(output: &str) {
    println!("{output}");
}

#[expect(clippy::print_stderr)]
fn print_setup_error(error: &Error) {
    eprintln!("Failed to set up logs: {error}");
}
