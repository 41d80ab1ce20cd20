use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, ErrorDetails};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// The filter used when `RUST_LOG` is not set.
fn default_filter(debug: bool) -> String {
    let default_level = if debug { "debug" } else { "info" };
    format!("warn,tensorzero_ui_config={default_level}")
}

/// Set up logs
///
/// Logs are written to stderr so that the CLI can print config output on stdout.
/// `RUST_LOG` takes precedence over the `debug` flag.
pub fn setup_logs(debug: bool, log_format: LogFormat) -> Result<(), Error> {
    let log_level =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());

    let log_layer = match log_format {
        LogFormat::Pretty => Box::new(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            as Box<dyn Layer<_> + Send + Sync>,
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        ),
    };

    tracing_subscriber::registry()
        .with(log_layer.with_filter(log_level))
        .try_init()
        .map_err(|e| {
            Error::new(ErrorDetails::Observability {
                message: format!("Failed to initialize tracing subscriber: {e}"),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "warn,tensorzero_ui_config=info");
        assert_eq!(default_filter(true), "warn,tensorzero_ui_config=debug");
    }

    #[test]
    fn test_log_format_value_enum() {
        assert_eq!(
            LogFormat::from_str("json", true).ok(),
            Some(LogFormat::Json)
        );
        assert_eq!(
            LogFormat::from_str("pretty", true).ok(),
            Some(LogFormat::Pretty)
        );
        assert!(LogFormat::from_str("yaml", true).is_err());
    }
}
