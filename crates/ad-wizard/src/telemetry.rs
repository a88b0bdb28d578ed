use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Targets the configured level applies to; everything else stays at `warn`.
const WORKFLOW_TARGETS: [&str; 2] = ["ad_wizard", "ad_wizard_cli"];

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log directives '{}'", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Directives used when `RUST_LOG` is unset. A bare level is scoped to the
/// workflow crates; a value naming targets is used verbatim.
pub fn fallback_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let level = if level.is_empty() { "info" } else { level };
    WORKFLOW_TARGETS
        .iter()
        .fold(String::from("warn"), |directives, target| {
            format!("{directives},{target}={level}")
        })
}

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level. Development output keeps colors and targets; test output
/// goes through the test writer; production output is plain text.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = fallback_directives(&config.log_level);
            EnvFilter::try_new(&directives).map_err(|source| TelemetryError::EnvFilter {
                value: directives.clone(),
                source,
            })?
        }
    };

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).compact();
    let installed = match config.environment {
        AppEnvironment::Development => builder.with_target(true).with_ansi(true).try_init(),
        AppEnvironment::Test => builder
            .with_target(false)
            .with_ansi(false)
            .with_test_writer()
            .try_init(),
        AppEnvironment::Production => builder.with_target(true).with_ansi(false).try_init(),
    };
    installed.map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_is_scoped_to_workflow_crates() {
        assert_eq!(
            fallback_directives(" debug "),
            "warn,ad_wizard=debug,ad_wizard_cli=debug"
        );
        assert_eq!(
            fallback_directives(""),
            "warn,ad_wizard=info,ad_wizard_cli=info"
        );
    }

    #[test]
    fn explicit_directives_pass_through() {
        assert_eq!(
            fallback_directives("ad_wizard=trace,tokio=info"),
            "ad_wizard=trace,tokio=info"
        );
    }

    #[test]
    fn fallback_directives_parse() {
        assert!(EnvFilter::try_new(fallback_directives("trace")).is_ok());
        assert!(EnvFilter::try_new(fallback_directives("ad_wizard=debug,warn")).is_ok());
    }
}
