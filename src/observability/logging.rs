//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "VERCAT_LOG";

/// Default filter when neither configuration nor environment sets one.
pub const DEFAULT_FILTER: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name. Unknown names fall back to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Log file; standard error when `None`.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Resolves settings against the environment.
    ///
    /// The filter comes from `VERCAT_LOG`, then `RUST_LOG`, then the
    /// configured level, then [`DEFAULT_FILTER`].
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    /// Resolves settings, reading environment variables through `lookup`.
    #[must_use]
    pub fn resolve(settings: &LoggingSettings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let directive = lookup(LOG_ENV)
            .or_else(|| lookup("RUST_LOG"))
            .or_else(|| settings.level.clone())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let filter =
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        Self {
            filter,
            format: settings
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or_default(),
            file: settings.file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_env_filter_wins_over_settings() {
        let settings = LoggingSettings {
            level: Some("error".to_string()),
            format: Some("json".to_string()),
            file: None,
        };
        let config = LoggingConfig::resolve(&settings, |key| {
            (key == LOG_ENV).then(|| "vercat=trace".to_string())
        });
        assert_eq!(config.filter.to_string(), "vercat=trace");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_falls_back_to_settings_then_default() {
        let settings = LoggingSettings {
            level: Some("info".to_string()),
            ..LoggingSettings::default()
        };
        let config = LoggingConfig::resolve(&settings, |_| None);
        assert_eq!(config.filter.to_string(), "info");

        let config = LoggingConfig::resolve(&LoggingSettings::default(), |_| None);
        assert_eq!(config.filter.to_string(), DEFAULT_FILTER);
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
