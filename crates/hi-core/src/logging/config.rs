//! Logging configuration.
//!
//! Resolved from, in increasing precedence:
//! - RUST_LOG (coarse: only the most verbose level it names)
//! - HI_LOG, HI_LOG_FORMAT, HI_LOG_TIMESTAMPS
//! - CLI flags (-v, -q, --log-format)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format (default).
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format '{other}' (expected human or jsonl)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level filter, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-frame classifications.
    Trace,
    /// Session lifecycle and gesture start/end.
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Levels that can appear in a RUST_LOG directive, most verbose first.
    const DIRECTIVE_LEVELS: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Most verbose level mentioned anywhere in an env-filter directive.
    fn most_verbose_in(directive: &str) -> Option<LogLevel> {
        let directive = directive.to_ascii_lowercase();
        Self::DIRECTIVE_LEVELS
            .into_iter()
            .find(|level| directive.contains(level.as_str()))
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warning" => Ok(LogLevel::Warn),
            "none" | "quiet" => Ok(LogLevel::Off),
            other => Self::DIRECTIVE_LEVELS
                .into_iter()
                .chain([LogLevel::Off])
                .find(|level| level.as_str() == other)
                .ok_or_else(|| format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Whether human output carries timestamps. JSON lines always do.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment and CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve from an arbitrary variable lookup and CLI overrides.
    ///
    /// Unparseable values are ignored.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let defaults = LogConfig::default();

        let env_level = match lookup("HI_LOG") {
            Some(val) => val.parse().ok(),
            None => lookup("RUST_LOG").as_deref().and_then(LogLevel::most_verbose_in),
        };
        let env_format = lookup("HI_LOG_FORMAT").and_then(|v| v.parse().ok());
        let timestamps = lookup("HI_LOG_TIMESTAMPS")
            .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
            .unwrap_or(defaults.timestamps);

        LogConfig {
            level: cli_level.or(env_level).unwrap_or(defaults.level),
            format: cli_format.or(env_format).unwrap_or(defaults.format),
            timestamps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn resolve(vars: &[(&str, &str)]) -> LogConfig {
        LogConfig::from_lookup(lookup(vars), None, None)
    }

    #[test]
    fn formats_parse_with_aliases() {
        assert_eq!("human".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Jsonl.to_string(), "jsonl");
    }

    #[test]
    fn levels_parse_with_aliases() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("quiet".parse::<LogLevel>(), Ok(LogLevel::Off));
        assert_eq!("TRACE".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("loud".parse::<LogLevel>().is_err());
        assert!(LogLevel::Trace < LogLevel::Error);
    }

    #[test]
    fn hi_log_wins_over_rust_log() {
        let config = resolve(&[("HI_LOG", "error"), ("RUST_LOG", "trace")]);
        assert_eq!(config.level, LogLevel::Error);
    }

    #[test]
    fn rust_log_picks_most_verbose_mention() {
        let config = resolve(&[("RUST_LOG", "hi_model=warn,hi_core=debug")]);
        assert_eq!(config.level, LogLevel::Debug);
    }

    #[test]
    fn cli_overrides_environment() {
        let config = LogConfig::from_lookup(
            lookup(&[("HI_LOG", "trace"), ("HI_LOG_FORMAT", "json")]),
            Some(LogLevel::Warn),
            Some(LogFormat::Human),
        );
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Human);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = resolve(&[("HI_LOG", "chatty"), ("HI_LOG_FORMAT", "yaml")]);
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn timestamps_can_be_disabled() {
        assert!(!resolve(&[("HI_LOG_TIMESTAMPS", "0")]).timestamps);
        assert!(resolve(&[("HI_LOG_TIMESTAMPS", "1")]).timestamps);
    }
}
