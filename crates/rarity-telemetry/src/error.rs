//! Error types for telemetry operations.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while installing logging or exporting metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log level")]
    InvalidLogLevel {
        /// Level string as configured.
        level: String,
        /// Parser rejection.
        source: tracing_subscriber::filter::ParseError,
    },
    /// Another global subscriber is already installed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector could not be built or registered.
    #[error("failed to set up metric")]
    Metric {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The registry could not be rendered in text exposition format.
    #[error("failed to render metrics")]
    Render {
        /// Underlying encoder failure.
        source: PrometheusError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn messages_are_constant_and_sources_are_kept() {
        let parse = EnvFilter::try_new("rarity=loud").err();
        let cases = [
            parse.map(|source| {
                (
                    TelemetryError::InvalidLogLevel {
                        level: "rarity=loud".to_string(),
                        source,
                    },
                    "invalid log level",
                )
            }),
            Some((
                TelemetryError::Metric {
                    name: "waiters_pending",
                    source: PrometheusError::Msg("duplicate".to_string()),
                },
                "failed to set up metric",
            )),
            Some((
                TelemetryError::Render {
                    source: PrometheusError::Msg("bad utf-8".to_string()),
                },
                "failed to render metrics",
            )),
        ];

        for (err, message) in cases.into_iter().flatten() {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_some());
        }
    }
}
