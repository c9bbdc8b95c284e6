/*!
 * Error types of the notification pipeline.
 *
 * - [`ConfigError`] - configuration that cannot be loaded or fails validation
 * - [`DeliveryError`] - a payload that did not reach Slack
 *
 * Neither ever escapes the orchestrator's event entry points: configuration
 * errors surface at construction time, delivery errors are logged and
 * returned as part of the notification outcome.
 */

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option is absent or empty.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// An option has a value that cannot be used.
    #[error("invalid configuration value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request could not be sent or its response could not be read.
    #[error("webhook request failed: {0}")]
    TransportFailure(String),

    /// Slack answered with a status other than 200.
    #[error("webhook responded with HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Slack answered 200 without the `ok` acknowledgement.
    #[error("webhook did not acknowledge the message, got: {0}")]
    UnexpectedBody(String),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
