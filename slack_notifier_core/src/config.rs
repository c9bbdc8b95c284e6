/*!
 * Notifier configuration.
 *
 * Loaded from TOML. Option names are kept exactly as operators know them
 * (`handle404`, `handleHTTPcodes`, `ignoredIPs`, ...):
 *
 * ```toml
 * channel = "errors"
 * webhookToken = "T000/B000/XXXX"
 * handle404 = true
 * handleHTTPcodes = [403]
 * repeatTimeout = 60
 * ignoredAgentsPattern = "(Googlebot|bingbot)"
 *
 * [formatter]
 * firstClassLinesBeforeAfter = 5
 * includeRequestHeaders = true
 * ```
 *
 * | option | default |
 * |--------|---------|
 * | `channel`, `webhookToken` | required |
 * | `repeatTimeout` | `false` (dedup disabled) |
 * | `handle404`, `handlePHPWarnings`, `handlePHPErrors`, `handleSilentErrors` | `false` |
 * | `environment` | `"prod"` |
 * | `cacheDir` | `<tmp>/slack-error-notifier` |
 * | `webhookUrl` | `https://hooks.slack.com/services` |
 */

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{de::Error as _, Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::protocol::constants::{DEFAULT_USERNAME, DEFAULT_WEBHOOK_URL};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Destination channel, without the leading `#`.
    pub channel: String,

    #[serde(alias = "token")]
    pub webhook_token: String,

    #[serde(rename = "handle404")]
    pub handle_404: bool,

    /// Extra HTTP status codes worth reporting besides 500 (and 404).
    #[serde(rename = "handleHTTPcodes")]
    pub handle_http_codes: Vec<u16>,

    /// Dedup cooldown in seconds; `None` sends every occurrence.
    #[serde(deserialize_with = "deserialize_repeat_timeout")]
    pub repeat_timeout: Option<u64>,

    #[serde(rename = "handlePHPWarnings")]
    pub handle_php_warnings: bool,

    #[serde(rename = "handlePHPErrors")]
    pub handle_php_errors: bool,

    pub handle_silent_errors: bool,

    pub ignored_classes: Vec<String>,
    pub ignored_php_errors: Vec<String>,

    #[serde(rename = "ignoredIPs")]
    pub ignored_ips: Vec<String>,

    /// Regular expression matched against the User-Agent header. Empty disables it.
    pub ignored_agents_pattern: String,

    /// Regular expression matched against the request URI. Empty disables it.
    pub ignored_urls_pattern: String,

    pub formatter: FormatterConfig,

    pub environment: String,
    pub root_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub username: String,
    pub webhook_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: String::new(),
            webhook_token: String::new(),
            handle_404: false,
            handle_http_codes: Vec::new(),
            repeat_timeout: None,
            handle_php_warnings: false,
            handle_php_errors: false,
            handle_silent_errors: false,
            ignored_classes: Vec::new(),
            ignored_php_errors: Vec::new(),
            ignored_ips: Vec::new(),
            ignored_agents_pattern: String::new(),
            ignored_urls_pattern: String::new(),
            formatter: FormatterConfig::default(),
            environment: "prod".to_string(),
            root_dir: None,
            cache_dir: std::env::temp_dir().join("slack-error-notifier"),
            username: DEFAULT_USERNAME.to_string(),
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
        }
    }
}

/// Per-section switches and excerpt sizes of the message formatter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatterConfig {
    /// Lines of source shown around the first frame that has a location.
    pub first_class_lines_before_after: usize,
    /// Lines of source shown around every later frame.
    pub following_class_lines_before_after: usize,
    pub include_get_parameters: bool,
    pub include_post_parameters: bool,
    pub include_request_attributes: bool,
    pub include_request_cookies: bool,
    pub include_request_headers: bool,
    pub include_server_parameters: bool,
    pub include_session_attributes: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            first_class_lines_before_after: 3,
            following_class_lines_before_after: 0,
            include_get_parameters: true,
            include_post_parameters: true,
            include_request_attributes: true,
            include_request_cookies: true,
            include_request_headers: false,
            include_server_parameters: false,
            include_session_attributes: true,
        }
    }
}

impl Config {
    /// Minimal configuration with defaults for everything but the destination.
    pub fn new(channel: impl Into<String>, webhook_token: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            webhook_token: webhook_token.into(),
            ..Default::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /**
     * Checks the invariants the pipeline relies on.
     *
     * - `channel` and `webhookToken` are present and non-empty
     * - both ignore patterns, when set, are valid regular expressions
     * - `webhookUrl` is not empty
     */
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.trim().trim_start_matches('#').is_empty() {
            return Err(ConfigError::Missing("channel"));
        }
        if self.webhook_token.trim().is_empty() {
            return Err(ConfigError::Missing("webhookToken"));
        }
        if self.webhook_url.trim().is_empty() {
            return Err(ConfigError::Missing("webhookUrl"));
        }
        compile_pattern("ignoredAgentsPattern", &self.ignored_agents_pattern)?;
        compile_pattern("ignoredUrlsPattern", &self.ignored_urls_pattern)?;
        Ok(())
    }

    /// Channel as Slack expects it, with exactly one leading `#`.
    pub fn channel_target(&self) -> String {
        format!("#{}", self.channel.trim().trim_start_matches('#'))
    }

    /// Full webhook endpoint: `{webhookUrl}/{webhookToken}`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.webhook_url.trim_end_matches('/'),
            self.webhook_token.trim().trim_start_matches('/')
        )
    }

    /// Whether runtime errors need to be captured at all.
    pub fn captures_runtime_errors(&self) -> bool {
        self.handle_php_errors || self.handle_php_warnings
    }

    /// Directory holding one dedup entry per fingerprint.
    pub fn errors_dir(&self) -> PathBuf {
        self.cache_dir.join("errors")
    }
}

/// Compiles an ignore pattern; an empty pattern means "no pattern".
pub(crate) fn compile_pattern(key: &'static str, pattern: &str) -> Result<Option<Regex>, ConfigError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RepeatTimeoutRepr {
    Flag(bool),
    Seconds(i64),
}

fn deserialize_repeat_timeout<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match RepeatTimeoutRepr::deserialize(deserializer)? {
        RepeatTimeoutRepr::Flag(false) | RepeatTimeoutRepr::Seconds(0) => Ok(None),
        RepeatTimeoutRepr::Seconds(seconds) if seconds > 0 => Ok(Some(seconds as u64)),
        RepeatTimeoutRepr::Flag(true) | RepeatTimeoutRepr::Seconds(_) => Err(D::Error::custom(
            "repeatTimeout must be false or a positive number of seconds",
        )),
    }
}
