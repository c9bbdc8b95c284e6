/**
 * Notifier-wide constants.
 *
 * These values end up in every outgoing Slack message and describe how the
 * webhook is reached and what it answers on success.
 */

/// Default base URL of Slack incoming webhooks. The configured token is
/// appended as the last path segment.
pub const DEFAULT_WEBHOOK_URL: &str = "https://hooks.slack.com/services";

/// Literal body Slack returns for an accepted message.
pub const WEBHOOK_ACK: &str = "ok";

/// Footer line of every attachment.
pub const ATTACHMENT_FOOTER: &str = "Slack error notifier";

/// Bot username used when none is configured.
pub const DEFAULT_USERNAME: &str = "Slack error notifier";

/// Which message parts Slack renders as markdown.
pub const MRKDWN_IN: [&str; 3] = ["text", "pretext", "fields"];

/// Notifier version string, derived from the core package version.
pub const NOTIFIER_VERSION: &str = concat!("slack-notifier-rust/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Attachment colors
// ---------------------------------------------------------------------------

pub const COLOR_DANGER: &str = "danger";
pub const COLOR_WARNING: &str = "warning";
pub const COLOR_COMMAND: &str = "#439FE0";
pub const COLOR_SCOPE: &str = "#D343E0";
pub const COLOR_REQUEST_PARAMS: &str = "#E08443";
