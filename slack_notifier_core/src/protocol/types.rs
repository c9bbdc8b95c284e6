/**
 * Slack message types.
 *
 * The outermost structure is `NotificationPayload`, POSTed as JSON to the
 * incoming webhook:
 *
 * ```json
 * {
 *   "channel": "#errors",
 *   "text": "[example.com] Error 500: RuntimeException",
 *   "username": "Slack error notifier",
 *   "attachments": [ { "title": "...", "fields": [ ... ], ... } ]
 * }
 * ```
 */
use serde::{Deserialize, Serialize};

use super::constants::{ATTACHMENT_FOOTER, MRKDWN_IN};

// ---------------------------------------------------------------------------
// NotificationPayload
// ---------------------------------------------------------------------------

/**
 * A complete notification, ready to be serialized and delivered.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Destination channel, including the leading `#`.
    #[serde(rename = "channel")]
    pub channel_target: String,

    /// One-line summary shown as the message text.
    #[serde(rename = "text")]
    pub summary_text: String,

    /// Bot username shown as the message author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Attachments in display order.
    pub attachments: Vec<Attachment>,
}

impl NotificationPayload {
    /// Returns the first attachment with the given title.
    pub fn attachment(&self, title: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.title == title)
    }
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/**
 * A titled, colored block of fields.
 *
 * Fields are fixed at construction time; there is no API to push into an
 * existing attachment.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub title: String,

    #[serde(rename = "fallback")]
    pub fallback_text: String,

    /// Left bar color, either a Slack keyword (`danger`) or a hex code.
    #[serde(rename = "color", skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,

    pub pretext: String,
    pub mrkdwn: bool,
    pub mrkdwn_in: Vec<String>,

    fields: Vec<Field>,

    pub footer: String,

    #[serde(rename = "ts")]
    pub timestamp_epoch_seconds: u64,
}

impl Attachment {
    /**
     * Builds an attachment.
     *
     * `fallback` defaults to the title when `None`.
     */
    pub fn new(
        title: impl Into<String>,
        fallback: Option<String>,
        color: Option<&str>,
        fields: Vec<Field>,
        timestamp: u64,
    ) -> Self {
        let title = title.into();
        Self {
            fallback_text: fallback.unwrap_or_else(|| title.clone()),
            title,
            color_tag: color.map(str::to_string),
            pretext: String::new(),
            mrkdwn: true,
            mrkdwn_in: MRKDWN_IN.iter().map(|s| s.to_string()).collect(),
            fields,
            footer: ATTACHMENT_FOOTER.to_string(),
            timestamp_epoch_seconds: timestamp,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the value of the first field with the given title.
    pub fn field_value(&self, title: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub title: String,
    pub value: String,

    /// Short fields are laid out two per row.
    #[serde(rename = "short")]
    pub is_short: bool,
}

impl Field {
    pub fn long(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            is_short: false,
        }
    }

    pub fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            is_short: true,
        }
    }
}
