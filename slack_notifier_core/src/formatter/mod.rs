/*!
 * Message formatter: turns a captured exception and its surroundings into
 * a Slack payload.
 *
 * - `fields`: pure field builders (main info, command, scope, parameter bags)
 * - `trace`: stack frames, call arguments
 * - `source`: code excerpts and display paths
 *
 * `SlackFormatter` composes these into attachments in a fixed order:
 *
 * 1. main info (always)
 * 2. full trace
 * 3. command options, command arguments
 * 4. scope variables
 * 5. request GET, POST, attributes, headers, cookies, server, session
 *    (each behind its own `formatter.include*` switch)
 *
 * Attachments without fields are dropped, unless they were given an empty
 * label, in which case they carry a single `Empty` field instead.
 */

pub mod fields;
pub mod source;
pub mod trace;

use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{Config, FormatterConfig};
use crate::context::{CommandSnapshot, ExecutionContext, ParameterBag, RequestSnapshot};
use crate::protocol::constants::{
    COLOR_COMMAND, COLOR_DANGER, COLOR_REQUEST_PARAMS, COLOR_SCOPE, COLOR_WARNING,
};
use crate::protocol::exception::CapturedException;
use crate::protocol::types::{Attachment, Field, NotificationPayload};

use fields::{
    bag_fields, command_argument_fields, command_option_fields, context_fields, main_info_fields,
};
use trace::{full_trace_fields, ExcerptPadding};

// ---------------------------------------------------------------------------
// Formatter interface
// ---------------------------------------------------------------------------

/// Everything known about one error at the time it is reported.
#[derive(Debug, Clone, Copy)]
pub struct FormatInput<'a> {
    pub exception: &'a CapturedException,
    pub request: Option<&'a RequestSnapshot>,
    pub command: Option<&'a CommandSnapshot>,
    pub context: Option<&'a ExecutionContext>,
}

impl<'a> FormatInput<'a> {
    pub fn new(exception: &'a CapturedException) -> Self {
        Self {
            exception,
            request: None,
            command: None,
            context: None,
        }
    }

    pub fn with_request(mut self, request: Option<&'a RequestSnapshot>) -> Self {
        self.request = request;
        self
    }

    pub fn with_command(mut self, command: Option<&'a CommandSnapshot>) -> Self {
        self.command = command;
        self
    }

    pub fn with_context(mut self, context: Option<&'a ExecutionContext>) -> Self {
        self.context = context;
        self
    }
}

pub trait ExceptionFormatter: Send + Sync {
    fn format_exception(&self, input: &FormatInput<'_>) -> NotificationPayload;
}

// ---------------------------------------------------------------------------
// SlackFormatter
// ---------------------------------------------------------------------------

pub struct SlackFormatter {
    channel_target: String,
    username: String,
    environment: String,
    root_dir: Option<PathBuf>,
    settings: FormatterConfig,
    clock: Arc<dyn Clock>,
}

impl SlackFormatter {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            channel_target: config.channel_target(),
            username: config.username.clone(),
            environment: config.environment.clone(),
            root_dir: config.root_dir.clone(),
            settings: config.formatter.clone(),
            clock,
        }
    }

    /// `[{host}] Error {status}: {class}`, `[{command}] ...` or `Error ...`.
    pub fn summary(input: &FormatInput<'_>) -> String {
        let exception = input.exception;
        let headline = format!(
            "Error {}: {}",
            exception.status_code(),
            exception.short_class_name()
        );

        match (input.request, input.command) {
            (Some(request), _) => format!("[{}] {headline}", request.host),
            (None, Some(command)) => format!("[{}] {headline}", command.name),
            (None, None) => headline,
        }
    }

    fn request_attachments(&self, request: &RequestSnapshot, timestamp: u64) -> Vec<Attachment> {
        let s = &self.settings;
        let sections: [(bool, &str, Option<&str>, &ParameterBag, &str); 7] = [
            (s.include_get_parameters, "Request GET parameters", Some(COLOR_REQUEST_PARAMS), &request.query, "No GET parameters"),
            (s.include_post_parameters, "Request POST parameters", Some(COLOR_REQUEST_PARAMS), &request.post, "No POST parameters"),
            (s.include_request_attributes, "Request Attributes", None, &request.attributes, "No request attributes"),
            (s.include_request_headers, "Request headers", None, &request.headers, "No request headers"),
            (s.include_request_cookies, "Request cookies", None, &request.cookies, "No request cookies"),
            (s.include_server_parameters, "Server parameters", None, &request.server, "No server parameters"),
            (s.include_session_attributes, "Session parameters", None, &request.session, "No session attributes"),
        ];

        sections
            .into_iter()
            .filter(|(enabled, ..)| *enabled)
            .filter_map(|(_, title, color, bag, empty_label)| {
                build_attachment(title, None, color, bag_fields(bag), Some(empty_label), timestamp)
            })
            .collect()
    }
}

impl ExceptionFormatter for SlackFormatter {
    fn format_exception(&self, input: &FormatInput<'_>) -> NotificationPayload {
        let timestamp = self.clock.now();
        let exception = input.exception;
        let padding = ExcerptPadding {
            first: self.settings.first_class_lines_before_after,
            following: self.settings.following_class_lines_before_after,
        };

        let mut attachments = Vec::new();

        attachments.extend(build_attachment(
            &exception.class_name,
            Some(exception.short_class_name().to_string()),
            Some(COLOR_DANGER),
            main_info_fields(exception, &self.environment, input.request, input.command),
            None,
            timestamp,
        ));

        attachments.extend(build_attachment(
            "Exception full trace",
            Some("Full trace".to_string()),
            Some(COLOR_WARNING),
            full_trace_fields(exception, padding, self.root_dir.as_deref()),
            None,
            timestamp,
        ));

        if let Some(command) = input.command {
            attachments.extend(build_attachment(
                "Command options",
                None,
                Some(COLOR_COMMAND),
                command_option_fields(command),
                None,
                timestamp,
            ));
            attachments.extend(build_attachment(
                "Command arguments",
                None,
                Some(COLOR_COMMAND),
                command_argument_fields(command),
                None,
                timestamp,
            ));
        }

        if let Some(context) = input.context {
            attachments.extend(build_attachment(
                "Scope variables",
                None,
                Some(COLOR_SCOPE),
                context_fields(context),
                None,
                timestamp,
            ));
        }

        if let Some(request) = input.request {
            attachments.extend(self.request_attachments(request, timestamp));
        }

        NotificationPayload {
            channel_target: self.channel_target.clone(),
            summary_text: Self::summary(input),
            username: Some(self.username.clone()),
            attachments,
        }
    }
}

/**
 * Wraps fields into an attachment.
 *
 * With no fields, returns `None`, or an attachment holding a single
 * `Empty: _{label}_` field when an empty label is given.
 */
fn build_attachment(
    title: &str,
    fallback: Option<String>,
    color: Option<&str>,
    mut fields: Vec<Field>,
    empty_label: Option<&str>,
    timestamp: u64,
) -> Option<Attachment> {
    if fields.is_empty() {
        match empty_label {
            Some(label) if !label.is_empty() => fields.push(Field::long("Empty", format!("_{label}_"))),
            _ => return None,
        }
    }
    Some(Attachment::new(title, fallback, color, fields, timestamp))
}
