/**
 * Ignore rules: decide whether a captured exception is worth reporting at
 * all, before any dedup lookup or formatting happens.
 *
 * HTTP exceptions (those carrying a status code) raised while serving a
 * request go through the request filters first, then status routing:
 *
 * 1. client IP in `ignoredIPs`
 * 2. User-Agent matching `ignoredAgentsPattern`
 * 3. URI matching `ignoredUrlsPattern`
 * 4. status is 500, or 404 with `handle404`, or listed in `handleHTTPcodes`
 *
 * Everything else (plain exceptions, runtime errors, console exceptions) is
 * only checked against `ignoredClasses`.
 */
use regex::Regex;

use crate::config::{compile_pattern, Config};
use crate::context::RequestSnapshot;
use crate::error::ConfigError;
use crate::protocol::exception::CapturedException;

/// Why an exception was dropped by the ignore rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    ClientIp(String),
    UserAgent,
    Url,
    /// HTTP status not routed to Slack.
    Status(u16),
    IgnoredClass(String),
}

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    handle_404: bool,
    handle_http_codes: Vec<u16>,
    ignored_classes: Vec<String>,
    ignored_ips: Vec<String>,
    agents_pattern: Option<Regex>,
    urls_pattern: Option<Regex>,
}

impl IgnoreRules {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            handle_404: config.handle_404,
            handle_http_codes: config.handle_http_codes.clone(),
            ignored_classes: config.ignored_classes.clone(),
            ignored_ips: config.ignored_ips.clone(),
            agents_pattern: compile_pattern("ignoredAgentsPattern", &config.ignored_agents_pattern)?,
            urls_pattern: compile_pattern("ignoredUrlsPattern", &config.ignored_urls_pattern)?,
        })
    }

    /**
     * Checks an exception raised while serving `request` (or outside of any
     * request when `None`).
     *
     * Returns the first rule that matched, or `None` when the exception
     * should be reported.
     */
    pub fn check_exception(
        &self,
        exception: &CapturedException,
        request: Option<&RequestSnapshot>,
    ) -> Option<IgnoreReason> {
        match (exception.http_status, request) {
            (Some(status), Some(request)) => self
                .check_request(request)
                .or_else(|| self.check_status(status)),
            (Some(status), None) => self.check_status(status),
            (None, _) => self.check_class(exception),
        }
    }

    /// Console exceptions are filtered by class only.
    pub fn check_console(&self, exception: &CapturedException) -> Option<IgnoreReason> {
        self.check_class(exception)
    }

    fn check_request(&self, request: &RequestSnapshot) -> Option<IgnoreReason> {
        if self.ignored_ips.iter().any(|ip| *ip == request.client_ip) {
            return Some(IgnoreReason::ClientIp(request.client_ip.clone()));
        }

        if let Some(pattern) = &self.agents_pattern {
            let agent = request.user_agent.as_deref().unwrap_or("");
            if pattern.is_match(agent) {
                return Some(IgnoreReason::UserAgent);
            }
        }

        if let Some(pattern) = &self.urls_pattern {
            if pattern.is_match(&request.uri) {
                return Some(IgnoreReason::Url);
            }
        }

        None
    }

    fn check_status(&self, status: u16) -> Option<IgnoreReason> {
        let routed = status == 500
            || (status == 404 && self.handle_404)
            || self.handle_http_codes.contains(&status);

        (!routed).then_some(IgnoreReason::Status(status))
    }

    fn check_class(&self, exception: &CapturedException) -> Option<IgnoreReason> {
        self.ignored_classes
            .iter()
            .any(|class| *class == exception.class_name)
            .then(|| IgnoreReason::IgnoredClass(exception.class_name.clone()))
    }
}
