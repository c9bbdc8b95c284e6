/**
 * The notification orchestrator.
 *
 * One pass per captured error, no retries:
 *
 * ```text
 * captured ─► ignore rules ─► dedup gate ─► formatter ─► transport
 *                  │               │                         │
 *               Ignored        Suppressed            Delivered / Failed
 * ```
 *
 * Entry points never panic and never return an error: every way out is a
 * `NotifyOutcome`, with failures already logged by the time it is returned.
 */
use std::sync::Arc;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::context::{CommandSnapshot, ExecutionContext, RequestSnapshot};
use crate::dedup::{DedupGate, FileDedupStore};
use crate::error::{ConfigError, DeliveryError};
use crate::formatter::{ExceptionFormatter, FormatInput, SlackFormatter};
use crate::protocol::exception::CapturedException;
use crate::rules::{IgnoreReason, IgnoreRules};
use crate::transport::{Deliver, WebhookTransport};

/// How a single notify call ended.
#[derive(Debug)]
pub enum NotifyOutcome {
    Delivered,
    Ignored(IgnoreReason),
    /// Same error already reported within the cooldown window.
    Suppressed,
    Failed(DeliveryError),
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered)
    }
}

/// Where a runtime error was raised.
#[derive(Debug, Clone, Copy, Default)]
pub enum Scope<'a> {
    Request(&'a RequestSnapshot),
    Command(&'a CommandSnapshot),
    #[default]
    Detached,
}

impl<'a> Scope<'a> {
    fn request(self) -> Option<&'a RequestSnapshot> {
        match self {
            Scope::Request(request) => Some(request),
            _ => None,
        }
    }

    fn command(self) -> Option<&'a CommandSnapshot> {
        match self {
            Scope::Command(command) => Some(command),
            _ => None,
        }
    }
}

pub struct Notifier {
    rules: IgnoreRules,
    gate: DedupGate,
    formatter: Box<dyn ExceptionFormatter>,
    transport: Box<dyn Deliver>,
}

impl Notifier {
    /**
     * Builds the production pipeline: system clock, file-backed dedup store
     * under `<cacheDir>/errors`, Slack formatter, and the webhook transport.
     */
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let transport = WebhookTransport::new(config.endpoint());
        Self::with_transport(config, Box::new(transport), Arc::new(SystemClock))
    }

    /// Same as `from_config`, with the delivery and time sources supplied.
    pub fn with_transport(
        config: &Config,
        transport: Box<dyn Deliver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let rules = IgnoreRules::from_config(config)?;
        let store = FileDedupStore::new(config.errors_dir());
        let gate = DedupGate::new(Box::new(store), config.repeat_timeout, clock.clone());
        let formatter = SlackFormatter::new(config, clock);

        Ok(Self::new(rules, gate, Box::new(formatter), transport))
    }

    pub fn new(
        rules: IgnoreRules,
        gate: DedupGate,
        formatter: Box<dyn ExceptionFormatter>,
        transport: Box<dyn Deliver>,
    ) -> Self {
        Self {
            rules,
            gate,
            formatter,
            transport,
        }
    }

    /// Unhandled exception escaping a request handler (or raised outside any).
    pub fn notify_exception(
        &self,
        exception: &CapturedException,
        request: Option<&RequestSnapshot>,
    ) -> NotifyOutcome {
        let ignored = self.rules.check_exception(exception, request);
        self.run(FormatInput::new(exception).with_request(request), ignored)
    }

    /// Exception escaping a CLI command.
    pub fn notify_console(&self, exception: &CapturedException, command: &CommandSnapshot) -> NotifyOutcome {
        let ignored = self.rules.check_console(exception);
        self.run(FormatInput::new(exception).with_command(Some(command)), ignored)
    }

    /// Runtime error or panic turned into an exception by the capture adapter.
    pub fn notify_error(
        &self,
        exception: &CapturedException,
        scope: Scope<'_>,
        context: Option<&ExecutionContext>,
    ) -> NotifyOutcome {
        let ignored = self.rules.check_console(exception);
        let input = FormatInput::new(exception)
            .with_request(scope.request())
            .with_command(scope.command())
            .with_context(context);
        self.run(input, ignored)
    }

    fn run(&self, input: FormatInput<'_>, ignored: Option<IgnoreReason>) -> NotifyOutcome {
        let exception = input.exception;

        /* Step 1: ignore rules */
        if let Some(reason) = ignored {
            debug!(class = %exception.class_name, ?reason, "Exception ignored");
            return NotifyOutcome::Ignored(reason);
        }

        /* Step 2: dedup gate */
        if self.gate.should_suppress(exception) {
            return NotifyOutcome::Suppressed;
        }

        /* Step 3: format and deliver */
        let payload = self.formatter.format_exception(&input);
        match self.transport.deliver(&payload) {
            Ok(()) => NotifyOutcome::Delivered,
            Err(err) => NotifyOutcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::protocol::types::NotificationPayload;

    /// Records payloads and answers with a fixed status.
    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<NotificationPayload>>>,
        reject_with: Option<u16>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn last(&self) -> NotificationPayload {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Deliver for Recorder {
        fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(payload.clone());
            match self.reject_with {
                Some(status) => Err(DeliveryError::UnexpectedStatus {
                    status,
                    body: "server_error".into(),
                }),
                None => Ok(()),
            }
        }
    }

    struct CountingFormatter {
        inner: SlackFormatter,
        calls: Arc<AtomicUsize>,
    }

    impl ExceptionFormatter for CountingFormatter {
        fn format_exception(&self, input: &FormatInput<'_>) -> NotificationPayload {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.format_exception(input)
        }
    }

    struct Harness {
        notifier: Notifier,
        recorder: Recorder,
        clock: Arc<ManualClock>,
        format_calls: Arc<AtomicUsize>,
        cache: tempfile::TempDir,
    }

    fn harness(configure: impl FnOnce(&mut Config)) -> Harness {
        harness_with(Recorder::default(), configure)
    }

    fn harness_with(recorder: Recorder, configure: impl FnOnce(&mut Config)) -> Harness {
        let cache = tempfile::tempdir().unwrap();
        let mut config = Config::new("errors", "T0/B0/X0");
        config.cache_dir = cache.path().to_path_buf();
        configure(&mut config);

        let clock = Arc::new(ManualClock::at(1_700_000_000));
        let format_calls = Arc::new(AtomicUsize::new(0));

        let rules = IgnoreRules::from_config(&config).unwrap();
        let gate = DedupGate::new(
            Box::new(FileDedupStore::new(config.errors_dir())),
            config.repeat_timeout,
            clock.clone(),
        );
        let formatter = CountingFormatter {
            inner: SlackFormatter::new(&config, clock.clone()),
            calls: format_calls.clone(),
        };

        Harness {
            notifier: Notifier::new(rules, gate, Box::new(formatter), Box::new(recorder.clone())),
            recorder,
            clock,
            format_calls,
            cache,
        }
    }

    fn db_down() -> CapturedException {
        CapturedException::new("RuntimeException", "DB down").at("/app/src/Service.php", 42)
    }

    fn request() -> RequestSnapshot {
        RequestSnapshot::new("shop.example.com", "https://shop.example.com/cart", "198.51.100.4")
    }

    #[test]
    fn test_plain_exception_is_delivered() {
        let h = harness(|_| {});
        let outcome = h.notifier.notify_exception(&db_down(), None);

        assert!(outcome.is_delivered());
        assert_eq!(h.recorder.count(), 1);
        assert_eq!(h.recorder.last().summary_text, "Error 500: RuntimeException");
    }

    #[test]
    fn test_repeat_within_timeout_is_suppressed() {
        let h = harness(|c| c.repeat_timeout = Some(60));

        assert!(h.notifier.notify_exception(&db_down(), None).is_delivered());
        assert!(matches!(
            h.notifier.notify_exception(&db_down(), None),
            NotifyOutcome::Suppressed
        ));
        assert_eq!(h.recorder.count(), 1);
        assert_eq!(h.format_calls.load(Ordering::SeqCst), 1);

        h.clock.advance(61);
        assert!(h.notifier.notify_exception(&db_down(), None).is_delivered());
        assert_eq!(h.recorder.count(), 2);
    }

    #[test]
    fn test_without_timeout_every_repeat_is_sent() {
        let h = harness(|_| {});
        for _ in 0..3 {
            assert!(h.notifier.notify_exception(&db_down(), None).is_delivered());
        }
        assert_eq!(h.recorder.count(), 3);
    }

    #[test]
    fn test_ignored_ip_never_reaches_formatter() {
        let h = harness(|c| c.ignored_ips = vec!["198.51.100.4".into()]);
        let exception = CapturedException::http("HttpException", 500, "boom");

        let outcome = h.notifier.notify_exception(&exception, Some(&request()));
        assert!(matches!(outcome, NotifyOutcome::Ignored(IgnoreReason::ClientIp(_))));
        assert_eq!(h.format_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.recorder.count(), 0);
    }

    #[test]
    fn test_ignored_request_leaves_no_dedup_entry() {
        let h = harness(|c| {
            c.repeat_timeout = Some(60);
            c.ignored_urls_pattern = "/cart".into();
        });
        let exception = CapturedException::http("HttpException", 500, "boom");

        h.notifier.notify_exception(&exception, Some(&request()));
        let errors_dir = h.cache.path().join("errors");
        assert!(!errors_dir.exists() || std::fs::read_dir(errors_dir).unwrap().next().is_none());
    }

    #[test]
    fn test_http_request_summary_uses_host() {
        let h = harness(|c| c.handle_404 = true);
        let exception = CapturedException::http("Symfony\\NotFoundHttpException", 404, "No route");

        assert!(h.notifier.notify_exception(&exception, Some(&request())).is_delivered());
        assert_eq!(
            h.recorder.last().summary_text,
            "[shop.example.com] Error 404: NotFoundHttpException"
        );
    }

    #[test]
    fn test_console_exception_uses_command() {
        let h = harness(|c| c.ignored_classes = vec!["App\\Harmless".into()]);
        let command = CommandSnapshot::new("app:import").argument("file", "users.csv");

        assert!(h.notifier.notify_console(&db_down(), &command).is_delivered());
        let payload = h.recorder.last();
        assert_eq!(payload.summary_text, "[app:import] Error 500: RuntimeException");
        assert!(payload.attachment("Command arguments").is_some());

        let harmless = CapturedException::new("App\\Harmless", "meh");
        assert!(matches!(
            h.notifier.notify_console(&harmless, &command),
            NotifyOutcome::Ignored(IgnoreReason::IgnoredClass(_))
        ));
    }

    #[test]
    fn test_runtime_error_carries_scope_and_context() {
        let h = harness(|_| {});
        let exception = CapturedException::new("ErrorException", "Warning: boom in /a.php line 3");
        let context = ExecutionContext::new().with("user", "42");
        let request = request();

        let outcome = h
            .notifier
            .notify_error(&exception, Scope::Request(&request), Some(&context));
        assert!(outcome.is_delivered());

        let payload = h.recorder.last();
        assert!(payload.summary_text.starts_with("[shop.example.com]"));
        assert_eq!(
            payload.attachment("Scope variables").unwrap().field_value("user"),
            Some("42")
        );
    }

    #[test]
    fn test_delivery_failure_is_returned_not_raised() {
        let h = harness_with(
            Recorder {
                reject_with: Some(500),
                ..Default::default()
            },
            |_| {},
        );

        let outcome = h.notifier.notify_exception(&db_down(), None);
        assert!(matches!(
            outcome,
            NotifyOutcome::Failed(DeliveryError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[test]
    fn test_with_transport_validates_config() {
        let config = Config::new("", "token");
        let result = Notifier::with_transport(
            &config,
            Box::new(Recorder::default()),
            Arc::new(ManualClock::at(0)),
        );
        assert!(matches!(result, Err(ConfigError::Missing("channel"))));
    }
}
