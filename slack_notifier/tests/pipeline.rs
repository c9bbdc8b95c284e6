/*!
 * End-to-end scenarios: host events in, Slack payloads out.
 */

use std::sync::{Arc, Mutex};

use slack_notifier::{
    CapturedException, Clock, CommandSnapshot, Config, Deliver, DeliveryError, ErrorSignal, IgnoreReason,
    Listener, ManualClock, NotificationPayload, NotifyOutcome, RequestSnapshot, Severity,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const START: u64 = 1_700_000_000;

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<NotificationPayload>>>);

impl Recorder {
    fn sent(&self) -> Vec<NotificationPayload> {
        self.0.lock().unwrap().clone()
    }
}

impl Deliver for Recorder {
    fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        self.0.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

struct Setup {
    listener: Listener,
    recorder: Recorder,
    clock: Arc<ManualClock>,
    _cache: tempfile::TempDir,
}

fn setup(configure: impl FnOnce(&mut Config)) -> Setup {
    let cache = tempfile::tempdir().unwrap();
    let mut config = Config::new("errors", "T0/B0/X0");
    config.cache_dir = cache.path().to_path_buf();
    configure(&mut config);

    let recorder = Recorder::default();
    let clock = Arc::new(ManualClock::at(START));
    let shared: Arc<dyn Clock> = clock.clone();
    let listener = Listener::with_transport(&config, Box::new(recorder.clone()), shared).unwrap();

    Setup {
        listener,
        recorder,
        clock,
        _cache: cache,
    }
}

fn db_down() -> CapturedException {
    CapturedException::new("RuntimeException", "DB down").at("/app/src/Service.php", 42)
}

fn request() -> RequestSnapshot {
    RequestSnapshot::new("shop.example.com", "https://shop.example.com/checkout", "203.0.113.9")
        .with_user_agent("Mozilla/5.0")
}

#[test]
fn db_down_without_scope() {
    let s = setup(|_| {});
    assert!(s.listener.on_unhandled_exception(&db_down(), None).is_delivered());

    let sent = s.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].summary_text, "Error 500: RuntimeException");
    assert_eq!(sent[0].channel_target, "#errors");

    let main = &sent[0].attachments[0];
    assert_eq!(main.field_value("Message"), Some("DB down"));
    assert!(main.field_value("File").unwrap().ends_with("/Service.php"));
    assert_eq!(main.field_value("Line"), Some("42"));
}

#[test]
fn repeat_within_timeout_sends_once() {
    let s = setup(|c| c.repeat_timeout = Some(60));

    assert!(s.listener.on_unhandled_exception(&db_down(), None).is_delivered());
    s.clock.advance(30);
    assert!(matches!(
        s.listener.on_unhandled_exception(&db_down(), None),
        NotifyOutcome::Suppressed
    ));
    assert_eq!(s.recorder.sent().len(), 1);

    s.clock.advance(31);
    assert!(s.listener.on_unhandled_exception(&db_down(), None).is_delivered());
    assert_eq!(s.recorder.sent().len(), 2);
}

#[test]
fn dedup_survives_listener_restart() {
    let cache = tempfile::tempdir().unwrap();
    let make = || {
        let mut config = Config::new("errors", "T0/B0/X0");
        config.cache_dir = cache.path().to_path_buf();
        config.repeat_timeout = Some(60);
        let recorder = Recorder::default();
        let listener =
            Listener::with_transport(&config, Box::new(recorder.clone()), Arc::new(ManualClock::at(START)))
                .unwrap();
        (listener, recorder)
    };

    let (first, _) = make();
    assert!(first.on_unhandled_exception(&db_down(), None).is_delivered());

    let (second, recorder) = make();
    assert!(matches!(
        second.on_unhandled_exception(&db_down(), None),
        NotifyOutcome::Suppressed
    ));
    assert!(recorder.sent().is_empty());
}

#[test]
fn http_status_routing() {
    let cases = [
        (500, false, vec![], true),
        (404, false, vec![], false),
        (404, true, vec![], true),
        (403, false, vec![], false),
        (403, false, vec![403], true),
    ];

    for (status, handle_404, codes, expected) in cases {
        let s = setup(|c| {
            c.handle_404 = handle_404;
            c.handle_http_codes = codes.clone();
        });
        let exception = CapturedException::http("HttpException", status, "http error");
        let outcome = s.listener.on_unhandled_exception(&exception, Some(&request()));

        assert_eq!(
            outcome.is_delivered(),
            expected,
            "status {status}, handle404 {handle_404}, codes {codes:?}"
        );
    }
}

#[test]
fn ignored_ip_is_never_formatted() {
    let s = setup(|c| c.ignored_ips = vec!["203.0.113.9".into()]);
    let exception = CapturedException::http("HttpException", 500, "boom");

    let outcome = s.listener.on_unhandled_exception(&exception, Some(&request()));
    assert!(matches!(outcome, NotifyOutcome::Ignored(IgnoreReason::ClientIp(_))));
    assert!(s.recorder.sent().is_empty());
}

#[test]
fn request_payload_sections() {
    let s = setup(|_| {});
    let mut request = request();
    request.query.insert("step".into(), "2".into());
    request.cookies.insert("PHPSESSID".into(), "abc".into());

    s.listener.on_unhandled_exception(&db_down(), Some(&request));
    let payload = &s.recorder.sent()[0];

    assert_eq!(payload.summary_text, "[shop.example.com] Error 500: RuntimeException");
    assert_eq!(
        payload.attachment("Request GET parameters").unwrap().field_value("step"),
        Some("2")
    );
    assert_eq!(
        payload.attachment("Request cookies").unwrap().field_value("PHPSESSID"),
        Some("abc")
    );
    assert!(payload.attachment("Request headers").is_none());
}

#[test]
fn console_exception_and_ignored_class() {
    let s = setup(|c| c.ignored_classes = vec!["App\\Exception\\Retryable".into()]);
    let command = CommandSnapshot::new("app:import").option("force", "true");

    assert!(s.listener.on_console_exception(&db_down(), &command).is_delivered());
    let retryable = CapturedException::new("App\\Exception\\Retryable", "later");
    assert!(matches!(
        s.listener.on_console_exception(&retryable, &command),
        NotifyOutcome::Ignored(IgnoreReason::IgnoredClass(_))
    ));

    let sent = s.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].summary_text, "[app:import] Error 500: RuntimeException");
    assert_eq!(
        sent[0].attachment("Command options").unwrap().field_value("Option force"),
        Some("true")
    );
}

#[test]
fn runtime_warning_inside_request() {
    let s = setup(|c| c.handle_php_warnings = true);
    s.listener.on_request_start(request());

    let notice = ErrorSignal::new(Severity::Notice, "Undefined variable: total", "/app/src/Cart.php", 7);
    assert!(!s.listener.handle_runtime_error(&notice));

    let sent = s.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].summary_text, "[shop.example.com] Error 500: ErrorException");
    assert_eq!(
        sent[0].attachments[0].field_value("Message"),
        Some("Notice: Undefined variable: total in /app/src/Cart.php line 7")
    );
}

#[test]
fn warnings_dropped_when_disabled() {
    let s = setup(|c| c.handle_php_errors = true);
    s.listener.on_request_start(request());

    for severity in Severity::WARNING_CLASS {
        s.listener
            .handle_runtime_error(&ErrorSignal::new(severity, "deprecated call", "/app/a.php", 1));
    }
    assert!(s.recorder.sent().is_empty());
}

#[test]
fn fatal_error_at_shutdown() {
    let s = setup(|c| c.handle_php_errors = true);
    s.listener.on_command_start(CommandSnapshot::new("app:report"));

    s.listener.handle_shutdown(Some(&ErrorSignal::new(
        Severity::Error,
        "Allowed memory size exhausted",
        "/app/src/Report.php",
        88,
    )));

    let sent = s.recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachments[0].field_value("Code"), Some("1"));
    assert_eq!(sent[0].summary_text, "[app:report] Error 500: ErrorException");
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T0/B0/X0"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server_error"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let mut config = Config::new("errors", "T0/B0/X0");
    config.cache_dir = cache.path().to_path_buf();
    config.webhook_url = format!("{}/services", server.uri());

    let listener = Listener::from_config(&config).unwrap();
    let outcome = tokio::task::spawn_blocking(move || listener.on_unhandled_exception(&db_down(), None))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        NotifyOutcome::Failed(DeliveryError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_receives_slack_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let cache = tempfile::tempdir().unwrap();
    let mut config = Config::new("#errors", "T0/B0/X0");
    config.cache_dir = cache.path().to_path_buf();
    config.webhook_url = server.uri();

    let listener = Listener::from_config(&config).unwrap();
    let outcome = tokio::task::spawn_blocking(move || listener.on_unhandled_exception(&db_down(), None))
        .await
        .unwrap();
    assert!(outcome.is_delivered());

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["channel"], "#errors");
    assert_eq!(body["text"], "Error 500: RuntimeException");
    assert_eq!(body["username"], "Slack error notifier");
    assert_eq!(body["attachments"][0]["title"], "RuntimeException");
    assert_eq!(body["attachments"][0]["color"], "danger");
    assert_eq!(body["attachments"][0]["mrkdwn_in"], serde_json::json!(["text", "pretext", "fields"]));
}
