/**
 * Minimal harness for the Slack error notifier.
 *
 * Reads a TOML config (default `notifier.toml`), then replays a request
 * failure, a runtime warning and a console exception. Run with:
 *
 *   cargo run -p slack_notifier_demo -- path/to/notifier.toml
 *   cargo run -p slack_notifier_demo -- path/to/notifier.toml --panic
 *
 * `RUST_LOG=debug` shows ignore and dedup decisions.
 */
use std::process::ExitCode;
use std::sync::Arc;

use slack_notifier::{
    CallType, CapturedException, CommandSnapshot, Config, ErrorSignal, ExecutionContext, Listener,
    RequestSnapshot, Severity, StackFrame,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let test_panic = args.iter().any(|a| a == "--panic");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("notifier.toml");

    let config = match Config::from_file(config_path) {
        Ok(config) => config,
        Err(err) => {
            error!(path = config_path, error = %err, "Cannot load configuration");
            return ExitCode::FAILURE;
        }
    };

    let listener = match Listener::from_config(&config) {
        Ok(listener) => Arc::new(listener),
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    listener.install_panic_hook();

    /*
     * A web request that fails with an unhandled exception.
     */
    let mut request = RequestSnapshot::new("shop.example.com", "https://shop.example.com/checkout?step=2", "203.0.113.9")
        .with_user_agent("Mozilla/5.0");
    request.query.insert("step".into(), "2".into());
    listener.on_request_start(request.clone());

    let exception = CapturedException::new("App\\Service\\PaymentException", "Gateway timed out")
        .at(file!(), line!())
        .with_trace(vec![
            StackFrame::method("App\\Service\\Checkout", CallType::Instance, "pay").at(file!(), line!()),
            StackFrame::function("main"),
        ]);
    let outcome = listener.on_unhandled_exception(&exception, Some(&request));
    info!(?outcome, "Request exception");

    /*
     * A runtime warning raised inside the same request.
     */
    let warning = ErrorSignal::new(Severity::UserWarning, "Cart total is negative", file!(), line!())
        .with_context(ExecutionContext::new().with("total", "-3.50"));
    listener.handle_runtime_error(&warning);
    listener.on_request_end();

    /*
     * A console command that blows up.
     */
    let command = CommandSnapshot::new("app:import-users")
        .option("dry-run", "false")
        .argument("file", "users.csv");
    listener.on_command_start(command.clone());
    let outcome = listener.on_console_exception(
        &CapturedException::new("RuntimeException", "users.csv: no such file").at(file!(), line!()),
        &command,
    );
    info!(?outcome, "Console exception");

    if test_panic {
        info!("Triggering a panic");
        panic!("Test panic from the notifier demo");
    }

    listener.on_command_end();
    listener.handle_shutdown(None);
    ExitCode::SUCCESS
}
