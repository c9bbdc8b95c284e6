/*!
 * Slack Notifier: report unhandled errors of web requests and CLI commands
 * to a Slack channel.
 *
 * The host framework drives a single `Listener` through its events:
 *
 * ```ignore
 * let listener = Arc::new(slack_notifier::Listener::from_config(&config)?);
 * listener.install_panic_hook();
 *
 * listener.on_request_start(request.clone());
 * // ... request fails ...
 * listener.on_unhandled_exception(&exception, Some(&request));
 * listener.on_request_end();
 * ```
 *
 * Runtime errors raised by the host go to `handle_runtime_error`, and the
 * last fatal error at exit to `handle_shutdown`. Both are only routed once a
 * request or command has started with runtime capture enabled.
 *
 * Request and command scopes are tracked per thread: a runtime error is
 * reported with the request or command running on the thread that raised it.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use tracing::debug;

pub use slack_notifier_capture::{ErrorHandler, ErrorSignal, ErrorSink};
pub use slack_notifier_core::*;

/// The request or command a thread is currently serving.
#[derive(Debug, Clone)]
enum ActiveScope {
    Request(RequestSnapshot),
    Command(CommandSnapshot),
}

/**
 * Consumes host framework events and feeds them into the notifier.
 *
 * Also serves as the `ErrorSink` for captured runtime errors and panics,
 * which are reported within the scope of the request or command started on
 * the current thread.
 */
pub struct Listener {
    notifier: Notifier,
    handler: Arc<ErrorHandler>,
    scopes: Mutex<HashMap<ThreadId, ActiveScope>>,
}

impl Listener {
    /// Builds a listener posting to the configured Slack webhook.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config, Notifier::from_config(config)?))
    }

    /// Builds a listener delivering through `transport`.
    pub fn with_transport(
        config: &Config,
        transport: Box<dyn Deliver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(config, Notifier::with_transport(config, transport, clock)?))
    }

    pub fn new(config: &Config, notifier: Notifier) -> Self {
        Self {
            notifier,
            handler: Arc::new(ErrorHandler::from_config(config)),
            scopes: Mutex::new(HashMap::new()),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /**
     * Installs the process panic hook, reporting panics through this
     * listener. Returns `false` if a hook was already installed.
     */
    pub fn install_panic_hook(self: &Arc<Self>) -> bool {
        let sink: Arc<dyn ErrorSink> = self.clone();
        slack_notifier_capture::panic::install(self.handler.clone(), sink)
    }

    // -----------------------------------------------------------------------
    // Framework events
    // -----------------------------------------------------------------------

    /// A request starts on this thread: arms runtime capture if enabled.
    pub fn on_request_start(&self, request: RequestSnapshot) {
        if !self.handler.is_enabled() {
            return;
        }
        self.set_scope(ActiveScope::Request(request));
        self.handler.arm();
    }

    /// A command starts on this thread: drops any request scope and arms
    /// runtime capture if enabled.
    pub fn on_command_start(&self, command: CommandSnapshot) {
        self.set_scope(ActiveScope::Command(command));
        if self.handler.is_enabled() {
            self.handler.arm();
        }
    }

    /// The request served by this thread is done.
    pub fn on_request_end(&self) {
        self.clear_scope();
    }

    /// The command run by this thread is done.
    pub fn on_command_end(&self) {
        self.clear_scope();
    }

    pub fn on_unhandled_exception(
        &self,
        exception: &CapturedException,
        request: Option<&RequestSnapshot>,
    ) -> NotifyOutcome {
        self.notifier.notify_exception(exception, request)
    }

    pub fn on_console_exception(&self, exception: &CapturedException, command: &CommandSnapshot) -> NotifyOutcome {
        self.notifier.notify_console(exception, command)
    }

    // -----------------------------------------------------------------------
    // Runtime capture
    // -----------------------------------------------------------------------

    /**
     * Synchronous runtime error from the host.
     *
     * Always returns `false`, so the host's own error handling still runs.
     */
    pub fn handle_runtime_error(&self, signal: &ErrorSignal) -> bool {
        if !self.handler.is_armed() {
            debug!(severity = signal.severity, "Runtime capture not armed");
            return false;
        }
        self.handler.handle_error(signal, self)
    }

    /// Process exit, with the last fatal error the host observed.
    pub fn handle_shutdown(&self, last: Option<&ErrorSignal>) {
        if !self.handler.is_armed() {
            return;
        }
        self.handler.handle_shutdown(last, self);
    }

    fn scopes(&self) -> MutexGuard<'_, HashMap<ThreadId, ActiveScope>> {
        self.scopes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_scope(&self, scope: ActiveScope) {
        self.scopes().insert(thread::current().id(), scope);
    }

    fn clear_scope(&self) {
        self.scopes().remove(&thread::current().id());
    }

    fn current_scope(&self) -> Option<ActiveScope> {
        self.scopes().get(&thread::current().id()).cloned()
    }
}

impl ErrorSink for Listener {
    fn report(&self, exception: CapturedException, context: Option<&ExecutionContext>) {
        let active = self.current_scope();
        let scope = match &active {
            Some(ActiveScope::Request(request)) => Scope::Request(request),
            Some(ActiveScope::Command(command)) => Scope::Command(command),
            None => Scope::Detached,
        };

        let outcome = self.notifier.notify_error(&exception, scope, context);
        debug!(class = %exception.class_name, ?outcome, "Runtime error reported");
    }
}
