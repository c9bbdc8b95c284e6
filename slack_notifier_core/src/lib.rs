/*!
 * Slack Notifier Core: the decision and delivery pipeline.
 *
 * Turns a captured exception into at most one Slack message. Hosts normally
 * depend on the `slack_notifier` facade, which adds error capture and the
 * framework listener on top of this crate.
 *
 * # Module structure
 *
 * - `protocol/`: what we send (payload types, flattened exceptions, severities)
 * - `formatter/`: how an exception becomes attachments
 * - `rules`: ignore rules (IPs, agents, URLs, status routing, classes)
 * - `dedup`: cooldown gate backed by a fingerprint store
 * - `transport/`: how we deliver (webhook client)
 * - `notifier`: the orchestrator tying the above together
 * - `config`, `error`, `context`, `clock`: shared plumbing
 */

pub mod clock;
pub mod config;
pub mod context;
pub mod dedup;
pub mod error;
pub mod formatter;
pub mod notifier;
pub mod protocol;
pub mod rules;
pub mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, FormatterConfig};
pub use context::{CommandSnapshot, ExecutionContext, ParameterBag, RequestSnapshot};
pub use dedup::{fingerprint, DedupGate, DedupStore, FileDedupStore};
pub use error::{ConfigError, DeliveryError};
pub use formatter::{ExceptionFormatter, FormatInput, SlackFormatter};
pub use notifier::{Notifier, NotifyOutcome, Scope};
pub use protocol::constants::NOTIFIER_VERSION;
pub use protocol::exception::{
    ArgumentDescriptor, ArrayEntry, ArrayKey, CallType, CapturedException, ErrorKind, NormalizedError,
    StackFrame,
};
pub use protocol::severity::{severity_label, Severity};
pub use protocol::types::{Attachment, Field, NotificationPayload};
pub use rules::{IgnoreReason, IgnoreRules};
pub use transport::{Deliver, WebhookTransport};
