/**
 * Transport layer: delivery of formatted payloads to the Slack webhook.
 *
 * - `http`: ureq-based webhook client
 *
 * Delivery is synchronous: the payload is posted inline, from the thread
 * that reported the error, before control returns to the host.
 */

pub mod http;

pub use http::WebhookTransport;

use crate::error::DeliveryError;
use crate::protocol::types::NotificationPayload;

/// Something that can hand a payload over to Slack.
pub trait Deliver: Send + Sync {
    fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError>;
}
