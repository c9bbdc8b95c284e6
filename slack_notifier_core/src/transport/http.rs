/*!
 * HTTP transport for the Slack incoming webhook.
 *
 * Uses `ureq`, a blocking client with no async runtime. The notifier runs
 * inline in a request or command that is already failing, so a blocking
 * call with tight timeouts is all that is needed.
 *
 * - **Single attempt**: no retries, a lost notification is acceptable.
 * - **Strict acknowledgement**: Slack answers `200 ok`; anything else is a
 *   failure, logged here and returned to the caller.
 */

use std::time::Duration;

use tracing::{debug, error};
use ureq::Agent;

use super::Deliver;
use crate::error::DeliveryError;
use crate::protocol::constants::{NOTIFIER_VERSION, WEBHOOK_ACK};
use crate::protocol::types::NotificationPayload;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/**
 * Thin wrapper around `ureq::Agent` bound to one webhook endpoint.
 */
pub struct WebhookTransport {
    agent: Agent,
    endpoint: String,
}

impl WebhookTransport {
    /**
     * Creates a transport posting to `endpoint`
     * (`https://hooks.slack.com/services/{token}` in production).
     *
     * Timeouts:
     * - 3 s connect
     * - 5 s total per request
     */
    pub fn new(endpoint: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)?;

        let response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("User-Agent", NOTIFIER_VERSION)
            .send(&body[..])
            .map_err(|err| DeliveryError::TransportFailure(err.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|err| DeliveryError::TransportFailure(err.to_string()))?;

        if status != 200 {
            return Err(DeliveryError::UnexpectedStatus { status, body: text });
        }
        if text != WEBHOOK_ACK {
            return Err(DeliveryError::UnexpectedBody(text));
        }
        Ok(())
    }
}

impl Deliver for WebhookTransport {
    fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        match self.post(payload) {
            Ok(()) => {
                debug!(channel = %payload.channel_target, "Notification delivered");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to post to Slack");
                Err(err)
            }
        }
    }
}
