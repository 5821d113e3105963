//! Chat transports shipped with the bot.
//!
//! - [`LogTransport`]: writes every message to the log (development)
//! - [`HttpRelayTransport`]: POSTs messages as JSON to a chat gateway

use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use lakeside_core::{ChatTransport, DeliveryError, Outbound, UserId};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Logs outbound messages instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl ChatTransport for LogTransport {
    fn send(&self, to: UserId, message: Outbound) -> BoxFuture<'_, Result<(), DeliveryError>> {
        match serde_json::to_string(&message) {
            Ok(payload) => tracing::info!(recipient = %to, kind = message.kind(), %payload, "Outbound message"),
            Err(e) => tracing::info!(recipient = %to, kind = message.kind(), error = %e, "Outbound message"),
        }
        ready(Ok(())).boxed()
    }
}

#[derive(Serialize)]
struct RelayEnvelope<'a> {
    to: UserId,
    message: &'a Outbound,
}

/// Delivers messages through an HTTP gateway.
///
/// The gateway owns rendering for the chat network. It is expected to answer
/// 2xx on success and 403/404 when the recipient cannot be reached.
#[derive(Debug, Clone)]
pub struct HttpRelayTransport {
    client: Client,
    url: String,
}

impl HttpRelayTransport {
    /// Create a relay transport posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, url: url.into() })
    }

    /// Gateway endpoint
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChatTransport for HttpRelayTransport {
    fn send(&self, to: UserId, message: Outbound) -> BoxFuture<'_, Result<(), DeliveryError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(&RelayEnvelope { to, message: &message })
                .send()
                .await
                .map_err(|e| DeliveryError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let reason = response.text().await.unwrap_or_default();
            if matches!(status, StatusCode::FORBIDDEN | StatusCode::NOT_FOUND) {
                Err(DeliveryError::Unreachable { recipient: to, reason })
            } else {
                Err(DeliveryError::Transport(format!("Gateway answered {status}: {reason}")))
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_always_delivers() {
        let transport = LogTransport;
        assert!(transport.send(UserId::new(1), Outbound::AskPhone).await.is_ok());
    }

    #[test]
    fn test_relay_envelope_shape() {
        let message = Outbound::InvalidName;
        let json = serde_json::to_value(RelayEnvelope { to: UserId::new(42), message: &message }).unwrap();

        assert_eq!(json["to"], 42);
        assert_eq!(json["message"]["type"], "invalid_name");
    }

    #[tokio::test]
    async fn test_relay_unreachable_gateway_is_transport_error() {
        let transport = HttpRelayTransport::new("http://127.0.0.1:9/send", Duration::from_millis(200)).unwrap();

        let result = transport.send(UserId::new(1), Outbound::Cancelled).await;

        assert!(matches!(result, Err(DeliveryError::Transport(_))));
    }
}
