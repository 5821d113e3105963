//! Best-effort delivery of booking lifecycle messages.
//!
//! Each recipient is attempted independently and concurrently. A failure for
//! one recipient is logged and counted, never returned to the caller.

use futures::future::join_all;
use lakeside_core::{Authorization, ChatTransport, Outbound, UserId};
use std::sync::Arc;

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients that accepted the message
    pub delivered: Vec<UserId>,
    /// Recipients the transport failed for
    pub failed: Vec<UserId>,
}

impl DeliveryReport {
    /// Whether every recipient received the message
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends messages to requesters and to the moderator roster
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn ChatTransport>,
    roster: Arc<dyn Authorization>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher over a transport and a roster
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, roster: Arc<dyn Authorization>) -> Self {
        Self { transport, roster }
    }

    /// The moderator roster used for alerts
    #[must_use]
    pub fn roster(&self) -> &Arc<dyn Authorization> {
        &self.roster
    }

    /// Deliver one message to one user; returns whether it was delivered
    pub async fn send(&self, to: UserId, message: Outbound) -> bool {
        let kind = message.kind();
        match self.transport.send(to, message).await {
            Ok(()) => {
                tracing::debug!(recipient = %to, kind, "Message delivered");
                metrics::counter!("notifications.delivered", "kind" => kind).increment(1);
                true
            },
            Err(e) => {
                tracing::warn!(recipient = %to, kind, error = %e, "Message delivery failed");
                metrics::counter!("notifications.failed", "kind" => kind).increment(1);
                false
            },
        }
    }

    /// Deliver the same message to every recipient concurrently
    pub async fn fan_out(&self, recipients: &[UserId], message: &Outbound) -> DeliveryReport {
        let attempts = recipients.iter().map(|&to| {
            let message = message.clone();
            async move { (to, self.send(to, message).await) }
        });

        let mut report = DeliveryReport::default();
        for (to, delivered) in join_all(attempts).await {
            if delivered {
                report.delivered.push(to);
            } else {
                report.failed.push(to);
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                kind = message.kind(),
                delivered = report.delivered.len(),
                failed = report.failed.len(),
                "Fan-out finished with failures"
            );
        }
        report
    }

    /// Alert every moderator
    pub async fn notify_moderators(&self, message: &Outbound) -> DeliveryReport {
        let moderators = self.roster.moderators();
        if moderators.is_empty() {
            tracing::warn!(kind = message.kind(), "No moderators configured, alert dropped");
        }
        self.fan_out(&moderators, message).await
    }

    /// Alert the requester of a booking
    pub async fn notify_requester(&self, requester: UserId, message: &Outbound) -> DeliveryReport {
        self.fan_out(&[requester], message).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lakeside_testing::{RecordingTransport, StaticModerators};

    fn dispatcher(
        transport: RecordingTransport,
        moderators: &[i64],
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(transport),
            Arc::new(StaticModerators::new(moderators.iter().copied().map(UserId::new))),
        )
    }

    #[tokio::test]
    async fn test_fan_out_continues_past_failing_recipients() {
        let transport = RecordingTransport::new().failing_for([UserId::new(2)]);
        let notifier = dispatcher(transport.clone(), &[1, 2, 3]);

        let report = notifier.notify_moderators(&Outbound::BookingFailed).await;

        assert_eq!(report.delivered.len(), 2);
        assert_eq!(report.failed, vec![UserId::new(2)]);
        assert!(!report.is_complete());
        assert_eq!(transport.sent_to(UserId::new(1)), vec![Outbound::BookingFailed]);
        assert_eq!(transport.sent_to(UserId::new(3)), vec![Outbound::BookingFailed]);
        assert!(transport.sent_to(UserId::new(2)).is_empty());
    }

    #[tokio::test]
    async fn test_no_moderators_yields_empty_report() {
        let notifier = dispatcher(RecordingTransport::new(), &[]);

        let report = notifier.notify_moderators(&Outbound::Cancelled).await;

        assert!(report.delivered.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_send_reports_failure_without_error() {
        let transport = RecordingTransport::new().failing_for([UserId::new(5)]);
        let notifier = dispatcher(transport, &[]);

        assert!(!notifier.send(UserId::new(5), Outbound::AskPhone).await);
        assert!(notifier.send(UserId::new(6), Outbound::AskPhone).await);
    }
}
