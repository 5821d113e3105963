//! Chat boundary mocks: a transport that records what it sends and a fixed
//! moderator roster.

use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use lakeside_core::{Authorization, ChatTransport, DeliveryError, Outbound, UserId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Transport that records every delivered message.
///
/// Recipients registered with [`RecordingTransport::failing_for`] get a
/// [`DeliveryError::Unreachable`] and nothing is recorded for them.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(UserId, Outbound)>>>,
    failing: Arc<Mutex<HashSet<UserId>>>,
}

impl RecordingTransport {
    /// Create a transport that delivers everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries to these recipients fail
    #[must_use]
    pub fn failing_for(self, recipients: impl IntoIterator<Item = UserId>) -> Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.extend(recipients);
        }
        self
    }

    /// Every delivered message, in delivery order
    #[must_use]
    pub fn sent(&self) -> Vec<(UserId, Outbound)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Messages delivered to one recipient, in delivery order
    #[must_use]
    pub fn sent_to(&self, recipient: UserId) -> Vec<Outbound> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, message)| message)
            .collect()
    }

    /// Last message delivered to one recipient
    #[must_use]
    pub fn last_to(&self, recipient: UserId) -> Option<Outbound> {
        self.sent_to(recipient).pop()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn deliver(&self, to: UserId, message: Outbound) -> Result<(), DeliveryError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| DeliveryError::Transport("recording transport poisoned".to_string()))?;
        if failing.contains(&to) {
            return Err(DeliveryError::Unreachable { recipient: to, reason: "blocked".to_string() });
        }
        drop(failing);

        self.sent
            .lock()
            .map_err(|_| DeliveryError::Transport("recording transport poisoned".to_string()))?
            .push((to, message));
        Ok(())
    }
}

impl ChatTransport for RecordingTransport {
    fn send(&self, to: UserId, message: Outbound) -> BoxFuture<'_, Result<(), DeliveryError>> {
        ready(self.deliver(to, message)).boxed()
    }
}

/// Moderator roster fixed at construction
#[derive(Clone, Debug, Default)]
pub struct StaticModerators {
    moderators: Vec<UserId>,
}

impl StaticModerators {
    /// Create a roster from explicit identities
    #[must_use]
    pub fn new(moderators: impl IntoIterator<Item = UserId>) -> Self {
        let mut moderators: Vec<UserId> = moderators.into_iter().collect();
        moderators.dedup();
        Self { moderators }
    }
}

impl Authorization for StaticModerators {
    fn is_admin(&self, user: UserId) -> bool {
        self.moderators.contains(&user)
    }

    fn moderators(&self) -> Vec<UserId> {
        self.moderators.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_recipients_are_not_recorded() {
        let transport = RecordingTransport::new().failing_for([UserId::new(2)]);

        transport.send(UserId::new(1), Outbound::Cancelled).await.unwrap();
        let err = transport.send(UserId::new(2), Outbound::Cancelled).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Unreachable { .. }));
        assert_eq!(transport.sent(), vec![(UserId::new(1), Outbound::Cancelled)]);
    }

    #[test]
    fn roster_membership() {
        let roster = StaticModerators::new([UserId::new(1), UserId::new(1), UserId::new(5)]);
        assert!(roster.is_admin(UserId::new(5)));
        assert!(!roster.is_admin(UserId::new(6)));
        assert_eq!(roster.moderators().len(), 2);
    }
}
