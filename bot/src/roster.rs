//! Moderator roster read from configuration.

use crate::config::ModeratorConfig;
use lakeside_core::{Authorization, UserId};

/// Static roster: the main administrator plus additional moderators
#[derive(Debug, Clone, Default)]
pub struct ModeratorRoster {
    moderators: Vec<UserId>,
}

impl ModeratorRoster {
    /// Build the roster from configuration
    #[must_use]
    pub fn from_config(config: &ModeratorConfig) -> Self {
        let roster = Self { moderators: config.all() };
        if roster.moderators.is_empty() {
            tracing::warn!("No moderators configured; new bookings will not be announced");
        }
        roster
    }
}

impl Authorization for ModeratorRoster {
    fn is_admin(&self, user: UserId) -> bool {
        self.moderators.contains(&user)
    }

    fn moderators(&self) -> Vec<UserId> {
        self.moderators.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_from_config() {
        let roster = ModeratorRoster::from_config(&ModeratorConfig {
            main_admin_id: Some(1),
            moderator_ids: vec![2, 1],
        });

        assert!(roster.is_admin(UserId::new(1)));
        assert!(roster.is_admin(UserId::new(2)));
        assert!(!roster.is_admin(UserId::new(3)));
        assert_eq!(roster.moderators(), vec![UserId::new(1), UserId::new(2)]);
    }
}
