//! Dependencies injected into the conversation reducer.

use crate::notifications::NotificationDispatcher;
use chrono::{Datelike, FixedOffset, NaiveDate};
use lakeside_core::environment::Clock;
use lakeside_core::{BookingLedger, ResourceCatalog, WeekendDays};
use std::sync::Arc;

/// Site rules that do not live in storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPolicy {
    /// Days priced at the weekend rate
    pub weekend: WeekendDays,
    /// Offset of the operating locale from UTC
    pub offset: FixedOffset,
}

impl BookingPolicy {
    /// Create a policy
    #[must_use]
    pub const fn new(weekend: WeekendDays, offset: FixedOffset) -> Self {
        Self { weekend, offset }
    }

    /// Today's date in the operating locale
    #[must_use]
    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Year and month of today in the operating locale
    #[must_use]
    pub fn current_month(&self, clock: &dyn Clock) -> (i32, u32) {
        let today = self.today(clock);
        (today.year(), today.month())
    }
}

/// Environment of [`ConversationReducer`](super::ConversationReducer)
#[derive(Clone)]
pub struct ConversationEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Resource catalog
    pub catalog: Arc<dyn ResourceCatalog>,
    /// Booking ledger
    pub ledger: Arc<dyn BookingLedger>,
    /// Outbound delivery to requesters and moderators
    pub notifier: NotificationDispatcher,
    /// Site rules
    pub policy: BookingPolicy,
}

impl ConversationEnvironment {
    /// Creates a new conversation environment
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        catalog: Arc<dyn ResourceCatalog>,
        ledger: Arc<dyn BookingLedger>,
        notifier: NotificationDispatcher,
        policy: BookingPolicy,
    ) -> Self {
        Self { clock, catalog, ledger, notifier, policy }
    }

    /// Today's date in the operating locale
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.policy.today(self.clock.as_ref())
    }

    /// Current calendar month in the operating locale
    #[must_use]
    pub fn current_month(&self) -> (i32, u32) {
        self.policy.current_month(self.clock.as_ref())
    }
}
