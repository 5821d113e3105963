//! # Lakeside Testing
//!
//! Testing utilities and helpers for the Lakeside booking engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits ([`FixedClock`])
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - [`InMemoryBookingStore`], a catalog and ledger without a database
//! - [`RecordingTransport`] and [`StaticModerators`] for the chat boundary
//!
//! ## Example
//!
//! ```ignore
//! use lakeside_testing::{InMemoryBookingStore, RecordingTransport, StaticModerators, test_clock};
//!
//! #[tokio::test]
//! async fn booking_flow() {
//!     let clock = Arc::new(test_clock());
//!     let store = Arc::new(InMemoryBookingStore::seeded(clock.clone()));
//!     let transport = RecordingTransport::new();
//!     let roster = Arc::new(StaticModerators::new([UserId::new(900)]));
//!
//!     let bot = BookingBot::new(clock, store.clone(), store.clone(), Arc::new(transport.clone()), roster, policy);
//!     bot.handle(event).await?;
//!
//!     assert_eq!(transport.sent_to(user).len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use lakeside_core::environment::Clock;

mod booking_mocks;
mod chat_mocks;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use lakeside_testing::mocks::FixedClock;
    /// use lakeside_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 09:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use booking_mocks::InMemoryBookingStore;
pub use chat_mocks::{RecordingTransport, StaticModerators};
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
