//! # Lakeside Core
//!
//! Domain types, storage traits and pure booking logic for the Lakeside
//! booking engine.
//!
//! This crate holds everything that does not need a runtime or a database:
//!
//! - **Catalog**: reservable resources and the [`ResourceCatalog`] trait
//! - **Ledger**: bookings, the status state machine and the [`BookingLedger`] trait
//! - **Availability**: the per-day status view for a resource over a month
//! - **Channel**: chat transport and authorization boundaries
//! - **Reducer / Effect / Environment**: the functional core used by the
//!   conversation flow
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Explicit Effects (reducers describe I/O, the runtime performs it)
//! - Dependency Injection via Environment
//! - Storage adapters guarantee the one-active-booking-per-slot invariant
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use lakeside_core::availability::{compute_month, DayAvailability};
//! use lakeside_core::types::ResourceId;
//!
//! let view = compute_month(ResourceId::new(1), 2025, 6, &[]).unwrap();
//! let day = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
//! assert_eq!(view.status(day), Some(DayAvailability::Available));
//! assert_eq!(view.len(), 30);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod catalog;
pub mod channel;
pub mod error;
pub mod ledger;
pub mod types;

// Re-export commonly used types
pub use availability::{DayAvailability, MonthAvailability, PublicDayStatus};
pub use catalog::ResourceCatalog;
pub use channel::{Authorization, ChatTransport, DeliveryError, Outbound};
pub use chrono::{DateTime, NaiveDate, Utc};
pub use error::{BookingError, Result};
pub use ledger::BookingLedger;
pub use smallvec::{SmallVec, smallvec};
pub use types::*;

/// Reducer module - the core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain the business logic of a feature and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for ConversationReducer {
    ///     type State = ConversationSession;
    ///     type Action = ConversationAction;
    ///     type Environment = ConversationEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ConversationSession,
    ///         action: ConversationAction,
    ///         env: &ConversationEnvironment,
    ///     ) -> SmallVec<[Effect<ConversationAction>; 4]> {
    ///         match action {
    ///             ConversationAction::Cancel => {
    ///                 state.clear();
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the session store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation as an effect
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }
    }
}

/// Environment module - dependency injection traits
///
/// External dependencies are abstracted behind traits and injected
/// via the Environment parameter of a reducer.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use lakeside_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
