//! # Lakeside Runtime
//!
//! Runtime that coordinates reducer execution and effect handling for
//! keyed, per-user sessions.
//!
//! ## Core Components
//!
//! - **`SessionStore`**: one state per key, each behind its own async mutex
//! - **Effect Executor**: runs effect descriptions and feeds produced actions
//!   back into the same session's reducer
//! - **Metrics**: Prometheus exporter and metric descriptions
//!
//! A unit of work is one inbound action plus every action its effects feed
//! back. The session lock is held for the whole unit, so actions of one key
//! are applied strictly in order while different keys run in parallel.
//!
//! ## Example
//!
//! ```ignore
//! use lakeside_runtime::SessionStore;
//!
//! let store = SessionStore::new(ConversationReducer, environment);
//!
//! store.send(user_id, ConversationAction::Start { payload: None }).await?;
//!
//! let state = store.state(&user_id, |s| s.state.clone()).await;
//! ```

use futures::future::{BoxFuture, join_all};
use lakeside_core::{effect::Effect, reducer::Reducer};
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Prometheus metrics for observability
pub mod metrics;

pub use error::StoreError;
pub use store::SessionStore;

/// Error types for the session runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during `SessionStore` operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Effects kept feeding actions back past the configured limit
        ///
        /// The session state reflects every action applied before the limit.
        #[error("Feedback limit of {0} actions exceeded")]
        FeedbackLimitExceeded(usize),
    }
}

/// Default maximum number of actions processed for one `send`
pub const DEFAULT_FEEDBACK_LIMIT: usize = 64;

struct Slot<S> {
    state: Mutex<S>,
    last_touched_ms: AtomicU64,
}

/// Keyed session store
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicU64, BoxFuture, DEFAULT_FEEDBACK_LIMIT, Display, Duration, Effect,
        Hash, HashMap, Instant, Mutex, Ordering, Reducer, RwLock, Slot, StoreError, VecDeque,
        join_all,
    };

    /// Runtime coordinator for a reducer with one state per key.
    ///
    /// Sessions are created on first use from the key (`State: From<K>`).
    ///
    /// # Type Parameters
    ///
    /// - `K`: Session key (for example a user identity)
    /// - `R`: Reducer implementation
    pub struct SessionStore<K, R>
    where
        R: Reducer,
    {
        sessions: RwLock<HashMap<K, Arc<Slot<R::State>>>>,
        reducer: R,
        environment: R::Environment,
        feedback_limit: usize,
        shutdown: AtomicBool,
        epoch: Instant,
    }

    impl<K, R> SessionStore<K, R>
    where
        K: Eq + Hash + Clone + Display + Send + Sync,
        R: Reducer + Send + Sync,
        R::State: From<K> + Send,
        R::Action: Send + 'static,
        R::Environment: Send + Sync,
    {
        /// Create a new store from a reducer and its environment
        #[must_use]
        pub fn new(reducer: R, environment: R::Environment) -> Self {
            Self {
                sessions: RwLock::new(HashMap::new()),
                reducer,
                environment,
                feedback_limit: DEFAULT_FEEDBACK_LIMIT,
                shutdown: AtomicBool::new(false),
                epoch: Instant::now(),
            }
        }

        /// Override the maximum number of actions one `send` may process
        #[must_use]
        pub const fn with_feedback_limit(mut self, limit: usize) -> Self {
            self.feedback_limit = limit;
            self
        }

        /// The injected environment
        pub const fn environment(&self) -> &R::Environment {
            &self.environment
        }

        /// Send an action to the session identified by `key`.
        ///
        /// Reduces the action, executes the returned effects, and feeds every
        /// produced action back into the same session until the queue drains.
        /// Returns the number of actions applied.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: the store no longer accepts actions
        /// - [`StoreError::FeedbackLimitExceeded`]: effects kept producing actions
        #[tracing::instrument(skip(self, key, action), fields(session = %key), name = "session_send")]
        pub async fn send(&self, key: K, action: R::Action) -> Result<usize, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("session_store.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let slot = self.slot(key).await;
            let mut state = slot.state.lock().await;
            self.touch(&slot);
            tracing::trace!("Acquired session lock");

            let mut queue = VecDeque::from([action]);
            let mut processed = 0usize;

            while let Some(action) = queue.pop_front() {
                if processed >= self.feedback_limit {
                    tracing::error!(limit = self.feedback_limit, "Feedback limit exceeded");
                    return Err(StoreError::FeedbackLimitExceeded(self.feedback_limit));
                }
                processed += 1;
                metrics::counter!("session_store.actions.total").increment(1);

                let start = Instant::now();
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                metrics::histogram!("session_store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                for effect in effects {
                    queue.extend(execute_effect(effect).await);
                }
            }

            self.touch(&slot);
            tracing::debug!(processed, "Unit of work completed");
            Ok(processed)
        }

        /// Read a session's state via a closure; `None` if the session does not exist
        pub async fn state<F, T>(&self, key: &K, f: F) -> Option<T>
        where
            F: FnOnce(&R::State) -> T,
        {
            let slot = self.sessions.read().await.get(key).cloned()?;
            let state = slot.state.lock().await;
            Some(f(&state))
        }

        /// Number of live sessions
        pub async fn len(&self) -> usize {
            self.sessions.read().await.len()
        }

        /// Whether no session is live
        pub async fn is_empty(&self) -> bool {
            self.sessions.read().await.is_empty()
        }

        /// Drop sessions nobody is using.
        ///
        /// A session is removed when no unit of work holds it and either
        /// `is_at_rest` returns true for its state or it has not been touched
        /// for `max_idle`. Returns the number of removed sessions.
        pub async fn sweep<F>(&self, max_idle: Duration, is_at_rest: F) -> usize
        where
            F: Fn(&R::State) -> bool,
        {
            let now_ms = self.elapsed_ms();
            let max_idle_ms = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);

            let mut sessions = self.sessions.write().await;
            let before = sessions.len();

            sessions.retain(|_, slot| {
                // Another task cloned the slot before we took the write lock
                if Arc::strong_count(slot) > 1 {
                    return true;
                }
                let Ok(state) = slot.state.try_lock() else {
                    return true;
                };
                let idle_for = now_ms.saturating_sub(slot.last_touched_ms.load(Ordering::Acquire));
                !(is_at_rest(&state) || idle_for >= max_idle_ms)
            });

            let removed = before - sessions.len();
            if removed > 0 {
                tracing::debug!(removed, remaining = sessions.len(), "Swept idle sessions");
                metrics::counter!("session_store.sessions.evicted").increment(removed as u64);
            }
            removed
        }

        /// Stop accepting new actions; in-flight units of work complete normally
        pub fn shutdown(&self) {
            self.shutdown.store(true, Ordering::Release);
            tracing::info!("Session store shutting down");
        }

        async fn slot(&self, key: K) -> Arc<Slot<R::State>> {
            if let Some(slot) = self.sessions.read().await.get(&key) {
                return Arc::clone(slot);
            }

            let mut sessions = self.sessions.write().await;
            let now = self.elapsed_ms();
            let slot = sessions.entry(key.clone()).or_insert_with(|| {
                tracing::debug!(session = %key, "Created session");
                Arc::new(Slot {
                    state: Mutex::new(R::State::from(key)),
                    last_touched_ms: AtomicU64::new(now),
                })
            });
            Arc::clone(slot)
        }

        fn touch(&self, slot: &Slot<R::State>) {
            slot.last_touched_ms.store(self.elapsed_ms(), Ordering::Release);
        }

        fn elapsed_ms(&self) -> u64 {
            u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
        }
    }

    /// Execute one effect description and collect the actions it produces
    fn execute_effect<A>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>>
    where
        A: Send + 'static,
    {
        Box::pin(async move {
            match effect {
                Effect::None => {
                    metrics::counter!("session_store.effects.executed", "type" => "none")
                        .increment(1);
                    Vec::new()
                },
                Effect::Future(fut) => {
                    metrics::counter!("session_store.effects.executed", "type" => "future")
                        .increment(1);
                    fut.await.into_iter().collect()
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("session_store.effects.executed", "type" => "parallel")
                        .increment(1);
                    join_all(effects.into_iter().map(execute_effect))
                        .await
                        .into_iter()
                        .flatten()
                        .collect()
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("session_store.effects.executed", "type" => "sequential")
                        .increment(1);
                    let mut produced = Vec::new();
                    for effect in effects {
                        produced.extend(execute_effect(effect).await);
                    }
                    produced
                },
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use lakeside_core::{SmallVec, smallvec};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Default)]
    struct Counter {
        owner: u32,
        value: i64,
        log: Vec<String>,
    }

    impl From<u32> for Counter {
        fn from(owner: u32) -> Self {
            Self { owner, ..Self::default() }
        }
    }

    #[derive(Debug, Clone)]
    enum CounterAction {
        Increment,
        IncrementTwiceLater,
        Slow(u64),
        Loop,
        Both,
    }

    struct Env {
        started: Arc<AtomicUsize>,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = Counter;
        type Action = CounterAction;
        type Environment = Env;

        fn reduce(
            &self,
            state: &mut Counter,
            action: CounterAction,
            env: &Env,
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            state.log.push(format!("{action:?}"));
            match action {
                CounterAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                CounterAction::IncrementTwiceLater => smallvec![Effect::chain(vec![
                    Effect::future(async { Some(CounterAction::Increment) }),
                    Effect::future(async { Some(CounterAction::Increment) }),
                ])],
                CounterAction::Slow(ms) => {
                    let started = Arc::clone(&env.started);
                    smallvec![Effect::future(async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        Some(CounterAction::Increment)
                    })]
                },
                CounterAction::Loop => {
                    smallvec![Effect::future(async { Some(CounterAction::Loop) })]
                },
                CounterAction::Both => smallvec![Effect::merge(vec![
                    Effect::None,
                    Effect::future(async { Some(CounterAction::Increment) }),
                    Effect::future(async { None }),
                ])],
            }
        }
    }

    fn store() -> SessionStore<u32, CounterReducer> {
        SessionStore::new(CounterReducer, Env { started: Arc::new(AtomicUsize::new(0)) })
    }

    #[tokio::test]
    async fn feedback_actions_are_applied_in_the_same_unit() {
        let store = store();

        let processed = store.send(1, CounterAction::IncrementTwiceLater).await.unwrap();

        assert_eq!(processed, 3);
        assert_eq!(store.state(&1, |s| s.value).await, Some(2));
    }

    #[tokio::test]
    async fn parallel_effects_feed_back_every_produced_action() {
        let store = store();
        store.send(1, CounterAction::Both).await.unwrap();
        assert_eq!(store.state(&1, |s| s.value).await, Some(1));
    }

    #[tokio::test]
    async fn sessions_are_created_from_the_key() {
        let store = store();
        assert!(store.state(&7, |s| s.owner).await.is_none());

        store.send(7, CounterAction::Increment).await.unwrap();

        assert_eq!(store.state(&7, |s| s.owner).await, Some(7));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn one_session_processes_actions_in_order() {
        let store = Arc::new(store());

        let slow = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.send(1, CounterAction::Slow(50)).await })
        };
        // Let the slow unit take the session lock first
        while store.environment().started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        store.send(1, CounterAction::Increment).await.unwrap();
        slow.await.unwrap().unwrap();

        let log = store.state(&1, |s| s.log.clone()).await.unwrap();
        assert_eq!(log, vec!["Slow(50)", "Increment", "Increment"]);
    }

    #[tokio::test]
    async fn different_sessions_run_in_parallel() {
        let store = Arc::new(store());

        let slow = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.send(1, CounterAction::Slow(200)).await })
        };
        while store.environment().started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let other = tokio::time::timeout(
            Duration::from_millis(100),
            store.send(2, CounterAction::Increment),
        )
        .await;
        assert!(other.is_ok(), "session 2 must not wait for session 1");

        slow.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn runaway_feedback_is_cut_off() {
        let store = store().with_feedback_limit(5);
        let err = store.send(1, CounterAction::Loop).await.unwrap_err();
        assert_eq!(err, StoreError::FeedbackLimitExceeded(5));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = store();
        store.shutdown();
        assert_eq!(
            store.send(1, CounterAction::Increment).await.unwrap_err(),
            StoreError::ShutdownInProgress
        );
    }

    #[tokio::test]
    async fn sweep_removes_sessions_at_rest() {
        let store = store();
        store.send(1, CounterAction::Increment).await.unwrap();
        store.send(2, CounterAction::IncrementTwiceLater).await.unwrap();

        let removed = store.sweep(Duration::from_secs(3600), |s| s.value < 2).await;

        assert_eq!(removed, 1);
        assert!(store.state(&1, |_| ()).await.is_none());
        assert!(store.state(&2, |_| ()).await.is_some());
    }

    #[tokio::test]
    async fn sweep_removes_sessions_past_max_idle() {
        let store = store();
        store.send(1, CounterAction::Increment).await.unwrap();

        let removed = store.sweep(Duration::ZERO, |_| false).await;

        assert_eq!(removed, 1);
        assert!(store.is_empty().await);
    }
}
