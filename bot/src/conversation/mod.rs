//! The multi-step booking dialogue.
//!
//! One [`ConversationSession`] per requester, reduced by
//! [`ConversationReducer`] inside a `SessionStore` so that one requester's
//! inputs are processed strictly in order.
//!
//! ```text
//! idle ─ category ─► category selected ─ resource ─► resource selected
//!                                                        │ available day
//!                                                        ▼
//!            confirming ◄─ phone ─ entering phone ◄─ name ─ entering name
//!                │ confirm
//!                ▼
//!              idle (booking pending)
//! ```

mod environment;
mod reducer;
mod types;

pub use environment::{BookingPolicy, ConversationEnvironment};
pub use reducer::{
    ConversationReducer, MAX_NAME_CHARS, MIN_NAME_CHARS, MIN_PHONE_DIGITS, validate_name,
    validate_phone,
};
pub use types::{ConversationAction, ConversationSession, Draft, Step};

/// Session store running the conversation reducer, keyed by requester
pub type ConversationStore = lakeside_runtime::SessionStore<lakeside_core::UserId, ConversationReducer>;
