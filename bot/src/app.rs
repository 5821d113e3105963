//! Inbound event router.
//!
//! [`BookingBot`] is the single entry point for chat traffic: requester
//! intents go to the conversation session store, moderator commands go to
//! [`Moderation`] and their result (or failure) is sent back to the moderator.

use crate::conversation::{
    BookingPolicy, ConversationAction, ConversationEnvironment, ConversationReducer,
    ConversationSession, ConversationStore,
};
use crate::error::{BotError, Result};
use crate::moderation::Moderation;
use crate::notifications::NotificationDispatcher;
use lakeside_core::environment::Clock;
use lakeside_core::{
    Authorization, BookingId, BookingLedger, Category, ChatTransport, NaiveDate, Outbound,
    ResourceCatalog, ResourceId, ResourceUpdate, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Something a requester did in the chat
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserIntent {
    /// Booking menu entry or deep link
    Start {
        /// Deep-link argument
        #[serde(default)]
        payload: Option<String>,
    },
    /// Category button
    SelectCategory {
        /// Chosen category
        category: Category,
    },
    /// Resource button
    SelectResource {
        /// Chosen resource
        resource_id: ResourceId,
    },
    /// Calendar navigation
    ShowMonth {
        /// Calendar year
        year: i32,
        /// Calendar month, 1-12
        month: u32,
    },
    /// Calendar day button
    SelectDay {
        /// Chosen day
        date: NaiveDate,
    },
    /// Free text
    Text {
        /// What was typed
        text: String,
    },
    /// Confirmation button
    Confirm,
    /// Cancel button
    Cancel,
}

impl From<UserIntent> for ConversationAction {
    fn from(intent: UserIntent) -> Self {
        match intent {
            UserIntent::Start { payload } => Self::Start { payload },
            UserIntent::SelectCategory { category } => Self::SelectCategory(category),
            UserIntent::SelectResource { resource_id } => Self::SelectResource(resource_id),
            UserIntent::ShowMonth { year, month } => Self::ShowMonth { year, month },
            UserIntent::SelectDay { date } => Self::SelectDay(date),
            UserIntent::Text { text } => Self::Text(text),
            UserIntent::Confirm => Self::Confirm,
            UserIntent::Cancel => Self::Cancel,
        }
    }
}

/// Something a moderator asked for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModeratorCommand {
    /// Pending queue
    ListPending,
    /// One booking
    ViewBooking {
        /// Booking to show
        booking_id: BookingId,
    },
    /// Approve a pending booking
    ConfirmBooking {
        /// Booking to approve
        booking_id: BookingId,
    },
    /// Decline a pending booking
    RejectBooking {
        /// Booking to decline
        booking_id: BookingId,
    },
    /// Revoke a confirmed booking
    CancelBooking {
        /// Booking to revoke
        booking_id: BookingId,
    },
    /// Full resource list
    ListResources,
    /// Show or hide a resource
    ToggleResource {
        /// Resource to change
        resource_id: ResourceId,
        /// New active flag
        active: bool,
    },
    /// Edit a resource
    UpdateResource {
        /// Resource to change
        resource_id: ResourceId,
        /// Fields to change
        update: ResourceUpdate,
    },
    /// Bookings on one day
    DayOverview {
        /// The day
        date: NaiveDate,
    },
}

impl ModeratorCommand {
    /// Label for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ListPending => "list_pending",
            Self::ViewBooking { .. } => "view_booking",
            Self::ConfirmBooking { .. } => "confirm_booking",
            Self::RejectBooking { .. } => "reject_booking",
            Self::CancelBooking { .. } => "cancel_booking",
            Self::ListResources => "list_resources",
            Self::ToggleResource { .. } => "toggle_resource",
            Self::UpdateResource { .. } => "update_resource",
            Self::DayOverview { .. } => "day_overview",
        }
    }
}

/// Payload of an inbound event; the `type` tag selects the variant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundPayload {
    /// Requester input
    Intent(UserIntent),
    /// Moderator command
    Command(ModeratorCommand),
}

/// One inbound chat event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Sender
    pub from: UserId,
    /// What happened
    pub payload: InboundPayload,
}

impl InboundEvent {
    /// Requester input event
    #[must_use]
    pub const fn intent(from: UserId, intent: UserIntent) -> Self {
        Self { from, payload: InboundPayload::Intent(intent) }
    }

    /// Moderator command event
    #[must_use]
    pub const fn command(from: UserId, command: ModeratorCommand) -> Self {
        Self { from, payload: InboundPayload::Command(command) }
    }
}

/// The booking bot: conversation sessions plus moderation
#[derive(Clone)]
pub struct BookingBot {
    sessions: Arc<ConversationStore>,
    moderation: Moderation,
    notifier: NotificationDispatcher,
}

impl std::fmt::Debug for BookingBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingBot").finish_non_exhaustive()
    }
}

impl BookingBot {
    /// Wire the bot from its collaborators
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        catalog: Arc<dyn ResourceCatalog>,
        ledger: Arc<dyn BookingLedger>,
        transport: Arc<dyn ChatTransport>,
        roster: Arc<dyn Authorization>,
        policy: BookingPolicy,
    ) -> Self {
        let notifier = NotificationDispatcher::new(transport, roster);
        let moderation = Moderation::new(catalog.clone(), ledger.clone(), notifier.clone());
        let environment =
            ConversationEnvironment::new(clock, catalog, ledger, notifier.clone(), policy);
        let sessions = Arc::new(ConversationStore::new(ConversationReducer::new(), environment));
        Self { sessions, moderation, notifier }
    }

    /// Route one inbound event.
    ///
    /// The unit of work runs on its own task, so dropping the returned future
    /// (a disconnected HTTP client, say) does not interrupt a confirm halfway
    /// between the insert and the notifications. Moderation failures are
    /// reported to the moderator, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Session`](crate::error::BotError::Session) when the
    /// conversation runtime refuses the action, and
    /// [`BotError::Aborted`](crate::error::BotError::Aborted) when the task
    /// running the unit of work panicked or was cancelled.
    #[tracing::instrument(skip(self, event), fields(from = %event.from))]
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        let bot = self.clone();
        let unit = tokio::spawn(async move { bot.dispatch(event).await }.in_current_span());
        unit.await.map_err(|error| {
            tracing::error!(%error, "Unit of work aborted");
            BotError::Aborted(error.to_string())
        })?
    }

    async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        let InboundEvent { from, payload } = event;
        match payload {
            InboundPayload::Intent(intent) => {
                let action = ConversationAction::from(intent);
                metrics::counter!("conversation.actions", "kind" => action.kind()).increment(1);
                self.sessions.send(from, action).await?;
            },
            InboundPayload::Command(command) => self.moderate(from, command).await,
        }
        Ok(())
    }

    async fn moderate(&self, actor: UserId, command: ModeratorCommand) {
        let kind = command.kind();
        let m = &self.moderation;

        let outcome = match command {
            ModeratorCommand::ListPending => m
                .list_pending(actor)
                .await
                .map(|bookings| Outbound::PendingQueue { bookings }),
            ModeratorCommand::ViewBooking { booking_id } => m
                .view(actor, booking_id)
                .await
                .map(|details| Outbound::BookingDetail { details }),
            ModeratorCommand::ConfirmBooking { booking_id } => m
                .confirm(actor, booking_id)
                .await
                .map(|details| Outbound::BookingDetail { details }),
            ModeratorCommand::RejectBooking { booking_id } => m
                .reject(actor, booking_id)
                .await
                .map(|details| Outbound::BookingDetail { details }),
            ModeratorCommand::CancelBooking { booking_id } => m
                .cancel(actor, booking_id)
                .await
                .map(|details| Outbound::BookingDetail { details }),
            ModeratorCommand::ListResources => m
                .list_resources(actor)
                .await
                .map(|resources| Outbound::ResourceCatalog { resources }),
            ModeratorCommand::ToggleResource { resource_id, active } => {
                match m.toggle_resource(actor, resource_id, active).await {
                    Ok(_) => m
                        .list_resources(actor)
                        .await
                        .map(|resources| Outbound::ResourceCatalog { resources }),
                    Err(e) => Err(e),
                }
            },
            ModeratorCommand::UpdateResource { resource_id, update } => {
                match m.update_resource(actor, resource_id, update).await {
                    Ok(_) => m
                        .list_resources(actor)
                        .await
                        .map(|resources| Outbound::ResourceCatalog { resources }),
                    Err(e) => Err(e),
                }
            },
            ModeratorCommand::DayOverview { date } => m
                .day_overview(actor, date)
                .await
                .map(|bookings| Outbound::DayOverview { date, bookings }),
        };

        let reply = outcome.unwrap_or_else(|error| {
            tracing::info!(%actor, command = kind, %error, "Moderator command failed");
            Outbound::ModerationFailed { reason: error.to_string() }
        });
        self.notifier.send(actor, reply).await;
    }

    /// Snapshot of a requester's session, if one exists
    pub async fn session(&self, user: UserId) -> Option<ConversationSession> {
        self.sessions.state(&user, ConversationSession::clone).await
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Drop idle sessions and sessions untouched for `max_idle`
    pub async fn sweep_sessions(&self, max_idle: Duration) -> usize {
        self.sessions.sweep(max_idle, ConversationSession::is_idle).await
    }

    /// Stop accepting requester input
    pub fn shutdown(&self) {
        self.sessions.shutdown();
    }
}
