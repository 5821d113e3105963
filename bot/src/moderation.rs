//! Moderator commands.
//!
//! Every operation checks the roster first; a non-moderator gets
//! [`BookingError::Forbidden`] and nothing is read or written.

use crate::notifications::NotificationDispatcher;
use lakeside_core::{
    BookingDetails, BookingError, BookingId, BookingLedger, NaiveDate, Outbound,
    ReservableResource, ResourceCatalog, ResourceId, ResourceUpdate, Result, Transition, UserId,
};
use std::sync::Arc;

/// Moderation workflow over the catalog and the ledger
#[derive(Clone)]
pub struct Moderation {
    catalog: Arc<dyn ResourceCatalog>,
    ledger: Arc<dyn BookingLedger>,
    notifier: NotificationDispatcher,
}

impl std::fmt::Debug for Moderation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Moderation").finish_non_exhaustive()
    }
}

impl Moderation {
    /// Create the workflow; the notifier's roster decides who may moderate
    #[must_use]
    pub fn new(
        catalog: Arc<dyn ResourceCatalog>,
        ledger: Arc<dyn BookingLedger>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self { catalog, ledger, notifier }
    }

    fn authorize(&self, actor: UserId) -> Result<()> {
        if self.notifier.roster().is_admin(actor) {
            Ok(())
        } else {
            tracing::warn!(%actor, "Moderation attempt by non-moderator");
            Err(BookingError::Forbidden { actor })
        }
    }

    /// Pending bookings, oldest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-moderators; storage errors otherwise.
    pub async fn list_pending(&self, actor: UserId) -> Result<Vec<BookingDetails>> {
        self.authorize(actor)?;
        self.ledger.list_pending().await
    }

    /// One booking with details.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-moderators, `NotFound` for an unknown booking.
    pub async fn view(&self, actor: UserId, id: BookingId) -> Result<BookingDetails> {
        self.authorize(actor)?;
        self.ledger.get_details(id).await
    }

    /// `pending → confirmed`, then tell the requester.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound` or `InvalidTransition`; nothing changes on error.
    pub async fn confirm(&self, actor: UserId, id: BookingId) -> Result<BookingDetails> {
        self.apply(actor, id, Transition::Confirm).await
    }

    /// `pending → cancelled`, then tell the requester.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound` or `InvalidTransition`; nothing changes on error.
    pub async fn reject(&self, actor: UserId, id: BookingId) -> Result<BookingDetails> {
        self.apply(actor, id, Transition::Reject).await
    }

    /// `confirmed → cancelled`, then tell the requester.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound` or `InvalidTransition`; nothing changes on error.
    pub async fn cancel(&self, actor: UserId, id: BookingId) -> Result<BookingDetails> {
        self.apply(actor, id, Transition::Cancel).await
    }

    #[tracing::instrument(skip(self), fields(transition = transition.as_str()))]
    async fn apply(
        &self,
        actor: UserId,
        id: BookingId,
        transition: Transition,
    ) -> Result<BookingDetails> {
        self.authorize(actor)?;
        let booking = self.ledger.transition(id, transition, actor).await?;

        metrics::counter!("bookings.transitions", "transition" => transition.as_str()).increment(1);
        tracing::info!(booking_id = %id, status = %booking.status, "Transition applied");

        // The transition is already stored from here on
        let details = match self.ledger.get_details(id).await {
            Ok(details) => details,
            Err(error) => {
                tracing::warn!(
                    booking_id = %id,
                    %error,
                    "Booking details unavailable after transition"
                );
                let resource = self.catalog.get_resource(booking.resource_id).await?;
                BookingDetails { resource_name: resource.name, category: resource.category, booking }
            },
        };
        self.notifier
            .notify_requester(
                details.booking.user_id,
                &Outbound::StatusChanged { details: details.clone() },
            )
            .await;
        Ok(details)
    }

    /// Every resource, inactive ones included.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-moderators; storage errors otherwise.
    pub async fn list_resources(&self, actor: UserId) -> Result<Vec<ReservableResource>> {
        self.authorize(actor)?;
        self.catalog.list_all().await
    }

    /// Show or hide a resource.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-moderators, `NotFound` for an unknown resource.
    pub async fn toggle_resource(
        &self,
        actor: UserId,
        id: ResourceId,
        active: bool,
    ) -> Result<ReservableResource> {
        self.authorize(actor)?;
        let resource = self.catalog.set_active(id, active).await?;
        tracing::info!(resource_id = %id, active, %actor, "Resource toggled");
        Ok(resource)
    }

    /// Change prices, description, order or activation.
    ///
    /// # Errors
    ///
    /// `Forbidden`, `NotFound`, or `Validation` for negative prices.
    pub async fn update_resource(
        &self,
        actor: UserId,
        id: ResourceId,
        update: ResourceUpdate,
    ) -> Result<ReservableResource> {
        self.authorize(actor)?;
        self.catalog.update(id, update).await
    }

    /// Active bookings on one day across all resources.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-moderators; storage errors otherwise.
    pub async fn day_overview(&self, actor: UserId, date: NaiveDate) -> Result<Vec<BookingDetails>> {
        self.authorize(actor)?;
        self.ledger.list_for_date(date).await
    }
}
