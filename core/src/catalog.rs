//! The resource catalog boundary.

use crate::error::Result;
use crate::types::{Category, ResourceId, ResourceUpdate, ReservableResource};
use futures::future::BoxFuture;

/// Storage of reservable resources.
///
/// Resources are never hard-deleted; deactivation is the only removal path.
/// All list operations order by `sort_order` ascending, then by identity.
///
/// Methods return boxed futures so the trait can be used as
/// `Arc<dyn ResourceCatalog>`.
pub trait ResourceCatalog: Send + Sync {
    /// Active resources, optionally restricted to one category
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`](crate::BookingError::Storage) on persistence failure.
    fn list_active(
        &self,
        category: Option<Category>,
    ) -> BoxFuture<'_, Result<Vec<ReservableResource>>>;

    /// All resources, including inactive ones
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`](crate::BookingError::Storage) on persistence failure.
    fn list_all(&self) -> BoxFuture<'_, Result<Vec<ReservableResource>>>;

    /// One resource by identity, active or not
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`](crate::BookingError::NotFound) if absent.
    fn get_resource(&self, id: ResourceId) -> BoxFuture<'_, Result<ReservableResource>>;

    /// Applies a whitelisted update and returns the updated resource
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`](crate::BookingError::Validation) for
    /// negative prices and [`BookingError::NotFound`](crate::BookingError::NotFound)
    /// if the resource does not exist.
    fn update(
        &self,
        id: ResourceId,
        update: ResourceUpdate,
    ) -> BoxFuture<'_, Result<ReservableResource>>;

    /// Sets the active flag
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`](crate::BookingError::NotFound) if absent.
    fn set_active(&self, id: ResourceId, active: bool)
    -> BoxFuture<'_, Result<ReservableResource>> {
        self.update(id, ResourceUpdate { is_active: Some(active), ..ResourceUpdate::default() })
    }

    /// Soft delete; existing bookings are untouched
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`](crate::BookingError::NotFound) if absent.
    fn deactivate(&self, id: ResourceId) -> BoxFuture<'_, Result<ReservableResource>> {
        self.set_active(id, false)
    }
}
