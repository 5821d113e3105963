//! In-memory catalog and ledger.
//!
//! One lock guards resources and bookings together, so the slot check and
//! the insert in `create_booking` happen atomically.

use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use lakeside_core::availability::month_bounds;
use lakeside_core::environment::Clock;
use lakeside_core::types::default_catalog;
use lakeside_core::{
    Booking, BookingDetails, BookingError, BookingId, BookingLedger, BookingStatus, Category,
    NaiveDate, NewBooking, NewResource, ReservableResource, ResourceCatalog, ResourceId,
    ResourceUpdate, Result, Transition, UserId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<ResourceId, ReservableResource>,
    bookings: BTreeMap<BookingId, Booking>,
    next_resource: i64,
    next_booking: i64,
}

impl Inner {
    fn details(&self, booking: &Booking) -> Result<BookingDetails> {
        let resource = self
            .resources
            .get(&booking.resource_id)
            .ok_or_else(|| BookingError::resource_not_found(booking.resource_id))?;
        Ok(BookingDetails {
            booking: booking.clone(),
            resource_name: resource.name.clone(),
            category: resource.category,
        })
    }

    fn sort_key(&self, resource_id: ResourceId) -> (i32, ResourceId) {
        let order = self.resources.get(&resource_id).map_or(i32::MAX, |r| r.sort_order);
        (order, resource_id)
    }
}

/// Catalog and ledger kept in memory.
///
/// Implements both [`ResourceCatalog`] and [`BookingLedger`]. Cloning shares
/// the same data.
///
/// # Example
///
/// ```
/// use lakeside_testing::{InMemoryBookingStore, test_clock};
/// use std::sync::Arc;
///
/// let store = InMemoryBookingStore::seeded(Arc::new(test_clock()));
/// assert!(!store.resources().is_empty());
/// ```
#[derive(Clone)]
pub struct InMemoryBookingStore {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryBookingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBookingStore").finish_non_exhaustive()
    }
}

impl InMemoryBookingStore {
    /// Create an empty store
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { inner: Arc::new(Mutex::new(Inner::default())), clock }
    }

    /// Create a store holding the default catalog
    #[must_use]
    pub fn seeded(clock: Arc<dyn Clock>) -> Self {
        let store = Self::new(clock);
        for resource in default_catalog() {
            let name = resource.name.clone();
            if let Err(error) = store.insert_resource(resource) {
                tracing::warn!(%error, resource = %name, "Default resource rejected");
            }
        }
        store
    }

    /// Add a resource and return it with its identity
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the resource is invalid.
    pub fn insert_resource(&self, resource: NewResource) -> Result<ReservableResource> {
        resource.validate()?;
        let mut inner = self.lock()?;
        inner.next_resource += 1;
        let created = ReservableResource {
            id: ResourceId::new(inner.next_resource),
            name: resource.name,
            category: resource.category,
            capacity: resource.capacity,
            weekday_price: resource.weekday_price,
            weekend_price: resource.weekend_price,
            description: resource.description,
            is_active: true,
            sort_order: resource.sort_order,
        };
        inner.resources.insert(created.id, created.clone());
        Ok(created)
    }

    /// Snapshot of every resource, in identity order
    #[must_use]
    pub fn resources(&self) -> Vec<ReservableResource> {
        self.lock().map(|inner| inner.resources.values().cloned().collect()).unwrap_or_default()
    }

    /// Snapshot of every booking, in identity order
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().map(|inner| inner.bookings.values().cloned().collect()).unwrap_or_default()
    }

    /// First resource with the given name
    #[must_use]
    pub fn resource_named(&self, name: &str) -> Option<ReservableResource> {
        self.resources().into_iter().find(|r| r.name == name)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| BookingError::Storage("in-memory store lock poisoned".to_string()))
    }

    fn list_resources(&self, filter: impl Fn(&ReservableResource) -> bool) -> Result<Vec<ReservableResource>> {
        let inner = self.lock()?;
        let mut resources: Vec<_> = inner.resources.values().filter(|r| filter(r)).cloned().collect();
        resources.sort_by_key(|r| (r.sort_order, r.id));
        Ok(resources)
    }

    fn do_update(&self, id: ResourceId, update: &ResourceUpdate) -> Result<ReservableResource> {
        update.validate()?;
        let mut inner = self.lock()?;
        let resource = inner
            .resources
            .get_mut(&id)
            .ok_or_else(|| BookingError::resource_not_found(id))?;
        update.apply_to(resource);
        Ok(resource.clone())
    }

    fn do_create(&self, request: NewBooking) -> Result<BookingId> {
        let mut inner = self.lock()?;

        match inner.resources.get(&request.resource_id) {
            Some(resource) if resource.is_active => {},
            _ => return Err(BookingError::resource_not_found(request.resource_id)),
        }

        let taken = inner.bookings.values().any(|b| {
            b.resource_id == request.resource_id
                && b.booking_date == request.date
                && b.status.is_active()
        });
        if taken {
            return Err(BookingError::SlotTaken {
                resource_id: request.resource_id,
                date: request.date,
            });
        }

        inner.next_booking += 1;
        let id = BookingId::new(inner.next_booking);
        let now = self.clock.now();
        inner.bookings.insert(
            id,
            Booking {
                id,
                resource_id: request.resource_id,
                booking_date: request.date,
                user_id: request.requester,
                user_name: request.name,
                user_phone: request.phone,
                status: BookingStatus::Pending,
                created_at: now,
                updated_at: now,
                moderator_id: None,
            },
        );
        Ok(id)
    }

    fn do_transition(&self, id: BookingId, transition: Transition, moderator: UserId) -> Result<Booking> {
        let now = self.clock.now();
        let mut inner = self.lock()?;
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::booking_not_found(id))?;
        booking.apply(transition, moderator, now)?;
        Ok(booking.clone())
    }

    fn do_get(&self, id: BookingId) -> Result<Booking> {
        self.lock()?
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| BookingError::booking_not_found(id))
    }

    fn do_get_details(&self, id: BookingId) -> Result<BookingDetails> {
        let inner = self.lock()?;
        let booking = inner.bookings.get(&id).ok_or_else(|| BookingError::booking_not_found(id))?;
        inner.details(booking)
    }

    fn do_list_pending(&self) -> Result<Vec<BookingDetails>> {
        let inner = self.lock()?;
        let mut pending: Vec<&Booking> = inner
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending)
            .collect();
        pending.sort_by_key(|b| (b.created_at, b.id));
        pending.into_iter().map(|b| inner.details(b)).collect()
    }

    fn do_list_month(&self, resource_id: ResourceId, year: i32, month: u32) -> Result<Vec<Booking>> {
        let (first, next) = month_bounds(year, month)?;
        let inner = self.lock()?;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| {
                b.resource_id == resource_id
                    && b.status.is_active()
                    && b.booking_date >= first
                    && b.booking_date < next
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.booking_date, b.id));
        Ok(bookings)
    }

    fn do_list_for_date(&self, date: NaiveDate) -> Result<Vec<BookingDetails>> {
        let inner = self.lock()?;
        let mut on_date: Vec<&Booking> = inner
            .bookings
            .values()
            .filter(|b| b.booking_date == date && b.status.is_active())
            .collect();
        on_date.sort_by_key(|b| (inner.sort_key(b.resource_id), b.id));
        on_date.into_iter().map(|b| inner.details(b)).collect()
    }
}

impl ResourceCatalog for InMemoryBookingStore {
    fn list_active(&self, category: Option<Category>) -> BoxFuture<'_, Result<Vec<ReservableResource>>> {
        ready(self.list_resources(|r| r.is_active && category.is_none_or(|c| c == r.category)))
            .boxed()
    }

    fn list_all(&self) -> BoxFuture<'_, Result<Vec<ReservableResource>>> {
        ready(self.list_resources(|_| true)).boxed()
    }

    fn get_resource(&self, id: ResourceId) -> BoxFuture<'_, Result<ReservableResource>> {
        let found = self.lock().and_then(|inner| {
            inner.resources.get(&id).cloned().ok_or_else(|| BookingError::resource_not_found(id))
        });
        ready(found).boxed()
    }

    fn update(&self, id: ResourceId, update: ResourceUpdate) -> BoxFuture<'_, Result<ReservableResource>> {
        ready(self.do_update(id, &update)).boxed()
    }
}

impl BookingLedger for InMemoryBookingStore {
    fn create_booking(&self, booking: NewBooking) -> BoxFuture<'_, Result<BookingId>> {
        ready(self.do_create(booking)).boxed()
    }

    fn transition(
        &self,
        id: BookingId,
        transition: Transition,
        moderator: UserId,
    ) -> BoxFuture<'_, Result<Booking>> {
        ready(self.do_transition(id, transition, moderator)).boxed()
    }

    fn get(&self, id: BookingId) -> BoxFuture<'_, Result<Booking>> {
        ready(self.do_get(id)).boxed()
    }

    fn get_details(&self, id: BookingId) -> BoxFuture<'_, Result<BookingDetails>> {
        ready(self.do_get_details(id)).boxed()
    }

    fn list_pending(&self) -> BoxFuture<'_, Result<Vec<BookingDetails>>> {
        ready(self.do_list_pending()).boxed()
    }

    fn list_for_resource_month(
        &self,
        resource_id: ResourceId,
        year: i32,
        month: u32,
    ) -> BoxFuture<'_, Result<Vec<Booking>>> {
        ready(self.do_list_month(resource_id, year, month)).boxed()
    }

    fn list_for_date(&self, date: NaiveDate) -> BoxFuture<'_, Result<Vec<BookingDetails>>> {
        ready(self.do_list_for_date(date)).boxed()
    }
}
