//! Booking lifecycle state machine.
//!
//! Every operation reads fresh state from the [`BookingStore`] and writes a
//! single transition. The only multi-writer race is `accept`, which is settled
//! by the store's atomic claim; all other transitions are single-writer
//! (customer- or assigned-driver-exclusive).

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentMethod, ServiceType};
use crate::entities::user::UserRole;
use crate::store::{BookingStore, TransitionFields};
use crate::utils::ids::generate_booking_number;

/// Identity of the caller, resolved from the JWT claims by the handler layer.
/// `driver_profile` is the driver's profile id, present only for drivers.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: UserRole,
    pub driver_profile: Option<Uuid>,
}

impl Caller {
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: UserRole::Customer,
            driver_profile: None,
        }
    }

    pub fn driver(user_id: Uuid, profile_id: Uuid) -> Self {
        Self {
            user_id,
            role: UserRole::Driver,
            driver_profile: Some(profile_id),
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: UserRole::Admin,
            driver_profile: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),
    #[error("Booking not found")]
    NotFound,
    #[error("Access denied")]
    AccessDenied,
    /// The accept race was lost or the booking already left `Pending`.
    #[error("Booking is not available for assignment")]
    NotAvailable,
    #[error("Booking cannot be cancelled at this stage")]
    NotCancellable,
    #[error("Cannot {event} a booking in status {from:?}")]
    InvalidTransition {
        event: &'static str,
        from: BookingStatus,
    },
    #[error("store failure: {0}")]
    Store(#[from] sea_orm::DbErr),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Validated input for booking creation.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub service_type: ServiceType,
    pub pickup_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub pickup_at: DateTime<Utc>,
    pub estimated_fare: f64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

fn validate_coords(lat: f64, lng: f64, which: &str) -> LifecycleResult<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(LifecycleError::Validation(format!(
            "Invalid {which} coordinates"
        )));
    }
    Ok(())
}

/// Create a booking in `Pending` with no driver. Validation failures are
/// reported before any store access.
pub async fn create(
    store: &dyn BookingStore,
    customer_id: Uuid,
    new: NewBooking,
) -> LifecycleResult<booking::Model> {
    if new.pickup_address.trim().is_empty() || new.dropoff_address.trim().is_empty() {
        return Err(LifecycleError::Validation(
            "Pickup and dropoff addresses are required".to_string(),
        ));
    }
    validate_coords(new.pickup_lat, new.pickup_lng, "pickup")?;
    validate_coords(new.dropoff_lat, new.dropoff_lng, "dropoff")?;
    if new.pickup_at <= Utc::now() {
        return Err(LifecycleError::Validation(
            "Pickup time must be in the future".to_string(),
        ));
    }
    if new.estimated_fare < 0.0 || !new.estimated_fare.is_finite() {
        return Err(LifecycleError::Validation(
            "Estimated fare must be a non-negative amount".to_string(),
        ));
    }

    let now = Utc::now();
    let booking = booking::Model {
        id: Uuid::new_v4(),
        booking_number: generate_booking_number(),
        customer_id,
        driver_id: None,
        vehicle_id: None,
        service_type: new.service_type,
        pickup_address: new.pickup_address,
        pickup_lat: new.pickup_lat,
        pickup_lng: new.pickup_lng,
        dropoff_address: new.dropoff_address,
        dropoff_lat: new.dropoff_lat,
        dropoff_lng: new.dropoff_lng,
        pickup_at: new.pickup_at.into(),
        estimated_fare: new.estimated_fare,
        actual_fare: None,
        payment_method: new.payment_method,
        notes: new.notes,
        status: BookingStatus::Pending,
        started_at: None,
        completed_at: None,
        created_at: now.into(),
        updated_at: now.into(),
    };

    let booking = store.insert(booking).await?;
    tracing::info!(booking_number = %booking.booking_number, "booking created");
    Ok(booking)
}

/// Driver accepts a pending booking. The store claim is the authority: if the
/// conditional update matches no row, someone else took it (or it moved on)
/// and the caller gets `NotAvailable`. Never retried here.
pub async fn accept(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
) -> LifecycleResult<booking::Model> {
    let profile_id = caller.driver_profile.ok_or(LifecycleError::AccessDenied)?;

    // Fast pre-check for a friendlier error; the claim below re-checks
    // against live state, so a stale read here cannot double-assign.
    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;
    if booking.status != BookingStatus::Pending || booking.driver_id.is_some() {
        return Err(LifecycleError::NotAvailable);
    }

    if !store.claim(booking_id, profile_id).await? {
        return Err(LifecycleError::NotAvailable);
    }

    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;
    tracing::info!(booking_number = %booking.booking_number, driver = %profile_id, "booking accepted");
    Ok(booking)
}

/// Assigned driver reports arrival at the pickup point.
pub async fn arrive(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
) -> LifecycleResult<booking::Model> {
    let booking = assigned_booking(store, caller, booking_id).await?;

    match booking.status {
        BookingStatus::DriverAssigned => {}
        from => return Err(LifecycleError::InvalidTransition { event: "arrive", from }),
    }

    let updated = store
        .transition(booking_id, BookingStatus::DriverArrived, TransitionFields::default())
        .await?;
    tracing::info!(booking_number = %updated.booking_number, "driver arrived");
    Ok(updated)
}

/// Start the trip. Arrival reporting is optional, so both `DriverAssigned`
/// and `DriverArrived` are accepted as predecessors.
pub async fn start(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
) -> LifecycleResult<booking::Model> {
    let booking = assigned_booking(store, caller, booking_id).await?;

    match booking.status {
        BookingStatus::DriverAssigned | BookingStatus::DriverArrived => {}
        from => return Err(LifecycleError::InvalidTransition { event: "start", from }),
    }

    let fields = TransitionFields {
        started_at: Some(Utc::now()),
        ..Default::default()
    };
    let updated = store
        .transition(booking_id, BookingStatus::InProgress, fields)
        .await?;
    tracing::info!(booking_number = %updated.booking_number, "trip started");
    Ok(updated)
}

/// Complete the trip, capturing the actual fare (defaults to the estimate).
pub async fn complete(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
    actual_fare: Option<f64>,
) -> LifecycleResult<booking::Model> {
    let booking = assigned_booking(store, caller, booking_id).await?;

    match booking.status {
        BookingStatus::InProgress => {}
        from => return Err(LifecycleError::InvalidTransition { event: "complete", from }),
    }

    if let Some(fare) = actual_fare {
        if fare < 0.0 || !fare.is_finite() {
            return Err(LifecycleError::Validation(
                "Actual fare must be a non-negative amount".to_string(),
            ));
        }
    }

    let fields = TransitionFields {
        completed_at: Some(Utc::now()),
        actual_fare: Some(actual_fare.unwrap_or(booking.estimated_fare)),
        ..Default::default()
    };
    let updated = store
        .transition(booking_id, BookingStatus::Completed, fields)
        .await?;
    tracing::info!(booking_number = %updated.booking_number, fare = updated.actual_fare, "trip completed");
    Ok(updated)
}

/// Cancel a booking. Customers may cancel their own bookings while the status
/// is still in the cancellable window; admins may cancel any non-terminal
/// pre-trip booking.
pub async fn cancel(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
) -> LifecycleResult<booking::Model> {
    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;

    match caller.role {
        UserRole::Customer if booking.customer_id == caller.user_id => {}
        UserRole::Admin | UserRole::SuperAdmin => {}
        _ => return Err(LifecycleError::AccessDenied),
    }

    if !booking.status.is_cancellable() {
        return Err(LifecycleError::NotCancellable);
    }

    let updated = store
        .transition(booking_id, BookingStatus::Cancelled, TransitionFields::default())
        .await?;
    tracing::info!(booking_number = %updated.booking_number, "booking cancelled");
    Ok(updated)
}

/// Read a booking, enforcing the per-entity visibility rule: customers see
/// their own, drivers see bookings assigned to them, admins see all.
pub async fn fetch(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
) -> LifecycleResult<booking::Model> {
    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;

    match caller.role {
        UserRole::Customer if booking.customer_id == caller.user_id => {}
        UserRole::Driver if booking.driver_id.is_some() && booking.driver_id == caller.driver_profile => {}
        UserRole::Admin | UserRole::SuperAdmin => {}
        _ => return Err(LifecycleError::AccessDenied),
    }

    Ok(booking)
}

/// Admin force-assignment of a driver to a pending booking. Uses the same
/// atomic claim as the driver-initiated accept.
pub async fn force_assign(
    store: &dyn BookingStore,
    booking_id: Uuid,
    driver_profile_id: Uuid,
) -> LifecycleResult<booking::Model> {
    store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;

    if !store.claim(booking_id, driver_profile_id).await? {
        return Err(LifecycleError::NotAvailable);
    }

    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;
    tracing::warn!(booking_number = %booking.booking_number, driver = %driver_profile_id, "admin force-assigned driver");
    Ok(booking)
}

/// Admin status override. Terminal bookings stay put; everything else may be
/// forced to the requested status. Audit-logged.
pub async fn override_status(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
    status: BookingStatus,
) -> LifecycleResult<booking::Model> {
    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;

    if booking.status.is_terminal() {
        return Err(LifecycleError::InvalidTransition {
            event: "override",
            from: booking.status,
        });
    }

    let updated = store
        .transition(booking_id, status, TransitionFields::default())
        .await?;
    tracing::warn!(
        booking_number = %updated.booking_number,
        admin = %caller.user_id,
        from = ?booking.status,
        to = ?status,
        "admin overrode booking status"
    );
    Ok(updated)
}

/// Fetch a booking and verify the caller is its assigned driver.
async fn assigned_booking(
    store: &dyn BookingStore,
    caller: &Caller,
    booking_id: Uuid,
) -> LifecycleResult<booking::Model> {
    let profile_id = caller.driver_profile.ok_or(LifecycleError::AccessDenied)?;

    let booking = store
        .find(booking_id)
        .await?
        .ok_or(LifecycleError::NotFound)?;

    if booking.driver_id != Some(profile_id) {
        return Err(LifecycleError::AccessDenied);
    }

    Ok(booking)
}
