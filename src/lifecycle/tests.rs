use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::entities::booking::{BookingStatus, PaymentMethod, ServiceType};
use crate::store::memory::MemoryBookingStore;
use crate::store::BookingStore;

use super::*;

fn valid_booking() -> NewBooking {
    NewBooking {
        service_type: ServiceType::TwoWheeler,
        pickup_address: "12 MG Road, Bengaluru".to_string(),
        pickup_lat: 12.9757,
        pickup_lng: 77.6050,
        dropoff_address: "1 Residency Road, Bengaluru".to_string(),
        dropoff_lat: 12.9719,
        dropoff_lng: 77.6109,
        pickup_at: Utc::now() + Duration::hours(2),
        estimated_fare: 120.0,
        payment_method: PaymentMethod::Cash,
        notes: None,
    }
}

async fn pending_booking(store: &MemoryBookingStore, customer: Uuid) -> booking::Model {
    create(store, customer, valid_booking()).await.unwrap()
}

#[tokio::test]
async fn create_starts_pending_with_no_driver() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();

    let booking = pending_booking(&store, customer).await;

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.customer_id, customer);
    assert!(booking.driver_id.is_none());
    assert!(booking.booking_number.starts_with("BK"));
    assert!(!booking.booking_number.is_empty());
}

#[tokio::test]
async fn create_generates_distinct_booking_numbers() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();

    let a = pending_booking(&store, customer).await;
    let b = pending_booking(&store, customer).await;

    assert_ne!(a.booking_number, b.booking_number);
}

#[tokio::test]
async fn create_rejects_past_pickup_time_before_persisting() {
    let store = MemoryBookingStore::new();
    let mut new = valid_booking();
    new.pickup_at = Utc::now() - Duration::minutes(5);

    let err = create(&store, Uuid::new_v4(), new).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Validation(_)));
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn create_rejects_out_of_range_coordinates() {
    let store = MemoryBookingStore::new();
    let mut new = valid_booking();
    new.pickup_lat = 91.0;

    let err = create(&store, Uuid::new_v4(), new).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Validation(_)));
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn create_rejects_negative_fare() {
    let store = MemoryBookingStore::new();
    let mut new = valid_booking();
    new.estimated_fare = -10.0;

    let err = create(&store, Uuid::new_v4(), new).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Validation(_)));
}

#[tokio::test]
async fn accept_assigns_driver_once() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;

    let d1 = Caller::driver(Uuid::new_v4(), Uuid::new_v4());
    let accepted = accept(&store, &d1, booking.id).await.unwrap();

    assert_eq!(accepted.status, BookingStatus::DriverAssigned);
    assert_eq!(accepted.driver_id, d1.driver_profile);

    let d2 = Caller::driver(Uuid::new_v4(), Uuid::new_v4());
    let err = accept(&store, &d2, booking.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotAvailable));

    // First assignment stands
    let current = store.find(booking.id).await.unwrap().unwrap();
    assert_eq!(current.driver_id, d1.driver_profile);
}

#[tokio::test]
async fn concurrent_accepts_have_exactly_one_winner() {
    let store = Arc::new(MemoryBookingStore::new());
    let booking = pending_booking(&store, Uuid::new_v4()).await;

    let drivers: Vec<Caller> = (0..8)
        .map(|_| Caller::driver(Uuid::new_v4(), Uuid::new_v4()))
        .collect();

    let mut handles = Vec::new();
    for caller in drivers.clone() {
        let store = Arc::clone(&store);
        let id = booking.id;
        handles.push(tokio::spawn(async move {
            accept(store.as_ref(), &caller, id).await
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(b) => winners.push(b),
            Err(LifecycleError::NotAvailable) => losers += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(losers, drivers.len() - 1);

    let current = store.find(booking.id).await.unwrap().unwrap();
    assert_eq!(current.status, BookingStatus::DriverAssigned);
    assert_eq!(current.driver_id, winners[0].driver_id);
}

#[tokio::test]
async fn accept_unknown_booking_is_not_found() {
    let store = MemoryBookingStore::new();
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    let err = accept(&store, &driver, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound));
}

#[tokio::test]
async fn accept_without_driver_profile_is_denied() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;

    let caller = Caller::customer(Uuid::new_v4());
    let err = accept(&store, &caller, booking.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AccessDenied));
}

#[tokio::test]
async fn cancel_succeeds_while_pending() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;

    let cancelled = cancel(&store, &Caller::customer(customer), booking.id)
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(cancelled.driver_id.is_none());
}

#[tokio::test]
async fn cancel_succeeds_after_driver_assignment() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;

    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());
    accept(&store, &driver, booking.id).await.unwrap();

    let cancelled = cancel(&store, &Caller::customer(customer), booking.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn cancel_refused_once_trip_in_progress() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;

    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());
    accept(&store, &driver, booking.id).await.unwrap();
    start(&store, &driver, booking.id).await.unwrap();

    let err = cancel(&store, &Caller::customer(customer), booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotCancellable));

    // Status unchanged
    let current = store.find(booking.id).await.unwrap().unwrap();
    assert_eq!(current.status, BookingStatus::InProgress);
}

#[tokio::test]
async fn cancel_by_another_customer_is_denied() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;

    let stranger = Caller::customer(Uuid::new_v4());
    let err = cancel(&store, &stranger, booking.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AccessDenied));
}

#[tokio::test]
async fn admin_may_cancel_any_pre_trip_booking() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;

    let cancelled = cancel(&store, &Caller::admin(Uuid::new_v4()), booking.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn arrive_then_start_then_complete() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    accept(&store, &driver, booking.id).await.unwrap();

    let arrived = arrive(&store, &driver, booking.id).await.unwrap();
    assert_eq!(arrived.status, BookingStatus::DriverArrived);

    let started = start(&store, &driver, booking.id).await.unwrap();
    assert_eq!(started.status, BookingStatus::InProgress);
    assert!(started.started_at.is_some());

    let completed = complete(&store, &driver, booking.id, Some(180.0))
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(completed.actual_fare, Some(180.0));
    assert!(completed.completed_at.is_some());
}

#[tokio::test]
async fn start_is_allowed_without_arrival_report() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    accept(&store, &driver, booking.id).await.unwrap();
    let started = start(&store, &driver, booking.id).await.unwrap();
    assert_eq!(started.status, BookingStatus::InProgress);
}

#[tokio::test]
async fn transitions_by_unassigned_driver_are_denied() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let assigned = Caller::driver(Uuid::new_v4(), Uuid::new_v4());
    let other = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    accept(&store, &assigned, booking.id).await.unwrap();

    for result in [
        arrive(&store, &other, booking.id).await,
        start(&store, &other, booking.id).await,
        complete(&store, &other, booking.id, None).await,
    ] {
        assert!(matches!(result.unwrap_err(), LifecycleError::AccessDenied));
    }
}

#[tokio::test]
async fn complete_defaults_to_estimated_fare() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    accept(&store, &driver, booking.id).await.unwrap();
    start(&store, &driver, booking.id).await.unwrap();
    let completed = complete(&store, &driver, booking.id, None).await.unwrap();

    assert_eq!(completed.actual_fare, Some(booking.estimated_fare));
}

#[tokio::test]
async fn completed_booking_admits_no_further_operations() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    accept(&store, &driver, booking.id).await.unwrap();
    start(&store, &driver, booking.id).await.unwrap();
    complete(&store, &driver, booking.id, None).await.unwrap();

    let late_driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());
    assert!(matches!(
        accept(&store, &late_driver, booking.id).await.unwrap_err(),
        LifecycleError::NotAvailable
    ));
    assert!(matches!(
        cancel(&store, &Caller::customer(customer), booking.id)
            .await
            .unwrap_err(),
        LifecycleError::NotCancellable
    ));
    assert!(matches!(
        start(&store, &driver, booking.id).await.unwrap_err(),
        LifecycleError::InvalidTransition { .. }
    ));

    // Completed is terminal: the stored row never moved backward.
    let current = store.find(booking.id).await.unwrap().unwrap();
    assert_eq!(current.status, BookingStatus::Completed);
}

#[tokio::test]
async fn arrive_refused_after_trip_started() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    accept(&store, &driver, booking.id).await.unwrap();
    start(&store, &driver, booking.id).await.unwrap();

    let err = arrive(&store, &driver, booking.id).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: BookingStatus::InProgress,
            ..
        }
    ));
}

#[tokio::test]
async fn fetch_enforces_visibility_rules() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;
    let driver = Caller::driver(Uuid::new_v4(), Uuid::new_v4());

    // Owner sees it
    fetch(&store, &Caller::customer(customer), booking.id)
        .await
        .unwrap();

    // Another customer does not
    let err = fetch(&store, &Caller::customer(Uuid::new_v4()), booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::AccessDenied));

    // Unassigned driver does not
    let err = fetch(&store, &driver, booking.id).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AccessDenied));

    // After accepting, the assigned driver does
    accept(&store, &driver, booking.id).await.unwrap();
    fetch(&store, &driver, booking.id).await.unwrap();

    // Admins always do
    fetch(&store, &Caller::admin(Uuid::new_v4()), booking.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn repeated_reads_are_stable_absent_writes() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;
    let caller = Caller::customer(customer);

    let first = fetch(&store, &caller, booking.id).await.unwrap();
    let second = fetch(&store, &caller, booking.id).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.driver_id, second.driver_id);
    assert_eq!(first, second);
}

#[tokio::test]
async fn force_assign_claims_pending_booking() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let profile = Uuid::new_v4();

    let assigned = force_assign(&store, booking.id, profile).await.unwrap();
    assert_eq!(assigned.status, BookingStatus::DriverAssigned);
    assert_eq!(assigned.driver_id, Some(profile));

    // Second force-assign loses the claim
    let err = force_assign(&store, booking.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotAvailable));
}

#[tokio::test]
async fn override_refuses_terminal_bookings() {
    let store = MemoryBookingStore::new();
    let customer = Uuid::new_v4();
    let booking = pending_booking(&store, customer).await;
    let admin = Caller::admin(Uuid::new_v4());

    cancel(&store, &Caller::customer(customer), booking.id)
        .await
        .unwrap();

    let err = override_status(&store, &admin, booking.id, BookingStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
}

#[tokio::test]
async fn override_moves_non_terminal_booking() {
    let store = MemoryBookingStore::new();
    let booking = pending_booking(&store, Uuid::new_v4()).await;
    let admin = Caller::admin(Uuid::new_v4());

    let updated = override_status(&store, &admin, booking.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(updated.status, BookingStatus::Confirmed);
}
