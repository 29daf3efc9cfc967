use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentMethod, ServiceType};
use crate::entities::{driver_profile, user};
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::lifecycle::{self, Caller, NewBooking};
use crate::store::SeaOrmBookingStore;
use crate::utils::fare::estimate_fare;
use crate::utils::geo::haversine_distance;
use crate::utils::jwt::Claims;
use crate::utils::pagination::{PageMeta, PageParams, Paginated};
use crate::utils::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub service_type: ServiceType,
    pub pickup_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub pickup_at: DateTime<Utc>,
    /// Omitted: computed from the rate card and trip distance.
    pub estimated_fare: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub booking_number: String,
    pub status: BookingStatus,
    pub service_type: ServiceType,
    pub pickup_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub pickup_at: DateTime<Utc>,
    pub estimated_fare: f64,
    pub actual_fare: Option<f64>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub driver_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookingResponse {
    pub fn from_model(b: booking::Model) -> Self {
        Self {
            id: b.id,
            booking_number: b.booking_number,
            status: b.status,
            service_type: b.service_type,
            pickup_address: b.pickup_address,
            pickup_lat: b.pickup_lat,
            pickup_lng: b.pickup_lng,
            dropoff_address: b.dropoff_address,
            dropoff_lat: b.dropoff_lat,
            dropoff_lng: b.dropoff_lng,
            pickup_at: b.pickup_at.with_timezone(&Utc),
            estimated_fare: b.estimated_fare,
            actual_fare: b.actual_fare,
            payment_method: b.payment_method,
            notes: b.notes,
            driver_id: b.driver_id,
            started_at: b.started_at.map(|t| t.with_timezone(&Utc)),
            completed_at: b.completed_at.map(|t| t.with_timezone(&Utc)),
            created_at: b.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactInfo {
    pub full_name: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<ContactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<ContactInfo>,
}

/// Create a booking (customer)
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookingResponse>>)> {
    let estimated_fare = payload.estimated_fare.unwrap_or_else(|| {
        let distance = haversine_distance(
            payload.pickup_lat,
            payload.pickup_lng,
            payload.dropoff_lat,
            payload.dropoff_lng,
        );
        estimate_fare(payload.service_type, distance)
    });

    let new = NewBooking {
        service_type: payload.service_type,
        pickup_address: payload.pickup_address,
        pickup_lat: payload.pickup_lat,
        pickup_lng: payload.pickup_lng,
        dropoff_address: payload.dropoff_address,
        dropoff_lat: payload.dropoff_lat,
        dropoff_lng: payload.dropoff_lng,
        pickup_at: payload.pickup_at,
        estimated_fare,
        payment_method: payload.payment_method.unwrap_or(PaymentMethod::Cash),
        notes: payload.notes,
    };

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::create(&store, claims.sub, new).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Booking created successfully",
            BookingResponse::from_model(booking),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<BookingStatus>,
}

/// List the caller's own bookings, newest first (customer)
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<BookingResponse>>>> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let mut finder = booking::Entity::find()
        .filter(booking::Column::CustomerId.eq(claims.sub))
        .order_by_desc(booking::Column::CreatedAt);

    if let Some(status) = query.status {
        finder = finder.filter(booking::Column::Status.eq(status));
    }

    let paginator = finder.paginate(&state.db, params.limit());
    let total = paginator.num_items().await?;
    let bookings = paginator.fetch_page(params.page() - 1).await?;

    let items = bookings.into_iter().map(BookingResponse::from_model).collect();

    Ok(Json(ApiResponse::ok(
        "Bookings retrieved successfully",
        Paginated {
            items,
            pagination: PageMeta::new(params.page(), params.limit(), total),
        },
    )))
}

/// Read one booking: owner, assigned driver, or admin
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingDetailResponse>>> {
    let caller = caller_for(&state, &claims).await?;

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::fetch(&store, &caller, booking_id).await?;

    let customer = user::Entity::find_by_id(booking.customer_id)
        .one(&state.db)
        .await?
        .map(|u| ContactInfo {
            full_name: u.full_name,
            phone_number: u.phone_number,
        });

    let driver = match booking.driver_id {
        Some(profile_id) => driver_contact(&state, profile_id).await?,
        None => None,
    };

    Ok(Json(ApiResponse::ok(
        "Booking retrieved successfully",
        BookingDetailResponse {
            booking: BookingResponse::from_model(booking),
            customer,
            driver,
        },
    )))
}

/// Cancel a booking (customer-owner)
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::cancel(&store, &Caller::customer(claims.sub), booking_id).await?;

    Ok(Json(ApiResponse::ok(
        "Booking cancelled successfully",
        BookingResponse::from_model(booking),
    )))
}

/// Resolve the lifecycle caller for the authenticated user. Drivers act
/// through their profile id.
pub async fn caller_for(state: &AppState, claims: &Claims) -> AppResult<Caller> {
    let driver_profile = match claims.role {
        UserRole::Driver => {
            let profile = driver_profile::Entity::find()
                .filter(driver_profile::Column::UserId.eq(claims.sub))
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))?;
            Some(profile.id)
        }
        _ => None,
    };

    Ok(Caller {
        user_id: claims.sub,
        role: claims.role,
        driver_profile,
    })
}

async fn driver_contact(state: &AppState, profile_id: Uuid) -> AppResult<Option<ContactInfo>> {
    let Some(profile) = driver_profile::Entity::find_by_id(profile_id)
        .one(&state.db)
        .await?
    else {
        return Ok(None);
    };

    Ok(user::Entity::find_by_id(profile.user_id)
        .one(&state.db)
        .await?
        .map(|u| ContactInfo {
            full_name: u.full_name,
            phone_number: u.phone_number,
        }))
}
