use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, ServiceType};
use crate::entities::{driver_profile, user, vehicle};
use crate::error::{AppError, AppResult};
use crate::handlers::booking::{caller_for, BookingResponse, ContactInfo};
use crate::lifecycle;
use crate::store::SeaOrmBookingStore;
use crate::utils::jwt::Claims;
use crate::utils::response::ApiResponse;
use crate::AppState;

const AVAILABLE_FEED_LIMIT: u64 = 20;

async fn own_profile(state: &AppState, claims: &Claims) -> AppResult<driver_profile::Model> {
    driver_profile::Entity::find()
        .filter(driver_profile::Column::UserId.eq(claims.sub))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))
}

// ============ Profile ============

#[derive(Debug, Serialize)]
pub struct DriverProfileResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub license_number: String,
    pub is_online: bool,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Get the logged-in driver's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<DriverProfileResponse>>> {
    let profile = own_profile(&state, &claims).await?;
    let user = user::Entity::find_by_id(profile.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Driver user record missing".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Driver profile retrieved successfully",
        DriverProfileResponse {
            id: profile.id,
            full_name: user.full_name,
            email: user.email,
            phone_number: user.phone_number,
            license_number: profile.license_number,
            is_online: profile.is_online,
            last_lat: profile.last_lat,
            last_lng: profile.last_lng,
            created_at: profile.created_at.with_timezone(&Utc),
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct OnlineStatusRequest {
    pub is_online: bool,
}

/// Toggle online/offline availability
pub async fn update_online_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OnlineStatusRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let profile = own_profile(&state, &claims).await?;

    let mut active: driver_profile::ActiveModel = profile.into();
    active.is_online = Set(payload.is_online);
    let updated = active.update(&state.db).await?;

    tracing::info!(driver = %updated.id, online = updated.is_online, "driver availability changed");

    Ok(Json(ApiResponse::ok(
        "Online status updated successfully",
        serde_json::json!({ "id": updated.id, "is_online": updated.is_online }),
    )))
}

// ============ Vehicles ============

#[derive(Debug, Deserialize)]
pub struct RegisterVehicleRequest {
    pub vehicle_type: ServiceType,
    pub vehicle_number: String,
    pub vehicle_model: String,
}

/// Register a vehicle under the driver's profile
pub async fn register_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RegisterVehicleRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<vehicle::Model>>)> {
    if payload.vehicle_number.trim().is_empty() || payload.vehicle_model.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Vehicle number and model are required".to_string(),
        ));
    }

    let profile = own_profile(&state, &claims).await?;

    let existing = vehicle::Entity::find()
        .filter(vehicle::Column::VehicleNumber.eq(payload.vehicle_number.trim()))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Vehicle number already registered".to_string(),
        ));
    }

    let new_vehicle = vehicle::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_profile_id: Set(profile.id),
        vehicle_type: Set(payload.vehicle_type),
        vehicle_number: Set(payload.vehicle_number.trim().to_string()),
        vehicle_model: Set(payload.vehicle_model.trim().to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };

    let vehicle = new_vehicle.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Vehicle registered successfully", vehicle)),
    ))
}

/// List the driver's vehicles
pub async fn my_vehicles(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<Vec<vehicle::Model>>>> {
    let profile = own_profile(&state, &claims).await?;

    let vehicles = vehicle::Entity::find()
        .filter(vehicle::Column::DriverProfileId.eq(profile.id))
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Vehicles retrieved successfully",
        vehicles,
    )))
}

async fn owned_vehicle(
    state: &AppState,
    profile_id: Uuid,
    vehicle_id: Uuid,
) -> AppResult<vehicle::Model> {
    let vehicle = vehicle::Entity::find_by_id(vehicle_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

    if vehicle.driver_profile_id != profile_id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    Ok(vehicle)
}

#[derive(Debug, Deserialize)]
pub struct UpdateVehicleRequest {
    pub vehicle_type: Option<ServiceType>,
    pub vehicle_model: Option<String>,
    pub is_active: Option<bool>,
}

/// Update one of the driver's own vehicles
pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(vehicle_id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> AppResult<Json<ApiResponse<vehicle::Model>>> {
    let profile = own_profile(&state, &claims).await?;
    let vehicle = owned_vehicle(&state, profile.id, vehicle_id).await?;

    let mut active: vehicle::ActiveModel = vehicle.into();
    if let Some(vehicle_type) = payload.vehicle_type {
        active.vehicle_type = Set(vehicle_type);
    }
    if let Some(model) = payload.vehicle_model {
        if model.trim().is_empty() {
            return Err(AppError::BadRequest("Vehicle model cannot be empty".to_string()));
        }
        active.vehicle_model = Set(model.trim().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let updated = active.update(&state.db).await?;

    Ok(Json(ApiResponse::ok("Vehicle updated successfully", updated)))
}

/// Remove one of the driver's own vehicles. Past bookings keep their history;
/// the booking FK is set null on delete.
pub async fn remove_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let profile = own_profile(&state, &claims).await?;
    let vehicle = owned_vehicle(&state, profile.id, vehicle_id).await?;

    vehicle::Entity::delete_by_id(vehicle.id)
        .exec(&state.db)
        .await?;

    tracing::info!(driver = %profile.id, vehicle = %vehicle_id, "vehicle removed");

    Ok(Json(ApiResponse::message("Vehicle removed successfully")))
}

// ============ Booking feed & transitions ============

#[derive(Debug, Serialize)]
pub struct AvailableBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<ContactInfo>,
}

/// List unassigned pending bookings, newest first
pub async fn available_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<AvailableBookingResponse>>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .filter(booking::Column::DriverId.is_null())
        .order_by_desc(booking::Column::CreatedAt)
        .limit(AVAILABLE_FEED_LIMIT)
        .all(&state.db)
        .await?;

    let customer_ids: Vec<Uuid> = bookings.iter().map(|b| b.customer_id).collect();
    let customers = user::Entity::find()
        .filter(user::Column::Id.is_in(customer_ids))
        .all(&state.db)
        .await?;

    let responses = bookings
        .into_iter()
        .map(|b| {
            let customer = customers.iter().find(|u| u.id == b.customer_id).map(|u| {
                ContactInfo {
                    full_name: u.full_name.clone(),
                    phone_number: u.phone_number.clone(),
                }
            });
            AvailableBookingResponse {
                booking: BookingResponse::from_model(b),
                customer,
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(
        "Available bookings retrieved successfully",
        responses,
    )))
}

/// Accept a pending booking; loses cleanly if another driver got there first
pub async fn accept_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let caller = caller_for(&state, &claims).await?;

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::accept(&store, &caller, booking_id).await?;

    Ok(Json(ApiResponse::ok(
        "Booking accepted successfully",
        BookingResponse::from_model(booking),
    )))
}

/// Report arrival at the pickup point
pub async fn arrive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let caller = caller_for(&state, &claims).await?;

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::arrive(&store, &caller, booking_id).await?;

    Ok(Json(ApiResponse::ok(
        "Arrival recorded successfully",
        BookingResponse::from_model(booking),
    )))
}

/// Start the trip
pub async fn start_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let caller = caller_for(&state, &claims).await?;

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::start(&store, &caller, booking_id).await?;

    Ok(Json(ApiResponse::ok(
        "Trip started successfully",
        BookingResponse::from_model(booking),
    )))
}

#[derive(Debug, Deserialize)]
pub struct CompleteTripRequest {
    pub actual_fare: Option<f64>,
}

/// Complete the trip and capture the actual fare
pub async fn complete_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<CompleteTripRequest>>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let caller = caller_for(&state, &claims).await?;
    let actual_fare = payload.and_then(|Json(p)| p.actual_fare);

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::complete(&store, &caller, booking_id, actual_fare).await?;

    Ok(Json(ApiResponse::ok(
        "Trip completed successfully",
        BookingResponse::from_model(booking),
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Update the driver's live location during a trip. The booking must be
/// assigned to the caller and still active.
pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    if !(-90.0..=90.0).contains(&payload.lat) || !(-180.0..=180.0).contains(&payload.lng) {
        return Err(AppError::BadRequest("Invalid coordinates".to_string()));
    }

    let profile = own_profile(&state, &claims).await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.driver_id != Some(profile.id) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    if booking.status.is_terminal() {
        return Err(AppError::BadRequest(
            "Booking is no longer active".to_string(),
        ));
    }

    let mut active: driver_profile::ActiveModel = profile.into();
    active.last_lat = Set(Some(payload.lat));
    active.last_lng = Set(Some(payload.lng));
    let updated = active.update(&state.db).await?;

    Ok(Json(ApiResponse::ok(
        "Location updated successfully",
        serde_json::json!({
            "driver_profile_id": updated.id,
            "lat": updated.last_lat,
            "lng": updated.last_lng,
        }),
    )))
}
