use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::{driver_profile, vehicle};
use crate::error::{AppError, AppResult};
use crate::handlers::booking::{BookingListQuery, BookingResponse, ContactInfo};
use crate::lifecycle::{self, Caller};
use crate::store::SeaOrmBookingStore;
use crate::utils::jwt::Claims;
use crate::utils::pagination::{PageMeta, PageParams, Paginated};
use crate::utils::response::ApiResponse;
use crate::AppState;

// ============ Dashboard ============

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_drivers: u64,
    pub total_bookings: u64,
    pub todays_bookings: u64,
    pub online_drivers: u64,
    pub pending_bookings: u64,
}

/// Aggregate counts for the admin dashboard
pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let today_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

    let total_users = user::Entity::find().count(&state.db).await?;
    let total_drivers = driver_profile::Entity::find().count(&state.db).await?;
    let total_bookings = booking::Entity::find().count(&state.db).await?;
    let todays_bookings = booking::Entity::find()
        .filter(booking::Column::CreatedAt.gte(today_start))
        .count(&state.db)
        .await?;
    let online_drivers = driver_profile::Entity::find()
        .filter(driver_profile::Column::IsOnline.eq(true))
        .count(&state.db)
        .await?;
    let pending_bookings = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .count(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Dashboard stats retrieved successfully",
        DashboardStats {
            total_users,
            total_drivers,
            total_bookings,
            todays_bookings,
            online_drivers,
            pending_bookings,
        },
    )))
}

// ============ Booking oversight ============

#[derive(Debug, Serialize)]
pub struct AdminBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<ContactInfo>,
}

/// List all bookings, paginated and filterable by status
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<AdminBookingResponse>>>> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let mut finder = booking::Entity::find().order_by_desc(booking::Column::CreatedAt);
    if let Some(status) = query.status {
        finder = finder.filter(booking::Column::Status.eq(status));
    }

    let paginator = finder.paginate(&state.db, params.limit());
    let total = paginator.num_items().await?;
    let bookings = paginator.fetch_page(params.page() - 1).await?;

    let customer_ids: Vec<Uuid> = bookings.iter().map(|b| b.customer_id).collect();
    let customers = user::Entity::find()
        .filter(user::Column::Id.is_in(customer_ids))
        .all(&state.db)
        .await?;

    let items = bookings
        .into_iter()
        .map(|b| {
            let customer = customers.iter().find(|u| u.id == b.customer_id).map(|u| {
                ContactInfo {
                    full_name: u.full_name.clone(),
                    phone_number: u.phone_number.clone(),
                }
            });
            AdminBookingResponse {
                booking: BookingResponse::from_model(b),
                customer,
            }
        })
        .collect();

    Ok(Json(ApiResponse::ok(
        "Bookings retrieved successfully",
        Paginated {
            items,
            pagination: PageMeta::new(params.page(), params.limit(), total),
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_profile_id: Uuid,
}

/// Force-assign a driver to a pending booking
pub async fn assign_driver(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<AssignDriverRequest>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    // Validate the target is a real driver profile
    driver_profile::Entity::find_by_id(payload.driver_profile_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Driver profile not found".to_string()))?;

    let store = SeaOrmBookingStore::new(&state.db);
    let booking = lifecycle::force_assign(&store, booking_id, payload.driver_profile_id).await?;

    Ok(Json(ApiResponse::ok(
        "Driver assigned successfully",
        BookingResponse::from_model(booking),
    )))
}

#[derive(Debug, Deserialize)]
pub struct OverrideStatusRequest {
    pub status: BookingStatus,
}

/// Override a booking's status (audit-logged; terminal bookings stay put)
pub async fn update_booking_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<OverrideStatusRequest>,
) -> AppResult<Json<ApiResponse<BookingResponse>>> {
    let caller = Caller {
        user_id: claims.sub,
        role: claims.role,
        driver_profile: None,
    };

    let store = SeaOrmBookingStore::new(&state.db);
    let booking =
        lifecycle::override_status(&store, &caller, booking_id, payload.status).await?;

    Ok(Json(ApiResponse::ok(
        "Booking status updated successfully",
        BookingResponse::from_model(booking),
    )))
}

// ============ User management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    fn from_model(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            phone_number: u.phone_number,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<UserRole>,
}

/// List all users, paginated and filterable by role
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<Paginated<UserResponse>>>> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    };

    let mut finder = user::Entity::find().order_by_desc(user::Column::CreatedAt);
    if let Some(role) = query.role {
        finder = finder.filter(user::Column::Role.eq(role));
    }

    let paginator = finder.paginate(&state.db, params.limit());
    let total = paginator.num_items().await?;
    let users = paginator.fetch_page(params.page() - 1).await?;

    Ok(Json(ApiResponse::ok(
        "Users retrieved successfully",
        Paginated {
            items: users.into_iter().map(UserResponse::from_model).collect(),
            pagination: PageMeta::new(params.page(), params.limit(), total),
        },
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// Change a user's role. Super admin accounts are off limits, and demoting a
/// driver takes their profile offline; bookings are history and stay intact.
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let target = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if target.role == UserRole::SuperAdmin || payload.role == UserRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Super admin role cannot be changed".to_string(),
        ));
    }

    let old_role = target.role;
    if old_role == UserRole::Driver && payload.role != UserRole::Driver {
        if let Some(profile) = driver_profile::Entity::find()
            .filter(driver_profile::Column::UserId.eq(user_id))
            .one(&state.db)
            .await?
        {
            let mut active: driver_profile::ActiveModel = profile.into();
            active.is_online = Set(false);
            active.update(&state.db).await?;
        }
    }

    let mut active: user::ActiveModel = target.into();
    active.role = Set(payload.role);
    let updated = active.update(&state.db).await?;

    tracing::warn!(
        admin = %claims.sub,
        user = %updated.id,
        from = ?old_role,
        to = ?updated.role,
        "user role changed"
    );

    Ok(Json(ApiResponse::ok(
        "User role updated successfully",
        UserResponse::from_model(updated),
    )))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Activate or deactivate an account. Accounts are never deleted; bookings
/// reference them for history.
pub async fn set_user_active(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> AppResult<Json<ApiResponse<UserResponse>>> {
    let target = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if target.role == UserRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Super admin accounts cannot be deactivated".to_string(),
        ));
    }

    let mut active: user::ActiveModel = target.into();
    active.is_active = Set(payload.is_active);
    let updated = active.update(&state.db).await?;

    tracing::warn!(
        admin = %claims.sub,
        user = %updated.id,
        active = updated.is_active,
        "user activation changed"
    );

    Ok(Json(ApiResponse::ok(
        "User updated successfully",
        UserResponse::from_model(updated),
    )))
}

// ============ Drivers ============

#[derive(Debug, Serialize)]
pub struct DriverSummary {
    pub profile_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub license_number: String,
    pub is_online: bool,
    pub vehicles: Vec<vehicle::Model>,
}

/// List all driver profiles with vehicles
pub async fn list_drivers(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<DriverSummary>>>> {
    let profiles = driver_profile::Entity::find().all(&state.db).await?;
    let users = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Driver))
        .all(&state.db)
        .await?;
    let vehicles = vehicle::Entity::find().all(&state.db).await?;

    let summaries = profiles
        .into_iter()
        .filter_map(|p| {
            let user = users.iter().find(|u| u.id == p.user_id)?;
            let vehicles = vehicles
                .iter()
                .filter(|v| v.driver_profile_id == p.id)
                .cloned()
                .collect();
            Some(DriverSummary {
                profile_id: p.id,
                full_name: user.full_name.clone(),
                email: user.email.clone(),
                phone_number: user.phone_number.clone(),
                license_number: p.license_number,
                is_online: p.is_online,
                vehicles,
            })
        })
        .collect();

    Ok(Json(ApiResponse::ok(
        "Drivers retrieved successfully",
        summaries,
    )))
}
