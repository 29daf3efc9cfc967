use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::entities::driver_profile;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::create_token;
use crate::utils::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    /// CUSTOMER (default) or DRIVER. Admin accounts are seeded, not registered.
    pub role: Option<UserRole>,
    /// Required when registering as a driver.
    pub license_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: UserRole,
}

impl UserInfo {
    fn from_model(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone_number: user.phone_number,
            role: user.role,
        }
    }
}

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    if payload.full_name.trim().len() < 2 {
        return Err(AppError::BadRequest(
            "Full name must be at least 2 characters long".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(AppError::BadRequest(
            "Please provide a valid email address".to_string(),
        ));
    }
    if payload.phone_number.trim().len() < 10 {
        return Err(AppError::BadRequest(
            "Please provide a valid phone number".to_string(),
        ));
    }
    if payload.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters long".to_string(),
        ));
    }
    Ok(())
}

/// Register a new customer or driver account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    validate_registration(&payload)?;

    let role = payload.role.unwrap_or(UserRole::Customer);
    if role.is_admin() {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }
    if role == UserRole::Driver && payload.license_number.as_deref().unwrap_or("").trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "License number is required for driver registration".to_string(),
        ));
    }

    // Check if email already exists
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    // Create user
    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(payload.email.clone()),
        password_hash: Set(password_hash),
        full_name: Set(payload.full_name.trim().to_string()),
        phone_number: Set(payload.phone_number.trim().to_string()),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };

    let user = new_user.insert(&state.db).await?;

    // Drivers get a profile; bookings reference the profile id
    if role == UserRole::Driver {
        let profile = driver_profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            license_number: Set(payload
                .license_number
                .unwrap_or_default()
                .trim()
                .to_string()),
            is_online: Set(false),
            last_lat: Set(None),
            last_lng: Set(None),
            created_at: Set(Utc::now().into()),
        };
        profile.insert(&state.db).await?;
    }

    // Generate token
    let token = create_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    tracing::info!(user = %user.email, role = ?user.role, "account registered");

    Ok(Json(ApiResponse::ok(
        "Registration successful",
        AuthResponse {
            token,
            user: UserInfo::from_model(user),
        },
    )))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    // Find user by email
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&payload.email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".to_string()))?;

    // Generate token
    let token = create_token(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(ApiResponse::ok(
        "Login successful",
        AuthResponse {
            token,
            user: UserInfo::from_model(user),
        },
    )))
}
