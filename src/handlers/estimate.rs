use axum::Json;
use serde::{Deserialize, Serialize};

use crate::entities::booking::ServiceType;
use crate::error::{AppError, AppResult};
use crate::utils::fare::{estimate_fare, rate_card};
use crate::utils::geo::haversine_distance;
use crate::utils::response::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub service_type: ServiceType,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub service_type: ServiceType,
    pub distance_km: f64,
    pub base_fare: f64,
    pub per_km: f64,
    pub minimum_fare: f64,
    pub estimated_fare: f64,
    pub currency: &'static str,
}

fn valid_coords(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Fare estimate for a prospective trip. Public, no account needed.
pub async fn get_estimate(
    Json(payload): Json<EstimateRequest>,
) -> AppResult<Json<ApiResponse<EstimateResponse>>> {
    if !valid_coords(payload.pickup_lat, payload.pickup_lng)
        || !valid_coords(payload.dropoff_lat, payload.dropoff_lng)
    {
        return Err(AppError::BadRequest(
            "Coordinates are out of range".to_string(),
        ));
    }

    let distance_km = haversine_distance(
        payload.pickup_lat,
        payload.pickup_lng,
        payload.dropoff_lat,
        payload.dropoff_lng,
    );
    let card = rate_card(payload.service_type);
    let estimated_fare = estimate_fare(payload.service_type, distance_km);

    Ok(Json(ApiResponse::ok(
        "Fare estimated successfully",
        EstimateResponse {
            service_type: payload.service_type,
            distance_km: (distance_km * 100.0).round() / 100.0,
            base_fare: card.base_fare,
            per_km: card.per_km,
            minimum_fare: card.minimum_fare,
            estimated_fare,
            currency: "INR",
        },
    )))
}
