use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, booking, driver, estimate};
use crate::middleware::auth::{auth_middleware, require_admin, require_customer, require_driver};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Role-specific governor layers keyed by user id
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let customer_governor = create_role_governor(RateLimitedRole::Customer);
    // IP-based governor for public routes
    let public_governor = create_public_governor();

    // Public routes (rate limited per IP)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    let public_routes = Router::new()
        .route("/estimate", post(estimate::get_estimate))
        .layer(public_governor);

    // Customer routes (requires auth + customer role)
    // Rate limit: 100 requests per minute (1x base)
    let customer_routes = Router::new()
        .route("/", post(booking::create_booking))
        .route("/my-bookings", get(booking::my_bookings))
        .route("/{id}/cancel", put(booking::cancel_booking))
        .layer(customer_governor)
        .layer(middleware::from_fn(require_customer));

    // Booking detail is visible to the owner, the assigned driver and admins;
    // the handler itself enforces that, so only auth gates the route.
    let booking_routes = Router::new()
        .route("/{id}", get(booking::get_booking))
        .merge(customer_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    // Rate limit: 500 requests per minute (5x base)
    let driver_routes = Router::new()
        .route("/profile", get(driver::get_profile))
        .route("/status", put(driver::update_online_status))
        .route("/vehicles", post(driver::register_vehicle))
        .route("/vehicles", get(driver::my_vehicles))
        .route("/vehicles/{id}", put(driver::update_vehicle))
        .route("/vehicles/{id}", delete(driver::remove_vehicle))
        .route("/bookings/available", get(driver::available_bookings))
        .route("/bookings/{id}/accept", put(driver::accept_booking))
        .route("/bookings/{id}/arrive", put(driver::arrive))
        .route("/bookings/{id}/start", put(driver::start_trip))
        .route("/bookings/{id}/complete", put(driver::complete_trip))
        .route("/bookings/{id}/location", put(driver::update_location))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role, no extra rate limiter)
    let admin_routes = Router::new()
        .route("/stats", get(admin::dashboard_stats))
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{id}/assign-driver", put(admin::assign_driver))
        .route("/bookings/{id}/status", put(admin::update_booking_status))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/users/{id}/active", put(admin::set_user_active))
        .route("/drivers", get(admin::list_drivers))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    use crate::Config;

    use super::*;

    fn test_router() -> Router {
        let state = AppState {
            db: MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            config: Config {
                database_url: "postgres://localhost/cityhaul".to_string(),
                db_max_connections: 1,
                db_connect_timeout_secs: 1,
                jwt_secret: "secret".to_string(),
                jwt_expiration_hours: 1,
                server_host: "127.0.0.1".to_string(),
                server_port: 4000,
            },
        };
        create_router(state)
    }

    async fn status_of(method: Method, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        test_router().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn customer_listing_is_bound_at_my_bookings() {
        // Unauthenticated requests bounce at the auth layer, which proves the
        // route itself is registered (an unknown path would be 404).
        let status = status_of(Method::GET, "/api/bookings/my-bookings").await;
        assert_ne!(status, StatusCode::NOT_FOUND);
        assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn assign_driver_accepts_put() {
        let put = status_of(Method::PUT, "/api/admin/bookings/11111111-2222-3333-4444-555555555555/assign-driver").await;
        assert_ne!(put, StatusCode::NOT_FOUND);
        assert_ne!(put, StatusCode::METHOD_NOT_ALLOWED);

        let post = status_of(Method::POST, "/api/admin/bookings/11111111-2222-3333-4444-555555555555/assign-driver").await;
        assert_eq!(post, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn admin_stats_route_exists() {
        let status = status_of(Method::GET, "/api/admin/stats").await;
        assert_ne!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn vehicle_routes_support_update_and_removal() {
        let uri = "/api/driver/vehicles/11111111-2222-3333-4444-555555555555";
        for method in [Method::PUT, Method::DELETE] {
            let status = status_of(method, uri).await;
            assert_ne!(status, StatusCode::NOT_FOUND);
            assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED);
        }
    }
}
