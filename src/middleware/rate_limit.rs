use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

/// Type alias for the public governor layer (IP-based rate limiting)
pub type PublicGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Create a GovernorLayer for public routes, keyed by client IP
/// - 100 requests per minute, applied before authentication
pub fn create_public_governor() -> PublicGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(600) // one token every 600ms (100 per minute)
            .burst_size(100)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Map governor rejections onto the standard response envelope.
pub fn rate_limit_error_handler(error: GovernorError) -> Response {
    let (status, message) = match error {
        GovernorError::TooManyRequests { .. } => {
            (StatusCode::TOO_MANY_REQUESTS, "Too many requests")
        }
        GovernorError::UnableToExtractKey => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Unable to identify client")
        }
        GovernorError::Other { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Rate limiter failure"),
    };

    let body = Json(serde_json::json!({
        "success": false,
        "message": message,
        "timestamp": chrono::Utc::now(),
    }));

    (status, body).into_response()
}

/// Middleware to log rate limiting and request details
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(
            client_ip = %addr.ip(),
            method = %method,
            uri = %uri,
            status = %status,
            "request rejected by rate limiter"
        );
    } else if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            client_ip = %addr.ip(),
            method = %method,
            uri = %uri,
            status = %status,
            "request failed"
        );
    } else {
        tracing::debug!(
            client_ip = %addr.ip(),
            method = %method,
            uri = %uri,
            status = %status,
            "request completed"
        );
    }

    response
}
