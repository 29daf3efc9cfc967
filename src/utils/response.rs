use chrono::{DateTime, Utc};
use serde::Serialize;

/// Uniform success envelope: `{ success, message, data?, timestamp }`.
/// Errors produce the same shape with `success: false` (see `error.rs`).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_is_omitted_when_absent() {
        let body = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "done");
        assert!(body.get("data").is_none());
    }
}
