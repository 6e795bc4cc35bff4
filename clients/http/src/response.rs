//! Response envelopes. Every body carries `success`, the remaining fields
//! depend on the outcome.

use chrono::{SecondsFormat, Utc};
use database::consts::consts::ReasonCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
    pub count: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>, count: usize) -> Self {
        Self {
            success: true,
            data,
            count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A domain rejection, `reason` is machine readable
#[derive(Debug, Serialize)]
pub struct RejectedResponse {
    pub success: bool,
    pub message: String,
    pub reason: ReasonCode,
}

impl RejectedResponse {
    pub fn new(message: String, reason: ReasonCode) -> Self {
        Self {
            success: false,
            message,
            reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub success: bool,
    pub message: &'static str,
    pub errors: Vec<String>,
}

impl ValidationErrorResponse {
    pub fn new(errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: "Validation error",
            errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stack,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn now() -> Self {
        Self {
            success: true,
            message: "API is running",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_response_serialization() {
        let response = ListResponse::new(vec![json!({"id": 1}), json!({"id": 2})], 2);

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
    }

    #[test]
    fn rejected_response_carries_reason_code() {
        let response = RejectedResponse::new("taken".to_string(), ReasonCode::DuplicateName);

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json,
            json!({ "success": false, "message": "taken", "reason": "DUPLICATE_NAME" })
        );
    }

    #[test]
    fn error_response_omits_absent_stack() {
        let json = serde_json::to_value(ErrorResponse::new("Internal server error", None)).unwrap();

        assert!(json.get("stack").is_none());
    }

    #[test]
    fn health_timestamp_is_utc_with_millis() {
        let health = HealthResponse::now();

        assert!(health.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&health.timestamp).is_ok());
    }
}
