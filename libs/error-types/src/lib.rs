use serde::{Deserialize, Serialize};

/// Unified API error response format.
///
/// Every HTTP error leaving the service is serialized into this
/// envelope so clients can route on `error_type` and localize on
/// `code` without parsing free-form messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short error name (e.g. "Not Found").
    pub error: String,

    /// Human-readable message.
    pub message: String,

    /// HTTP status code.
    pub status: u16,

    /// Error category for client-side routing. One of:
    /// - "validation_error"
    /// - "authorization_error"
    /// - "not_found_error"
    /// - "server_error"
    /// - "service_unavailable_error"
    pub error_type: String,

    /// Stable machine code, format SERVICE_CODE (e.g. "SESSION_NOT_FOUND").
    pub code: String,

    /// Optional detail, only populated in development environments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Request trace id for log correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
            details: None,
            trace_id: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

/// Standard error codes.
pub mod error_codes {
    // Sessions
    pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
    pub const SELF_SESSION: &str = "SELF_SESSION";
    pub const NOT_SESSION_PARTICIPANT: &str = "NOT_SESSION_PARTICIPANT";

    // Messages
    pub const MESSAGE_NOT_FOUND: &str = "MESSAGE_NOT_FOUND";
    pub const EMPTY_MESSAGE: &str = "EMPTY_MESSAGE";

    // Generic
    pub const INVALID_OPERATION: &str = "INVALID_OPERATION";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
}
