//! Error types for the bill-gateway library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`GateError`]: **Client input**: the request was rejected before any
//!   external call (wrong method, disallowed origin, bad payload). Its
//!   `Display` output is exactly the plain-text response body.
//!
//! * [`ModelError`]: **External service**: the single model call failed.
//!   Surfaced as HTTP 500 with the underlying message, never retried.
//!
//! * [`BillGatewayError`]: **Fatal**: the gateway cannot start at all
//!   (provider not configured, invalid config, listener failure).
//!
//! A model reply that cannot be parsed as JSON is deliberately *not* an
//! error; see [`crate::pipeline::normalize`].

use axum::http::StatusCode;
use thiserror::Error;

/// Shape every POST body must have, quoted in [`GateError::InvalidShape`].
pub const EXPECTED_SHAPE: &str =
    r#"{ "image": { "base64Data": string, "mimeType": string } }"#;

/// A terminal rejection produced by the request gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Anything other than POST or OPTIONS.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// `Origin` header missing or not matching any allow-list entry.
    #[error("Not allowed")]
    OriginNotAllowed,

    /// `Content-Type` does not contain `application/json`.
    #[error("Request must be application/json")]
    NotJson,

    /// Body longer than the configured `max_body_bytes`.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// The body stream failed before it was fully read.
    #[error("Failed to read request body")]
    UnreadableBody,

    /// Body is not JSON, or lacks `image.base64Data` / `image.mimeType`.
    #[error("Invalid request body: expected {} ({detail})", EXPECTED_SHAPE)]
    InvalidShape { detail: String },

    /// `image.mimeType` does not start with `image/`.
    #[error("File must be an image")]
    NotAnImage,

    /// `image.base64Data` is empty or not valid base64.
    #[error("Image data must be valid base64")]
    InvalidImageData,
}

impl GateError {
    /// HTTP status the rejection is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotJson
            | Self::UnreadableBody
            | Self::InvalidShape { .. }
            | Self::NotAnImage
            | Self::InvalidImageData => StatusCode::BAD_REQUEST,
        }
    }
}

/// Failure of the external generation call, whatever its cause
/// (network, authentication, quota, content filter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// All fatal errors returned while building or running the gateway.
#[derive(Debug, Error)]
pub enum BillGatewayError {
    /// The configured provider could not be initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_messages_are_response_bodies() {
        assert_eq!(GateError::MethodNotAllowed.to_string(), "Method not allowed");
        assert_eq!(GateError::OriginNotAllowed.to_string(), "Not allowed");
        assert_eq!(
            GateError::NotJson.to_string(),
            "Request must be application/json"
        );
        assert_eq!(GateError::NotAnImage.to_string(), "File must be an image");
    }

    #[test]
    fn invalid_shape_names_expected_shape() {
        let e = GateError::InvalidShape {
            detail: "missing field `mimeType`".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("base64Data"), "got: {msg}");
        assert!(msg.contains("mimeType"), "got: {msg}");
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gate_statuses() {
        assert_eq!(GateError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(GateError::OriginNotAllowed.status(), StatusCode::FORBIDDEN);
        assert_eq!(GateError::InvalidImageData.status(), StatusCode::BAD_REQUEST);
        assert_eq!(GateError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn provider_not_configured_display() {
        let e = BillGatewayError::ProviderNotConfigured {
            provider: "gemini".into(),
            hint: "set GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("gemini"));
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn model_error_display_is_message() {
        assert_eq!(ModelError::new("quota exceeded").to_string(), "quota exceeded");
    }
}
