//! HTTP surface: every method on every path goes to the gateway.
//!
//! The path carries no meaning, so the router is a single fallback handler.
//! This module only maps [`Outcome`] / [`Failure`] onto status codes, CORS
//! headers and bodies.

use crate::error::BillGatewayError;
use crate::gateway::{Failure, Gateway, Outcome};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, CONTENT_TYPE, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Origin";
/// Preflight cache lifetime: one day.
pub const MAX_AGE_SECS: &str = "86400";

/// Build the router around a shared gateway.
///
/// No body-limit layer: the gateway enforces `max_body_bytes` itself, after
/// the method and origin checks.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new().fallback(handle).with_state(gateway)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, gateway: Arc<Gateway>) -> Result<(), BillGatewayError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BillGatewayError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!(
        "Bill gateway listening on {} (origins: {:?})",
        addr,
        gateway.config().allowed_origins
    );
    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(BillGatewayError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn handle(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    match gateway.handle(&method, &headers, body).await {
        Ok(outcome) => outcome.into_response(),
        Err(failure) => failure.into_response(),
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Preflight { origin } => {
                let mut headers = HeaderMap::new();
                cors_headers(&mut headers, origin.as_deref());
                headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
                (StatusCode::NO_CONTENT, headers).into_response()
            }
            Outcome::Extracted { origin, body } => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                cors_headers(&mut headers, Some(&origin));
                (StatusCode::OK, headers, body).into_response()
            }
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let (status, message, origin) = match self {
            Failure::Rejected { error, origin } => (error.status(), error.to_string(), origin),
            Failure::Model { error, origin } => {
                error!(%origin, "Error processing request: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error processing request: {error}"),
                    Some(origin),
                )
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if origin.is_some() {
            cors_headers(&mut headers, origin.as_deref());
        }
        (status, headers, message).into_response()
    }
}

/// Insert the CORS headers; `Access-Control-Allow-Origin` only for an
/// allowed origin, echoed back verbatim.
fn cors_headers(headers: &mut HeaderMap, origin: Option<&str>) {
    if let Some(value) = origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(VARY, HeaderValue::from_static("Origin"));
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GateError, ModelError};

    #[test]
    fn preflight_without_origin_still_has_max_age() {
        let res = Outcome::Preflight { origin: None }.into_response();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers()[ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn method_not_allowed_has_no_cors_origin() {
        let res = Failure::Rejected {
            error: GateError::MethodNotAllowed,
            origin: None,
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn payload_too_large_keeps_cors_origin() {
        let res = Failure::Rejected {
            error: GateError::PayloadTooLarge,
            origin: Some("http://localhost:3000".into()),
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[test]
    fn model_failure_is_500_with_origin() {
        let res = Failure::Model {
            error: ModelError::new("boom"),
            origin: "http://localhost:3000".into(),
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }
}
