//! Request gate: decide accept/reject before any external call is made.
//!
//! Checks run in a fixed order and the first failure is terminal:
//!
//! ```text
//! OPTIONS? ──▶ preflight
//! method ──▶ origin ──▶ content-type ──▶ body size ──▶ payload shape ──▶ MIME type
//!  (405)      (403)        (400)           (413)           (400)           (400)
//! ```
//!
//! [`admit`] works on the request head only. The body is read afterwards with
//! [`read_body`], so preflights and rejected callers never get it buffered,
//! and [`admit_payload`] finishes the checks on the bytes.

use crate::bill::{ExtractRequest, ImageInput};
use crate::config::GatewayConfig;
use crate::error::GateError;
use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, Method};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::debug;

/// Outcome of a request head that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// CORS preflight; answered without touching the body.
    /// Carries the request origin when it is on the allow-list.
    Preflight { origin: Option<String> },
    /// A POST from an allowed origin whose body may now be read.
    Post { origin: String },
}

/// Run the header checks: OPTIONS, method, origin, content-type.
pub fn admit(
    config: &GatewayConfig,
    method: &Method,
    headers: &HeaderMap,
) -> Result<Admission, GateError> {
    if *method == Method::OPTIONS {
        let origin = request_origin(headers)
            .filter(|o| config.match_origin(o).is_some())
            .map(str::to_string);
        return Ok(Admission::Preflight { origin });
    }
    if *method != Method::POST {
        return Err(GateError::MethodNotAllowed);
    }

    let origin = check_origin(config, headers)?;
    check_content_type(headers)?;
    Ok(Admission::Post { origin })
}

/// Buffer the body, failing with [`GateError::PayloadTooLarge`] past `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, GateError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(GateError::PayloadTooLarge),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            Err(GateError::UnreadableBody)
        }
    }
}

/// Run the body checks: payload shape, MIME type.
pub fn admit_payload(body: &[u8]) -> Result<ImageInput, GateError> {
    let image = parse_payload(body)?;
    check_mime(&image)?;
    debug!(mime = %image.mime_type, bytes = image.base64_data.len(), "payload admitted");
    Ok(image)
}

/// The `Origin` header as text, if present and valid UTF-8/ASCII.
pub fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(ORIGIN).and_then(|v| v.to_str().ok())
}

/// Return the request's origin when it contains an allow-list entry.
pub fn check_origin(config: &GatewayConfig, headers: &HeaderMap) -> Result<String, GateError> {
    let origin = request_origin(headers).ok_or(GateError::OriginNotAllowed)?;
    match config.match_origin(origin) {
        Some(_) => Ok(origin.to_string()),
        None => Err(GateError::OriginNotAllowed),
    }
}

pub fn check_content_type(headers: &HeaderMap) -> Result<(), GateError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if is_json {
        Ok(())
    } else {
        Err(GateError::NotJson)
    }
}

/// Deserialize the body into the typed request; any failure is a shape error.
pub fn parse_payload(body: &[u8]) -> Result<ImageInput, GateError> {
    serde_json::from_slice::<ExtractRequest>(body)
        .map(|req| req.image)
        .map_err(|e| GateError::InvalidShape {
            detail: e.to_string(),
        })
}

pub fn check_mime(image: &ImageInput) -> Result<(), GateError> {
    if image.mime_type.starts_with("image/") {
        Ok(())
    } else {
        Err(GateError::NotAnImage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const BODY: &[u8] = br#"{"image":{"base64Data":"aGVsbG8=","mimeType":"image/png"}}"#;

    fn config() -> GatewayConfig {
        GatewayConfig::builder()
            .allowed_origins(["http://localhost:3000", "https://www.satyajeetnigade.in"])
            .build()
            .unwrap()
    }

    fn headers(origin: Option<&'static str>, content_type: Option<&'static str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(o) = origin {
            h.insert(ORIGIN, HeaderValue::from_static(o));
        }
        if let Some(ct) = content_type {
            h.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        h
    }

    #[test]
    fn options_is_preflight_even_from_unknown_origin() {
        let h = headers(Some("https://evil.example"), None);
        assert_eq!(
            admit(&config(), &Method::OPTIONS, &h).unwrap(),
            Admission::Preflight { origin: None }
        );
    }

    #[test]
    fn options_echoes_allowed_origin() {
        let h = headers(Some("http://localhost:3000"), None);
        assert_eq!(
            admit(&config(), &Method::OPTIONS, &h).unwrap(),
            Admission::Preflight {
                origin: Some("http://localhost:3000".into())
            }
        );
    }

    #[test]
    fn other_methods_rejected_before_origin() {
        let h = headers(None, None);
        for m in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH, Method::HEAD] {
            assert_eq!(
                admit(&config(), &m, &h).unwrap_err(),
                GateError::MethodNotAllowed,
                "{m}"
            );
        }
    }

    #[test]
    fn missing_origin_is_forbidden() {
        let h = headers(None, Some("application/json"));
        assert_eq!(
            admit(&config(), &Method::POST, &h).unwrap_err(),
            GateError::OriginNotAllowed
        );
    }

    #[test]
    fn origin_checked_before_content_type() {
        let h = headers(Some("https://evil.example"), Some("text/plain"));
        assert_eq!(
            admit(&config(), &Method::POST, &h).unwrap_err(),
            GateError::OriginNotAllowed
        );
    }

    #[test]
    fn content_type_must_contain_json() {
        let h = headers(Some("http://localhost:3000"), Some("text/plain"));
        assert_eq!(
            admit(&config(), &Method::POST, &h).unwrap_err(),
            GateError::NotJson
        );
        let h = headers(Some("http://localhost:3000"), None);
        assert_eq!(
            admit(&config(), &Method::POST, &h).unwrap_err(),
            GateError::NotJson
        );
    }

    #[test]
    fn content_type_with_charset_accepted() {
        let h = headers(
            Some("http://localhost:3000"),
            Some("application/json; charset=utf-8"),
        );
        assert!(check_content_type(&h).is_ok());
    }

    #[test]
    fn valid_post_head_admitted() {
        let h = headers(Some("https://www.satyajeetnigade.in"), Some("application/json"));
        assert_eq!(
            admit(&config(), &Method::POST, &h).unwrap(),
            Admission::Post {
                origin: "https://www.satyajeetnigade.in".into()
            }
        );
    }

    #[tokio::test]
    async fn body_within_limit_is_read() {
        let bytes = read_body(Body::from(BODY), BODY.len()).await.unwrap();
        assert_eq!(&bytes[..], BODY);
    }

    #[tokio::test]
    async fn body_over_limit_is_too_large() {
        assert_eq!(
            read_body(Body::from(BODY), BODY.len() - 1).await.unwrap_err(),
            GateError::PayloadTooLarge
        );
    }

    #[test]
    fn shape_errors() {
        let bodies: [&[u8]; 5] = [
            b"not json",
            br#"{}"#,
            br#"{"image":{"mimeType":"image/png"}}"#,
            br#"{"image":{"base64Data":"aGVsbG8="}}"#,
            br#"{"image":"aGVsbG8="}"#,
        ];
        for body in bodies {
            assert!(
                matches!(admit_payload(body), Err(GateError::InvalidShape { .. })),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn non_image_mime_rejected() {
        let body = br#"{"image":{"base64Data":"aGVsbG8=","mimeType":"application/pdf"}}"#;
        assert_eq!(admit_payload(body).unwrap_err(), GateError::NotAnImage);
    }

    #[test]
    fn valid_payload_admitted() {
        let image = admit_payload(BODY).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.base64_data, "aGVsbG8=");
    }
}
