//! Request authentication.
//!
//! The API key layer uses constant-time comparison to mitigate timing attacks.
//! The viewer extractor identifies the member on whose behalf a request is made.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{codes, AppError, ErrorResponse};

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the requesting member's id.
pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match provided {
        Some(provided_key) => {
            if constant_time_compare(&provided_key, &expected) {
                next.run(request).await
            } else {
                unauthorized_response("Invalid API key")
            }
        }
        None => {
            // Also check Authorization header as bearer token
            let bearer = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string());

            match bearer {
                Some(bearer_key) if constant_time_compare(&bearer_key, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response("Missing or invalid API key"),
            }
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(codes::UNAUTHORIZED, message);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// The member making the request, if the client identified one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Option<i64>);

impl Viewer {
    /// The viewer's member id, or `Unauthorized` for anonymous requests.
    pub fn require(self) -> Result<i64, AppError> {
        self.0.ok_or_else(|| {
            AppError::Unauthorized(format!("Missing {} header", MEMBER_ID_HEADER))
        })
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(MEMBER_ID_HEADER) else {
            return Ok(Viewer(None));
        };

        value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(|id| Viewer(Some(id)))
            .ok_or_else(|| {
                AppError::BadRequest(format!("Malformed {} header", MEMBER_ID_HEADER))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    async fn extract(header_value: Option<&str>) -> Result<Viewer, AppError> {
        let mut builder = HttpRequest::builder().uri("/api/curations/1");
        if let Some(value) = header_value {
            builder = builder.header(MEMBER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Viewer::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_viewer_absent_is_anonymous() {
        let viewer = extract(None).await.unwrap();
        assert_eq!(viewer, Viewer(None));
        assert!(matches!(viewer.require(), Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_viewer_parsed_from_header() {
        let viewer = extract(Some("42")).await.unwrap();
        assert_eq!(viewer.require().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_viewer_malformed_header() {
        let err = extract(Some("forty-two")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
