//! Request correlation middleware.
//!
//! Every request runs inside a tracing span tagged with a request id: the
//! inbound `X-Request-ID` header when the caller supplies one, a fresh UUID
//! otherwise. The id is echoed on the response so client reports can be
//! matched against server logs.

use axum::{
    body::Body,
    http::{header::HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Correlation id stored in request extensions for downstream handlers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Wraps the request in a correlation span and logs its completion.
pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let started = std::time::Instant::now();
    let mut response = next.run(req).instrument(span).await;

    tracing::info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_stores_value() {
        let id = RequestId("req-123".to_string());
        assert_eq!(id.0, "req-123");
        assert_eq!(id.clone().0, "req-123");
    }

    #[test]
    fn test_header_name_constant() {
        assert_eq!(REQUEST_ID_HEADER, "X-Request-ID");
    }
}
