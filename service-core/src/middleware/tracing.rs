use crate::observability::REQUEST_ID_HEADER;
use axum::http::{HeaderName, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use tower_http::set_header::SetResponseHeaderLayer;
use uuid::Uuid;

/// Header carrying the serving service's name and version.
pub const VERSION_HEADER: &str = "x-service-version";

/// Propagate the caller's `x-request-id`, or mint one, and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header_value = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header_value {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let mut response = next.run(req).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Layer stamping `x-service-version: <name>/<version>` on every response.
pub fn version_header(name: &str, version: &str) -> SetResponseHeaderLayer<HeaderValue> {
    let value = HeaderValue::from_str(&format!("{}/{}", name, version))
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    SetResponseHeaderLayer::overriding(HeaderName::from_static(VERSION_HEADER), value)
}
