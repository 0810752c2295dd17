//! Caller identity extracted from request headers.
//!
//! The proxy in front of this service authenticates the user and forwards the
//! account UUID in `x-account-uuid`. A request without it is anonymous and
//! simply gets the default greeting.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::observability::extract_request_id;
use std::convert::Infallible;

pub const ACCOUNT_UUID_HEADER: &str = "x-account-uuid";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPrincipal {
    /// Authenticated account, if any.
    pub account_uuid: Option<String>,
    /// Correlation ID forwarded to downstream calls.
    pub request_id: Option<String>,
}

impl RequestPrincipal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn account(account_uuid: impl Into<String>) -> Self {
        Self {
            account_uuid: Some(account_uuid.into()),
            request_id: None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let principal = RequestPrincipal {
            account_uuid: header(ACCOUNT_UUID_HEADER),
            request_id: extract_request_id(&parts.headers).filter(|id| !id.is_empty()),
        };

        if let Some(ref account) = principal.account_uuid {
            tracing::Span::current().record("account_uuid", account.as_str());
        }

        Ok(principal)
    }
}
