//! The [`Caller`] extractor: who is calling, taken from request headers.
//!
//! Authentication happens upstream; this layer trusts what the proxy forwards.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use tenure_core::audit::Provenance;

pub const ACTOR_HEADER: &str = "x-actor";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Actor recorded when no `x-actor` header is present.
pub const ANONYMOUS: &str = "anonymous";

/// The [`Provenance`] of the current request.
#[derive(Debug, Clone)]
pub struct Caller(pub Provenance);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

pub fn provenance_from_headers(headers: &HeaderMap) -> Provenance {
  Provenance {
    actor:      header(headers, ACTOR_HEADER).unwrap_or(ANONYMOUS).to_owned(),
    // The left-most entry is the originating client.
    ip_address: header(headers, FORWARDED_FOR_HEADER)
      .and_then(|v| v.split(',').next())
      .map(|v| v.trim().to_owned()),
    user_agent: header(headers, "user-agent").map(str::to_owned),
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    Ok(Self(provenance_from_headers(&parts.headers)))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn missing_headers_give_an_anonymous_caller() {
    let p = provenance_from_headers(&HeaderMap::new());
    assert_eq!(p.actor, ANONYMOUS);
    assert!(p.ip_address.is_none());
    assert!(p.user_agent.is_none());
  }

  #[test]
  fn forwarded_for_keeps_the_client_address() {
    let mut headers = HeaderMap::new();
    headers.insert(ACTOR_HEADER, HeaderValue::from_static("clerk-7"));
    headers.insert(
      FORWARDED_FOR_HEADER,
      HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
    );
    headers.insert("user-agent", HeaderValue::from_static("registry-desk/2.1"));

    let p = provenance_from_headers(&headers);
    assert_eq!(p.actor, "clerk-7");
    assert_eq!(p.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(p.user_agent.as_deref(), Some("registry-desk/2.1"));
  }
}
