//! Bearer-token check for admin routes.
//!
//! The server keeps only the SHA-256 digest of the configured token and
//! compares digests, so the comparison time does not depend on how many
//! leading bytes of a guess are right.

use super::AppState;
use crate::error::Error;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

/// Header the admin client uses to name itself in the audit trail.
pub const ACTOR_HEADER: &str = "x-parish-actor";

/// Actor recorded when the client does not send one.
pub const DEFAULT_ACTOR: &str = "admin";

/// SHA-256 of a token.
#[must_use]
pub fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// An authenticated admin request.
///
/// Extracting this rejects the request with `401` unless it carries
/// `Authorization: Bearer <token>` matching the configured admin token.
/// With no token configured every admin request is rejected.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Name recorded in the audit trail.
    pub actor: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_digest else {
            return Err(Error::Unauthorized);
        };

        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Error::Unauthorized)?;

        if token_digest(presented) != expected {
            return Err(Error::Unauthorized);
        }

        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|a| !a.is_empty() && a.len() <= 64)
            .map_or_else(|| DEFAULT_ACTOR.to_string(), ToString::to_string);

        Ok(Self { actor })
    }
}
