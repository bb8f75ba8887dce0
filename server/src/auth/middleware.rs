//! Authentication middleware.
//!
//! Bearer token extraction. When `AUTH_SECRET` is configured every request
//! must carry `Authorization: Bearer <secret>`; otherwise access is open.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Authenticated caller extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// Presented the configured secret
    Token,
    /// No secret is configured
    Anonymous,
}

/// Compare without returning early on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check an `Authorization` header value against the configured secret.
pub fn authorize(header: Option<&str>, secret: Option<&str>) -> Result<AuthUser, AppError> {
    let Some(secret) = secret else {
        return Ok(AuthUser::Anonymous);
    };

    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthorized)?;

    if constant_time_eq(token.as_bytes(), secret.as_bytes()) {
        Ok(AuthUser::Token)
    } else {
        Err(AppError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let result = authorize(header, state.config.auth_secret.as_deref());
        if result.is_err() {
            tracing::debug!(path = %parts.uri.path(), "Rejected request without valid token");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_when_no_secret() {
        assert_eq!(authorize(None, None).unwrap(), AuthUser::Anonymous);
        assert_eq!(
            authorize(Some("Bearer whatever"), None).unwrap(),
            AuthUser::Anonymous
        );
    }

    #[test]
    fn secret_must_match() {
        let secret = Some("s3cret");
        assert_eq!(
            authorize(Some("Bearer s3cret"), secret).unwrap(),
            AuthUser::Token
        );
        assert!(authorize(Some("Bearer nope"), secret).is_err());
        assert!(authorize(Some("s3cret"), secret).is_err());
        assert!(authorize(Some("Bearer "), secret).is_err());
        assert!(authorize(None, secret).is_err());
    }
}
