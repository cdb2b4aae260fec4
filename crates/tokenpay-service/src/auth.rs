//! Authentication extractor.
//!
//! Requests carry `Authorization: Bearer <JWT>`, signed HS256 with the
//! configured `JWT_SECRET`. The subject claim (or `id`, for tokens minted by
//! older frontends) is the user id.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use tokenpay_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

/// JWT claims accepted from the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    #[serde(alias = "id")]
    pub sub: String,
    /// Expiration time.
    pub exp: i64,
}

impl AuthUser {
    /// Validate `token` against `secret` and extract the user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for any invalid, expired or
    /// mis-signed token.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<JwtClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized
            })?;

        let user_id = data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self { user_id })
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let secret = state
                .config
                .jwt_secret
                .as_deref()
                .ok_or_else(|| ApiError::Internal("JWT_SECRET not configured".into()))?;

            Self::from_token(token, secret)
        })
    }
}
