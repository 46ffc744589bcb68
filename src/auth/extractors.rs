use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::dto::PublicUser;
use crate::auth::error::AuthError;
use crate::auth::jwt::{Claims, JwtKeys};
use crate::auth::repo::User;
use crate::state::AppState;

/// Guard for protected routes. Verifies the bearer token and attaches the
/// matching user record, minus the password hash. A record deleted after the
/// token was issued yields `user: None` rather than a rejection; the token
/// stays valid until it expires.
pub struct CurrentUser {
    pub claims: Claims,
    pub user: Option<PublicUser>,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized("Not authorized, no token"))?;

        // The original clients send the raw token; newer ones use the Bearer
        // scheme. Accept both.
        let token = header.strip_prefix("Bearer ").unwrap_or(header);

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AuthError::Unauthorized("Not authorized")
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .map(|u| PublicUser {
                id: u.id,
                username: u.username,
                email: u.email,
                is_verified: u.is_verified,
            });

        Ok(CurrentUser { claims, user })
    }
}
