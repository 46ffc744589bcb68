use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every way an auth flow can fail, mapped to a transport status at one
/// boundary so the flows themselves stay transport-free.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    Conflict,
    #[error("User does not exist")]
    NotFound,
    #[error("The provided token is incorrect")]
    TokenMismatch,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Please check your email")]
    NotVerified,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::Conflict
            | AuthError::NotFound
            | AuthError::TokenMismatch
            | AuthError::InvalidCredentials
            | AuthError::NotVerified => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        // A lost insert race on the unique email index surfaces as a conflict,
        // same as the up-front existence check.
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AuthError::Conflict;
            }
        }
        AuthError::Internal(e.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
