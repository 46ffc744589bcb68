use crate::state::AppState;
use axum::Router;

mod dto;
mod email_token;
pub mod error;
pub(crate) mod extractors;
pub mod handlers;
mod jwt;
mod password;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
