pub mod date;
pub mod dto;
pub mod handlers;
pub mod history;
pub mod locks;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::diet_routes())
}
