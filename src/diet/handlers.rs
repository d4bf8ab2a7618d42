use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{DietRecordQuery, DietRecordResponse, SaveDietRequest};
use super::services::{get_diet_record, save_diet_record};
use crate::{auth::jwt::AuthUser, error::DietError, state::AppState};

pub fn diet_routes() -> Router<AppState> {
    Router::new()
        .route("/diet/save", post(save_diet))
        .route("/diet/get", get(get_diet))
}

#[instrument(skip(state, payload))]
pub async fn save_diet(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
    Json(payload): Json<SaveDietRequest>,
) -> Result<Json<DietRecordResponse>, DietError> {
    let record = save_diet_record(&state, &customer_id, &payload).await?;
    Ok(Json(record.into()))
}

#[instrument(skip(state))]
pub async fn get_diet(
    State(state): State<AppState>,
    AuthUser(customer_id): AuthUser,
    Query(q): Query<DietRecordQuery>,
) -> Result<Json<DietRecordResponse>, DietError> {
    let record = get_diet_record(&state, &customer_id, &q.date).await?;
    Ok(Json(record.into()))
}
