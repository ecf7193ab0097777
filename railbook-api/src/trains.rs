use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use railbook_core::store::{StoreError, TrainStore};
use railbook_core::train::{NewTrain, Train, TrainAvailability};

use crate::error::AppError;
use crate::middleware::auth::admin_auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/v1/trains", post(create_train))
        .layer(axum::middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ));

    Router::new()
        .route("/v1/trains/search", get(search_trains))
        .merge(admin)
}

async fn create_train(
    State(state): State<AppState>,
    Json(req): Json<NewTrain>,
) -> Result<(StatusCode, Json<Train>), AppError> {
    req.validate().map_err(AppError::Validation)?;

    let train = state.store.create_train(req).await.map_err(|e| match e {
        StoreError::Conflict => AppError::Conflict("Train number already exists".to_string()),
        StoreError::Unavailable(msg) => AppError::Internal(msg),
    })?;

    info!(train_id = %train.id, train_number = %train.train_number, "train registered");

    Ok((StatusCode::CREATED, Json(train)))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    source: String,
    destination: String,
}

async fn search_trains(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TrainAvailability>>, AppError> {
    if params.source.trim().is_empty() || params.destination.trim().is_empty() {
        return Err(AppError::Validation(
            "Source and destination are required".to_string(),
        ));
    }

    let trains = state
        .store
        .find_trains(params.source.trim(), params.destination.trim())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(trains))
}
