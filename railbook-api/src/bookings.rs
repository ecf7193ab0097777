use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::info;
use uuid::Uuid;

use railbook_core::booking::{Booking, BookingDetails, CreateBookingRequest};
use railbook_core::coordinator;
use railbook_core::store::BookingQueries;

use crate::error::AppError;
use crate::middleware::auth::{customer_auth_middleware, CustomerClaims};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .layer(axum::middleware::from_fn_with_state(
            state,
            customer_auth_middleware,
        ))
}

fn user_id(claims: &CustomerClaims) -> Result<Uuid, AppError> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Authentication("Invalid token subject".to_string()))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let user_id = user_id(&claims)?;

    let booking = coordinator::create_booking(state.store.as_ref(), req.train_id, user_id).await?;

    info!(booking_id = %booking.id, train_id = %booking.train_id, seat = booking.seat_number, "seat booked");

    Ok((StatusCode::CREATED, Json(booking)))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>, AppError> {
    let user_id = user_id(&claims)?;

    let details = state
        .store
        .booking_for_user(id, user_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    Ok(Json(details))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let user_id = user_id(&claims)?;

    let bookings = state
        .store
        .bookings_for_user(user_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(bookings))
}
