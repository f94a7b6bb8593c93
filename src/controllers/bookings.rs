use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{MatchWithStadium, Notification, SeatCoordinate},
    services::tickets::{attachment_filename, render_ticket_pdf},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/book_seats", post(book_seats))
        .route("/payment", get(payment))
        .route("/process_payment", post(process_payment))
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}/download", get(download_ticket))
}

/* ---------- SEAT SELECTION ---------- */

#[derive(Debug, Deserialize)]
pub struct BookSeatsRequest {
    pub match_id: i64,
    #[serde(default)]
    pub seats: Vec<SeatCoordinate>,
}

// POST /api/book_seats
async fn book_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BookSeatsRequest>,
) -> AppResult<impl IntoResponse> {
    let pending = state.bookings.select_seats(req.match_id, &req.seats).await?;

    // A new selection replaces whatever was waiting for payment.
    state
        .cache
        .stash_pending_booking(user.user_id, &pending, state.config.redis.pending_booking_ttl_seconds)
        .await?;

    tracing::info!(
        "User {} selected {} seats for match {}",
        user.user_id,
        pending.seats.len(),
        pending.match_id
    );

    Ok(Json(json!({ "success": true, "redirect": "/api/payment" })))
}

/* ---------- PAYMENT ---------- */

// GET /api/payment
async fn payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let pending = state
        .cache
        .get_pending_booking(user.user_id)
        .await?
        .ok_or(AppError::MissingBookingSession)?;

    let fixture = MatchWithStadium::find(&state.db.pool, pending.match_id)
        .await?
        .ok_or(AppError::NotFound("Match"))?;

    Ok(Json(json!({
        "success": true,
        "booking": pending,
        "match": fixture,
    })))
}

// POST /api/process_payment
async fn process_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let pending = state
        .cache
        .get_pending_booking(user.user_id)
        .await?
        .ok_or(AppError::MissingBookingSession)?;

    // Payment itself always succeeds; the seats are what can fail.
    let bookings = state.bookings.confirm(user.user_id, &pending).await?;

    if let Err(e) = state.cache.clear_pending_booking(user.user_id).await {
        tracing::warn!("failed to clear pending booking of user {}: {:?}", user.user_id, e);
    }
    state.cache.refresh_seats(pending.match_id).await;

    let message = format!("Payment successful! {} tickets booked.", bookings.len());
    if let Err(e) = Notification::create(
        &state.db.pool,
        user.user_id,
        "Booking Confirmed",
        &message,
        "booking",
    )
    .await
    {
        tracing::warn!("failed to record booking notification for user {}: {:?}", user.user_id, e);
    }

    Ok(Json(json!({
        "success": true,
        "message": message,
        "bookings": bookings,
    })))
}

/* ---------- TICKETS ---------- */

// GET /api/tickets
async fn list_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let tickets = state.bookings.tickets(user.user_id).await?;
    Ok(Json(json!({ "success": true, "tickets": tickets })))
}

// GET /api/tickets/{id}/download
async fn download_ticket(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.bookings.ticket_for(user.user_id, booking_id).await?;

    // printpdf is synchronous
    let pdf = tokio::task::spawn_blocking(move || render_ticket_pdf(&ticket))
        .await
        .map_err(|e| AppError::Internal(format!("ticket render task failed: {e}")))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", attachment_filename(booking_id)),
            ),
        ],
        pdf,
    ))
}
