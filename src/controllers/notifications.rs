use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::Notification,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_read))
}

// GET /api/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT id, user_id, title, message, notification_type, is_read, created_at
         FROM notifications
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.db.pool)
    .await?;

    let unread = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(json!({
        "success": true,
        "notifications": notifications,
        "unread": unread,
    })))
}

// POST /api/notifications/{id}/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(notification_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    // Someone else's notification looks the same as a missing one.
    let updated = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(notification_id)
        .bind(user.user_id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Notification"));
    }

    Ok(Json(json!({ "success": true })))
}
