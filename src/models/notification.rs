use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

impl Notification {
    pub async fn create(
        pool: &sqlx::PgPool,
        user_id: i64,
        title: &str,
        message: &str,
        notification_type: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notifications (user_id, title, message, notification_type)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(notification_type)
        .fetch_one(pool)
        .await
    }
}
