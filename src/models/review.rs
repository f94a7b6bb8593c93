use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MatchReview {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub match_id: i64,
    pub rating: i32,
    pub review_text: Option<String>,
    pub stadium_rating: Option<i32>,
    pub created_at: NaiveDateTime,
}
