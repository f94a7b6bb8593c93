use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::MatchReview,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/matches/{id}/reviews", get(list_reviews).post(create_review))
}

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, r.match_id, r.rating,
           r.review_text, r.stadium_rating, r.created_at
    FROM match_reviews r
    JOIN users u ON u.id = r.user_id
"#;

async fn match_exists(pool: &sqlx::PgPool, match_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM matches WHERE id = $1)")
        .bind(match_id)
        .fetch_one(pool)
        .await
}

// GET /api/matches/{id}/reviews
async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if !match_exists(&state.db.pool, match_id).await? {
        return Err(AppError::NotFound("Match"));
    }

    let reviews = sqlx::query_as::<_, MatchReview>(&format!(
        "{REVIEW_SELECT} WHERE r.match_id = $1 ORDER BY r.created_at DESC, r.id DESC"
    ))
    .bind(match_id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(json!({ "success": true, "reviews": reviews })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Review is too long."))]
    pub review_text: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Stadium rating must be between 1 and 5."))]
    pub stadium_rating: Option<i32>,
}

// POST /api/matches/{id}/reviews
async fn create_review(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(match_id): Path<i64>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;

    if !match_exists(&state.db.pool, match_id).await? {
        return Err(AppError::NotFound("Match"));
    }

    let review_id: i64 = sqlx::query_scalar(
        "INSERT INTO match_reviews (user_id, match_id, rating, review_text, stadium_rating)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(user.user_id)
    .bind(match_id)
    .bind(req.rating)
    .bind(req.review_text.as_deref().map(str::trim).filter(|t| !t.is_empty()))
    .bind(req.stadium_rating)
    .fetch_one(&state.db.pool)
    .await?;

    let review = sqlx::query_as::<_, MatchReview>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
        .bind(review_id)
        .fetch_one(&state.db.pool)
        .await?;

    tracing::info!("User {} reviewed match {}", user.user_id, match_id);

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "review": review }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_must_be_one_to_five() {
        let ok = ReviewRequest { rating: 5, review_text: None, stadium_rating: Some(1) };
        assert!(ok.validate().is_ok());

        let low = ReviewRequest { rating: 0, review_text: None, stadium_rating: None };
        assert!(low.validate().unwrap_err().field_errors().contains_key("rating"));

        let stadium = ReviewRequest { rating: 3, review_text: None, stadium_rating: Some(6) };
        assert!(stadium
            .validate()
            .unwrap_err()
            .field_errors()
            .contains_key("stadium_rating"));
    }
}
