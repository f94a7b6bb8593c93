use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::{
    cache::matches::match_list_key,
    error::{AppError, AppResult},
    models::{MatchWithStadium, PriceHistory, SeatCategory},
    AppState,
};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const MAX_PAGE_SIZE: u32 = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches", get(list_matches))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/seats", get(get_seat_map))
        .route("/matches/{id}/price-history", get(get_price_history))
        .route("/seat-categories", get(list_seat_categories))
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub query: Option<String>,
    pub date: Option<String>,
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

fn parse_from_date(raw: &str) -> AppResult<NaiveDateTime> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AppError::BadRequest("Invalid date, expected YYYY-MM-DD.".to_string()))
}

fn json_with_cache_status(body: String, status: &'static str) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json"), (X_CACHE, status)],
        body,
    )
        .into_response()
}

// GET /api/matches
async fn list_matches(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchesQuery>,
) -> AppResult<Response> {
    let query_val = params.query.as_deref().unwrap_or_default().trim();
    let date_val = params.date.as_deref().unwrap_or_default().trim();
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);

    let cache_key = match_list_key(query_val, date_val, page, page_size);
    match state.cache.get_cached_match_list(&cache_key).await {
        Ok(Some(cached)) => return Ok(json_with_cache_status(cached, "HIT")),
        Ok(None) => {}
        Err(e) => tracing::warn!("match list cache read failed: {:?}", e),
    }

    let from_date = if date_val.is_empty() {
        None
    } else {
        Some(parse_from_date(date_val)?)
    };

    let limit = i64::from(page_size);
    let offset = i64::from(page - 1) * limit;

    let matches = state
        .search_client
        .search_matches(query_val, limit, offset, from_date)
        .await?;

    let body = json!({
        "success": true,
        "matches": matches,
        "count": matches.len(),
        "page": page,
        "pageSize": page_size,
    })
    .to_string();

    if let Err(e) = state
        .cache
        .cache_match_list(&cache_key, &body, state.config.redis.match_list_ttl_seconds)
        .await
    {
        tracing::warn!("failed to cache match list: {:?}", e);
    }

    Ok(json_with_cache_status(body, "MISS"))
}

async fn find_match(state: &AppState, match_id: i64) -> AppResult<MatchWithStadium> {
    MatchWithStadium::find(&state.db.pool, match_id)
        .await?
        .ok_or(AppError::NotFound("Match"))
}

// GET /api/matches/{id}
async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let fixture = find_match(&state, match_id).await?;
    Ok(Json(json!({ "success": true, "match": fixture })))
}

#[derive(Debug, Serialize)]
pub struct SeatMap {
    pub match_id: i64,
    pub rows: i32,
    pub seats_per_row: i32,
    pub ticket_price: f64,
    /// `[row, seat]` pairs already sold.
    pub booked_seats: Vec<[i32; 2]>,
}

// GET /api/matches/{id}/seats
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let fixture = find_match(&state, match_id).await?;
    let booked = state.cache.get_booked_seats(match_id).await?;

    Ok(Json(SeatMap {
        match_id,
        rows: fixture.rows,
        seats_per_row: fixture.seats_per_row,
        ticket_price: fixture.ticket_price,
        booked_seats: booked.iter().map(|s| [s.row, s.seat]).collect(),
    }))
}

// GET /api/matches/{id}/price-history
async fn get_price_history(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    find_match(&state, match_id).await?;

    let history = sqlx::query_as::<_, PriceHistory>(
        "SELECT id, match_id, seat_category, price, date_changed, reason
         FROM price_history
         WHERE match_id = $1
         ORDER BY date_changed DESC, id DESC",
    )
    .bind(match_id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(json!({ "success": true, "history": history })))
}

// GET /api/seat-categories
async fn list_seat_categories(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let categories = sqlx::query_as::<_, SeatCategory>(
        "SELECT id, name, description, benefits, color_code FROM seat_categories ORDER BY id",
    )
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(json!({ "success": true, "categories": categories })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_date_starts_at_midnight() {
        let parsed = parse_from_date("2025-06-14").unwrap();
        assert_eq!(parsed.to_string(), "2025-06-14 00:00:00");
        assert!(matches!(parse_from_date("14/06/2025"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn cache_status_is_reported() {
        let response = json_with_cache_status("{}".to_string(), "HIT");
        assert_eq!(response.headers()[X_CACHE], "HIT");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
