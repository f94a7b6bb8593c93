//! Admin back office: dashboard figures and CRUD for stadiums, matches and
//! seat categories. Every route requires an admin session, and every
//! mutation drops the cached match listings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Form, Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::{types::Json as SqlJson, FromRow};
use std::{fmt::Display, str::FromStr, sync::Arc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::AdminUser,
    models::{
        booking::TICKET_DETAILS_SELECT,
        matches::{MATCH_COLUMNS, MATCH_WITH_STADIUM_SELECT},
        Match, MatchWithStadium, PriceHistory, SeatCategory, Stadium, TicketDetails,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/stadiums", get(list_stadiums).post(create_stadium))
        .route("/stadiums/{id}", put(update_stadium).delete(delete_stadium))
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", put(update_match).delete(delete_match))
        .route("/seat-categories", post(create_seat_category))
}

const MATCH_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

const STADIUM_COLUMNS: &str = "id, name, city, country, capacity, rows, seats_per_row, amenities, \
                               weather_info, pitch_type, created_at";

/* ---------- helpers ---------- */

/// Empty form fields count as absent.
fn empty_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Comma separated form input to a list, blanks dropped.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The priced tiers of a match, Regular first.
fn price_tiers(ticket: f64, vip: Option<f64>, premium: Option<f64>) -> Vec<(&'static str, f64)> {
    let mut tiers = vec![("Regular", ticket)];
    if let Some(price) = vip {
        tiers.push(("VIP", price));
    }
    if let Some(price) = premium {
        tiers.push(("Premium", price));
    }
    tiers
}

fn prices_changed(current: &Match, form: &MatchForm) -> bool {
    current.ticket_price != form.ticket_price
        || current.vip_price != form.vip_price
        || current.premium_price != form.premium_price
}

async fn stadium_exists(pool: &sqlx::PgPool, stadium_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM stadiums WHERE id = $1)")
        .bind(stadium_id)
        .fetch_one(pool)
        .await
}

/* ---------- DASHBOARD ---------- */

#[derive(Debug, Serialize, FromRow)]
struct MatchBookingCount {
    pub match_id: i64,
    pub team1: String,
    pub team2: String,
    pub match_date: NaiveDateTime,
    pub bookings: i64,
}

// GET /api/admin/dashboard
async fn dashboard(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    let pool = &state.db.pool;

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(pool).await?;
    let total_matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matches").fetch_one(pool).await?;
    let total_bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings").fetch_one(pool).await?;
    let total_revenue: f64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(total_amount), 0)::float8 FROM bookings")
            .fetch_one(pool)
            .await?;

    let recent_bookings = sqlx::query_as::<_, TicketDetails>(&format!(
        "{TICKET_DETAILS_SELECT} ORDER BY b.booking_date DESC, b.id DESC LIMIT 10"
    ))
    .fetch_all(pool)
    .await?;

    let match_bookings = sqlx::query_as::<_, MatchBookingCount>(
        "SELECT m.id AS match_id, m.team1, m.team2, m.match_date, COUNT(b.id) AS bookings
         FROM matches m
         LEFT JOIN bookings b ON b.match_id = m.id
         GROUP BY m.id
         ORDER BY m.match_date",
    )
    .fetch_all(pool)
    .await?;

    tracing::debug!("Dashboard served to admin {}", admin.user_id);

    Ok(Json(json!({
        "success": true,
        "total_users": total_users,
        "total_matches": total_matches,
        "total_bookings": total_bookings,
        "total_revenue": total_revenue,
        "recent_bookings": recent_bookings,
        "match_bookings": match_bookings,
    })))
}

/* ---------- STADIUMS ---------- */

#[derive(Debug, Deserialize, Validate)]
pub struct StadiumForm {
    #[validate(length(min = 1, max = 200, message = "Stadium name is required."))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "City is required."))]
    pub city: String,
    #[validate(range(min = 1, message = "Capacity must be positive."))]
    pub capacity: i32,
    #[validate(range(min = 1, message = "Rows must be at least 1."))]
    pub rows: i32,
    #[validate(range(min = 1, message = "Seats per row must be at least 1."))]
    pub seats_per_row: i32,
    pub country: Option<String>,
    pub pitch_type: Option<String>,
    pub amenities: Option<String>,
    pub weather_info: Option<String>,
}

impl StadiumForm {
    fn country(&self) -> &str {
        self.country.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("India")
    }

    fn pitch_type(&self) -> &str {
        self.pitch_type.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("Batting")
    }
}

// GET /api/admin/stadiums
async fn list_stadiums(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let stadiums = sqlx::query_as::<_, Stadium>(&format!("SELECT {STADIUM_COLUMNS} FROM stadiums ORDER BY name"))
        .fetch_all(&state.db.pool)
        .await?;

    Ok(Json(json!({ "success": true, "stadiums": stadiums })))
}

// POST /api/admin/stadiums
async fn create_stadium(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Form(form): Form<StadiumForm>,
) -> AppResult<impl IntoResponse> {
    form.validate()?;

    let stadium = sqlx::query_as::<_, Stadium>(&format!(
        "INSERT INTO stadiums (name, city, country, capacity, rows, seats_per_row, amenities, weather_info, pitch_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {STADIUM_COLUMNS}"
    ))
    .bind(form.name.trim())
    .bind(form.city.trim())
    .bind(form.country())
    .bind(form.capacity)
    .bind(form.rows)
    .bind(form.seats_per_row)
    .bind(SqlJson(split_list(form.amenities.as_deref())))
    .bind(form.weather_info.as_deref())
    .bind(form.pitch_type())
    .fetch_one(&state.db.pool)
    .await?;

    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} created stadium {} ({})", admin.user_id, stadium.id, stadium.name);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Stadium added successfully!",
            "stadium": stadium,
        })),
    ))
}

// PUT /api/admin/stadiums/{id}
async fn update_stadium(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(stadium_id): Path<i64>,
    Form(form): Form<StadiumForm>,
) -> AppResult<impl IntoResponse> {
    form.validate()?;

    let stadium = sqlx::query_as::<_, Stadium>(&format!(
        "UPDATE stadiums
         SET name = $2, city = $3, country = $4, capacity = $5, rows = $6, seats_per_row = $7,
             amenities = $8, weather_info = $9, pitch_type = $10
         WHERE id = $1
         RETURNING {STADIUM_COLUMNS}"
    ))
    .bind(stadium_id)
    .bind(form.name.trim())
    .bind(form.city.trim())
    .bind(form.country())
    .bind(form.capacity)
    .bind(form.rows)
    .bind(form.seats_per_row)
    .bind(SqlJson(split_list(form.amenities.as_deref())))
    .bind(form.weather_info.as_deref())
    .bind(form.pitch_type())
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(AppError::NotFound("Stadium"))?;

    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} updated stadium {}", admin.user_id, stadium_id);

    Ok(Json(json!({
        "success": true,
        "message": "Stadium updated successfully!",
        "stadium": stadium,
    })))
}

// DELETE /api/admin/stadiums/{id}
async fn delete_stadium(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(stadium_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    // Matches, bookings, reviews and price history go with it (ON DELETE CASCADE).
    let match_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM matches WHERE stadium_id = $1")
        .bind(stadium_id)
        .fetch_all(&state.db.pool)
        .await?;

    let deleted = sqlx::query("DELETE FROM stadiums WHERE id = $1")
        .bind(stadium_id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Stadium"));
    }

    for match_id in match_ids {
        state.cache.invalidate_seats(match_id).await;
    }
    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} deleted stadium {}", admin.user_id, stadium_id);

    Ok(Json(json!({ "success": true, "message": "Stadium deleted successfully!" })))
}

/* ---------- MATCHES ---------- */

#[derive(Debug, Deserialize, Validate)]
pub struct MatchForm {
    #[validate(length(min = 1, max = 100, message = "Team names are required."))]
    pub team1: String,
    #[validate(length(min = 1, max = 100, message = "Team names are required."))]
    pub team2: String,
    pub stadium_id: i64,
    pub match_date: String,
    #[validate(range(exclusive_min = 0.0, message = "Ticket price must be positive."))]
    pub ticket_price: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(range(exclusive_min = 0.0, message = "VIP price must be positive."))]
    pub vip_price: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(range(exclusive_min = 0.0, message = "Premium price must be positive."))]
    pub premium_price: Option<f64>,
    pub match_type: Option<String>,
    pub tournament: Option<String>,
    pub status: Option<String>,
    pub weather_forecast: Option<String>,
}

impl MatchForm {
    fn parsed_date(&self) -> AppResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.match_date.trim(), MATCH_DATE_FORMAT)
            .map_err(|_| AppError::BadRequest("Invalid match date, expected YYYY-MM-DDTHH:MM.".to_string()))
    }

    fn match_type(&self) -> &str {
        self.match_type.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("ODI")
    }

    fn status(&self) -> &str {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()).unwrap_or("Upcoming")
    }

    fn tournament(&self) -> Option<&str> {
        self.tournament.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn tiers(&self) -> Vec<(&'static str, f64)> {
        price_tiers(self.ticket_price, self.vip_price, self.premium_price)
    }

    async fn checked(&self, pool: &sqlx::PgPool) -> AppResult<NaiveDateTime> {
        self.validate()?;
        let match_date = self.parsed_date()?;
        if !stadium_exists(pool, self.stadium_id).await? {
            return Err(AppError::NotFound("Stadium"));
        }
        Ok(match_date)
    }
}

// GET /api/admin/matches
async fn list_matches(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let matches = sqlx::query_as::<_, MatchWithStadium>(&format!(
        "{MATCH_WITH_STADIUM_SELECT} ORDER BY m.match_date DESC, m.id DESC"
    ))
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(json!({ "success": true, "matches": matches })))
}

// POST /api/admin/matches
async fn create_match(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Form(form): Form<MatchForm>,
) -> AppResult<impl IntoResponse> {
    let match_date = form.checked(&state.db.pool).await?;

    let mut tx = state.db.pool.begin().await?;

    let fixture = sqlx::query_as::<_, Match>(&format!(
        "INSERT INTO matches (team1, team2, stadium_id, match_date, match_type, tournament,
                              ticket_price, vip_price, premium_price, status, weather_forecast)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {MATCH_COLUMNS}"
    ))
    .bind(form.team1.trim())
    .bind(form.team2.trim())
    .bind(form.stadium_id)
    .bind(match_date)
    .bind(form.match_type())
    .bind(form.tournament())
    .bind(form.ticket_price)
    .bind(form.vip_price)
    .bind(form.premium_price)
    .bind(form.status())
    .bind(form.weather_forecast.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    PriceHistory::record(&mut *tx, fixture.id, &form.tiers(), "Initial price").await?;
    tx.commit().await?;

    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} created match {} ({})", admin.user_id, fixture.id, fixture.title());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Match added successfully!",
            "match": fixture,
        })),
    ))
}

// PUT /api/admin/matches/{id}
async fn update_match(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(match_id): Path<i64>,
    Form(form): Form<MatchForm>,
) -> AppResult<impl IntoResponse> {
    let match_date = form.checked(&state.db.pool).await?;

    let mut tx = state.db.pool.begin().await?;

    let current = sqlx::query_as::<_, Match>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"))
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Match"))?;

    let fixture = sqlx::query_as::<_, Match>(&format!(
        "UPDATE matches
         SET team1 = $2, team2 = $3, stadium_id = $4, match_date = $5, match_type = $6,
             tournament = $7, ticket_price = $8, vip_price = $9, premium_price = $10,
             status = $11, weather_forecast = $12
         WHERE id = $1
         RETURNING {MATCH_COLUMNS}"
    ))
    .bind(match_id)
    .bind(form.team1.trim())
    .bind(form.team2.trim())
    .bind(form.stadium_id)
    .bind(match_date)
    .bind(form.match_type())
    .bind(form.tournament())
    .bind(form.ticket_price)
    .bind(form.vip_price)
    .bind(form.premium_price)
    .bind(form.status())
    .bind(form.weather_forecast.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    if prices_changed(&current, &form) {
        PriceHistory::record(&mut *tx, match_id, &form.tiers(), "Admin update").await?;
    }
    tx.commit().await?;

    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} updated match {}", admin.user_id, match_id);

    Ok(Json(json!({
        "success": true,
        "message": "Match updated successfully!",
        "match": fixture,
    })))
}

// DELETE /api/admin/matches/{id}
async fn delete_match(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(match_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let deleted = sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(match_id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Match"));
    }

    state.cache.invalidate_seats(match_id).await;
    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} deleted match {}", admin.user_id, match_id);

    Ok(Json(json!({ "success": true, "message": "Match deleted successfully!" })))
}

/* ---------- SEAT CATEGORIES ---------- */

#[derive(Debug, Deserialize, Validate)]
pub struct SeatCategoryForm {
    #[validate(length(min = 1, max = 50, message = "Category name is required."))]
    pub name: String,
    pub description: Option<String>,
    pub benefits: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(length(equal = 7, message = "Colour must look like #28a745."))]
    pub color_code: Option<String>,
}

// POST /api/admin/seat-categories
async fn create_seat_category(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Form(form): Form<SeatCategoryForm>,
) -> AppResult<impl IntoResponse> {
    form.validate()?;

    let category = sqlx::query_as::<_, SeatCategory>(
        "INSERT INTO seat_categories (name, description, benefits, color_code)
         VALUES ($1, $2, $3, COALESCE($4, '#28a745'))
         RETURNING id, name, description, benefits, color_code",
    )
    .bind(form.name.trim())
    .bind(form.description.as_deref())
    .bind(SqlJson(split_list(form.benefits.as_deref())))
    .bind(form.color_code.as_deref())
    .fetch_one(&state.db.pool)
    .await?;

    state.cache.invalidate_match_lists().await;
    tracing::info!("Admin {} created seat category {}", admin.user_id, category.name);

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "category": category }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> MatchForm {
        MatchForm {
            team1: "India".into(),
            team2: "Pakistan".into(),
            stadium_id: 2,
            match_date: "2025-07-01T14:30".into(),
            ticket_price: 85.0,
            vip_price: Some(170.0),
            premium_price: None,
            match_type: Some(" ".into()),
            tournament: None,
            status: None,
            weather_forecast: None,
        }
    }

    fn existing() -> Match {
        Match {
            id: 9,
            team1: "India".into(),
            team2: "Pakistan".into(),
            stadium_id: 2,
            match_date: form().parsed_date().unwrap(),
            match_type: "T20".into(),
            tournament: None,
            ticket_price: 85.0,
            vip_price: Some(170.0),
            premium_price: None,
            status: "Upcoming".into(),
            weather_forecast: None,
            live_score: SqlJson(json!({})),
            created_at: form().parsed_date().unwrap(),
        }
    }

    #[test]
    fn match_form_defaults_and_date() {
        let form = form();
        assert!(form.validate().is_ok());
        assert_eq!(form.parsed_date().unwrap().to_string(), "2025-07-01 14:30:00");
        assert_eq!(form.match_type(), "ODI");
        assert_eq!(form.status(), "Upcoming");

        let bad = MatchForm { match_date: "01/07/2025".into(), ..form };
        assert!(matches!(bad.parsed_date(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn non_positive_prices_are_rejected() {
        let free = MatchForm { ticket_price: 0.0, ..form() };
        assert!(free.validate().unwrap_err().field_errors().contains_key("ticket_price"));
    }

    #[test]
    fn only_price_edits_count_as_changes() {
        let current = existing();
        assert!(!prices_changed(&current, &form()));

        let renamed = MatchForm { team2: "Sri Lanka".into(), ..form() };
        assert!(!prices_changed(&current, &renamed));

        let premium = MatchForm { premium_price: Some(300.0), ..form() };
        assert!(prices_changed(&current, &premium));
    }

    #[test]
    fn tiers_skip_missing_prices() {
        assert_eq!(price_tiers(75.0, None, Some(250.0)), vec![("Regular", 75.0), ("Premium", 250.0)]);
        assert_eq!(form().tiers(), vec![("Regular", 85.0), ("VIP", 170.0)]);
    }

    #[test]
    fn list_fields_are_split_on_commas() {
        assert_eq!(split_list(Some("Wi-Fi, Museum ,, Bar")), vec!["Wi-Fi", "Museum", "Bar"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn blank_optional_prices_deserialize_as_none() {
        let form: MatchForm = parse_form(&[
            ("team1", "India"),
            ("team2", "Pakistan"),
            ("stadium_id", "2"),
            ("match_date", "2025-07-01T14:30"),
            ("ticket_price", "85"),
            ("vip_price", ""),
            ("premium_price", "300"),
        ]);
        assert_eq!(form.vip_price, None);
        assert_eq!(form.premium_price, Some(300.0));
    }

    #[test]
    fn blank_colour_falls_back_to_the_default() {
        let form: SeatCategoryForm = parse_form(&[("name", "Pavilion"), ("description", ""), ("color_code", "")]);
        assert_eq!(form.color_code, None);
        assert!(form.validate().is_ok());

        let form: SeatCategoryForm = parse_form(&[("name", "Pavilion"), ("color_code", "%23ffd700")]);
        assert_eq!(form.color_code.as_deref(), Some("#ffd700"));
        assert!(form.validate().is_ok());

        let form: SeatCategoryForm = parse_form(&[("name", "Pavilion"), ("color_code", "gold")]);
        assert!(form.validate().is_err());
    }

    // Goes through the same deserializer axum's Form extractor uses.
    fn parse_form<T: serde::de::DeserializeOwned>(pairs: &[(&str, &str)]) -> T {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let request = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(axum::body::Body::from(body))
            .unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime
            .block_on(<Form<T> as axum::extract::FromRequest<()>>::from_request(request, &()))
            .map(|Form(v)| v)
            .unwrap()
    }
}
