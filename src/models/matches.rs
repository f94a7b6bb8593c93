use serde::Serialize;
use sqlx::{types::Json, FromRow};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Match {
    pub id: i64,
    pub team1: String,
    pub team2: String,
    pub stadium_id: i64,
    pub match_date: NaiveDateTime,
    pub match_type: String,
    pub tournament: Option<String>,
    pub ticket_price: f64,
    pub vip_price: Option<f64>,
    pub premium_price: Option<f64>,
    pub status: String,
    pub weather_forecast: Option<String>,
    pub live_score: Json<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

impl Match {
    pub fn title(&self) -> String {
        format!("{} vs {}", self.team1, self.team2)
    }
}

/// Match row joined with the venue fields shown in listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MatchWithStadium {
    pub id: i64,
    pub team1: String,
    pub team2: String,
    pub match_date: NaiveDateTime,
    pub match_type: String,
    pub tournament: Option<String>,
    pub ticket_price: f64,
    pub vip_price: Option<f64>,
    pub premium_price: Option<f64>,
    pub status: String,
    pub weather_forecast: Option<String>,
    pub stadium_id: i64,
    pub stadium_name: String,
    pub stadium_city: String,
    pub rows: i32,
    pub seats_per_row: i32,
}

pub const MATCH_COLUMNS: &str = "id, team1, team2, stadium_id, match_date, match_type, tournament, \
                                 ticket_price, vip_price, premium_price, status, weather_forecast, \
                                 live_score, created_at";

pub const MATCH_WITH_STADIUM_SELECT: &str = r#"
    SELECT m.id, m.team1, m.team2, m.match_date, m.match_type, m.tournament,
           m.ticket_price, m.vip_price, m.premium_price, m.status, m.weather_forecast,
           s.id AS stadium_id, s.name AS stadium_name, s.city AS stadium_city,
           s.rows, s.seats_per_row
    FROM matches m
    JOIN stadiums s ON s.id = m.stadium_id
"#;

impl MatchWithStadium {
    /// Whether a seat falls inside the venue's rows x seats_per_row grid.
    pub fn contains_seat(&self, row: i32, seat: i32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats_per_row).contains(&seat)
    }

    pub async fn find(pool: &sqlx::PgPool, match_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MatchWithStadium>(&format!("{MATCH_WITH_STADIUM_SELECT} WHERE m.id = $1"))
            .bind(match_id)
            .fetch_optional(pool)
            .await
    }
}
