use serde::Serialize;
use sqlx::{types::Json, FromRow};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Stadium {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub country: String,
    pub capacity: i32,
    pub rows: i32,
    pub seats_per_row: i32,
    pub amenities: Json<Vec<String>>,
    pub weather_info: Option<String>,
    pub pitch_type: String,
    pub created_at: NaiveDateTime,
}
