use serde::Serialize;
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SeatCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub benefits: Json<Vec<String>>,
    pub color_code: String,
}
