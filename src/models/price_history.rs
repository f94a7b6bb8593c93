use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriceHistory {
    pub id: i64,
    pub match_id: i64,
    pub seat_category: String,
    pub price: f64,
    pub date_changed: NaiveDateTime,
    pub reason: Option<String>,
}

impl PriceHistory {
    /// Appends one row per priced tier.
    pub async fn record(
        conn: &mut sqlx::PgConnection,
        match_id: i64,
        tiers: &[(&str, f64)],
        reason: &str,
    ) -> Result<(), sqlx::Error> {
        for &(category, price) in tiers {
            sqlx::query(
                "INSERT INTO price_history (match_id, seat_category, price, reason)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(match_id)
            .bind(category)
            .bind(price)
            .bind(reason)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
