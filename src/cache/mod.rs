use crate::{database::Database, redis_client::RedisClient};
use tracing::info;

pub mod auth;
pub mod matches;
pub mod pending;
pub mod seats;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    seat_map_ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, seat_map_ttl_seconds: u64) -> Self {
        Self { redis, db, seat_map_ttl_seconds }
    }

    // Preload seat maps for upcoming matches
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        let upcoming: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM matches WHERE match_date > (NOW() AT TIME ZONE 'UTC') ORDER BY match_date",
        )
        .fetch_all(&self.db.pool)
        .await
        .unwrap_or_default();

        for match_id in &upcoming {
            let _ = self.get_booked_seats(*match_id).await;
        }

        info!("Cache warmup done: {} seat maps", upcoming.len());
    }
}
