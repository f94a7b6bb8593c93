use crate::cache::CacheService;
use crate::models::SeatCoordinate;
use redis::AsyncCommands;
use tracing::info;

fn seats_key(match_id: i64) -> String {
    format!("seats:{}", match_id)
}

impl CacheService {
    /// Booked seats for a match, read through the cache.
    ///
    /// Readers only fill an empty slot (`SET NX`), so a list loaded before a
    /// booking committed cannot overwrite the one `refresh_seats` wrote after it.
    pub async fn get_booked_seats(&self, match_id: i64) -> Result<Vec<SeatCoordinate>, sqlx::Error> {
        if let Ok(seats) = self.get_booked_seats_from_cache(match_id).await {
            return Ok(seats);
        }

        let seats = self.load_booked_seats_from_db(match_id).await?;
        if let Err(e) = self.fill_booked_seats_cache(match_id, &seats).await {
            tracing::warn!("failed to cache seat map for match {}: {:?}", match_id, e);
        }
        Ok(seats)
    }

    /// Reloads a match's seat map from Postgres and overwrites the cached one.
    /// Called after bookings for the match commit.
    pub async fn refresh_seats(&self, match_id: i64) {
        let seats = match self.load_booked_seats_from_db(match_id).await {
            Ok(seats) => seats,
            Err(e) => {
                tracing::warn!("failed to reload seat map for match {}: {:?}", match_id, e);
                self.invalidate_seats(match_id).await;
                return;
            }
        };

        match self.overwrite_booked_seats_cache(match_id, &seats).await {
            Ok(()) => info!("Refreshed seats cache for match {} ({} booked)", match_id, seats.len()),
            Err(e) => {
                tracing::warn!("failed to refresh seat map for match {}: {:?}", match_id, e);
                self.invalidate_seats(match_id).await;
            }
        }
    }

    pub async fn invalidate_seats(&self, match_id: i64) {
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(seats_key(match_id)).await;
        info!("Invalidated seats cache for match {}", match_id);
    }

    async fn load_booked_seats_from_db(&self, match_id: i64) -> Result<Vec<SeatCoordinate>, sqlx::Error> {
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT seat_row, seat_number FROM bookings WHERE match_id = $1 ORDER BY seat_row, seat_number",
        )
        .bind(match_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(row, seat)| SeatCoordinate { row, seat })
            .collect())
    }

    async fn get_booked_seats_from_cache(&self, match_id: i64) -> Result<Vec<SeatCoordinate>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get(seats_key(match_id)).await?;
        serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })
    }

    /// Writes the seat map only if no entry exists. Returns whether it was written.
    async fn fill_booked_seats_cache(&self, match_id: i64, seats: &[SeatCoordinate]) -> Result<bool, redis::RedisError> {
        let data = encode_seats(seats)?;
        let mut conn = self.redis.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(seats_key(match_id))
            .arg(data)
            .arg("NX")
            .arg("EX")
            .arg(self.seat_map_ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn overwrite_booked_seats_cache(&self, match_id: i64, seats: &[SeatCoordinate]) -> Result<(), redis::RedisError> {
        let data = encode_seats(seats)?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(seats_key(match_id), data, self.seat_map_ttl_seconds).await
    }
}

fn encode_seats(seats: &[SeatCoordinate]) -> Result<String, redis::RedisError> {
    serde_json::to_string(seats)
        .map_err(|_| redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error")))
}
