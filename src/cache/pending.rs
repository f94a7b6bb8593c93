use crate::cache::CacheService;
use crate::services::booking::PendingBooking;
use redis::AsyncCommands;

fn pending_key(user_id: i64) -> String {
    format!("booking:pending:{}", user_id)
}

impl CacheService {
    /// Keeps the user's seat selection until payment, replacing any earlier one.
    pub async fn stash_pending_booking(
        &self,
        user_id: i64,
        pending: &PendingBooking,
        ttl_seconds: u64,
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(pending).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(pending_key(user_id), data, ttl_seconds).await
    }

    pub async fn get_pending_booking(&self, user_id: i64) -> Result<Option<PendingBooking>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(pending_key(user_id)).await?;
        match data {
            // An unreadable entry behaves like an expired one.
            Some(raw) => Ok(serde_json::from_str(&raw).ok()),
            None => Ok(None),
        }
    }

    pub async fn clear_pending_booking(&self, user_id: i64) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.del(pending_key(user_id)).await
    }
}
