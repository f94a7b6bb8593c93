use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::info;

fn revoked_key(jti: &str) -> String {
    format!("session:revoked:{}", jti)
}

impl CacheService {
    /// Marks a session token as logged out until it would have expired anyway.
    pub async fn revoke_session(&self, jti: &str, ttl_seconds: u64) -> Result<(), redis::RedisError> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        let mut conn = self.redis.conn.clone();
        let _: () = conn.set_ex(revoked_key(jti), 1, ttl_seconds).await?;
        info!("Revoked session {}", jti);
        Ok(())
    }

    pub async fn is_session_revoked(&self, jti: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.exists(revoked_key(jti)).await
    }
}
