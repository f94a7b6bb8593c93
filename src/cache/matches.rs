use crate::cache::CacheService;
use redis::AsyncCommands;

const MATCH_LIST_PATTERN: &str = "matches:list:*";

impl CacheService {
    /// Returns a cached match-list response by key.
    pub async fn get_cached_match_list(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.get(key).await
    }

    /// Stores a match-list response with the given TTL (seconds).
    pub async fn cache_match_list(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.set_ex(key, value, ttl_seconds).await
    }

    /// Drops every cached match list. Called after admin edits.
    pub async fn invalidate_match_lists(&self) {
        let mut conn = self.redis.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(MATCH_LIST_PATTERN)
            .query_async(&mut conn)
            .await
            .unwrap_or_default();

        if keys.is_empty() {
            return;
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.del(key);
        }
        match pipe.query_async::<()>(&mut conn).await {
            Ok(()) => tracing::info!("Invalidated {} cached match lists", keys.len()),
            Err(e) => tracing::warn!("failed to invalidate match lists: {:?}", e),
        }
    }
}

pub fn match_list_key(query: &str, date: &str, page: u32, page_size: u32) -> String {
    format!("matches:list:q={}&date={}&p={}&ps={}", query, date, page, page_size)
}
