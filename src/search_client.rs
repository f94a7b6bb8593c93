use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::models::{matches::MATCH_WITH_STADIUM_SELECT, MatchWithStadium};

/// Lookup of upcoming matches for the listing page.
#[derive(Clone)]
pub struct SearchClient {
    pool: PgPool,
}

impl SearchClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search_matches(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
        from_date: Option<NaiveDateTime>,
    ) -> Result<Vec<MatchWithStadium>, sqlx::Error> {
        let pattern = Self::prepare_search_pattern(query);
        if pattern.is_none() && from_date.is_none() {
            // Plain listing, the common case
            self.upcoming(limit, offset).await
        } else {
            self.filtered(pattern, limit, offset, from_date).await
        }
    }

    async fn upcoming(&self, limit: i64, offset: i64) -> Result<Vec<MatchWithStadium>, sqlx::Error> {
        sqlx::query_as::<_, MatchWithStadium>(&format!(
            "{MATCH_WITH_STADIUM_SELECT}
             WHERE m.match_date > (NOW() AT TIME ZONE 'UTC')
             ORDER BY m.match_date, m.id
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Team/tournament substring match, optionally from a given date.
    async fn filtered(
        &self,
        pattern: Option<String>,
        limit: i64,
        offset: i64,
        from_date: Option<NaiveDateTime>,
    ) -> Result<Vec<MatchWithStadium>, sqlx::Error> {
        sqlx::query_as::<_, MatchWithStadium>(&format!(
            "{MATCH_WITH_STADIUM_SELECT}
             WHERE m.match_date > (NOW() AT TIME ZONE 'UTC')
               AND ($1::text IS NULL
                    OR m.team1 ILIKE $1 OR m.team2 ILIKE $1 OR m.tournament ILIKE $1)
               AND ($4::timestamp IS NULL OR m.match_date >= $4)
             ORDER BY m.match_date, m.id
             LIMIT $2 OFFSET $3"
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .bind(from_date)
        .fetch_all(&self.pool)
        .await
    }

    /// Turns free text into an ILIKE pattern, or `None` when nothing is left.
    fn prepare_search_pattern(query: &str) -> Option<String> {
        let cleaned = query
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if cleaned.is_empty() {
            None
        } else {
            Some(format!("%{}%", cleaned))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_patterns_strip_wildcards() {
        assert_eq!(SearchClient::prepare_search_pattern(""), None);
        assert_eq!(SearchClient::prepare_search_pattern("  %_ "), None);
        assert_eq!(
            SearchClient::prepare_search_pattern("  New   Zealand% "),
            Some("%New Zealand%".to_string())
        );
        assert_eq!(
            SearchClient::prepare_search_pattern("T20-Series"),
            Some("%T20-Series%".to_string())
        );
    }
}
