use serde::Serialize;
use sqlx::{types::Json, FromRow};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub phone: Option<String>,
    pub favorite_teams: Json<Vec<String>>,
    pub loyalty_points: i32,
    pub membership_tier: String,
    pub created_at: NaiveDateTime,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, is_admin, phone, favorite_teams, \
                            loyalty_points, membership_tier, created_at";

impl User {
    pub async fn find_by_email(email: &str, pool: &sqlx::PgPool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(id: i64, pool: &sqlx::PgPool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(
        pool: &sqlx::PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
        is_admin: bool,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, phone, is_admin)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(phone)
        .bind(is_admin)
        .fetch_one(pool)
        .await
    }
}
