//! Password hashing and session tokens.
//!
//! Sessions are signed JWTs carried in the `session` cookie (or a Bearer
//! header). Each token has a `jti` so logout can revoke it in Redis before
//! it expires.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: i64,
    pub admin: bool,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    /// Seconds until the token expires, never negative.
    pub fn remaining_seconds(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::hours(config.expires_in_hours),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user_id: i64, is_admin: bool) -> AppResult<(String, SessionClaims)> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            admin: is_admin,
            jti: uuid::Uuid::new_v4().to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session token: {e}")))?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected session token: {}", e);
                AppError::Unauthorized
            })
    }
}

pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("bcrypt failed: {e}")))
}

pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))?
        // A malformed stored hash is treated as a mismatch.
        .or(Ok(false))
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Extracts a named cookie from a `Cookie` header value.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(hours: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "test-secret".into(),
            expires_in_hours: hours,
        })
    }

    #[test]
    fn issued_tokens_verify() {
        let service = tokens(1);
        let (token, claims) = service.issue(42, true).unwrap();
        let verified = service.verify(&token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.sub, 42);
        assert!(verified.admin);
        assert!(verified.remaining_seconds() > 3500);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        // Well past the default leeway of 60 seconds.
        let service = tokens(-1);
        let (token, _) = service.issue(1, false).unwrap();
        assert!(matches!(service.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let (token, _) = tokens(1).issue(7, false).unwrap();
        let other = TokenService::new(&JwtConfig {
            secret: "different".into(),
            expires_in_hours: 1,
        });
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn cookie_parsing() {
        let header = "theme=dark; session=abc.def.ghi; other=1";
        assert_eq!(cookie_value(header, SESSION_COOKIE), Some("abc.def.ghi"));
        assert_eq!(cookie_value("session=", SESSION_COOKIE), None);
        assert_eq!(cookie_value("sessions=x", SESSION_COOKIE), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", 3600, true);
        assert!(cookie.starts_with("session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("admin123".into(), 4).await.unwrap();
        assert!(verify_password("admin123".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
        assert!(!verify_password("x".into(), "not-a-hash".into()).await.unwrap());
    }
}
