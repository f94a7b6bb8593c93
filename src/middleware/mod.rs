use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::User,
    services::auth::{cookie_value, verify_password, SessionClaims, SESSION_COOKIE},
    AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    /// Present when the request carried a session token rather than Basic credentials.
    pub session: Option<SessionClaims>,
}

impl AuthUser {
    fn from_user(user: User, session: Option<SessionClaims>) -> Self {
        AuthUser {
            user_id: user.id,
            email: user.email,
            name: user.name,
            is_admin: user.is_admin,
            session,
        }
    }
}

/// An authenticated user with the admin flag set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

enum Credentials {
    Token(String),
    Basic { email: String, password: String },
}

fn credentials(headers: &HeaderMap) -> Option<Credentials> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(Credentials::Token(token.trim().to_string()));
        }
        if let Some(encoded) = value.strip_prefix("Basic ") {
            let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
            let decoded = String::from_utf8(decoded).ok()?;
            let (email, password) = decoded.split_once(':')?;
            return Some(Credentials::Basic {
                email: email.to_string(),
                password: password.to_string(),
            });
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookies| cookie_value(cookies, SESSION_COOKIE))
        .map(|token| Credentials::Token(token.to_string()))
}

// Session cookie, Bearer token or Basic auth
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match credentials(&parts.headers).ok_or(AppError::Unauthorized)? {
            Credentials::Token(token) => {
                let claims = state.tokens.verify(&token)?;

                if state.cache.is_session_revoked(&claims.jti).await? {
                    return Err(AppError::Unauthorized);
                }

                // The account may have been deleted since the token was issued.
                let user = User::find_by_id(claims.sub, &state.db.pool)
                    .await?
                    .ok_or(AppError::Unauthorized)?;

                Ok(AuthUser::from_user(user, Some(claims)))
            }
            Credentials::Basic { email, password } => {
                let user = User::find_by_email(&email, &state.db.pool)
                    .await?
                    .ok_or(AppError::Unauthorized)?;

                if !verify_password(password, user.password_hash.clone()).await? {
                    return Err(AppError::Unauthorized);
                }

                Ok(AuthUser::from_user(user, None))
            }
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!("User {} denied admin access to {}", user.user_id, parts.uri.path());
            return Err(AppError::Forbidden(
                "Access denied. Admin privileges required.".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}
