use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::User,
    services::auth::{clear_session_cookie, hash_password, session_cookie, verify_password},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
    pub phone: Option<String>,
}

// POST /api/register
async fn register(
    State(state): State<Arc<AppState>>,
    Form(mut form): Form<RegisterForm>,
) -> AppResult<impl IntoResponse> {
    form.name = form.name.trim().to_string();
    form.email = form.email.trim().to_string();
    form.validate()?;

    if User::find_by_email(&form.email, &state.db.pool).await?.is_some() {
        return Err(AppError::EmailTaken);
    }

    let hash = hash_password(form.password, state.config.auth.bcrypt_cost).await?;
    let phone = form.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    // A concurrent registration with the same email still hits users_email_key.
    let user = User::insert(&state.db.pool, &form.name, &form.email, &hash, phone, false).await?;
    tracing::info!("Registered user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful! Please log in.",
            "user": user,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

// POST /api/login
async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> AppResult<impl IntoResponse> {
    let user = User::find_by_email(form.email.trim(), &state.db.pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(form.password, user.password_hash.clone()).await? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let (token, _claims) = state.tokens.issue(user.id, user.is_admin)?;
    let cookie = session_cookie(&token, state.tokens.ttl_seconds(), state.config.is_production());
    let redirect = redirect_target(form.next.as_deref(), user.is_admin);

    tracing::info!("User {} logged in", user.id);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "token": token,
            "redirect": redirect,
            "user": user,
        })),
    ))
}

/// Where to send the user after login. Only same-site paths are honoured for `next`.
fn redirect_target(next: Option<&str>, is_admin: bool) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ if is_admin => "/api/admin/dashboard".to_string(),
        _ => "/api/matches".to_string(),
    }
}

// POST /api/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    // Basic-auth callers have nothing to revoke.
    if let Some(claims) = &user.session {
        state
            .cache
            .revoke_session(&claims.jti, claims.remaining_seconds())
            .await?;
    }

    tracing::info!("User {} logged out", user.user_id);

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({
            "success": true,
            "message": "You have been logged out.",
        })),
    ))
}

// GET /api/me
async fn me(user: AuthUser) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "user": {
            "id": user.user_id,
            "email": user.email,
            "name": user.name,
            "is_admin": user.is_admin,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_used_when_it_is_a_local_path() {
        assert_eq!(redirect_target(Some("/api/tickets"), false), "/api/tickets");
        assert_eq!(redirect_target(Some("https://evil.example"), false), "/api/matches");
        assert_eq!(redirect_target(Some("//evil.example"), true), "/api/admin/dashboard");
    }

    #[test]
    fn default_redirect_depends_on_role() {
        assert_eq!(redirect_target(None, true), "/api/admin/dashboard");
        assert_eq!(redirect_target(None, false), "/api/matches");
    }

    #[test]
    fn registration_form_rules() {
        let form = RegisterForm {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "secret1".into(),
            phone: None,
        };
        assert!(form.validate().is_ok());

        let short = RegisterForm { password: "12345".into(), ..form };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let bad_email = RegisterForm {
            name: "".into(),
            email: "not-an-email".into(),
            password: "secret1".into(),
            phone: None,
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("name"));
    }
}
