pub mod admin;
pub mod auth;
pub mod bookings;
pub mod matches;
pub mod notifications;
pub mod reviews;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(matches::routes())
        .merge(reviews::routes())
        .merge(bookings::routes())
        .merge(notifications::routes())
        .nest("/admin", admin::routes())
}
