//! Application error type and its HTTP mapping.
//!
//! Every handler returns `AppResult<T>`. Failures are rendered as
//! `{"success": false, "message": "..."}`; storage failures are logged and
//! answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

const BOOKING_SEAT_CONSTRAINT: &str = "bookings_match_seat_key";
const USER_EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("No seats selected")]
    NoSeatsSelected,

    #[error("Seat {row}-{seat} is outside the stadium layout")]
    SeatOutOfBounds { row: i32, seat: i32 },

    #[error("Seat {row}-{seat} is already booked")]
    SeatAlreadyBooked { row: i32, seat: i32 },

    #[error("Email already registered. Please use a different email.")]
    EmailTaken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Please log in to access this page.")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("No booking details found. Please select seats first.")]
    MissingBookingSession,

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn access_denied() -> Self {
        AppError::Forbidden("Access denied.".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::Validation(_)
            | AppError::NoSeatsSelected
            | AppError::SeatOutOfBounds { .. }
            | AppError::MissingBookingSession => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SeatAlreadyBooked { .. } | AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Name of the unique constraint a database error violated, if any.
    pub fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // Seat conflicts are mapped by the booking store, which knows the seat.
        match AppError::violated_constraint(&err) {
            Some(USER_EMAIL_CONSTRAINT) => AppError::EmailTaken,
            _ => AppError::Database(err),
        }
    }
}

pub fn is_seat_conflict(err: &sqlx::Error) -> bool {
    AppError::violated_constraint(err) == Some(BOOKING_SEAT_CONSTRAINT)
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "Something went wrong. Please try again.".to_string()
            }
            AppError::Redis(e) => {
                tracing::error!("redis error: {:?}", e);
                "Something went wrong. Please try again.".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                "Something went wrong. Please try again.".to_string()
            }
            AppError::Validation(errors) => errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Invalid form data.".to_string()),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { success: false, message })).into_response()
    }
}
