use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDateTime;

/// A physical seat: 1-based row and seat number within a stadium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatCoordinate {
    pub row: i32,
    pub seat: i32,
}

impl std::fmt::Display for SeatCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.row, self.seat)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub match_id: i64,
    pub seat_row: i32,
    pub seat_number: i32,
    pub seat_category: String,
    pub total_amount: f64,
    pub discount_applied: f64,
    pub loyalty_points_earned: i32,
    pub booking_date: NaiveDateTime,
    pub payment_status: String,
    pub qr_code: Option<String>,
    pub check_in_time: Option<NaiveDateTime>,
}

pub const BOOKING_COLUMNS: &str = "id, user_id, match_id, seat_row, seat_number, seat_category, \
                                   total_amount, discount_applied, loyalty_points_earned, \
                                   booking_date, payment_status, qr_code, check_in_time";

/// Everything printed on a ticket: booking joined with match, venue and holder.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TicketDetails {
    pub booking_id: i64,
    pub user_id: i64,
    pub match_id: i64,
    pub seat_row: i32,
    pub seat_number: i32,
    pub seat_category: String,
    pub total_amount: f64,
    pub booking_date: NaiveDateTime,
    pub payment_status: String,
    pub qr_code: Option<String>,
    pub team1: String,
    pub team2: String,
    pub match_date: NaiveDateTime,
    pub stadium_name: String,
    pub stadium_city: String,
    pub holder_name: String,
}

pub const TICKET_DETAILS_SELECT: &str = r#"
    SELECT b.id AS booking_id, b.user_id, b.match_id, b.seat_row, b.seat_number,
           b.seat_category, b.total_amount, b.booking_date, b.payment_status, b.qr_code,
           m.team1, m.team2, m.match_date,
           s.name AS stadium_name, s.city AS stadium_city,
           u.name AS holder_name
    FROM bookings b
    JOIN matches m ON m.id = b.match_id
    JOIN stadiums s ON s.id = m.stadium_id
    JOIN users u ON u.id = b.user_id
"#;
