//! booking.rs
//!
//! Seat selection and booking confirmation.
//!
//! A booking request names a match and a list of seat coordinates. It is
//! all-or-nothing: either every seat becomes a booking row or none does.
//!
//! 1.  **Selection** (`select_seats`): validates the request and pre-checks
//!     the seats against existing bookings so the user gets early feedback.
//!     The result is a `PendingBooking` kept in the user's session.
//! 2.  **Confirmation** (`confirm`): inserts one row per seat inside a single
//!     transaction. The `bookings_match_seat_key` unique constraint is the
//!     real guard: when two users race for a seat, the second insert fails
//!     the constraint, the whole transaction rolls back and the caller gets
//!     `SeatAlreadyBooked` for that seat.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{is_seat_conflict, AppError, AppResult},
    models::{
        booking::{BOOKING_COLUMNS, TICKET_DETAILS_SELECT},
        Booking, MatchWithStadium, SeatCoordinate, TicketDetails,
    },
    services::tickets::ticket_code,
};

pub const DEFAULT_SEAT_CATEGORY: &str = "Regular";

/// Seats chosen by a user and waiting for payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBooking {
    pub match_id: i64,
    pub seats: Vec<SeatCoordinate>,
    pub total_amount: f64,
}

/// Rows to insert for one confirmed request.
#[derive(Debug, Clone)]
pub struct NewBookings {
    pub user_id: i64,
    pub match_id: i64,
    pub amount_per_seat: f64,
    pub category: String,
    /// Seat and its ticket code.
    pub seats: Vec<(SeatCoordinate, String)>,
}

/// Persistence used by the booking flow.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_match(&self, match_id: i64) -> AppResult<Option<MatchWithStadium>>;

    /// Which of `seats` are already booked for the match.
    async fn taken_seats(&self, match_id: i64, seats: &[SeatCoordinate]) -> AppResult<Vec<SeatCoordinate>>;

    /// Inserts every row or none. A seat taken in the meantime fails the
    /// whole batch with `SeatAlreadyBooked`.
    async fn insert_all(&self, new: NewBookings) -> AppResult<Vec<Booking>>;

    async fn find_ticket(&self, booking_id: i64) -> AppResult<Option<TicketDetails>>;

    async fn tickets_for_user(&self, user_id: i64) -> AppResult<Vec<TicketDetails>>;
}

/// Splits a total evenly across `seat_count` seats.
pub fn split_evenly(total_amount: f64, seat_count: usize) -> f64 {
    if seat_count == 0 {
        return 0.0;
    }
    total_amount / seat_count as f64
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    enforce_seat_bounds: bool,
    ticket_secret: String,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, enforce_seat_bounds: bool, ticket_secret: String) -> Self {
        Self { store, enforce_seat_bounds, ticket_secret }
    }

    /// Validates a seat selection and prices it at the match's base price.
    pub async fn select_seats(&self, match_id: i64, seats: &[SeatCoordinate]) -> AppResult<PendingBooking> {
        check_seat_list(seats)?;

        let fixture = self
            .store
            .find_match(match_id)
            .await?
            .ok_or(AppError::NotFound("Match"))?;

        self.check_bounds(&fixture, seats)?;

        let taken = self.store.taken_seats(match_id, seats).await?;
        if let Some(seat) = seats.iter().find(|s| taken.contains(s)) {
            info!("Seat {} for match {} rejected by pre-check", seat, match_id);
            return Err(AppError::SeatAlreadyBooked { row: seat.row, seat: seat.seat });
        }

        Ok(PendingBooking {
            match_id,
            seats: seats.to_vec(),
            total_amount: seats.len() as f64 * fixture.ticket_price,
        })
    }

    /// Turns a paid selection into booking rows, atomically.
    pub async fn confirm(&self, user_id: i64, pending: &PendingBooking) -> AppResult<Vec<Booking>> {
        check_seat_list(&pending.seats)?;

        let fixture = self
            .store
            .find_match(pending.match_id)
            .await?
            .ok_or(AppError::NotFound("Match"))?;
        self.check_bounds(&fixture, &pending.seats)?;

        let seats = pending
            .seats
            .iter()
            .map(|seat| {
                let code = ticket_code(&self.ticket_secret, user_id, pending.match_id, *seat);
                (*seat, code)
            })
            .collect();

        let created = self
            .store
            .insert_all(NewBookings {
                user_id,
                match_id: pending.match_id,
                amount_per_seat: split_evenly(pending.total_amount, pending.seats.len()),
                category: DEFAULT_SEAT_CATEGORY.to_string(),
                seats,
            })
            .await?;

        info!(
            "User {} booked {} seats for match {} (total {:.2})",
            user_id,
            created.len(),
            pending.match_id,
            pending.total_amount
        );
        Ok(created)
    }

    /// A booking's ticket, only for the user who owns it.
    pub async fn ticket_for(&self, user_id: i64, booking_id: i64) -> AppResult<TicketDetails> {
        let ticket = self
            .store
            .find_ticket(booking_id)
            .await?
            .ok_or(AppError::NotFound("Booking"))?;

        if ticket.user_id != user_id {
            warn!("User {} tried to access booking {} of user {}", user_id, booking_id, ticket.user_id);
            return Err(AppError::access_denied());
        }
        Ok(ticket)
    }

    pub async fn tickets(&self, user_id: i64) -> AppResult<Vec<TicketDetails>> {
        self.store.tickets_for_user(user_id).await
    }

    fn check_bounds(&self, fixture: &MatchWithStadium, seats: &[SeatCoordinate]) -> AppResult<()> {
        for seat in seats {
            if fixture.contains_seat(seat.row, seat.seat) {
                continue;
            }
            if self.enforce_seat_bounds {
                return Err(AppError::SeatOutOfBounds { row: seat.row, seat: seat.seat });
            }
            warn!(
                "Seat {} is outside the {}x{} layout of match {}; accepted",
                seat, fixture.rows, fixture.seats_per_row, fixture.id
            );
        }
        Ok(())
    }
}

/// Request-shape checks that need no storage.
fn check_seat_list(seats: &[SeatCoordinate]) -> AppResult<()> {
    if seats.is_empty() {
        return Err(AppError::NoSeatsSelected);
    }

    let mut seen = HashSet::with_capacity(seats.len());
    for seat in seats {
        if seat.row < 1 || seat.seat < 1 {
            return Err(AppError::BadRequest(format!(
                "Seat {} is not a valid seat; rows and seats start at 1",
                seat
            )));
        }
        if !seen.insert(*seat) {
            return Err(AppError::SeatAlreadyBooked { row: seat.row, seat: seat.seat });
        }
    }
    Ok(())
}

/* ---------- Postgres ---------- */

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_match(&self, match_id: i64) -> AppResult<Option<MatchWithStadium>> {
        Ok(MatchWithStadium::find(&self.pool, match_id).await?)
    }

    async fn taken_seats(&self, match_id: i64, seats: &[SeatCoordinate]) -> AppResult<Vec<SeatCoordinate>> {
        let rows: Vec<i32> = seats.iter().map(|s| s.row).collect();
        let numbers: Vec<i32> = seats.iter().map(|s| s.seat).collect();

        let taken: Vec<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT b.seat_row, b.seat_number
            FROM bookings b
            JOIN UNNEST($2::int4[], $3::int4[]) AS req(seat_row, seat_number)
              ON req.seat_row = b.seat_row AND req.seat_number = b.seat_number
            WHERE b.match_id = $1
            "#,
        )
        .bind(match_id)
        .bind(&rows)
        .bind(&numbers)
        .fetch_all(&self.pool)
        .await?;

        Ok(taken
            .into_iter()
            .map(|(row, seat)| SeatCoordinate { row, seat })
            .collect())
    }

    async fn insert_all(&self, new: NewBookings) -> AppResult<Vec<Booking>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(new.seats.len());

        for (seat, code) in &new.seats {
            let inserted = sqlx::query_as::<_, Booking>(&format!(
                "INSERT INTO bookings
                    (user_id, match_id, seat_row, seat_number, seat_category,
                     total_amount, payment_status, qr_code)
                 VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7)
                 RETURNING {BOOKING_COLUMNS}"
            ))
            .bind(new.user_id)
            .bind(new.match_id)
            .bind(seat.row)
            .bind(seat.seat)
            .bind(&new.category)
            .bind(new.amount_per_seat)
            .bind(code)
            .fetch_one(&mut *tx)
            .await;

            match inserted {
                Ok(booking) => created.push(booking),
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        tracing::warn!("rollback after failed seat insert for match {} failed: {:?}", new.match_id, rollback);
                    }
                    if is_seat_conflict(&e) {
                        info!("Seat {} for match {} lost to a concurrent booking", seat, new.match_id);
                        return Err(AppError::SeatAlreadyBooked { row: seat.row, seat: seat.seat });
                    }
                    return Err(e.into());
                }
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_ticket(&self, booking_id: i64) -> AppResult<Option<TicketDetails>> {
        Ok(sqlx::query_as::<_, TicketDetails>(&format!("{TICKET_DETAILS_SELECT} WHERE b.id = $1"))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn tickets_for_user(&self, user_id: i64) -> AppResult<Vec<TicketDetails>> {
        Ok(sqlx::query_as::<_, TicketDetails>(&format!(
            "{TICKET_DETAILS_SELECT} WHERE b.user_id = $1 ORDER BY m.match_date, b.seat_row, b.seat_number"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn seat_of(booking: &Booking) -> SeatCoordinate {
        SeatCoordinate { row: booking.seat_row, seat: booking.seat_number }
    }

    /// Stand-in for the bookings table: the seat check and the inserts
    /// happen under one lock, like the unique constraint inside a commit.
    #[derive(Default)]
    struct MemoryStore {
        matches: HashMap<i64, MatchWithStadium>,
        holders: HashMap<i64, String>,
        bookings: Mutex<Vec<Booking>>,
    }

    impl MemoryStore {
        fn with_match(mut self, id: i64, rows: i32, seats_per_row: i32, price: f64) -> Self {
            self.matches.insert(
                id,
                MatchWithStadium {
                    id,
                    team1: "England".into(),
                    team2: "Australia".into(),
                    match_date: (Utc::now() + Duration::days(5)).naive_utc(),
                    match_type: "ODI".into(),
                    tournament: Some("Cricket World Cup 2025".into()),
                    ticket_price: price,
                    vip_price: Some(price * 2.0),
                    premium_price: None,
                    status: "Upcoming".into(),
                    weather_forecast: None,
                    stadium_id: 1,
                    stadium_name: "Lord's Cricket Ground".into(),
                    stadium_city: "London".into(),
                    rows,
                    seats_per_row,
                },
            );
            self
        }

        fn with_user(mut self, id: i64, name: &str) -> Self {
            self.holders.insert(id, name.to_string());
            self
        }

        fn rows_for(&self, match_id: i64) -> Vec<Booking> {
            self.bookings
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.match_id == match_id)
                .cloned()
                .collect()
        }

        fn details(&self, booking: &Booking) -> TicketDetails {
            let fixture = &self.matches[&booking.match_id];
            TicketDetails {
                booking_id: booking.id,
                user_id: booking.user_id,
                match_id: booking.match_id,
                seat_row: booking.seat_row,
                seat_number: booking.seat_number,
                seat_category: booking.seat_category.clone(),
                total_amount: booking.total_amount,
                booking_date: booking.booking_date,
                payment_status: booking.payment_status.clone(),
                qr_code: booking.qr_code.clone(),
                team1: fixture.team1.clone(),
                team2: fixture.team2.clone(),
                match_date: fixture.match_date,
                stadium_name: fixture.stadium_name.clone(),
                stadium_city: fixture.stadium_city.clone(),
                holder_name: self.holders.get(&booking.user_id).cloned().unwrap_or_default(),
            }
        }
    }

    #[async_trait]
    impl BookingStore for MemoryStore {
        async fn find_match(&self, match_id: i64) -> AppResult<Option<MatchWithStadium>> {
            Ok(self.matches.get(&match_id).cloned())
        }

        async fn taken_seats(&self, match_id: i64, seats: &[SeatCoordinate]) -> AppResult<Vec<SeatCoordinate>> {
            Ok(self
                .rows_for(match_id)
                .iter()
                .map(seat_of)
                .filter(|s| seats.contains(s))
                .collect())
        }

        async fn insert_all(&self, new: NewBookings) -> AppResult<Vec<Booking>> {
            let mut table = self.bookings.lock().unwrap();
            for (seat, _) in &new.seats {
                if table.iter().any(|b| b.match_id == new.match_id && seat_of(b) == *seat) {
                    return Err(AppError::SeatAlreadyBooked { row: seat.row, seat: seat.seat });
                }
            }

            let mut created = Vec::new();
            for (seat, code) in new.seats {
                let booking = Booking {
                    id: table.len() as i64 + 1,
                    user_id: new.user_id,
                    match_id: new.match_id,
                    seat_row: seat.row,
                    seat_number: seat.seat,
                    seat_category: new.category.clone(),
                    total_amount: new.amount_per_seat,
                    discount_applied: 0.0,
                    loyalty_points_earned: 0,
                    booking_date: Utc::now().naive_utc(),
                    payment_status: "completed".into(),
                    qr_code: Some(code),
                    check_in_time: None,
                };
                table.push(booking.clone());
                created.push(booking);
            }
            Ok(created)
        }

        async fn find_ticket(&self, booking_id: i64) -> AppResult<Option<TicketDetails>> {
            let table = self.bookings.lock().unwrap();
            Ok(table.iter().find(|b| b.id == booking_id).map(|b| self.details(b)))
        }

        async fn tickets_for_user(&self, user_id: i64) -> AppResult<Vec<TicketDetails>> {
            let table = self.bookings.lock().unwrap();
            Ok(table
                .iter()
                .filter(|b| b.user_id == user_id)
                .map(|b| self.details(b))
                .collect())
        }
    }

    const USER_A: i64 = 1;
    const USER_B: i64 = 2;

    fn seat(row: i32, seat: i32) -> SeatCoordinate {
        SeatCoordinate { row, seat }
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::default()
                .with_match(5, 30, 50, 75.0)
                .with_user(USER_A, "Alice")
                .with_user(USER_B, "Bob"),
        )
    }

    fn service(store: Arc<MemoryStore>, enforce_bounds: bool) -> BookingService {
        BookingService::new(store, enforce_bounds, "secret".into())
    }

    async fn book(service: &BookingService, user: i64, match_id: i64, seats: &[SeatCoordinate]) -> AppResult<Vec<Booking>> {
        let pending = service.select_seats(match_id, seats).await?;
        service.confirm(user, &pending).await
    }

    #[tokio::test]
    async fn second_booking_of_a_seat_is_rejected() {
        let store = store();
        let service = service(store.clone(), false);

        let created = book(&service, USER_A, 5, &[seat(1, 1), seat(1, 2)]).await.unwrap();
        assert_eq!(created.len(), 2);
        for booking in &created {
            assert_eq!(booking.total_amount, 75.0);
            assert_eq!(booking.payment_status, "completed");
            assert_eq!(booking.seat_category, DEFAULT_SEAT_CATEGORY);
        }

        let err = book(&service, USER_B, 5, &[seat(1, 1)]).await.unwrap_err();
        assert!(matches!(err, AppError::SeatAlreadyBooked { row: 1, seat: 1 }));
        assert_eq!(err.to_string(), "Seat 1-1 is already booked");
        assert_eq!(store.rows_for(5).len(), 2);
    }

    #[tokio::test]
    async fn selection_is_priced_at_base_price() {
        let service = service(store(), false);
        let pending = service
            .select_seats(5, &[seat(3, 1), seat(3, 2), seat(3, 3)])
            .await
            .unwrap();
        assert_eq!(pending.total_amount, 225.0);
        assert_eq!(pending.seats.len(), 3);
    }

    #[tokio::test]
    async fn a_conflict_anywhere_books_nothing() {
        let store = store();
        let service = service(store.clone(), false);
        book(&service, USER_A, 5, &[seat(2, 5)]).await.unwrap();

        // Selection happened before the other user's commit.
        let stale = PendingBooking {
            match_id: 5,
            seats: vec![seat(2, 4), seat(2, 5), seat(2, 6)],
            total_amount: 225.0,
        };
        let err = service.confirm(USER_B, &stale).await.unwrap_err();
        assert!(matches!(err, AppError::SeatAlreadyBooked { row: 2, seat: 5 }));

        let rows = store.rows_for(5);
        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|b| b.user_id == USER_A));
    }

    #[tokio::test]
    async fn concurrent_confirmations_have_one_winner() {
        let store = store();
        let service = service(store.clone(), false);
        let pending = service.select_seats(5, &[seat(7, 7)]).await.unwrap();

        let (a, b) = tokio::join!(
            service.confirm(USER_A, &pending),
            service.confirm(USER_B, &pending)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.rows_for(5).len(), 1);
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let service = service(store(), false);
        assert!(matches!(
            service.select_seats(5, &[]).await,
            Err(AppError::NoSeatsSelected)
        ));
        let empty = PendingBooking { match_id: 5, seats: vec![], total_amount: 0.0 };
        assert!(matches!(
            service.confirm(USER_A, &empty).await,
            Err(AppError::NoSeatsSelected)
        ));
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let service = service(store(), false);
        let err = service.select_seats(99, &[seat(1, 1)]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Match")));
    }

    #[tokio::test]
    async fn duplicate_seat_in_one_request_is_rejected() {
        let service = service(store(), false);
        let err = service
            .select_seats(5, &[seat(4, 4), seat(4, 5), seat(4, 4)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SeatAlreadyBooked { row: 4, seat: 4 }));
    }

    #[tokio::test]
    async fn non_positive_coordinates_are_rejected() {
        let service = service(store(), false);
        let err = service.select_seats(5, &[seat(0, 3)]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn seats_outside_layout_are_accepted_by_default() {
        let store = store();
        let service = service(store.clone(), false);

        let created = book(&service, USER_A, 5, &[seat(31, 1)]).await.unwrap();
        assert_eq!(created[0].seat_row, 31);
        assert_eq!(store.rows_for(5).len(), 1);
    }

    #[tokio::test]
    async fn seats_outside_layout_are_rejected_when_enforced() {
        let store = store();
        let service = service(store.clone(), true);

        let err = book(&service, USER_A, 5, &[seat(30, 50), seat(31, 1)]).await.unwrap_err();
        assert!(matches!(err, AppError::SeatOutOfBounds { row: 31, seat: 1 }));
        assert!(store.rows_for(5).is_empty());
    }

    #[tokio::test]
    async fn only_the_owner_gets_the_ticket() {
        let service = service(store(), false);
        let created = book(&service, USER_A, 5, &[seat(1, 1)]).await.unwrap();
        let booking_id = created[0].id;

        let ticket = service.ticket_for(USER_A, booking_id).await.unwrap();
        assert_eq!(ticket.holder_name, "Alice");
        assert_eq!(ticket.qr_code.as_deref(), created[0].qr_code.as_deref());

        let err = service.ticket_for(USER_B, booking_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(err.to_string(), "Access denied.");

        let err = service.ticket_for(USER_A, 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Booking")));
    }

    #[tokio::test]
    async fn tickets_are_listed_per_user() {
        let service = service(store(), false);
        book(&service, USER_A, 5, &[seat(1, 1), seat(1, 2)]).await.unwrap();
        book(&service, USER_B, 5, &[seat(9, 9)]).await.unwrap();

        assert_eq!(service.tickets(USER_A).await.unwrap().len(), 2);
        assert_eq!(service.tickets(USER_B).await.unwrap().len(), 1);
    }

    #[test]
    fn pending_booking_survives_the_session_store() {
        let pending = PendingBooking {
            match_id: 5,
            seats: vec![seat(1, 1), seat(1, 2)],
            total_amount: 150.0,
        };
        let json = serde_json::to_string(&pending).unwrap();
        assert!(json.contains(r#"{"row":1,"seat":2}"#));
        let back: PendingBooking = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pending);
    }

    #[test]
    fn split_of_nothing_is_zero() {
        assert_eq!(split_evenly(100.0, 0), 0.0);
    }

    proptest! {
        #[test]
        fn even_split_adds_back_up(price in 1.0f64..10_000.0, seats in 1usize..200) {
            let total = price * seats as f64;
            let per_seat = split_evenly(total, seats);
            prop_assert!((per_seat * seats as f64 - total).abs() < 1e-6 * total);
            prop_assert!((per_seat - price).abs() < 1e-9 * price.max(1.0) * seats as f64);
        }
    }
}
