pub mod user;
pub mod stadium;
pub mod matches;
pub mod booking;
pub mod review;
pub mod seat_category;
pub mod price_history;
pub mod notification;

pub use user::User;
pub use stadium::Stadium;
pub use matches::{Match, MatchWithStadium};
pub use booking::{Booking, SeatCoordinate, TicketDetails};
pub use review::MatchReview;
pub use seat_category::SeatCategory;
pub use price_history::PriceHistory;
pub use notification::Notification;
