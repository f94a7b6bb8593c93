pub mod auth;
pub mod booking;
pub mod seed;
pub mod tickets;
