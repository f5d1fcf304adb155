pub mod admin;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod users;
