pub mod document;
pub mod profile_update;
pub mod user;
pub mod verification;
