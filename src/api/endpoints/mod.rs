//! API endpoint handlers.

pub mod diagnosis;
pub mod grades;
pub mod health;
pub mod logs;
pub mod profile;
pub mod users;
