pub mod action_log;
pub mod grade;
pub mod user;

pub use action_log::*;
pub use grade::*;
pub use user::*;
