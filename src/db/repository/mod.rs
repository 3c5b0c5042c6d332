mod action_log;
mod grade;
mod user;

pub use action_log::*;
pub use grade::*;
pub use user::*;
