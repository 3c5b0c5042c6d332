use chrono::NaiveDateTime;
use serde::Serialize;

/// Administrative action recorded after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateGrade,
    UpdateGrade,
    DeleteGrade,
    CreateUser,
    UpdateUser,
    DeleteUser,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateGrade => "CREATE_GRADE",
            Self::UpdateGrade => "UPDATE_GRADE",
            Self::DeleteGrade => "DELETE_GRADE",
            Self::CreateUser => "CREATE_USER",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeleteUser => "DELETE_USER",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
    pub target_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub badge_number: Option<String>,
}
