use serde::{Deserialize, Deserializer, Serialize};

/// Authorization-relevant columns of a user row.
///
/// `grade_id` is the permission-bearing grade; `visible_grade_id` only
/// changes what other users see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub badge_number: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    pub grade_id: Option<i64>,
    pub visible_grade_id: Option<i64>,
}

/// Fields an administrator supplies to create or update a user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub badge_number: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub grade_id: Option<i64>,
    /// Empty or absent clears the cosmetic override.
    #[serde(default, deserialize_with = "optional_id")]
    pub visible_grade_id: Option<i64>,
}

/// Select inputs post ids as numbers, numeric strings, or `""` for none.
fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Id(id)) => Ok(Some(id)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Admin listing row: user with its real grade.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: UserRecord,
    pub grade_name: Option<String>,
    pub grade_color: Option<String>,
    pub grade_level: Option<i64>,
}

/// Roster row: user as others see it, through the visible grade.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub badge_number: Option<String>,
    pub grade_name: Option<String>,
    pub grade_category: Option<String>,
    pub grade_level: Option<i64>,
    pub grade_color: Option<String>,
}
