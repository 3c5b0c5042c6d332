use serde::{Deserialize, Serialize};

use crate::authorization::{AuthorityLevel, PermissionSet};

/// A rank carrying both a hierarchy level and granular permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub level: AuthorityLevel,
    pub color: String,
    pub permissions: PermissionSet,
}

/// Fields an administrator supplies to create or replace a grade.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeInput {
    pub name: String,
    pub category: Option<String>,
    pub level: Option<i64>,
    pub color: Option<String>,
    #[serde(default)]
    pub permissions: PermissionSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeHeadcount {
    pub grade_id: i64,
    pub name: String,
    pub color: String,
    pub count: i64,
}

/// Level given to a grade created without one.
pub const DEFAULT_GRADE_LEVEL: i64 = 1;

/// Colour given to a grade created without one.
pub const DEFAULT_GRADE_COLOR: &str = "#4a90a4";
