//! Administrative history and statistics.
//!
//! - `GET /api/admin/logs?limit=N`: recent action log (`view_logs`)
//! - `GET /api/admin/stats`: headcounts (administrator)

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Caller};
use crate::authorization::{require_admin, require_permission, Permission};
use crate::db::{self, MAX_ACTION_LOG_LIMIT};
use crate::models::{ActionLogEntry, GradeHeadcount};

pub const DEFAULT_LOG_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<u32>,
}

pub async fn recent(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Vec<ActionLogEntry>>, ApiError> {
    require_permission(&identity, Permission::ViewLogs)?;
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .min(MAX_ACTION_LOG_LIMIT);

    let conn = ctx.core.open_db()?;
    Ok(Json(db::recent_actions(&conn, limit)?))
}

#[derive(Serialize)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub users: UserCounts,
    pub grade_distribution: Vec<GradeHeadcount>,
}

pub async fn stats(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
) -> Result<Json<StatsResponse>, ApiError> {
    require_admin(&identity)?;
    let conn = ctx.core.open_db()?;
    let (total, active) = db::count_users(&conn)?;
    Ok(Json(StatsResponse {
        users: UserCounts { total, active },
        grade_distribution: db::grade_distribution(&conn)?,
    }))
}
