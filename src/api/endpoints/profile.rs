//! Caller-facing identity endpoints.
//!
//! - `GET /api/me`: effective identity and admin-panel reach
//! - `GET /api/permissions`: the permission registry
//! - `GET /api/roster`: active members as they are displayed

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Caller};
use crate::authorization::{
    admin_permissions, can_access_admin_panel, is_admin, permission_registry, require_permission,
    EffectiveIdentity, Permission, PermissionInfo, PERMISSION_REGISTRY_VERSION,
};
use crate::db;
use crate::models::RosterEntry;

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub identity: EffectiveIdentity,
    /// Computed: full access, admin flag or level threshold.
    pub admin: bool,
    pub can_access_admin_panel: bool,
    pub admin_permissions: Vec<Permission>,
}

pub async fn me(Caller(identity): Caller) -> Json<MeResponse> {
    Json(MeResponse {
        admin: is_admin(&identity),
        can_access_admin_panel: can_access_admin_panel(&identity),
        admin_permissions: admin_permissions(&identity),
        identity,
    })
}

#[derive(Serialize)]
pub struct PermissionsResponse {
    pub version: u32,
    pub permissions: Vec<PermissionInfo>,
}

pub async fn permissions(_caller: Caller) -> Json<PermissionsResponse> {
    Json(PermissionsResponse {
        version: PERMISSION_REGISTRY_VERSION,
        permissions: permission_registry(),
    })
}

pub async fn roster(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    require_permission(&identity, Permission::ViewRoster)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_roster(&conn)?))
}
