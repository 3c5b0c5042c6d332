//! User administration.
//!
//! Listing, creating and editing require an administrator; deleting
//! requires the `delete_users` permission. Every mutation is bound by the
//! hierarchy rule on the target's real grade.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Caller, SuccessResponse};
use crate::authorization::{
    ensure_can_target, require_admin, require_permission, AuthorityLevel, EffectiveIdentity,
    HierarchyAction, Permission,
};
use crate::db;
use crate::models::{ActionKind, UserInput, UserRecord, UserSummary};

fn user_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("user {id} not found"))
}

/// Trim text fields and reject blanks.
fn normalize(mut input: UserInput) -> Result<UserInput, ApiError> {
    for (field, value) in [
        ("username", &mut input.username),
        ("first_name", &mut input.first_name),
        ("last_name", &mut input.last_name),
    ] {
        *value = value.trim().to_string();
        if value.is_empty() {
            return Err(ApiError::BadRequest(format!("{field} is required")));
        }
    }
    input.badge_number = input
        .badge_number
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());
    Ok(input)
}

/// Level of a grade about to be assigned; no grade counts as level 0.
fn assigned_level(conn: &Connection, grade_id: Option<i64>) -> Result<AuthorityLevel, ApiError> {
    match grade_id {
        None => Ok(AuthorityLevel::Standard(0)),
        Some(id) => db::get_grade(conn, id)?
            .map(|g| g.level)
            .ok_or_else(|| ApiError::BadRequest(format!("grade {id} does not exist"))),
    }
}

fn ensure_visible_grade_exists(conn: &Connection, input: &UserInput) -> Result<(), ApiError> {
    if let Some(id) = input.visible_grade_id {
        if db::get_grade(conn, id)?.is_none() {
            return Err(ApiError::BadRequest(format!("grade {id} does not exist")));
        }
    }
    Ok(())
}

fn ensure_username_free(
    conn: &Connection,
    username: &str,
    except: Option<i64>,
) -> Result<(), ApiError> {
    match db::find_user_by_username(conn, username)? {
        Some(existing) if Some(existing.id) != except => Err(ApiError::Conflict(format!(
            "username {username} already exists"
        ))),
        _ => Ok(()),
    }
}

fn target_level(conn: &Connection, user_id: i64) -> Result<AuthorityLevel, ApiError> {
    db::user_authority_level(conn, user_id)?.ok_or_else(|| user_not_found(user_id))
}

fn log(
    conn: &Connection,
    actor: &EffectiveIdentity,
    action: ActionKind,
    details: String,
    target: i64,
) -> Result<(), ApiError> {
    db::insert_action(conn, actor.user_id(), action, &details, Some(target))?;
    Ok(())
}

/// `GET /api/admin/users`
pub async fn list(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    require_admin(&identity)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_users(&conn)?))
}

/// `POST /api/admin/users`
pub async fn create(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    require_admin(&identity)?;
    let Json(input) = payload?;
    let input = normalize(input)?;

    let mut conn = ctx.core.open_db()?;
    let level = assigned_level(&conn, input.grade_id)?;
    ensure_can_target(&identity, level, HierarchyAction::AssignGrade)?;
    ensure_visible_grade_exists(&conn, &input)?;
    ensure_username_free(&conn, &input.username, None)?;

    let tx = conn.transaction()?;
    let id = db::insert_user(&tx, &input)?;
    log(
        &tx,
        &identity,
        ActionKind::CreateUser,
        format!("Created user {} {}", input.first_name, input.last_name),
        id,
    )?;
    let user = db::get_user(&tx, id)?.ok_or_else(|| user_not_found(id))?;
    tx.commit()?;

    tracing::info!(user_id = id, grade_level = %level, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /api/admin/users/:id`
///
/// Checks the target's current grade, then the grade being assigned.
pub async fn update(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> Result<Json<UserRecord>, ApiError> {
    require_admin(&identity)?;
    let Json(input) = payload?;
    let input = normalize(input)?;

    let mut conn = ctx.core.open_db()?;
    let current = target_level(&conn, id)?;
    ensure_can_target(&identity, current, HierarchyAction::EditUser)?;
    let assigned = assigned_level(&conn, input.grade_id)?;
    ensure_can_target(&identity, assigned, HierarchyAction::AssignGrade)?;
    ensure_visible_grade_exists(&conn, &input)?;
    ensure_username_free(&conn, &input.username, Some(id))?;

    let tx = conn.transaction()?;
    if !db::update_user(&tx, id, &input)? {
        return Err(user_not_found(id));
    }
    log(
        &tx,
        &identity,
        ActionKind::UpdateUser,
        format!("Updated user {} {}", input.first_name, input.last_name),
        id,
    )?;
    let user = db::get_user(&tx, id)?.ok_or_else(|| user_not_found(id))?;
    tx.commit()?;

    tracing::info!(user_id = id, grade_level = %assigned, "User updated");
    Ok(Json(user))
}

/// `DELETE /api/admin/users/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_permission(&identity, Permission::DeleteUsers)?;
    if id == identity.user_id() {
        return Err(ApiError::BadRequest("cannot delete your own account".into()));
    }

    let mut conn = ctx.core.open_db()?;
    let level = target_level(&conn, id)?;
    ensure_can_target(&identity, level, HierarchyAction::DeleteUser)?;

    let tx = conn.transaction()?;
    if !db::delete_user(&tx, id)? {
        return Err(user_not_found(id));
    }
    log(
        &tx,
        &identity,
        ActionKind::DeleteUser,
        format!("Deleted user ID {id}"),
        id,
    )?;
    tx.commit()?;

    let revoked = ctx.core.revoke_user_sessions(id)?;
    tracing::info!(user_id = id, revoked, "User deleted");
    Ok(Json(SuccessResponse::ok()))
}
