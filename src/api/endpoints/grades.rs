//! Grade administration.
//!
//! Every route requires an administrator. Mutations are also bound by the
//! hierarchy rule: a non-full-access actor only touches grades strictly
//! below their own level.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Caller, SuccessResponse};
use crate::authorization::{ensure_can_target, require_admin, AuthorityLevel, HierarchyAction};
use crate::db::{self, GradeDraft};
use crate::models::{ActionKind, Grade, GradeInput, DEFAULT_GRADE_COLOR, DEFAULT_GRADE_LEVEL};

fn parse_level(raw: i64) -> Result<AuthorityLevel, ApiError> {
    AuthorityLevel::try_from(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Validate input, filling absent level and colour from `fallback`.
fn draft_from_input(
    input: GradeInput,
    fallback_level: i64,
    fallback_color: &str,
) -> Result<GradeDraft, ApiError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    let color = input
        .color
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| fallback_color.to_string());

    Ok(GradeDraft {
        name,
        category: input.category.filter(|c| !c.trim().is_empty()),
        level: parse_level(input.level.unwrap_or(fallback_level))?,
        color,
        permissions: input.permissions,
    })
}

fn grade_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("grade {id} not found"))
}

/// `GET /api/admin/grades`
pub async fn list(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
) -> Result<Json<Vec<Grade>>, ApiError> {
    require_admin(&identity)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_grades(&conn)?))
}

/// `POST /api/admin/grades`
pub async fn create(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    payload: Result<Json<GradeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Grade>), ApiError> {
    require_admin(&identity)?;
    let Json(input) = payload?;
    let draft = draft_from_input(input, DEFAULT_GRADE_LEVEL, DEFAULT_GRADE_COLOR)?;
    ensure_can_target(&identity, draft.level, HierarchyAction::CreateGrade)?;

    let mut conn = ctx.core.open_db()?;
    let tx = conn.transaction()?;
    let grade = db::insert_grade(&tx, &draft)?;
    db::insert_action(
        &tx,
        identity.user_id(),
        ActionKind::CreateGrade,
        &format!("Created grade {}", grade.name),
        Some(grade.id),
    )?;
    tx.commit()?;

    tracing::info!(grade_id = grade.id, level = %grade.level, "Grade created");
    Ok((StatusCode::CREATED, Json(grade)))
}

/// `PUT /api/admin/grades/:id`
///
/// Both the grade's current level and its requested level must be
/// below the actor's own.
pub async fn update(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    payload: Result<Json<GradeInput>, JsonRejection>,
) -> Result<Json<Grade>, ApiError> {
    require_admin(&identity)?;
    let Json(input) = payload?;

    let mut conn = ctx.core.open_db()?;
    let current = db::get_grade(&conn, id)?.ok_or_else(|| grade_not_found(id))?;
    ensure_can_target(&identity, current.level, HierarchyAction::EditGrade)?;

    let draft = draft_from_input(input, current.level.as_i64(), &current.color)?;
    ensure_can_target(&identity, draft.level, HierarchyAction::EditGrade)?;

    let tx = conn.transaction()?;
    if !db::update_grade(&tx, id, &draft)? {
        return Err(grade_not_found(id));
    }
    db::insert_action(
        &tx,
        identity.user_id(),
        ActionKind::UpdateGrade,
        &format!("Updated grade {}", draft.name),
        Some(id),
    )?;
    let updated = db::get_grade(&tx, id)?.ok_or_else(|| grade_not_found(id))?;
    tx.commit()?;

    tracing::info!(grade_id = id, level = %updated.level, "Grade updated");
    Ok(Json(updated))
}

/// `DELETE /api/admin/grades/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_admin(&identity)?;

    let mut conn = ctx.core.open_db()?;
    let grade = db::get_grade(&conn, id)?.ok_or_else(|| grade_not_found(id))?;
    ensure_can_target(&identity, grade.level, HierarchyAction::DeleteGrade)?;

    let tx = conn.transaction()?;
    if db::count_users_with_grade(&tx, id)? > 0 {
        return Err(ApiError::BadRequest(format!(
            "grade {} is assigned to users",
            grade.name
        )));
    }
    db::delete_grade(&tx, id)?;
    db::insert_action(
        &tx,
        identity.user_id(),
        ActionKind::DeleteGrade,
        &format!("Deleted grade {}", grade.name),
        Some(id),
    )?;
    tx.commit()?;

    tracing::info!(grade_id = id, "Grade deleted");
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{Permission, PermissionSet};

    fn input(level: Option<i64>, color: Option<&str>) -> GradeInput {
        GradeInput {
            name: "  Interne ".into(),
            category: Some(String::new()),
            level,
            color: color.map(str::to_string),
            permissions: [Permission::ViewPatients].into_iter().collect::<PermissionSet>(),
        }
    }

    #[test]
    fn draft_applies_defaults() {
        let draft = draft_from_input(input(None, None), DEFAULT_GRADE_LEVEL, DEFAULT_GRADE_COLOR).unwrap();
        assert_eq!(draft.name, "Interne");
        assert_eq!(draft.category, None);
        assert_eq!(draft.level, AuthorityLevel::Standard(1));
        assert_eq!(draft.color, DEFAULT_GRADE_COLOR);
        assert!(draft.permissions.contains(Permission::ViewPatients));
    }

    #[test]
    fn draft_keeps_explicit_values() {
        let draft = draft_from_input(input(Some(99), Some("#000000")), 1, "#ffffff").unwrap();
        assert_eq!(draft.level, AuthorityLevel::FullAccess);
        assert_eq!(draft.color, "#000000");
    }

    #[test]
    fn draft_rejects_bad_level_and_blank_name() {
        assert!(matches!(
            draft_from_input(input(Some(120), None), 1, "#fff"),
            Err(ApiError::BadRequest(_))
        ));
        let mut blank = input(None, None);
        blank.name = "   ".into();
        assert!(matches!(
            draft_from_input(blank, 1, "#fff"),
            Err(ApiError::BadRequest(msg)) if msg == "name is required"
        ));
    }
}
