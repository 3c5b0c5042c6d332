use rusqlite::{params, Connection, OptionalExtension};

use crate::authorization::{AuthorityLevel, PermissionSet};
use crate::db::DatabaseError;
use crate::models::{Grade, GradeHeadcount};

/// Validated grade fields ready to be written.
#[derive(Debug, Clone)]
pub struct GradeDraft {
    pub name: String,
    pub category: Option<String>,
    pub level: AuthorityLevel,
    pub color: String,
    pub permissions: PermissionSet,
}

type GradeRow = (i64, String, Option<String>, i64, String, String);

const GRADE_COLUMNS: &str = "id, name, category, level, color, permissions";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GradeRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn row_to_grade((id, name, category, level, color, permissions): GradeRow) -> Result<Grade, DatabaseError> {
    let level = AuthorityLevel::try_from(level).map_err(|_| DatabaseError::InvalidEnum {
        field: "grades.level".into(),
        value: level.to_string(),
    })?;
    Ok(Grade {
        id,
        name,
        category,
        level,
        color,
        permissions: PermissionSet::from_json_str(&permissions)?,
    })
}

/// All grades, most senior first.
pub fn list_grades(conn: &Connection) -> Result<Vec<Grade>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRADE_COLUMNS} FROM grades ORDER BY level DESC, id ASC"
    ))?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(row_to_grade).collect()
}

pub fn get_grade(conn: &Connection, id: i64) -> Result<Option<Grade>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {GRADE_COLUMNS} FROM grades WHERE id = ?1"),
            params![id],
            read_row,
        )
        .optional()?;
    row.map(row_to_grade).transpose()
}

pub fn find_grade_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT id FROM grades WHERE name = ?1 ORDER BY id LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn insert_grade(conn: &Connection, draft: &GradeDraft) -> Result<Grade, DatabaseError> {
    conn.execute(
        "INSERT INTO grades (name, category, level, color, permissions)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            draft.name,
            draft.category,
            draft.level.as_i64(),
            draft.color,
            draft.permissions.to_json_string()?,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_grade(conn, id)?.ok_or(DatabaseError::NotFound {
        entity_type: "grade".into(),
        id: id.to_string(),
    })
}

/// Replace every field of a grade. Returns `false` when the id is unknown.
pub fn update_grade(conn: &Connection, id: i64, draft: &GradeDraft) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE grades SET name = ?1, category = ?2, level = ?3, color = ?4, permissions = ?5
         WHERE id = ?6",
        params![
            draft.name,
            draft.category,
            draft.level.as_i64(),
            draft.color,
            draft.permissions.to_json_string()?,
            id,
        ],
    )?;
    Ok(changed > 0)
}

/// Delete a grade nobody holds as their real grade.
///
/// Visible-grade references are cleared by the schema.
pub fn delete_grade(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    if count_users_with_grade(conn, id)? > 0 {
        return Err(DatabaseError::ConstraintViolation(
            "grade is assigned to users".into(),
        ));
    }
    let changed = conn.execute("DELETE FROM grades WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Users holding this grade as their real grade.
pub fn count_users_with_grade(conn: &Connection, id: i64) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE grade_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Real-grade headcount per grade, largest first.
pub fn grade_distribution(conn: &Connection) -> Result<Vec<GradeHeadcount>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT g.id, g.name, g.color, COUNT(u.id) AS headcount
         FROM grades g
         LEFT JOIN users u ON u.grade_id = g.id
         GROUP BY g.id, g.name, g.color
         ORDER BY headcount DESC, g.level DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(GradeHeadcount {
                grade_id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
                count: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
