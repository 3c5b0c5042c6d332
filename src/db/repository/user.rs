use rusqlite::{params, Connection, OptionalExtension};

use crate::authorization::{resolve_user_identity, AuthorityLevel, EffectiveIdentity};
use crate::db::DatabaseError;
use crate::models::{RosterEntry, UserInput, UserRecord, UserSummary};

use super::grade::get_grade;

const USER_COLUMNS: &str =
    "u.id, u.username, u.first_name, u.last_name, u.badge_number, u.is_admin, u.is_active, \
     u.grade_id, u.visible_grade_id";

fn read_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        badge_number: row.get(4)?,
        is_admin: row.get(5)?,
        is_active: row.get(6)?,
        grade_id: row.get(7)?,
        visible_grade_id: row.get(8)?,
    })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRecord>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
            params![id],
            read_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<UserRecord>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
            params![username],
            read_user,
        )
        .optional()?;
    Ok(user)
}

/// Users with their real grade, most senior first.
pub fn list_users(conn: &Connection) -> Result<Vec<UserSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS}, g.name, g.color, g.level
         FROM users u
         LEFT JOIN grades g ON u.grade_id = g.id
         ORDER BY g.level DESC, u.first_name ASC"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(UserSummary {
                user: read_user(row)?,
                grade_name: row.get(9)?,
                grade_color: row.get(10)?,
                grade_level: row.get(11)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Active users as other members see them: visible grade first.
pub fn list_roster(conn: &Connection) -> Result<Vec<RosterEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.first_name, u.last_name, u.badge_number,
                COALESCE(vg.name, g.name),
                COALESCE(vg.category, g.category),
                COALESCE(vg.level, g.level),
                COALESCE(vg.color, g.color)
         FROM users u
         LEFT JOIN grades g ON u.grade_id = g.id
         LEFT JOIN grades vg ON u.visible_grade_id = vg.id
         WHERE u.is_active = 1
         ORDER BY COALESCE(vg.level, g.level) DESC, u.last_name ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RosterEntry {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                badge_number: row.get(3)?,
                grade_name: row.get(4)?,
                grade_category: row.get(5)?,
                grade_level: row.get(6)?,
                grade_color: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert_user(conn: &Connection, input: &UserInput) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, first_name, last_name, badge_number, grade_id, visible_grade_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.username,
            input.first_name,
            input.last_name,
            input.badge_number,
            input.grade_id,
            input.visible_grade_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns `false` when the id is unknown.
pub fn update_user(conn: &Connection, id: i64, input: &UserInput) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, badge_number = ?4,
                grade_id = ?5, visible_grade_id = ?6, updated_at = datetime('now')
         WHERE id = ?7",
        params![
            input.username,
            input.first_name,
            input.last_name,
            input.badge_number,
            input.grade_id,
            input.visible_grade_id,
            id,
        ],
    )?;
    Ok(changed > 0)
}

/// Action-log rows keep their text; their author link is cleared by the schema.
pub fn delete_user(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Total and active user counts.
pub fn count_users(conn: &Connection) -> Result<(i64, i64), DatabaseError> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM users",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

/// Level of the user's real grade; `Standard(0)` when the user has none.
pub fn user_authority_level(
    conn: &Connection,
    user_id: i64,
) -> Result<Option<AuthorityLevel>, DatabaseError> {
    let Some(user) = get_user(conn, user_id)? else {
        return Ok(None);
    };
    let level = match user.grade_id {
        Some(grade_id) => get_grade(conn, grade_id)?
            .map(|g| g.level)
            .unwrap_or(AuthorityLevel::Standard(0)),
        None => AuthorityLevel::Standard(0),
    };
    Ok(Some(level))
}

/// Load a user with both grades and resolve its effective identity.
///
/// Inactive or unknown users resolve to `None`.
pub fn load_identity(
    conn: &Connection,
    user_id: i64,
) -> Result<Option<EffectiveIdentity>, DatabaseError> {
    let Some(user) = get_user(conn, user_id)? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }

    let real = match user.grade_id {
        Some(id) => get_grade(conn, id)?,
        None => None,
    };
    let visible = match user.visible_grade_id {
        Some(id) => get_grade(conn, id)?,
        None => None,
    };

    Ok(Some(resolve_user_identity(&user, real.as_ref(), visible.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::{has_permission, Permission, PermissionSet};
    use crate::db::{insert_grade, open_memory_database, GradeDraft};

    fn grade(conn: &Connection, name: &str, level: AuthorityLevel, perms: &[Permission]) -> i64 {
        insert_grade(
            conn,
            &GradeDraft {
                name: name.into(),
                category: Some("Cat".into()),
                level,
                color: format!("#{name}"),
                permissions: perms.iter().copied().collect::<PermissionSet>(),
            },
        )
        .unwrap()
        .id
    }

    fn input(username: &str, grade_id: Option<i64>, visible: Option<i64>) -> UserInput {
        UserInput {
            username: username.into(),
            first_name: username.to_uppercase(),
            last_name: "Medic".into(),
            badge_number: Some("B-1".into()),
            grade_id,
            visible_grade_id: visible,
        }
    }

    #[test]
    fn insert_and_find_user() {
        let conn = open_memory_database().unwrap();
        let id = insert_user(&conn, &input("ada", None, None)).unwrap();

        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.username, "ada");
        assert!(user.is_active);
        assert!(!user.is_admin);
        assert_eq!(find_user_by_username(&conn, "ada").unwrap().unwrap().id, id);
        assert!(find_user_by_username(&conn, "bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected_by_schema() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, &input("ada", None, None)).unwrap();
        assert!(insert_user(&conn, &input("ada", None, None)).is_err());
    }

    #[test]
    fn update_and_delete_user() {
        let conn = open_memory_database().unwrap();
        let g = grade(&conn, "Interne", AuthorityLevel::Standard(4), &[]);
        let id = insert_user(&conn, &input("ada", None, None)).unwrap();

        assert!(update_user(&conn, id, &input("ada2", Some(g), None)).unwrap());
        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.username, "ada2");
        assert_eq!(user.grade_id, Some(g));

        assert!(delete_user(&conn, id).unwrap());
        assert!(!delete_user(&conn, id).unwrap());
        assert!(get_user(&conn, id).unwrap().is_none());
    }

    #[test]
    fn load_identity_separates_display_from_authority() {
        let conn = open_memory_database().unwrap();
        let director = grade(&conn, "Directeur", AuthorityLevel::Standard(10), &[Permission::DeleteUsers]);
        let trainee = grade(&conn, "Stagiaire", AuthorityLevel::Standard(1), &[Permission::ViewPatients]);
        let id = insert_user(&conn, &input("boss", Some(director), Some(trainee))).unwrap();

        let identity = load_identity(&conn, id).unwrap().unwrap();
        assert_eq!(identity.display_name(), Some("Stagiaire"));
        assert_eq!(identity.level(), AuthorityLevel::Standard(10));
        assert!(has_permission(&identity, Permission::DeleteUsers));
        assert!(!has_permission(&identity, Permission::ViewPatients));
    }

    #[test]
    fn inactive_user_does_not_resolve() {
        let conn = open_memory_database().unwrap();
        let id = insert_user(&conn, &input("gone", None, None)).unwrap();
        conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", params![id])
            .unwrap();
        assert!(load_identity(&conn, id).unwrap().is_none());
        assert!(load_identity(&conn, 999).unwrap().is_none());
        insert_user(&conn, &input("here", None, None)).unwrap();
        assert_eq!(count_users(&conn).unwrap(), (2, 1));
    }

    #[test]
    fn authority_level_defaults_to_zero_without_grade() {
        let conn = open_memory_database().unwrap();
        let id = insert_user(&conn, &input("nograde", None, None)).unwrap();
        assert_eq!(
            user_authority_level(&conn, id).unwrap(),
            Some(AuthorityLevel::Standard(0))
        );
        assert_eq!(user_authority_level(&conn, 999).unwrap(), None);
    }

    #[test]
    fn roster_shows_visible_grade() {
        let conn = open_memory_database().unwrap();
        let high = grade(&conn, "High", AuthorityLevel::Standard(8), &[]);
        let low = grade(&conn, "Low", AuthorityLevel::Standard(2), &[]);
        insert_user(&conn, &input("masked", Some(high), Some(low))).unwrap();
        insert_user(&conn, &input("plain", Some(high), None)).unwrap();

        let roster = list_roster(&conn).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].first_name, "PLAIN");
        assert_eq!(roster[0].grade_name.as_deref(), Some("High"));
        assert_eq!(roster[1].grade_name.as_deref(), Some("Low"));
        assert_eq!(roster[1].grade_level, Some(2));
    }

    #[test]
    fn admin_listing_shows_real_grade() {
        let conn = open_memory_database().unwrap();
        let high = grade(&conn, "High", AuthorityLevel::Standard(8), &[]);
        let low = grade(&conn, "Low", AuthorityLevel::Standard(2), &[]);
        insert_user(&conn, &input("masked", Some(high), Some(low))).unwrap();

        let users = list_users(&conn).unwrap();
        assert_eq!(users[0].grade_name.as_deref(), Some("High"));
        assert_eq!(users[0].grade_level, Some(8));
        assert_eq!(users[0].user.visible_grade_id, Some(low));
    }
}
