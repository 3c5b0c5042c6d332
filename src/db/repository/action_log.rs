use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{ActionKind, ActionLogEntry};

/// Hard cap on rows returned by `recent_actions`.
pub const MAX_ACTION_LOG_LIMIT: u32 = 500;

pub fn insert_action(
    conn: &Connection,
    user_id: i64,
    action: ActionKind,
    details: &str,
    target_id: Option<i64>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO action_log (user_id, action, details, target_id) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, action.as_str(), details, target_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent entries first, joined with their author when still present.
pub fn recent_actions(conn: &Connection, limit: u32) -> Result<Vec<ActionLogEntry>, DatabaseError> {
    let limit = limit.min(MAX_ACTION_LOG_LIMIT);
    let mut stmt = conn.prepare(
        "SELECT l.id, l.user_id, l.action, l.details, l.target_id, l.created_at,
                u.first_name, u.last_name, u.badge_number
         FROM action_log l
         LEFT JOIN users u ON l.user_id = u.id
         ORDER BY l.created_at DESC, l.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(ActionLogEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                action: row.get(2)?,
                details: row.get(3)?,
                target_id: row.get(4)?,
                created_at: row.get(5)?,
                first_name: row.get(6)?,
                last_name: row.get(7)?,
                badge_number: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{delete_user, insert_user, open_memory_database};
    use crate::models::UserInput;

    fn author(conn: &Connection) -> i64 {
        insert_user(
            conn,
            &UserInput {
                username: "chief".into(),
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                badge_number: Some("B-42".into()),
                grade_id: None,
                visible_grade_id: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn entries_come_back_newest_first() {
        let conn = open_memory_database().unwrap();
        let user_id = author(&conn);
        insert_action(&conn, user_id, ActionKind::CreateGrade, "Created grade: A", Some(1)).unwrap();
        insert_action(&conn, user_id, ActionKind::UpdateGrade, "Updated grade: A", Some(1)).unwrap();

        let entries = recent_actions(&conn, 100).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "UPDATE_GRADE");
        assert_eq!(entries[1].action, "CREATE_GRADE");
        assert_eq!(entries[0].first_name.as_deref(), Some("Grace"));
        assert_eq!(entries[0].badge_number.as_deref(), Some("B-42"));
    }

    #[test]
    fn limit_is_applied() {
        let conn = open_memory_database().unwrap();
        let user_id = author(&conn);
        for i in 0..5 {
            insert_action(&conn, user_id, ActionKind::CreateUser, "Created user", Some(i)).unwrap();
        }
        assert_eq!(recent_actions(&conn, 3).unwrap().len(), 3);
    }

    #[test]
    fn entries_outlive_their_author() {
        let conn = open_memory_database().unwrap();
        let user_id = author(&conn);
        let other = insert_user(
            &conn,
            &UserInput {
                username: "temp".into(),
                first_name: "T".into(),
                last_name: "T".into(),
                badge_number: None,
                grade_id: None,
                visible_grade_id: None,
            },
        )
        .unwrap();
        insert_action(&conn, other, ActionKind::DeleteUser, "Deleted user: chief", Some(user_id)).unwrap();
        assert!(delete_user(&conn, other).unwrap());

        let entries = recent_actions(&conn, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, None);
        assert_eq!(entries[0].first_name, None);
        assert_eq!(entries[0].details, "Deleted user: chief");
    }
}
