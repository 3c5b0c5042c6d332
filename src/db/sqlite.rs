use std::path::Path;

use rusqlite::{params, Connection};

use super::DatabaseError;
use crate::authorization::{AuthorityLevel, Permission, PermissionSet};

/// Name of the seeded full-access grade.
pub const FULL_ACCESS_GRADE_NAME: &str = "Développeur";

/// Username of the account created on an empty database.
pub const BOOTSTRAP_USERNAME: &str = "admin";

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

// ═══════════════════════════════════════════════════════════
// Default data
// ═══════════════════════════════════════════════════════════

fn bundle(permissions: &[Permission]) -> PermissionSet {
    permissions.iter().copied().collect()
}

fn default_grades() -> Vec<(&'static str, &'static str, u8, &'static str, PermissionSet)> {
    use Permission::*;

    let basic = bundle(&[AccessDashboard, ViewPatients, CreateReports]);
    let mid = bundle(&[
        AccessDashboard,
        ViewPatients,
        CreatePatients,
        CreateReports,
        ManageAppointments,
    ]);
    let high = bundle(&[
        AccessDashboard,
        ViewPatients,
        CreatePatients,
        DeletePatients,
        CreateReports,
        ManageAppointments,
        ViewRoster,
    ]);
    let admin = PermissionSet::all();

    vec![
        ("Stagiaire", "Paramedical", 1, "#64748b", basic.clone()),
        ("Ambulancier EMT", "Paramedical", 2, "#3b82f6", basic),
        ("Ambulancier Paramedical", "Paramedical", 3, "#3b82f6", mid.clone()),
        ("Interne", "Medecine", 4, "#991b1b", mid),
        ("Medecin Junior", "Medecine", 5, "#991b1b", high.clone()),
        ("Medecin Senior", "Medecine", 6, "#991b1b", high.clone()),
        ("Chef des Consultations", "Chef de service", 7, "#14532d", high.clone()),
        ("Chef des Urgences", "Chef de service", 8, "#14532d", high),
        ("Directeur Adjoint", "Direction M.R.S.A", 9, "#1e3a5f", admin.clone()),
        ("Directeur MRSA", "Direction M.R.S.A", 10, "#1e3a5f", admin),
    ]
}

/// Seed default grades, the full-access grade and a bootstrap account.
///
/// Each step only runs when its data is missing, so this is safe to call
/// on every start. Returns the bootstrap user id when one was created.
pub fn seed_defaults(conn: &Connection) -> Result<Option<i64>, DatabaseError> {
    let grade_count: i64 = conn.query_row("SELECT COUNT(*) FROM grades", [], |row| row.get(0))?;
    if grade_count == 0 {
        tracing::info!("Seeding default grades");
        for (name, category, level, color, permissions) in default_grades() {
            conn.execute(
                "INSERT INTO grades (name, category, level, color, permissions)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, category, level, color, permissions.to_json_string()?],
            )?;
        }
    }

    let dev_grade_id: i64 = match super::find_grade_id_by_name(conn, FULL_ACCESS_GRADE_NAME)? {
        Some(id) => id,
        None => {
            conn.execute(
                "INSERT INTO grades (name, category, level, color, permissions)
                 VALUES (?1, 'Système', ?2, '#8b5cf6', ?3)",
                params![
                    FULL_ACCESS_GRADE_NAME,
                    AuthorityLevel::FullAccess.as_i64(),
                    PermissionSet::all().to_json_string()?
                ],
            )?;
            conn.last_insert_rowid()
        }
    };

    let user_count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if user_count > 0 {
        return Ok(None);
    }

    conn.execute(
        "INSERT INTO users (username, first_name, last_name, badge_number, grade_id)
         VALUES (?1, 'System', 'Administrator', 'DEV-00', ?2)",
        params![BOOTSTRAP_USERNAME, dev_grade_id],
    )?;
    let user_id = conn.last_insert_rowid();
    tracing::info!(user_id, "Created bootstrap account '{BOOTSTRAP_USERNAME}'");
    Ok(Some(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_grade, list_grades};

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + grades + users + action_log
        assert_eq!(count_tables(&conn).unwrap(), 4);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        assert!(run_migrations(&conn).is_ok());
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn seed_creates_grades_and_bootstrap_user() {
        let conn = open_memory_database().unwrap();
        let user_id = seed_defaults(&conn).unwrap().expect("bootstrap user");

        let grades = list_grades(&conn).unwrap();
        assert_eq!(grades.len(), 11);
        assert_eq!(grades[0].name, FULL_ACCESS_GRADE_NAME);
        assert_eq!(grades[0].level, AuthorityLevel::FullAccess);
        assert_eq!(grades[1].level, AuthorityLevel::Standard(10));

        let trainee = grades.iter().find(|g| g.name == "Stagiaire").unwrap();
        assert!(trainee.permissions.contains(Permission::CreateReports));
        assert!(!trainee.permissions.contains(Permission::ViewRoster));

        let user = crate::db::get_user(&conn, user_id).unwrap().unwrap();
        let grade = get_grade(&conn, user.grade_id.unwrap()).unwrap().unwrap();
        assert_eq!(grade.level, AuthorityLevel::FullAccess);
    }

    #[test]
    fn seed_is_idempotent() {
        let conn = open_memory_database().unwrap();
        assert!(seed_defaults(&conn).unwrap().is_some());
        assert!(seed_defaults(&conn).unwrap().is_none());
        assert_eq!(list_grades(&conn).unwrap().len(), 11);
    }

    #[test]
    fn database_opens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdt.db");
        let conn = open_database(&path).unwrap();
        seed_defaults(&conn).unwrap();
        drop(conn);

        let conn2 = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn2).unwrap(), 4);
        assert_eq!(list_grades(&conn2).unwrap().len(), 11);
    }
}
