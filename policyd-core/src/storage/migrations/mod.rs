//! Database migrations for the policy store

use rusqlite::Connection;

use crate::storage::StorageError;

/// SQL for each migration version
const MIGRATIONS: &[(&str, &str)] = &[("v001_initial", include_str!("v001_initial.sql"))];

/// Runs database migrations
pub struct Migrator<'a> {
    conn: &'a Connection,
}

impl<'a> Migrator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get current schema version
    pub fn current_version(&self) -> Result<i32, StorageError> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    fn set_version(&self, version: i32) -> Result<(), StorageError> {
        self.conn.pragma_update(None, "user_version", version)?;
        Ok(())
    }

    /// Run all pending migrations
    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.current_version()?;
        let target = self.target_version();

        if current >= target {
            return Ok(());
        }

        for (idx, (name, sql)) in MIGRATIONS.iter().enumerate() {
            let version = (idx + 1) as i32;
            if version > current {
                tracing::info!(version, name, "Running policy store migration");
                self.conn
                    .execute_batch(sql)
                    .map_err(|e| StorageError::Migration(format!("{}: {}", name, e)))?;
                self.set_version(version)?;
            }
        }

        Ok(())
    }

    /// Get target version (latest migration)
    pub fn target_version(&self) -> i32 {
        MIGRATIONS.len() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(&conn);

        assert_eq!(migrator.current_version().unwrap(), 0);
        migrator.migrate().unwrap();
        assert_eq!(
            migrator.current_version().unwrap(),
            migrator.target_version()
        );
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let migrator = Migrator::new(&conn);

        migrator.migrate().unwrap();
        let v1 = migrator.current_version().unwrap();

        migrator.migrate().unwrap();
        let v2 = migrator.current_version().unwrap();

        assert_eq!(v1, v2);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        Migrator::new(&conn).migrate().unwrap();

        assert!(table_exists(&conn, "admin"));
        assert!(table_exists(&conn, "policy_definition"));
        assert!(table_exists(&conn, "policy_managed"));
    }

    #[test]
    fn test_managed_rows_require_known_admin() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        Migrator::new(&conn).migrate().unwrap();

        conn.execute(
            "INSERT INTO policy_definition (name, initial_value) VALUES ('camera', 'int:1')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO policy_managed (admin, policy, domain, value, updated_at)
             VALUES ('ghost', 'camera', -1, 'int:0', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
