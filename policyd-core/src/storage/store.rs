//! SQLite-backed policy store and the strictest-value aggregation

use policyd_api::{PolicyModel, PolicyValue, Scope, strictest_of};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::error::StorageError;
use super::migrations::Migrator;
use super::types::{
    ActivationFilter, Administrator, ManagedValue, column_to_scope, scope_to_column,
};

/// Identity of the platform itself; enrolled at start-up and never removed
pub const DEFAULT_ADMIN: &str = "policyd";

/// Durable, shared source of truth for administrators, policy definitions
/// and the values administrators submitted.
pub struct PolicyStorage {
    conn: Mutex<Connection>,
    filter: ActivationFilter,
    default_admin: String,
}

impl PolicyStorage {
    /// Open or create database at path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Migrator::new(&conn).migrate()?;
        Ok(Self {
            conn: Mutex::new(conn),
            filter: ActivationFilter::default(),
            default_admin: DEFAULT_ADMIN.to_string(),
        })
    }

    pub fn with_activation_filter(mut self, filter: ActivationFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_default_admin(mut self, admin: impl Into<String>) -> Self {
        self.default_admin = admin.into();
        self
    }

    pub fn activation_filter(&self) -> ActivationFilter {
        self.filter
    }

    pub fn default_admin(&self) -> &str {
        &self.default_admin
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Definitions ─────────────────────────────────────────────────

    /// Define a policy if it is not defined yet. Returns whether a row was
    /// inserted; an existing definition is never overwritten.
    pub fn define(&self, policy: &str, initial: &PolicyValue) -> Result<bool, StorageError> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO policy_definition (name, initial_value) VALUES (?1, ?2)",
            params![policy, initial.dump()],
        )?;
        if inserted > 0 {
            tracing::debug!(policy, initial = %initial.dump(), "Policy defined");
        }
        Ok(inserted > 0)
    }

    /// Stored initial value of a policy
    pub fn definition(&self, policy: &str) -> Result<Option<PolicyValue>, StorageError> {
        let conn = self.conn();
        let raw: Option<String> = conn
            .query_row(
                "SELECT initial_value FROM policy_definition WHERE name = ?1",
                [policy],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| parse_stored(policy, &raw)).transpose()
    }

    // ─── Administrators ──────────────────────────────────────────────

    /// Enroll an administrator (not activated). Re-enrolling is a logged no-op.
    pub fn enroll(&self, admin: &str) -> Result<bool, StorageError> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO admin (name, activated, enrolled_at) VALUES (?1, 0, ?2)",
            params![admin, chrono::Utc::now().timestamp()],
        )?;
        if inserted == 0 {
            tracing::warn!(admin, "Administrator already enrolled");
        } else {
            tracing::info!(admin, "Administrator enrolled");
        }
        Ok(inserted > 0)
    }

    /// Remove an administrator together with every value it submitted.
    ///
    /// Unknown administrators are a logged no-op. The default administrator
    /// cannot be removed.
    pub fn disenroll(&self, admin: &str) -> Result<bool, StorageError> {
        if admin == self.default_admin {
            return Err(StorageError::ProtectedAdmin(admin.to_string()));
        }
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM admin WHERE name = ?1", [admin])?;
        if removed == 0 {
            tracing::warn!(admin, "Administrator not enrolled");
        } else {
            tracing::info!(admin, "Administrator disenrolled");
        }
        Ok(removed > 0)
    }

    pub fn activate(&self, admin: &str, state: bool) -> Result<(), StorageError> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE admin SET activated = ?2 WHERE name = ?1",
            params![admin, state],
        )?;
        if updated == 0 {
            return Err(StorageError::UnknownAdmin(admin.to_string()));
        }
        tracing::info!(admin, activated = state, "Administrator activation changed");
        Ok(())
    }

    pub fn is_enrolled(&self, admin: &str) -> Result<bool, StorageError> {
        let conn = self.conn();
        Ok(admin_activated(&conn, admin)?.is_some())
    }

    pub fn admins(&self) -> Result<Vec<Administrator>, StorageError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT name, activated, enrolled_at FROM admin ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Administrator {
                name: row.get(0)?,
                activated: row.get(1)?,
                enrolled_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ─── Managed values ──────────────────────────────────────────────

    /// Record the value `admin` wants for `policy` in `scope`.
    ///
    /// Both the administrator and the policy must exist; nothing is written
    /// otherwise.
    pub fn update(
        &self,
        admin: &str,
        policy: &str,
        scope: Scope,
        value: &PolicyValue,
    ) -> Result<(), StorageError> {
        let conn = self.conn();
        if admin_activated(&conn, admin)?.is_none() {
            return Err(StorageError::UnknownAdmin(admin.to_string()));
        }
        require_policy(&conn, policy)?;

        conn.execute(
            "INSERT INTO policy_managed (admin, policy, domain, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(admin, policy, domain)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                admin,
                policy,
                scope_to_column(scope),
                value.dump(),
                chrono::Utc::now().timestamp(),
            ],
        )?;
        tracing::debug!(admin, policy, %scope, value = %value.dump(), "Managed value stored");
        Ok(())
    }

    /// Every stored value for a policy, ordered by scope then administrator
    pub fn managed_values(&self, policy: &str) -> Result<Vec<ManagedValue>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT admin, policy, domain, value, updated_at FROM policy_managed
             WHERE policy = ?1 ORDER BY domain, admin",
        )?;
        let rows = stmt.query_map([policy], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut values = Vec::new();
        for row in rows {
            let (admin, policy, domain, raw, updated_at) = row?;
            values.push(ManagedValue {
                value: parse_stored(&policy, &raw)?,
                admin,
                policy,
                scope: column_to_scope(domain),
                updated_at,
            });
        }
        Ok(values)
    }

    /// Domains that have at least one stored value for `policy`
    pub fn domains(&self, policy: &str) -> Result<Vec<u32>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT domain FROM policy_managed
             WHERE policy = ?1 AND domain >= 0 ORDER BY domain",
        )?;
        let rows = stmt.query_map([policy], |row| row.get::<_, i64>(0))?;
        let mut domains = Vec::new();
        for domain in rows {
            domains.push(domain? as u32);
        }
        Ok(domains)
    }

    // ─── Aggregation ─────────────────────────────────────────────────

    /// The most restrictive stored value for `model` in `scope`.
    ///
    /// Falls back to the model's initial value when no administrator
    /// constrains the policy. Fails only if the policy is not defined.
    pub fn strictest(&self, model: &PolicyModel, scope: Scope) -> Result<PolicyValue, StorageError> {
        let conn = self.conn();
        require_policy(&conn, model.name())?;
        let rows = self.candidates(&conn, model.name(), scope)?;
        Ok(fold(model, &rows))
    }

    /// The value [`strictest`](Self::strictest) would return if `admin`'s
    /// row for `scope` held `candidate`. Nothing is written.
    pub fn preview(
        &self,
        admin: &str,
        model: &PolicyModel,
        scope: Scope,
        candidate: &PolicyValue,
    ) -> Result<PolicyValue, StorageError> {
        let conn = self.conn();
        let activated = admin_activated(&conn, admin)?
            .ok_or_else(|| StorageError::UnknownAdmin(admin.to_string()))?;
        require_policy(&conn, model.name())?;

        let mut rows = self.candidates(&conn, model.name(), scope)?;
        rows.retain(|(name, _)| name != admin);
        if activated || self.filter == ActivationFilter::Any {
            rows.push((admin.to_string(), candidate.clone()));
            rows.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(fold(model, &rows))
    }

    /// Rows taking part in aggregation, ordered by administrator name
    fn candidates(
        &self,
        conn: &Connection,
        policy: &str,
        scope: Scope,
    ) -> Result<Vec<(String, PolicyValue)>, StorageError> {
        let sql = match self.filter {
            ActivationFilter::Any => {
                "SELECT m.admin, m.value FROM policy_managed m
                 WHERE m.policy = ?1 AND m.domain = ?2
                 ORDER BY m.admin"
            }
            ActivationFilter::ActivatedOnly => {
                "SELECT m.admin, m.value FROM policy_managed m
                 INNER JOIN admin a ON a.name = m.admin
                 WHERE m.policy = ?1 AND m.domain = ?2 AND a.activated = 1
                 ORDER BY m.admin"
            }
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![policy, scope_to_column(scope)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (admin, raw) = row?;
            out.push((admin, parse_stored(policy, &raw)?));
        }
        Ok(out)
    }
}

/// Fold rows through the model's comparator. Ties go to the first row, i.e.
/// the lexicographically smallest administrator.
fn fold(model: &PolicyModel, rows: &[(String, PolicyValue)]) -> PolicyValue {
    let kind = model.initial().kind();
    let mut values = Vec::with_capacity(rows.len());
    for (admin, value) in rows {
        if value.kind() == kind {
            values.push(value);
        } else {
            tracing::warn!(
                policy = %model.name(),
                admin = %admin,
                value = %value.dump(),
                "Ignoring stored value of the wrong kind"
            );
        }
    }
    strictest_of(model.comparator(), values)
        .cloned()
        .unwrap_or_else(|| model.initial().clone())
}

fn parse_stored(policy: &str, raw: &str) -> Result<PolicyValue, StorageError> {
    raw.parse().map_err(|_| StorageError::Corrupt {
        policy: policy.to_string(),
        value: raw.to_string(),
    })
}

/// `Some(activated)` for an enrolled administrator, `None` otherwise
fn admin_activated(conn: &Connection, admin: &str) -> Result<Option<bool>, StorageError> {
    Ok(conn
        .query_row(
            "SELECT activated FROM admin WHERE name = ?1",
            [admin],
            |row| row.get(0),
        )
        .optional()?)
}

fn require_policy(conn: &Connection, policy: &str) -> Result<(), StorageError> {
    let defined: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM policy_definition WHERE name = ?1",
            [policy],
            |row| row.get(0),
        )
        .optional()?;
    defined
        .map(|_| ())
        .ok_or_else(|| StorageError::UnknownPolicy(policy.to_string()))
}
