//! Connection handling, embedded migrations and database error classification.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{ConnectionError, DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::info;
use std::fmt::{Display, Formatter};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
pub enum StoreError {
    /// Database unreachable or the connection dropped mid-flow.
    Connection(String),
    /// Foreign-key, not-null, unique or check violation.
    Constraint { kind: &'static str, message: String },
    Query(DieselError),
    Migration(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connection(e) => write!(f, "connection error: {}", e),
            StoreError::Constraint { kind, message } => write!(f, "{} violation: {}", kind, message),
            StoreError::Query(e) => write!(f, "query error: {}", e),
            StoreError::Migration(e) => write!(f, "migration error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DieselError> for StoreError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::ForeignKeyViolation => StoreError::Constraint {
                        kind: "foreign key",
                        message,
                    },
                    DatabaseErrorKind::NotNullViolation => StoreError::Constraint {
                        kind: "not null",
                        message,
                    },
                    DatabaseErrorKind::UniqueViolation => StoreError::Constraint { kind: "unique", message },
                    DatabaseErrorKind::CheckViolation => StoreError::Constraint { kind: "check", message },
                    DatabaseErrorKind::ClosedConnection => StoreError::Connection(message),
                    other => StoreError::Query(DieselError::DatabaseError(other, info)),
                }
            }
            DieselError::BrokenTransactionManager => {
                StoreError::Connection("transaction manager is broken".to_string())
            }
            other => StoreError::Query(other),
        }
    }
}

impl From<ConnectionError> for StoreError {
    fn from(value: ConnectionError) -> Self {
        StoreError::Connection(value.to_string())
    }
}

pub fn connect(database_url: &str) -> Result<PgConnection, StoreError> {
    PgConnection::establish(database_url).map_err(StoreError::from)
}

pub fn apply_migrations(conn: &mut PgConnection) -> Result<(), StoreError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;
    if applied.is_empty() {
        info!("Database schema is up to date; no migrations were applied");
    } else {
        let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        info!("Applied {} database migration(s): {}", applied.len(), names);
    }
    Ok(())
}

#[cfg(test)]
pub mod test_support {
    //! Shared helpers for tests that need a live PostgreSQL.
    //!
    //! Set `TEST_DATABASE_URL` to run them; otherwise they return early.

    use super::*;
    use std::sync::Mutex;

    static MIGRATED: Mutex<bool> = Mutex::new(false);

    /// Connection inside a never-committed test transaction, or `None` when no
    /// test database is configured.
    pub fn test_connection() -> Option<PgConnection> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                eprintln!("TEST_DATABASE_URL not set; skipping database test");
                return None;
            }
        };
        let mut conn = connect(&url).expect("connect to TEST_DATABASE_URL");
        {
            let mut migrated = MIGRATED.lock().unwrap_or_else(|p| p.into_inner());
            if !*migrated {
                apply_migrations(&mut conn).expect("apply migrations");
                *migrated = true;
            }
        }
        conn.begin_test_transaction().expect("begin test transaction");
        Some(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_is_classified() {
        let err = StoreError::from(ConnectionError::BadConnection("refused".to_string()));
        assert!(matches!(err, StoreError::Connection(ref m) if m.contains("refused")));
    }

    #[test]
    fn non_database_errors_stay_query_errors() {
        let err = StoreError::from(DieselError::NotFound);
        assert!(matches!(err, StoreError::Query(DieselError::NotFound)));
        assert_eq!(err.to_string(), "query error: Record not found");
    }

    #[test]
    fn foreign_key_violation_is_a_constraint_error() {
        let Some(mut conn) = test_support::test_connection() else {
            return;
        };
        use crate::schema::venues::dsl as V;
        let res = diesel::insert_into(V::venues)
            .values((
                V::venue_id.eq("sr:venue:fk-test"),
                V::venue_name.eq("Court 1"),
                V::city_name.eq(""),
                V::country_name.eq(""),
                V::country_code.eq(""),
                V::timezone.eq(""),
                V::complex_id.eq("sr:complex:does-not-exist"),
            ))
            .execute(&mut conn);
        let err = StoreError::from(res.expect_err("fk violation"));
        assert!(matches!(err, StoreError::Constraint { kind: "foreign key", .. }));
    }
}
