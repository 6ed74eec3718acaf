use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row};
use thiserror::Error;
use tracing::debug;

use super::sheet::format_number;
use crate::config::{AuthMode, DatabaseConfig};
use crate::model::CaseDefendants;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to connect to case database {}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("defendant query failed against {}", .path.display())]
    Query {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

/// Finds the case whose defendant roster names the person served.
pub trait DefendantLookup {
    fn find_case(&self, person_served: &str) -> Result<Option<CaseDefendants>, LookupError>;
}

/// Scans the case table of a SQLite database. Every call opens its own
/// read-only connection and closes it before returning.
pub struct SqlDefendantLookup {
    config: DatabaseConfig,
}

impl SqlDefendantLookup {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    fn connect(&self) -> Result<Connection, LookupError> {
        let path = self.config.database_path();
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        debug!(
            path = %path.display(),
            auth_mode = self.config.auth_mode.as_str(),
            "opening case database"
        );

        let opened = match self.config.auth_mode {
            AuthMode::Trusted => Connection::open_with_flags(&path, flags),
            AuthMode::Immutable => Connection::open_with_flags(
                format!("file:{}?immutable=1", uri_path(&path)),
                flags | OpenFlags::SQLITE_OPEN_URI,
            ),
        };

        opened.map_err(|source| LookupError::Connect { path, source })
    }

    // Full scan; a `WHERE DEFENDANT_n = ?1` form is the upgrade path once the
    // roster grows.
    fn roster_query(&self) -> String {
        format!(
            "
            SELECT FileNo, TRIM(DEFENDANT_1), TRIM(DEFENDANT_2), TRIM(DEFENDANT_3)
            FROM {}
            WHERE DEFENDANT_1 IS NOT NULL OR DEFENDANT_2 IS NOT NULL OR DEFENDANT_3 IS NOT NULL
            ",
            self.config.table
        )
    }
}

impl DefendantLookup for SqlDefendantLookup {
    fn find_case(&self, person_served: &str) -> Result<Option<CaseDefendants>, LookupError> {
        let connection = self.connect()?;
        let query_error = |source: rusqlite::Error| LookupError::Query {
            path: self.config.database_path(),
            source,
        };

        let mut statement = connection
            .prepare(&self.roster_query())
            .map_err(query_error)?;
        let mut rows = statement.query([]).map_err(query_error)?;

        while let Some(row) = rows.next().map_err(query_error)? {
            let case = read_case(row).map_err(query_error)?;
            if case.slot_of(person_served).is_some() {
                return Ok(Some(case));
            }
        }

        Ok(None)
    }
}

/// Path component of a SQLite `file:` URI. `%` goes first so the escapes
/// added for `?` and `#` are not escaped again.
fn uri_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('%', "%25")
        .replace('?', "%3f")
        .replace('#', "%23")
}

fn read_case(row: &Row<'_>) -> rusqlite::Result<CaseDefendants> {
    let file_no = match row.get::<_, Value>(0)? {
        Value::Integer(value) => value.to_string(),
        Value::Real(value) => format_number(value),
        Value::Text(value) => value.trim().to_string(),
        Value::Null | Value::Blob(_) => String::new(),
    };

    let mut defendants: [Option<String>; 3] = Default::default();
    for (slot, defendant) in defendants.iter_mut().enumerate() {
        *defendant = row
            .get::<_, Option<String>>(slot + 1)?
            .map(|name| name.trim().to_string());
    }

    Ok(CaseDefendants {
        file_no,
        defendants,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn seed_roster(dir: &Path) -> DatabaseConfig {
        let config = DatabaseConfig {
            server: dir.to_path_buf(),
            database: "cases".to_string(),
            auth_mode: AuthMode::Trusted,
            table: "MASTER".to_string(),
        };

        let connection = Connection::open(config.database_path()).expect("open seed db");
        connection
            .execute_batch(
                "
                CREATE TABLE MASTER (
                  FileNo INTEGER PRIMARY KEY,
                  DEFENDANT_1 TEXT,
                  DEFENDANT_2 TEXT,
                  DEFENDANT_3 TEXT
                );
                INSERT INTO MASTER VALUES (100, NULL, NULL, NULL);
                INSERT INTO MASTER VALUES (200, '  Ann Lee ', 'Bob Ray', NULL);
                INSERT INTO MASTER VALUES (300, 'Cy Dunn', 'Bob Ray', 'Di Fox');
                ",
            )
            .expect("seed roster");

        config
    }

    #[test]
    fn finds_first_case_with_trimmed_defendant_match() {
        let dir = tempfile::tempdir().expect("tmp");
        let lookup = SqlDefendantLookup::new(seed_roster(dir.path()));

        let case = lookup.find_case("Ann Lee").expect("query").expect("match");
        assert_eq!(case.file_no, "200");
        assert_eq!(
            case.defendants,
            [Some("Ann Lee".to_string()), Some("Bob Ray".to_string()), None]
        );

        let case = lookup.find_case("Bob Ray").expect("query").expect("match");
        assert_eq!(case.file_no, "200");

        let case = lookup.find_case("Di Fox").expect("query").expect("match");
        assert_eq!(case.file_no, "300");
        assert_eq!(case.slot_of("Di Fox"), Some(3));
    }

    #[test]
    fn unknown_person_yields_no_match() {
        let dir = tempfile::tempdir().expect("tmp");
        let lookup = SqlDefendantLookup::new(seed_roster(dir.path()));
        assert!(lookup.find_case("Nobody").expect("query").is_none());
    }

    #[test]
    fn immutable_mode_reads_the_same_roster() {
        let dir = tempfile::tempdir().expect("tmp");
        let mut config = seed_roster(dir.path());
        config.auth_mode = AuthMode::Immutable;
        let lookup = SqlDefendantLookup::new(config);
        assert!(lookup.find_case("Cy Dunn").expect("query").is_some());
    }

    #[test]
    fn uri_path_escapes_query_fragment_and_percent() {
        assert_eq!(
            uri_path(Path::new("/srv/roster #1?/50%/cases.sqlite")),
            "/srv/roster %231%3f/50%25/cases.sqlite"
        );
        assert_eq!(uri_path(Path::new("/srv/cases.sqlite")), "/srv/cases.sqlite");
    }

    #[test]
    fn immutable_mode_opens_a_server_path_with_uri_characters() {
        let dir = tempfile::tempdir().expect("tmp");
        let server = dir.path().join("roster #1 ?%41");
        fs::create_dir(&server).expect("server dir");
        let mut config = seed_roster(&server);
        config.auth_mode = AuthMode::Immutable;
        let lookup = SqlDefendantLookup::new(config);

        let case = lookup.find_case("Cy Dunn").expect("query").expect("match");
        assert_eq!(case.file_no, "300");
    }

    #[test]
    fn missing_database_is_a_connect_error() {
        let dir = tempfile::tempdir().expect("tmp");
        let lookup = SqlDefendantLookup::new(DatabaseConfig {
            server: dir.path().to_path_buf(),
            database: "absent".to_string(),
            auth_mode: AuthMode::Trusted,
            table: "MASTER".to_string(),
        });

        let err = lookup.find_case("Ann Lee").expect_err("must fail");
        assert!(matches!(err, LookupError::Connect { .. }), "{err:?}");
    }

    #[test]
    fn missing_table_is_a_query_error() {
        let dir = tempfile::tempdir().expect("tmp");
        let mut config = seed_roster(dir.path());
        config.table = "CASES".to_string();
        let lookup = SqlDefendantLookup::new(config);

        let err = lookup.find_case("Ann Lee").expect_err("must fail");
        assert!(matches!(err, LookupError::Query { .. }), "{err:?}");
    }
}
