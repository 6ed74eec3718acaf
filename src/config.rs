use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cli::DatabaseArgs;

pub const DEFAULT_CASE_TABLE: &str = "MASTER";

/// How the case database is opened. Both modes are read-only; access control
/// is left to the file system hosting the database.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Trusted,
    /// No locking at all; for databases on shares that do not support it.
    Immutable,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trusted => "trusted",
            Self::Immutable => "immutable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Directory hosting the database file (local path or mounted share).
    pub server: PathBuf,
    pub database: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    DEFAULT_CASE_TABLE.to_string()
}

impl DatabaseConfig {
    pub fn database_path(&self) -> PathBuf {
        if Path::new(&self.database).extension().is_some() {
            self.server.join(&self.database)
        } else {
            self.server.join(format!("{}.sqlite", self.database))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.as_os_str().is_empty() {
            bail!("database config: `server` must not be empty");
        }
        if self.database.trim().is_empty() {
            bail!("database config: `database` must not be empty");
        }
        if self.database.contains(['/', '\\']) {
            bail!(
                "database config: `database` must be a name, not a path: {}",
                self.database
            );
        }

        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .context("failed to compile table identifier regex")?;
        if !identifier.is_match(&self.table) {
            bail!(
                "database config: `table` is not a plain identifier: {}",
                self.table
            );
        }

        Ok(())
    }
}

pub fn load_database_config(path: &Path) -> Result<DatabaseConfig> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: DatabaseConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

/// Merges the optional config file with command-line overrides.
///
/// Returns `Ok(None)` when no database settings were supplied at all, so the
/// caller can skip classification. A partial configuration is an error.
pub fn resolve_database_config(args: &DatabaseArgs) -> Result<Option<DatabaseConfig>> {
    let from_file = args
        .config
        .as_deref()
        .map(load_database_config)
        .transpose()?;

    let has_overrides = args.db_server.is_some()
        || args.db_name.is_some()
        || args.db_auth_mode.is_some()
        || args.db_table.is_some();

    let mut config = match from_file {
        Some(config) => config,
        None if !has_overrides => return Ok(None),
        None => {
            let Some(server) = args.db_server.clone() else {
                bail!("--db-server is required when no --config file is given");
            };
            let Some(database) = args.db_name.clone() else {
                bail!("--db-name is required when no --config file is given");
            };
            DatabaseConfig {
                server,
                database,
                auth_mode: AuthMode::default(),
                table: default_table(),
            }
        }
    };

    if let Some(server) = &args.db_server {
        config.server = server.clone();
    }
    if let Some(database) = &args.db_name {
        config.database = database.clone();
    }
    if let Some(auth_mode) = args.db_auth_mode {
        config.auth_mode = auth_mode;
    }
    if let Some(table) = &args.db_table {
        config.table = table.clone();
    }

    config.validate()?;
    Ok(Some(config))
}
