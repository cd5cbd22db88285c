/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Use this module to open a new SQLite database connection.
//!
//! The code handles some common cases:
//!
//!   - Opening new databases. If this is the first time opening the database, initialize it
//!     to the current schema.
//!
//!   - Migrating existing databases. If this is an existing database, run a series of upgrade
//!     functions to migrate it to the current schema.
//!
//!   - Handling migration failures. If opening or migrating a database results in an error, we
//!     can optionally delete the database file and create a new one.

use crate::ConnExt;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Generic error meaning something went wrong during the migration. Return this from
    /// your upgrade functions to signal that the database is beyond repair and can't be
    /// migrated.
    #[error("migration error: {0}")]
    MigrationError(String),
    /// Error with the `MigrationLogic` struct itself, e.g. the number of upgrade functions
    /// doesn't line up with start_version/end_version.
    #[error("migration logic error: {0}")]
    MigrationLogicError(String),
    #[error("database version too old: {0}")]
    VersionTooOld(u32),
    #[error("database version too new: {0}")]
    VersionTooNew(u32),
    #[error("error executing SQL: {0}")]
    SqlError(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
pub type DatabaseFunc = fn(&Connection) -> Result<()>;

pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

impl DatabaseLocation {
    fn exists(&self) -> bool {
        match self {
            DatabaseLocation::Memory => false,
            DatabaseLocation::File(path) => path.exists(),
        }
    }

    fn open(&self, open_flags: OpenFlags) -> Result<Connection> {
        match self {
            DatabaseLocation::Memory => Ok(Connection::open_in_memory_with_flags(open_flags)?),
            DatabaseLocation::File(path) => Ok(Connection::open_with_flags(path, open_flags)?),
        }
    }

    fn delete(&self) -> Result<()> {
        match self {
            DatabaseLocation::Memory => (),
            DatabaseLocation::File(path) => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum ErrorHandling {
    /// Try to start over with a fresh database. The default for most components.
    DeleteAndRecreate,
    /// Return an error from the open function, in case the caller wants to attempt recovery.
    ReturnError,
}

#[derive(Clone)]
pub struct MigrationLogic {
    /// Name to display in the logs.
    pub name: String,
    /// The first version this migration applies to (usually 1).
    pub start_version: u32,
    /// The version the last upgrade function upgrades to. Intentionally redundant with
    /// `upgrades.len()` so it can act as a sanity check.
    pub end_version: u32,
    /// Runs before the init/upgrade functions.
    pub prepare: Option<DatabaseFunc>,
    /// Initializes a newly created database directly to `end_version`.
    pub init: DatabaseFunc,
    /// `upgrades[n]` migrates version `start_version + n` to `start_version + n + 1`.
    pub upgrades: Vec<DatabaseFunc>,
    /// Runs after the init/upgrade functions.
    pub finish: Option<DatabaseFunc>,
    pub error_handling: ErrorHandling,
}

impl MigrationLogic {
    fn sanity_check(&self) -> Result<()> {
        let total_versions = (self.end_version - self.start_version) as usize;
        match self.upgrades.len() {
            x if x < total_versions => Err(Error::MigrationLogicError(format!(
                "not enough upgrade functions to upgrade from {} to {}",
                self.start_version, self.end_version
            ))),
            x if x > total_versions => Err(Error::MigrationLogicError(format!(
                "too many upgrade functions to upgrade from {} to {}",
                self.start_version, self.end_version
            ))),
            _ => Ok(()),
        }
    }

    fn run(&self, conn: &Connection, init: bool) -> Result<()> {
        log::debug!("{}: opening database", self.name);
        let tx = conn.unchecked_transaction()?;
        self.run_prepare(&tx)?;
        if init {
            self.run_init(&tx)?;
        } else {
            let mut current_version = get_schema_version(&tx)?;
            if current_version < self.start_version {
                return Err(Error::VersionTooOld(current_version));
            } else if current_version > self.end_version {
                return Err(Error::VersionTooNew(current_version));
            }
            while current_version < self.end_version {
                self.run_upgrade(&tx, current_version + 1)?;
                current_version += 1;
            }
        }
        set_schema_version(&tx, self.end_version)?;
        self.run_finish(&tx)?;
        tx.commit()?;
        log::debug!("{}: database open successful", self.name);
        Ok(())
    }

    fn run_prepare(&self, conn: &Connection) -> Result<()> {
        log::debug!("{}: preparing database", self.name);
        if let Some(prepare) = self.prepare {
            prepare(conn)?;
        }
        Ok(())
    }

    fn run_init(&self, conn: &Connection) -> Result<()> {
        log::debug!("{}: initializing new database", self.name);
        (self.init)(conn)
    }

    /// Runs the upgrade function that migrates to `version`. Panics unless
    /// `start_version < version <= end_version`.
    fn run_upgrade(&self, conn: &Connection, version: u32) -> Result<()> {
        log::debug!("{}: upgrading database to {}", self.name, version);
        let upgrade_index = (version - self.start_version - 1) as usize;
        (self.upgrades[upgrade_index])(conn)
    }

    fn run_finish(&self, conn: &Connection) -> Result<()> {
        log::debug!("{}: finishing database open", self.name);
        if let Some(finish) = self.finish {
            finish(conn)?;
        }
        Ok(())
    }
}

pub fn open_database(path: PathBuf, migration_logic: MigrationLogic) -> Result<Connection> {
    open_database_with_flags(
        DatabaseLocation::File(path),
        OpenFlags::default(),
        migration_logic,
    )
}

pub fn open_database_with_flags(
    location: DatabaseLocation,
    open_flags: OpenFlags,
    migration_logic: MigrationLogic,
) -> Result<Connection> {
    migration_logic.sanity_check()?;
    let initializing = !location.exists();
    let mut conn = location.open(open_flags)?;
    let mut result = migration_logic.run(&conn, initializing);
    if migration_logic.error_handling == ErrorHandling::DeleteAndRecreate {
        result = result.or_else(|e| {
            log::warn!(
                "error while opening database file, will recreate file: {:?}",
                e
            );
            location.delete()?;
            conn = location.open(open_flags)?;
            migration_logic.run(&conn, true)
        });
    }
    result?;
    Ok(conn)
}

fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version as u32)
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Not `#[cfg(test)]` so it can be used by other crates' test suites too.
pub mod test_utils {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    pub fn open_memory_database(migration: MigrationLogic) -> Result<Connection> {
        open_database_with_flags(DatabaseLocation::Memory, OpenFlags::default(), migration)
    }

    /// A database file that we can programmatically run upgrades on.
    ///
    /// We purposefully don't keep a connection to the database around, to force upgrades to
    /// always run against a newly opened connection, like they would in the real world.
    pub struct MigratedDatabaseFile {
        _tempdir: TempDir,
        migration_logic: MigrationLogic,
        pub path: PathBuf,
    }

    impl MigratedDatabaseFile {
        pub fn new(
            migration_logic: MigrationLogic,
            initial_schema_func: DatabaseFunc,
            initial_version: u32,
        ) -> Self {
            Self::new_with_flags(
                migration_logic,
                initial_schema_func,
                initial_version,
                OpenFlags::default(),
            )
        }

        pub fn new_with_flags(
            migration_logic: MigrationLogic,
            initial_schema_func: DatabaseFunc,
            initial_version: u32,
            open_flags: OpenFlags,
        ) -> Self {
            let tempdir = tempfile::tempdir().unwrap();
            let path = tempdir.path().join(Path::new("db.sql"));
            let conn = Connection::open_with_flags(&path, open_flags).unwrap();
            initial_schema_func(&conn).unwrap();
            set_schema_version(&conn, initial_version).unwrap();
            Self {
                _tempdir: tempdir,
                migration_logic,
                path,
            }
        }

        pub fn upgrade_to(&self, version: u32) {
            let upgrade_count = (version - self.migration_logic.start_version) as usize;
            let upgrades = self.migration_logic.upgrades[..upgrade_count].to_vec();
            let upgrade_logic = MigrationLogic {
                end_version: version,
                upgrades,
                ..self.migration_logic.clone()
            };
            upgrade_logic.run(&self.open(), false).unwrap();
        }

        pub fn run_all_upgrades(&self) {
            for version in self.migration_logic.start_version..self.migration_logic.end_version {
                self.upgrade_to(version + 1);
            }
        }

        pub fn open(&self) -> Connection {
            Connection::open(&self.path).unwrap()
        }
    }
}
