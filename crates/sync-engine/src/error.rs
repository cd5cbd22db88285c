/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

pub type Result<T> = std::result::Result<T, Error>;

/// Wraps [`sync_core::Error`] with the store-level failures that only make
/// sense once there's an actual database connection in the picture.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] sync_core::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error(transparent)]
    OpenDatabase(#[from] sql_support::open_database::Error),

    #[error("payload column {column:?} is not a column of {table:?}")]
    UnknownColumn { table: String, column: String },
}

impl Error {
    pub fn label(&self) -> &'static str {
        match self {
            Error::Core(e) => e.label(),
            Error::Sql(_) => "sql",
            Error::OpenDatabase(_) => "open_database",
            Error::UnknownColumn { .. } => "unknown_column",
        }
    }

    /// True when the underlying SQLite error is a foreign key (or generic
    /// constraint) violation - the applier treats these as deferrable rather
    /// than fatal.
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            Error::Sql(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
