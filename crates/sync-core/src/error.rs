/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use error_support::{ErrorHandling, GetErrorHandling};

pub type Result<T> = std::result::Result<T, Error>;

/// The uniform error type shared by every sync crate. Store-specific errors
/// (e.g. `rusqlite::Error`) are folded into `Database` at the crate boundary
/// that owns the store; `sync-core` itself never talks to a database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any store-level failure not classified by one of the variants below.
    #[error("database error: {0}")]
    Database(String),

    /// Applying an entry violated a foreign key; the caller should defer and
    /// retry after the referenced row is applied.
    #[error("foreign key violation on table {table}: {details}")]
    ForeignKeyViolation { table: String, details: String },

    /// End-to-end batch integrity check failed.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// A peer's cursor has fallen below the oldest version retained by the log;
    /// a partial pull can no longer bring it up to date.
    #[error(
        "full resync required: client is at version {client_version}, oldest available is {oldest_available_version}"
    )]
    FullResyncRequired {
        client_version: i64,
        oldest_available_version: i64,
    },

    /// A deferred (foreign-key-blocked) entry could not be applied after every
    /// retry pass completed.
    #[error("deferred change could not be applied: {0}")]
    DeferredChangeFailed(String),

    /// Reserved for conflicts the resolver cannot adjudicate. Should be
    /// unreachable given last-writer-wins over UUID origins.
    #[error("unresolved conflict")]
    UnresolvedConflict,

    /// A table has more than one primary-key column; the apply path only
    /// supports single-column primary keys.
    #[error("table {0} has a composite primary key, which is not supported")]
    CompositePrimaryKey(String),

    /// The calling host signalled cancellation between entries of a batch.
    #[error("operation was cancelled")]
    Interrupted(#[from] interrupt_support::Interrupted),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A stable, payload-free label suitable for metrics - never includes
    /// table names, values, or other data that might be sensitive.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Database(_) => "database",
            Error::ForeignKeyViolation { .. } => "foreign_key_violation",
            Error::HashMismatch { .. } => "hash_mismatch",
            Error::FullResyncRequired { .. } => "full_resync_required",
            Error::DeferredChangeFailed(_) => "deferred_change_failed",
            Error::UnresolvedConflict => "unresolved_conflict",
            Error::CompositePrimaryKey(_) => "composite_primary_key",
            Error::Interrupted(_) => "interrupted",
            Error::Json(_) => "json",
        }
    }
}

impl GetErrorHandling for Error {
    type ExternalError = Error;

    fn get_error_handling(&self) -> ErrorHandling<Self::ExternalError> {
        match self {
            Error::Interrupted(_) => ErrorHandling::log(self.clone_for_report(), log::Level::Debug),
            Error::FullResyncRequired { .. } => {
                ErrorHandling::log(self.clone_for_report(), log::Level::Info)
            }
            _ => ErrorHandling::unexpected(self.clone_for_report(), Some(self.label())),
        }
    }
}

impl Error {
    // `Error` can't derive `Clone` (some variants wrap non-Clone foreign errors),
    // so error handling re-renders via `to_string` for the handful of variants
    // that need to be reported after being matched on by reference.
    fn clone_for_report(&self) -> Error {
        match self {
            Error::Interrupted(_) => Error::Interrupted(interrupt_support::Interrupted),
            Error::FullResyncRequired {
                client_version,
                oldest_available_version,
            } => Error::FullResyncRequired {
                client_version: *client_version,
                oldest_available_version: *oldest_available_version,
            },
            other => Error::Database(other.to_string()),
        }
    }
}
