/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] sync_core::Error),

    #[error("unknown column referenced in mapping: {0}")]
    UnknownColumn(String),

    #[error("LQL parse error: {0}")]
    LqlParse(String),

    #[error("LQL evaluation error: {0}")]
    LqlEval(String),
}

impl Error {
    pub fn label(&self) -> &'static str {
        match self {
            Error::Core(e) => e.label(),
            Error::UnknownColumn(_) => "unknown_column",
            Error::LqlParse(_) => "lql_parse",
            Error::LqlEval(_) => "lql_eval",
        }
    }
}
