/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use rusqlite::{CachedStatement, Connection, Result as SqlResult, Statement};
use std::ops::{Deref, DerefMut};

/// Wraps either a cached or uncached rusqlite statement, so that call sites
/// can request caching as a boolean flag rather than writing two code paths.
pub enum MaybeCached<'conn> {
    Cached(CachedStatement<'conn>),
    Uncached(Statement<'conn>),
}

impl<'conn> MaybeCached<'conn> {
    pub fn prepare(conn: &'conn Connection, sql: &str, cache: bool) -> SqlResult<Self> {
        Ok(if cache {
            MaybeCached::Cached(conn.prepare_cached(sql)?)
        } else {
            MaybeCached::Uncached(conn.prepare(sql)?)
        })
    }
}

impl<'conn> Deref for MaybeCached<'conn> {
    type Target = Statement<'conn>;
    fn deref(&self) -> &Self::Target {
        match self {
            MaybeCached::Cached(s) => s,
            MaybeCached::Uncached(s) => s,
        }
    }
}

impl<'conn> DerefMut for MaybeCached<'conn> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            MaybeCached::Cached(s) => s,
            MaybeCached::Uncached(s) => s,
        }
    }
}
