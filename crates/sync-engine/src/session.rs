/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Session manager (C5): the suppression flag that keeps applied remote
//! changes from bouncing straight back into `_sync_log` through the local
//! capture triggers.

use crate::Result;
use rusqlite::Connection;

fn set_active(conn: &Connection, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE _sync_session SET sync_active = ?",
        [active as i64],
    )?;
    Ok(())
}

pub fn is_suppression_active(conn: &Connection) -> Result<bool> {
    let active: i64 = conn.query_row("SELECT sync_active FROM _sync_session", [], |r| r.get(0))?;
    Ok(active != 0)
}

/// RAII guard that suppresses local capture triggers for as long as it's
/// held. Remote changes must always be applied under one of these - it is
/// the only thing standing between the applier and an infinite echo back
/// into `_sync_log`.
///
/// Re-entrant: nesting guards on the same connection is safe, the flag is
/// only cleared once the outermost guard drops.
pub struct SuppressionGuard<'conn> {
    conn: &'conn Connection,
    depth_before: i64,
}

impl<'conn> SuppressionGuard<'conn> {
    pub fn new(conn: &'conn Connection) -> Result<Self> {
        let depth_before: i64 =
            conn.query_row("SELECT sync_active FROM _sync_session", [], |r| r.get(0))?;
        set_active(conn, true)?;
        Ok(SuppressionGuard { conn, depth_before })
    }
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        if self.depth_before == 0 {
            if let Err(e) = set_active(self.conn, false) {
                log::warn!("failed to clear sync suppression flag: {}", e);
            }
        }
    }
}
