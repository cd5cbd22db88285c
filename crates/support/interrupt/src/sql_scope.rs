/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{Interrupted, Interruptable, Interruptee};
use rusqlite::InterruptHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Interrupt state shared between a `SqlInterruptScope` and its `SqlInterruptHandle`.
#[derive(Debug, Default)]
struct SqlInterruptState {
    interrupted: AtomicBool,
}

/// A `SqlInterruptHandle` can be held onto (typically behind an `Arc`, and sent
/// to another thread) to abort a long-running operation bound to one
/// `rusqlite::Connection`.
///
/// Unlike `InterruptScope`, this also calls `rusqlite::Connection::interrupt()`,
/// which aborts any SQLite statement currently executing on that connection -
/// `InterruptScope` alone only stops the *next* loop iteration from starting.
pub struct SqlInterruptHandle {
    db_handle: InterruptHandle,
    state: Arc<SqlInterruptState>,
}

impl SqlInterruptHandle {
    pub fn new(conn: &rusqlite::Connection) -> Self {
        Self {
            db_handle: conn.get_interrupt_handle(),
            state: Arc::new(SqlInterruptState::default()),
        }
    }

    fn scope(&self) -> SqlInterruptScope {
        SqlInterruptScope {
            state: self.state.clone(),
        }
    }
}

impl Interruptable for SqlInterruptHandle {
    fn interrupt(&self) {
        self.state.interrupted.store(true, Ordering::SeqCst);
        self.db_handle.interrupt();
    }
}

/// A cheap, cloneable handle checked between entries of a loop bound to one
/// connection. Obtained from `SqlInterruptHandle::scope()`, or constructed
/// standalone for tests via `SqlInterruptScope::dummy()`.
#[derive(Clone)]
pub struct SqlInterruptScope {
    state: Arc<SqlInterruptState>,
}

impl SqlInterruptScope {
    pub fn for_handle(handle: &SqlInterruptHandle) -> Self {
        handle.scope()
    }

    /// A scope that is never interrupted - useful in tests that don't exercise
    /// cancellation.
    pub fn dummy() -> Self {
        Self {
            state: Arc::new(SqlInterruptState::default()),
        }
    }
}

impl Interruptee for SqlInterruptScope {
    fn was_interrupted(&self) -> bool {
        self.state.interrupted.load(Ordering::SeqCst)
    }

    fn err_if_interrupted(&self) -> Result<(), Interrupted> {
        if self.was_interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_scope_never_interrupts() {
        let scope = SqlInterruptScope::dummy();
        assert!(!scope.was_interrupted());
        assert!(scope.err_if_interrupted().is_ok());
    }

    #[test]
    fn test_handle_interrupts_its_scopes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let handle = SqlInterruptHandle::new(&conn);
        let scope = handle.scope();
        assert!(!scope.was_interrupted());
        handle.interrupt();
        assert!(scope.was_interrupted());
        assert!(scope.err_if_interrupted().is_err());
    }
}
