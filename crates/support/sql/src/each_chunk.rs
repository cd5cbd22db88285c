/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use rusqlite::{limits::Limit, types::ToSql};

/// Returns SQLITE_LIMIT_VARIABLE_NUMBER as read from an in-memory connection and cached.
/// If a real connection's limit was lowered below this at runtime, callers using this
/// helper would be wrong; we don't support that case.
pub fn default_max_variable_number() -> usize {
    lazy_static! {
        static ref MAX_VARIABLE_NUMBER: usize = {
            let conn = rusqlite::Connection::open_in_memory()
                .expect("failed to initialize in-memory connection (out of memory?)");
            let limit = conn.limit(Limit::SQLITE_LIMIT_VARIABLE_NUMBER);
            assert!(
                limit > 0,
                "illegal value for SQLITE_LIMIT_VARIABLE_NUMBER (must be > 0): {}",
                limit
            );
            limit as usize
        };
    }
    *MAX_VARIABLE_NUMBER
}

/// Helper for the case where you have a `&[impl ToSql]` of arbitrary length, but need a
/// `&[&dyn ToSql]` of no more than the connection's `default_max_variable_number()`. Useful
/// for batched inserts/updates/`IN (...)` queries.
pub fn each_chunk<'a, T, E, F>(items: &[T], do_chunk: F) -> Result<(), E>
where
    T: ToSql + 'a,
    F: FnMut(&[&dyn ToSql], usize) -> Result<(), E>,
{
    each_sized_chunk_mapped(
        items,
        default_max_variable_number(),
        |t| t as &dyn ToSql,
        do_chunk,
    )
}

/// A version of `each_chunk` for the case when the conversion to `&dyn ToSql`
/// requires a custom intermediate step (e.g. pulling a field off a struct).
pub fn each_chunk_mapped<'a, T, E, Mapper, DoChunk>(
    items: &'a [T],
    to_sql: Mapper,
    do_chunk: DoChunk,
) -> Result<(), E>
where
    T: 'a,
    Mapper: Fn(&'a T) -> &'a dyn ToSql,
    DoChunk: FnMut(&[&dyn ToSql], usize) -> Result<(), E>,
{
    each_sized_chunk_mapped(items, default_max_variable_number(), to_sql, do_chunk)
}

/// Low-level version of `each_chunk`/`each_chunk_mapped` that also takes the chunk size.
pub fn each_sized_chunk_mapped<'a, T, E, Mapper, DoChunk>(
    items: &'a [T],
    chunk_size: usize,
    to_sql: Mapper,
    mut do_chunk: DoChunk,
) -> Result<(), E>
where
    T: 'a,
    Mapper: Fn(&'a T) -> &'a dyn ToSql,
    DoChunk: FnMut(&[&dyn ToSql], usize) -> Result<(), E>,
{
    if items.is_empty() {
        return Ok(());
    }
    let mut vec = Vec::with_capacity(chunk_size.min(items.len()));
    let mut offset = 0;
    for chunk in items.chunks(chunk_size) {
        vec.clear();
        vec.extend(chunk.iter().map(|v| to_sql(v)));
        do_chunk(&vec, offset)?;
        offset += chunk.len();
    }
    Ok(())
}
