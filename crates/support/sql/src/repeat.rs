/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::fmt::Write;

/// Build a `(?,?,?)`-style placeholder group for `count` variables, for use
/// in `IN (...)` clauses built outside of `each_chunk`.
pub fn repeat_sql_vars(count: usize) -> String {
    debug_assert!(count > 0);
    let mut s = String::with_capacity(count * 2 + 1);
    s.push('(');
    for i in 0..count {
        if i != 0 {
            s.push(',');
        }
        s.push('?');
    }
    s.push(')');
    s
}

/// Build a multi-value `VALUES` clause with `rows` tuples of `cols_per_row`
/// placeholders each, e.g. `repeat_multi_values(2, 3)` -> `(?,?,?),(?,?,?)`.
pub fn repeat_multi_values(rows: usize, cols_per_row: usize) -> String {
    debug_assert!(rows > 0 && cols_per_row > 0);
    let mut s = String::with_capacity(rows * (cols_per_row * 2 + 2));
    for row in 0..rows {
        if row != 0 {
            s.push(',');
        }
        write!(&mut s, "{}", repeat_sql_vars(cols_per_row)).unwrap();
    }
    s
}
