/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Renders `v` as minified JSON with object keys sorted ascending. Used
/// anywhere two independently constructed values need to compare or hash
/// identically - the wire format, hashing, and record-hash dedup all go
/// through this function.
pub fn canonicalize(v: &Value) -> String {
    let mut out = String::new();
    write_canonical(v, &mut out);
    out
}

fn write_canonical(v: &Value, out: &mut String) {
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            write!(out, "{}", n).expect("writing to a String cannot fail");
        }
        Value::String(s) => {
            write!(out, "{}", serde_json::to_string(s).expect("strings always serialize"))
                .expect("writing to a String cannot fail");
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // BTreeMap gives us ascending key order for free.
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, val)) in sorted.into_iter().enumerate() {
                if i != 0 {
                    out.push(',');
                }
                write!(out, "{}:", serde_json::to_string(k).expect("strings always serialize"))
                    .expect("writing to a String cannot fail");
                write_canonical(val, out);
            }
            out.push('}');
        }
    }
}
