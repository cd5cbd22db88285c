/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use super::ast::Expr;
use super::builtins;
use crate::Error;
use std::collections::BTreeMap;
use sync_core::CanonicalValue;

/// Evaluates `expr` against `bindings` (the source payload's columns).
/// Pure: the same `(expr, bindings)` always produces the same result.
pub fn eval(expr: &Expr, bindings: &BTreeMap<String, CanonicalValue>) -> Result<CanonicalValue, Error> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => Ok(bindings.get(name).cloned().unwrap_or(CanonicalValue::Null)),
        Expr::Call(name, args) => {
            let evaluated = args
                .iter()
                .map(|a| eval(a, bindings))
                .collect::<Result<Vec<_>, Error>>()?;
            builtins::call(name, &evaluated)
        }
    }
}

/// Parses and evaluates `source` in one step.
pub fn eval_str(source: &str, bindings: &BTreeMap<String, CanonicalValue>) -> Result<CanonicalValue, Error> {
    let expr = super::parser::parse(source)?;
    eval(&expr, bindings)
}
