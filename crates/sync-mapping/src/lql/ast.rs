/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use sync_core::CanonicalValue;

/// A parsed LQL expression (§4.12). Pipelines are desugared away by the
/// parser - `a |> f(x)` and `f(a, x)` produce the identical tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(CanonicalValue),
    Ident(String),
    Call(String, Vec<Expr>),
}
