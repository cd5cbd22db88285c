/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! LQL (C13): the small pipeline/function expression language used inside
//! column transforms.

mod ast;
mod builtins;
mod eval;
mod lexer;
mod parser;

pub use ast::Expr;
pub use eval::{eval, eval_str};
pub use parser::parse;
