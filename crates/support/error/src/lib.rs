/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Small helpers shared by the sync crates for converting, logging and
//! reporting errors in a consistent way.

mod handling;
mod reporting;

pub use handling::*;
pub use reporting::*;
