/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use chrono::{SecondsFormat, Utc};

/// Renders "now" as ISO-8601 UTC with millisecond precision, matching the
/// format the trigger generator writes into `_sync_log.timestamp`.
pub fn now_iso8601_ms() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
