/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

mod applier;
mod catalog;
mod clients;
mod engine;
mod error;
mod log_repo;
mod schema;
mod session;
mod subscriptions;
mod tombstones;
mod triggers;

pub use engine::{ApplyOutcome, GcResult, PullResult, PushResult, SyncEngine};
pub use error::{Error, Result};
pub use session::SuppressionGuard;
pub use sync_core::{Operation, SyncLogEntry};

pub use clients::ClientRecord;
pub use subscriptions::{Subscription, SubscriptionType};
