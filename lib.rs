/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Keeps browser tab groups consistent between a window's local tab model and
//! a remote saved-tab-group store shared with other devices.
//!
//! The embedding application owns a `TabGroupSyncController`, hands it a
//! `TabModel` and a `TabGroupSyncService`, and calls `pump` whenever either side
//! may have queued notifications.

pub mod config;
pub mod diagnostics;
pub mod model;
pub mod services;
pub mod sync;

pub use config::{ConfigError, SyncPreferences};
pub use model::in_memory_tab_model::InMemoryTabModel;
pub use model::tab_model::{TabModel, TabModelEvent};
pub use services::tab_group_sync::{
    InMemoryTabGroupSyncService, SyncServiceEvent, TabGroupSyncService,
};
pub use sync::TabGroupSyncController;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
