/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The sync engine: projectors in both directions, the observers feeding them,
//! startup reconciliation and the controller that sequences it all.

use crate::config::SyncPreferences;
use crate::model::tab_model::TabModel;
use crate::services::tab_group_sync::TabGroupSyncService;

pub mod controller;
pub mod identifier_bridge;
pub(crate) mod local_mutation;
pub(crate) mod local_observer;
pub(crate) mod navigation_tracker;
pub(crate) mod observation_gate;
pub(crate) mod remote_mutation;
pub(crate) mod remote_observer;
pub(crate) mod startup;
pub(crate) mod task_queue;

#[cfg(test)]
mod tests;

pub use controller::TabGroupSyncController;

use navigation_tracker::NavigationTracker;
use task_queue::DeferredTaskQueue;

/// Everything one projection pass may touch.
pub(crate) struct SyncContext<'a> {
    pub(crate) tab_model: &'a mut dyn TabModel,
    pub(crate) sync_service: &'a mut dyn TabGroupSyncService,
    pub(crate) navigation_tracker: &'a mut NavigationTracker,
    pub(crate) deferred_tasks: &'a DeferredTaskQueue,
    pub(crate) preferences: &'a SyncPreferences,
}
