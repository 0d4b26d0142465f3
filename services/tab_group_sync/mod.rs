/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Boundary to the remote saved-tab-group store.
//!
//! Transport and storage live behind `TabGroupSyncService`. The engine calls
//! the mutation methods directly and collects store notifications from the
//! outbox (`take_events`), each tagged with the `TriggerSource` that caused it.

use crate::model::{
    ClosingSource, EventDetails, LocalTabGroupId, LocalTabId, OpeningSource, SavedTabGroup,
    SyncId, TabGroupColor, TriggerSource,
};

pub mod in_memory;

pub use in_memory::InMemoryTabGroupSyncService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncServiceEvent {
    Initialized,
    TabGroupAdded {
        group: SavedTabGroup,
        source: TriggerSource,
    },
    TabGroupUpdated {
        group: SavedTabGroup,
        source: TriggerSource,
    },
    TabGroupRemoved {
        sync_id: SyncId,
        local_id: Option<LocalTabGroupId>,
        source: TriggerSource,
    },
}

impl SyncServiceEvent {
    pub fn source(&self) -> Option<TriggerSource> {
        match self {
            Self::Initialized => None,
            Self::TabGroupAdded { source, .. }
            | Self::TabGroupUpdated { source, .. }
            | Self::TabGroupRemoved { source, .. } => Some(*source),
        }
    }
}

pub trait TabGroupSyncService {
    fn add_group(&mut self, group: SavedTabGroup);

    fn remove_group(&mut self, local_id: LocalTabGroupId);

    fn remove_group_by_sync_id(&mut self, sync_id: SyncId);

    fn update_visual_data(&mut self, local_id: LocalTabGroupId, title: &str, color: TabGroupColor);

    /// Adds a tab at `position` (end of group when `None`). A tab already
    /// mapped to `local_tab_id` in the group is left alone.
    fn add_tab(
        &mut self,
        local_group_id: LocalTabGroupId,
        local_tab_id: LocalTabId,
        title: &str,
        url: &str,
        position: Option<usize>,
    );

    fn update_tab(
        &mut self,
        local_group_id: LocalTabGroupId,
        local_tab_id: LocalTabId,
        title: &str,
        url: &str,
        position: usize,
    );

    /// Removing the last tab of a group removes the group.
    fn remove_tab(&mut self, local_group_id: LocalTabGroupId, local_tab_id: LocalTabId);

    fn move_tab(
        &mut self,
        local_group_id: LocalTabGroupId,
        local_tab_id: LocalTabId,
        position: usize,
    );

    fn get_group(&self, sync_id: SyncId) -> Option<SavedTabGroup>;

    fn get_group_by_local_id(&self, local_id: LocalTabGroupId) -> Option<SavedTabGroup>;

    fn all_group_ids(&self) -> Vec<SyncId>;

    /// Local ids of groups deleted remotely while they were open locally.
    fn deleted_group_ids(&self) -> Vec<LocalTabGroupId>;

    fn update_local_tab_group_mapping(
        &mut self,
        sync_id: SyncId,
        local_id: LocalTabGroupId,
        opening_source: OpeningSource,
    );

    fn remove_local_tab_group_mapping(
        &mut self,
        local_id: LocalTabGroupId,
        closing_source: ClosingSource,
    );

    fn update_local_tab_id(
        &mut self,
        local_group_id: LocalTabGroupId,
        tab_sync_id: SyncId,
        local_tab_id: LocalTabId,
    );

    fn on_tab_selected(&mut self, local_group_id: Option<LocalTabGroupId>, local_tab_id: LocalTabId);

    fn record_tab_group_event(&mut self, details: EventDetails);

    fn is_remote_device(&self, device_id: Option<&str>) -> bool;

    /// Drains notifications emitted since the last call.
    fn take_events(&mut self) -> Vec<SyncServiceEvent>;
}
