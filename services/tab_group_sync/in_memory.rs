/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Reference `TabGroupSyncService` holding saved groups in memory.
//!
//! Groups live in a slotmap arena with two lookup indices (sync id and local
//! id) that are kept consistent on every mutation. `apply_remote_*` methods
//! stand in for changes arriving from other devices and are announced with
//! `TriggerSource::Remote`; everything reached through the trait is local.

use std::collections::HashMap;
use std::mem;

use slotmap::{SlotMap, new_key_type};
use time::OffsetDateTime;

use super::{SyncServiceEvent, TabGroupSyncService};
use crate::model::{
    ClosingSource, EventDetails, LocalTabGroupId, LocalTabId, OpeningSource, SavedTabGroup,
    SavedTabGroupTab, SyncId, TabGroupColor, TabGroupEvent, TriggerSource,
};

new_key_type! {
    struct GroupKey;
}

#[derive(Debug)]
pub struct InMemoryTabGroupSyncService {
    groups: SlotMap<GroupKey, SavedTabGroup>,
    by_sync_id: HashMap<SyncId, GroupKey>,
    by_local_id: HashMap<LocalTabGroupId, GroupKey>,
    deleted_local_ids: Vec<LocalTabGroupId>,
    local_device_id: String,
    events: Vec<SyncServiceEvent>,
    recorded_events: Vec<EventDetails>,
    selected_tab: Option<(Option<LocalTabGroupId>, LocalTabId)>,
    mutation_count: u64,
}

impl InMemoryTabGroupSyncService {
    pub fn new(local_device_id: impl Into<String>) -> Self {
        Self {
            groups: SlotMap::with_key(),
            by_sync_id: HashMap::new(),
            by_local_id: HashMap::new(),
            deleted_local_ids: Vec::new(),
            local_device_id: local_device_id.into(),
            events: Vec::new(),
            recorded_events: Vec::new(),
            selected_tab: None,
            mutation_count: 0,
        }
    }

    pub fn local_device_id(&self) -> &str {
        &self.local_device_id
    }

    pub fn mark_initialized(&mut self) {
        self.events.push(SyncServiceEvent::Initialized);
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Store mutations applied so far, local and remote. Mapping changes that
    /// leave the stored value untouched do not count.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    pub fn recorded_events(&self) -> &[EventDetails] {
        &self.recorded_events
    }

    pub fn selected_tab(&self) -> Option<(Option<LocalTabGroupId>, LocalTabId)> {
        self.selected_tab
    }

    /// Seeds a group as if it had been persisted by an earlier session of this
    /// device. Local ids are kept as given and no event is emitted.
    pub fn restore_group(&mut self, group: SavedTabGroup) {
        self.insert(group);
    }

    /// Seeds the ids of groups another device deleted while they were open here.
    pub fn restore_deleted_group_id(&mut self, local_id: LocalTabGroupId) {
        if !self.deleted_local_ids.contains(&local_id) {
            self.deleted_local_ids.push(local_id);
        }
    }

    /// A group created on another device arrives.
    pub fn apply_remote_group_added(&mut self, mut group: SavedTabGroup) -> SyncId {
        group.clear_local_ids();
        group.normalize_positions();
        let sync_id = group.sync_id;
        self.insert(group.clone());
        self.mutation_count += 1;
        self.events.push(SyncServiceEvent::TabGroupAdded {
            group,
            source: TriggerSource::Remote,
        });
        sync_id
    }

    /// Another device replaced the contents of a group. Local mappings are
    /// carried over for every group and tab sync id that survives.
    pub fn apply_remote_group_updated(&mut self, mut group: SavedTabGroup) {
        let Some(key) = self.by_sync_id.get(&group.sync_id).copied() else {
            log::debug!("remote update for unknown group {}", group.sync_id);
            return;
        };
        let Some(existing) = self.groups.get(key) else {
            return;
        };
        group.local_group_id = existing.local_group_id;
        for tab in &mut group.saved_tabs {
            tab.group_sync_id = group.sync_id;
            tab.local_tab_id = existing
                .tab_by_sync_id(tab.sync_id)
                .and_then(|previous| previous.local_tab_id);
        }
        group.normalize_positions();
        group.update_time = OffsetDateTime::now_utc();
        if let Some(slot) = self.groups.get_mut(key) {
            *slot = group.clone();
        }
        self.mutation_count += 1;
        self.events.push(SyncServiceEvent::TabGroupUpdated {
            group,
            source: TriggerSource::Remote,
        });
    }

    /// Another device deleted a group.
    pub fn apply_remote_group_removed(&mut self, sync_id: SyncId) {
        let Some(group) = self.remove_by_sync_id(sync_id) else {
            return;
        };
        if let Some(local_id) = group.local_group_id {
            self.restore_deleted_group_id(local_id);
        }
        self.events.push(SyncServiceEvent::TabGroupRemoved {
            sync_id,
            local_id: group.local_group_id,
            source: TriggerSource::Remote,
        });
    }

    fn insert(&mut self, group: SavedTabGroup) -> GroupKey {
        if let Some(stale) = self.by_sync_id.get(&group.sync_id).copied() {
            self.remove_key(stale);
        }
        if let Some(local_id) = group.local_group_id
            && let Some(stale) = self.by_local_id.get(&local_id).copied()
        {
            log::error!("{local_id} already mapped; dropping previous mapping");
            debug_assert!(false, "local group id mapped twice");
            if let Some(previous) = self.groups.get_mut(stale) {
                previous.clear_local_ids();
            }
            self.by_local_id.remove(&local_id);
        }
        let sync_id = group.sync_id;
        let local_id = group.local_group_id;
        let key = self.groups.insert(group);
        self.by_sync_id.insert(sync_id, key);
        if let Some(local_id) = local_id {
            self.by_local_id.insert(local_id, key);
        }
        key
    }

    fn remove_key(&mut self, key: GroupKey) -> Option<SavedTabGroup> {
        let group = self.groups.remove(key)?;
        self.by_sync_id.remove(&group.sync_id);
        if let Some(local_id) = group.local_group_id {
            self.by_local_id.remove(&local_id);
        }
        self.mutation_count += 1;
        Some(group)
    }

    fn remove_by_sync_id(&mut self, sync_id: SyncId) -> Option<SavedTabGroup> {
        let key = self.by_sync_id.get(&sync_id).copied()?;
        self.remove_key(key)
    }

    fn local_group_mut(&mut self, local_id: LocalTabGroupId) -> Option<&mut SavedTabGroup> {
        let key = self.by_local_id.get(&local_id).copied()?;
        self.groups.get_mut(key)
    }

    /// Stamps a locally modified group and announces it.
    fn touch_local(&mut self, local_id: LocalTabGroupId) {
        let device = self.local_device_id.clone();
        let Some(group) = self.local_group_mut(local_id) else {
            return;
        };
        group.normalize_positions();
        group.update_time = OffsetDateTime::now_utc();
        group.last_updater_device_id = Some(device);
        let snapshot = group.clone();
        self.mutation_count += 1;
        self.events.push(SyncServiceEvent::TabGroupUpdated {
            group: snapshot,
            source: TriggerSource::Local,
        });
    }
}

impl TabGroupSyncService for InMemoryTabGroupSyncService {
    fn add_group(&mut self, mut group: SavedTabGroup) {
        if group.saved_tabs.is_empty() {
            log::debug!("refusing to save empty group {}", group.sync_id);
            return;
        }
        let device = self.local_device_id.clone();
        group.creator_device_id.get_or_insert_with(|| device.clone());
        group.last_updater_device_id = Some(device.clone());
        for tab in &mut group.saved_tabs {
            tab.group_sync_id = group.sync_id;
            tab.creator_device_id.get_or_insert_with(|| device.clone());
            tab.last_updater_device_id = Some(device.clone());
        }
        group.normalize_positions();
        if let Some(local_id) = group.local_group_id {
            self.deleted_local_ids.retain(|deleted| *deleted != local_id);
        }
        self.insert(group.clone());
        self.mutation_count += 1;
        self.events.push(SyncServiceEvent::TabGroupAdded {
            group,
            source: TriggerSource::Local,
        });
    }

    fn remove_group(&mut self, local_id: LocalTabGroupId) {
        let Some(key) = self.by_local_id.get(&local_id).copied() else {
            log::debug!("remove_group: {local_id} is not saved");
            return;
        };
        if let Some(group) = self.remove_key(key) {
            self.events.push(SyncServiceEvent::TabGroupRemoved {
                sync_id: group.sync_id,
                local_id: group.local_group_id,
                source: TriggerSource::Local,
            });
        }
    }

    fn remove_group_by_sync_id(&mut self, sync_id: SyncId) {
        if let Some(group) = self.remove_by_sync_id(sync_id) {
            self.events.push(SyncServiceEvent::TabGroupRemoved {
                sync_id,
                local_id: group.local_group_id,
                source: TriggerSource::Local,
            });
        }
    }

    fn update_visual_data(&mut self, local_id: LocalTabGroupId, title: &str, color: TabGroupColor) {
        let Some(group) = self.local_group_mut(local_id) else {
            return;
        };
        if group.title == title && group.color == color {
            return;
        }
        group.title = title.to_string();
        group.color = color;
        self.touch_local(local_id);
    }

    fn add_tab(
        &mut self,
        local_group_id: LocalTabGroupId,
        local_tab_id: LocalTabId,
        title: &str,
        url: &str,
        position: Option<usize>,
    ) {
        let device = self.local_device_id.clone();
        let Some(group) = self.local_group_mut(local_group_id) else {
            log::debug!("add_tab: {local_group_id} is not saved");
            return;
        };
        if group.contains_local_tab(local_tab_id) {
            return;
        }
        let mut tab = SavedTabGroupTab::new(group.sync_id, url, title, 0)
            .with_local_tab_id(local_tab_id);
        tab.creator_device_id = Some(device.clone());
        tab.last_updater_device_id = Some(device);
        let index = position
            .unwrap_or(group.saved_tabs.len())
            .min(group.saved_tabs.len());
        group.saved_tabs.insert(index, tab);
        self.touch_local(local_group_id);
    }

    fn update_tab(
        &mut self,
        local_group_id: LocalTabGroupId,
        local_tab_id: LocalTabId,
        title: &str,
        url: &str,
        position: usize,
    ) {
        let device = self.local_device_id.clone();
        let Some(group) = self.local_group_mut(local_group_id) else {
            return;
        };
        let Some(index) = group
            .saved_tabs
            .iter()
            .position(|tab| tab.local_tab_id == Some(local_tab_id))
        else {
            return;
        };
        let unchanged = {
            let tab = &group.saved_tabs[index];
            tab.title == title && tab.url == url && index == position
        };
        if unchanged {
            return;
        }
        let mut tab = group.saved_tabs.remove(index);
        tab.title = title.to_string();
        tab.url = url.to_string();
        tab.last_updater_device_id = Some(device);
        let target = position.min(group.saved_tabs.len());
        group.saved_tabs.insert(target, tab);
        self.touch_local(local_group_id);
    }

    fn remove_tab(&mut self, local_group_id: LocalTabGroupId, local_tab_id: LocalTabId) {
        let Some(group) = self.local_group_mut(local_group_id) else {
            return;
        };
        let before = group.saved_tabs.len();
        group
            .saved_tabs
            .retain(|tab| tab.local_tab_id != Some(local_tab_id));
        if group.saved_tabs.len() == before {
            return;
        }
        if group.saved_tabs.is_empty() {
            self.remove_group(local_group_id);
        } else {
            self.touch_local(local_group_id);
        }
    }

    fn move_tab(
        &mut self,
        local_group_id: LocalTabGroupId,
        local_tab_id: LocalTabId,
        position: usize,
    ) {
        let Some(group) = self.local_group_mut(local_group_id) else {
            return;
        };
        let Some(index) = group
            .saved_tabs
            .iter()
            .position(|tab| tab.local_tab_id == Some(local_tab_id))
        else {
            return;
        };
        let target = position.min(group.saved_tabs.len() - 1);
        if index == target {
            return;
        }
        let tab = group.saved_tabs.remove(index);
        group.saved_tabs.insert(target, tab);
        self.touch_local(local_group_id);
    }

    fn get_group(&self, sync_id: SyncId) -> Option<SavedTabGroup> {
        let key = self.by_sync_id.get(&sync_id)?;
        self.groups.get(*key).cloned()
    }

    fn get_group_by_local_id(&self, local_id: LocalTabGroupId) -> Option<SavedTabGroup> {
        let key = self.by_local_id.get(&local_id)?;
        self.groups.get(*key).cloned()
    }

    fn all_group_ids(&self) -> Vec<SyncId> {
        let mut groups: Vec<&SavedTabGroup> = self.groups.values().collect();
        groups.sort_by_key(|group| group.creation_time);
        groups.into_iter().map(|group| group.sync_id).collect()
    }

    fn deleted_group_ids(&self) -> Vec<LocalTabGroupId> {
        self.deleted_local_ids.clone()
    }

    fn update_local_tab_group_mapping(
        &mut self,
        sync_id: SyncId,
        local_id: LocalTabGroupId,
        opening_source: OpeningSource,
    ) {
        let Some(key) = self.by_sync_id.get(&sync_id).copied() else {
            log::debug!("cannot map {local_id} to unknown {sync_id}");
            return;
        };
        if let Some(other) = self.by_local_id.get(&local_id).copied()
            && other != key
        {
            log::error!("{local_id} already maps to another saved group");
            debug_assert!(false, "local group id mapped twice");
            return;
        }
        let Some(group) = self.groups.get_mut(key) else {
            return;
        };
        if let Some(previous) = group.local_group_id.replace(local_id)
            && previous != local_id
        {
            self.by_local_id.remove(&previous);
        }
        self.by_local_id.insert(local_id, key);
        self.deleted_local_ids.retain(|deleted| *deleted != local_id);

        let mut details = EventDetails::new(TabGroupEvent::GroupOpened);
        details.local_group_id = Some(local_id);
        details.opening_source = Some(opening_source);
        self.recorded_events.push(details);
    }

    fn remove_local_tab_group_mapping(
        &mut self,
        local_id: LocalTabGroupId,
        closing_source: ClosingSource,
    ) {
        self.deleted_local_ids.retain(|deleted| *deleted != local_id);
        let Some(key) = self.by_local_id.remove(&local_id) else {
            return;
        };
        if let Some(group) = self.groups.get_mut(key) {
            group.clear_local_ids();
        }
        let mut details = EventDetails::new(TabGroupEvent::GroupClosed);
        details.local_group_id = Some(local_id);
        details.closing_source = Some(closing_source);
        self.recorded_events.push(details);
    }

    fn update_local_tab_id(
        &mut self,
        local_group_id: LocalTabGroupId,
        tab_sync_id: SyncId,
        local_tab_id: LocalTabId,
    ) {
        let Some(group) = self.local_group_mut(local_group_id) else {
            return;
        };
        // A local tab maps to at most one saved tab.
        for tab in &mut group.saved_tabs {
            if tab.sync_id != tab_sync_id && tab.local_tab_id == Some(local_tab_id) {
                tab.local_tab_id = None;
            }
        }
        if let Some(tab) = group
            .saved_tabs
            .iter_mut()
            .find(|tab| tab.sync_id == tab_sync_id)
        {
            tab.local_tab_id = Some(local_tab_id);
        }
    }

    fn on_tab_selected(&mut self, local_group_id: Option<LocalTabGroupId>, local_tab_id: LocalTabId) {
        self.selected_tab = Some((local_group_id, local_tab_id));
    }

    fn record_tab_group_event(&mut self, details: EventDetails) {
        self.recorded_events.push(details);
    }

    fn is_remote_device(&self, device_id: Option<&str>) -> bool {
        device_id.is_some_and(|device| device != self.local_device_id)
    }

    fn take_events(&mut self) -> Vec<SyncServiceEvent> {
        mem::take(&mut self.events)
    }
}
