/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Identity and record types shared by both sides of tab group sync.
//!
//! Two identifier spaces meet here:
//! - Local ids (`LocalTabId`, `LocalTabGroupId`) are handed out by the tab model
//!   and only mean something inside the current process and window.
//! - Sync ids (`SyncId`) are stable across devices and restarts.
//!
//! `SavedTabGroup` / `SavedTabGroupTab` are the remote-resident records. They
//! carry the optional local ids while mapped to an open local group.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub mod in_memory_tab_model;
pub mod tab_model;

/// Process-local tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalTabId(pub i32);

impl fmt::Display for LocalTabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

/// Opaque token identifying a tab group inside one window's tab model.
///
/// Stable for the lifetime of the window; not stable across restarts, which is
/// why startup reconciliation rebuilds the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalTabGroupId(Uuid);

impl LocalTabGroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(token: Uuid) -> Self {
        Self(token)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LocalTabGroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalTabGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-group:{}", self.0)
    }
}

/// Globally stable identifier for a saved group or saved tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncId(Uuid);

impl SyncId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for SyncId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync:{}", self.0)
    }
}

/// Request id attached to navigations the sync engine starts itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationRequestId(pub(crate) u64);

impl NavigationRequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabGroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

/// Whether a remote store notification was caused by this device or another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpeningSource {
    #[default]
    Unknown,
    AutoOpenedFromSync,
    OpenedFromRevisitUi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClosingSource {
    #[default]
    Unknown,
    ClosedByUser,
    DeletedByUser,
    DeletedFromSync,
    CleanedUpOnStartup,
}

/// Group-level usage events reported to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabGroupEvent {
    GroupOpened,
    GroupClosed,
    TabSelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub event: TabGroupEvent,
    pub local_group_id: Option<LocalTabGroupId>,
    pub local_tab_id: Option<LocalTabId>,
    pub opening_source: Option<OpeningSource>,
    pub closing_source: Option<ClosingSource>,
}

impl EventDetails {
    pub fn new(event: TabGroupEvent) -> Self {
        Self {
            event,
            local_group_id: None,
            local_tab_id: None,
            opening_source: None,
            closing_source: None,
        }
    }
}

/// Remote-resident tab record, child of a `SavedTabGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTabGroupTab {
    pub sync_id: SyncId,
    pub group_sync_id: SyncId,
    /// Present only while this tab is mapped to an open local tab.
    pub local_tab_id: Option<LocalTabId>,
    pub title: String,
    pub url: String,
    /// 0-based, contiguous and unique within the owning group.
    pub position: usize,
    pub creator_device_id: Option<String>,
    pub last_updater_device_id: Option<String>,
}

impl SavedTabGroupTab {
    pub fn new(
        group_sync_id: SyncId,
        url: impl Into<String>,
        title: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            sync_id: SyncId::new(),
            group_sync_id,
            local_tab_id: None,
            title: title.into(),
            url: url.into(),
            position,
            creator_device_id: None,
            last_updater_device_id: None,
        }
    }

    pub fn with_local_tab_id(mut self, local_tab_id: LocalTabId) -> Self {
        self.local_tab_id = Some(local_tab_id);
        self
    }
}

/// Remote-resident group record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTabGroup {
    pub sync_id: SyncId,
    /// Present only while a matching local group is open in this window.
    pub local_group_id: Option<LocalTabGroupId>,
    pub title: String,
    pub color: TabGroupColor,
    pub saved_tabs: Vec<SavedTabGroupTab>,
    pub creator_device_id: Option<String>,
    pub last_updater_device_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub creation_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub update_time: OffsetDateTime,
}

impl SavedTabGroup {
    pub fn new(title: impl Into<String>, color: TabGroupColor) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            sync_id: SyncId::new(),
            local_group_id: None,
            title: title.into(),
            color,
            saved_tabs: Vec::new(),
            creator_device_id: None,
            last_updater_device_id: None,
            creation_time: now,
            update_time: now,
        }
    }

    /// Appends a tab at the end of the group, keeping positions contiguous.
    pub fn push_tab(&mut self, url: impl Into<String>, title: impl Into<String>) -> SyncId {
        let tab = SavedTabGroupTab::new(self.sync_id, url, title, self.saved_tabs.len());
        let sync_id = tab.sync_id;
        self.saved_tabs.push(tab);
        sync_id
    }

    pub fn tab_by_local_id(&self, local_tab_id: LocalTabId) -> Option<&SavedTabGroupTab> {
        self.saved_tabs
            .iter()
            .find(|tab| tab.local_tab_id == Some(local_tab_id))
    }

    pub fn tab_by_sync_id(&self, sync_id: SyncId) -> Option<&SavedTabGroupTab> {
        self.saved_tabs.iter().find(|tab| tab.sync_id == sync_id)
    }

    pub fn contains_local_tab(&self, local_tab_id: LocalTabId) -> bool {
        self.tab_by_local_id(local_tab_id).is_some()
    }

    /// Rewrites positions to match vector order.
    pub fn normalize_positions(&mut self) {
        for (position, tab) in self.saved_tabs.iter_mut().enumerate() {
            tab.position = position;
        }
    }

    /// Drops every local id this record carries.
    pub fn clear_local_ids(&mut self) {
        self.local_group_id = None;
        for tab in &mut self.saved_tabs {
            tab.local_tab_id = None;
        }
    }
}
