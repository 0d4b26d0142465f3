/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Narrow boundary to the local tab model.
//!
//! The sync engine reads tab/group state and issues a small set of mutations
//! through `TabModel`. Notifications travel the other way as `TabModelEvent`
//! values collected from the model's outbox (`take_events`), so the engine never
//! re-enters itself from inside a mutation call.

use time::OffsetDateTime;

use super::{LocalTabGroupId, LocalTabId, NavigationRequestId, TabGroupColor};

/// Point-in-time copy of one live tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSnapshot {
    pub id: LocalTabId,
    pub url: String,
    pub title: String,
    pub group: Option<LocalTabGroupId>,
    /// URLs visited on the way to `url`, oldest first. Includes `url`.
    pub redirect_chain: Vec<String>,
    pub last_accessed: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTabParams {
    pub url: String,
    pub title: String,
    /// Strip index; `None` appends at the end.
    pub index: Option<usize>,
    /// Group to place the new tab in. Joining a group expands it.
    pub group: Option<LocalTabGroupId>,
    pub background: bool,
}

impl CreateTabParams {
    pub fn background(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            index: None,
            group: None,
            background: true,
        }
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn in_group(mut self, group: LocalTabGroupId) -> Self {
        self.group = Some(group);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadUrlParams {
    pub url: String,
    pub title: String,
    /// Set when the sync engine started this navigation.
    pub sync_request: Option<NavigationRequestId>,
    /// Defer the actual load until the tab is next shown.
    pub deferred: bool,
}

/// A tab as it was when an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabRef {
    pub id: LocalTabId,
    pub group: Option<LocalTabGroupId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRemovalReason {
    /// All tabs closed; not a deletion of the saved group.
    Closed,
    /// Tabs were merged into another group.
    Merged,
    /// Tabs were moved out one by one until the group emptied.
    Ungrouped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabModelEvent {
    Initialized,
    DidAddTab {
        tab: TabRef,
        restored: bool,
    },
    WillCloseTab {
        tab: TabRef,
    },
    WillCloseTabs {
        tabs: Vec<TabRef>,
    },
    WillCloseAllTabs {
        tabs: Vec<TabRef>,
    },
    DidCloseTabs {
        tabs: Vec<TabRef>,
    },
    TabClosureUndone {
        tab: TabRef,
    },
    DidSelectTab {
        tab: TabRef,
    },
    DidChangeGroupTitle {
        group: LocalTabGroupId,
    },
    DidChangeGroupColor {
        group: LocalTabGroupId,
    },
    DidMergeTabToGroup {
        tab: TabRef,
    },
    DidMoveTabWithinGroup {
        tab: TabRef,
    },
    DidMoveTabOutOfGroup {
        tab: LocalTabId,
        previous_group: LocalTabGroupId,
    },
    DidCreateNewGroup {
        group: LocalTabGroupId,
    },
    /// `tabs` are the group's live tabs at the moment the closure started.
    WillCloseTabGroup {
        group: LocalTabGroupId,
        tabs: Vec<LocalTabId>,
        hiding: bool,
    },
    DidRemoveTabGroup {
        group: LocalTabGroupId,
        reason: GroupRemovalReason,
    },
    DidFinishNavigation {
        tab: TabRef,
        url: String,
        title: String,
        sync_request: Option<NavigationRequestId>,
    },
}

/// Local tab model as seen by the sync engine.
///
/// Query methods only report live tabs: tabs whose closure is pending (and may
/// still be undone) are not part of any group.
pub trait TabModel {
    /// Whether this model belongs to the window that should auto-open groups
    /// arriving from other devices.
    fn is_active_window(&self) -> bool;

    /// Live tabs in strip order.
    fn tab_ids(&self) -> Vec<LocalTabId>;

    fn tab_count(&self) -> usize {
        self.tab_ids().len()
    }

    fn tab(&self, id: LocalTabId) -> Option<TabSnapshot>;

    fn index_of(&self, id: LocalTabId) -> Option<usize>;

    fn active_tab(&self) -> Option<LocalTabId>;

    /// Groups with at least one live tab, in strip order of their first tab.
    fn group_ids(&self) -> Vec<LocalTabGroupId>;

    fn group_exists(&self, group: LocalTabGroupId) -> bool {
        self.group_ids().contains(&group)
    }

    /// Live tabs of `group` in strip order.
    fn tabs_in_group(&self, group: LocalTabGroupId) -> Vec<LocalTabId>;

    fn group_title(&self, group: LocalTabGroupId) -> Option<String>;

    fn group_color(&self, group: LocalTabGroupId) -> Option<TabGroupColor>;

    fn is_group_collapsed(&self, group: LocalTabGroupId) -> bool;

    fn create_tab(&mut self, params: CreateTabParams) -> LocalTabId;

    /// Turns an ungrouped tab into a new group of one.
    fn create_single_tab_group(&mut self, tab: LocalTabId) -> Option<LocalTabGroupId>;

    /// Moves `tab` to the end of `group`. Expands the group.
    fn merge_tab_into_group(&mut self, tab: LocalTabId, group: LocalTabGroupId);

    fn move_tab(&mut self, tab: LocalTabId, index: usize);

    fn close_tabs_without_undo(&mut self, tabs: &[LocalTabId]);

    fn load_url(&mut self, tab: LocalTabId, params: LoadUrlParams);

    fn set_group_title(&mut self, group: LocalTabGroupId, title: &str);

    fn set_group_color(&mut self, group: LocalTabGroupId, color: TabGroupColor);

    fn set_group_collapsed(&mut self, group: LocalTabGroupId, collapsed: bool);

    /// Drains notifications emitted since the last call.
    fn take_events(&mut self) -> Vec<TabModelEvent>;
}

/// Index of `tab` within `group`, counting live tabs only.
pub(crate) fn position_in_group(
    tab_model: &dyn TabModel,
    group: LocalTabGroupId,
    tab: LocalTabId,
) -> Option<usize> {
    tab_model
        .tabs_in_group(group)
        .iter()
        .position(|candidate| *candidate == tab)
}
