/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Reference `TabModel`: a single window's tab strip held in memory.
//!
//! Besides the trait surface it exposes the user-facing operations a real
//! browser window would perform (open, group, close with undo, select,
//! navigate), each emitting the same notifications a real model would.
//! Navigations complete only when `finish_navigations` is called, and deferred
//! loads start when their tab is selected.

use std::collections::HashMap;
use std::mem;

use time::OffsetDateTime;

use super::tab_model::{
    CreateTabParams, GroupRemovalReason, LoadUrlParams, TabModel, TabModelEvent, TabRef,
    TabSnapshot,
};
use super::{LocalTabGroupId, LocalTabId, NavigationRequestId, TabGroupColor};

#[derive(Debug, Clone)]
struct TabEntry {
    id: LocalTabId,
    url: String,
    title: String,
    group: Option<LocalTabGroupId>,
    redirect_chain: Vec<String>,
    last_accessed: OffsetDateTime,
    deferred_load: Option<LoadUrlParams>,
}

impl TabEntry {
    fn new(id: LocalTabId, url: String, title: String, group: Option<LocalTabGroupId>) -> Self {
        Self {
            id,
            redirect_chain: vec![url.clone()],
            url,
            title,
            group,
            last_accessed: OffsetDateTime::now_utc(),
            deferred_load: None,
        }
    }

    fn tab_ref(&self) -> TabRef {
        TabRef {
            id: self.id,
            group: self.group,
        }
    }

    fn snapshot(&self) -> TabSnapshot {
        TabSnapshot {
            id: self.id,
            url: self.url.clone(),
            title: self.title.clone(),
            group: self.group,
            redirect_chain: self.redirect_chain.clone(),
            last_accessed: self.last_accessed,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GroupEntry {
    title: Option<String>,
    color: Option<TabGroupColor>,
    collapsed: bool,
}

#[derive(Debug, Clone)]
struct ClosingTab {
    entry: TabEntry,
    /// Strip index before the closure started.
    index: usize,
}

#[derive(Debug, Clone)]
struct InFlightNavigation {
    tab: LocalTabId,
    url: String,
    title: String,
    redirect_chain: Vec<String>,
    sync_request: Option<NavigationRequestId>,
}

#[derive(Debug)]
pub struct InMemoryTabModel {
    tabs: Vec<TabEntry>,
    groups: HashMap<LocalTabGroupId, GroupEntry>,
    closing: Vec<ClosingTab>,
    in_flight: Vec<InFlightNavigation>,
    active_tab: Option<LocalTabId>,
    active_window: bool,
    next_tab_id: i32,
    events: Vec<TabModelEvent>,
    mutation_count: u64,
}

impl Default for InMemoryTabModel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTabModel {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            groups: HashMap::new(),
            closing: Vec::new(),
            in_flight: Vec::new(),
            active_tab: None,
            active_window: true,
            next_tab_id: 1,
            events: Vec::new(),
            mutation_count: 0,
        }
    }

    pub fn mark_initialized(&mut self) {
        self.events.push(TabModelEvent::Initialized);
    }

    pub fn set_active_window(&mut self, active: bool) {
        self.active_window = active;
    }

    /// Structural and content mutations applied so far. Selection and event
    /// draining do not count.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    pub fn pending_closure_count(&self) -> usize {
        self.closing.len()
    }

    pub fn is_closing(&self, tab: LocalTabId) -> bool {
        self.closing.iter().any(|closing| closing.entry.id == tab)
    }

    pub fn in_flight_navigation_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn set_last_accessed(&mut self, tab: LocalTabId, at: OffsetDateTime) {
        if let Some(entry) = self.entry_mut(tab) {
            entry.last_accessed = at;
        }
    }

    /// Opens an ungrouped background tab at the end of the strip.
    pub fn open_tab(&mut self, url: &str, title: &str) -> LocalTabId {
        self.create_tab(CreateTabParams::background(url, title))
    }

    /// Opens a tab at the end of an existing group.
    pub fn add_tab_to_group(
        &mut self,
        group: LocalTabGroupId,
        url: &str,
        title: &str,
    ) -> Option<LocalTabId> {
        let index = self.group_end(group)?;
        Some(self.create_tab(
            CreateTabParams::background(url, title)
                .at_index(index)
                .in_group(group),
        ))
    }

    /// Groups `tabs` the way a user would: the first tab founds the group,
    /// visuals are applied, the rest are merged in.
    pub fn create_group(
        &mut self,
        tabs: &[LocalTabId],
        title: &str,
        color: TabGroupColor,
    ) -> Option<LocalTabGroupId> {
        let (first, rest) = tabs.split_first()?;
        let group = self.create_single_tab_group(*first)?;
        self.set_group_title(group, title);
        self.set_group_color(group, color);
        for tab in rest {
            self.merge_tab_into_group(*tab, group);
        }
        Some(group)
    }

    /// Moves `tab` out of its group, placing it right after the group.
    pub fn remove_tab_from_group(&mut self, tab: LocalTabId) {
        let Some(position) = self.position(tab) else {
            return;
        };
        let Some(group) = self.tabs[position].group else {
            return;
        };
        let Some(end) = self.group_end(group) else {
            return;
        };
        let mut entry = self.tabs.remove(position);
        entry.group = None;
        self.tabs.insert(end - 1, entry);
        self.mutation_count += 1;
        self.events.push(TabModelEvent::DidMoveTabOutOfGroup {
            tab,
            previous_group: group,
        });
        if !self.has_live_tabs(group) {
            self.forget_group_if_unused(group);
            self.events.push(TabModelEvent::DidRemoveTabGroup {
                group,
                reason: GroupRemovalReason::Ungrouped,
            });
        }
    }

    pub fn ungroup(&mut self, group: LocalTabGroupId) {
        // Back to front keeps the former group order in the strip.
        for tab in self.tabs_in_group(group).into_iter().rev() {
            self.remove_tab_from_group(tab);
        }
    }

    pub fn merge_groups(&mut self, source: LocalTabGroupId, target: LocalTabGroupId) {
        if source == target {
            return;
        }
        for tab in self.tabs_in_group(source) {
            self.merge_tab_into_group(tab, target);
        }
    }

    /// Closes `tabs`. With `allow_undo` the closure stays pending until
    /// `commit_closures` or `undo_closure`.
    pub fn close_tabs(&mut self, tabs: &[LocalTabId], allow_undo: bool) {
        let closing = self.live_subset(tabs);
        if closing.is_empty() {
            return;
        }
        for group in self.groups_emptied_by(&closing) {
            let tabs = self.tabs_in_group(group);
            self.events.push(TabModelEvent::WillCloseTabGroup {
                group,
                tabs,
                hiding: false,
            });
        }
        let refs = self.move_to_closing(&closing);
        self.push_will_close(refs);
        if !allow_undo {
            self.commit(&closing);
        }
    }

    /// Closing the whole window hides its groups rather than deleting them.
    pub fn close_all_tabs(&mut self, allow_undo: bool) {
        let closing = self.tab_ids();
        if closing.is_empty() {
            return;
        }
        for group in self.group_ids() {
            let tabs = self.tabs_in_group(group);
            self.events.push(TabModelEvent::WillCloseTabGroup {
                group,
                tabs,
                hiding: true,
            });
        }
        let refs = self.move_to_closing(&closing);
        self.events
            .push(TabModelEvent::WillCloseAllTabs { tabs: refs });
        if !allow_undo {
            self.commit(&closing);
        }
    }

    pub fn close_group(&mut self, group: LocalTabGroupId, hiding: bool, allow_undo: bool) {
        let closing = self.tabs_in_group(group);
        self.events.push(TabModelEvent::WillCloseTabGroup {
            group,
            tabs: closing.clone(),
            hiding,
        });
        if closing.is_empty() {
            return;
        }
        let refs = self.move_to_closing(&closing);
        self.push_will_close(refs);
        if !allow_undo {
            self.commit(&closing);
        }
    }

    /// Finalizes every pending closure.
    pub fn commit_closures(&mut self) {
        let pending: Vec<LocalTabId> = self.closing.iter().map(|closing| closing.entry.id).collect();
        self.commit(&pending);
    }

    /// Restores a tab whose closure is still pending. Returns false if the tab
    /// is not pending closure.
    pub fn undo_closure(&mut self, tab: LocalTabId) -> bool {
        let Some(slot) = self.closing.iter().position(|closing| closing.entry.id == tab) else {
            return false;
        };
        let ClosingTab { entry, index } = self.closing.remove(slot);
        let still_closing_before = self
            .closing
            .iter()
            .filter(|closing| closing.index < index)
            .count();
        let target = index
            .saturating_sub(still_closing_before)
            .min(self.tabs.len());
        let tab_ref = entry.tab_ref();
        self.tabs.insert(target, entry);
        self.mutation_count += 1;
        self.events.push(TabModelEvent::TabClosureUndone { tab: tab_ref });
        true
    }

    pub fn undo_all_closures(&mut self) {
        let mut pending: Vec<(usize, LocalTabId)> = self
            .closing
            .iter()
            .map(|closing| (closing.index, closing.entry.id))
            .collect();
        pending.sort();
        for (_, tab) in pending {
            self.undo_closure(tab);
        }
    }

    /// Makes `tab` the active tab, starting its deferred load if any.
    pub fn select_tab(&mut self, tab: LocalTabId) {
        let Some(entry) = self.entry_mut(tab) else {
            return;
        };
        entry.last_accessed = OffsetDateTime::now_utc();
        let deferred = entry.deferred_load.take();
        let tab_ref = entry.tab_ref();
        if let Some(load) = deferred {
            self.in_flight.push(InFlightNavigation {
                tab,
                redirect_chain: vec![load.url.clone()],
                url: load.url,
                title: load.title,
                sync_request: load.sync_request,
            });
        }
        self.active_tab = Some(tab);
        self.events.push(TabModelEvent::DidSelectTab { tab: tab_ref });
    }

    /// Starts a user navigation.
    pub fn navigate(&mut self, tab: LocalTabId, url: &str, title: &str) {
        self.navigate_through_redirects(tab, &[url], title);
    }

    /// Starts a user navigation that lands on the last entry of `chain`.
    pub fn navigate_through_redirects(&mut self, tab: LocalTabId, chain: &[&str], title: &str) {
        let Some(last) = chain.last() else {
            return;
        };
        if self.position(tab).is_none() {
            return;
        }
        self.in_flight.push(InFlightNavigation {
            tab,
            url: (*last).to_string(),
            title: title.to_string(),
            redirect_chain: chain.iter().map(|url| (*url).to_string()).collect(),
            sync_request: None,
        });
    }

    /// Completes every in-flight navigation in start order.
    pub fn finish_navigations(&mut self) {
        for navigation in mem::take(&mut self.in_flight) {
            let Some(entry) = self.entry_mut(navigation.tab) else {
                continue;
            };
            entry.url = navigation.url.clone();
            entry.title = navigation.title.clone();
            entry.redirect_chain = navigation.redirect_chain;
            let tab_ref = entry.tab_ref();
            self.mutation_count += 1;
            self.events.push(TabModelEvent::DidFinishNavigation {
                tab: tab_ref,
                url: navigation.url,
                title: navigation.title,
                sync_request: navigation.sync_request,
            });
        }
    }

    fn position(&self, tab: LocalTabId) -> Option<usize> {
        self.tabs.iter().position(|entry| entry.id == tab)
    }

    fn entry_mut(&mut self, tab: LocalTabId) -> Option<&mut TabEntry> {
        self.tabs.iter_mut().find(|entry| entry.id == tab)
    }

    fn has_live_tabs(&self, group: LocalTabGroupId) -> bool {
        self.tabs.iter().any(|entry| entry.group == Some(group))
    }

    fn group_start(&self, group: LocalTabGroupId) -> Option<usize> {
        self.tabs.iter().position(|entry| entry.group == Some(group))
    }

    /// One past the last live tab of `group`.
    fn group_end(&self, group: LocalTabGroupId) -> Option<usize> {
        self.tabs
            .iter()
            .rposition(|entry| entry.group == Some(group))
            .map(|last| last + 1)
    }

    fn forget_group_if_unused(&mut self, group: LocalTabGroupId) {
        let pending = self
            .closing
            .iter()
            .any(|closing| closing.entry.group == Some(group));
        if !pending && !self.has_live_tabs(group) {
            self.groups.remove(&group);
        }
    }

    fn live_subset(&self, tabs: &[LocalTabId]) -> Vec<LocalTabId> {
        self.tabs
            .iter()
            .filter(|entry| tabs.contains(&entry.id))
            .map(|entry| entry.id)
            .collect()
    }

    fn groups_emptied_by(&self, closing: &[LocalTabId]) -> Vec<LocalTabGroupId> {
        let mut emptied = Vec::new();
        for group in self.group_ids() {
            let all_closing = self
                .tabs
                .iter()
                .filter(|entry| entry.group == Some(group))
                .all(|entry| closing.contains(&entry.id));
            if all_closing {
                emptied.push(group);
            }
        }
        emptied
    }

    /// Moves live tabs into the pending-closure list, remembering their
    /// original strip indices. Returns refs in strip order.
    fn move_to_closing(&mut self, tabs: &[LocalTabId]) -> Vec<TabRef> {
        let mut indices: Vec<usize> = tabs.iter().filter_map(|tab| self.position(*tab)).collect();
        indices.sort_unstable();
        let refs: Vec<TabRef> = indices.iter().map(|index| self.tabs[*index].tab_ref()).collect();
        for index in indices.into_iter().rev() {
            let entry = self.tabs.remove(index);
            if self.active_tab == Some(entry.id) {
                self.active_tab = None;
            }
            self.closing.push(ClosingTab { entry, index });
        }
        self.mutation_count += 1;
        refs
    }

    fn push_will_close(&mut self, refs: Vec<TabRef>) {
        let event = match refs.as_slice() {
            [single] => TabModelEvent::WillCloseTab { tab: *single },
            _ => TabModelEvent::WillCloseTabs { tabs: refs },
        };
        self.events.push(event);
    }

    fn commit(&mut self, tabs: &[LocalTabId]) {
        let (committed, kept): (Vec<ClosingTab>, Vec<ClosingTab>) = mem::take(&mut self.closing)
            .into_iter()
            .partition(|closing| tabs.contains(&closing.entry.id));
        self.closing = kept;
        if committed.is_empty() {
            return;
        }
        self.in_flight
            .retain(|navigation| !tabs.contains(&navigation.tab));
        let refs: Vec<TabRef> = committed.iter().map(|closing| closing.entry.tab_ref()).collect();
        for group in refs.iter().filter_map(|tab| tab.group) {
            self.forget_group_if_unused(group);
        }
        self.events.push(TabModelEvent::DidCloseTabs { tabs: refs });
    }
}

impl TabModel for InMemoryTabModel {
    fn is_active_window(&self) -> bool {
        self.active_window
    }

    fn tab_ids(&self) -> Vec<LocalTabId> {
        self.tabs.iter().map(|entry| entry.id).collect()
    }

    fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    fn tab(&self, id: LocalTabId) -> Option<TabSnapshot> {
        self.tabs
            .iter()
            .find(|entry| entry.id == id)
            .map(TabEntry::snapshot)
    }

    fn index_of(&self, id: LocalTabId) -> Option<usize> {
        self.position(id)
    }

    fn active_tab(&self) -> Option<LocalTabId> {
        self.active_tab
    }

    fn group_ids(&self) -> Vec<LocalTabGroupId> {
        let mut groups = Vec::new();
        for group in self.tabs.iter().filter_map(|entry| entry.group) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }

    fn group_exists(&self, group: LocalTabGroupId) -> bool {
        self.has_live_tabs(group)
    }

    fn tabs_in_group(&self, group: LocalTabGroupId) -> Vec<LocalTabId> {
        self.tabs
            .iter()
            .filter(|entry| entry.group == Some(group))
            .map(|entry| entry.id)
            .collect()
    }

    fn group_title(&self, group: LocalTabGroupId) -> Option<String> {
        self.groups.get(&group).and_then(|entry| entry.title.clone())
    }

    fn group_color(&self, group: LocalTabGroupId) -> Option<TabGroupColor> {
        self.groups.get(&group).and_then(|entry| entry.color)
    }

    fn is_group_collapsed(&self, group: LocalTabGroupId) -> bool {
        self.groups
            .get(&group)
            .map(|entry| entry.collapsed)
            .unwrap_or(false)
    }

    fn create_tab(&mut self, params: CreateTabParams) -> LocalTabId {
        let id = LocalTabId(self.next_tab_id);
        self.next_tab_id += 1;

        let len = self.tabs.len();
        let mut index = params.index.unwrap_or(len).min(len);
        if let Some(group) = params.group {
            if let (Some(start), Some(end)) = (self.group_start(group), self.group_end(group)) {
                index = index.clamp(start, end);
            }
            self.groups.entry(group).or_default().collapsed = false;
        }

        let entry = TabEntry::new(id, params.url, params.title, params.group);
        let tab_ref = entry.tab_ref();
        self.tabs.insert(index, entry);
        if !params.background {
            self.active_tab = Some(id);
        }
        self.mutation_count += 1;
        self.events.push(TabModelEvent::DidAddTab {
            tab: tab_ref,
            restored: false,
        });
        id
    }

    fn create_single_tab_group(&mut self, tab: LocalTabId) -> Option<LocalTabGroupId> {
        let entry = self.entry_mut(tab)?;
        if entry.group.is_some() {
            return None;
        }
        let group = LocalTabGroupId::new();
        entry.group = Some(group);
        self.groups.insert(group, GroupEntry::default());
        self.mutation_count += 1;
        self.events.push(TabModelEvent::DidCreateNewGroup { group });
        Some(group)
    }

    fn merge_tab_into_group(&mut self, tab: LocalTabId, group: LocalTabGroupId) {
        let Some(position) = self.position(tab) else {
            return;
        };
        if !self.has_live_tabs(group) {
            log::debug!("merge of {tab} into unknown group {group} ignored");
            return;
        }
        let previous = self.tabs[position].group;
        if previous == Some(group) {
            return;
        }

        let mut entry = self.tabs.remove(position);
        entry.group = Some(group);
        let insert_at = self.group_end(group).unwrap_or(self.tabs.len());
        self.tabs.insert(insert_at, entry);
        self.groups.entry(group).or_default().collapsed = false;
        self.mutation_count += 1;

        if let Some(previous) = previous {
            self.events.push(TabModelEvent::DidMoveTabOutOfGroup {
                tab,
                previous_group: previous,
            });
        }
        self.events.push(TabModelEvent::DidMergeTabToGroup {
            tab: TabRef {
                id: tab,
                group: Some(group),
            },
        });
        if let Some(previous) = previous
            && !self.has_live_tabs(previous)
        {
            self.forget_group_if_unused(previous);
            self.events.push(TabModelEvent::DidRemoveTabGroup {
                group: previous,
                reason: GroupRemovalReason::Merged,
            });
        }
    }

    fn move_tab(&mut self, tab: LocalTabId, index: usize) {
        let Some(from) = self.position(tab) else {
            return;
        };
        let target = index.min(self.tabs.len() - 1);
        if from == target {
            return;
        }
        let entry = self.tabs.remove(from);
        let tab_ref = entry.tab_ref();
        self.tabs.insert(target, entry);
        self.mutation_count += 1;
        if tab_ref.group.is_some() {
            self.events
                .push(TabModelEvent::DidMoveTabWithinGroup { tab: tab_ref });
        }
    }

    fn close_tabs_without_undo(&mut self, tabs: &[LocalTabId]) {
        self.close_tabs(tabs, false);
    }

    fn load_url(&mut self, tab: LocalTabId, params: LoadUrlParams) {
        let Some(entry) = self.entry_mut(tab) else {
            return;
        };
        if params.deferred {
            // A frozen tab reports its pending URL right away.
            entry.url = params.url.clone();
            entry.title = params.title.clone();
            entry.redirect_chain = vec![params.url.clone()];
            entry.deferred_load = Some(params);
        } else {
            self.in_flight.push(InFlightNavigation {
                tab,
                redirect_chain: vec![params.url.clone()],
                url: params.url,
                title: params.title,
                sync_request: params.sync_request,
            });
        }
        self.mutation_count += 1;
    }

    fn set_group_title(&mut self, group: LocalTabGroupId, title: &str) {
        let entry = self.groups.entry(group).or_default();
        if entry.title.as_deref() == Some(title) {
            return;
        }
        entry.title = Some(title.to_string());
        self.mutation_count += 1;
        self.events
            .push(TabModelEvent::DidChangeGroupTitle { group });
    }

    fn set_group_color(&mut self, group: LocalTabGroupId, color: TabGroupColor) {
        let entry = self.groups.entry(group).or_default();
        if entry.color == Some(color) {
            return;
        }
        entry.color = Some(color);
        self.mutation_count += 1;
        self.events
            .push(TabModelEvent::DidChangeGroupColor { group });
    }

    fn set_group_collapsed(&mut self, group: LocalTabGroupId, collapsed: bool) {
        let entry = self.groups.entry(group).or_default();
        if entry.collapsed == collapsed {
            return;
        }
        entry.collapsed = collapsed;
        self.mutation_count += 1;
    }

    fn take_events(&mut self) -> Vec<TabModelEvent> {
        mem::take(&mut self.events)
    }
}
