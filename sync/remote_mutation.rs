/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Applies local tab model changes onto the remote store.
//!
//! Group closures are the stateful part. Closing a group starts a pending
//! closure that tracks the group's tabs; each tab later resolves exactly once,
//! either committed (`DidCloseTabs`) or restored (`TabClosureUndone`). Only when
//! every tracked tab has resolved is the outcome for the saved group decided.

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{self, CHANNEL_PENDING_CLOSURE_RESOLVED};
use crate::model::tab_model::{TabRef, position_in_group};
use crate::model::{ClosingSource, LocalTabGroupId, LocalTabId, SavedTabGroup, SyncId, TabGroupColor};
use crate::sync::SyncContext;
use crate::sync::identifier_bridge::url_and_title_for_sync;
use crate::sync::task_queue::DeferredTask;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingGroupClosure {
    is_hiding: bool,
    tracked: HashSet<LocalTabId>,
    resolved: HashSet<LocalTabId>,
    restored: HashSet<LocalTabId>,
}

impl PendingGroupClosure {
    fn new(tabs: &[LocalTabId], is_hiding: bool) -> Self {
        Self {
            is_hiding,
            tracked: tabs.iter().copied().collect(),
            resolved: HashSet::new(),
            restored: HashSet::new(),
        }
    }

    pub(crate) fn is_hiding(&self) -> bool {
        self.is_hiding
    }

    fn tracks(&self, tab: LocalTabId) -> bool {
        self.tracked.contains(&tab)
    }

    /// False when `tab` had already resolved.
    fn resolve(&mut self, tab: LocalTabId, undone: bool) -> bool {
        if !self.resolved.insert(tab) {
            return false;
        }
        if undone {
            self.restored.insert(tab);
        }
        true
    }

    fn is_fully_resolved(&self) -> bool {
        self.resolved.len() == self.tracked.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct RemoteTabGroupMutationHelper {
    pending_closures: HashMap<LocalTabGroupId, PendingGroupClosure>,
}

impl RemoteTabGroupMutationHelper {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pending_closure(&self, group: LocalTabGroupId) -> Option<&PendingGroupClosure> {
        self.pending_closures.get(&group)
    }

    pub(crate) fn pending_closure_count(&self) -> usize {
        self.pending_closures.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending_closures.clear();
    }

    /// Saves the current state of a local group. Returns the new sync id.
    pub(crate) fn create_remote_tab_group(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
    ) -> Option<SyncId> {
        let title = ctx.tab_model.group_title(local_id).unwrap_or_default();
        let color = ctx.tab_model.group_color(local_id).unwrap_or_default();
        let mut group = SavedTabGroup::new(title, color);
        group.local_group_id = Some(local_id);
        for tab in ctx.tab_model.tabs_in_group(local_id) {
            let Some(snapshot) = ctx.tab_model.tab(tab) else {
                continue;
            };
            let (url, title) = url_and_title_for_sync(&snapshot.url, &snapshot.title);
            group.push_tab(url, title);
            if let Some(saved_tab) = group.saved_tabs.last_mut() {
                saved_tab.local_tab_id = Some(tab);
            }
        }
        if group.saved_tabs.is_empty() {
            diagnostics::emit_skipped("local group has no live tabs");
            return None;
        }
        let sync_id = group.sync_id;
        log::debug!("saving {local_id} as {sync_id}");
        ctx.sync_service.add_group(group);
        Some(sync_id)
    }

    pub(crate) fn update_visual_data(&self, ctx: &mut SyncContext<'_>, local_id: LocalTabGroupId) {
        let title = ctx.tab_model.group_title(local_id).unwrap_or_default();
        let color: TabGroupColor = ctx.tab_model.group_color(local_id).unwrap_or_default();
        ctx.sync_service.update_visual_data(local_id, &title, color);
    }

    pub(crate) fn add_tab(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
        tab: LocalTabId,
        position: usize,
    ) {
        let Some(snapshot) = ctx.tab_model.tab(tab) else {
            return;
        };
        let (url, title) = url_and_title_for_sync(&snapshot.url, &snapshot.title);
        ctx.sync_service
            .add_tab(local_id, tab, &title, &url, Some(position));
    }

    pub(crate) fn move_tab(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
        tab: LocalTabId,
        position: usize,
    ) {
        ctx.sync_service.move_tab(local_id, tab, position);
    }

    pub(crate) fn remove_tab(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
        tab: LocalTabId,
    ) {
        ctx.sync_service.remove_tab(local_id, tab);
    }

    pub(crate) fn update_tab(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
        tab: LocalTabId,
        url: &str,
        title: &str,
        position: usize,
    ) {
        let (url, title) = url_and_title_for_sync(url, title);
        ctx.sync_service
            .update_tab(local_id, tab, &title, &url, position);
    }

    pub(crate) fn remove_group(&self, ctx: &mut SyncContext<'_>, local_id: LocalTabGroupId) {
        ctx.sync_service.remove_group(local_id);
    }

    /// Maps saved tabs to local tabs by position. Counts must already agree
    /// unless the saved group is empty.
    pub(crate) fn update_tab_id_mappings_on_startup(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
    ) {
        let Some(group) = ctx.sync_service.get_group_by_local_id(local_id) else {
            return;
        };
        // Reconcile leaves these alone too.
        if group.saved_tabs.is_empty() {
            log::debug!("{local_id} has no saved tabs; keeping its local tabs unmapped");
            return;
        }
        let local_tabs = ctx.tab_model.tabs_in_group(local_id);
        if local_tabs.len() != group.saved_tabs.len() {
            log::error!(
                "{local_id} has {} local tabs but {} saved tabs after reconcile",
                local_tabs.len(),
                group.saved_tabs.len()
            );
            debug_assert!(false, "tab counts differ after startup reconcile");
            return;
        }
        for (saved_tab, tab) in group.saved_tabs.iter().zip(local_tabs) {
            ctx.sync_service
                .update_local_tab_id(local_id, saved_tab.sync_id, tab);
        }
    }

    /// A whole group is about to close. Hiding keeps the saved group; deleting
    /// removes it right away.
    pub(crate) fn handle_will_close_tab_group(
        &mut self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
        tabs: &[LocalTabId],
        is_hiding: bool,
    ) {
        if tabs.is_empty() {
            log::debug!("{local_id} closes with no live tabs; nothing to track");
        } else {
            self.pending_closures
                .insert(local_id, PendingGroupClosure::new(tabs, is_hiding));
        }
        if is_hiding {
            return;
        }
        let Some(group) = ctx.sync_service.get_group_by_local_id(local_id) else {
            return;
        };
        ctx.sync_service
            .remove_local_tab_group_mapping(local_id, ClosingSource::DeletedByUser);
        ctx.sync_service.remove_group_by_sync_id(group.sync_id);
    }

    pub(crate) fn handle_will_close_tabs(&self, ctx: &mut SyncContext<'_>, tabs: &[TabRef]) {
        for tab in tabs {
            let Some(group) = tab.group else {
                continue;
            };
            let hiding = self
                .pending_closures
                .get(&group)
                .is_some_and(PendingGroupClosure::is_hiding);
            if hiding && !ctx.tab_model.group_exists(group) {
                continue;
            }
            ctx.sync_service.remove_tab(group, tab.id);
        }
    }

    pub(crate) fn handle_did_close_tabs(&mut self, ctx: &mut SyncContext<'_>, tabs: &[TabRef]) {
        for tab in tabs {
            self.resolve_closure(ctx, *tab, false);
        }
    }

    /// Returns whether the tab belonged to a pending group closure.
    pub(crate) fn handle_tab_closure_undone(&mut self, ctx: &mut SyncContext<'_>, tab: TabRef) -> bool {
        self.resolve_closure(ctx, tab, true)
    }

    fn resolve_closure(&mut self, ctx: &mut SyncContext<'_>, tab: TabRef, undone: bool) -> bool {
        let Some(group) = tab.group else {
            return false;
        };
        let Some(closure) = self.pending_closures.get_mut(&group) else {
            return false;
        };
        if !closure.tracks(tab.id) {
            return false;
        }
        if !closure.resolve(tab.id, undone) {
            log::debug!("{} already resolved for {group}", tab.id);
            return true;
        }
        if closure.is_fully_resolved()
            && let Some(closure) = self.pending_closures.remove(&group)
        {
            self.finish_closure(ctx, group, closure);
        }
        true
    }

    fn finish_closure(
        &self,
        ctx: &mut SyncContext<'_>,
        local_id: LocalTabGroupId,
        closure: PendingGroupClosure,
    ) {
        let any_restored = !closure.restored.is_empty();
        log::debug!(
            "closure of {local_id} resolved (hiding: {}, restored: {})",
            closure.is_hiding,
            closure.restored.len()
        );
        diagnostics::emit_usage(CHANNEL_PENDING_CLOSURE_RESOLVED);

        match (closure.is_hiding, any_restored) {
            (true, true) => match ctx.sync_service.get_group_by_local_id(local_id) {
                Some(group) => ctx.deferred_tasks.post(DeferredTask::ReconcileRestoredGroup {
                    local_group_id: local_id,
                    sync_id: group.sync_id,
                }),
                None => diagnostics::emit_skipped("restored group was deleted remotely"),
            },
            (false, true) => {
                if ctx.tab_model.group_exists(local_id) {
                    self.create_remote_tab_group(ctx, local_id);
                }
            }
            (true, false) => {
                ctx.sync_service
                    .remove_local_tab_group_mapping(local_id, ClosingSource::ClosedByUser);
            }
            (false, false) => {}
        }
    }
}

/// In-group position of a live tab, or the end of the group.
pub(crate) fn current_position(
    ctx: &SyncContext<'_>,
    local_id: LocalTabGroupId,
    tab: LocalTabId,
) -> usize {
    position_in_group(&*ctx.tab_model, local_id, tab)
        .unwrap_or_else(|| ctx.tab_model.tabs_in_group(local_id).len())
}
