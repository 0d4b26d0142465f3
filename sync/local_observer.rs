/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Turns tab model notifications into remote store mutations.

use crate::diagnostics::{self, CHANNEL_NAVIGATION_SWALLOWED, DiagnosticEvent, SelectionOrigin};
use crate::model::tab_model::{GroupRemovalReason, TabModelEvent, TabRef};
use crate::model::{EventDetails, LocalTabGroupId, LocalTabId, TabGroupEvent};
use crate::sync::SyncContext;
use crate::sync::observation_gate::ObservationGate;
use crate::sync::remote_mutation::{RemoteTabGroupMutationHelper, current_position};

pub(crate) struct TabGroupSyncLocalObserver {
    gate: ObservationGate,
}

impl TabGroupSyncLocalObserver {
    pub(crate) fn new(gate: ObservationGate) -> Self {
        Self { gate }
    }

    pub(crate) fn on_event(
        &self,
        event: TabModelEvent,
        ctx: &mut SyncContext<'_>,
        remote: &mut RemoteTabGroupMutationHelper,
    ) {
        // Consume the tracker entry even while suspended so it cannot leak.
        if let TabModelEvent::DidFinishNavigation { sync_request, .. } = &event
            && ctx.navigation_tracker.was_navigation_from_sync(*sync_request)
        {
            diagnostics::emit_usage(CHANNEL_NAVIGATION_SWALLOWED);
            return;
        }
        if !self.gate.is_open() {
            log::trace!("{} observation suspended; dropping {event:?}", self.gate.name());
            return;
        }

        match event {
            TabModelEvent::Initialized => {}
            TabModelEvent::DidAddTab { tab, restored } => {
                if !restored {
                    self.did_add_tab(ctx, remote, tab);
                }
            }
            TabModelEvent::WillCloseTab { tab } => remote.handle_will_close_tabs(ctx, &[tab]),
            TabModelEvent::WillCloseTabs { tabs } | TabModelEvent::WillCloseAllTabs { tabs } => {
                remote.handle_will_close_tabs(ctx, &tabs)
            }
            TabModelEvent::DidCloseTabs { tabs } => remote.handle_did_close_tabs(ctx, &tabs),
            TabModelEvent::TabClosureUndone { tab } => self.tab_closure_undone(ctx, remote, tab),
            TabModelEvent::DidSelectTab { tab } => self.did_select_tab(ctx, tab),
            TabModelEvent::DidChangeGroupTitle { group }
            | TabModelEvent::DidChangeGroupColor { group } => {
                if !ctx.tab_model.group_exists(group) {
                    diagnostics::emit_skipped("visuals changed for a group that is gone");
                    return;
                }
                remote.update_visual_data(ctx, group);
            }
            TabModelEvent::DidMergeTabToGroup { tab } => {
                let Some(group) = tab.group else {
                    return;
                };
                if ctx.sync_service.get_group_by_local_id(group).is_some() {
                    let position = current_position(ctx, group, tab.id);
                    remote.add_tab(ctx, group, tab.id, position);
                } else {
                    remote.create_remote_tab_group(ctx, group);
                }
            }
            TabModelEvent::DidMoveTabWithinGroup { tab } => {
                let Some(group) = tab.group else {
                    return;
                };
                let position = current_position(ctx, group, tab.id);
                remote.move_tab(ctx, group, tab.id, position);
            }
            TabModelEvent::DidMoveTabOutOfGroup {
                tab,
                previous_group,
            } => remote.remove_tab(ctx, previous_group, tab),
            TabModelEvent::DidCreateNewGroup { group } => {
                if ctx.sync_service.get_group_by_local_id(group).is_none() {
                    remote.create_remote_tab_group(ctx, group);
                }
            }
            TabModelEvent::WillCloseTabGroup {
                group,
                tabs,
                hiding,
            } => remote.handle_will_close_tab_group(ctx, group, &tabs, hiding),
            TabModelEvent::DidRemoveTabGroup { group, reason } => match reason {
                GroupRemovalReason::Merged | GroupRemovalReason::Ungrouped => {
                    remote.remove_group(ctx, group)
                }
                GroupRemovalReason::Closed => {}
            },
            TabModelEvent::DidFinishNavigation {
                tab, url, title, ..
            } => self.did_finish_navigation(ctx, remote, tab, &url, &title),
        }
    }

    fn did_add_tab(
        &self,
        ctx: &mut SyncContext<'_>,
        remote: &RemoteTabGroupMutationHelper,
        tab: TabRef,
    ) {
        let Some(group) = tab.group else {
            return;
        };
        if ctx.sync_service.get_group_by_local_id(group).is_none() {
            return;
        }
        let position = current_position(ctx, group, tab.id);
        remote.add_tab(ctx, group, tab.id, position);
    }

    fn tab_closure_undone(
        &self,
        ctx: &mut SyncContext<'_>,
        remote: &mut RemoteTabGroupMutationHelper,
        tab: TabRef,
    ) {
        if remote.handle_tab_closure_undone(ctx, tab) {
            return;
        }
        let Some(group) = tab.group else {
            return;
        };
        if ctx.sync_service.get_group_by_local_id(group).is_none() {
            diagnostics::emit_skipped("restored tab's group is not saved");
            return;
        }
        let position = current_position(ctx, group, tab.id);
        remote.add_tab(ctx, group, tab.id, position);
    }

    fn did_select_tab(&self, ctx: &mut SyncContext<'_>, tab: TabRef) {
        ctx.sync_service.on_tab_selected(tab.group, tab.id);
        let Some(group) = tab.group else {
            return;
        };
        let Some(saved) = ctx.sync_service.get_group_by_local_id(group) else {
            return;
        };
        let saved_tab = saved.tab_by_local_id(tab.id);
        let service = &*ctx.sync_service;
        let origin = SelectionOrigin {
            group_created_remotely: service.is_remote_device(saved.creator_device_id.as_deref()),
            group_updated_remotely: service
                .is_remote_device(saved.last_updater_device_id.as_deref()),
            tab_created_remotely: saved_tab.is_some_and(|saved_tab| {
                service.is_remote_device(saved_tab.creator_device_id.as_deref())
            }),
            tab_updated_remotely: saved_tab.is_some_and(|saved_tab| {
                service.is_remote_device(saved_tab.last_updater_device_id.as_deref())
            }),
        };
        diagnostics::emit_event(DiagnosticEvent::TabSelected { origin });
        ctx.sync_service
            .record_tab_group_event(selected_event(group, tab.id));
    }

    fn did_finish_navigation(
        &self,
        ctx: &mut SyncContext<'_>,
        remote: &RemoteTabGroupMutationHelper,
        tab: TabRef,
        url: &str,
        title: &str,
    ) {
        let Some(group) = tab.group else {
            return;
        };
        if ctx.sync_service.get_group_by_local_id(group).is_none() {
            return;
        }
        let position = current_position(ctx, group, tab.id);
        remote.update_tab(ctx, group, tab.id, url, title, position);
    }
}

fn selected_event(group: LocalTabGroupId, tab: LocalTabId) -> EventDetails {
    let mut details = EventDetails::new(TabGroupEvent::TabSelected);
    details.local_group_id = Some(group);
    details.local_tab_id = Some(tab);
    details
}
