/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Turns remote store notifications from other devices into local changes.

use crate::diagnostics;
use crate::model::{ClosingSource, OpeningSource, TriggerSource};
use crate::services::tab_group_sync::SyncServiceEvent;
use crate::sync::SyncContext;
use crate::sync::local_mutation;
use crate::sync::observation_gate::ObservationGate;

pub(crate) struct TabGroupSyncRemoteObserver {
    gate: ObservationGate,
}

impl TabGroupSyncRemoteObserver {
    pub(crate) fn new(gate: ObservationGate) -> Self {
        Self { gate }
    }

    pub(crate) fn on_event(&self, event: SyncServiceEvent, ctx: &mut SyncContext<'_>) {
        if !self.gate.is_open() {
            log::trace!("{} observation suspended; dropping {event:?}", self.gate.name());
            return;
        }
        if event.source() == Some(TriggerSource::Local) {
            return;
        }

        match event {
            SyncServiceEvent::Initialized => {}
            SyncServiceEvent::TabGroupAdded { group, .. } => {
                if group.saved_tabs.is_empty() {
                    diagnostics::emit_skipped("saved group has no tabs");
                    return;
                }
                if !ctx.tab_model.is_active_window() {
                    diagnostics::emit_skipped("not the active window");
                    return;
                }
                if !ctx.preferences.auto_open_synced_groups {
                    diagnostics::emit_skipped("auto-open disabled");
                    return;
                }
                local_mutation::create_new_tab_group(ctx, &group, OpeningSource::AutoOpenedFromSync);
            }
            SyncServiceEvent::TabGroupUpdated { group, .. } => {
                // Earlier projections may have mapped new tabs since this
                // notification was queued; reconcile against the stored copy.
                let Some(group) = ctx.sync_service.get_group(group.sync_id) else {
                    diagnostics::emit_skipped("updated group no longer saved");
                    return;
                };
                let Some(local_id) = group.local_group_id else {
                    return;
                };
                if !ctx.tab_model.group_exists(local_id) {
                    diagnostics::emit_skipped("group not open in this window");
                    return;
                }
                local_mutation::update_tab_group(ctx, &group);
            }
            SyncServiceEvent::TabGroupRemoved { local_id, .. } => {
                let Some(local_id) = local_id else {
                    return;
                };
                if !ctx.tab_model.group_exists(local_id) {
                    diagnostics::emit_skipped("group not open in this window");
                    return;
                }
                local_mutation::close_tab_group(ctx, local_id, ClosingSource::DeletedFromSync);
            }
        }
    }
}
