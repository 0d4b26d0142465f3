/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One-shot reconciliation once both the tab model and the store are ready.
//!
//! Local group ids do not survive a restart, so whatever the previous session
//! left behind is matched up again here before observation starts.

use time::OffsetDateTime;

use crate::diagnostics::{self, CHANNEL_STARTUP_COMPLETED};
use crate::model::ClosingSource;
use crate::model::LocalTabGroupId;
use crate::model::tab_model::TabModel;
use crate::sync::SyncContext;
use crate::sync::local_mutation;
use crate::sync::remote_mutation::RemoteTabGroupMutationHelper;

pub(crate) fn initialize_tab_group_sync(
    ctx: &mut SyncContext<'_>,
    remote: &RemoteTabGroupMutationHelper,
) {
    close_locally_deleted_groups(ctx);
    create_remote_groups_for_unsaved_local_groups(ctx, remote);
    reconcile_local_groups(ctx);
    update_tab_id_mappings(ctx, remote);
    diagnostics::emit_usage(CHANNEL_STARTUP_COMPLETED);
}

fn close_locally_deleted_groups(ctx: &mut SyncContext<'_>) {
    for local_id in ctx.sync_service.deleted_group_ids() {
        if !ctx.tab_model.group_exists(local_id) {
            continue;
        }
        log::info!("closing {local_id}: deleted on another device");
        local_mutation::close_tab_group(ctx, local_id, ClosingSource::CleanedUpOnStartup);
    }
}

fn create_remote_groups_for_unsaved_local_groups(
    ctx: &mut SyncContext<'_>,
    remote: &RemoteTabGroupMutationHelper,
) {
    let threshold = ctx.preferences.stale_group_threshold();
    let now = OffsetDateTime::now_utc();
    for local_id in ctx.tab_model.group_ids() {
        if ctx.sync_service.get_group_by_local_id(local_id).is_some() {
            continue;
        }
        if is_group_stale(&*ctx.tab_model, local_id, threshold, now) {
            diagnostics::emit_skipped("local group is stale");
            continue;
        }
        remote.create_remote_tab_group(ctx, local_id);
    }
}

fn reconcile_local_groups(ctx: &mut SyncContext<'_>) {
    for local_id in ctx.tab_model.group_ids() {
        if let Some(group) = ctx.sync_service.get_group_by_local_id(local_id) {
            local_mutation::reconcile_group_on_startup(ctx, &group);
        }
    }
}

fn update_tab_id_mappings(ctx: &mut SyncContext<'_>, remote: &RemoteTabGroupMutationHelper) {
    for local_id in ctx.tab_model.group_ids() {
        remote.update_tab_id_mappings_on_startup(ctx, local_id);
    }
}

/// A group is stale when even its most recently used tab has been idle longer
/// than `threshold`.
pub(crate) fn is_group_stale(
    tab_model: &dyn TabModel,
    local_id: LocalTabGroupId,
    threshold: time::Duration,
    now: OffsetDateTime,
) -> bool {
    tab_model
        .tabs_in_group(local_id)
        .into_iter()
        .filter_map(|tab| tab_model.tab(tab))
        .map(|tab| tab.last_accessed)
        .max()
        .is_some_and(|latest| now - latest > threshold)
}
