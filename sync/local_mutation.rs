/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Applies saved groups onto the local tab model.
//!
//! Callers suspend local observation around every function here; the tab model
//! notifications these mutations produce must not travel back to the store.

use crate::diagnostics::{self, CHANNEL_TAB_CREATED_FROM_SYNC};
use crate::model::tab_model::{CreateTabParams, LoadUrlParams};
use crate::model::{ClosingSource, LocalTabGroupId, LocalTabId, OpeningSource, SavedTabGroup};
use crate::sync::SyncContext;
use crate::sync::identifier_bridge::{is_placeholder_url, is_url_syncable, unreferenced_local_tabs};

/// Opens `group` as a new collapsed local group at the end of the strip.
pub(crate) fn create_new_tab_group(
    ctx: &mut SyncContext<'_>,
    group: &SavedTabGroup,
    opening_source: OpeningSource,
) -> Option<LocalTabGroupId> {
    if group.saved_tabs.is_empty() {
        log::debug!("cannot open {} locally: it has no tabs", group.sync_id);
        diagnostics::emit_skipped("saved group has no tabs");
        return None;
    }

    let mut tab_ids = Vec::with_capacity(group.saved_tabs.len());
    for saved_tab in &group.saved_tabs {
        let tab = ctx
            .tab_model
            .create_tab(CreateTabParams::background(&saved_tab.url, &saved_tab.title));
        tab_ids.push(tab);
        diagnostics::emit_usage(CHANNEL_TAB_CREATED_FROM_SYNC);
    }

    let (first, rest) = tab_ids.split_first()?;
    let Some(local_id) = ctx.tab_model.create_single_tab_group(*first) else {
        log::error!("tab model refused to group {first} for {}", group.sync_id);
        return None;
    };
    for tab in rest {
        ctx.tab_model.merge_tab_into_group(*tab, local_id);
    }
    ctx.tab_model.set_group_title(local_id, &group.title);
    ctx.tab_model.set_group_color(local_id, group.color);
    // Merging expands the group, so collapse last.
    ctx.tab_model.set_group_collapsed(local_id, true);

    ctx.sync_service
        .update_local_tab_group_mapping(group.sync_id, local_id, opening_source);
    for (saved_tab, tab) in group.saved_tabs.iter().zip(&tab_ids) {
        ctx.sync_service
            .update_local_tab_id(local_id, saved_tab.sync_id, *tab);
    }
    log::debug!(
        "opened {} as {local_id} with {} tabs",
        group.sync_id,
        tab_ids.len()
    );
    Some(local_id)
}

/// Reconciles an open local group with a saved group changed elsewhere.
/// Tabs are matched through their local id mapping.
pub(crate) fn update_tab_group(ctx: &mut SyncContext<'_>, group: &SavedTabGroup) {
    reconcile(ctx, group, false);
}

/// Startup flavour of `update_tab_group`: local ids are not trustworthy yet, so
/// tabs are matched by position and extra local tabs are dropped.
pub(crate) fn reconcile_group_on_startup(ctx: &mut SyncContext<'_>, group: &SavedTabGroup) {
    reconcile(ctx, group, true);
}

fn reconcile(ctx: &mut SyncContext<'_>, group: &SavedTabGroup, on_startup: bool) {
    let Some(local_id) = group.local_group_id else {
        log::debug!("{} is not mapped to a local group", group.sync_id);
        return;
    };
    if !ctx.tab_model.group_exists(local_id) {
        diagnostics::emit_skipped("group not open in this window");
        return;
    }
    if group.saved_tabs.is_empty() {
        diagnostics::emit_skipped("saved group has no tabs");
        return;
    }

    let was_collapsed = ctx.tab_model.is_group_collapsed(local_id);
    let local_tabs = ctx.tab_model.tabs_in_group(local_id);
    let tabs_to_close: Vec<LocalTabId> = if on_startup {
        local_tabs
            .iter()
            .skip(group.saved_tabs.len())
            .copied()
            .collect()
    } else {
        unreferenced_local_tabs(&local_tabs, group)
    };
    let group_start = local_tabs
        .first()
        .and_then(|tab| ctx.tab_model.index_of(*tab))
        .unwrap_or_else(|| ctx.tab_model.tab_count());

    for (position, saved_tab) in group.saved_tabs.iter().enumerate() {
        let existing = if on_startup {
            local_tabs.get(position).copied()
        } else {
            saved_tab
                .local_tab_id
                .filter(|tab| local_tabs.contains(tab))
        };
        let target = group_start + position;
        let tab = match existing {
            Some(tab) => {
                maybe_navigate_to_url(ctx, tab, &saved_tab.url, &saved_tab.title);
                tab
            }
            None => {
                let tab = ctx.tab_model.create_tab(
                    CreateTabParams::background(&saved_tab.url, &saved_tab.title)
                        .at_index(target)
                        .in_group(local_id),
                );
                ctx.sync_service
                    .update_local_tab_id(local_id, saved_tab.sync_id, tab);
                tab
            }
        };
        ctx.tab_model.move_tab(tab, target);
    }

    // Closing last means the group never runs empty mid-pass.
    if !tabs_to_close.is_empty() {
        ctx.tab_model.close_tabs_without_undo(&tabs_to_close);
    }

    ctx.tab_model.set_group_title(local_id, &group.title);
    ctx.tab_model.set_group_color(local_id, group.color);
    ctx.tab_model.set_group_collapsed(local_id, was_collapsed);
}

/// Points `tab` at `url` unless that would be a pointless or lossy reload.
pub(crate) fn maybe_navigate_to_url(
    ctx: &mut SyncContext<'_>,
    tab: LocalTabId,
    url: &str,
    title: &str,
) {
    let Some(snapshot) = ctx.tab_model.tab(tab) else {
        return;
    };
    if snapshot.url == url {
        return;
    }
    // The saved placeholder stands for this very tab; keep what it shows.
    if !is_url_syncable(&snapshot.url) && is_placeholder_url(url) {
        return;
    }
    if snapshot.redirect_chain.iter().any(|hop| hop == url) {
        return;
    }

    let request = ctx.navigation_tracker.begin_sync_navigation();
    let deferred = ctx.preferences.defer_background_navigations
        && ctx.tab_model.active_tab() != Some(tab);
    log::debug!(
        "navigating {tab} to {url} (request {}, deferred: {deferred})",
        request.value()
    );
    ctx.tab_model.load_url(
        tab,
        LoadUrlParams {
            url: url.to_string(),
            title: title.to_string(),
            sync_request: Some(request),
            deferred,
        },
    );
}

/// Closes a local group without touching its saved counterpart.
pub(crate) fn close_tab_group(
    ctx: &mut SyncContext<'_>,
    local_id: LocalTabGroupId,
    closing_source: ClosingSource,
) {
    let tabs = ctx.tab_model.tabs_in_group(local_id);
    if !tabs.is_empty() {
        ctx.tab_model.close_tabs_without_undo(&tabs);
    }
    ctx.sync_service
        .remove_local_tab_group_mapping(local_id, closing_source);
}
