/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use rstest::rstest;

use super::super::harness::{TestHarness, remote_group};
use crate::config::SyncPreferences;
use crate::diagnostics::CHANNEL_TAB_CREATED_FROM_SYNC;
use crate::model::tab_model::TabModel;
use crate::model::{OpeningSource, TabGroupColor, TabGroupEvent, TriggerSource};
use crate::services::tab_group_sync::{SyncServiceEvent, TabGroupSyncService};

const A: &str = "https://a.com/page";
const B: &str = "https://b.com/page";
const C: &str = "https://c.com/page";

#[test]
fn group_from_another_device_opens_collapsed_with_tabs_in_order() {
    let mut harness = TestHarness::started();

    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("G", TabGroupColor::Red, &[A, B]))
    });

    let group = harness.only_local_group();
    assert_eq!(harness.local_urls(group), vec![A, B]);
    assert_eq!(harness.tabs().group_title(group).as_deref(), Some("G"));
    assert_eq!(harness.tabs().group_color(group), Some(TabGroupColor::Red));
    assert!(harness.tabs().is_group_collapsed(group));

    let saved = harness.saved_group(group);
    assert_eq!(saved.sync_id, sync_id);
    assert_eq!(
        harness.saved_local_ids(group),
        harness
            .tabs()
            .tabs_in_group(group)
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>()
    );
    assert_eq!(harness.service().group_count(), 1);
    assert_eq!(
        harness.service().mutation_count(),
        1,
        "opening the group must not echo back into the store"
    );
    assert_eq!(harness.diagnostic_count(CHANNEL_TAB_CREATED_FROM_SYNC), 2);
    let opened = harness
        .service()
        .recorded_events()
        .iter()
        .find(|details| details.event == TabGroupEvent::GroupOpened)
        .expect("opening should be recorded");
    assert_eq!(opened.opening_source, Some(OpeningSource::AutoOpenedFromSync));
}

#[test]
fn remote_group_without_tabs_is_not_opened() {
    let mut harness = TestHarness::started();

    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("Empty", TabGroupColor::Red, &[]))
    });

    assert_eq!(harness.tabs().tab_count(), 0);
    assert!(harness.tabs().group_ids().is_empty());
    let saved = harness
        .service()
        .get_group(sync_id)
        .expect("group stays saved");
    assert!(saved.local_group_id.is_none());
    assert_eq!(harness.skip_count("saved group has no tabs"), 1);
}

#[derive(Debug, Clone, Copy)]
enum OpenBlocker {
    InactiveWindow,
    AutoOpenDisabled,
}

#[rstest]
#[case::inactive_window(OpenBlocker::InactiveWindow, "not the active window")]
#[case::auto_open_disabled(OpenBlocker::AutoOpenDisabled, "auto-open disabled")]
fn remote_group_is_not_opened_when_blocked(
    #[case] blocker: OpenBlocker,
    #[case] skip_reason: &str,
) {
    let preferences = SyncPreferences {
        auto_open_synced_groups: !matches!(blocker, OpenBlocker::AutoOpenDisabled),
        ..SyncPreferences::default()
    };
    let mut harness = TestHarness::with_preferences(preferences);
    harness.start();
    if let OpenBlocker::InactiveWindow = blocker {
        harness.controller.tab_model_mut().set_active_window(false);
    }

    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("G", TabGroupColor::Red, &[A]))
    });

    assert_eq!(harness.tabs().tab_count(), 0, "{blocker:?}");
    let saved = harness
        .service()
        .get_group(sync_id)
        .expect("group stays saved");
    assert!(saved.local_group_id.is_none());
    assert_eq!(harness.skip_count(skip_reason), 1);
}

#[test]
fn notifications_about_local_changes_are_ignored() {
    let mut harness = TestHarness::started();

    harness
        .controller
        .on_sync_service_event(SyncServiceEvent::TabGroupAdded {
            group: remote_group("Mine", TabGroupColor::Blue, &[A]),
            source: TriggerSource::Local,
        });

    assert_eq!(harness.tabs().tab_count(), 0);
}

#[test]
fn remote_update_reconciles_the_open_group() {
    let mut harness = TestHarness::started();
    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("G", TabGroupColor::Red, &[A, B]))
    });
    let group = harness.only_local_group();
    let original = harness.tabs().tabs_in_group(group);

    let mut incoming = harness
        .service()
        .get_group(sync_id)
        .expect("group should be saved");
    incoming.title = "Renamed".to_string();
    incoming.color = TabGroupColor::Purple;
    incoming.saved_tabs.remove(0);
    incoming.push_tab(C, "C");
    harness
        .controller
        .sync_service_mut()
        .apply_remote_group_updated(incoming);
    let store_mutations = harness.service().mutation_count();
    harness.controller.pump();

    assert_eq!(harness.local_urls(group), vec![B, C]);
    let now = harness.tabs().tabs_in_group(group);
    assert_eq!(now[0], original[1], "surviving tab keeps its identity");
    assert!(harness.tabs().tab(original[0]).is_none());
    assert_eq!(harness.tabs().group_title(group).as_deref(), Some("Renamed"));
    assert_eq!(harness.tabs().group_color(group), Some(TabGroupColor::Purple));
    assert!(harness.tabs().is_group_collapsed(group), "collapsed state survives");
    assert_eq!(
        harness.saved_local_ids(group),
        now.into_iter().map(Some).collect::<Vec<_>>()
    );
    assert_eq!(harness.service().mutation_count(), store_mutations);
}

#[test]
fn remote_update_for_a_group_not_open_here_is_ignored() {
    let preferences = SyncPreferences {
        auto_open_synced_groups: false,
        ..SyncPreferences::default()
    };
    let mut harness = TestHarness::with_preferences(preferences);
    harness.start();
    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("G", TabGroupColor::Red, &[A]))
    });
    let mut incoming = harness
        .service()
        .get_group(sync_id)
        .expect("group should be saved");
    incoming.push_tab(B, "B");

    harness.remote(|service| service.apply_remote_group_updated(incoming));

    assert_eq!(harness.tabs().tab_count(), 0);
}

#[test]
fn remote_removal_closes_only_that_group() {
    let mut harness = TestHarness::started();
    let removed_sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("Removed", TabGroupColor::Red, &[A, B]))
    });
    harness.remote(|service| {
        service.apply_remote_group_added(remote_group("Kept", TabGroupColor::Blue, &[C]))
    });
    let removed = harness
        .service()
        .get_group(removed_sync_id)
        .and_then(|group| group.local_group_id)
        .expect("group should be open");

    harness.remote(|service| service.apply_remote_group_removed(removed_sync_id));

    assert!(!harness.tabs().group_exists(removed));
    let kept = harness.only_local_group();
    assert_eq!(harness.local_urls(kept), vec![C]);
    assert!(harness.service().deleted_group_ids().is_empty());
    assert_eq!(harness.service().group_count(), 1);
}
