/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::super::harness::{TestHarness, remote_group};
use crate::diagnostics::CHANNEL_STARTUP_COMPLETED;
use crate::model::tab_model::TabModel;
use crate::model::{LocalTabGroupId, OpeningSource, SyncId, TabGroupColor, TabGroupEvent};
use crate::services::tab_group_sync::TabGroupSyncService;
use crate::sync::task_queue::DeferredTask;

#[test]
fn startup_waits_for_both_collaborators() {
    let mut harness = TestHarness::new();

    harness.controller.tab_model_mut().mark_initialized();
    harness.controller.pump();
    assert!(!harness.controller.is_started());

    harness.controller.sync_service_mut().mark_initialized();
    harness.controller.pump();
    assert!(harness.controller.is_started());
    assert_eq!(harness.diagnostic_count(CHANNEL_STARTUP_COMPLETED), 1);

    harness.controller.pump();
    assert_eq!(harness.diagnostic_count(CHANNEL_STARTUP_COMPLETED), 1);
}

#[test]
fn changes_before_startup_are_only_picked_up_by_reconciliation() {
    let mut harness = TestHarness::new();
    let (local, _) = harness.create_local_group(&["https://a.com"], "Local", TabGroupColor::Blue);
    let remote_sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group(
            "Remote",
            TabGroupColor::Red,
            &["https://r.com"],
        ))
    });
    assert_eq!(harness.service().group_count(), 1);
    assert_eq!(harness.tabs().group_ids(), vec![local]);

    harness.start();

    assert!(harness.service().get_group_by_local_id(local).is_some());
    assert_eq!(harness.tabs().group_ids(), vec![local], "early remote add is not replayed");
    let remote = harness
        .service()
        .get_group(remote_sync_id)
        .expect("remote group stays saved");
    assert!(remote.local_group_id.is_none());
}

#[test]
fn open_tab_group_opens_a_saved_group_once() {
    let mut harness = TestHarness::started();
    let sync_id = harness.remote(|service| {
        let group = remote_group(
            "Later",
            TabGroupColor::Cyan,
            &["https://a.com", "https://b.com"],
        );
        let sync_id = group.sync_id;
        service.restore_group(group);
        sync_id
    });

    let opened = harness
        .controller
        .open_tab_group(sync_id)
        .expect("saved group should open");

    assert_eq!(harness.local_urls(opened), vec!["https://a.com", "https://b.com"]);
    assert_eq!(harness.saved_group(opened).sync_id, sync_id);
    let recorded = harness
        .service()
        .recorded_events()
        .iter()
        .find(|details| details.event == TabGroupEvent::GroupOpened)
        .expect("opening should be recorded");
    assert_eq!(recorded.opening_source, Some(OpeningSource::OpenedFromRevisitUi));

    assert!(harness.controller.open_tab_group(sync_id).is_none());
    assert!(harness.controller.open_tab_group(SyncId::new()).is_none());
    assert_eq!(harness.tabs().group_ids(), vec![opened]);
}

#[test]
fn destroyed_controller_stops_projecting() {
    let mut harness = TestHarness::started();
    let (group, _) = harness.create_local_group(&["https://a.com"], "G", TabGroupColor::Blue);

    harness.controller.destroy();
    assert!(harness.controller.is_destroyed());

    harness.local(|model| model.set_group_title(group, "Renamed"));
    harness.create_local_group(&["https://b.com"], "After", TabGroupColor::Red);
    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group(
            "Remote",
            TabGroupColor::Green,
            &["https://r.com"],
        ))
    });

    assert_eq!(harness.saved_group(group).title, "G");
    assert_eq!(harness.service().group_count(), 2);
    assert_eq!(harness.tabs().group_ids().len(), 2);
    assert!(harness.controller.open_tab_group(sync_id).is_none());
}

#[test]
fn deferred_reconcile_for_a_vanished_group_is_skipped() {
    let mut harness = TestHarness::started();

    harness
        .controller
        .post_deferred_task_for_tests(DeferredTask::ReconcileRestoredGroup {
            local_group_id: LocalTabGroupId::new(),
            sync_id: SyncId::new(),
        });
    harness.controller.pump();

    assert_eq!(harness.skip_count("restored group was deleted remotely"), 1);
}

#[test]
fn deferred_reconcile_for_a_remapped_group_is_skipped() {
    let mut harness = TestHarness::started();
    let (group, _) = harness.create_local_group(&["https://a.com"], "G", TabGroupColor::Blue);
    let tab_mutations = harness.tabs().mutation_count();

    harness
        .controller
        .post_deferred_task_for_tests(DeferredTask::ReconcileRestoredGroup {
            local_group_id: group,
            sync_id: SyncId::new(),
        });
    harness.controller.pump();

    assert_eq!(harness.skip_count("restored group was remapped"), 1);
    assert_eq!(harness.tabs().mutation_count(), tab_mutations);
}
