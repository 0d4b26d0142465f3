/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use rstest::rstest;

use super::super::harness::TestHarness;
use crate::diagnostics::CHANNEL_PENDING_CLOSURE_RESOLVED;
use crate::model::tab_model::{TabModel, TabModelEvent, TabRef};
use crate::model::{ClosingSource, TabGroupColor, TabGroupEvent};
use crate::services::tab_group_sync::TabGroupSyncService;

const URLS: [&str; 4] = [
    "https://a.com",
    "https://b.com",
    "https://c.com",
    "https://d.com",
];

#[test]
fn closing_some_tabs_removes_exactly_those_saved_tabs() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&URLS, "G", TabGroupColor::Blue);

    harness.local(|model| model.close_tabs(&[tabs[1], tabs[3]], true));
    assert_eq!(harness.saved_urls(group), vec!["https://a.com", "https://c.com"]);
    assert!(!harness.controller.has_pending_closure(group));

    harness.local(|model| model.commit_closures());
    assert_eq!(harness.saved_urls(group), vec!["https://a.com", "https://c.com"]);
}

#[rstest]
#[case::first(0)]
#[case::middle(1)]
#[case::last(2)]
fn undoing_one_closed_tab_puts_it_back_in_place(#[case] closed: usize) {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&URLS[..3], "G", TabGroupColor::Blue);

    harness.local(|model| model.close_tabs(&[tabs[closed]], true));
    let remaining: Vec<&str> = URLS[..3]
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != closed)
        .map(|(_, url)| *url)
        .collect();
    assert_eq!(harness.saved_urls(group), remaining);

    harness.local(|model| model.undo_closure(tabs[closed]));

    assert_eq!(harness.saved_urls(group), URLS[..3].to_vec());
    assert_eq!(
        harness.saved_local_ids(group),
        tabs.iter().copied().map(Some).collect::<Vec<_>>()
    );
}

#[test]
fn hiding_a_group_keeps_it_saved_and_drops_the_mapping_on_commit() {
    let mut harness = TestHarness::started();
    let (group, _) = harness.create_local_group(&URLS[..3], "G", TabGroupColor::Blue);
    let sync_id = harness.saved_group(group).sync_id;

    harness.local(|model| model.close_group(group, true, true));

    assert!(harness.controller.has_pending_closure(group));
    assert_eq!(harness.saved_urls(group).len(), 3, "hiding must not remove saved tabs");

    harness.local(|model| model.commit_closures());

    assert!(!harness.controller.has_pending_closure(group));
    assert!(harness.service().get_group_by_local_id(group).is_none());
    let saved = harness
        .service()
        .get_group(sync_id)
        .expect("hidden group stays saved");
    assert_eq!(saved.saved_tabs.len(), 3);
    assert!(saved.saved_tabs.iter().all(|tab| tab.local_tab_id.is_none()));
    let closed = harness
        .service()
        .recorded_events()
        .last()
        .expect("closure should be recorded");
    assert_eq!(closed.event, TabGroupEvent::GroupClosed);
    assert_eq!(closed.closing_source, Some(ClosingSource::ClosedByUser));
}

#[test]
fn undoing_a_hidden_group_reconciles_it_with_the_saved_group() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);

    harness.local(|model| model.close_group(group, true, true));
    harness.local(|model| model.undo_all_closures());

    assert_eq!(harness.controller.pending_closure_count(), 0);
    assert_eq!(harness.local_urls(group), vec!["https://a.com", "https://b.com"]);
    assert_eq!(
        harness.saved_local_ids(group),
        tabs.iter().copied().map(Some).collect::<Vec<_>>()
    );
}

#[test]
fn partially_undone_hidden_group_is_refilled_from_the_saved_group() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);

    harness.local(|model| model.close_group(group, true, true));
    harness.local(|model| {
        model.undo_closure(tabs[0]);
        model.commit_closures();
    });

    assert_eq!(harness.local_urls(group), vec!["https://a.com", "https://b.com"]);
    let mapped = harness.saved_local_ids(group);
    assert_eq!(mapped[0], Some(tabs[0]));
    assert!(mapped[1].is_some());
    assert_ne!(mapped[1], Some(tabs[1]), "committed tab is replaced by a new one");
}

#[test]
fn deleting_a_group_removes_it_from_the_store_right_away() {
    let mut harness = TestHarness::started();
    let (group, _) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);
    let sync_id = harness.saved_group(group).sync_id;

    harness.local(|model| model.close_group(group, false, true));

    assert!(harness.service().get_group(sync_id).is_none());
    assert!(harness.controller.has_pending_closure(group));
    let deleted = harness
        .service()
        .recorded_events()
        .last()
        .expect("deletion should be recorded");
    assert_eq!(deleted.closing_source, Some(ClosingSource::DeletedByUser));

    harness.local(|model| model.commit_closures());

    assert_eq!(harness.controller.pending_closure_count(), 0);
    assert_eq!(harness.service().group_count(), 0);
}

#[test]
fn undoing_a_deleted_group_saves_it_again() {
    let mut harness = TestHarness::started();
    let (group, _) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);
    let original = harness.saved_group(group).sync_id;

    harness.local(|model| model.close_group(group, false, true));
    harness.local(|model| model.undo_all_closures());

    let saved = harness.saved_group(group);
    assert_ne!(saved.sync_id, original);
    assert_eq!(saved.title, "G");
    assert_eq!(harness.saved_urls(group), vec!["https://a.com", "https://b.com"]);
    assert_eq!(harness.service().group_count(), 1);
}

#[test]
fn closing_every_tab_of_a_group_deletes_it() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);

    harness.local(|model| model.close_tabs(&tabs, false));

    assert_eq!(harness.service().group_count(), 0);
    assert_eq!(harness.controller.pending_closure_count(), 0);
}

#[test]
fn closing_the_window_hides_every_group() {
    let mut harness = TestHarness::started();
    let (first, _) = harness.create_local_group(&URLS[..2], "One", TabGroupColor::Blue);
    let (second, _) = harness.create_local_group(&URLS[2..], "Two", TabGroupColor::Red);

    harness.local(|model| model.close_all_tabs(false));

    assert_eq!(harness.tabs().tab_count(), 0);
    assert_eq!(harness.service().group_count(), 2);
    assert!(harness.service().get_group_by_local_id(first).is_none());
    assert!(harness.service().get_group_by_local_id(second).is_none());
    assert_eq!(harness.controller.pending_closure_count(), 0);
}

#[test]
fn each_tab_of_a_pending_closure_resolves_once() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);
    let first = TabRef {
        id: tabs[0],
        group: Some(group),
    };
    let second = TabRef {
        id: tabs[1],
        group: Some(group),
    };

    harness.local(|model| model.close_group(group, true, true));
    harness
        .controller
        .on_tab_model_event(TabModelEvent::DidCloseTabs { tabs: vec![first] });
    assert!(harness.controller.has_pending_closure(group));

    harness.local(|model| model.commit_closures());
    harness
        .controller
        .on_tab_model_event(TabModelEvent::DidCloseTabs { tabs: vec![second] });

    assert!(!harness.controller.has_pending_closure(group));
    assert_eq!(harness.diagnostic_count(CHANNEL_PENDING_CLOSURE_RESOLVED), 1);
    assert!(harness.service().get_group_by_local_id(group).is_none());
}

#[test]
fn closed_tab_outside_any_group_is_ignored() {
    let mut harness = TestHarness::started();
    let loose = harness.open_tabs(&["https://loose.com"]);
    let (group, _) = harness.create_local_group(&URLS[..2], "G", TabGroupColor::Blue);
    let store_mutations = harness.service().mutation_count();

    harness.local(|model| model.close_tabs(&loose, false));

    assert_eq!(harness.service().mutation_count(), store_mutations);
    assert_eq!(harness.saved_urls(group).len(), 2);
    assert!(harness.tabs().group_exists(group));
}
