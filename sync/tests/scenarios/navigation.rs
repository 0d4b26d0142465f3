/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::super::harness::{TestHarness, remote_group};
use crate::config::SyncPreferences;
use crate::diagnostics::CHANNEL_NAVIGATION_SWALLOWED;
use crate::model::tab_model::TabModel;
use crate::model::{LocalTabGroupId, LocalTabId, SyncId, TabGroupColor};
use crate::services::tab_group_sync::TabGroupSyncService;
use crate::sync::identifier_bridge::{UNSAVEABLE_TAB_TITLE, UNSAVEABLE_URL_OVERRIDE};

const A: &str = "https://a.com/";
const B: &str = "https://b.com/";

fn open_remote_group(harness: &mut TestHarness) -> (SyncId, LocalTabGroupId, Vec<LocalTabId>) {
    let sync_id = harness.remote(|service| {
        service.apply_remote_group_added(remote_group("G", TabGroupColor::Blue, &[A, B]))
    });
    let group = harness.only_local_group();
    let tabs = harness.tabs().tabs_in_group(group);
    (sync_id, group, tabs)
}

/// Points the saved tab at `position` somewhere else, as another device would.
fn retarget_remotely(harness: &mut TestHarness, sync_id: SyncId, position: usize, url: &str) {
    let mut incoming = harness
        .service()
        .get_group(sync_id)
        .expect("group should be saved");
    incoming.saved_tabs[position].url = url.to_string();
    incoming.saved_tabs[position].title = url.to_string();
    harness.remote(|service| service.apply_remote_group_updated(incoming));
}

fn saved_url_at(harness: &TestHarness, sync_id: SyncId, position: usize) -> String {
    harness
        .service()
        .get_group(sync_id)
        .map(|group| group.saved_tabs[position].url.clone())
        .expect("group should be saved")
}

#[test]
fn user_navigation_updates_the_saved_tab() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&[A, B], "G", TabGroupColor::Blue);

    harness.local(|model| {
        model.navigate(tabs[0], "https://z.com/", "Z");
        model.finish_navigations();
    });

    let saved = harness.saved_group(group);
    assert_eq!(saved.saved_tabs[0].url, "https://z.com/");
    assert_eq!(saved.saved_tabs[0].title, "Z");
    assert_eq!(saved.saved_tabs[1].url, B);
}

#[test]
fn navigation_to_a_private_url_is_saved_as_a_placeholder() {
    let mut harness = TestHarness::started();
    let (group, tabs) = harness.create_local_group(&[A], "G", TabGroupColor::Blue);

    harness.local(|model| {
        model.navigate(tabs[0], "file:///home/user/notes.txt", "notes.txt");
        model.finish_navigations();
    });

    let saved = harness.saved_group(group);
    assert_eq!(saved.saved_tabs[0].url, UNSAVEABLE_URL_OVERRIDE);
    assert_eq!(saved.saved_tabs[0].title, UNSAVEABLE_TAB_TITLE);
}

#[test]
fn placeholder_does_not_replace_the_tab_it_stands_for() {
    let mut harness = TestHarness::started();
    let (group, tabs) =
        harness.create_local_group(&["ftp://files.example/x", B], "G", TabGroupColor::Blue);
    assert_eq!(harness.saved_urls(group), vec![UNSAVEABLE_URL_OVERRIDE, B]);
    let sync_id = harness.saved_group(group).sync_id;

    let mut incoming = harness
        .service()
        .get_group(sync_id)
        .expect("group should be saved");
    incoming.title = "Renamed".to_string();
    harness.remote(|service| service.apply_remote_group_updated(incoming));

    assert_eq!(harness.tabs().group_title(group).as_deref(), Some("Renamed"));
    assert_eq!(
        harness.tabs().tab(tabs[0]).map(|tab| tab.url).as_deref(),
        Some("ftp://files.example/x")
    );
    assert_eq!(harness.controller.pending_sync_navigation_count(), 0);
}

#[test]
fn sync_navigation_of_the_active_tab_is_not_echoed() {
    let mut harness = TestHarness::started();
    let (sync_id, _, tabs) = open_remote_group(&mut harness);
    harness.local(|model| model.select_tab(tabs[0]));

    retarget_remotely(&mut harness, sync_id, 0, "https://a.com/moved");

    assert_eq!(harness.tabs().in_flight_navigation_count(), 1);
    assert_eq!(harness.controller.pending_sync_navigation_count(), 1);
    let store_mutations = harness.service().mutation_count();

    harness.local(|model| model.finish_navigations());

    assert_eq!(
        harness.tabs().tab(tabs[0]).map(|tab| tab.url).as_deref(),
        Some("https://a.com/moved")
    );
    assert_eq!(harness.controller.pending_sync_navigation_count(), 0);
    assert_eq!(harness.diagnostic_count(CHANNEL_NAVIGATION_SWALLOWED), 1);
    assert_eq!(harness.service().mutation_count(), store_mutations);
    assert_eq!(saved_url_at(&harness, sync_id, 0), "https://a.com/moved");
}

#[test]
fn background_sync_navigation_waits_for_selection() {
    let mut harness = TestHarness::started();
    let (sync_id, _, tabs) = open_remote_group(&mut harness);

    retarget_remotely(&mut harness, sync_id, 1, "https://b.com/moved");

    assert_eq!(harness.tabs().in_flight_navigation_count(), 0);
    assert_eq!(
        harness.tabs().tab(tabs[1]).map(|tab| tab.url).as_deref(),
        Some("https://b.com/moved"),
        "deferred tab reports its pending URL"
    );
    let store_mutations = harness.service().mutation_count();

    harness.local(|model| {
        model.select_tab(tabs[1]);
        model.finish_navigations();
    });

    assert_eq!(harness.controller.pending_sync_navigation_count(), 0);
    assert_eq!(harness.diagnostic_count(CHANNEL_NAVIGATION_SWALLOWED), 1);
    assert_eq!(harness.service().mutation_count(), store_mutations);
}

#[test]
fn background_tabs_load_eagerly_when_deferral_is_off() {
    let preferences = SyncPreferences {
        defer_background_navigations: false,
        ..SyncPreferences::default()
    };
    let mut harness = TestHarness::with_preferences(preferences);
    harness.start();
    let (sync_id, _, _) = open_remote_group(&mut harness);

    retarget_remotely(&mut harness, sync_id, 1, "https://b.com/moved");

    assert_eq!(harness.tabs().in_flight_navigation_count(), 1);
}

#[test]
fn redirected_tab_is_not_sent_back_to_its_original_url() {
    let mut harness = TestHarness::started();
    let (sync_id, group, tabs) = open_remote_group(&mut harness);
    harness.local(|model| {
        model.navigate_through_redirects(tabs[0], &["https://a.com/", "https://www.a.com/"], "A");
        model.finish_navigations();
    });
    assert_eq!(saved_url_at(&harness, sync_id, 0), "https://www.a.com/");

    retarget_remotely(&mut harness, sync_id, 0, "https://a.com/");

    assert_eq!(harness.controller.pending_sync_navigation_count(), 0);
    assert_eq!(harness.local_urls(group)[0], "https://www.a.com/");
}
