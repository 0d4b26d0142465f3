/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use proptest::prelude::*;

use super::super::harness::TestHarness;
use crate::model::tab_model::TabModel;
use crate::model::{SavedTabGroup, TabGroupColor};
use crate::services::tab_group_sync::TabGroupSyncService;
use crate::sync::identifier_bridge::{UNSAVEABLE_URL_OVERRIDE, is_url_syncable};

const URL_POOL: [&str; 6] = [
    "https://news.example/today",
    "https://docs.example/guide?page=2",
    "http://plain.example/",
    "ftp://files.example/archive.zip",
    "file:///home/user/notes.txt",
    "chrome://settings",
];

const COLORS: [TabGroupColor; 9] = [
    TabGroupColor::Grey,
    TabGroupColor::Blue,
    TabGroupColor::Red,
    TabGroupColor::Yellow,
    TabGroupColor::Green,
    TabGroupColor::Pink,
    TabGroupColor::Purple,
    TabGroupColor::Cyan,
    TabGroupColor::Orange,
];

fn bridged(url: &str) -> String {
    if is_url_syncable(url) {
        url.to_string()
    } else {
        UNSAVEABLE_URL_OVERRIDE.to_string()
    }
}

proptest! {
    #[test]
    fn group_created_on_one_device_opens_identically_on_another(
        urls in prop::collection::vec(prop::sample::select(URL_POOL.to_vec()), 1..6),
        title in "[A-Za-z ]{0,12}",
        color in prop::sample::select(COLORS.to_vec()),
    ) {
        let mut sender = TestHarness::started();
        let (sent, _) = sender.create_local_group(&urls, &title, color);
        let shared = sender.saved_group(sent);

        let mut receiver = TestHarness::started();
        receiver.remote(|service| service.apply_remote_group_added(shared));

        let received = receiver.only_local_group();
        let expected: Vec<String> = urls.iter().map(|url| bridged(url)).collect();
        prop_assert_eq!(receiver.local_urls(received), expected);
        prop_assert_eq!(receiver.tabs().group_title(received), Some(title));
        prop_assert_eq!(receiver.tabs().group_color(received), Some(color));
        prop_assert_eq!(receiver.saved_group(received).saved_tabs.len(), urls.len());
    }

    #[test]
    fn startup_reconciliation_is_idempotent(
        layout in prop::collection::vec((1usize..5, prop::option::of(1usize..5)), 0..4),
    ) {
        let mut harness = TestHarness::new();
        let mut restored = Vec::new();
        for (index, (local_tabs, saved_tabs)) in layout.iter().enumerate() {
            let urls: Vec<String> = (0..*local_tabs)
                .map(|tab| format!("https://local.example/{index}/{tab}"))
                .collect();
            let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
            let (group, _) =
                harness.create_local_group(&url_refs, &format!("Local {index}"), TabGroupColor::Grey);
            if let Some(saved_tabs) = saved_tabs {
                let mut saved = SavedTabGroup::new(format!("Saved {index}"), TabGroupColor::Blue);
                for tab in 0..*saved_tabs {
                    saved.push_tab(
                        format!("https://saved.example/{index}/{tab}"),
                        format!("Saved tab {tab}"),
                    );
                }
                saved.local_group_id = Some(group);
                harness.controller.sync_service_mut().restore_group(saved);
                restored.push(group);
            }
        }

        harness.start();
        harness.local(|model| model.finish_navigations());

        for group in &restored {
            prop_assert_eq!(harness.local_urls(*group), harness.saved_urls(*group));
        }
        prop_assert_eq!(harness.service().group_count(), layout.len());

        let tab_mutations = harness.tabs().mutation_count();
        let store_mutations = harness.service().mutation_count();
        harness.controller.run_startup_pass_for_tests();

        prop_assert_eq!(harness.tabs().mutation_count(), tab_mutations);
        prop_assert_eq!(harness.service().mutation_count(), store_mutations);
    }
}
