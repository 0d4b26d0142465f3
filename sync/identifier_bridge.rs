/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Mapping helpers between local tabs and saved tabs.

use std::collections::HashSet;

use url::Url;

use crate::model::{LocalTabId, SavedTabGroup};

/// Stored in place of URLs that must not leave the device.
pub const UNSAVEABLE_URL_OVERRIDE: &str = "about:newtab";
pub const UNSAVEABLE_TAB_TITLE: &str = "Unsavable tab";

/// Only web URLs are shared with other devices.
pub fn is_url_syncable(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub fn is_placeholder_url(url: &str) -> bool {
    url == UNSAVEABLE_URL_OVERRIDE
}

/// URL and title to store for a local tab.
pub fn url_and_title_for_sync(url: &str, title: &str) -> (String, String) {
    if is_url_syncable(url) {
        let title = if title.is_empty() { url } else { title };
        (url.to_string(), title.to_string())
    } else {
        (
            UNSAVEABLE_URL_OVERRIDE.to_string(),
            UNSAVEABLE_TAB_TITLE.to_string(),
        )
    }
}

/// Local tabs of a group that no saved tab refers to.
pub(crate) fn unreferenced_local_tabs(
    local_tabs: &[LocalTabId],
    group: &SavedTabGroup,
) -> Vec<LocalTabId> {
    let referenced: HashSet<LocalTabId> = group
        .saved_tabs
        .iter()
        .filter_map(|tab| tab.local_tab_id)
        .collect();
    local_tabs
        .iter()
        .copied()
        .filter(|tab| !referenced.contains(tab))
        .collect()
}
