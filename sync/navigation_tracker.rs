/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Remembers which navigations the sync engine started, so their completion is
//! not echoed back to the remote store.

use std::collections::HashSet;

use crate::model::NavigationRequestId;

#[derive(Debug, Default)]
pub(crate) struct NavigationTracker {
    last_issued: u64,
    pending: HashSet<NavigationRequestId>,
}

impl NavigationTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh request id. Ids are never reused.
    pub(crate) fn begin_sync_navigation(&mut self) -> NavigationRequestId {
        self.last_issued += 1;
        let id = NavigationRequestId(self.last_issued);
        self.pending.insert(id);
        id
    }

    /// Consumes the record for `request`. True at most once per issued id.
    pub(crate) fn was_navigation_from_sync(&mut self, request: Option<NavigationRequestId>) -> bool {
        request.is_some_and(|id| self.pending.remove(&id))
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}
