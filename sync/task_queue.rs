/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Work posted during one projection and run by the controller afterwards.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::model::{LocalTabGroupId, SyncId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeferredTask {
    /// Bring a hidden group whose closure was partly undone back in line with
    /// its saved counterpart.
    ReconcileRestoredGroup {
        local_group_id: LocalTabGroupId,
        sync_id: SyncId,
    },
}

#[derive(Debug)]
pub(crate) struct DeferredTaskQueue {
    tx: Sender<DeferredTask>,
    rx: Receiver<DeferredTask>,
}

impl DeferredTaskQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub(crate) fn post(&self, task: DeferredTask) {
        log::debug!("tab group sync: deferring {task:?}");
        let _ = self.tx.send(task);
    }

    /// Takes every task queued so far. Each task is handed out once.
    pub(crate) fn drain_ready(&self) -> Vec<DeferredTask> {
        self.rx.try_iter().collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}
