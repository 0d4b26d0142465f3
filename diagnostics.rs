/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Usage signals emitted by the sync engine.
//!
//! Producers call `emit_event` from anywhere; events travel over a
//! process-wide channel installed by `DiagnosticsState::new` and are
//! aggregated into per-channel counts when drained. Tests get a thread-local
//! sender so parallel tests never see each other's events.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde_json::{Value, json};

pub const CHANNEL_TAB_CREATED_FROM_SYNC: &str = "tab_group_sync.local.tab_created";
pub const CHANNEL_TAB_SELECTED: &str = "tab_group_sync.local.tab_selected";
pub const CHANNEL_NAVIGATION_SWALLOWED: &str = "tab_group_sync.navigation.swallowed";
pub const CHANNEL_PROJECTION_SKIPPED: &str = "tab_group_sync.projection.skipped";
pub const CHANNEL_PENDING_CLOSURE_RESOLVED: &str = "tab_group_sync.closure.resolved";
pub const CHANNEL_STARTUP_COMPLETED: &str = "tab_group_sync.startup.completed";

static GLOBAL_DIAGNOSTICS_TX: OnceLock<Sender<DiagnosticEvent>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_DIAGNOSTICS_TX: std::cell::RefCell<Option<Sender<DiagnosticEvent>>> =
        std::cell::RefCell::new(None);
}

/// Who last touched the group and tab a user just selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectionOrigin {
    pub group_created_remotely: bool,
    pub group_updated_remotely: bool,
    pub tab_created_remotely: bool,
    pub tab_updated_remotely: bool,
}

impl SelectionOrigin {
    pub fn is_any_remote(&self) -> bool {
        self.group_created_remotely
            || self.group_updated_remotely
            || self.tab_created_remotely
            || self.tab_updated_remotely
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    UsageSignal {
        channel_id: &'static str,
    },
    TabSelected {
        origin: SelectionOrigin,
    },
    ProjectionSkipped {
        reason: &'static str,
    },
}

impl DiagnosticEvent {
    fn channel_id(&self) -> &'static str {
        match self {
            Self::UsageSignal { channel_id } => channel_id,
            Self::TabSelected { .. } => CHANNEL_TAB_SELECTED,
            Self::ProjectionSkipped { .. } => CHANNEL_PROJECTION_SKIPPED,
        }
    }
}

pub fn install_global_sender(sender: Sender<DiagnosticEvent>) {
    let _ = GLOBAL_DIAGNOSTICS_TX.set(sender.clone());

    #[cfg(test)]
    {
        TEST_DIAGNOSTICS_TX.with(|slot| {
            *slot.borrow_mut() = Some(sender.clone());
        });
    }
}

pub(crate) fn emit_event(event: DiagnosticEvent) {
    #[cfg(test)]
    {
        let mut event = Some(event);
        TEST_DIAGNOSTICS_TX.with(|slot| {
            if let Some(tx) = slot.borrow().as_ref()
                && let Some(payload) = event.take()
            {
                let _ = tx.send(payload);
            }
        });
        if let Some(payload) = event
            && let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get()
        {
            let _ = tx.send(payload);
        }
    }

    #[cfg(not(test))]
    {
        if let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get() {
            let _ = tx.send(event);
        }
    }
}

pub(crate) fn emit_usage(channel_id: &'static str) {
    emit_event(DiagnosticEvent::UsageSignal { channel_id });
}

pub(crate) fn emit_skipped(reason: &'static str) {
    log::debug!("tab group sync: skipped projection ({reason})");
    emit_event(DiagnosticEvent::ProjectionSkipped { reason });
}

#[derive(Debug)]
pub struct DiagnosticsState {
    event_tx: Sender<DiagnosticEvent>,
    event_rx: Receiver<DiagnosticEvent>,
    event_ring: VecDeque<DiagnosticEvent>,
    last_drain_at: Instant,
    drain_interval: Duration,
    message_counts: HashMap<&'static str, u64>,
    skip_reasons: HashMap<&'static str, u64>,
    remote_origin_selections: u64,
}

impl Default for DiagnosticsState {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsState {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        install_global_sender(event_tx.clone());
        Self {
            event_tx,
            event_rx,
            event_ring: VecDeque::new(),
            last_drain_at: Instant::now(),
            drain_interval: Duration::from_millis(100),
            message_counts: HashMap::new(),
            skip_reasons: HashMap::new(),
            remote_origin_selections: 0,
        }
    }

    pub fn sender(&self) -> Sender<DiagnosticEvent> {
        self.event_tx.clone()
    }

    /// Drains at most ten times a second.
    pub fn tick_drain(&mut self) {
        if self.last_drain_at.elapsed() < self.drain_interval {
            return;
        }
        self.drain_now();
    }

    pub fn drain_now(&mut self) {
        self.last_drain_at = Instant::now();
        while let Ok(event) = self.event_rx.try_recv() {
            self.aggregate_event(&event);
            self.event_ring.push_back(event);
            while self.event_ring.len() > 512 {
                self.event_ring.pop_front();
            }
        }
    }

    fn aggregate_event(&mut self, event: &DiagnosticEvent) {
        *self.message_counts.entry(event.channel_id()).or_default() += 1;
        match event {
            DiagnosticEvent::TabSelected { origin } if origin.is_any_remote() => {
                self.remote_origin_selections += 1;
            }
            DiagnosticEvent::ProjectionSkipped { reason } => {
                *self.skip_reasons.entry(reason).or_default() += 1;
            }
            _ => {}
        }
    }

    pub fn count(&self, channel_id: &str) -> u64 {
        self.message_counts.get(channel_id).copied().unwrap_or(0)
    }

    pub fn skip_count(&self, reason: &str) -> u64 {
        self.skip_reasons.get(reason).copied().unwrap_or(0)
    }

    pub fn remote_origin_selections(&self) -> u64 {
        self.remote_origin_selections
    }

    pub fn recent_events(&self) -> impl Iterator<Item = &DiagnosticEvent> {
        self.event_ring.iter()
    }

    /// Aggregates as JSON, for export by the embedder.
    pub fn snapshot_json(&self) -> Value {
        json!({
            "channels": {
                "message_counts": self.message_counts,
                "skip_reasons": self.skip_reasons,
            },
            "remote_origin_selections": self.remote_origin_selections,
            "recent_event_count": self.event_ring.len(),
        })
    }
}
