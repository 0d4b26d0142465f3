/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Owns the sync engine for one window.
//!
//! The controller holds both collaborators, both observers and their gates.
//! Notifications are pulled from the collaborators' outboxes by `pump` and
//! dispatched one at a time. While a projection runs in one direction, the
//! opposite observer is suspended and whatever the projection emits is drained
//! through it (and dropped) before the suspension ends. Notifications that were
//! already queued when the projection started are kept for later.
//!
//! Startup reconciliation runs once, after both sides reported `Initialized`
//! and everything queued before that point was drained. Observation starts
//! only then.

use std::collections::VecDeque;

use crate::config::SyncPreferences;
use crate::diagnostics;
use crate::model::tab_model::{TabModel, TabModelEvent};
use crate::model::{LocalTabGroupId, OpeningSource, SyncId};
use crate::services::tab_group_sync::{SyncServiceEvent, TabGroupSyncService};
use crate::sync::SyncContext;
use crate::sync::local_mutation;
use crate::sync::local_observer::TabGroupSyncLocalObserver;
use crate::sync::navigation_tracker::NavigationTracker;
use crate::sync::observation_gate::ObservationGate;
use crate::sync::remote_mutation::RemoteTabGroupMutationHelper;
use crate::sync::remote_observer::TabGroupSyncRemoteObserver;
use crate::sync::startup;
use crate::sync::task_queue::{DeferredTask, DeferredTaskQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartupState {
    WaitingForCollaborators,
    Completed,
}

/// Borrowed view over the controller used for one projection.
struct Projection<'a> {
    ctx: SyncContext<'a>,
    remote_mutation: &'a mut RemoteTabGroupMutationHelper,
    local_observer: &'a TabGroupSyncLocalObserver,
    remote_observer: &'a TabGroupSyncRemoteObserver,
}

pub struct TabGroupSyncController<T: TabModel, S: TabGroupSyncService> {
    tab_model: T,
    sync_service: S,
    preferences: SyncPreferences,
    local_gate: ObservationGate,
    remote_gate: ObservationGate,
    local_observer: TabGroupSyncLocalObserver,
    remote_observer: TabGroupSyncRemoteObserver,
    remote_mutation: RemoteTabGroupMutationHelper,
    navigation_tracker: NavigationTracker,
    deferred_tasks: DeferredTaskQueue,
    pending_local_events: VecDeque<TabModelEvent>,
    pending_sync_events: VecDeque<SyncServiceEvent>,
    tab_model_ready: bool,
    sync_service_ready: bool,
    startup: StartupState,
    destroyed: bool,
}

impl<T: TabModel, S: TabGroupSyncService> TabGroupSyncController<T, S> {
    pub fn new(tab_model: T, sync_service: S, preferences: SyncPreferences) -> Self {
        let local_gate = ObservationGate::new("local");
        let remote_gate = ObservationGate::new("remote");
        Self {
            tab_model,
            sync_service,
            preferences,
            local_observer: TabGroupSyncLocalObserver::new(local_gate.clone()),
            remote_observer: TabGroupSyncRemoteObserver::new(remote_gate.clone()),
            local_gate,
            remote_gate,
            remote_mutation: RemoteTabGroupMutationHelper::new(),
            navigation_tracker: NavigationTracker::new(),
            deferred_tasks: DeferredTaskQueue::new(),
            pending_local_events: VecDeque::new(),
            pending_sync_events: VecDeque::new(),
            tab_model_ready: false,
            sync_service_ready: false,
            startup: StartupState::WaitingForCollaborators,
            destroyed: false,
        }
    }

    pub fn tab_model(&self) -> &T {
        &self.tab_model
    }

    /// Direct access for user actions. Call `pump` afterwards so the resulting
    /// notifications are processed.
    pub fn tab_model_mut(&mut self) -> &mut T {
        &mut self.tab_model
    }

    pub fn sync_service(&self) -> &S {
        &self.sync_service
    }

    /// Direct access for store-side changes. Call `pump` afterwards.
    pub fn sync_service_mut(&mut self) -> &mut S {
        &mut self.sync_service
    }

    pub fn preferences(&self) -> &SyncPreferences {
        &self.preferences
    }

    pub fn is_started(&self) -> bool {
        self.startup == StartupState::Completed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn has_pending_closure(&self, group: LocalTabGroupId) -> bool {
        self.remote_mutation.pending_closure(group).is_some()
    }

    pub fn pending_closure_count(&self) -> usize {
        self.remote_mutation.pending_closure_count()
    }

    /// Sync-started navigations whose completion has not been seen yet.
    pub fn pending_sync_navigation_count(&self) -> usize {
        self.navigation_tracker.pending_count()
    }

    pub fn into_parts(self) -> (T, S) {
        (self.tab_model, self.sync_service)
    }

    /// Delivers a tab model notification that did not go through the outbox.
    pub fn on_tab_model_event(&mut self, event: TabModelEvent) {
        if self.destroyed {
            return;
        }
        self.pending_local_events.push_back(event);
        self.pump();
    }

    /// Delivers a store notification that did not go through the outbox.
    pub fn on_sync_service_event(&mut self, event: SyncServiceEvent) {
        if self.destroyed {
            return;
        }
        self.pending_sync_events.push_back(event);
        self.pump();
    }

    /// Processes queued notifications, startup and deferred tasks until
    /// nothing is left to do.
    pub fn pump(&mut self) {
        if self.destroyed {
            self.tab_model.take_events();
            self.sync_service.take_events();
            return;
        }
        loop {
            self.collect_outboxes();
            if let Some(event) = self.pending_local_events.pop_front() {
                self.dispatch_tab_model_event(event);
                continue;
            }
            if let Some(event) = self.pending_sync_events.pop_front() {
                self.dispatch_sync_event(event);
                continue;
            }
            if self.maybe_run_startup() {
                continue;
            }
            if self.deferred_tasks.is_empty() {
                break;
            }
            for task in self.deferred_tasks.drain_ready() {
                self.run_deferred_task(task);
            }
        }
    }

    /// Opens a saved group in this window on explicit user request.
    pub fn open_tab_group(&mut self, sync_id: SyncId) -> Option<LocalTabGroupId> {
        if self.destroyed {
            return None;
        }
        let Some(group) = self.sync_service.get_group(sync_id) else {
            log::debug!("open_tab_group: unknown {sync_id}");
            return None;
        };
        if let Some(local_id) = group.local_group_id {
            log::debug!("open_tab_group: {sync_id} already open as {local_id}");
            return None;
        }
        let mut opened = None;
        self.with_local_observation_suspended(|this| {
            let mut projection = this.projection();
            opened = local_mutation::create_new_tab_group(
                &mut projection.ctx,
                &group,
                OpeningSource::OpenedFromRevisitUi,
            );
        });
        self.pump();
        opened
    }

    /// Stops observing for good. Pending closures and deferred work are
    /// dropped; later calls into the controller do nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.local_gate.shut_down();
        self.remote_gate.shut_down();
        self.remote_mutation.clear();
        self.deferred_tasks.clear();
        self.navigation_tracker.clear();
        self.pending_local_events.clear();
        self.pending_sync_events.clear();
        log::info!("tab group sync controller destroyed");
    }

    fn projection(&mut self) -> Projection<'_> {
        let Self {
            tab_model,
            sync_service,
            preferences,
            navigation_tracker,
            deferred_tasks,
            remote_mutation,
            local_observer,
            remote_observer,
            ..
        } = self;
        Projection {
            ctx: SyncContext {
                tab_model,
                sync_service,
                navigation_tracker,
                deferred_tasks,
                preferences,
            },
            remote_mutation,
            local_observer,
            remote_observer,
        }
    }

    fn collect_outboxes(&mut self) {
        self.pending_local_events.extend(self.tab_model.take_events());
        self.pending_sync_events
            .extend(self.sync_service.take_events());
    }

    fn dispatch_tab_model_event(&mut self, event: TabModelEvent) {
        if matches!(event, TabModelEvent::Initialized) {
            self.tab_model_ready = true;
            return;
        }
        self.with_remote_observation_suspended(|this| this.route_tab_model_event(event));
    }

    fn dispatch_sync_event(&mut self, event: SyncServiceEvent) {
        if matches!(event, SyncServiceEvent::Initialized) {
            self.sync_service_ready = true;
            return;
        }
        self.with_local_observation_suspended(|this| this.route_sync_event(event));
    }

    fn route_tab_model_event(&mut self, event: TabModelEvent) {
        if matches!(event, TabModelEvent::Initialized) {
            self.tab_model_ready = true;
            return;
        }
        let mut projection = self.projection();
        projection
            .local_observer
            .on_event(event, &mut projection.ctx, projection.remote_mutation);
    }

    fn route_sync_event(&mut self, event: SyncServiceEvent) {
        if matches!(event, SyncServiceEvent::Initialized) {
            self.sync_service_ready = true;
            return;
        }
        let mut projection = self.projection();
        projection
            .remote_observer
            .on_event(event, &mut projection.ctx);
    }

    /// Runs `f` with the local observer suspended. Tab model notifications
    /// emitted by `f` are routed (and dropped) before observation resumes.
    fn with_local_observation_suspended(&mut self, f: impl FnOnce(&mut Self)) {
        self.pending_local_events
            .extend(self.tab_model.take_events());
        let suspended = self.local_gate.suspend();
        f(self);
        for event in self.tab_model.take_events() {
            self.route_tab_model_event(event);
        }
        drop(suspended);
    }

    /// Mirror of `with_local_observation_suspended` for store notifications.
    fn with_remote_observation_suspended(&mut self, f: impl FnOnce(&mut Self)) {
        self.pending_sync_events
            .extend(self.sync_service.take_events());
        let suspended = self.remote_gate.suspend();
        f(self);
        for event in self.sync_service.take_events() {
            self.route_sync_event(event);
        }
        drop(suspended);
    }

    fn maybe_run_startup(&mut self) -> bool {
        if self.startup == StartupState::Completed
            || !self.tab_model_ready
            || !self.sync_service_ready
        {
            return false;
        }
        self.startup = StartupState::Completed;
        self.run_startup_pass();
        self.local_gate.open();
        self.remote_gate.open();
        log::info!(
            "tab group sync started with {} local groups",
            self.tab_model.group_ids().len()
        );
        true
    }

    fn run_startup_pass(&mut self) {
        self.with_local_observation_suspended(|this| {
            this.with_remote_observation_suspended(|this| {
                let projection = this.projection();
                let Projection {
                    mut ctx,
                    remote_mutation,
                    ..
                } = projection;
                startup::initialize_tab_group_sync(&mut ctx, remote_mutation);
            });
        });
    }

    fn run_deferred_task(&mut self, task: DeferredTask) {
        match task {
            DeferredTask::ReconcileRestoredGroup {
                local_group_id,
                sync_id,
            } => self.with_local_observation_suspended(|this| {
                let mut projection = this.projection();
                let ctx = &mut projection.ctx;
                let Some(group) = ctx.sync_service.get_group_by_local_id(local_group_id) else {
                    diagnostics::emit_skipped("restored group was deleted remotely");
                    return;
                };
                if group.sync_id != sync_id {
                    diagnostics::emit_skipped("restored group was remapped");
                    return;
                }
                local_mutation::update_tab_group(ctx, &group);
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn run_startup_pass_for_tests(&mut self) {
        self.run_startup_pass();
        self.pump();
    }

    #[cfg(test)]
    pub(crate) fn post_deferred_task_for_tests(&mut self, task: DeferredTask) {
        self.deferred_tasks.post(task);
    }
}
