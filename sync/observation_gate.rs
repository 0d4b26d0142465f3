/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! On/off switch shared between the controller and one observer.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub(crate) struct ObservationGate {
    name: &'static str,
    open: Rc<Cell<bool>>,
    shut_down: Rc<Cell<bool>>,
}

impl ObservationGate {
    /// Gates start closed; the controller opens them once startup has run.
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            open: Rc::new(Cell::new(false)),
            shut_down: Rc::new(Cell::new(false)),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.get() && !self.shut_down.get()
    }

    pub(crate) fn open(&self) {
        self.open.set(true);
    }

    /// Closes the gate until the returned guard drops, then restores the
    /// previous state. Nested suspensions unwind in order.
    pub(crate) fn suspend(&self) -> SuspendedObservation {
        let previous = self.open.replace(false);
        SuspendedObservation {
            open: Rc::clone(&self.open),
            previous,
        }
    }

    /// Closes the gate for good. Guards still alive cannot reopen it.
    pub(crate) fn shut_down(&self) {
        self.shut_down.set(true);
    }
}

#[must_use = "observation resumes as soon as the guard is dropped"]
pub(crate) struct SuspendedObservation {
    open: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for SuspendedObservation {
    fn drop(&mut self) {
        self.open.set(self.previous);
    }
}
