// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Per-device lifecycle phases and their legal transitions.
// Author: Lukas Bower

//! Device lifecycle state machine.
//!
//! `Uninitialized -> Initialized -> Running -> ShuttingDown -> Terminated`.
//! Reset, tick and key events are self-transitions of a live device.

use std::cell::Cell;
use std::fmt;

use crate::error::ContractViolation;

/// Lifecycle phase of one attached device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Attached, descriptors not yet registered.
    Uninitialized,
    /// Descriptors registered; the bus may route to the device.
    Initialized,
    /// Ticking.
    Running,
    /// Inside the device's own quit hook.
    ShuttingDown,
    /// Gone. Every further call is a contract violation.
    Terminated,
}

impl Phase {
    /// Whether the bus may route accesses to a device in this phase.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Initialized | Self::Running)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Phase gate for a single device.
///
/// Held in a `Cell` so the dispatch path can check it through a shared
/// reference while lifecycle calls mutate it through `&mut`.
#[derive(Debug)]
pub struct Lifecycle {
    device: String,
    phase: Cell<Phase>,
}

impl Lifecycle {
    /// New gate in [`Phase::Uninitialized`].
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            phase: Cell::new(Phase::Uninitialized),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Check that `initialize` may run.
    pub fn begin_initialize(&self) -> Result<(), ContractViolation> {
        match self.phase() {
            Phase::Uninitialized => Ok(()),
            Phase::ShuttingDown | Phase::Terminated => Err(self.terminated()),
            Phase::Initialized | Phase::Running => Err(ContractViolation::AlreadyInitialized {
                device: self.device.clone(),
            }),
        }
    }

    /// Record a completed `initialize`.
    pub fn finish_initialize(&self) {
        self.phase.set(Phase::Initialized);
    }

    /// Require a live device.
    pub fn ensure_live(&self) -> Result<(), ContractViolation> {
        match self.phase() {
            Phase::Initialized | Phase::Running => Ok(()),
            Phase::Uninitialized => Err(ContractViolation::NotInitialized {
                device: self.device.clone(),
            }),
            Phase::ShuttingDown | Phase::Terminated => Err(self.terminated()),
        }
    }

    /// `Initialized -> Running`; a running device stays running.
    pub fn start(&self) -> Result<(), ContractViolation> {
        self.ensure_live()?;
        self.phase.set(Phase::Running);
        Ok(())
    }

    /// `live -> ShuttingDown`.
    pub fn begin_quit(&self) -> Result<(), ContractViolation> {
        self.ensure_live()?;
        self.phase.set(Phase::ShuttingDown);
        Ok(())
    }

    /// `ShuttingDown -> Terminated`.
    pub fn finish_quit(&self) {
        self.phase.set(Phase::Terminated);
    }

    fn terminated(&self) -> ContractViolation {
        ContractViolation::Terminated {
            device: self.device.clone(),
        }
    }
}
