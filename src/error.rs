// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Error taxonomy for device contracts and handler faults.
// Author: Lukas Bower

//! Errors surfaced by the bus core.
//!
//! [`ContractViolation`] is the only error that crosses the core boundary.
//! [`DeviceFault`] is reported by device code and absorbed by dispatch.

use thiserror::Error;

use crate::access::{BusAccess, BusResult};

/// Misuse of the device lifecycle by the host. Always fatal to the call.
#[derive(Debug, Error)]
pub enum ContractViolation {
    /// The device was used before `initialize` completed.
    #[error("device {device} used before initialize")]
    NotInitialized {
        /// Device name.
        device: String,
    },
    /// `initialize` was called a second time.
    #[error("device {device} initialized twice")]
    AlreadyInitialized {
        /// Device name.
        device: String,
    },
    /// The device was used after `quit`.
    #[error("device {device} used after quit")]
    Terminated {
        /// Device name.
        device: String,
    },
    /// No device is attached under the given id.
    #[error("no device attached as #{0}")]
    UnknownDevice(usize),
    /// The device could not complete its own initialisation.
    #[error("device {device} failed to initialize: {source}")]
    InitializeFailed {
        /// Device name.
        device: String,
        /// Fault reported by the device.
        #[source]
        source: DeviceFault,
    },
}

/// Failure inside device code while it serves a call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceFault {
    /// The handler answered with a reply of the wrong kind for the access.
    #[error("{reply:?} does not answer {access}")]
    MismatchedReply {
        /// Access the handler was offered.
        access: BusAccess,
        /// Reply it returned.
        reply: BusResult,
    },
    /// Device-specific failure.
    #[error("{0}")]
    Failed(String),
    /// The handler panicked and was unwound at the device boundary.
    #[error("handler panicked: {0}")]
    Panicked(String),
}
