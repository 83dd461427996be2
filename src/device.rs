// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Plugin contract every emulated peripheral implements.
// Author: Lukas Bower

//! Device plugin contract.
//!
//! A device always implements [`Device`] and opts into the capabilities it
//! needs by returning them from [`Device::bus_device`] and
//! [`Device::key_handler`]. The bus queries those accessors instead of
//! assuming a device answers every kind of call.

use bitflags::bitflags;

use crate::access::{BusAccess, BusResult};
use crate::error::DeviceFault;
use crate::host::{Host, KeyId};
use crate::port::PortDescriptor;

bitflags! {
    /// Capabilities a device exposes to the bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Answers port accesses.
        const BUS  = 0b01;
        /// Answers key events.
        const KEYS = 0b10;
    }
}

/// Lifecycle hooks of an attached device.
///
/// Hooks other than `initialize` have no-op defaults.
pub trait Device {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Set up private state and return the ports to observe.
    ///
    /// Runs once. The returned list is fixed for the device's lifetime.
    fn initialize(&mut self, host: &mut dyn Host) -> Result<Vec<PortDescriptor>, DeviceFault>;

    /// Per-frame work. Must not block.
    fn tick(&mut self, _host: &mut dyn Host) {}

    /// Lower-frequency work that may touch the host outside the bus.
    fn host_tick(&mut self, _host: &mut dyn Host) {}

    /// Clear latches back to the freshly initialised state.
    fn reset(&mut self, _host: &mut dyn Host) {}

    /// Release external resources.
    fn quit(&mut self, _host: &mut dyn Host) {}

    /// Port access capability.
    fn bus_device(&mut self) -> Option<&mut dyn BusDevice> {
        None
    }

    /// Key event capability.
    fn key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        None
    }
}

/// A device that answers port accesses.
pub trait BusDevice {
    /// Claim or decline `access`.
    ///
    /// Return [`BusResult::NotHandled`] for anything the device does not
    /// own, including accesses it only inspects. An `Err` is treated as a
    /// decline by the bus.
    fn access(&mut self, access: BusAccess, host: &mut dyn Host) -> Result<BusResult, DeviceFault>;
}

/// A device that answers key bindings it registered.
pub trait KeyHandler {
    /// Return `true` to claim the key event and stop propagation.
    fn key_event(&mut self, id: KeyId, host: &mut dyn Host) -> bool;
}

/// Report which capabilities `device` exposes.
pub fn capabilities_of(device: &mut dyn Device) -> Capabilities {
    let mut caps = Capabilities::empty();
    if device.bus_device().is_some() {
        caps |= Capabilities::BUS;
    }
    if device.key_handler().is_some() {
        caps |= Capabilities::KEYS;
    }
    caps
}
