// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Crate root for the port-mapped I/O device plugin core.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Port-mapped I/O device plugin core.
//!
//! Emulated peripherals attach to a [`PortBus`], declare the ports they
//! observe during initialisation, and then claim or decline each access the
//! host routes through the bus. Declined accesses fall through to the host's
//! own handling. The host is passed into every call through the [`Host`]
//! trait; nothing in the crate stores it.

pub mod access;
pub mod bus;
pub mod config;
pub mod device;
pub mod devices;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod port;

pub use access::{BusAccess, BusResult};
pub use bus::{BusStats, DeviceId, PortBus};
pub use config::{load_active, BusConfig, ConfigError, PassThroughConfig, PortbusConfig};
pub use device::{BusDevice, Capabilities, Device, KeyHandler};
pub use error::{ContractViolation, DeviceFault};
pub use host::{Host, HostCapabilities, KeyBinding, KeyChord, KeyId, Modifiers, NullHost};
pub use lifecycle::Phase;
pub use port::{Direction, PortDescriptor};
