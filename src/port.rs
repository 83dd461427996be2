// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Port descriptors and the routing table devices subscribe through.
// Author: Lukas Bower

//! Port registry.
//!
//! Devices declare the `(address, direction)` pairs they want to observe
//! once, during initialisation. The registry keeps each device's list
//! verbatim and builds the routing table the bus consults on every access.
//! Overlap between devices is expected: several listeners may share one
//! control port and are visited in registration order.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::bus::DeviceId;

/// Direction of a port access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    /// CPU reads from the port.
    Read,
    /// CPU writes to the port.
    Write,
}

/// A single `(address, direction)` pair a device subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortDescriptor {
    /// 16-bit port address.
    pub address: u16,
    /// Access direction observed on the address.
    pub direction: Direction,
}

impl PortDescriptor {
    /// Descriptor for reads of `address`.
    pub const fn read(address: u16) -> Self {
        Self {
            address,
            direction: Direction::Read,
        }
    }

    /// Descriptor for writes to `address`.
    pub const fn write(address: u16) -> Self {
        Self {
            address,
            direction: Direction::Write,
        }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Read => "R",
            Direction::Write => "W",
        };
        write!(f, "{:#06x}/{}", self.address, dir)
    }
}

/// Errors raised by [`PortRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// The device already holds a descriptor set.
    AlreadyRegistered,
}

/// Routing table from descriptor to subscribing devices.
#[derive(Debug, Default)]
pub struct PortRegistry {
    routes: BTreeMap<PortDescriptor, Vec<DeviceId>>,
    owned: BTreeMap<DeviceId, Vec<PortDescriptor>>,
}

impl PortRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `descriptors` for `device` and append it to each route.
    ///
    /// A device registers exactly once. Duplicate descriptors are kept in the
    /// device's own list but never add the device to a route twice.
    pub fn register(
        &mut self,
        device: DeviceId,
        descriptors: Vec<PortDescriptor>,
    ) -> Result<(), RegisterError> {
        if self.owned.contains_key(&device) {
            return Err(RegisterError::AlreadyRegistered);
        }
        for port in &descriptors {
            let subscribers = self.routes.entry(*port).or_default();
            if !subscribers.contains(&device) {
                subscribers.push(device);
            }
            debug!("registry: {} subscribed to {}", device, port);
        }
        self.owned.insert(device, descriptors);
        Ok(())
    }

    /// Devices subscribed to `port`, in registration order.
    #[must_use]
    pub fn subscribers(&self, port: PortDescriptor) -> &[DeviceId] {
        self.routes.get(&port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Descriptors `device` registered, exactly as supplied.
    #[must_use]
    pub fn ports(&self, device: DeviceId) -> Option<&[PortDescriptor]> {
        self.owned.get(&device).map(Vec::as_slice)
    }

    /// Whether `device` has registered anything yet.
    #[must_use]
    pub fn is_registered(&self, device: DeviceId) -> bool {
        self.owned.contains_key(&device)
    }

    /// Whether `device` subscribed to `port`.
    #[must_use]
    pub fn subscribes(&self, device: DeviceId, port: PortDescriptor) -> bool {
        self.subscribers(port).contains(&device)
    }

    /// Number of distinct descriptors with at least one subscriber.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
