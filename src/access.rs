// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Transient bus access and claim/decline outcome values.
// Author: Lukas Bower

//! Bus access values.

use std::fmt;

use crate::port::{Direction, PortDescriptor};

/// One read or write transaction on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAccess {
    /// Read a byte from `address`.
    Read {
        /// Port address.
        address: u16,
    },
    /// Write `value` to `address`.
    Write {
        /// Port address.
        address: u16,
        /// Byte driven onto the bus.
        value: u8,
    },
}

impl BusAccess {
    /// Build a read access.
    pub const fn read(address: u16) -> Self {
        Self::Read { address }
    }

    /// Build a write access.
    pub const fn write(address: u16, value: u8) -> Self {
        Self::Write { address, value }
    }

    /// Port address of the access.
    #[must_use]
    pub const fn address(&self) -> u16 {
        match *self {
            Self::Read { address } | Self::Write { address, .. } => address,
        }
    }

    /// Direction of the access.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Read { .. } => Direction::Read,
            Self::Write { .. } => Direction::Write,
        }
    }

    /// Descriptor a device must hold to observe this access.
    #[must_use]
    pub const fn port(&self) -> PortDescriptor {
        PortDescriptor {
            address: self.address(),
            direction: self.direction(),
        }
    }
}

impl fmt::Display for BusAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { address } => write!(f, "IN {:#06x}", address),
            Self::Write { address, value } => write!(f, "OUT {:#06x},{:#04x}", address, value),
        }
    }
}

/// Outcome of offering an access to a device, or to the whole bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusResult {
    /// A read was claimed; the byte is the answer.
    Data(u8),
    /// A write was claimed.
    Ack,
    /// Declined; the host applies its default handling.
    NotHandled,
}

impl BusResult {
    /// True when some device claimed the access.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self, Self::NotHandled)
    }

    /// Byte returned by a claimed read.
    #[must_use]
    pub const fn data(&self) -> Option<u8> {
        match *self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Resolve a read against the host default used on fallthrough.
    #[must_use]
    pub const fn or_default(self, default: u8) -> u8 {
        match self {
            Self::Data(value) => value,
            _ => default,
        }
    }
}
