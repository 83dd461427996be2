// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Inert sample device that latches writes and peeks at a shared port.
// Author: Lukas Bower

//! Pass-through sample device.
//!
//! Claims writes to its latch ports and stores the byte. On the contested
//! port it only looks: writes are remembered and declined so the host still
//! performs them, and reads are answered with whatever the host itself
//! reports through a secondary read.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::access::{BusAccess, BusResult};
use crate::config::{ConfigError, PassThroughConfig};
use crate::device::{BusDevice, Device, KeyHandler};
use crate::error::DeviceFault;
use crate::host::{Host, HostCapabilities, KeyBinding, KeyId};
use crate::port::PortDescriptor;

/// Inert sample peripheral.
#[derive(Debug)]
pub struct PassThrough {
    latch_ports: Vec<u16>,
    contested_port: u16,
    hotkey: Option<KeyBinding>,
    latches: BTreeMap<u16, u8>,
    peeked: Option<u8>,
    frames: u64,
    key_presses: u64,
}

impl PassThrough {
    /// Build the device from its configuration section.
    pub fn new(config: &PassThroughConfig) -> Result<Self, ConfigError> {
        let hotkey = config.hotkey.as_ref().map(|h| h.binding()).transpose()?;
        Ok(Self::with_hotkey(config, hotkey))
    }

    fn with_hotkey(config: &PassThroughConfig, hotkey: Option<KeyBinding>) -> Self {
        Self {
            latch_ports: config.latch_ports.clone(),
            contested_port: config.contested_port,
            hotkey,
            latches: BTreeMap::new(),
            peeked: None,
            frames: 0,
            key_presses: 0,
        }
    }

    /// Last byte latched on `port`.
    #[must_use]
    pub fn latch(&self, port: u16) -> Option<u8> {
        self.latches.get(&port).copied()
    }

    /// Last byte seen written to the contested port.
    #[must_use]
    pub fn peeked(&self) -> Option<u8> {
        self.peeked
    }

    /// Frames ticked since initialisation.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Hotkey presses claimed so far.
    #[must_use]
    pub fn key_presses(&self) -> u64 {
        self.key_presses
    }
}

/// Default ports from [`PassThroughConfig::default`], without a hotkey.
impl Default for PassThrough {
    fn default() -> Self {
        Self::with_hotkey(&PassThroughConfig::default(), None)
    }
}

impl Device for PassThrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn initialize(&mut self, host: &mut dyn Host) -> Result<Vec<PortDescriptor>, DeviceFault> {
        let mut ports: Vec<PortDescriptor> =
            self.latch_ports.iter().copied().map(PortDescriptor::write).collect();
        ports.push(PortDescriptor::write(self.contested_port));
        ports.push(PortDescriptor::read(self.contested_port));
        if let Some(binding) = self.hotkey {
            if host.capabilities().contains(HostCapabilities::HOTKEYS) {
                host.register_key(binding);
            } else {
                debug!("passthrough: host has no hotkeys, {:?} not registered", binding.id);
            }
        }
        Ok(ports)
    }

    fn tick(&mut self, _host: &mut dyn Host) {
        self.frames = self.frames.wrapping_add(1);
    }

    fn reset(&mut self, _host: &mut dyn Host) {
        self.latches.clear();
        self.peeked = None;
        self.frames = 0;
    }

    fn quit(&mut self, _host: &mut dyn Host) {
        self.latches.clear();
        self.peeked = None;
    }

    fn bus_device(&mut self) -> Option<&mut dyn BusDevice> {
        Some(self)
    }

    fn key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        Some(self)
    }
}

impl BusDevice for PassThrough {
    fn access(&mut self, access: BusAccess, host: &mut dyn Host) -> Result<BusResult, DeviceFault> {
        match access {
            BusAccess::Write { address, value } if address == self.contested_port => {
                self.peeked = Some(value);
                Ok(BusResult::NotHandled)
            }
            BusAccess::Read { address } if address == self.contested_port => {
                if !host.capabilities().contains(HostCapabilities::SECONDARY_READ) {
                    return Ok(BusResult::NotHandled);
                }
                let value = host.secondary_read(address);
                trace!("passthrough: proxied {:#06x} -> {:#04x}", address, value);
                Ok(BusResult::Data(value))
            }
            BusAccess::Write { address, value } if self.latch_ports.contains(&address) => {
                self.latches.insert(address, value);
                Ok(BusResult::Ack)
            }
            _ => Ok(BusResult::NotHandled),
        }
    }
}

impl KeyHandler for PassThrough {
    fn key_event(&mut self, id: KeyId, _host: &mut dyn Host) -> bool {
        match self.hotkey {
            Some(binding) if binding.id == id => {
                self.key_presses = self.key_presses.wrapping_add(1);
                true
            }
            _ => false,
        }
    }
}
