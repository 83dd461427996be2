// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shared scripted devices and scripted hosts for integration tests.
// Author: Lukas Bower
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use portbus::{
    BusAccess, BusDevice, BusResult, Device, DeviceFault, Host, HostCapabilities, KeyBinding,
    KeyHandler, KeyId, PortBus, PortDescriptor,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// How a scripted answers the accesses it receives.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Claim reads with this byte and writes with `Ack`.
    Claim(u8),
    /// Decline everything.
    Decline,
    /// Return a device fault.
    Fault,
    /// Panic inside the handler.
    Panic,
    /// Answer reads with the host's secondary read of the same port.
    Proxy,
    /// Answer every access with `Ack`, reads included.
    AckAll,
    /// Answer every access with this byte, writes included.
    DataAll(u8),
}

/// Everything a scripted observed, shared with the test body.
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub accesses: Vec<BusAccess>,
    pub ticks: u32,
    pub host_ticks: u32,
    pub resets: u32,
    pub quits: u32,
    pub keys: Vec<KeyId>,
    pub latch: Option<u8>,
}

pub type SharedLog = Rc<RefCell<DeviceLog>>;

/// Configurable test device.
pub struct Scripted {
    name: String,
    ports: Vec<PortDescriptor>,
    reply: Reply,
    claims_key: Option<KeyId>,
    bus: bool,
    fail_init: bool,
    log: SharedLog,
}

impl Scripted {
    pub fn new(name: &str, ports: &[PortDescriptor], reply: Reply) -> (Self, SharedLog) {
        let log = SharedLog::default();
        let scripted = Self {
            name: name.to_owned(),
            ports: ports.to_vec(),
            reply,
            claims_key: None,
            bus: true,
            fail_init: false,
            log: Rc::clone(&log),
        };
        (scripted, log)
    }

    pub fn with_key(mut self, id: KeyId) -> Self {
        self.claims_key = Some(id);
        self
    }

    pub fn without_bus(mut self) -> Self {
        self.bus = false;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }
}

impl Device for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _host: &mut dyn Host) -> Result<Vec<PortDescriptor>, DeviceFault> {
        if self.fail_init {
            return Err(DeviceFault::Failed("scripted refused to start".into()));
        }
        Ok(self.ports.clone())
    }

    fn tick(&mut self, _host: &mut dyn Host) {
        self.log.borrow_mut().ticks += 1;
    }

    fn host_tick(&mut self, _host: &mut dyn Host) {
        self.log.borrow_mut().host_ticks += 1;
    }

    fn reset(&mut self, _host: &mut dyn Host) {
        let mut log = self.log.borrow_mut();
        log.resets += 1;
        log.latch = None;
    }

    fn quit(&mut self, _host: &mut dyn Host) {
        self.log.borrow_mut().quits += 1;
    }

    fn bus_device(&mut self) -> Option<&mut dyn BusDevice> {
        if self.bus {
            Some(self)
        } else {
            None
        }
    }

    fn key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        if self.claims_key.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl BusDevice for Scripted {
    fn access(&mut self, access: BusAccess, host: &mut dyn Host) -> Result<BusResult, DeviceFault> {
        self.log.borrow_mut().accesses.push(access);
        if let BusAccess::Write { value, .. } = access {
            self.log.borrow_mut().latch = Some(value);
        }
        match (self.reply, access) {
            (Reply::Claim(v), BusAccess::Read { .. }) => Ok(BusResult::Data(v)),
            (Reply::Claim(_), BusAccess::Write { .. }) => Ok(BusResult::Ack),
            (Reply::Decline, _) => Ok(BusResult::NotHandled),
            (Reply::Fault, _) => Err(DeviceFault::Failed("scripted fault".into())),
            (Reply::Panic, _) => panic!("scripted panic"),
            (Reply::Proxy, BusAccess::Read { address }) => {
                Ok(BusResult::Data(host.secondary_read(address)))
            }
            (Reply::Proxy, BusAccess::Write { .. }) => Ok(BusResult::NotHandled),
            (Reply::AckAll, _) => Ok(BusResult::Ack),
            (Reply::DataAll(v), _) => Ok(BusResult::Data(v)),
        }
    }
}

impl KeyHandler for Scripted {
    fn key_event(&mut self, id: KeyId, _host: &mut dyn Host) -> bool {
        self.log.borrow_mut().keys.push(id);
        self.claims_key == Some(id)
    }
}

/// Host whose secondary reads can loop back into a bus.
pub struct ScriptHost<'a> {
    pub bus: Option<&'a PortBus>,
    pub caps: HostCapabilities,
    pub default_read: u8,
    pub secondary_reads: Vec<u16>,
    pub bindings: Vec<KeyBinding>,
}

impl<'a> ScriptHost<'a> {
    pub fn new() -> Self {
        Self {
            bus: None,
            caps: HostCapabilities::all(),
            default_read: 0xbf,
            secondary_reads: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Host that routes secondary reads back through `bus`.
    pub fn looping(bus: &'a PortBus) -> Self {
        Self {
            bus: Some(bus),
            ..Self::new()
        }
    }

    /// A read as the emulated CPU would perform it: bus first, then default.
    pub fn cpu_read(&mut self, address: u16) -> u8 {
        let default = self.default_read;
        let bus = self.bus;
        match bus {
            Some(bus) => bus.dispatch(BusAccess::read(address), self).or_default(default),
            None => default,
        }
    }
}

impl Host for ScriptHost<'_> {
    fn secondary_read(&mut self, address: u16) -> u8 {
        self.secondary_reads.push(address);
        self.cpu_read(address)
    }

    fn register_key(&mut self, binding: KeyBinding) {
        self.bindings.push(binding);
    }

    fn capabilities(&self) -> HostCapabilities {
        self.caps
    }
}
