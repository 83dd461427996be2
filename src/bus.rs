// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Route port accesses to attached devices and gate their lifecycle.
// Author: Lukas Bower

//! Bus dispatch core.
//!
//! [`PortBus`] owns every attached device together with its lifecycle gate
//! and reentrancy flag, plus the routing table built while devices
//! initialise. An access is offered to the subscribers of its
//! `(address, direction)` in registration order; the first device to claim
//! it wins and everything else falls through to the host.
//!
//! `dispatch` and `handle` borrow the bus shared so a host can route a
//! secondary read from inside a handler back into the same bus. A device
//! already inside its handler is skipped on such a nested access: nesting
//! is capped at depth one. Lifecycle calls borrow the bus exclusively, so a
//! device is never ticked while one of its handlers is on the stack.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, trace, warn};

use crate::access::{BusAccess, BusResult};
use crate::config::BusConfig;
use crate::device::{capabilities_of, Capabilities, Device};
use crate::error::{ContractViolation, DeviceFault};
use crate::host::{Host, KeyId};
use crate::lifecycle::{Lifecycle, Phase};
use crate::port::{PortDescriptor, PortRegistry};

/// Handle to a device attached to a [`PortBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(usize);

impl DeviceId {
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Attach order of the device, starting at zero.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Snapshot of the dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Calls to [`PortBus::dispatch`], nested ones included.
    pub dispatched: u64,
    /// Dispatches some device claimed.
    pub handled: u64,
    /// Dispatches that fell through to the host.
    pub declined: u64,
    /// Handler errors and panics absorbed at the device boundary.
    pub faults: u64,
    /// Nested accesses skipped by a device's reentrancy guard.
    pub suppressed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: Cell<u64>,
    handled: Cell<u64>,
    declined: Cell<u64>,
    faults: Cell<u64>,
    suppressed: Cell<u64>,
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get().saturating_add(1));
}

/// Holds a device's reentrancy flag for the duration of one handler call.
struct ReentryGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ReentryGuard<'a> {
    /// `None` when the flag is already held further up the stack.
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

struct Slot {
    name: String,
    caps: Capabilities,
    lifecycle: Lifecycle,
    busy: Cell<bool>,
    device: RefCell<Box<dyn Device>>,
}

/// Port-mapped I/O bus shared by a set of devices.
pub struct PortBus {
    slots: Vec<Slot>,
    registry: PortRegistry,
    catch_panics: bool,
    counters: Counters,
}

impl fmt::Debug for PortBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let devices: Vec<(&str, Phase)> = self
            .slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.lifecycle.phase()))
            .collect();
        f.debug_struct("PortBus")
            .field("devices", &devices)
            .field("routes", &self.registry.route_count())
            .finish()
    }
}

impl Default for PortBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PortBus {
    /// Empty bus with default settings.
    pub fn new() -> Self {
        Self::with_config(&BusConfig::default())
    }

    /// Empty bus configured from `config`.
    pub fn with_config(config: &BusConfig) -> Self {
        Self {
            slots: Vec::new(),
            registry: PortRegistry::new(),
            catch_panics: config.catch_panics,
            counters: Counters::default(),
        }
    }

    /// Attach `device` in [`Phase::Uninitialized`].
    ///
    /// Attach order is the order devices are visited on shared ports.
    pub fn attach<D: Device + 'static>(&mut self, device: D) -> DeviceId {
        let mut device: Box<dyn Device> = Box::new(device);
        let caps = capabilities_of(device.as_mut());
        let name = device.name().to_owned();
        let id = DeviceId::from_index(self.slots.len());
        info!("bus: attached {} as {} ({:?})", name, id, caps);
        self.slots.push(Slot {
            lifecycle: Lifecycle::new(name.clone()),
            name,
            caps,
            busy: Cell::new(false),
            device: RefCell::new(device),
        });
        id
    }

    /// Number of attached devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Counters accumulated since the bus was created.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        let c = &self.counters;
        BusStats {
            dispatched: c.dispatched.get(),
            handled: c.handled.get(),
            declined: c.declined.get(),
            faults: c.faults.get(),
            suppressed: c.suppressed.get(),
        }
    }

    fn slot(&self, id: DeviceId) -> Result<&Slot, ContractViolation> {
        self.slots
            .get(id.0)
            .ok_or(ContractViolation::UnknownDevice(id.0))
    }

    fn slot_mut(&mut self, id: DeviceId) -> Result<&mut Slot, ContractViolation> {
        self.slots
            .get_mut(id.0)
            .ok_or(ContractViolation::UnknownDevice(id.0))
    }

    /// Name the device reported at attach time.
    pub fn name(&self, id: DeviceId) -> Result<&str, ContractViolation> {
        Ok(self.slot(id)?.name.as_str())
    }

    /// Current lifecycle phase of `id`.
    pub fn phase(&self, id: DeviceId) -> Result<Phase, ContractViolation> {
        Ok(self.slot(id)?.lifecycle.phase())
    }

    /// Capabilities `id` exposed at attach time.
    pub fn capabilities(&self, id: DeviceId) -> Result<Capabilities, ContractViolation> {
        Ok(self.slot(id)?.caps)
    }

    /// Descriptors `id` registered; empty before initialisation.
    pub fn ports(&self, id: DeviceId) -> Result<&[PortDescriptor], ContractViolation> {
        self.slot(id)?;
        Ok(self.registry.ports(id).unwrap_or(&[]))
    }

    /// Run the device's `initialize` hook and register its descriptors.
    ///
    /// Returns the descriptors as registered. A second call, or a call after
    /// quit, is a contract violation. If the device reports a fault it stays
    /// uninitialised and nothing is registered.
    pub fn initialize(
        &mut self,
        id: DeviceId,
        host: &mut dyn Host,
    ) -> Result<&[PortDescriptor], ContractViolation> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or(ContractViolation::UnknownDevice(id.0))?;
        slot.lifecycle.begin_initialize()?;
        let ports = slot
            .device
            .get_mut()
            .initialize(host)
            .map_err(|source| ContractViolation::InitializeFailed {
                device: slot.name.clone(),
                source,
            })?;
        let count = ports.len();
        self.registry
            .register(id, ports)
            .map_err(|_| ContractViolation::AlreadyInitialized {
                device: slot.name.clone(),
            })?;
        slot.lifecycle.finish_initialize();
        info!("bus: {} initialized with {} port(s)", slot.name, count);
        Ok(self.registry.ports(id).unwrap_or(&[]))
    }

    /// Move an initialised device to [`Phase::Running`].
    pub fn start(&mut self, id: DeviceId) -> Result<(), ContractViolation> {
        let slot = self.slot_mut(id)?;
        if slot.lifecycle.phase() == Phase::Initialized {
            info!("bus: {} running", slot.name);
        }
        slot.lifecycle.start()
    }

    /// Per-frame tick. The first tick starts an initialised device.
    pub fn tick(&mut self, id: DeviceId, host: &mut dyn Host) -> Result<(), ContractViolation> {
        self.start(id)?;
        self.slot_mut(id)?.device.get_mut().tick(host);
        Ok(())
    }

    /// Lower-frequency host tick. Starts an initialised device like `tick`.
    pub fn host_tick(&mut self, id: DeviceId, host: &mut dyn Host) -> Result<(), ContractViolation> {
        self.start(id)?;
        self.slot_mut(id)?.device.get_mut().host_tick(host);
        Ok(())
    }

    /// Clear the device's latches. Its descriptors stay registered.
    pub fn reset(&mut self, id: DeviceId, host: &mut dyn Host) -> Result<(), ContractViolation> {
        let slot = self.slot_mut(id)?;
        slot.lifecycle.ensure_live()?;
        debug!("bus: reset {}", slot.name);
        slot.device.get_mut().reset(host);
        Ok(())
    }

    /// Offer key `key` to one device. `false` tells the host to propagate it.
    pub fn key_event(
        &mut self,
        id: DeviceId,
        key: KeyId,
        host: &mut dyn Host,
    ) -> Result<bool, ContractViolation> {
        let slot = self.slot_mut(id)?;
        slot.lifecycle.ensure_live()?;
        if !slot.caps.contains(Capabilities::KEYS) {
            return Ok(false);
        }
        let claimed = match slot.device.get_mut().key_handler() {
            Some(handler) => handler.key_event(key, host),
            None => false,
        };
        debug!(
            "bus: key {:?} {} by {}",
            key,
            if claimed { "claimed" } else { "declined" },
            slot.name
        );
        Ok(claimed)
    }

    /// Run the device's quit hook. Every later call on `id` is a violation.
    pub fn quit(&mut self, id: DeviceId, host: &mut dyn Host) -> Result<(), ContractViolation> {
        let slot = self.slot_mut(id)?;
        slot.lifecycle.begin_quit()?;
        slot.device.get_mut().quit(host);
        slot.lifecycle.finish_quit();
        info!("bus: {} terminated", slot.name);
        Ok(())
    }

    /// Tick every live device in attach order.
    pub fn tick_all(&mut self, host: &mut dyn Host) {
        for slot in self.slots.iter_mut().filter(|s| s.lifecycle.phase().is_live()) {
            if slot.lifecycle.start().is_ok() {
                slot.device.get_mut().tick(host);
            }
        }
    }

    /// Host-tick every live device in attach order.
    pub fn host_tick_all(&mut self, host: &mut dyn Host) {
        for slot in self.slots.iter_mut().filter(|s| s.lifecycle.phase().is_live()) {
            if slot.lifecycle.start().is_ok() {
                slot.device.get_mut().host_tick(host);
            }
        }
    }

    /// Offer `key` to live key handlers in attach order until one claims it.
    pub fn route_key(&mut self, key: KeyId, host: &mut dyn Host) -> bool {
        for slot in self
            .slots
            .iter_mut()
            .filter(|s| s.lifecycle.phase().is_live() && s.caps.contains(Capabilities::KEYS))
        {
            let claimed = match slot.device.get_mut().key_handler() {
                Some(handler) => handler.key_event(key, host),
                None => false,
            };
            if claimed {
                debug!("bus: key {:?} claimed by {}", key, slot.name);
                return true;
            }
        }
        false
    }

    /// Route `access` to the devices subscribed to its port.
    ///
    /// Subscribers are visited in registration order and the first claim
    /// wins. Devices that decline, fault, are not live, or are already
    /// inside their own handler are passed over. `NotHandled` means the host
    /// applies its default.
    pub fn dispatch(&self, access: BusAccess, host: &mut dyn Host) -> BusResult {
        bump(&self.counters.dispatched);
        for &id in self.registry.subscribers(access.port()) {
            let Some(slot) = self.slots.get(id.0) else {
                continue;
            };
            if !slot.lifecycle.phase().is_live() || !slot.caps.contains(Capabilities::BUS) {
                continue;
            }
            let result = self.visit(slot, access, host);
            if result.is_handled() {
                trace!("bus: {} claimed by {} -> {:?}", access, slot.name, result);
                bump(&self.counters.handled);
                return result;
            }
        }
        trace!("bus: {} falls through", access);
        bump(&self.counters.declined);
        BusResult::NotHandled
    }

    /// Offer `access` to a single device.
    ///
    /// Ports the device did not register are declined without calling it.
    pub fn handle(
        &self,
        id: DeviceId,
        access: BusAccess,
        host: &mut dyn Host,
    ) -> Result<BusResult, ContractViolation> {
        let slot = self.slot(id)?;
        slot.lifecycle.ensure_live()?;
        if !slot.caps.contains(Capabilities::BUS) || !self.registry.subscribes(id, access.port()) {
            return Ok(BusResult::NotHandled);
        }
        Ok(self.visit(slot, access, host))
    }

    fn visit(&self, slot: &Slot, access: BusAccess, host: &mut dyn Host) -> BusResult {
        let Some(_guard) = ReentryGuard::acquire(&slot.busy) else {
            bump(&self.counters.suppressed);
            debug!("bus: nested {} suppressed inside {}", access, slot.name);
            return BusResult::NotHandled;
        };
        let outcome = if self.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| invoke(slot, access, host)))
                .unwrap_or_else(|payload| Err(DeviceFault::Panicked(panic_message(payload.as_ref()))))
        } else {
            invoke(slot, access, host)
        };
        match outcome.and_then(|reply| check_reply(access, reply)) {
            Ok(result) => result,
            Err(fault) => {
                bump(&self.counters.faults);
                warn!("bus: {} faulted on {}: {}", slot.name, access, fault);
                BusResult::NotHandled
            }
        }
    }
}

fn invoke(slot: &Slot, access: BusAccess, host: &mut dyn Host) -> Result<BusResult, DeviceFault> {
    let mut device = slot
        .device
        .try_borrow_mut()
        .map_err(|_| DeviceFault::Failed(format!("{} is already borrowed", slot.name)))?;
    match device.bus_device() {
        Some(handler) => handler.access(access, host),
        None => Ok(BusResult::NotHandled),
    }
}

/// Reads are claimed with `Data`, writes with `Ack`.
fn check_reply(access: BusAccess, reply: BusResult) -> Result<BusResult, DeviceFault> {
    match (access, reply) {
        (BusAccess::Read { .. }, BusResult::Ack) | (BusAccess::Write { .. }, BusResult::Data(_)) => {
            Err(DeviceFault::MismatchedReply { access, reply })
        }
        _ => Ok(reply),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
