// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Boundary the emulation host implements for attached devices.
// Author: Lukas Bower

//! Host adapter boundary.
//!
//! The host owns the real bus and the frame loop. Devices never store a
//! reference to it: every lifecycle and handler call receives the host as an
//! argument, so tests inject a fake one.

use bitflags::bitflags;

bitflags! {
    /// Services a host offers, fixed at startup instead of queried per call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCapabilities: u8 {
        /// `secondary_read` reaches real port state.
        const SECONDARY_READ = 0b0000_0001;
        /// `register_key` bindings are delivered back as key events.
        const HOTKEYS        = 0b0000_0010;
    }
}

bitflags! {
    /// Modifier half of a key chord.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Control.
        const CTRL  = 0b0001;
        /// Shift.
        const SHIFT = 0b0010;
        /// Alt / Option.
        const ALT   = 0b0100;
        /// Meta / Windows / Command.
        const META  = 0b1000;
    }
}

/// Opaque identifier a device attaches to a key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(pub u32);

/// Modifier-and-key chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    /// Held modifiers.
    pub modifiers: Modifiers,
    /// Host key code of the non-modifier key.
    pub key: u16,
}

/// A chord plus the id the host reports when the chord is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    /// Chord to watch for.
    pub chord: KeyChord,
    /// Id delivered to [`crate::KeyHandler::key_event`].
    pub id: KeyId,
}

/// Services the core consumes from the emulation host.
pub trait Host {
    /// Read the host's own value of `address`, as if no device were present.
    ///
    /// May be called from inside a device handler. A host that routes this
    /// back through the bus relies on the per-device reentrancy guard.
    fn secondary_read(&mut self, address: u16) -> u8;

    /// Ask the host to report `binding.id` when the chord is pressed.
    fn register_key(&mut self, binding: KeyBinding);

    /// Services this host provides.
    fn capabilities(&self) -> HostCapabilities;
}

/// Host with no bus behind it.
///
/// Secondary reads see a floating bus (`0xff`); key bindings are kept for
/// inspection but never fire.
#[derive(Debug, Default)]
pub struct NullHost {
    bindings: Vec<KeyBinding>,
}

/// Value of an undriven data bus.
pub const FLOATING_BUS: u8 = 0xff;

impl NullHost {
    /// Create a detached host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings devices asked for so far.
    #[must_use]
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }
}

impl Host for NullHost {
    fn secondary_read(&mut self, _address: u16) -> u8 {
        FLOATING_BUS
    }

    fn register_key(&mut self, binding: KeyBinding) {
        self.bindings.push(binding);
    }

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::empty()
    }
}
