// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: TOML configuration for the bus and the pass-through device.
// Author: Lukas Bower

//! Configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [bus]
//! catch_panics = true
//!
//! [passthrough]
//! latch_ports = [0x103b, 0x113b]
//! contested_port = 0xfe
//! hotkey = { key = 0x74, modifiers = ["ctrl", "shift"], id = 0 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::host::{KeyBinding, KeyChord, KeyId, Modifiers};

/// Environment variable naming the configuration file for [`load_active`].
pub const CONFIG_ENV: &str = "PORTBUS_CONFIG";

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A hotkey names a modifier that does not exist.
    #[error("unknown key modifier {0:?}")]
    UnknownModifier(String),
}

/// Settings for [`crate::PortBus`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Unwind handler panics at the device boundary instead of aborting
    /// the dispatch.
    pub catch_panics: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { catch_panics: true }
    }
}

/// Hotkey as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotkeyConfig {
    /// Host key code.
    pub key: u16,
    /// Modifier names, case-insensitive: `ctrl`, `shift`, `alt`, `meta`.
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Id reported back when the chord is pressed.
    #[serde(default)]
    pub id: u32,
}

impl HotkeyConfig {
    /// Resolve modifier names into a key binding.
    pub fn binding(&self) -> Result<KeyBinding, ConfigError> {
        let mut modifiers = Modifiers::empty();
        for name in &self.modifiers {
            let flag = Modifiers::from_name(&name.to_ascii_uppercase())
                .ok_or_else(|| ConfigError::UnknownModifier(name.clone()))?;
            modifiers |= flag;
        }
        Ok(KeyBinding {
            chord: KeyChord {
                modifiers,
                key: self.key,
            },
            id: KeyId(self.id),
        })
    }
}

/// Settings for [`crate::devices::PassThrough`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PassThroughConfig {
    /// Write ports the device claims and latches.
    pub latch_ports: Vec<u16>,
    /// Port the device observes without owning.
    pub contested_port: u16,
    /// Optional hotkey registered with the host.
    pub hotkey: Option<HotkeyConfig>,
}

impl Default for PassThroughConfig {
    fn default() -> Self {
        Self {
            latch_ports: vec![0x103b, 0x113b],
            contested_port: 0xfe,
            hotkey: Some(HotkeyConfig {
                key: 0x74,
                modifiers: vec!["ctrl".into(), "shift".into()],
                id: 0,
            }),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortbusConfig {
    /// Bus settings.
    pub bus: BusConfig,
    /// Pass-through device settings.
    pub passthrough: PassThroughConfig,
}

impl PortbusConfig {
    /// Parse configuration text and validate hotkey modifiers.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        if let Some(hotkey) = &cfg.passthrough.hotkey {
            hotkey.binding()?;
        }
        Ok(cfg)
    }

    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Load the file named by `PORTBUS_CONFIG`, or the defaults.
///
/// A missing variable selects the defaults silently. An unreadable or
/// invalid file also selects the defaults, with a warning.
pub fn load_active() -> PortbusConfig {
    let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) else {
        return PortbusConfig::default();
    };
    match PortbusConfig::load(&path) {
        Ok(cfg) => {
            info!("config: loaded {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("config: using defaults: {}", e);
            PortbusConfig::default()
        }
    }
}
