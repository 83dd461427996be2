// Copyright © 2026 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Bundled device implementations.
// Author: Lukas Bower

//! Devices shipped with the crate.

pub mod passthrough;

pub use passthrough::PassThrough;
