// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. Log lines carry the
//! correlation fields §7 requires (`collector`, `category`, `tier`, `cycle`)
//! via `tracing` spans opened by the scheduler and pipeline, not via ad-hoc
//! string formatting — so no secret (API key, credentialed URL) ever reaches
//! a log line through string interpolation of config values.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
