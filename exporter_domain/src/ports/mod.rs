// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The two seams infrastructure implements against: the vendor API façade
//! and the collector contract itself.

mod collector;
mod upstream_api;

pub use collector::Collector;
pub use upstream_api::UpstreamApi;
