// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Collectors
//!
//! The application layer: concrete `Collector` implementations registered
//! with the Collector Registry (C2) at startup. Each owns a slice of the
//! metric catalog declared data-first in its `register_metrics`, per §1's
//! "the catalog ... is data, not logic" — this workspace implements a
//! representative slice of it (organization, network, and two device
//! families) rather than the vendor's full ~200-name catalog, which is
//! explicitly out of scope for the core (§1).
//!
//! `device` holds the canonical coordinator example (§4.4): `DeviceCollector`
//! lists devices once per organization, groups them by product family, and
//! dispatches to family sub-collectors in registration order, all sharing
//! the cycle's inventory handle.

pub mod device;
pub mod network;
pub mod organization;
pub mod traffic_history;

pub use device::DeviceCollector;
pub use network::NetworkCollector;
pub use organization::OrganizationCollector;
pub use traffic_history::TrafficHistoryCollector;
