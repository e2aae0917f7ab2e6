// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI subsystem: colored reporting and parameter sweeps

pub mod reporter;
pub mod sweep;

pub use reporter::Reporter;
pub use sweep::{run_sweep, SweepSummary};
