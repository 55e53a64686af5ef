// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Database operations built on the walker and the boolean evaluator

pub mod bounds;
pub mod combine;
pub mod walk;

pub use bounds::{bounds, BoundsOptions, BoundsReport};
pub use combine::{combine, CombineOptions, CombineReport};
pub use walk::{walk, WalkReport};
