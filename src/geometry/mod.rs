// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - polygons, BSP booleans and the region model

pub mod bbox;
pub mod bsp;
pub mod model;
pub mod polygon;
pub mod primitives;

pub use bbox::BoundingBox;
pub use model::{Model, Region, RegionHandle, RegionId};
pub use polygon::{Plane, Polygon};
pub use primitives::PrimitiveOps;
