// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! booltree
//!
//! Walks the assembly DAG of a solid-geometry database, collects one boolean
//! operator tree per region, and evaluates expressions over database objects
//! into new B-rep objects.
//!
//! ```no_run
//! use booltree::config::EngineConfig;
//! use booltree::csg::CombineRequest;
//! use booltree::db::Database;
//! use booltree::ops::{combine, CombineOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let db = Database::open("model.json")?;
//! let request = CombineRequest::from_args(&["body.r", "-", "bore.r"])?;
//! let report = combine(&db, &CombineOptions::new("part", request), &EngineConfig::default())?;
//! println!("{} faces, volume {}", report.faces, report.volume);
//! db.save("model.json")?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod csg;
pub mod db;
pub mod error;
pub mod geometry;
pub mod ops;
pub mod walk;

pub use config::{EngineConfig, Tolerance};
pub use csg::{BoolOp, CombineRequest, CsgTree};
pub use db::{Database, Object, ObjectKind};
pub use error::{BoundsError, CombineError, ConfigError, GeometryError, StoreError, WalkError};
pub use walk::{TreeClient, TreeState, Walker};
