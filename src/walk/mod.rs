// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Assembly traversal: paths, accumulated state and the region walker

pub mod path;
pub mod state;
pub mod walker;

pub use path::{FullPath, PathEntry};
pub use state::{descend, TreeState};
pub use walker::{RegionEnd, RootOutcome, TreeClient, WalkOutcome, WalkStats, Walker};
