// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Accumulated traversal state: placement matrix, tolerances, region attributes

use super::path::FullPath;
use crate::config::Tolerance;
use crate::db::{Member, RegionAttributes};
use crate::error::WalkError;
use nalgebra::Matrix4;
use std::sync::Arc;

/// State in effect at one node of the walk.
///
/// Immutable; descending builds a new value for the child.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeState {
    /// Root-to-node placement
    pub matrix: Matrix4<f64>,
    pub tolerance: Tolerance,
    pub attributes: RegionAttributes,
    /// Set once a region has started above this node
    pub in_region: bool,
}

impl TreeState {
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            matrix: Matrix4::identity(),
            tolerance,
            attributes: RegionAttributes::default(),
            in_region: false,
        }
    }

    /// State for a child instanced with `local`
    pub fn descend(&self, local: Option<&Matrix4<f64>>) -> Self {
        Self {
            matrix: match local {
                Some(local) => self.matrix * local,
                None => self.matrix,
            },
            ..self.clone()
        }
    }

    pub fn with_attributes(&self, attributes: &RegionAttributes) -> Self {
        Self {
            attributes: self.attributes.overlay(attributes),
            ..self.clone()
        }
    }

    pub fn enter_region(&self, attributes: &RegionAttributes) -> Self {
        Self {
            in_region: true,
            ..self.with_attributes(attributes)
        }
    }
}

impl Default for TreeState {
    fn default() -> Self {
        Self::new(Tolerance::default())
    }
}

/// Step from a node to its `index`-th member
pub fn descend(
    path: &FullPath,
    state: &TreeState,
    member: &Member,
    index: usize,
) -> Result<(FullPath, TreeState), WalkError> {
    let name: Arc<str> = Arc::from(member.name.as_str());
    let path = path.descend(&name, index)?;
    Ok((path, state.descend(member.matrix.as_ref())))
}
