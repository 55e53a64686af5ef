// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean evaluator - reduces an operator tree of model regions to one region

use super::tree::CsgTree;
use crate::error::CombineError;
use crate::geometry::{Model, RegionHandle};
use tracing::debug;

/// Evaluates operator trees against one [`Model`]
pub struct BooleanEvaluator<'m> {
    model: &'m Model,
}

impl<'m> BooleanEvaluator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    /// Post-order reduction, left subtree before right.
    ///
    /// On failure every handle still in the tree is dropped, which releases
    /// its region from the model.
    pub fn evaluate(&self, tree: CsgTree<RegionHandle>) -> Result<RegionHandle, CombineError> {
        self.reduce(tree)
    }

    fn reduce(&self, tree: CsgTree<RegionHandle>) -> Result<RegionHandle, CombineError> {
        match tree {
            CsgTree::Leaf(handle) => Ok(handle),
            CsgTree::Op { op, left, right } => {
                let left = self.reduce(*left)?;
                let right = self.reduce(*right)?;
                debug!("evaluating {} {} {}", left.label(), op, right.label());
                self.model
                    .boolean(op, left, right)
                    .map_err(|e| CombineError::EvaluationFailed(e.to_string()))
            }
        }
    }
}
