// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Operator trees, their builder and the boolean evaluator

pub mod builder;
pub mod evaluator;
pub mod tree;

pub use builder::{CombineRequest, CombineTerm, TreeBuilder};
pub use evaluator::BooleanEvaluator;
pub use tree::{BoolOp, CsgTree};
