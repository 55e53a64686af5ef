// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Binary boolean operator trees

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolOp {
    Union,
    Subtract,
    Intersect,
}

impl BoolOp {
    /// Parse an operator token, ignoring case.
    ///
    /// Union: `u`, `+`, `union`. Subtract: `-`, `subtract`.
    /// Intersect: `n`, `&`, `intersect`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "u" | "+" | "union" => Some(Self::Union),
            "-" | "subtract" => Some(Self::Subtract),
            "n" | "&" | "intersect" => Some(Self::Intersect),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Union => "u",
            Self::Subtract => "-",
            Self::Intersect => "n",
        }
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Boolean expression over fragments of type `F`
#[derive(Debug)]
pub enum CsgTree<F> {
    Leaf(F),
    Op {
        op: BoolOp,
        left: Box<CsgTree<F>>,
        right: Box<CsgTree<F>>,
    },
}

impl<F> CsgTree<F> {
    pub fn leaf(fragment: F) -> Self {
        Self::Leaf(fragment)
    }

    pub fn combine(op: BoolOp, left: Self, right: Self) -> Self {
        Self::Op {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn union(left: Self, right: Self) -> Self {
        Self::combine(BoolOp::Union, left, right)
    }

    /// Left-associative union of all trees, `None` when there are none
    pub fn fold_union(trees: impl IntoIterator<Item = Self>) -> Option<Self> {
        trees.into_iter().reduce(Self::union)
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Op { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Op { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Leaves from left to right
    pub fn leaves(&self) -> Vec<&F> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Leaf(fragment) => out.push(fragment),
                Self::Op { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    pub fn into_leaves(self) -> Vec<F> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Leaf(fragment) => out.push(fragment),
                Self::Op { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        out
    }

    pub fn map<G>(self, f: &mut impl FnMut(F) -> G) -> CsgTree<G> {
        match self {
            Self::Leaf(fragment) => CsgTree::Leaf(f(fragment)),
            Self::Op { op, left, right } => {
                let left = left.map(f);
                let right = right.map(f);
                CsgTree::combine(op, left, right)
            }
        }
    }

    /// Fully parenthesised infix form, e.g. `((a u b) - c)`
    pub fn render(&self, label: &impl Fn(&F) -> String) -> String {
        match self {
            Self::Leaf(fragment) => label(fragment),
            Self::Op { op, left, right } => {
                format!("({} {} {})", left.render(label), op, right.render(label))
            }
        }
    }
}
