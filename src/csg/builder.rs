// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Left-associative assembly of per-root results into one operator tree

use super::tree::{BoolOp, CsgTree};
use crate::error::CombineError;
use tracing::warn;

/// One root of a combine request and the operator joining it to what came before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineTerm {
    pub name: String,
    /// `None` for the first root
    pub op: Option<BoolOp>,
}

/// Validated `obj op obj op ...` expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineRequest {
    terms: Vec<CombineTerm>,
}

impl CombineRequest {
    pub fn new(first: impl Into<String>) -> Self {
        Self {
            terms: vec![CombineTerm {
                name: first.into(),
                op: None,
            }],
        }
    }

    /// Append a root joined by `op`
    pub fn then(mut self, op: BoolOp, name: impl Into<String>) -> Self {
        self.terms.push(CombineTerm {
            name: name.into(),
            op: if self.terms.is_empty() { None } else { Some(op) },
        });
        self
    }

    /// Parse alternating object names and operator tokens.
    ///
    /// Every operator is checked before anything is walked. A trailing
    /// operator with no object after it is ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, CombineError> {
        let mut terms = Vec::with_capacity(args.len() / 2 + 1);
        let mut pending = None;
        for (i, arg) in args.iter().enumerate() {
            let arg = arg.as_ref();
            if i % 2 == 0 {
                terms.push(CombineTerm {
                    name: arg.to_string(),
                    op: pending.take(),
                });
            } else {
                let op = BoolOp::parse(arg).ok_or_else(|| CombineError::UnrecognizedOperator {
                    token: arg.to_string(),
                    root_index: terms.len(),
                })?;
                pending = Some(op);
            }
        }
        if pending.is_some() {
            warn!("ignoring trailing operator");
        }
        Ok(Self { terms })
    }

    /// Build from `(root, operator token)` pairs; the first pair's token is ignored
    pub fn from_pairs<S: AsRef<str>, T: AsRef<str>>(
        pairs: &[(S, T)],
    ) -> Result<Self, CombineError> {
        let terms = pairs
            .iter()
            .enumerate()
            .map(|(i, (name, token))| {
                let op = if i == 0 {
                    None
                } else {
                    Some(BoolOp::parse(token.as_ref()).ok_or_else(|| {
                        CombineError::UnrecognizedOperator {
                            token: token.as_ref().to_string(),
                            root_index: i,
                        }
                    })?)
                };
                Ok(CombineTerm {
                    name: name.as_ref().to_string(),
                    op,
                })
            })
            .collect::<Result<_, CombineError>>()?;
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[CombineTerm] {
        &self.terms
    }

    pub fn roots(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Folds per-root trees into `((F0 op1 F1) op2 F2) ...` in caller order.
///
/// A root without geometry stands for the empty solid, so it still takes
/// part in the expression: it leaves unions and the left side of a
/// subtraction unchanged and empties an intersection.
#[derive(Debug)]
pub struct TreeBuilder<F> {
    /// `None` is the empty solid
    accumulated: Option<CsgTree<F>>,
    pushed: usize,
    /// Whether any root produced geometry at all
    saw_fragment: bool,
}

impl<F> TreeBuilder<F> {
    pub fn new() -> Self {
        Self {
            accumulated: None,
            pushed: 0,
            saw_fragment: false,
        }
    }

    /// Add the result of the next root. `op` is ignored for the first root.
    pub fn push(&mut self, op: Option<BoolOp>, fragment: Option<CsgTree<F>>) {
        let index = self.pushed;
        self.pushed += 1;
        self.saw_fragment |= fragment.is_some();
        let op = if index == 0 {
            BoolOp::Union
        } else {
            op.unwrap_or(BoolOp::Union)
        };

        self.accumulated = match (self.accumulated.take(), fragment) {
            (Some(acc), Some(fragment)) => Some(CsgTree::combine(op, acc, fragment)),
            (None, None) => {
                warn!("root #{} is empty", index);
                None
            }
            (Some(acc), None) => match op {
                BoolOp::Intersect => {
                    warn!("root #{} is empty, the intersection is empty", index);
                    None
                }
                BoolOp::Union | BoolOp::Subtract => {
                    warn!("root #{} is empty", index);
                    Some(acc)
                }
            },
            (None, Some(fragment)) => match op {
                BoolOp::Union => Some(fragment),
                BoolOp::Subtract | BoolOp::Intersect => {
                    warn!(
                        "nothing precedes root #{}, '{}' leaves the result empty",
                        index, op
                    );
                    None
                }
            },
        };
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_none()
    }

    /// The assembled tree. An expression that reduces to the empty solid
    /// fails with `EvaluationFailed`; no geometry at all is `NothingToEvaluate`.
    pub fn finish(self) -> Result<CsgTree<F>, CombineError> {
        match self.accumulated {
            Some(tree) => Ok(tree),
            None if self.saw_fragment => Err(CombineError::EvaluationFailed(
                "the expression reduces to an empty solid".into(),
            )),
            None => Err(CombineError::NothingToEvaluate),
        }
    }
}

impl<F> Default for TreeBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}
