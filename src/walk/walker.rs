// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Depth-first walker over the assembly DAG with region callbacks

use super::path::FullPath;
use super::state::{descend, TreeState};
use crate::csg::CsgTree;
use crate::db::{Combination, Database, Member, Object, RegionAttributes};
use crate::error::WalkError;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use std::ops::AddAssign;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a client did with a finished region's tree
#[derive(Debug)]
pub enum RegionEnd<F> {
    /// The client kept the tree
    Consumed,
    /// The tree goes back to the walker and ends up in the outcome
    Returned(CsgTree<F>),
}

/// Callbacks driven by [`Walker`].
///
/// Calls for sibling subtrees may arrive concurrently when the walker has
/// more than one worker.
pub trait TreeClient: Sync {
    type Fragment: Send;

    /// Called before descending into a region. An error aborts the whole walk.
    fn region_start(
        &self,
        _state: &TreeState,
        _path: &FullPath,
        _combination: Option<&Combination>,
    ) -> Result<(), String> {
        Ok(())
    }

    /// Produce the fragment for one leaf. `Ok(None)` is an empty result.
    fn leaf(
        &self,
        state: &TreeState,
        path: &FullPath,
        object: &Object,
    ) -> Result<Option<Self::Fragment>, String>;

    /// Receive the union of a region's fragments
    fn region_end(
        &self,
        _state: &TreeState,
        _path: &FullPath,
        tree: CsgTree<Self::Fragment>,
    ) -> RegionEnd<Self::Fragment> {
        RegionEnd::Returned(tree)
    }
}

/// Counters collected during a walk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub regions: usize,
    pub leaves: usize,
    pub empty_leaves: usize,
    pub consumed: usize,
    pub returned: usize,
    pub branch_errors: usize,
}

impl AddAssign for WalkStats {
    fn add_assign(&mut self, other: Self) {
        self.regions += other.regions;
        self.leaves += other.leaves;
        self.empty_leaves += other.empty_leaves;
        self.consumed += other.consumed;
        self.returned += other.returned;
        self.branch_errors += other.branch_errors;
    }
}

/// Result of walking one root
#[derive(Debug)]
pub struct RootOutcome<F> {
    pub name: String,
    /// Region trees handed back by the client, in traversal order
    pub returned: Vec<CsgTree<F>>,
    /// Branch-local failures; the rest of the root was still walked
    pub errors: Vec<WalkError>,
    pub stats: WalkStats,
}

/// Result of [`Walker::walk`], one entry per root in caller order
#[derive(Debug)]
pub struct WalkOutcome<F> {
    pub roots: Vec<RootOutcome<F>>,
}

impl<F> WalkOutcome<F> {
    pub fn stats(&self) -> WalkStats {
        let mut total = WalkStats::default();
        for root in &self.roots {
            total += root.stats;
        }
        total
    }

    pub fn errors(&self) -> impl Iterator<Item = &WalkError> {
        self.roots.iter().flat_map(|root| root.errors.iter())
    }

    /// All returned trees, root by root
    pub fn into_returned(self) -> Vec<CsgTree<F>> {
        self.roots
            .into_iter()
            .flat_map(|root| root.returned)
            .collect()
    }
}

/// Partial result of one subtree
struct Subtree<F> {
    /// Union of fragments inside the enclosing region
    tree: Option<CsgTree<F>>,
    returned: Vec<CsgTree<F>>,
    errors: Vec<WalkError>,
    stats: WalkStats,
}

impl<F> Subtree<F> {
    fn empty() -> Self {
        Self {
            tree: None,
            returned: Vec::new(),
            errors: Vec::new(),
            stats: WalkStats::default(),
        }
    }

    fn failed(err: WalkError) -> Self {
        let mut out = Self::empty();
        out.errors.push(err);
        out.stats.branch_errors = 1;
        out
    }

    /// Fold a child result in, after the children already absorbed
    fn absorb(&mut self, child: Subtree<F>) {
        self.tree = match (self.tree.take(), child.tree) {
            (Some(acc), Some(next)) => Some(CsgTree::union(acc, next)),
            (acc, None) => acc,
            (None, next) => next,
        };
        self.returned.extend(child.returned);
        self.errors.extend(child.errors);
        self.stats += child.stats;
    }
}

/// Walks roots of a [`Database`] and drives a [`TreeClient`]
pub struct Walker<'db> {
    db: &'db Database,
    pool: Option<ThreadPool>,
}

impl<'db> Walker<'db> {
    /// With `workers > 1` sibling subtrees run on a dedicated thread pool
    pub fn new(db: &'db Database, workers: usize) -> Result<Self, WalkError> {
        let pool = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("booltree-walk-{}", i))
                .build()
                .map_err(|e| WalkError::WorkerPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { db, pool })
    }

    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, |pool| pool.current_num_threads())
    }

    /// Walk every root. Only fatal errors (a rejected region start) end the walk early.
    pub fn walk<C, S>(
        &self,
        roots: &[S],
        initial: &TreeState,
        client: &C,
    ) -> Result<WalkOutcome<C::Fragment>, WalkError>
    where
        C: TreeClient,
        S: AsRef<str> + Sync,
    {
        let run = || -> Result<Vec<RootOutcome<C::Fragment>>, WalkError> {
            if self.pool.is_some() {
                roots
                    .par_iter()
                    .map(|root| self.walk_root(root.as_ref(), initial, client))
                    .collect()
            } else {
                roots
                    .iter()
                    .map(|root| self.walk_root(root.as_ref(), initial, client))
                    .collect()
            }
        };

        let roots = match &self.pool {
            Some(pool) => pool.install(run)?,
            None => run()?,
        };
        Ok(WalkOutcome { roots })
    }

    fn walk_root<C: TreeClient>(
        &self,
        root: &str,
        initial: &TreeState,
        client: &C,
    ) -> Result<RootOutcome<C::Fragment>, WalkError> {
        debug!("walking {}", root);
        let mut sub = self.visit(client, FullPath::root(root), initial.clone())?;
        if let Some(tree) = sub.tree.take() {
            sub.returned.push(tree);
        }
        Ok(RootOutcome {
            name: root.to_string(),
            returned: sub.returned,
            errors: sub.errors,
            stats: sub.stats,
        })
    }

    fn visit<C: TreeClient>(
        &self,
        client: &C,
        path: FullPath,
        state: TreeState,
    ) -> Result<Subtree<C::Fragment>, WalkError> {
        let Some(name) = path.current().map(|entry| Arc::clone(&entry.name)) else {
            return Ok(Subtree::empty());
        };

        let object = match self
            .db
            .lookup(&name)
            .and_then(|handle| self.db.get_payload(&handle))
        {
            Ok(object) => object,
            Err(err) => {
                let err = WalkError::from_store(err);
                warn!("{}: {}", path, err);
                return Ok(Subtree::failed(err));
            }
        };

        match object.as_ref() {
            Object::Combination(comb) => self.visit_combination(client, comb, path, state),
            leaf => self.visit_leaf(client, leaf, &path, state),
        }
    }

    fn visit_combination<C: TreeClient>(
        &self,
        client: &C,
        comb: &Combination,
        path: FullPath,
        state: TreeState,
    ) -> Result<Subtree<C::Fragment>, WalkError> {
        let starts_region = comb.region && !state.in_region;
        if comb.region && state.in_region {
            debug!("{}: region below a region, walking it as a group", path);
        }
        let state = if starts_region {
            state.enter_region(&comb.attributes)
        } else {
            state.with_attributes(&comb.attributes)
        };

        let mut out = Subtree::empty();
        if starts_region {
            client
                .region_start(&state, &path, Some(comb))
                .map_err(|reason| WalkError::RegionRejected {
                    path: path.to_string(),
                    reason,
                })?;
            out.stats.regions += 1;
        }

        let visit_member = |(index, member): (usize, &Member)| {
            match descend(&path, &state, member, index) {
                Ok((child_path, child_state)) => self.visit(client, child_path, child_state),
                Err(err) => {
                    warn!("{}", err);
                    Ok(Subtree::failed(err))
                }
            }
        };

        let children: Vec<Subtree<C::Fragment>> =
            if self.pool.is_some() && comb.members.len() > 1 {
                comb.members
                    .par_iter()
                    .enumerate()
                    .map(visit_member)
                    .collect::<Result<_, _>>()?
            } else {
                comb.members
                    .iter()
                    .enumerate()
                    .map(visit_member)
                    .collect::<Result<_, _>>()?
            };

        for child in children {
            out.absorb(child);
        }
        if starts_region {
            finish_region(client, &state, &path, &mut out);
        }
        Ok(out)
    }

    fn visit_leaf<C: TreeClient>(
        &self,
        client: &C,
        object: &Object,
        path: &FullPath,
        state: TreeState,
    ) -> Result<Subtree<C::Fragment>, WalkError> {
        let mut out = Subtree::empty();

        let implicit = !state.in_region;
        let state = if implicit {
            debug!("{}: leaf outside any region, treating it as one", path);
            let state = state.enter_region(&RegionAttributes::default());
            client
                .region_start(&state, path, None)
                .map_err(|reason| WalkError::RegionRejected {
                    path: path.to_string(),
                    reason,
                })?;
            out.stats.regions += 1;
            state
        } else {
            state
        };

        out.stats.leaves += 1;
        match client.leaf(&state, path, object) {
            Ok(Some(fragment)) => out.tree = Some(CsgTree::Leaf(fragment)),
            Ok(None) => {
                out.stats.empty_leaves += 1;
                debug!("{}: {} produced no geometry", path, object.kind());
            }
            Err(reason) => {
                let err = WalkError::LeafFailed {
                    path: path.to_string(),
                    reason,
                };
                warn!("{}", err);
                out.errors.push(err);
                out.stats.branch_errors += 1;
            }
        }

        if implicit {
            finish_region(client, &state, path, &mut out);
        }
        Ok(out)
    }
}

/// Hand a finished region's tree to the client. Regions without fragments are skipped.
fn finish_region<C: TreeClient>(
    client: &C,
    state: &TreeState,
    path: &FullPath,
    out: &mut Subtree<C::Fragment>,
) {
    let Some(tree) = out.tree.take() else {
        debug!("{}: region produced no geometry", path);
        return;
    };
    match client.region_end(state, path, tree) {
        RegionEnd::Consumed => out.stats.consumed += 1,
        RegionEnd::Returned(tree) => {
            out.stats.returned += 1;
            out.returned.push(tree);
        }
    }
}
