// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Trace a walk over the named objects, reporting each callback

use crate::csg::CsgTree;
use crate::db::{Combination, Database, Object};
use crate::error::WalkError;
use crate::walk::{FullPath, RegionEnd, TreeClient, TreeState, WalkStats, Walker};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One leaf seen during the walk
#[derive(Debug, Clone)]
struct LeafRecord {
    kind: String,
}

struct TraceClient;

impl TreeClient for TraceClient {
    type Fragment = LeafRecord;

    fn region_start(
        &self,
        state: &TreeState,
        path: &FullPath,
        combination: Option<&Combination>,
    ) -> Result<(), String> {
        let members = combination.map_or(0, |c| c.members.len());
        debug!(
            "region_start {} ({} members, region id {:?})",
            path, members, state.attributes.region_id
        );
        Ok(())
    }

    fn leaf(
        &self,
        _state: &TreeState,
        path: &FullPath,
        object: &Object,
    ) -> Result<Option<LeafRecord>, String> {
        debug!("leaf {} ({})", path, object.kind());
        Ok(Some(LeafRecord {
            kind: object.kind().to_string(),
        }))
    }

    fn region_end(
        &self,
        _state: &TreeState,
        path: &FullPath,
        tree: CsgTree<LeafRecord>,
    ) -> RegionEnd<LeafRecord> {
        debug!("region_end {} ({} leaves)", path, tree.leaf_count());
        RegionEnd::Returned(tree)
    }
}

/// Counts gathered by [`walk`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkReport {
    pub roots: Vec<String>,
    pub stats: WalkStats,
    /// Leaves per object kind
    pub leaf_kinds: BTreeMap<String, usize>,
    pub errors: Vec<String>,
}

/// Walk `roots` and report what was visited
pub fn walk<S: AsRef<str> + Sync>(
    db: &Database,
    roots: &[S],
    workers: usize,
) -> Result<WalkReport, WalkError> {
    let walker = Walker::new(db, workers)?;
    let outcome = walker.walk(roots, &TreeState::default(), &TraceClient)?;

    let mut report = WalkReport {
        roots: roots.iter().map(|r| r.as_ref().to_string()).collect(),
        stats: outcome.stats(),
        errors: outcome.errors().map(|e| e.to_string()).collect(),
        ..WalkReport::default()
    };
    for tree in outcome.into_returned() {
        for record in tree.into_leaves() {
            *report.leaf_kinds.entry(record.kind).or_default() += 1;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Arb8, HalfSpace, Member, Sphere};
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_walk_counts() {
        let db = Database::new("walk");
        db.insert(
            "cube",
            Object::Arb8(Arb8::from_extents(Point3::origin(), Point3::new(1.0, 1.0, 1.0))),
        )
        .unwrap();
        db.insert(
            "ball",
            Object::Sphere(Sphere {
                center: Point3::origin(),
                radius: 1.0,
            }),
        )
        .unwrap();
        db.insert(
            "floor",
            Object::Half(HalfSpace {
                normal: Vector3::z(),
                distance: 0.0,
            }),
        )
        .unwrap();
        db.insert(
            "r1",
            Object::Combination(Combination::region(vec![
                Member::new("cube"),
                Member::new("ball"),
            ])),
        )
        .unwrap();
        db.insert(
            "all",
            Object::Combination(Combination::group(vec![
                Member::new("r1"),
                Member::new("floor"),
                Member::new("missing"),
            ])),
        )
        .unwrap();

        let report = walk(&db, &["all"], 1).unwrap();
        // r1 plus the implicit region around the half-space
        assert_eq!(report.stats.regions, 2);
        assert_eq!(report.stats.leaves, 3);
        assert_eq!(report.leaf_kinds.get("half"), Some(&1));
        assert_eq!(report.leaf_kinds.get("sphere"), Some(&1));
        assert_eq!(report.errors.len(), 1);
    }
}
