// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Evaluate a boolean expression over database objects into a new B-rep object

use crate::config::EngineConfig;
use crate::csg::{BooleanEvaluator, CombineRequest, CsgTree, TreeBuilder};
use crate::db::{Database, Object, ObjectKind};
use crate::error::{CombineError, WalkError};
use crate::geometry::{Model, RegionHandle};
use crate::walk::{FullPath, TreeClient, TreeState, Walker};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What to build and where to put it
#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub new_name: String,
    pub request: CombineRequest,
    pub triangulate: bool,
}

impl CombineOptions {
    pub fn new(new_name: impl Into<String>, request: CombineRequest) -> Self {
        Self {
            new_name: new_name.into(),
            request,
            triangulate: false,
        }
    }

    pub fn triangulate(mut self, triangulate: bool) -> Self {
        self.triangulate = triangulate;
        self
    }
}

/// Summary of a successful combine
#[derive(Debug, Clone, Serialize)]
pub struct CombineReport {
    pub name: String,
    /// Infix form of the evaluated expression
    pub expression: String,
    pub roots: usize,
    pub leaves: usize,
    pub regions: usize,
    pub faces: usize,
    pub volume: f64,
    pub triangulated: bool,
    /// sha256 of the written payload
    pub fingerprint: String,
    pub branch_errors: Vec<String>,
}

/// Tessellates every supported leaf into its own model region
struct FacetizeClient {
    model: Model,
}

impl TreeClient for FacetizeClient {
    type Fragment = RegionHandle;

    fn leaf(
        &self,
        state: &TreeState,
        path: &FullPath,
        object: &Object,
    ) -> Result<Option<RegionHandle>, String> {
        let Some(faces) = object
            .as_primitive()
            .and_then(|prim| prim.tessellate(&state.matrix, &state.tolerance))
        else {
            warn!("{}: {}", path, WalkError::UnsupportedPrimitive(object.kind()));
            return Ok(None);
        };

        let faces = faces.map_err(|e| e.to_string())?;
        if faces.is_empty() {
            return Ok(None);
        }
        debug!("{}: {} faces", path, faces.len());
        Ok(Some(self.model.add_region(path.to_string(), faces)))
    }
}

/// Evaluate `options.request` and store the result as `options.new_name`.
///
/// The database is only modified when the whole evaluation succeeds.
pub fn combine(
    db: &Database,
    options: &CombineOptions,
    config: &EngineConfig,
) -> Result<CombineReport, CombineError> {
    let name = options.new_name.as_str();
    if db.is_read_only() {
        return Err(CombineError::WriteFailed {
            name: name.to_string(),
            reason: "database is read-only".into(),
        });
    }
    if db.contains(name) {
        return Err(CombineError::OutputExists(name.to_string()));
    }
    if options.request.is_empty() {
        return Err(CombineError::NothingToEvaluate);
    }

    let tol = &config.tolerance;
    info!(
        "tessellation tolerances: abs {} rel {} norm {} dist {}",
        tol.abs, tol.rel, tol.norm, tol.dist
    );

    let model = Model::new(tol.dist);
    let client = FacetizeClient {
        model: model.clone(),
    };
    let walker = Walker::new(db, config.workers)?;
    let roots = options.request.roots();
    info!(
        "walking {} root(s) with {} worker(s)",
        roots.len(),
        walker.workers()
    );
    let outcome = walker.walk(&roots, &TreeState::new(*tol), &client)?;
    let stats = outcome.stats();

    let mut branch_errors = Vec::new();
    let mut builder = TreeBuilder::new();
    for (term, root) in options.request.terms().iter().zip(outcome.roots) {
        for err in &root.errors {
            warn!("{}: {}", root.name, err);
            branch_errors.push(err.to_string());
        }
        builder.push(term.op, CsgTree::fold_union(root.returned));
    }
    let tree = builder.finish()?;
    let expression = tree.render(&|h: &RegionHandle| h.label().to_string());

    info!("evaluating {} region(s)", tree.leaf_count());
    let result = BooleanEvaluator::new(&model).evaluate(tree)?;
    model
        .validate(&result)
        .map_err(|e| CombineError::EvaluationFailed(e.to_string()))?;
    if model.region_count() != 1 {
        return Err(CombineError::EvaluationFailed(format!(
            "model holds {} regions after evaluation",
            model.region_count()
        )));
    }

    if options.triangulate || config.triangulate {
        info!("triangulating");
        model
            .triangulate(&result)
            .map_err(|e| CombineError::TriangulationFailed(e.to_string()))?;
    }

    let volume = model.volume(&result).unwrap_or_default();
    let region = model
        .take(result)
        .ok_or_else(|| CombineError::EvaluationFailed("result region vanished".into()))?;
    let triangulated = region.triangulated;
    let brep = region.into_brep();
    let faces = brep.face_count();
    let fingerprint = brep.fingerprint();

    write_result(db, name, Object::Brep(brep))?;
    info!("wrote {} ({} faces)", name, faces);

    Ok(CombineReport {
        name: name.to_string(),
        expression,
        roots: roots.len(),
        leaves: stats.leaves,
        regions: stats.regions,
        faces,
        volume,
        triangulated,
        fingerprint,
        branch_errors,
    })
}

fn write_result(db: &Database, name: &str, object: Object) -> Result<(), CombineError> {
    let write_failed = |e: crate::error::StoreError| CombineError::WriteFailed {
        name: name.to_string(),
        reason: e.to_string(),
    };

    let handle = db.add_entry(name, ObjectKind::Brep).map_err(write_failed)?;
    if let Err(err) = db.put_payload(&handle, object) {
        if let Err(cleanup) = db.remove_entry(name) {
            warn!("could not remove {} after failed write: {}", name, cleanup);
        }
        return Err(write_failed(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Arb8, Combination, Member, Sphere};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn fixture() -> Database {
        let db = Database::new("combine");
        db.insert(
            "box",
            Object::Arb8(Arb8::from_extents(Point3::origin(), Point3::new(10.0, 10.0, 10.0))),
        )
        .unwrap();
        db.insert(
            "box.r",
            Object::Combination(Combination::region(vec![
                Member::new("box"),
                Member::translated("box", Vector3::new(5.0, 0.0, 0.0)),
            ])),
        )
        .unwrap();
        db.insert(
            "ball",
            Object::Sphere(Sphere {
                center: Point3::new(5.0, 5.0, 5.0),
                radius: 2.0,
            }),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_region_members_union() {
        let db = fixture();
        let request = CombineRequest::new("box.r");
        let report = combine(&db, &CombineOptions::new("out", request), &EngineConfig::default())
            .unwrap();
        assert_relative_eq!(report.volume, 1500.0, epsilon = 1e-6);
        assert_eq!(report.leaves, 2);
        assert_eq!(db.lookup("out").unwrap().kind(), &ObjectKind::Brep);
    }

    #[test]
    fn test_subtract_sphere() {
        let db = fixture();
        let request = CombineRequest::from_args(&["box", "-", "ball"]).unwrap();
        let report = combine(&db, &CombineOptions::new("hollow", request), &EngineConfig::default())
            .unwrap();
        assert!(report.volume < 1000.0);
        assert!(report.volume > 1000.0 - 4.0 / 3.0 * std::f64::consts::PI * 8.0);
        assert_eq!(report.expression, "(/box - /ball)");
    }

    #[test]
    fn test_output_name_taken() {
        let db = fixture();
        let err = combine(
            &db,
            &CombineOptions::new("ball", CombineRequest::new("box")),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CombineError::OutputExists(_)));
    }

    #[test]
    fn test_triangulated_output() {
        let db = fixture();
        let options = CombineOptions::new("tri", CombineRequest::new("box")).triangulate(true);
        let report = combine(&db, &options, &EngineConfig::default()).unwrap();
        assert!(report.triangulated);
        assert_eq!(report.faces, 12);
        assert_relative_eq!(report.volume, 1000.0, epsilon = 1e-9);
    }
}
