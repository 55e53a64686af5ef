// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end combine tests against small in-memory and on-disk databases

use anyhow::Result;
use approx::assert_relative_eq;
use booltree::config::EngineConfig;
use booltree::csg::CombineRequest;
use booltree::db::{Arb8, Combination, Database, HalfSpace, Member, Object, ObjectKind};
use booltree::error::CombineError;
use booltree::ops::{bounds, combine, BoundsOptions, CombineOptions};
use nalgebra::{Point3, Vector3};

fn block(min: [f64; 3], size: f64) -> Object {
    let min = Point3::from(min);
    Object::Arb8(Arb8::from_extents(min, min + Vector3::repeat(size)))
}

/// boxA at the origin, boxB shifted by 5 along x, boxC shifted by 12
fn three_boxes() -> Result<Database> {
    let db = Database::new("boxes");
    db.insert("boxA", block([0.0, 0.0, 0.0], 10.0))?;
    db.insert("boxB", block([5.0, 0.0, 0.0], 10.0))?;
    db.insert("boxC", block([12.0, 0.0, 0.0], 10.0))?;
    db.insert(
        "floor",
        Object::Half(HalfSpace {
            normal: Vector3::z(),
            distance: 0.0,
        }),
    )?;
    Ok(db)
}

fn run(db: &Database, new_name: &str, args: &[&str]) -> Result<booltree::ops::CombineReport, CombineError> {
    let request = CombineRequest::from_args(args)?;
    combine(db, &CombineOptions::new(new_name, request), &EngineConfig::default())
}

#[test]
fn test_union_of_overlapping_boxes() -> Result<()> {
    let db = three_boxes()?;
    let report = run(&db, "u1", &["boxA", "u", "boxB"])?;
    // A + B - (A n B)
    assert_relative_eq!(report.volume, 1000.0 + 1000.0 - 500.0, epsilon = 1e-6);
    assert_eq!(db.lookup("u1")?.kind(), &ObjectKind::Brep);
    Ok(())
}

#[test]
fn test_subtract_and_intersect() -> Result<()> {
    let db = three_boxes()?;
    let diff = run(&db, "d1", &["boxA", "-", "boxB"])?;
    assert_relative_eq!(diff.volume, 500.0, epsilon = 1e-6);
    let common = run(&db, "i1", &["boxA", "n", "boxB"])?;
    assert_relative_eq!(common.volume, 500.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_expression_is_left_associative() -> Result<()> {
    let db = three_boxes()?;
    let report = run(&db, "la", &["boxA", "u", "boxB", "-", "boxC"])?;
    assert_eq!(report.expression, "((/boxA u /boxB) - /boxC)");
    // [0,15] minus [12,22] along x
    assert_relative_eq!(report.volume, 1200.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_single_root_copies_geometry() -> Result<()> {
    let db = three_boxes()?;
    let report = run(&db, "copy", &["boxA"])?;
    assert_relative_eq!(report.volume, 1000.0, epsilon = 1e-9);
    assert_eq!(report.faces, 6);

    let bb = bounds(&db, &["copy"], &BoundsOptions::default(), 1)?;
    assert_eq!(bb.min, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(bb.max, Point3::new(10.0, 10.0, 10.0));
    Ok(())
}

#[test]
fn test_repeated_combine_is_identical() -> Result<()> {
    let db = three_boxes()?;
    let first = run(&db, "r1", &["boxA", "u", "boxB", "-", "boxC"])?;
    let second = run(&db, "r2", &["boxA", "u", "boxB", "-", "boxC"])?;
    assert_eq!(first.fingerprint, second.fingerprint);

    let a = db.get_payload(&db.lookup("r1")?)?;
    let b = db.get_payload(&db.lookup("r2")?)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn test_worker_count_does_not_change_result() -> Result<()> {
    let db = three_boxes()?;
    let members = (0..6)
        .map(|i| Member::translated("boxA", Vector3::new(0.0, 0.0, 3.0 * i as f64)))
        .collect();
    db.insert("stack.r", Object::Combination(Combination::region(members)))?;

    let request = CombineRequest::from_args(&["stack.r", "-", "boxC"])?;
    let sequential = combine(
        &db,
        &CombineOptions::new("seq", request.clone()),
        &EngineConfig::default(),
    )?;
    let parallel = combine(
        &db,
        &CombineOptions::new("par", request),
        &EngineConfig::default().with_workers(4),
    )?;
    assert_eq!(sequential.fingerprint, parallel.fingerprint);
    assert_relative_eq!(sequential.volume, parallel.volume);
    Ok(())
}

#[test]
fn test_empty_root_in_union_and_subtraction() -> Result<()> {
    let db = three_boxes()?;
    // the half-space tessellates to nothing and acts as the empty solid
    let report = run(&db, "grown", &["floor", "u", "boxA"])?;
    assert_relative_eq!(report.volume, 1000.0, epsilon = 1e-9);
    let report = run(&db, "kept", &["boxA", "-", "floor"])?;
    assert_relative_eq!(report.volume, 1000.0, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_intersect_with_empty_root() -> Result<()> {
    let db = three_boxes()?;
    let err = run(&db, "meet", &["boxA", "n", "floor"]).unwrap_err();
    assert!(matches!(err, CombineError::EvaluationFailed(_)));
    assert!(!db.contains("meet"));
    Ok(())
}

#[test]
fn test_subtract_from_empty_root() -> Result<()> {
    let db = three_boxes()?;
    let err = run(&db, "hole", &["floor", "-", "boxA"]).unwrap_err();
    assert!(matches!(err, CombineError::EvaluationFailed(_)));
    assert!(!db.contains("hole"));
    Ok(())
}

#[test]
fn test_empty_request() -> Result<()> {
    let db = three_boxes()?;
    let before = db.entries().len();
    let err = combine(
        &db,
        &CombineOptions::new("blank", CombineRequest::default()),
        &EngineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CombineError::NothingToEvaluate));
    assert_eq!(db.entries().len(), before);
    Ok(())
}

#[test]
fn test_pairs_request() -> Result<()> {
    let db = three_boxes()?;
    // the first operator has no left operand and is ignored
    let request = CombineRequest::from_pairs(&[("boxA", "-"), ("boxB", "UNION")])?;
    let report = combine(&db, &CombineOptions::new("pair", request), &EngineConfig::default())?;
    assert_eq!(report.expression, "(/boxA u /boxB)");
    assert_relative_eq!(report.volume, 1500.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_only_unsupported_roots() -> Result<()> {
    let db = three_boxes()?;
    let before = db.entries().len();
    let err = run(&db, "nothing", &["floor", "u", "floor"]).unwrap_err();
    assert!(matches!(err, CombineError::NothingToEvaluate));
    assert_eq!(db.entries().len(), before);
    Ok(())
}

#[test]
fn test_unknown_operator_leaves_database_alone() -> Result<()> {
    let db = three_boxes()?;
    let before = db.entries().len();
    let err = run(&db, "bad", &["boxA", "xor", "boxB"]).unwrap_err();
    assert!(matches!(
        err,
        CombineError::UnrecognizedOperator { ref token, root_index: 1 } if token == "xor"
    ));
    assert_eq!(db.entries().len(), before);
    assert!(!db.contains("bad"));
    Ok(())
}

#[test]
fn test_missing_root_is_reported_and_skipped() -> Result<()> {
    let db = three_boxes()?;
    let report = run(&db, "partial", &["boxA", "u", "ghost"])?;
    assert_relative_eq!(report.volume, 1000.0, epsilon = 1e-9);
    assert_eq!(report.branch_errors.len(), 1);
    assert!(report.branch_errors[0].contains("ghost"));
    Ok(())
}

#[test]
fn test_empty_result_is_not_written() -> Result<()> {
    let db = three_boxes()?;
    let err = run(&db, "void", &["boxA", "n", "boxC"]).unwrap_err();
    assert!(matches!(err, CombineError::EvaluationFailed(_)));
    assert!(!db.contains("void"));
    Ok(())
}

#[test]
fn test_existing_output_name() -> Result<()> {
    let db = three_boxes()?;
    let err = run(&db, "boxB", &["boxA"]).unwrap_err();
    assert!(matches!(err, CombineError::OutputExists(ref name) if name == "boxB"));
    Ok(())
}

#[test]
fn test_read_only_database() -> Result<()> {
    let mut db = three_boxes()?;
    db.set_read_only(true);
    let err = run(&db, "out", &["boxA"]).unwrap_err();
    assert!(matches!(err, CombineError::WriteFailed { .. }));
    Ok(())
}

#[test]
fn test_triangulated_result() -> Result<()> {
    let db = three_boxes()?;
    let request = CombineRequest::from_args(&["boxA", "u", "boxB"])?;
    let report = combine(
        &db,
        &CombineOptions::new("tri", request).triangulate(true),
        &EngineConfig::default(),
    )?;
    assert!(report.triangulated);
    assert_relative_eq!(report.volume, 1500.0, epsilon = 1e-6);

    match db.get_payload(&db.lookup("tri")?)?.as_ref() {
        Object::Brep(brep) => {
            assert!(brep.triangulated);
            assert!(brep.faces.iter().all(|f| f.0.len() == 3));
        }
        other => panic!("expected a brep, got {:?}", other.kind()),
    }
    Ok(())
}

#[test]
fn test_triangulation_failure_writes_nothing() -> Result<()> {
    let db = Database::new("speck");
    db.insert("speck", block([0.0, 0.0, 0.0], 1e-4))?;
    let request = CombineRequest::from_args(&["speck"])?;
    let err = combine(
        &db,
        &CombineOptions::new("tiny", request).triangulate(true),
        &EngineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CombineError::TriangulationFailed(_)));
    assert!(!db.contains("tiny"));
    assert_eq!(db.entries().len(), 1);
    Ok(())
}

#[test]
fn test_database_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("boxes.json");
    three_boxes()?.save(&path)?;

    let db = Database::open(&path)?;
    run(&db, "merged", &["boxA", "u", "boxB"])?;
    db.save(&path)?;

    let reopened = Database::open(&path)?;
    let handle = reopened.lookup("merged")?;
    assert_eq!(handle.kind(), &ObjectKind::Brep);

    // the written brep is itself usable as an operand
    let again = run(&reopened, "again", &["merged", "-", "boxA"])?;
    assert_relative_eq!(again.volume, 500.0, epsilon = 1e-6);
    Ok(())
}
