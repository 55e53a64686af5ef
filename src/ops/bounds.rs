// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding box report for one or more objects

use crate::db::{Arb8, Database, Object, ObjectKind};
use crate::error::BoundsError;
use crate::geometry::BoundingBox;
use crate::walk::{FullPath, TreeClient, TreeState, Walker};
use nalgebra::{Point3, Vector3};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BoundsOptions {
    /// Oriented box of a single BoT instead of the axis-aligned box
    pub oriented: bool,
    /// Store the box as a new arb8 under this name
    pub create: Option<String>,
    /// Minimum side length of an oriented box
    pub tolerance: f64,
}

impl Default for BoundsOptions {
    fn default() -> Self {
        Self {
            oriented: false,
            create: None,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundsReport {
    pub objects: Vec<String>,
    pub oriented: bool,
    pub min: Point3<f64>,
    pub max: Point3<f64>,
    /// Length, width and height along the box axes
    pub dimensions: Vector3<f64>,
    pub midpoint: Point3<f64>,
    pub volume: f64,
    pub corners: [Point3<f64>; 8],
    pub created: Option<String>,
    pub errors: Vec<String>,
}

struct BoundsClient;

impl TreeClient for BoundsClient {
    type Fragment = BoundingBox;

    fn leaf(
        &self,
        state: &TreeState,
        path: &FullPath,
        object: &Object,
    ) -> Result<Option<BoundingBox>, String> {
        let bbox = object
            .as_primitive()
            .and_then(|prim| prim.bounds(&state.matrix));
        if bbox.is_none() {
            debug!("{}: {} has no finite bounds", path, object.kind());
        }
        Ok(bbox)
    }
}

/// Compute the bounding box of `names`
pub fn bounds<S: AsRef<str> + Sync>(
    db: &Database,
    names: &[S],
    options: &BoundsOptions,
    workers: usize,
) -> Result<BoundsReport, BoundsError> {
    let Some(first) = names.first().map(|n| n.as_ref()) else {
        return Err(BoundsError::NoObjects);
    };
    let objects: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();

    let mut errors = Vec::new();
    let arb = if options.oriented {
        if names.len() > 1 {
            warn!("oriented bounding box only uses {}", first);
        }
        oriented_box(db, first, options.tolerance)?
    } else {
        let walker = Walker::new(db, workers)?;
        let outcome = walker.walk(names, &TreeState::default(), &BoundsClient)?;
        errors.extend(outcome.errors().map(|e| e.to_string()));

        let bbox = outcome
            .into_returned()
            .into_iter()
            .flat_map(|tree| tree.into_leaves())
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b));
        if bbox.is_empty() {
            return Err(BoundsError::Empty(objects.join(" ")));
        }
        bbox.to_arb8()
    };

    let extents = BoundingBox::from_points(&arb.points);
    let dimensions = arb.dimensions();
    let midpoint = Point3::from(
        arb.points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / 8.0,
    );

    let created = match &options.create {
        Some(name) => {
            db.insert(name, Object::Arb8(arb.clone()))?;
            Some(name.clone())
        }
        None => None,
    };

    Ok(BoundsReport {
        objects,
        oriented: options.oriented,
        min: extents.min,
        max: extents.max,
        dimensions,
        midpoint,
        volume: dimensions.x * dimensions.y * dimensions.z,
        corners: arb.points,
        created,
        errors,
    })
}

fn oriented_box(db: &Database, name: &str, tolerance: f64) -> Result<Arb8, BoundsError> {
    let handle = db.lookup(name)?;
    if handle.kind() != &ObjectKind::Bot {
        return Err(BoundsError::OrientedUnsupported {
            name: name.to_string(),
            kind: handle.kind().clone(),
        });
    }
    let object = db.get_payload(&handle)?;
    object
        .as_primitive()
        .and_then(|prim| prim.oriented_bbox(tolerance))
        .ok_or_else(|| BoundsError::Empty(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Combination, Member, Sphere};
    use approx::assert_relative_eq;

    fn fixture() -> Database {
        let db = Database::new("bb");
        db.insert(
            "cube",
            Object::Arb8(Arb8::from_extents(Point3::origin(), Point3::new(1.0, 2.0, 3.0))),
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
            "moved",
            Object::Combination(Combination::group(vec![Member::translated(
                "cube",
                Vector3::new(10.0, 0.0, 0.0),
            )])),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_translated_box() {
        let db = fixture();
        let report = bounds(&db, &["moved"], &BoundsOptions::default(), 1).unwrap();
        assert_eq!(report.min, Point3::new(10.0, 0.0, 0.0));
        assert_eq!(report.max, Point3::new(11.0, 2.0, 3.0));
        assert_relative_eq!(report.dimensions, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(report.midpoint, Point3::new(10.5, 1.0, 1.5));
        assert_relative_eq!(report.volume, 6.0);
    }

    #[test]
    fn test_multiple_objects_and_create() {
        let db = fixture();
        let options = BoundsOptions {
            create: Some("hull".into()),
            ..BoundsOptions::default()
        };
        let report = bounds(&db, &["ball", "moved"], &options, 2).unwrap();
        assert_eq!(report.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(report.max, Point3::new(11.0, 2.0, 3.0));
        assert_eq!(db.lookup("hull").unwrap().kind(), &ObjectKind::Arb8);
    }

    #[test]
    fn test_oriented_requires_bot() {
        let db = fixture();
        let options = BoundsOptions {
            oriented: true,
            ..BoundsOptions::default()
        };
        let err = bounds(&db, &["cube"], &options, 1).unwrap_err();
        assert!(matches!(err, BoundsError::OrientedUnsupported { .. }));
    }

    #[test]
    fn test_no_objects() {
        let db = fixture();
        let names: [&str; 0] = [];
        assert!(matches!(
            bounds(&db, &names, &BoundsOptions::default(), 1),
            Err(BoundsError::NoObjects)
        ));
    }
}
