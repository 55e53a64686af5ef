// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-kind geometric operations on database primitives

use super::bbox::BoundingBox;
use super::polygon::{convex_faces, enclosed_volume, Polygon};
use crate::config::Tolerance;
use crate::db::{Arb8, Bot, Brep, HalfSpace, Object, Sphere};
use crate::error::GeometryError;
use nalgebra::{Matrix3, Matrix4, Point3, SymmetricEigen, Vector3};
use std::f64::consts::PI;

/// Fewest segments around a sphere
pub const MIN_SEGMENTS: usize = 8;
/// Most segments around a sphere
pub const MAX_SEGMENTS: usize = 128;

/// Operations a primitive kind may provide.
///
/// A method returning `None` means the kind does not support it.
pub trait PrimitiveOps {
    /// Bounds after applying `matrix`
    fn bounds(&self, _matrix: &Matrix4<f64>) -> Option<BoundingBox> {
        None
    }

    fn volume(&self) -> Option<f64> {
        None
    }

    /// Oriented bounding box, each side at least `tol` long
    fn oriented_bbox(&self, _tol: f64) -> Option<Arb8> {
        None
    }

    /// Planar faces of the solid placed by `matrix`
    fn tessellate(
        &self,
        _matrix: &Matrix4<f64>,
        _tol: &Tolerance,
    ) -> Option<Result<Vec<Polygon>, GeometryError>> {
        None
    }
}

impl Object {
    /// Geometric operations for leaf kinds, `None` for combinations and unknown types
    pub fn as_primitive(&self) -> Option<&dyn PrimitiveOps> {
        match self {
            Object::Arb8(arb) => Some(arb),
            Object::Bot(bot) => Some(bot),
            Object::Sphere(sphere) => Some(sphere),
            Object::Half(half) => Some(half),
            Object::Brep(brep) => Some(brep),
            Object::Combination(_) | Object::Opaque(_) => None,
        }
    }
}

fn place(
    polygons: Vec<Polygon>,
    matrix: &Matrix4<f64>,
    what: &str,
) -> Result<Vec<Polygon>, GeometryError> {
    if polygons.iter().any(|p| !p.is_finite()) {
        return Err(GeometryError::NonFinite(what.to_string()));
    }
    if *matrix == Matrix4::identity() {
        return Ok(polygons);
    }
    let placed: Vec<Polygon> = polygons.iter().filter_map(|p| p.transform(matrix)).collect();
    if placed.is_empty() && !polygons.is_empty() {
        return Err(GeometryError::Degenerate(format!(
            "{} collapses under its placement matrix",
            what
        )));
    }
    Ok(placed)
}

impl Arb8 {
    fn local_faces(&self) -> Vec<Polygon> {
        let center = Point3::from(
            self.points
                .iter()
                .fold(Vector3::zeros(), |acc, p| acc + p.coords)
                / 8.0,
        );
        let loops = Arb8::FACES
            .iter()
            .map(|face| face.iter().map(|&i| self.points[i]).collect())
            .collect();
        convex_faces(loops, &center)
    }
}

impl PrimitiveOps for Arb8 {
    fn bounds(&self, matrix: &Matrix4<f64>) -> Option<BoundingBox> {
        Some(BoundingBox::from_transformed(&self.points, matrix))
    }

    fn volume(&self) -> Option<f64> {
        Some(enclosed_volume(&self.local_faces()).abs())
    }

    fn tessellate(
        &self,
        matrix: &Matrix4<f64>,
        _tol: &Tolerance,
    ) -> Option<Result<Vec<Polygon>, GeometryError>> {
        let faces = self.local_faces();
        if faces.len() < 4 {
            return Some(Err(GeometryError::Degenerate(
                "arb8 has fewer than 4 faces".into(),
            )));
        }
        Some(place(faces, matrix, "arb8"))
    }
}

impl Bot {
    fn local_faces(&self) -> Vec<Polygon> {
        let mut faces: Vec<Polygon> = self
            .faces
            .iter()
            .filter_map(|f| Polygon::new(f.iter().map(|&i| self.vertices[i]).collect()))
            .collect();
        // unoriented meshes: make the enclosed volume positive
        if enclosed_volume(&faces) < 0.0 {
            faces.iter_mut().for_each(Polygon::flip);
        }
        faces
    }
}

impl PrimitiveOps for Bot {
    fn bounds(&self, matrix: &Matrix4<f64>) -> Option<BoundingBox> {
        if self.vertices.is_empty() {
            return None;
        }
        Some(BoundingBox::from_transformed(&self.vertices, matrix))
    }

    fn volume(&self) -> Option<f64> {
        Some(enclosed_volume(&self.local_faces()).abs())
    }

    fn oriented_bbox(&self, tol: f64) -> Option<Arb8> {
        if self.vertices.is_empty() {
            return None;
        }
        let count = self.vertices.len() as f64;
        let mean = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords)
            / count;
        let covariance = self
            .vertices
            .iter()
            .fold(Matrix3::zeros(), |acc, v| {
                let d = v.coords - mean;
                acc + d * d.transpose()
            })
            / count;

        let eigen = SymmetricEigen::new(covariance);
        let mut axes = [
            eigen.eigenvectors.column(0).normalize(),
            eigen.eigenvectors.column(1).normalize(),
            eigen.eigenvectors.column(2).normalize(),
        ];
        if axes[0].cross(&axes[1]).dot(&axes[2]) < 0.0 {
            axes[2] = -axes[2];
        }

        let mut lo = Vector3::repeat(f64::INFINITY);
        let mut hi = Vector3::repeat(f64::NEG_INFINITY);
        for v in &self.vertices {
            let d = v.coords - mean;
            for k in 0..3 {
                let t = d.dot(&axes[k]);
                lo[k] = lo[k].min(t);
                hi[k] = hi[k].max(t);
            }
        }

        let lengths = (hi - lo).map(|len| len.max(tol));
        let origin = Point3::from(mean + axes[0] * lo[0] + axes[1] * lo[1] + axes[2] * lo[2]);
        Some(Arb8::from_frame(origin, axes, lengths))
    }

    fn tessellate(
        &self,
        matrix: &Matrix4<f64>,
        _tol: &Tolerance,
    ) -> Option<Result<Vec<Polygon>, GeometryError>> {
        Some(place(self.local_faces(), matrix, "bot"))
    }
}

/// Segments around the equator so that chord and normal errors stay within `tol`
pub fn sphere_segments(radius: f64, tol: &Tolerance) -> usize {
    let mut segments = MIN_SEGMENTS as f64;

    let chord = if tol.abs > 0.0 {
        tol.abs
    } else {
        tol.rel * radius
    };
    if chord > 0.0 && chord < radius {
        // sagitta r(1 - cos(pi / n)) <= chord
        segments = segments.max(PI / (1.0 - chord / radius).acos());
    }
    if tol.norm > 0.0 {
        segments = segments.max(PI / tol.norm);
    }

    (segments.ceil() as usize).clamp(MIN_SEGMENTS, MAX_SEGMENTS)
}

impl PrimitiveOps for Sphere {
    fn bounds(&self, matrix: &Matrix4<f64>) -> Option<BoundingBox> {
        let r = Vector3::repeat(self.radius);
        let local = BoundingBox::new(self.center - r, self.center + r);
        Some(BoundingBox::from_transformed(&local.corners(), matrix))
    }

    fn volume(&self) -> Option<f64> {
        Some(4.0 / 3.0 * PI * self.radius.powi(3))
    }

    fn tessellate(
        &self,
        matrix: &Matrix4<f64>,
        tol: &Tolerance,
    ) -> Option<Result<Vec<Polygon>, GeometryError>> {
        let slices = sphere_segments(self.radius, tol);
        let stacks = (slices / 2).max(4);

        let point = |stack: usize, slice: usize| {
            let phi = PI * stack as f64 / stacks as f64;
            let theta = 2.0 * PI * (slice % slices) as f64 / slices as f64;
            let ring = if stack == 0 || stack == stacks {
                0.0
            } else {
                self.radius * phi.sin()
            };
            self.center + Vector3::new(ring * theta.cos(), ring * theta.sin(), self.radius * phi.cos())
        };

        let mut loops = Vec::with_capacity(slices * stacks);
        for i in 0..stacks {
            for j in 0..slices {
                loops.push(vec![point(i, j), point(i + 1, j), point(i + 1, j + 1), point(i, j + 1)]);
            }
        }
        Some(place(convex_faces(loops, &self.center), matrix, "sphere"))
    }
}

/// Half-spaces are unbounded and have no faces
impl PrimitiveOps for HalfSpace {}

impl Brep {
    pub fn polygons(&self) -> Vec<Polygon> {
        self.faces
            .iter()
            .filter_map(|face| Polygon::new(face.0.clone()))
            .collect()
    }
}

impl PrimitiveOps for Brep {
    fn bounds(&self, matrix: &Matrix4<f64>) -> Option<BoundingBox> {
        if self.faces.is_empty() {
            return None;
        }
        Some(BoundingBox::from_transformed(
            self.faces.iter().flat_map(|f| f.0.iter()),
            matrix,
        ))
    }

    fn volume(&self) -> Option<f64> {
        Some(enclosed_volume(&self.polygons()).abs())
    }

    fn tessellate(
        &self,
        matrix: &Matrix4<f64>,
        _tol: &Tolerance,
    ) -> Option<Result<Vec<Polygon>, GeometryError>> {
        Some(place(self.polygons(), matrix, "brep"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube_bot(size: Vector3<f64>) -> Bot {
        let arb = Arb8::from_extents(Point3::origin(), Point3::from(size));
        let faces = Arb8::FACES
            .iter()
            .flat_map(|f| [[f[0], f[1], f[2]], [f[0], f[2], f[3]]])
            .collect();
        Bot {
            vertices: arb.points.to_vec(),
            faces,
        }
    }

    #[test]
    fn test_arb8_tessellation() {
        let arb = Arb8::from_extents(Point3::origin(), Point3::new(2.0, 3.0, 4.0));
        let faces = arb
            .tessellate(&Matrix4::identity(), &Tolerance::default())
            .unwrap()
            .unwrap();
        assert_eq!(faces.len(), 6);
        assert_relative_eq!(enclosed_volume(&faces), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_arb_forms() {
        // wedge: the top face collapses to an edge
        let mut arb = Arb8::from_extents(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        arb.points[2] = arb.points[1];
        arb.points[6] = arb.points[5];
        let volume = arb.volume().unwrap();
        assert_relative_eq!(volume, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_volume_within_tolerance() {
        let sphere = Sphere {
            center: Point3::new(1.0, 2.0, 3.0),
            radius: 5.0,
        };
        let faces = sphere
            .tessellate(&Matrix4::identity(), &Tolerance::default())
            .unwrap()
            .unwrap();
        let exact = sphere.volume().unwrap();
        let approx = enclosed_volume(&faces);
        assert!(approx < exact);
        assert!((exact - approx) / exact < 0.05);
    }

    #[test]
    fn test_segment_clamp() {
        let coarse = Tolerance {
            abs: 100.0,
            ..Tolerance::default()
        };
        assert_eq!(sphere_segments(1.0, &coarse), MIN_SEGMENTS);
        let fine = Tolerance {
            abs: 1e-9,
            ..Tolerance::default()
        };
        assert_eq!(sphere_segments(1.0, &fine), MAX_SEGMENTS);
    }

    #[test]
    fn test_inverted_bot_is_reoriented() {
        let mut bot = cube_bot(Vector3::new(1.0, 1.0, 1.0));
        for face in &mut bot.faces {
            face.swap(1, 2);
        }
        assert_relative_eq!(bot.volume().unwrap(), 1.0, epsilon = 1e-9);
        let faces = bot
            .tessellate(&Matrix4::identity(), &Tolerance::default())
            .unwrap()
            .unwrap();
        assert!(enclosed_volume(&faces) > 0.0);
    }

    #[test]
    fn test_oriented_bbox_of_rotated_bot() {
        let mut bot = cube_bot(Vector3::new(20.0, 4.0, 2.0));
        let rotation = Matrix4::from_euler_angles(0.0, 0.0, PI / 6.0);
        for v in &mut bot.vertices {
            *v = rotation.transform_point(v);
        }

        let obb = bot.oriented_bbox(1e-6).unwrap();
        let mut dims: Vec<f64> = obb.dimensions().iter().copied().collect();
        dims.sort_by(|a, b| a.total_cmp(b));
        assert_relative_eq!(dims[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(dims[1], 4.0, epsilon = 1e-6);
        assert_relative_eq!(dims[2], 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_half_space_is_unsupported() {
        let half = HalfSpace {
            normal: Vector3::z(),
            distance: 0.0,
        };
        assert!(half.bounds(&Matrix4::identity()).is_none());
        assert!(half
            .tessellate(&Matrix4::identity(), &Tolerance::default())
            .is_none());
    }

    #[test]
    fn test_translated_bounds() {
        let arb = Arb8::from_extents(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let shift = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0));
        let bbox = arb.bounds(&shift).unwrap();
        assert_eq!(bbox.min, Point3::new(0.0, 0.0, 5.0));
        assert_eq!(bbox.max, Point3::new(1.0, 1.0, 6.0));
    }
}
