// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar convex polygons and plane splitting

use nalgebra::{Matrix4, Point3, Vector3};

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Oriented plane `normal · p = w`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub w: f64,
}

impl Plane {
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(f64::EPSILON)?;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Signed distance of `point` from the plane
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.w
    }

    /// Sort `polygon` into the four output lists, splitting it if it straddles the plane
    pub fn split_polygon(&self, polygon: &Polygon, epsilon: f64, out: &mut Split) {
        let mut polygon_type = COPLANAR;
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| {
                let t = self.distance(v);
                let kind = if t < -epsilon {
                    BACK
                } else if t > epsilon {
                    FRONT
                } else {
                    COPLANAR
                };
                polygon_type |= kind;
                kind
            })
            .collect();

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    out.coplanar_front.push(polygon.clone());
                } else {
                    out.coplanar_back.push(polygon.clone());
                }
            }
            FRONT => out.front.push(polygon.clone()),
            BACK => out.back.push(polygon.clone()),
            _ => {
                let n = polygon.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                    if ti != BACK {
                        front.push(vi);
                    }
                    if ti != FRONT {
                        back.push(vi);
                    }
                    if ti | tj == SPANNING {
                        let t = (self.w - self.normal.dot(&vi.coords))
                            / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        front.push(v);
                        back.push(v);
                    }
                }
                if front.len() >= 3 {
                    out.front.push(Polygon::with_plane(front, polygon.plane));
                }
                if back.len() >= 3 {
                    out.back.push(Polygon::with_plane(back, polygon.plane));
                }
            }
        }
    }
}

/// Result buckets of [`Plane::split_polygon`]
#[derive(Debug, Default)]
pub struct Split {
    pub coplanar_front: Vec<Polygon>,
    pub coplanar_back: Vec<Polygon>,
    pub front: Vec<Polygon>,
    pub back: Vec<Polygon>,
}

/// Planar convex polygon with counter-clockwise winding seen from the front
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Point3<f64>>,
    pub plane: Plane,
}

impl Polygon {
    /// Build a polygon, computing its plane with Newell's method.
    ///
    /// Returns `None` for fewer than three vertices or zero area.
    pub fn new(vertices: Vec<Point3<f64>>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let normal = newell_normal(&vertices).try_normalize(f64::EPSILON)?;
        let w = normal.dot(&vertices[0].coords);
        Some(Self {
            vertices,
            plane: Plane { normal, w },
        })
    }

    pub(crate) fn with_plane(vertices: Vec<Point3<f64>>, plane: Plane) -> Self {
        Self { vertices, plane }
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    pub fn area(&self) -> f64 {
        newell_normal(&self.vertices).norm() * 0.5
    }

    pub fn centroid(&self) -> Point3<f64> {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Contribution of this face to the enclosed volume (divergence theorem)
    pub fn signed_volume(&self) -> f64 {
        let v0 = self.vertices[0].coords;
        self.vertices[1..]
            .windows(2)
            .map(|w| v0.dot(&w[0].coords.cross(&w[1].coords)))
            .sum::<f64>()
            / 6.0
    }

    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.iter().all(|c| c.is_finite()))
    }

    /// Apply an affine transform, keeping the winding outward under mirroring
    pub fn transform(&self, matrix: &Matrix4<f64>) -> Option<Polygon> {
        let mut vertices: Vec<Point3<f64>> = self
            .vertices
            .iter()
            .map(|v| matrix.transform_point(v))
            .collect();
        if matrix.fixed_view::<3, 3>(0, 0).clone_owned().determinant() < 0.0 {
            vertices.reverse();
        }
        Polygon::new(vertices)
    }

    /// Fan triangulation. Only collinear fan triangles are skipped, so the
    /// triangles always cover the whole face.
    pub fn triangulate(&self) -> Vec<Polygon> {
        let v0 = self.vertices[0];
        self.vertices[1..]
            .windows(2)
            .filter_map(|w| {
                let (a, b) = (w[0] - v0, w[1] - v0);
                let collinear = a.cross(&b).norm() <= 1e-12 * a.norm() * b.norm();
                (!collinear).then(|| Polygon::with_plane(vec![v0, w[0], w[1]], self.plane))
            })
            .collect()
    }
}

fn newell_normal(vertices: &[Point3<f64>]) -> Vector3<f64> {
    let n = vertices.len();
    (0..n).fold(Vector3::zeros(), |acc, i| {
        acc + vertices[i].coords.cross(&vertices[(i + 1) % n].coords)
    })
}

/// Orient each loop outward from `center` and build polygons, skipping degenerate loops.
///
/// Only meaningful for convex solids.
pub fn convex_faces(loops: Vec<Vec<Point3<f64>>>, center: &Point3<f64>) -> Vec<Polygon> {
    loops
        .into_iter()
        .filter_map(|mut points| {
            points.dedup_by(|a, b| (*a - *b).norm() <= f64::EPSILON);
            while points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= f64::EPSILON {
                points.pop();
            }
            let mut polygon = Polygon::new(points)?;
            if polygon.plane.normal.dot(&(polygon.centroid() - center)) < 0.0 {
                polygon.flip();
            }
            Some(polygon)
        })
        .collect()
}

/// Enclosed volume of a closed polygon set
pub fn enclosed_volume(polygons: &[Polygon]) -> f64 {
    polygons.iter().map(Polygon::signed_volume).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_polygon_plane() {
        let square = unit_square();
        assert_relative_eq!(square.plane.normal, Vector3::z());
        assert_relative_eq!(square.area(), 1.0);
    }

    #[test]
    fn test_degenerate_polygon() {
        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(Polygon::new(line).is_none());
    }

    #[test]
    fn test_split_spanning() {
        let plane = Plane {
            normal: Vector3::x(),
            w: 0.5,
        };
        let mut split = Split::default();
        plane.split_polygon(&unit_square(), 1e-6, &mut split);

        assert_eq!(split.front.len(), 1);
        assert_eq!(split.back.len(), 1);
        assert_relative_eq!(split.front[0].area(), 0.5);
        assert_relative_eq!(split.back[0].area(), 0.5);
    }

    #[test]
    fn test_split_coplanar() {
        let plane = Plane {
            normal: -Vector3::z(),
            w: 0.0,
        };
        let mut split = Split::default();
        plane.split_polygon(&unit_square(), 1e-6, &mut split);
        assert_eq!(split.coplanar_back.len(), 1);
        assert!(split.front.is_empty() && split.back.is_empty());
    }

    #[test]
    fn test_mirror_keeps_orientation() {
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        let mirrored = unit_square().transform(&mirror).unwrap();
        assert_relative_eq!(mirrored.plane.normal, Vector3::z());
    }

    #[test]
    fn test_triangulate_square() {
        let triangles = unit_square().triangulate();
        assert_eq!(triangles.len(), 2);
        let total: f64 = triangles.iter().map(Polygon::area).sum();
        assert_relative_eq!(total, 1.0);
    }

    #[test]
    fn test_triangulate_keeps_slivers() {
        // a split vertex on the bottom edge and a sliver at the right
        let face = Polygon::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1e-7, 0.0),
            Point3::new(0.0, 1e-7, 0.0),
        ])
        .unwrap();
        let triangles = face.triangulate();
        // the fan triangle along the bottom edge is collinear
        assert_eq!(triangles.len(), 2);
        let total: f64 = triangles.iter().map(Polygon::area).sum();
        assert_relative_eq!(total, face.area(), max_relative = 1e-9);
    }
}
