// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) operations using BSP trees.
//!
//! Nodes live in a flat arena and every traversal is iterative, so convex
//! inputs with thousands of faces (which degenerate into a chain) cannot
//! exhaust the stack.

use super::polygon::{Plane, Polygon, Split};

#[derive(Debug, Clone, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<usize>,
    back: Option<usize>,
    polygons: Vec<Polygon>,
}

/// BSP tree over a polygon set
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    epsilon: f64,
}

impl BspTree {
    pub fn new(polygons: Vec<Polygon>, epsilon: f64) -> Self {
        let mut tree = Self {
            nodes: vec![BspNode::default()],
            epsilon,
        };
        tree.build(polygons);
        tree
    }

    /// Insert polygons below the root
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut pending = vec![(0usize, polygons)];
        while let Some((index, polygons)) = pending.pop() {
            if polygons.is_empty() {
                continue;
            }
            let plane = match self.nodes[index].plane {
                Some(plane) => plane,
                None => {
                    let plane = polygons[0].plane;
                    self.nodes[index].plane = Some(plane);
                    plane
                }
            };

            let mut split = Split::default();
            for polygon in &polygons {
                plane.split_polygon(polygon, self.epsilon, &mut split);
            }
            let node = &mut self.nodes[index];
            node.polygons.append(&mut split.coplanar_front);
            node.polygons.append(&mut split.coplanar_back);

            if !split.front.is_empty() {
                let child = self.child(index, true);
                pending.push((child, split.front));
            }
            if !split.back.is_empty() {
                let child = self.child(index, false);
                pending.push((child, split.back));
            }
        }
    }

    fn child(&mut self, index: usize, front: bool) -> usize {
        let existing = if front {
            self.nodes[index].front
        } else {
            self.nodes[index].back
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(BspNode::default());
        if front {
            self.nodes[index].front = Some(child);
        } else {
            self.nodes[index].back = Some(child);
        }
        child
    }

    /// Swap solid and empty space
    pub fn invert(&mut self) {
        for node in &mut self.nodes {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` inside this tree's solid
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut pending = vec![(0usize, polygons)];
        while let Some((index, polygons)) = pending.pop() {
            let node = &self.nodes[index];
            let Some(plane) = node.plane else {
                result.extend(polygons);
                continue;
            };

            let mut split = Split::default();
            for polygon in &polygons {
                plane.split_polygon(polygon, self.epsilon, &mut split);
            }
            let mut front = split.front;
            front.append(&mut split.coplanar_front);
            let mut back = split.back;
            back.append(&mut split.coplanar_back);

            match node.front {
                Some(child) => pending.push((child, front)),
                None => result.extend(front),
            }
            // polygons behind a leaf plane are inside the solid
            if let Some(child) = node.back {
                pending.push((child, back));
            }
        }
        result
    }

    /// Clip every polygon of this tree against `other`
    pub fn clip_to(&mut self, other: &BspTree) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    pub fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|node| node.polygons.iter().cloned())
            .collect()
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.nodes
            .into_iter()
            .flat_map(|node| node.polygons)
            .collect()
    }
}

/// A ∪ B
pub fn union(a: Vec<Polygon>, b: Vec<Polygon>, epsilon: f64) -> Vec<Polygon> {
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }
    let mut a = BspTree::new(a, epsilon);
    let mut b = BspTree::new(b, epsilon);
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.into_polygons());
    a.into_polygons()
}

/// A − B
pub fn subtract(a: Vec<Polygon>, b: Vec<Polygon>, epsilon: f64) -> Vec<Polygon> {
    if a.is_empty() || b.is_empty() {
        return a;
    }
    let mut a = BspTree::new(a, epsilon);
    let mut b = BspTree::new(b, epsilon);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.into_polygons());
    a.invert();
    a.into_polygons()
}

/// A ∩ B
pub fn intersect(a: Vec<Polygon>, b: Vec<Polygon>, epsilon: f64) -> Vec<Polygon> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut a = BspTree::new(a, epsilon);
    let mut b = BspTree::new(b, epsilon);
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.into_polygons());
    a.invert();
    a.into_polygons()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon::{convex_faces, enclosed_volume};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    const EPS: f64 = 1e-6;

    fn cube(min: [f64; 3], size: f64) -> Vec<Polygon> {
        let p = |x: f64, y: f64, z: f64| Point3::new(min[0] + x * size, min[1] + y * size, min[2] + z * size);
        let loops = vec![
            vec![p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.), p(1., 0., 0.)],
            vec![p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
            vec![p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
            vec![p(0., 1., 0.), p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.)],
            vec![p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
            vec![p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.), p(1., 0., 1.)],
        ];
        let half = size / 2.0;
        convex_faces(loops, &Point3::new(min[0] + half, min[1] + half, min[2] + half))
    }

    #[test]
    fn test_cube_volume() {
        assert_relative_eq!(enclosed_volume(&cube([0.0; 3], 2.0)), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_overlapping() {
        let result = union(cube([0.0; 3], 10.0), cube([5.0, 0.0, 0.0], 10.0), EPS);
        assert_relative_eq!(enclosed_volume(&result), 1500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_subtract_overlapping() {
        let result = subtract(cube([0.0; 3], 10.0), cube([5.0, 0.0, 0.0], 10.0), EPS);
        assert_relative_eq!(enclosed_volume(&result), 500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_intersect_overlapping() {
        let result = intersect(cube([0.0; 3], 10.0), cube([5.0, 5.0, 5.0], 10.0), EPS);
        assert_relative_eq!(enclosed_volume(&result), 125.0, epsilon = 1e-6);
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let result = intersect(cube([0.0; 3], 1.0), cube([5.0, 0.0, 0.0], 1.0), EPS);
        assert!(result.is_empty());
    }

    #[test]
    fn test_subtract_everything() {
        let result = subtract(cube([1.0; 3], 1.0), cube([0.0; 3], 4.0), EPS);
        assert!(result.is_empty());
    }
}
