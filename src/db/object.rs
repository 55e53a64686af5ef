// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Typed object payloads stored in a geometry database

use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minor-type discriminant of a database entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Combination,
    Arb8,
    Bot,
    Sphere,
    Half,
    Brep,
    /// A type tag this crate does not understand (e.g. `pipe`)
    Other(String),
}

impl ObjectKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "combination" => Self::Combination,
            "arb8" => Self::Arb8,
            "bot" => Self::Bot,
            "sphere" => Self::Sphere,
            "half" => Self::Half,
            "brep" => Self::Brep,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Combination => "combination",
            Self::Arb8 => "arb8",
            Self::Bot => "bot",
            Self::Sphere => "sphere",
            Self::Half => "half",
            Self::Brep => "brep",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_combination(&self) -> bool {
        matches!(self, Self::Combination)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Decoded ("internal") form of a database object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Object {
    Combination(Combination),
    Arb8(Arb8),
    Bot(Bot),
    Sphere(Sphere),
    Half(HalfSpace),
    Brep(Brep),
    /// Payload of an unknown type, kept verbatim
    #[serde(skip)]
    Opaque(Opaque),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Combination(_) => ObjectKind::Combination,
            Self::Arb8(_) => ObjectKind::Arb8,
            Self::Bot(_) => ObjectKind::Bot,
            Self::Sphere(_) => ObjectKind::Sphere,
            Self::Half(_) => ObjectKind::Half,
            Self::Brep(_) => ObjectKind::Brep,
            Self::Opaque(opaque) => ObjectKind::Other(opaque.type_name.clone()),
        }
    }

    pub fn as_combination(&self) -> Option<&Combination> {
        match self {
            Self::Combination(comb) => Some(comb),
            _ => None,
        }
    }

    /// Check the payload for values that cannot describe real geometry
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Combination(comb) => {
                for member in &comb.members {
                    if member.name.is_empty() {
                        return Err("member with an empty name".into());
                    }
                    if let Some(matrix) = &member.matrix {
                        if matrix.iter().any(|v| !v.is_finite()) {
                            return Err(format!("non-finite matrix on member {}", member.name));
                        }
                    }
                }
                Ok(())
            }
            Self::Arb8(arb) => finite_points(&arb.points),
            Self::Bot(bot) => {
                finite_points(&bot.vertices)?;
                let count = bot.vertices.len();
                match bot.faces.iter().flatten().find(|&&i| i >= count) {
                    Some(index) => Err(format!(
                        "face index {} out of range ({} vertices)",
                        index, count
                    )),
                    None => Ok(()),
                }
            }
            Self::Sphere(sphere) => {
                finite_points(std::slice::from_ref(&sphere.center))?;
                if sphere.radius.is_finite() && sphere.radius > 0.0 {
                    Ok(())
                } else {
                    Err(format!("invalid radius {}", sphere.radius))
                }
            }
            Self::Half(half) => {
                if half.normal.iter().all(|v| v.is_finite())
                    && half.distance.is_finite()
                    && half.normal.norm() > 0.0
                {
                    Ok(())
                } else {
                    Err("invalid half-space plane".into())
                }
            }
            Self::Brep(brep) => {
                for face in &brep.faces {
                    if face.0.len() < 3 {
                        return Err("face with fewer than 3 vertices".into());
                    }
                    finite_points(&face.0)?;
                }
                Ok(())
            }
            Self::Opaque(_) => Ok(()),
        }
    }
}

fn finite_points(points: &[Point3<f64>]) -> Result<(), String> {
    if points.iter().all(|p| p.iter().all(|v| v.is_finite())) {
        Ok(())
    } else {
        Err("non-finite coordinate".into())
    }
}

/// Inherited attributes of a region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

impl RegionAttributes {
    /// Values set on `other` replace the inherited ones
    pub fn overlay(&self, other: &RegionAttributes) -> RegionAttributes {
        RegionAttributes {
            region_id: other.region_id.or(self.region_id),
            material: other.material.clone().or_else(|| self.material.clone()),
            color: other.color.or(self.color),
        }
    }
}

/// One instanced child of a combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Matrix4<f64>>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matrix: None,
        }
    }

    pub fn with_matrix(name: impl Into<String>, matrix: Matrix4<f64>) -> Self {
        Self {
            name: name.into(),
            matrix: Some(matrix),
        }
    }

    pub fn translated(name: impl Into<String>, offset: Vector3<f64>) -> Self {
        Self::with_matrix(name, Matrix4::new_translation(&offset))
    }
}

/// Assembly node: a list of instanced members, optionally marked as a region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    #[serde(default)]
    pub region: bool,
    #[serde(default)]
    pub attributes: RegionAttributes,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Combination {
    pub fn group(members: Vec<Member>) -> Self {
        Self {
            region: false,
            attributes: RegionAttributes::default(),
            members,
        }
    }

    pub fn region(members: Vec<Member>) -> Self {
        Self {
            region: true,
            attributes: RegionAttributes::default(),
            members,
        }
    }
}

/// Convex solid described by 8 points.
///
/// Points 0-3 and 4-7 form opposite faces; coincident points are allowed
/// for the degenerate 4 to 7 point forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arb8 {
    pub points: [Point3<f64>; 8],
}

impl Arb8 {
    /// Face loops as indices into `points`
    pub const FACES: [[usize; 4]; 6] = [
        [0, 1, 2, 3],
        [4, 5, 6, 7],
        [0, 4, 5, 1],
        [1, 5, 6, 2],
        [2, 6, 7, 3],
        [3, 7, 4, 0],
    ];

    /// Axis-aligned box between `min` and `max`
    pub fn from_extents(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self::from_frame(
            min,
            [Vector3::x(), Vector3::y(), Vector3::z()],
            max - min,
        )
    }

    /// Box spanned from `origin` along three axes by the given lengths.
    ///
    /// Corner order: 0 origin, 1 +z, 2 +y+z, 3 +y, 4 +x, 5 +x+z, 6 +x+y+z, 7 +x+y.
    pub fn from_frame(origin: Point3<f64>, axes: [Vector3<f64>; 3], lengths: Vector3<f64>) -> Self {
        let dx = axes[0] * lengths.x;
        let dy = axes[1] * lengths.y;
        let dz = axes[2] * lengths.z;
        Self {
            points: [
                origin,
                origin + dz,
                origin + dy + dz,
                origin + dy,
                origin + dx,
                origin + dx + dz,
                origin + dx + dy + dz,
                origin + dx + dy,
            ],
        }
    }

    /// Edge lengths along the frame axes (x, y, z)
    pub fn dimensions(&self) -> Vector3<f64> {
        let p = &self.points;
        Vector3::new(
            (p[4] - p[0]).norm(),
            (p[3] - p[0]).norm(),
            (p[1] - p[0]).norm(),
        )
    }
}

/// Mesh of triangles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Infinite half-space `normal · p <= distance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfSpace {
    pub normal: Vector3<f64>,
    pub distance: f64,
}

/// One planar face loop of a boundary representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Face(pub Vec<Point3<f64>>);

/// Evaluated boundary representation, the payload written by `combine`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Brep {
    #[serde(default)]
    pub triangulated: bool,
    #[serde(default)]
    pub attributes: RegionAttributes,
    pub faces: Vec<Face>,
}

impl Brep {
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// sha256 over the canonical JSON encoding
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }
}

/// Payload of a type not modelled here
#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    pub type_name: String,
    pub raw: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_tagging() {
        let sphere = Object::Sphere(Sphere {
            center: Point3::origin(),
            radius: 2.0,
        });
        let json = serde_json::to_value(&sphere).unwrap();
        assert_eq!(json["type"], "sphere");
        let back: Object = serde_json::from_value(json).unwrap();
        assert_eq!(back, sphere);
    }

    #[test]
    fn test_bot_index_validation() {
        let bot = Object::Bot(Bot {
            vertices: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            faces: vec![[0, 1, 2]],
        });
        assert!(bot.validate().unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_attribute_overlay() {
        let parent = RegionAttributes {
            region_id: Some(1000),
            material: Some("steel".into()),
            color: None,
        };
        let child = RegionAttributes {
            region_id: None,
            material: Some("glass".into()),
            color: Some([255, 0, 0]),
        };
        let merged = parent.overlay(&child);
        assert_eq!(merged.region_id, Some(1000));
        assert_eq!(merged.material.as_deref(), Some("glass"));
        assert_eq!(merged.color, Some([255, 0, 0]));
    }

    #[test]
    fn test_arb8_extents_dimensions() {
        let arb = Arb8::from_extents(Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 6.0, 8.0));
        assert_eq!(arb.dimensions(), Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(arb.points[6], Point3::new(4.0, 6.0, 8.0));
    }
}
