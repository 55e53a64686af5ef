// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shared B-rep model holding the regions produced during one evaluation

use super::bsp;
use super::polygon::{enclosed_volume, Polygon};
use crate::csg::BoolOp;
use crate::db::{Brep, Face};
use crate::error::GeometryError;
use ahash::AHashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

pub type RegionId = u64;

/// One solid of the model
#[derive(Debug, Clone)]
pub struct Region {
    pub label: String,
    pub faces: Vec<Polygon>,
    pub triangulated: bool,
}

impl Region {
    pub fn volume(&self) -> f64 {
        enclosed_volume(&self.faces)
    }

    pub fn into_brep(self) -> Brep {
        Brep {
            triangulated: self.triangulated,
            attributes: Default::default(),
            faces: self
                .faces
                .into_iter()
                .map(|polygon| Face(polygon.vertices))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct ModelInner {
    next_id: RegionId,
    regions: AHashMap<RegionId, Region>,
}

/// Lock-guarded region set shared by all workers of one evaluation.
///
/// Cloning yields another reference to the same model.
#[derive(Debug, Clone)]
pub struct Model {
    inner: Arc<Mutex<ModelInner>>,
    epsilon: f64,
}

impl Model {
    /// `epsilon` is the plane distance tolerance used by boolean operations
    pub fn new(epsilon: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ModelInner::default())),
            epsilon,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ModelInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a region and hand out its owning handle
    pub fn add_region(&self, label: impl Into<String>, faces: Vec<Polygon>) -> RegionHandle {
        let label: Arc<str> = Arc::from(label.into());
        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.regions.insert(
                id,
                Region {
                    label: label.to_string(),
                    faces,
                    triangulated: false,
                },
            );
            id
        };
        trace!("model: added region {} ({})", id, label);
        RegionHandle {
            id,
            label,
            model: self.clone(),
            live: true,
        }
    }

    pub fn region_count(&self) -> usize {
        self.lock().regions.len()
    }

    fn remove(&self, id: RegionId) -> Option<Region> {
        self.lock().regions.remove(&id)
    }

    /// Combine two regions into a new one, consuming both handles
    pub fn boolean(
        &self,
        op: BoolOp,
        mut a: RegionHandle,
        mut b: RegionHandle,
    ) -> Result<RegionHandle, GeometryError> {
        let left = self.remove(a.id).ok_or(GeometryError::MissingRegion(a.id))?;
        a.live = false;
        let right = self.remove(b.id).ok_or(GeometryError::MissingRegion(b.id))?;
        b.live = false;

        let label = format!("({} {} {})", a.label, op.symbol(), b.label);
        let faces = match op {
            BoolOp::Union => bsp::union(left.faces, right.faces, self.epsilon),
            BoolOp::Subtract => bsp::subtract(left.faces, right.faces, self.epsilon),
            BoolOp::Intersect => bsp::intersect(left.faces, right.faces, self.epsilon),
        };

        if faces.is_empty() {
            return Err(GeometryError::EmptyResult(label));
        }
        if faces.iter().any(|f| !f.is_finite()) {
            return Err(GeometryError::NonFinite(label));
        }
        Ok(self.add_region(label, faces))
    }

    /// Check that the region is a non-empty, finite solid
    pub fn validate(&self, handle: &RegionHandle) -> Result<(), GeometryError> {
        let inner = self.lock();
        let region = inner
            .regions
            .get(&handle.id)
            .ok_or(GeometryError::MissingRegion(handle.id))?;
        if region.faces.is_empty() {
            return Err(GeometryError::EmptyResult(region.label.clone()));
        }
        if let Some(face) = region.faces.iter().find(|f| f.vertices.len() < 3) {
            return Err(GeometryError::Degenerate(format!(
                "face with {} vertices in {}",
                face.vertices.len(),
                region.label
            )));
        }
        if region.faces.iter().any(|f| !f.is_finite()) {
            return Err(GeometryError::NonFinite(region.label.clone()));
        }
        Ok(())
    }

    /// Replace every face of the region by triangles.
    ///
    /// Faces with an area at or below the squared plane tolerance are rejected.
    pub fn triangulate(&self, handle: &RegionHandle) -> Result<(), GeometryError> {
        let mut inner = self.lock();
        let region = inner
            .regions
            .get_mut(&handle.id)
            .ok_or(GeometryError::MissingRegion(handle.id))?;

        let min_area = self.epsilon * self.epsilon;
        let mut triangles = Vec::with_capacity(region.faces.len() * 2);
        for face in &region.faces {
            if face.vertices.len() < 3 {
                return Err(GeometryError::Degenerate(region.label.clone()));
            }
            if !face.is_finite() {
                return Err(GeometryError::NonFinite(region.label.clone()));
            }
            if face.area() <= min_area {
                return Err(GeometryError::Degenerate(format!(
                    "face of area {:e} in {}",
                    face.area(),
                    region.label
                )));
            }
            triangles.extend(face.triangulate());
        }
        if triangles.is_empty() {
            return Err(GeometryError::EmptyResult(region.label.clone()));
        }

        region.faces = triangles;
        region.triangulated = true;
        Ok(())
    }

    pub fn volume(&self, handle: &RegionHandle) -> Option<f64> {
        self.lock().regions.get(&handle.id).map(Region::volume)
    }

    pub fn face_count(&self, handle: &RegionHandle) -> Option<usize> {
        self.lock().regions.get(&handle.id).map(|r| r.faces.len())
    }

    /// Remove the region from the model and return it
    pub fn take(&self, mut handle: RegionHandle) -> Option<Region> {
        handle.live = false;
        self.remove(handle.id)
    }
}

/// Owning reference to one region of a [`Model`].
///
/// Dropping a live handle removes its region from the model.
pub struct RegionHandle {
    id: RegionId,
    label: Arc<str>,
    model: Model,
    live: bool,
}

impl RegionHandle {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

impl Drop for RegionHandle {
    fn drop(&mut self) {
        if self.live && self.model.remove(self.id).is_some() {
            trace!("model: released region {} ({})", self.id, self.label);
        }
    }
}
