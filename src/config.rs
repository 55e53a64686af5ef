// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration: tolerances and worker count

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default config file looked up by [`EngineConfig::load`]
pub const CONFIG_FILE: &str = "booltree.toml";

/// Tessellation and boolean tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Absolute chord deviation, 0 disables
    pub abs: f64,
    /// Chord deviation relative to object size, 0 disables
    pub rel: f64,
    /// Maximum angle between adjacent facet normals in radians, 0 disables
    pub norm: f64,
    /// Distance below which points are considered on a plane
    pub dist: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs: 0.0,
            rel: 0.01,
            norm: 0.0,
            dist: 0.0005,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Traversal workers; 1 walks on the calling thread
    pub workers: usize,
    pub tolerance: Tolerance,
    /// Triangulate combine results before writing them
    pub triangulate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            tolerance: Tolerance::default(),
            triangulate: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `booltree.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BOOLTREE_*` overrides from `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(workers) = parse_var(&lookup, "BOOLTREE_WORKERS")? {
            self.workers = workers;
        }
        if let Some(abs) = parse_var(&lookup, "BOOLTREE_TOL_ABS")? {
            self.tolerance.abs = abs;
        }
        if let Some(rel) = parse_var(&lookup, "BOOLTREE_TOL_REL")? {
            self.tolerance.rel = rel;
        }
        if let Some(norm) = parse_var(&lookup, "BOOLTREE_TOL_NORM")? {
            self.tolerance.norm = norm;
        }
        if let Some(dist) = parse_var(&lookup, "BOOLTREE_TOL_DIST")? {
            self.tolerance.dist = dist;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_triangulate(mut self, triangulate: bool) -> Self {
        self.triangulate = triangulate;
        self
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}
