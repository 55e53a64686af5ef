// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the object store, the walker and the boolean operations

use crate::db::ObjectKind;
use thiserror::Error;

/// Object store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("corrupt payload for {name}: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("an object named {0} already exists")]
    Duplicate(String),

    #[error("database is read-only")]
    ReadOnly,

    #[error("failed to write {name}: {reason}")]
    Write { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Traversal failures.
///
/// Only a rejected region start or a failed worker pool aborts a whole
/// walk. Everything else is reported per branch.
#[derive(Error, Debug, Clone)]
pub enum WalkError {
    #[error("cycle detected: {path}")]
    CycleDetected { path: String },

    #[error("object not found: {name}")]
    ObjectNotFound { name: String },

    #[error("corrupt payload: {name} ({reason})")]
    CorruptPayload { name: String, reason: String },

    #[error("unsupported primitive: {0}")]
    UnsupportedPrimitive(ObjectKind),

    #[error("region start rejected at {path}: {reason}")]
    RegionRejected { path: String, reason: String },

    #[error("leaf {path} failed: {reason}")]
    LeafFailed { path: String, reason: String },

    #[error("object store error: {0}")]
    Store(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

impl WalkError {
    /// Whether this error aborts the whole traversal
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RegionRejected { .. } | Self::WorkerPool(_))
    }

    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => Self::ObjectNotFound { name },
            StoreError::Corrupt { name, reason } => Self::CorruptPayload { name, reason },
            other => Self::Store(other.to_string()),
        }
    }
}

/// Failures inside the B-rep model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("{0} produced an empty result")]
    EmptyResult(String),

    #[error("non-finite coordinates in {0}")]
    NonFinite(String),

    #[error("region {0} is not part of the model")]
    MissingRegion(u64),
}

/// Invocation-fatal failures of `combine`
#[derive(Error, Debug)]
pub enum CombineError {
    #[error("unrecognized operator {token:?} before root #{root_index}")]
    UnrecognizedOperator { token: String, root_index: usize },

    #[error("nothing to evaluate")]
    NothingToEvaluate,

    #[error("boolean evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("triangulation failed: {0}")]
    TriangulationFailed(String),

    #[error("failed to write {name}: {reason}")]
    WriteFailed { name: String, reason: String },

    #[error("{0} already exists")]
    OutputExists(String),

    #[error("traversal aborted: {0}")]
    Walk(#[from] WalkError),
}

/// Failures of the bounding box report
#[derive(Error, Debug)]
pub enum BoundsError {
    #[error("no objects given")]
    NoObjects,

    #[error("{0} has no measurable geometry")]
    Empty(String),

    #[error("oriented bounding box is only supported for BoT objects, {name} is {kind}")]
    OrientedUnsupported { name: String, kind: ObjectKind },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
