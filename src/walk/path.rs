// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Root-to-node paths through the assembly graph

use crate::error::WalkError;
use std::fmt;
use std::sync::Arc;

/// One step of a path: the object name and its position among its siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub name: Arc<str>,
    pub index: usize,
}

#[derive(Debug)]
struct Link {
    entry: PathEntry,
    parent: Option<Arc<Link>>,
    depth: usize,
}

/// Persistent path from a root to the current node.
///
/// Descending shares the parent's prefix, so sibling branches running on
/// different workers never copy or lock it.
#[derive(Debug, Clone, Default)]
pub struct FullPath {
    tip: Option<Arc<Link>>,
}

impl FullPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(name: impl Into<Arc<str>>) -> Self {
        Self::new().push(name.into(), 0)
    }

    fn push(&self, name: Arc<str>, index: usize) -> Self {
        Self {
            tip: Some(Arc::new(Link {
                entry: PathEntry { name, index },
                depth: self.depth() + 1,
                parent: self.tip.clone(),
            })),
        }
    }

    /// Extend the path by `name`, refusing names already on it
    pub fn descend(&self, name: &Arc<str>, index: usize) -> Result<Self, WalkError> {
        if self.contains(name) {
            return Err(WalkError::CycleDetected {
                path: format!("{}/{}", self, name),
            });
        }
        Ok(self.push(Arc::clone(name), index))
    }

    pub fn ascend(&self) -> Self {
        Self {
            tip: self.tip.as_ref().and_then(|link| link.parent.clone()),
        }
    }

    fn links(&self) -> impl Iterator<Item = &Link> {
        std::iter::successors(self.tip.as_deref(), |link| link.parent.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.links().any(|link| &*link.entry.name == name)
    }

    pub fn current(&self) -> Option<&PathEntry> {
        self.tip.as_ref().map(|link| &link.entry)
    }

    pub fn depth(&self) -> usize {
        self.tip.as_ref().map_or(0, |link| link.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.tip.is_none()
    }

    /// Entries from the root down
    pub fn entries(&self) -> Vec<PathEntry> {
        let mut entries: Vec<PathEntry> = self.links().map(|link| link.entry.clone()).collect();
        entries.reverse();
        entries
    }
}

impl PartialEq for FullPath {
    fn eq(&self, other: &Self) -> bool {
        self.depth() == other.depth() && self.links().zip(other.links()).all(|(a, b)| a.entry == b.entry)
    }
}

impl Eq for FullPath {}

impl fmt::Display for FullPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("/");
        }
        for entry in self.entries() {
            write!(f, "/{}", entry.name)?;
        }
        Ok(())
    }
}
