// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry database: a directory of named objects with lazily decoded payloads

pub mod object;

pub use object::{
    Arb8, Bot, Brep, Combination, Face, HalfSpace, Member, Object, ObjectKind, Opaque,
    RegionAttributes, Sphere,
};

use crate::error::StoreError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Handle to a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    name: Arc<str>,
    kind: ObjectKind,
}

impl ObjectRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }
}

#[derive(Debug, Clone)]
struct Entry {
    kind: ObjectKind,
    name: Arc<str>,
    /// `None` until the first payload write
    raw: Option<serde_json::Value>,
    /// Bumped on every payload write
    generation: u64,
}

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct DatabaseFile {
    #[serde(default)]
    title: String,
    #[serde(default)]
    objects: BTreeMap<String, serde_json::Value>,
}

/// In-memory geometry database.
///
/// Reads may happen from any number of threads; writes take the directory
/// lock for the duration of a single entry update.
#[derive(Debug, Default)]
pub struct Database {
    title: String,
    directory: RwLock<BTreeMap<String, Entry>>,
    cache: DashMap<String, Arc<Object>>,
    read_only: bool,
}

impl Database {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Load a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let db = Self::from_json(&text)?;
        debug!(
            "opened {} ({} objects)",
            path.display(),
            db.directory_len()
        );
        Ok(db)
    }

    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        let file: DatabaseFile = serde_json::from_str(text)?;
        let directory = file
            .objects
            .into_iter()
            .map(|(name, raw)| {
                let kind = raw
                    .get("type")
                    .and_then(|t| t.as_str())
                    .map(ObjectKind::from_tag)
                    .unwrap_or_else(|| ObjectKind::Other(String::new()));
                let entry = Entry {
                    kind,
                    name: Arc::from(name.as_str()),
                    raw: Some(raw),
                    generation: 0,
                };
                (name, entry)
            })
            .collect();

        Ok(Self {
            title: file.title,
            directory: RwLock::new(directory),
            cache: DashMap::new(),
            read_only: false,
        })
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        let file = DatabaseFile {
            title: self.title.clone(),
            objects: directory
                .iter()
                .filter_map(|(name, entry)| entry.raw.clone().map(|raw| (name.clone(), raw)))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the database to `path` through a temporary file in the same directory
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        debug!("saved {}", path.display());
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn directory_len(&self) -> usize {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All directory entries in name order
    pub fn entries(&self) -> Vec<ObjectRef> {
        self.directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| ObjectRef {
                name: Arc::clone(&entry.name),
                kind: entry.kind.clone(),
            })
            .collect()
    }

    pub fn lookup(&self, name: &str) -> Result<ObjectRef, StoreError> {
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        directory
            .get(name)
            .map(|entry| ObjectRef {
                name: Arc::clone(&entry.name),
                kind: entry.kind.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Decode and validate the payload behind `obj`
    pub fn get_payload(&self, obj: &ObjectRef) -> Result<Arc<Object>, StoreError> {
        if let Some(cached) = self.cache.get(obj.name()) {
            return Ok(Arc::clone(cached.value()));
        }

        let (raw, generation) = {
            let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
            let entry = directory
                .get(obj.name())
                .ok_or_else(|| StoreError::NotFound(obj.name().to_string()))?;
            let raw = entry.raw.clone().ok_or_else(|| StoreError::Corrupt {
                name: obj.name().to_string(),
                reason: "entry has no payload".into(),
            })?;
            (raw, entry.generation)
        };

        let object = Arc::new(decode(obj, raw)?);

        // Writers invalidate the cache under the write lock, so only cache
        // the decoded object if no write happened while decoding.
        let directory = self.directory.read().unwrap_or_else(PoisonError::into_inner);
        if directory
            .get(obj.name())
            .is_some_and(|entry| entry.generation == generation)
        {
            self.cache
                .insert(obj.name().to_string(), Arc::clone(&object));
        }
        Ok(object)
    }

    /// Replace the payload of an existing entry
    pub fn put_payload(&self, obj: &ObjectRef, object: Object) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        if &object.kind() != obj.kind() {
            return Err(StoreError::Write {
                name: obj.name().to_string(),
                reason: format!("payload is {}, entry is {}", object.kind(), obj.kind()),
            });
        }
        object.validate().map_err(|reason| StoreError::Write {
            name: obj.name().to_string(),
            reason,
        })?;

        let raw = match &object {
            Object::Opaque(opaque) => opaque.raw.clone(),
            other => serde_json::to_value(other)?,
        };

        let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
        let entry = directory
            .get_mut(obj.name())
            .ok_or_else(|| StoreError::NotFound(obj.name().to_string()))?;
        entry.raw = Some(raw);
        entry.generation += 1;
        self.cache.remove(obj.name());
        Ok(())
    }

    /// Create an empty directory entry
    pub fn add_entry(&self, name: &str, kind: ObjectKind) -> Result<ObjectRef, StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
        if directory.contains_key(name) {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        let entry = Entry {
            kind: kind.clone(),
            name: Arc::from(name),
            raw: None,
            generation: 0,
        };
        let handle = ObjectRef {
            name: Arc::clone(&entry.name),
            kind,
        };
        directory.insert(name.to_string(), entry);
        Ok(handle)
    }

    pub fn remove_entry(&self, name: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut directory = self.directory.write().unwrap_or_else(PoisonError::into_inner);
        directory
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        self.cache.remove(name);
        Ok(())
    }

    /// Add an entry and write its payload in one step
    pub fn insert(&self, name: &str, object: Object) -> Result<ObjectRef, StoreError> {
        let handle = self.add_entry(name, object.kind())?;
        if let Err(err) = self.put_payload(&handle, object) {
            // the entry is useless without a payload
            if let Err(cleanup) = self.remove_entry(name) {
                warn!("could not remove {} after failed write: {}", name, cleanup);
            }
            return Err(err);
        }
        Ok(handle)
    }
}

fn decode(obj: &ObjectRef, raw: serde_json::Value) -> Result<Object, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        name: obj.name().to_string(),
        reason,
    };

    let object = match obj.kind() {
        ObjectKind::Other(tag) if tag.is_empty() => {
            return Err(corrupt("missing type tag".into()));
        }
        ObjectKind::Other(tag) => Object::Opaque(Opaque {
            type_name: tag.clone(),
            raw,
        }),
        _ => serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))?,
    };

    if &object.kind() != obj.kind() {
        return Err(corrupt(format!(
            "payload decodes as {}, entry is {}",
            object.kind(),
            obj.kind()
        )));
    }
    object.validate().map_err(corrupt)?;
    Ok(object)
}
