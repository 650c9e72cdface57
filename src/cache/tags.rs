//! # Tag Index
//!
//! The dependency graph between cached queries and the tags they provide.
//!
//! ```text
//! by_tag:  "Book" ─┬─ None     → { getListOfBooks(null) }
//!                  ├─ Some(1)  → { getListOfBooks(null), getBook({"id":1}) }
//!                  └─ Some(2)  → { getListOfBooks(null) }
//! by_key:  getBook({"id":1})  → [Book:1]
//! ```
//!
//! A bare tag (`Book`) invalidates every provider of that kind. An id tag
//! (`Book:1`) invalidates only providers of that exact id.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::cache::key::CacheKey;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: &'static str,
    pub id: Option<String>,
}

impl Tag {
    pub fn kind(kind: &'static str) -> Self {
        Self { kind, id: None }
    }

    pub fn id(kind: &'static str, id: impl fmt::Display) -> Self {
        Self {
            kind,
            id: Some(id.to_string()),
        }
    }
}

impl Tag {
    /// Whether invalidating `self` reaches a provider of `provided`.
    pub fn matches(&self, provided: &Tag) -> bool {
        self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.kind),
            None => f.write_str(self.kind),
        }
    }
}

#[derive(Debug, Default)]
pub struct TagIndex {
    by_tag: HashMap<&'static str, HashMap<Option<String>, HashSet<CacheKey>>>,
    by_key: HashMap<CacheKey, Vec<Tag>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything `key` provides with `tags`.
    pub fn replace(&mut self, key: &CacheKey, tags: Vec<Tag>) {
        self.remove_key(key);
        if tags.is_empty() {
            return;
        }
        for tag in &tags {
            self.by_tag
                .entry(tag.kind)
                .or_default()
                .entry(tag.id.clone())
                .or_default()
                .insert(key.clone());
        }
        self.by_key.insert(key.clone(), tags);
    }

    /// Drops every registration of `key`.
    pub fn remove_key(&mut self, key: &CacheKey) {
        let Some(tags) = self.by_key.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(ids) = self.by_tag.get_mut(tag.kind) {
                if let Some(keys) = ids.get_mut(&tag.id) {
                    keys.remove(key);
                    if keys.is_empty() {
                        ids.remove(&tag.id);
                    }
                }
                if ids.is_empty() {
                    self.by_tag.remove(tag.kind);
                }
            }
        }
    }

    /// Every cache key whose provided tags intersect `tags`.
    pub fn keys_for(&self, tags: &[Tag]) -> HashSet<CacheKey> {
        let mut keys = HashSet::new();
        for tag in tags {
            let Some(ids) = self.by_tag.get(tag.kind) else {
                continue;
            };
            match &tag.id {
                None => {
                    for providers in ids.values() {
                        keys.extend(providers.iter().cloned());
                    }
                }
                Some(_) => {
                    if let Some(providers) = ids.get(&tag.id) {
                        keys.extend(providers.iter().cloned());
                    }
                }
            }
        }
        keys
    }

    pub fn provided_by(&self, key: &CacheKey) -> &[Tag] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.by_tag.clear();
        self.by_key.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
