//! Hash-sorted name registry
//!
//! Entries are collected once at start-up, sorted by the hash of their name
//! and looked up by binary search. Identity is the hash: two names with the
//! same hash cannot coexist, and `init` reports the pair instead of letting
//! one shadow the other.

use std::cmp::Ordering;

use log::warn;
use thiserror::Error;

use crate::hash::name_hash;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("names {first:?} and {second:?} share hash {hash:#010x}")]
    DuplicateHash {
        hash: u32,
        first: &'static str,
        second: &'static str,
    },
    #[error("{name:?} is already defined")]
    AlreadyDefined { name: String },
}

#[derive(Debug, Clone)]
pub struct RegistryEntry<T> {
    pub hash: u32,
    pub name: &'static str,
    pub payload: T,
}

#[derive(Debug, Clone)]
pub struct NameRegistry<T> {
    entries: Vec<RegistryEntry<T>>,
    sorted: bool,
}

impl<T> Default for NameRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NameRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            sorted: true,
        }
    }

    /// Add an entry. The registry must be `init`ed again before the next
    /// binary search; until then lookups fall back to a linear scan.
    pub fn register(&mut self, name: &'static str, payload: T) {
        self.entries.push(RegistryEntry {
            hash: name_hash(name),
            name,
            payload,
        });
        self.sorted = self.entries.len() <= 1;
    }

    /// Sort by hash and reject duplicate hashes.
    pub fn init(&mut self) -> Result<(), RegistryError> {
        self.entries.sort_by_key(|entry| entry.hash);
        if let Some(pair) = self.entries.windows(2).find(|w| w[0].hash == w[1].hash) {
            let err = RegistryError::DuplicateHash {
                hash: pair[0].hash,
                first: pair[0].name,
                second: pair[1].name,
            };
            warn!("NameRegistry::init: {}", err);
            return Err(err);
        }
        self.sorted = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in hash order once initialized.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry<T>> {
        self.entries.iter()
    }

    pub fn find(&self, hash: u32) -> Option<&T> {
        let (index, _) = self.search(hash);
        index.map(|i| &self.entries[i].payload)
    }

    pub fn find_mut(&mut self, hash: u32) -> Option<&mut T> {
        let (index, _) = self.search(hash);
        index.map(move |i| &mut self.entries[i].payload)
    }

    pub fn find_name(&self, name: &str) -> Option<&T> {
        self.find(name_hash(name))
    }

    pub fn entry(&self, hash: u32) -> Option<&RegistryEntry<T>> {
        let (index, _) = self.search(hash);
        index.map(|i| &self.entries[i])
    }

    /// Index of the matching entry and the number of entries compared.
    fn search(&self, hash: u32) -> (Option<usize>, u32) {
        if !self.sorted {
            let index = self.entries.iter().position(|e| e.hash == hash);
            return (index, self.entries.len() as u32);
        }

        let (mut lo, mut hi) = (0, self.entries.len());
        let mut probes = 0;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            probes += 1;
            match self.entries[mid].hash.cmp(&hash) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return (Some(mid), probes),
            }
        }
        (None, probes)
    }
}
