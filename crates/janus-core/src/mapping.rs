// Janus Mapping Table
// Static physical key -> (primary, secondary) function lookup

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::Key;

/// One configured key.
///
/// `primary` is emitted on a tap or a plain press and defaults to the
/// physical key itself. A key with a `secondary` function is a Janus key:
/// holding it emits the secondary function instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMappingEntry {
    pub physical: Key,
    pub primary: Option<Key>,
    pub secondary: Option<Key>,
}

impl KeyMappingEntry {
    /// Plain remap, no hold behavior
    pub fn remap(physical: Key, primary: Key) -> Self {
        Self {
            physical,
            primary: Some(primary),
            secondary: None,
        }
    }

    /// Dual-function key that taps as itself
    pub fn janus(physical: Key, secondary: Key) -> Self {
        Self {
            physical,
            primary: None,
            secondary: Some(secondary),
        }
    }

    /// Dual-function key with a remapped tap
    pub fn janus_with_primary(physical: Key, primary: Key, secondary: Key) -> Self {
        Self {
            physical,
            primary: Some(primary),
            secondary: Some(secondary),
        }
    }

    /// Function emitted on tap / plain press
    pub fn primary_function(&self) -> Key {
        self.primary.unwrap_or(self.physical)
    }

    pub fn is_janus(&self) -> bool {
        self.secondary.is_some()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Key {0} is mapped more than once")]
    DuplicateKey(Key),

    #[error("Keys {first} and {second} both hold {secondary}")]
    SharedSecondary { secondary: Key, first: Key, second: Key },
}

/// Read-only lookup from physical key to its mapping entry.
///
/// Keeps configuration order so that scans over Janus keys are deterministic.
#[derive(Debug, Clone, Default)]
pub struct KeyMappingTable {
    entries: IndexMap<Key, KeyMappingEntry>,
}

impl KeyMappingTable {
    pub fn new(entries: impl IntoIterator<Item = KeyMappingEntry>) -> Result<Self, MappingError> {
        let mut map = IndexMap::new();
        for entry in entries {
            if map.insert(entry.physical, entry).is_some() {
                return Err(MappingError::DuplicateKey(entry.physical));
            }
        }

        let table = Self { entries: map };
        table.check_shared_secondaries()?;
        Ok(table)
    }

    /// A hold function may belong to one Janus key only; with two owners,
    /// releasing either would lift it while the other is still held.
    fn check_shared_secondaries(&self) -> Result<(), MappingError> {
        let mut owners: HashMap<Key, Key> = HashMap::new();
        for entry in self.janus_entries() {
            let Some(secondary) = entry.secondary else { continue };
            if let Some(first) = owners.insert(secondary, entry.physical) {
                return Err(MappingError::SharedSecondary {
                    secondary,
                    first,
                    second: entry.physical,
                });
            }
        }
        Ok(())
    }

    pub fn lookup(&self, key: Key) -> Option<&KeyMappingEntry> {
        self.entries.get(&key)
    }

    pub fn is_janus(&self, key: Key) -> bool {
        self.lookup(key).is_some_and(KeyMappingEntry::is_janus)
    }

    /// Primary function for any key; unmapped keys pass through unchanged
    pub fn primary_of(&self, key: Key) -> Key {
        self.lookup(key)
            .map(KeyMappingEntry::primary_function)
            .unwrap_or(key)
    }

    pub fn janus_entries(&self) -> impl Iterator<Item = &KeyMappingEntry> + '_ {
        self.entries.values().filter(|e| e.is_janus())
    }

    pub fn entries(&self) -> impl Iterator<Item = &KeyMappingEntry> + '_ {
        self.entries.values()
    }

    /// Every key the mapping can emit, besides identity pass-through
    pub fn output_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .entries
            .values()
            .flat_map(|e| [Some(e.primary_function()), e.secondary])
            .flatten()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
