//! Forward relationship map: owner → record (display name + friend list).

use std::collections::BTreeMap;

use crate::friends::types::{ParticipantId, RelationshipRecord};

/// Persisted form of the forward map. Ordered so snapshots serialize deterministically.
pub type Snapshot = BTreeMap<ParticipantId, RelationshipRecord>;

/// Result of checking whether `owner` may take on `friend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Open,
    Duplicate,
    Full,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipStore {
    records: Snapshot,
}

impl RelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(records: Snapshot) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Snapshot {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&RelationshipRecord> {
        self.records.get(id)
    }

    pub fn has_friend(&self, owner: &str, friend: &str) -> bool {
        self.records
            .get(owner)
            .is_some_and(|record| record.friends.contains(friend))
    }

    pub fn friends(&self, owner: &str) -> Vec<ParticipantId> {
        self.records
            .get(owner)
            .map(|record| record.friends.to_vec())
            .unwrap_or_default()
    }

    pub fn friend_count(&self, owner: &str) -> usize {
        self.records.get(owner).map_or(0, |record| record.friends.len())
    }

    pub fn cached_name(&self, id: &str) -> Option<&str> {
        self.records.get(id).map(|record| record.name.as_str())
    }

    /// Capacity and duplicate rules. A duplicate wins over a full list so that
    /// re-adding an existing friend never reports the list as full.
    /// `capacity == None` means the list is permanently full.
    pub fn admission(&self, owner: &str, friend: &str, capacity: Option<usize>) -> Admission {
        if self.has_friend(owner, friend) {
            return Admission::Duplicate;
        }
        match capacity {
            Some(max) if self.friend_count(owner) < max => Admission::Open,
            _ => Admission::Full,
        }
    }

    /// Append `friend` to the owner's list, creating the owner record if needed.
    /// Returns false if the friend was already listed.
    pub fn insert_friend(&mut self, owner: &ParticipantId, owner_name: &str, friend: ParticipantId) -> bool {
        let record = self
            .records
            .entry(owner.clone())
            .or_insert_with(|| RelationshipRecord::new(owner_name));
        record.friends.insert(friend)
    }

    pub fn remove_friend(&mut self, owner: &str, friend: &str) -> bool {
        self.records
            .get_mut(owner)
            .is_some_and(|record| record.friends.remove(friend))
    }

    /// Make sure a record exists for `id` so its name outlives its presence.
    /// Returns true if a stub was created.
    pub fn ensure_stub(&mut self, id: &ParticipantId, name: &str) -> bool {
        if self.records.contains_key(id.as_str()) {
            return false;
        }
        self.records.insert(id.clone(), RelationshipRecord::new(name));
        true
    }

    /// Update the cached name of an existing record. Returns true when it changed.
    pub fn set_name(&mut self, id: &str, name: &str) -> bool {
        match self.records.get_mut(id) {
            Some(record) if record.name != name => {
                record.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn get_cloned(&self, id: &str) -> Option<RelationshipRecord> {
        self.records.get(id).cloned()
    }

    /// Put a previously captured record back (or drop the entry when it did not exist).
    pub fn restore(&mut self, id: ParticipantId, record: Option<RelationshipRecord>) {
        match record {
            Some(record) => {
                self.records.insert(id, record);
            }
            None => {
                self.records.remove(id.as_str());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &RelationshipRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
