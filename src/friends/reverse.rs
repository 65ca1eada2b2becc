//! Reverse index: friend → owners that list them.
//!
//! Never persisted. Built from the forward map at load and maintained
//! incrementally afterwards; empty sets are dropped immediately.

use std::collections::HashMap;

use crate::friends::store::RelationshipStore;
use crate::friends::types::{FriendSet, ParticipantId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseIndex {
    entries: HashMap<ParticipantId, FriendSet>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(forward: &RelationshipStore) -> Self {
        let mut index = Self::new();
        for (owner, record) in forward.iter() {
            for friend in record.friends.iter() {
                index.insert(friend.clone(), owner.clone());
            }
        }
        index
    }

    pub fn insert(&mut self, friend: ParticipantId, owner: ParticipantId) -> bool {
        self.entries.entry(friend).or_default().insert(owner)
    }

    pub fn remove(&mut self, friend: &str, owner: &str) -> bool {
        let Some(owners) = self.entries.get_mut(friend) else {
            return false;
        };
        let removed = owners.remove(owner);
        if owners.is_empty() {
            self.entries.remove(friend);
        }
        removed
    }

    pub fn contains(&self, friend: &str, owner: &str) -> bool {
        self.entries
            .get(friend)
            .is_some_and(|owners| owners.contains(owner))
    }

    pub fn has_entry(&self, friend: &str) -> bool {
        self.entries.contains_key(friend)
    }

    pub fn owners_of(&self, friend: &str) -> Vec<ParticipantId> {
        self.entries
            .get(friend)
            .map(FriendSet::to_vec)
            .unwrap_or_default()
    }

    pub fn get_cloned(&self, friend: &str) -> Option<FriendSet> {
        self.entries.get(friend).cloned()
    }

    pub fn restore(&mut self, friend: ParticipantId, owners: Option<FriendSet>) {
        match owners {
            Some(owners) if !owners.is_empty() => {
                self.entries.insert(friend, owners);
            }
            _ => {
                self.entries.remove(friend.as_str());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &FriendSet)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
