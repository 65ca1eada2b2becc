//! Forward map and reverse index kept together so every change touches both.

use crate::friends::directory::Participant;
use crate::friends::errors::FriendsError;
use crate::friends::reverse::ReverseIndex;
use crate::friends::store::{Admission, RelationshipStore, Snapshot};
use crate::friends::types::{FriendSet, GraphStats, ParticipantId, RelationshipRecord};

/// Saved copies of the entries a mutation is about to touch.
#[derive(Debug)]
pub struct Checkpoint {
    records: Vec<(ParticipantId, Option<RelationshipRecord>)>,
    reverse: Vec<(ParticipantId, Option<FriendSet>)>,
}

#[derive(Debug, Clone, Default)]
pub struct FriendGraph {
    forward: RelationshipStore,
    reverse: ReverseIndex,
}

impl FriendGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let forward = RelationshipStore::from_snapshot(snapshot);
        let reverse = ReverseIndex::build(&forward);
        Self { forward, reverse }
    }

    pub fn forward(&self) -> &RelationshipStore {
        &self.forward
    }

    pub fn reverse(&self) -> &ReverseIndex {
        &self.reverse
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.forward.records()
    }

    pub fn has_friend(&self, owner: &str, friend: &str) -> bool {
        self.forward.has_friend(owner, friend)
    }

    pub fn are_friends(&self, a: &str, b: &str) -> bool {
        self.forward.has_friend(a, b) && self.forward.has_friend(b, a)
    }

    pub fn friends(&self, owner: &str) -> Vec<ParticipantId> {
        self.forward.friends(owner)
    }

    pub fn friends_of(&self, friend: &str) -> Vec<ParticipantId> {
        self.reverse.owners_of(friend)
    }

    pub fn cached_name(&self, id: &str) -> Option<&str> {
        self.forward.cached_name(id)
    }

    pub fn admission(&self, owner: &str, friend: &str, capacity: Option<usize>) -> Admission {
        self.forward.admission(owner, friend, capacity)
    }

    /// Record `owner → friend` in both maps, create the friend's stub and
    /// refresh both cached names. Returns false if the link already existed.
    pub fn link(&mut self, owner: &Participant, friend: &Participant) -> bool {
        if !self
            .forward
            .insert_friend(&owner.id, &owner.name, friend.id.clone())
        {
            return false;
        }
        self.forward.set_name(owner.id.as_str(), &owner.name);
        if !self.forward.ensure_stub(&friend.id, &friend.name) {
            self.forward.set_name(friend.id.as_str(), &friend.name);
        }
        self.reverse.insert(friend.id.clone(), owner.id.clone());
        true
    }

    /// Drop `owner → friend` from both maps. The opposite direction is untouched.
    pub fn unlink(&mut self, owner: &str, friend: &str) -> bool {
        if !self.forward.remove_friend(owner, friend) {
            return false;
        }
        self.reverse.remove(friend, owner);
        true
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        self.forward.set_name(id, name)
    }

    pub fn checkpoint(&self, ids: &[&ParticipantId]) -> Checkpoint {
        Checkpoint {
            records: ids
                .iter()
                .map(|id| ((*id).clone(), self.forward.get_cloned(id.as_str())))
                .collect(),
            reverse: ids
                .iter()
                .map(|id| ((*id).clone(), self.reverse.get_cloned(id.as_str())))
                .collect(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        for (id, record) in checkpoint.records {
            self.forward.restore(id, record);
        }
        for (id, owners) in checkpoint.reverse {
            self.reverse.restore(id, owners);
        }
    }

    /// Recompute the reverse index from scratch and compare it with the live one.
    pub fn verify(&self) -> Result<(), FriendsError> {
        let expected = ReverseIndex::build(&self.forward);
        for (friend, owners) in expected.iter() {
            for owner in owners.iter() {
                if !self.reverse.contains(friend.as_str(), owner.as_str()) {
                    return Err(FriendsError::IndexMismatch(format!(
                        "{} lists {} but the reverse index does not",
                        owner, friend
                    )));
                }
            }
        }
        for (friend, owners) in self.reverse.iter() {
            if owners.is_empty() {
                return Err(FriendsError::IndexMismatch(format!(
                    "empty reverse entry for {}",
                    friend
                )));
            }
            for owner in owners.iter() {
                if !self.forward.has_friend(owner.as_str(), friend.as_str()) {
                    return Err(FriendsError::IndexMismatch(format!(
                        "reverse index says {} lists {} but the forward map does not",
                        owner, friend
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            records: self.forward.len(),
            reverse_entries: self.reverse.len(),
            ..GraphStats::default()
        };
        for (owner, record) in self.forward.iter() {
            if record.is_stub() {
                stats.stubs += 1;
            }
            stats.relationships += record.friends.len();
            stats.mutual_pairs += record
                .friends
                .iter()
                .filter(|friend| owner < *friend && self.has_friend(friend.as_str(), owner.as_str()))
                .count();
        }
        stats
    }
}
