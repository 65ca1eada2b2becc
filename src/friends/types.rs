use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::friends::errors::FriendsError;

/// Opaque participant identifier. The only rule enforced is that it is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Result<Self, FriendsError> {
        let id = id.into();
        if id.is_empty() {
            return Err(FriendsError::InvalidArgument("participant id must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display string used when no name is known for this identifier.
    pub fn placeholder_name(&self) -> String {
        format!("#{}", self.0)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = FriendsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl Borrow<str> for ParticipantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered set of identifiers.
///
/// Used for both friend lists and reverse-index entries. Membership checks
/// and inserts are hashed; removal shifts later entries so enumeration keeps
/// insertion order. Decoding goes through [`FromIterator`], so a stored list
/// with repeated ids loads with each id once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ParticipantId>", into = "Vec<ParticipantId>")]
pub struct FriendSet(IndexSet<ParticipantId>);

impl FriendSet {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Returns false when the id was already present.
    pub fn insert(&mut self, id: ParticipantId) -> bool {
        self.0.insert(id)
    }

    /// Returns false when the id was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.shift_remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantId> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<ParticipantId> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<ParticipantId> for FriendSet {
    fn from_iter<I: IntoIterator<Item = ParticipantId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<ParticipantId>> for FriendSet {
    fn from(ids: Vec<ParticipantId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<FriendSet> for Vec<ParticipantId> {
    fn from(set: FriendSet) -> Self {
        set.0.into_iter().collect()
    }
}

/// Persisted per-owner state: the last seen display name plus the owner's friend list.
///
/// Records with an empty friend list are stubs that only remember a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Friends", default)]
    pub friends: FriendSet,
}

impl RelationshipRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friends: FriendSet::new(),
        }
    }

    pub fn is_stub(&self) -> bool {
        self.friends.is_empty()
    }
}

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    SelfReference,
    CapacityExceeded,
    UnknownParticipant,
    AmbiguousTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The friend was already listed; nothing changed.
    AlreadyFriends,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The friend was not listed; nothing changed.
    NotFriends,
    Rejected(RejectReason),
}

/// Display-ready view of one owner's list, sorted for presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendListing {
    pub count: usize,
    pub max: i32,
    /// Connected friends that also list the owner back.
    pub online: Vec<String>,
    pub offline: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Disabled,
    EmptyMessage,
    NoFriends,
    Sent { delivered: usize },
}

/// Counters reported by the admin CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub records: usize,
    pub stubs: usize,
    pub relationships: usize,
    pub mutual_pairs: usize,
    pub reverse_entries: usize,
}
