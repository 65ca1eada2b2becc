//! Presence directory contract plus an in-memory implementation.
//!
//! The host owns the real directory (who exists, who is connected, what they
//! are called). The friend graph only consumes it through [`Directory`].
//!
//! ## Name matching
//! [`Directory::find_by_name_or_id`] searches in three passes and stops at the
//! first pass that produces a hit:
//! 1. exact identifier
//! 2. exact display name
//! 3. case-insensitive, whitespace-normalized substring of the display name
//!
//! More than one hit inside a name pass is reported as ambiguous.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use crate::friends::types::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub is_connected: bool,
}

impl Participant {
    pub fn online(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_connected: true,
        }
    }

    pub fn offline(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_connected: false,
        }
    }
}

/// Result of a name-or-id search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Found(Participant),
    /// Multiple participants match - caller must be more specific
    Ambiguous(Vec<Participant>),
    NotFound,
}

pub trait Directory: Send + Sync {
    /// Resolve an identifier to a known participant, connected or not.
    fn lookup(&self, id: &ParticipantId) -> Option<Participant>;

    fn enumerate_all(&self) -> Vec<Participant>;

    fn find_by_name_or_id(&self, query: &str) -> MatchResult {
        let query = query.trim();
        if query.is_empty() {
            return MatchResult::NotFound;
        }
        let everyone = self.enumerate_all();

        if let Some(hit) = everyone.iter().find(|p| p.id.as_str() == query) {
            return MatchResult::Found(hit.clone());
        }

        let exact: Vec<&Participant> = everyone.iter().filter(|p| p.name == query).collect();
        if let Some(result) = single_or_ambiguous(&exact) {
            return result;
        }

        let needle = normalize_name(query);
        let partial: Vec<&Participant> = everyone
            .iter()
            .filter(|p| normalize_name(&p.name).contains(&needle))
            .collect();
        single_or_ambiguous(&partial).unwrap_or(MatchResult::NotFound)
    }

    /// Whether the host has explicitly granted `participant` access to things
    /// owned by `owner` (e.g. a lock or turret whitelist). Independent of friendship.
    fn is_explicitly_authorized(&self, _owner: &ParticipantId, _participant: &ParticipantId) -> bool {
        false
    }
}

fn single_or_ambiguous(hits: &[&Participant]) -> Option<MatchResult> {
    match hits {
        [] => None,
        [only] => Some(MatchResult::Found((*only).clone())),
        many => Some(MatchResult::Ambiguous(
            many.iter().map(|p| (*p).clone()).collect(),
        )),
    }
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Thread-safe in-memory directory for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct PresenceDirectory {
    participants: RwLock<Vec<Participant>>,
    grants: RwLock<HashSet<(ParticipantId, ParticipantId)>>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or update) a participant and mark them connected.
    pub fn connect(&self, id: &ParticipantId, name: &str) -> Participant {
        self.upsert(Participant::online(id.clone(), name))
    }

    /// Mark a participant as disconnected; they stay known to the directory.
    pub fn disconnect(&self, id: &ParticipantId) -> Option<Participant> {
        let mut participants = self
            .participants
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = participants.iter_mut().find(|p| &p.id == id)?;
        entry.is_connected = false;
        Some(entry.clone())
    }

    /// Register a participant who has been seen before but is not connected.
    pub fn register_offline(&self, id: &ParticipantId, name: &str) -> Participant {
        self.upsert(Participant::offline(id.clone(), name))
    }

    pub fn forget(&self, id: &ParticipantId) -> bool {
        let mut participants = self
            .participants
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = participants.len();
        participants.retain(|p| &p.id != id);
        participants.len() != before
    }

    pub fn authorize(&self, owner: &ParticipantId, participant: &ParticipantId) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((owner.clone(), participant.clone()));
    }

    fn upsert(&self, participant: Participant) -> Participant {
        let mut participants = self
            .participants
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant.clone(),
            None => participants.push(participant.clone()),
        }
        participant
    }
}

impl Directory for PresenceDirectory {
    fn lookup(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| &p.id == id)
            .cloned()
    }

    fn enumerate_all(&self) -> Vec<Participant> {
        self.participants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_explicitly_authorized(&self, owner: &ParticipantId, participant: &ParticipantId) -> bool {
        self.grants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(owner.clone(), participant.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ParticipantId {
        ParticipantId::new(raw).unwrap()
    }

    fn directory() -> PresenceDirectory {
        let dir = PresenceDirectory::new();
        dir.connect(&id("1001"), "Alice");
        dir.connect(&id("1002"), "Alicia Keys");
        dir.connect(&id("1003"), "Bob");
        dir.register_offline(&id("1004"), "Bobby Tables");
        dir
    }

    #[test]
    fn id_match_wins_over_names() {
        let dir = directory();
        dir.connect(&id("Bob"), "Someone Else");
        match dir.find_by_name_or_id("Bob") {
            MatchResult::Found(p) => assert_eq!(p.id.as_str(), "Bob"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn exact_name_beats_partial_matches() {
        let dir = directory();
        match dir.find_by_name_or_id("Bob") {
            MatchResult::Found(p) => assert_eq!(p.id.as_str(), "1003"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn partial_match_can_be_ambiguous() {
        let dir = directory();
        match dir.find_by_name_or_id("ali") {
            MatchResult::Ambiguous(hits) => assert_eq!(hits.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match dir.find_by_name_or_id("  TABLES ") {
            MatchResult::Found(p) => assert_eq!(p.id.as_str(), "1004"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(dir.find_by_name_or_id("zed"), MatchResult::NotFound);
        assert_eq!(dir.find_by_name_or_id("   "), MatchResult::NotFound);
    }

    #[test]
    fn disconnect_keeps_participant_known() {
        let dir = directory();
        let p = dir.disconnect(&id("1001")).unwrap();
        assert!(!p.is_connected);
        assert_eq!(dir.lookup(&id("1001")).unwrap().name, "Alice");
        assert!(dir.disconnect(&id("9999")).is_none());
        assert!(dir.forget(&id("1001")));
        assert!(dir.lookup(&id("1001")).is_none());
    }

    #[test]
    fn explicit_grants_are_directional() {
        let dir = directory();
        dir.authorize(&id("1001"), &id("1003"));
        assert!(dir.is_explicitly_authorized(&id("1001"), &id("1003")));
        assert!(!dir.is_explicitly_authorized(&id("1003"), &id("1001")));
    }
}
