//! Host policy hooks built on the query API.
//!
//! Each hook returns `None` to leave the host's default behaviour alone, or
//! `Some(decision)` to override it.

use log::info;
use std::sync::Arc;

use crate::config::PolicyConfig;
use crate::friends::events::{FriendEvent, FriendObserver};
use crate::friends::service::FriendsService;
use crate::friends::types::ParticipantId;

pub struct PolicyHooks {
    config: PolicyConfig,
    friends: Arc<FriendsService>,
}

impl PolicyHooks {
    pub fn new(config: PolicyConfig, friends: Arc<FriendsService>) -> Self {
        Self { config, friends }
    }

    /// `Some(false)` cancels an attack on someone the attacker lists as a friend.
    pub fn on_player_attack(&self, attacker: &ParticipantId, victim: &ParticipantId) -> Option<bool> {
        if self.config.disable_friendly_fire && attacker != victim && self.friends.has_friend(attacker, victim) {
            Some(false)
        } else {
            None
        }
    }

    /// `Some(false)` stops a turret from targeting the owner's friends or
    /// anyone the host has explicitly authorized for that owner.
    pub fn on_turret_target(&self, turret_owner: &ParticipantId, target: &ParticipantId) -> Option<bool> {
        if !self.config.share_auto_turrets {
            return None;
        }
        let trusted = self.friends.has_friend(turret_owner, target)
            || self
                .friends
                .directory()
                .is_explicitly_authorized(turret_owner, target);
        if trusted {
            Some(false)
        } else {
            None
        }
    }

    /// `Some(true)` opens a code lock for friends of the lock's owner.
    pub fn can_use_door(&self, lock_owner: &ParticipantId, player: &ParticipantId) -> Option<bool> {
        if self.config.share_code_locks && self.friends.has_friend(lock_owner, player) {
            Some(true)
        } else {
            None
        }
    }
}

/// Logs shared-access changes as friendships come and go. Access itself is
/// always decided live by the hooks above.
impl FriendObserver for PolicyHooks {
    fn on_event(&self, event: &FriendEvent) {
        if !(self.config.share_code_locks || self.config.share_auto_turrets) {
            return;
        }
        let verb = match event {
            FriendEvent::Added { .. } => "granted",
            FriendEvent::Removed { .. } => "revoked",
        };
        info!(
            target: "security",
            "Shared access {} for {} on property of {}",
            verb,
            event.friend().id,
            event.owner().id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FriendsConfig;
    use crate::friends::directory::PresenceDirectory;
    use crate::friends::persistence::MemorySnapshotStore;

    fn id(raw: &str) -> ParticipantId {
        ParticipantId::new(raw).unwrap()
    }

    fn hooks(config: PolicyConfig) -> (PolicyHooks, Arc<PresenceDirectory>) {
        let directory = Arc::new(PresenceDirectory::new());
        directory.connect(&id("owner"), "Owner");
        directory.connect(&id("pal"), "Pal");
        directory.connect(&id("stranger"), "Stranger");
        let service = FriendsService::builder(Box::new(MemorySnapshotStore::new()), directory.clone())
            .config(FriendsConfig::default())
            .open()
            .unwrap();
        service.add_friend(&id("owner"), &id("pal")).unwrap();
        (PolicyHooks::new(config, Arc::new(service)), directory)
    }

    #[test]
    fn hooks_defer_to_host_when_disabled() {
        let (hooks, _) = hooks(PolicyConfig::default());
        assert_eq!(hooks.on_player_attack(&id("owner"), &id("pal")), None);
        assert_eq!(hooks.on_turret_target(&id("owner"), &id("pal")), None);
        assert_eq!(hooks.can_use_door(&id("owner"), &id("pal")), None);
    }

    #[test]
    fn code_lock_sharing_is_directional() {
        let (hooks, _) = hooks(PolicyConfig {
            share_code_locks: true,
            ..PolicyConfig::default()
        });
        assert_eq!(hooks.can_use_door(&id("owner"), &id("pal")), Some(true));
        assert_eq!(hooks.can_use_door(&id("pal"), &id("owner")), None);
        assert_eq!(hooks.can_use_door(&id("owner"), &id("stranger")), None);
    }

    #[test]
    fn turret_spares_explicitly_authorized_players() {
        let (hooks, directory) = hooks(PolicyConfig {
            share_auto_turrets: true,
            ..PolicyConfig::default()
        });
        assert_eq!(hooks.on_turret_target(&id("owner"), &id("pal")), Some(false));
        assert_eq!(hooks.on_turret_target(&id("owner"), &id("stranger")), None);
        directory.authorize(&id("owner"), &id("stranger"));
        assert_eq!(hooks.on_turret_target(&id("owner"), &id("stranger")), Some(false));
    }
}
