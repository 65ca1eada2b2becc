//! # Friendlist - directed friend graph for multiplayer hosts
//!
//! Friendlist keeps track of who considers whom a friend, persists that graph,
//! maintains a reverse index ("who lists me?") and fans out notifications and
//! events when relationships change or participants come and go.
//!
//! ## Features
//!
//! - **Directed relationships**: adding someone never implies they added you back;
//!   mutual friendship is a derived view.
//! - **Reverse index**: always consistent with the forward map, rebuilt at load.
//! - **Capacity and duplicate rules**: configurable list size, idempotent add/remove.
//! - **Snapshot persistence**: sled (default) or locked JSON file, written after
//!   every successful mutation; failed writes roll the change back.
//! - **Presence notifications**: online/offline/added/removed notices via a pluggable sink.
//! - **Deferred events**: observers run from a dispatcher, never inside a mutation.
//! - **Policy hooks**: friendly-fire suppression and shared lock/turret access.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use friendlist::config::Config;
//! use friendlist::friends::{
//!     event_channel, open_configured, FriendsService, ParticipantId, PresenceDirectory,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("friendlist.toml").await?;
//!     let directory = Arc::new(PresenceDirectory::new());
//!     let (events, dispatcher) = event_channel();
//!     tokio::spawn(dispatcher.run());
//!
//!     let friends = FriendsService::builder(open_configured(&config.storage)?, directory.clone())
//!         .config(config.friends.clone())
//!         .events(events)
//!         .open()?;
//!
//!     let alice = ParticipantId::new("alice")?;
//!     let bob = ParticipantId::new("bob")?;
//!     directory.connect(&alice, "Alice");
//!     directory.connect(&bob, "Bob");
//!     friends.add_friend(&alice, &bob)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`friends`] - relationship store, reverse index, service, persistence, events
//! - [`config`] - configuration loading and defaults

pub mod config;
pub mod friends;
