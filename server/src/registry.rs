//! Session bookkeeping for connected phones
//!
//! This module maps live WebSocket connections onto the game world:
//! - Spawning a player avatar for each new connection
//! - Assigning and changing display names, kept in sync with the name label
//! - Tearing the avatar down again when the connection closes
//!
//! The registry is only ever touched from the game loop, so it needs no
//! locking of its own.

use crate::config::{AvatarTemplate, ServerConfig};
use crate::entity::{EntityId, World};
use crate::physics::Vector3;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Opaque identifier of one WebSocket connection
///
/// Assigned by the network layer from a process-wide counter, so an id is
/// never reused even after its connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no avatar templates are configured")]
    EmptyTemplatePool,
    #[error("{0} is already connected")]
    AlreadyConnected(SessionId),
    #[error("{0} is not connected")]
    UnknownSession(SessionId),
    #[error("name must not be empty")]
    EmptyName,
}

/// Tracks which player entity and display name belong to each session
pub struct SessionRegistry {
    /// Player entity owned by each live session
    entities: HashMap<SessionId, EntityId>,
    /// Display name of each live session
    names: HashMap<SessionId, String>,
    /// Connections ever accepted, drives the default `Player<N>` names
    total_connections: u64,
    templates: Vec<AvatarTemplate>,
    spawn_point: Vector3,
    name_tag_offset: f32,
    rng: StdRng,
}

impl SessionRegistry {
    /// Creates an empty registry
    ///
    /// The RNG picks avatar templates. Passing a seed makes the choice
    /// reproducible, which the tests rely on.
    pub fn new(
        templates: Vec<AvatarTemplate>,
        spawn_point: Vector3,
        name_tag_offset: f32,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            entities: HashMap::new(),
            names: HashMap::new(),
            total_connections: 0,
            templates,
            spawn_point,
            name_tag_offset,
            rng,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.avatar_templates.clone(),
            config.spawn_point,
            config.name_tag_offset,
            config.seed,
        )
    }

    /// Spawns a player for a newly opened connection
    ///
    /// Picks a random avatar template, names the player `Player<N>` from the
    /// connection counter and gives it exactly one name label. Any label the
    /// template was baked with is purged first.
    pub fn on_connect(&mut self, session: SessionId, world: &mut World) -> Result<EntityId, RegistryError> {
        if self.entities.contains_key(&session) {
            warn!("{} connected twice, keeping the existing player", session);
            return Err(RegistryError::AlreadyConnected(session));
        }
        if self.templates.is_empty() {
            warn!("Cannot spawn a player for {}: no avatar templates", session);
            return Err(RegistryError::EmptyTemplatePool);
        }

        let template = &self.templates[self.rng.gen_range(0..self.templates.len())];
        let entity_id = world.spawn(template, self.spawn_point);

        self.total_connections += 1;
        let name = format!("Player{}", self.total_connections);

        if let Some(entity) = world.get_mut(entity_id) {
            entity.name = name.clone();
            entity.attach_label(&name, self.name_tag_offset);
        }

        info!("{} joined as {} (entity {})", session, name, entity_id);
        self.entities.insert(session, entity_id);
        self.names.insert(session, name);
        Ok(entity_id)
    }

    /// Removes a session and destroys its player
    ///
    /// Returns false if the session was unknown, which is not an error:
    /// a connection that failed to spawn still closes normally.
    pub fn on_disconnect(&mut self, session: SessionId, world: &mut World) -> bool {
        let name = self.names.remove(&session);
        match self.entities.remove(&session) {
            Some(entity_id) => {
                world.despawn(entity_id);
                info!(
                    "{} ({}) left",
                    session,
                    name.as_deref().unwrap_or("unnamed")
                );
                true
            }
            None => false,
        }
    }

    /// Changes the display name of a session
    ///
    /// Updates the name map, the entity's name and its label text in place.
    /// Returns the trimmed name that was applied.
    pub fn rename(&mut self, session: SessionId, name: &str, world: &mut World) -> Result<String, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let entity_id = self
            .entities
            .get(&session)
            .copied()
            .ok_or(RegistryError::UnknownSession(session))?;

        if let Some(entity) = world.get_mut(entity_id) {
            entity.name = name.to_string();
            entity.set_label_text(name, self.name_tag_offset);
        }

        let previous = self.names.insert(session, name.to_string());
        info!(
            "{} renamed from {} to {}",
            session,
            previous.as_deref().unwrap_or("unnamed"),
            name
        );
        Ok(name.to_string())
    }

    pub fn lookup(&self, session: SessionId) -> Option<EntityId> {
        self.entities.get(&session).copied()
    }

    pub fn name(&self, session: SessionId) -> Option<&str> {
        self.names.get(&session).map(String::as_str)
    }

    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.entities.keys().copied()
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
