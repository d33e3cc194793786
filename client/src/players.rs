//! Roster of known players, local and remote
//!
//! Records are kept in insertion order. The local player lives in the same
//! list and is distinguished only by the handle held in `local_id`.

use log::warn;
use shared::Player;

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    local_id: Option<u32>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record. Returns false and keeps the existing record when the id is taken.
    pub fn add(&mut self, record: Player) -> bool {
        if self.contains(record.id) {
            warn!("Ignoring duplicate player id {}", record.id);
            return false;
        }
        self.players.push(record);
        true
    }

    /// Inserts the record and marks it as the locally driven player.
    pub fn add_local(&mut self, record: Player) -> bool {
        if self.local_id.is_some() {
            warn!("Local player already registered, ignoring {}", record.id);
            return false;
        }
        let id = record.id;
        if !self.add(record) {
            return false;
        }
        self.local_id = Some(id);
        true
    }

    pub fn remove(&mut self, id: u32) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        if self.local_id == Some(id) {
            self.local_id = None;
        }
        Some(self.players.remove(index))
    }

    pub fn find(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.find(id).is_some()
    }

    pub fn all(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn remotes(&self) -> impl Iterator<Item = &Player> {
        let local_id = self.local_id;
        self.players.iter().filter(move |p| Some(p.id) != local_id)
    }

    /// Mutable access to a remote record. Always `None` for the local id.
    pub fn remote_mut(&mut self, id: u32) -> Option<&mut Player> {
        if self.local_id == Some(id) {
            return None;
        }
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn local(&self) -> Option<&Player> {
        self.local_id.and_then(|id| self.find(id))
    }

    pub fn local_mut(&mut self) -> Option<&mut Player> {
        let id = self.local_id?;
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn local_id(&self) -> Option<u32> {
        self.local_id
    }

    pub fn is_local(&self, id: u32) -> bool {
        self.local_id == Some(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
