//! Translation of server packets into local world and roster state
//!
//! [`SyncEngine`] is the only place that mutates [`WorldState`],
//! [`PlayerRegistry`] and [`RoundController`] in response to the network.
//! Every inbound packet goes through [`SyncEngine::handle`], which runs the
//! matching handler to completion and returns the outbound packets it
//! produced. The engine never touches a socket, so the whole protocol can be
//! driven deterministically from tests.
//!
//! ## Replication rules
//!
//! - Remote records change only by copying inbound snapshots verbatim.
//! - The local record is never written by `Update`; it moves only through
//!   [`SyncEngine::drive_local`] and is relocated on map regeneration.
//! - Ids are unique across local and remote records. Duplicate joins and
//!   replayed world syncs are ignored rather than overwriting.

use crate::game::{step_local, MoveInput};
use crate::players::PlayerRegistry;
use crate::round::{RoundController, RoundStatus};
use crate::world::{Gate, WallInstance, WorldState};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ClientPacket, Grid, Player, ServerPacket};

/// Callbacks into the presentation layer.
///
/// All methods default to no-ops. Records are passed by reference for the
/// duration of the call; implementors copy what they need to keep.
pub trait PresentationHooks {
    fn on_player_added(&mut self, _record: &Player) {}
    fn on_player_removed(&mut self, _record: &Player) {}
    fn on_world_rebuilt(&mut self, _walls: &[WallInstance], _gate: Option<Gate>) {}
    fn on_round_escaped(&mut self, _escaper: &Player) {}
    fn on_round_reset(&mut self) {}
}

/// Hooks that ignore every notification.
pub struct NoopHooks;

impl PresentationHooks for NoopHooks {}

/// Name and color the local player is created with.
#[derive(Debug, Clone)]
pub struct LocalProfile {
    pub name: String,
    pub color: String,
}

pub struct SyncEngine {
    world: WorldState,
    players: PlayerRegistry,
    round: RoundController,
    profile: LocalProfile,
    client_id: Option<u32>,
    rng: StdRng,
}

impl SyncEngine {
    /// Creates an engine. A fixed `seed` makes spawn selection reproducible.
    pub fn new(profile: LocalProfile, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            world: WorldState::new(),
            players: PlayerRegistry::new(),
            round: RoundController::new(),
            profile,
            client_id: None,
            rng,
        }
    }

    /// Applies one inbound packet and returns the packets to send in response.
    pub fn handle<H>(&mut self, packet: ServerPacket, hooks: &mut H) -> Vec<ClientPacket>
    where
        H: PresentationHooks + ?Sized,
    {
        match packet {
            ServerPacket::Connected { client_id } => self.on_connect(client_id, hooks),
            ServerPacket::SyncWorld { grid, players } => {
                self.on_sync_world(grid, players, hooks);
                Vec::new()
            }
            ServerPacket::PlayerJoin { player } => {
                self.on_player_join(player, hooks);
                Vec::new()
            }
            ServerPacket::PlayerQuit { player } => {
                self.on_player_quit(player.id, hooks);
                Vec::new()
            }
            ServerPacket::PlayerEscape { player } => {
                self.on_player_escape(player, hooks);
                Vec::new()
            }
            ServerPacket::MapRegen { grid } => self.on_map_regen(grid, hooks),
            ServerPacket::Update { players } => {
                self.on_update(players);
                Vec::new()
            }
            ServerPacket::Disconnected { reason } => {
                info!("Server closed the connection: {}", reason);
                Vec::new()
            }
        }
    }

    /// Remembers the id the server assigned to this connection and requests the world.
    ///
    /// If the server hands out a different id while a local record exists,
    /// that record moves to the new id, keeping its position and facing.
    pub fn on_connect<H>(&mut self, client_id: u32, hooks: &mut H) -> Vec<ClientPacket>
    where
        H: PresentationHooks + ?Sized,
    {
        if let Some(previous) = self.client_id.filter(|id| *id != client_id) {
            warn!("Server reassigned client id {} -> {}", previous, client_id);
            self.rekey_local(previous, client_id, hooks);
        }
        info!("Connected as player {}", client_id);
        self.client_id = Some(client_id);
        vec![ClientPacket::SyncWorld]
    }

    /// Replaces the world and adds every player not yet known.
    ///
    /// The local player is created here on the first sync after connecting.
    /// Entries already present in the registry are skipped, so a replayed
    /// sync never duplicates a player.
    pub fn on_sync_world<H>(&mut self, grid: Grid, players: Vec<Player>, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        self.load_grid(grid, hooks);
        self.spawn_local(hooks);

        let mut added = 0;
        for player in players {
            if self.players.contains(player.id) {
                debug!("Sync lists known player {}, skipping", player.id);
                continue;
            }
            hooks.on_player_added(&player);
            self.players.add(player);
            added += 1;
        }

        info!(
            "World synced: {}x{} grid, {} new players, {} total",
            self.world.grid().width(),
            self.world.grid().depth(),
            added,
            self.players.len()
        );
    }

    pub fn on_player_join<H>(&mut self, player: Player, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        if self.players.contains(player.id) {
            warn!(
                "Join for already known player {} ({}), ignoring",
                player.id, player.name
            );
            return;
        }
        info!("{} joined as player {}", player.name, player.id);
        hooks.on_player_added(&player);
        self.players.add(player);
    }

    /// Removes a player. Unknown ids are ignored: quits may race with local removal.
    pub fn on_player_quit<H>(&mut self, id: u32, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        match self.players.remove(id) {
            Some(removed) => {
                info!("{} (player {}) left", removed.name, removed.id);
                hooks.on_player_removed(&removed);
            }
            None => debug!("Quit for unknown player {}", id),
        }
    }

    pub fn on_player_escape<H>(&mut self, player: Player, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        if !self.round.mark_escaped() {
            debug!("Escape by {} after round already ended", player.id);
            return;
        }

        if self.players.is_local(player.id) {
            info!("You escaped the maze!");
        } else {
            info!("{} escaped the maze", player.name);
        }
        hooks.on_round_escaped(&player);
    }

    /// Starts a new round on a fresh grid and relocates the local player.
    ///
    /// Remote positions are left alone; they follow with the next `Update`.
    /// Returns a `Move` announcing the local player's new spawn.
    pub fn on_map_regen<H>(&mut self, grid: Grid, hooks: &mut H) -> Vec<ClientPacket>
    where
        H: PresentationHooks + ?Sized,
    {
        self.round.reset();
        self.load_grid(grid, hooks);
        hooks.on_round_reset();

        let spawn = self.world.random_spawn(&mut self.rng);
        match self.players.local_mut() {
            Some(local) => {
                local.position = spawn;
                debug!("Relocated local player to {:?}", spawn);
                vec![move_packet(local)]
            }
            None => Vec::new(),
        }
    }

    /// Copies snapshot fields onto matching remote records, last write wins.
    pub fn on_update(&mut self, snapshots: Vec<Player>) {
        for snapshot in snapshots {
            let Some(record) = self.players.remote_mut(snapshot.id) else {
                continue;
            };
            record.position = snapshot.position;
            record.rotation = snapshot.rotation;
            record.animation = snapshot.animation;
        }
    }

    /// Feeds this frame's gate contact. Returns the escape announcement at most once per round.
    pub fn observe_local_gate_contact(&mut self, contact: bool) -> Option<ClientPacket> {
        self.players.local()?;

        if self.round.observe_gate_contact(contact) {
            info!("Reached the gate in round {}", self.round.round());
            Some(ClientPacket::PlayerEscape)
        } else {
            None
        }
    }

    /// Moves the local player by one frame of input and checks gate contact.
    ///
    /// Returns a `Move` when the local state changed and a `PlayerEscape`
    /// on the first gate contact of the round.
    pub fn drive_local(&mut self, input: &MoveInput, dt: f32) -> Vec<ClientPacket> {
        let mut outbound = Vec::new();

        let contact = {
            let Some(local) = self.players.local_mut() else {
                return outbound;
            };
            if step_local(local, input, &self.world, dt) {
                outbound.push(move_packet(local));
            }
            self.world.is_gate_cell(local.position)
        };

        outbound.extend(self.observe_local_gate_contact(contact));
        outbound
    }

    fn load_grid<H>(&mut self, grid: Grid, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        self.world.set_grid(grid);
        self.world.rebuild_geometry();
        hooks.on_world_rebuilt(self.world.walls(), self.world.gate());
    }

    fn rekey_local<H>(&mut self, previous: u32, id: u32, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        if self.players.local_id() != Some(previous) {
            return;
        }
        let Some(mut record) = self.players.remove(previous) else {
            return;
        };
        hooks.on_player_removed(&record);

        if let Some(stale) = self.players.remove(id) {
            warn!("Player {} was known as remote, claiming it as local", id);
            hooks.on_player_removed(&stale);
        }

        record.id = id;
        hooks.on_player_added(&record);
        self.players.add_local(record);
        info!("Local player {} is now {}", previous, id);
    }

    fn spawn_local<H>(&mut self, hooks: &mut H)
    where
        H: PresentationHooks + ?Sized,
    {
        let Some(id) = self.client_id else {
            return;
        };
        if self.players.local().is_some() {
            return;
        }

        // The local record takes precedence over a roster entry for our own id
        if let Some(stale) = self.players.remove(id) {
            warn!("Player {} was known as remote, claiming it as local", id);
            hooks.on_player_removed(&stale);
        }

        let spawn = self.world.random_spawn(&mut self.rng);
        let record = Player::new(id, &self.profile.name, &self.profile.color, spawn);
        hooks.on_player_added(&record);
        self.players.add_local(record);
        info!("Spawned local player {} at {:?}", id, spawn);
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn round(&self) -> &RoundController {
        &self.round
    }

    pub fn status(&self) -> RoundStatus {
        self.round.status()
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn profile(&self) -> &LocalProfile {
        &self.profile
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.local()
    }
}

fn move_packet(player: &Player) -> ClientPacket {
    ClientPacket::Move {
        position: player.position,
        rotation: player.rotation,
        animation: player.animation.clone(),
    }
}
