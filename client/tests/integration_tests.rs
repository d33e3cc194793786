//! Integration tests for the client synchronization pipeline
//!
//! These drive a full `Session` over an in-process channel, playing the
//! server's side of the protocol by hand.

use assert_approx_eq::assert_approx_eq;
use bincode::{deserialize, serialize};
use client::game::MoveInput;
use client::network::{ConnectionStatus, PacketChannel, RemoteEnd, Session};
use client::round::RoundStatus;
use client::sync::{LocalProfile, NoopHooks, SyncEngine};
use shared::{ClientPacket, Grid, Player, PlayerRef, ServerPacket, Vec3, ANIM_WALK, SPAWN_ROW};

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Every server packet kind survives the wire format
    #[test]
    fn server_packet_serialization_roundtrip() {
        let test_packets = vec![
            ServerPacket::Connected { client_id: 42 },
            ServerPacket::SyncWorld {
                grid: maze(),
                players: vec![remote(1)],
            },
            ServerPacket::PlayerJoin { player: remote(2) },
            ServerPacket::PlayerQuit {
                player: PlayerRef { id: 2 },
            },
            ServerPacket::PlayerEscape { player: remote(1) },
            ServerPacket::MapRegen { grid: Grid::open(3, 3) },
            ServerPacket::Update {
                players: vec![remote(1), remote(3)],
            },
            ServerPacket::Disconnected {
                reason: "Test".to_string(),
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            let deserialized: ServerPacket = deserialize(&serialized).unwrap();
            assert_eq!(packet, deserialized);
        }
    }

    /// A grid with ragged rows is rejected while decoding the packet
    #[test]
    fn ragged_grid_packet_is_rejected() {
        // bincode encodes an enum as its u32 variant index followed by the fields
        let map_regen_index = 5u32;

        let data = serialize(&(map_regen_index, vec![vec![1u8, 0, 1], vec![1, 0]])).unwrap();
        let result: Result<ServerPacket, _> = deserialize(&data);
        assert!(result.is_err(), "Ragged grid should not decode");

        let data = serialize(&(map_regen_index, vec![vec![1u8, 0, 1], vec![1, 0, 0]])).unwrap();
        let result: ServerPacket = deserialize(&data).unwrap();
        assert!(matches!(result, ServerPacket::MapRegen { grid } if grid.depth() == 3));
    }

    /// Tests malformed packet handling
    #[test]
    fn malformed_packet_handling() {
        let valid_data = serialize(&ClientPacket::Connect {
            client_version: 1,
            name: "ana".to_string(),
            color: "red".to_string(),
        })
        .unwrap();

        let truncated_data = &valid_data[..valid_data.len() / 2];
        let result: Result<ClientPacket, _> = deserialize(truncated_data);
        assert!(result.is_err(), "Should fail to deserialize truncated packet");

        let mut corrupted_data = valid_data.clone();
        corrupted_data[0] = 0xFF;
        let result: Result<ClientPacket, _> = deserialize(&corrupted_data);
        assert!(result.is_err(), "Should fail to deserialize corrupted packet");

        let result: Result<ServerPacket, _> = deserialize(&[]);
        assert!(result.is_err(), "Should fail to deserialize empty packet");
    }
}

/// SYNCHRONIZATION SCENARIOS
mod scenario_tests {
    use super::*;

    /// Empty roster, sync with one player: exactly that player is known
    #[test]
    fn sync_world_populates_roster() {
        let (mut session, remote_end) = session();
        push(
            &remote_end,
            ServerPacket::SyncWorld {
                grid: Grid::open(8, 8),
                players: vec![remote(1)],
            },
        );
        session.pump(&mut NoopHooks);

        let ids: Vec<u32> = session.engine().players().all().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
    }

    /// Standing on the gate for several ticks announces the escape once
    #[test]
    fn gate_contact_reports_once() {
        let mut engine = SyncEngine::new(profile(), Some(5));
        engine.on_connect(0, &mut NoopHooks);
        engine.on_sync_world(Grid::open(4, 4), Vec::new(), &mut NoopHooks);
        assert_eq!(engine.status(), RoundStatus::Active);

        let sent: Vec<ClientPacket> = (0..3)
            .filter_map(|_| engine.observe_local_gate_contact(true))
            .collect();
        assert_eq!(sent, vec![ClientPacket::PlayerEscape]);
    }

    /// Walking onto the gate and pushing on sends a single escape
    #[test]
    fn walking_onto_gate_reports_once() {
        let (mut session, mut remote_end) = connected(0, corridor());
        let input = MoveInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..240 {
            session.tick(&input, 1.0 / 60.0);
        }

        let escapes = drain(&mut remote_end)
            .into_iter()
            .filter(|p| *p == ClientPacket::PlayerEscape)
            .count();
        assert_eq!(escapes, 1);
    }

    /// Regeneration after an escape reactivates the round and respawns locally
    #[test]
    fn map_regen_after_escape() {
        let (mut session, mut remote_end) = connected(0, Grid::open(6, 6));
        push(&remote_end, ServerPacket::PlayerEscape { player: remote(9) });
        session.pump(&mut NoopHooks);
        assert_eq!(session.engine().status(), RoundStatus::Escaped);

        push(&remote_end, ServerPacket::MapRegen { grid: maze() });
        session.pump(&mut NoopHooks);

        assert_eq!(session.engine().status(), RoundStatus::Active);
        let local = session.engine().local_player().unwrap();
        let (x, z) = local.position.cell().unwrap();
        assert_eq!(z, SPAWN_ROW);
        assert!(maze().is_open(x, z), "spawned on closed cell ({}, {})", x, z);

        let sent = drain(&mut remote_end);
        assert!(sent
            .iter()
            .any(|p| matches!(p, ClientPacket::Move { position, .. } if *position == local.position)));
    }

    /// Updates addressed to the local id never move the local player
    #[test]
    fn update_ignores_local_identity() {
        let (mut session, remote_end) = connected(1, Grid::open(8, 8));
        let before = session.engine().local_player().unwrap().position;

        let mut snapshot = remote(1);
        snapshot.position = Vec3::new(5.0, 0.0, 5.0);
        push(&remote_end, ServerPacket::Update { players: vec![snapshot] });
        session.pump(&mut NoopHooks);

        assert_eq!(session.engine().local_player().unwrap().position, before);
    }

    /// Remote players follow their snapshots verbatim
    #[test]
    fn update_moves_remote_players() {
        let (mut session, remote_end) = connected(0, Grid::open(8, 8));
        push(&remote_end, ServerPacket::PlayerJoin { player: remote(2) });

        let mut snapshot = remote(2);
        snapshot.position = Vec3::new(3.5, 0.0, 6.25);
        snapshot.animation = ANIM_WALK.to_string();
        push(&remote_end, ServerPacket::Update { players: vec![snapshot] });
        session.pump(&mut NoopHooks);

        let record = session.engine().players().find(2).unwrap();
        assert_approx_eq!(record.position.x, 3.5);
        assert_approx_eq!(record.position.z, 6.25);
        assert_eq!(record.animation, ANIM_WALK);
    }

    /// Full round: connect, sync, walk to the gate, escape, regenerate
    #[test]
    fn full_round_lifecycle() {
        let (mut session, mut remote_end) = session();
        session.start().unwrap();

        push(&remote_end, ServerPacket::Connected { client_id: 4 });
        session.pump(&mut NoopHooks);
        assert_eq!(session.status(), ConnectionStatus::Connected(4));

        let sent = drain(&mut remote_end);
        assert!(matches!(sent[0], ClientPacket::Connect { .. }));
        assert_eq!(sent[1], ClientPacket::SyncWorld);

        push(
            &remote_end,
            ServerPacket::SyncWorld {
                grid: corridor(),
                players: vec![remote(7)],
            },
        );
        session.pump(&mut NoopHooks);
        assert_eq!(session.engine().players().len(), 2);

        let input = MoveInput {
            forward: true,
            ..Default::default()
        };
        for _ in 0..120 {
            session.tick(&input, 1.0 / 60.0);
        }
        let sent = drain(&mut remote_end);
        assert_eq!(
            sent.iter().filter(|p| **p == ClientPacket::PlayerEscape).count(),
            1
        );

        push(&remote_end, ServerPacket::PlayerEscape { player: local_echo(4) });
        session.pump(&mut NoopHooks);
        assert_eq!(session.engine().status(), RoundStatus::Escaped);

        push(&remote_end, ServerPacket::MapRegen { grid: corridor() });
        session.pump(&mut NoopHooks);
        assert_eq!(session.engine().status(), RoundStatus::Active);
        assert_eq!(session.engine().round().round(), 2);
        assert_eq!(
            session.engine().local_player().unwrap().position.cell(),
            Some((1, SPAWN_ROW))
        );
    }
}

/// PROTOCOL ANOMALY TESTS
mod anomaly_tests {
    use super::*;

    /// Replayed syncs with overlapping rosters never duplicate ids
    #[test]
    fn replayed_sync_is_idempotent() {
        let (mut session, remote_end) = connected(0, Grid::open(5, 5));
        for players in [vec![remote(1), remote(2)], vec![remote(2), remote(3), remote(0)]] {
            push(
                &remote_end,
                ServerPacket::SyncWorld {
                    grid: Grid::open(5, 5),
                    players,
                },
            );
        }
        session.pump(&mut NoopHooks);

        let mut ids: Vec<u32> = session.engine().players().all().map(|p| p.id).collect();
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    /// A second quit for the same id changes nothing
    #[test]
    fn double_quit_is_noop() {
        let (mut session, remote_end) = connected(0, Grid::open(5, 5));
        push(&remote_end, ServerPacket::PlayerJoin { player: remote(1) });
        for _ in 0..2 {
            push(
                &remote_end,
                ServerPacket::PlayerQuit {
                    player: PlayerRef { id: 1 },
                },
            );
        }
        session.pump(&mut NoopHooks);

        assert!(session.engine().players().find(1).is_none());
        assert_eq!(session.engine().players().len(), 1);
    }

    /// Duplicate join, unknown update and unknown quit all leave the session intact
    #[test]
    fn anomalies_are_absorbed() {
        let (mut session, remote_end) = connected(0, Grid::open(5, 5));
        push(&remote_end, ServerPacket::PlayerJoin { player: remote(1) });
        push(&remote_end, ServerPacket::PlayerJoin { player: remote(1) });
        push(&remote_end, ServerPacket::PlayerJoin { player: remote(0) });
        push(&remote_end, ServerPacket::Update { players: vec![remote(50)] });
        push(
            &remote_end,
            ServerPacket::PlayerQuit {
                player: PlayerRef { id: 60 },
            },
        );
        assert_eq!(session.pump(&mut NoopHooks), 5);

        assert_eq!(session.engine().players().len(), 2);
        assert!(session.engine().players().is_local(0));
        assert_eq!(session.status(), ConnectionStatus::Connected(0));
    }

    /// Escape notifications racing with regeneration count once per round
    #[test]
    fn escape_race_with_regen() {
        let (mut session, remote_end) = connected(0, Grid::open(5, 5));
        push(&remote_end, ServerPacket::PlayerEscape { player: remote(1) });
        push(&remote_end, ServerPacket::PlayerEscape { player: remote(2) });
        push(&remote_end, ServerPacket::MapRegen { grid: Grid::open(5, 5) });
        push(&remote_end, ServerPacket::PlayerEscape { player: remote(2) });
        session.pump(&mut NoopHooks);

        assert_eq!(session.engine().status(), RoundStatus::Escaped);
        assert_eq!(session.engine().round().round(), 2);
    }

    /// Closing the transport marks the session disconnected without losing state
    #[test]
    fn transport_loss_keeps_state() {
        let (mut session, remote_end) = connected(0, Grid::open(5, 5));
        drop(remote_end);

        session.pump(&mut NoopHooks);
        session.tick(
            &MoveInput {
                forward: true,
                ..Default::default()
            },
            1.0 / 60.0,
        );

        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert!(session.engine().local_player().is_some());
        assert_eq!(session.engine().world().grid().width(), 5);
    }

    /// A second handshake with a new id moves the local record instead of
    /// leaving a remote copy of ourselves behind
    #[test]
    fn reassigned_id_leaves_no_twin() {
        let (mut session, mut remote_end) = connected(3, Grid::open(5, 5));
        let before = session.engine().local_player().unwrap().position;

        push(&remote_end, ServerPacket::Connected { client_id: 5 });
        push(
            &remote_end,
            ServerPacket::SyncWorld {
                grid: Grid::open(5, 5),
                players: vec![local_echo(5)],
            },
        );
        session.pump(&mut NoopHooks);

        let roster: Vec<(u32, bool)> = session
            .engine()
            .players()
            .all()
            .map(|p| (p.id, session.engine().players().is_local(p.id)))
            .collect();
        assert_eq!(roster, vec![(5, true)]);
        assert_eq!(session.status(), ConnectionStatus::Connected(5));
        assert_eq!(drain(&mut remote_end), vec![ClientPacket::SyncWorld]);

        let mut snapshot = local_echo(5);
        snapshot.position = Vec3::new(4.0, 0.0, 4.0);
        push(&remote_end, ServerPacket::Update { players: vec![snapshot] });
        session.pump(&mut NoopHooks);

        assert_eq!(session.engine().local_player().unwrap().position, before);
    }
}

// HELPER FUNCTIONS

fn profile() -> LocalProfile {
    LocalProfile {
        name: "me".to_string(),
        color: "green".to_string(),
    }
}

fn session() -> (Session<PacketChannel>, RemoteEnd) {
    let (channel, remote_end) = PacketChannel::pair();
    (Session::new(channel, SyncEngine::new(profile(), Some(17))), remote_end)
}

/// Session that has connected as `id` and synced onto `grid`, outbox drained
fn connected(id: u32, grid: Grid) -> (Session<PacketChannel>, RemoteEnd) {
    let (mut session, mut remote_end) = session();
    push(&remote_end, ServerPacket::Connected { client_id: id });
    push(
        &remote_end,
        ServerPacket::SyncWorld {
            grid,
            players: Vec::new(),
        },
    );
    session.pump(&mut NoopHooks);
    drain(&mut remote_end);
    (session, remote_end)
}

fn push(remote_end: &RemoteEnd, packet: ServerPacket) {
    remote_end.to_client.send(packet).unwrap();
}

fn drain(remote_end: &mut RemoteEnd) -> Vec<ClientPacket> {
    let mut packets = Vec::new();
    while let Ok(packet) = remote_end.from_client.try_recv() {
        packets.push(packet);
    }
    packets
}

fn remote(id: u32) -> Player {
    Player::new(id, &format!("p{}", id), "red", Vec3::ZERO)
}

fn local_echo(id: u32) -> Player {
    Player::new(id, "me", "green", Vec3::ZERO)
}

fn maze() -> Grid {
    Grid::try_from(vec![
        vec![1, 1, 1, 1],
        vec![1, 0, 0, 1],
        vec![1, 1, 0, 0],
        vec![1, 0, 1, 1],
    ])
    .unwrap()
}

/// Single corridor at x = 1 from the spawn row to the gate
fn corridor() -> Grid {
    Grid::try_from(vec![
        vec![1, 1, 1, 1, 1],
        vec![1, 0, 0, 0, 0],
        vec![1, 1, 1, 1, 1],
    ])
    .unwrap()
}
