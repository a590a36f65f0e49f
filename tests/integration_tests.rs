//! Integration tests for exit-position persistence across host and client
//!
//! These tests validate cross-component interactions and real network behavior.

use bincode::{deserialize, serialize};
use client::game::LocalPlayer;
use client::network::Client;
use server::network::{Server, ServerMessage};
use server::session::SessionState;
use shared::{
    Avatar, EntryMode, EntryOrchestrator, EntryOutcome, ExitPositionSource, ImmunityWindow,
    IncomingDamage, LocalExitStore, ModMessage, Packet, PersistenceConfig, SessionExitData,
    SessionExitStore, SessionRestore, Tile, TileGrid, Vec2, Verdict, WorldGrid, WorldSave,
    UPWARD_NUDGE,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_test::assert_ok;

fn test_grid() -> TileGrid {
    TileGrid::new(200, 150, Vec2::new(1600.0, 400.0))
}

fn test_world(exits: &[(&str, f32, f32)]) -> WorldSave {
    let mut save = WorldSave {
        world_name: "Integration".to_string(),
        grid: test_grid(),
        exit_positions: SessionExitData::default(),
    };
    for (name, x, y) in exits {
        save.exit_positions.names.push(name.to_string());
        save.exit_positions.xs.push(*x);
        save.exit_positions.ys.push(*y);
    }
    save
}

async fn start_server(
    world: WorldSave,
    world_path: PathBuf,
) -> (
    SocketAddr,
    mpsc::UnboundedSender<ServerMessage>,
    tokio::task::JoinHandle<()>,
) {
    let session = SessionState::new(world, &PersistenceConfig::default());
    let mut server = Server::new(
        "127.0.0.1:0",
        Duration::from_millis(16),
        8,
        session,
        world_path,
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });
    (addr, shutdown, handle)
}

async fn join(addr: SocketAddr, name: &str, local_exit: LocalExitStore) -> Client {
    join_world(addr, name, local_exit, test_grid()).await
}

async fn join_world(
    addr: SocketAddr,
    name: &str,
    local_exit: LocalExitStore,
    grid: TileGrid,
) -> Client {
    let player = LocalPlayer::new(name, PersistenceConfig::default(), local_exit);
    let mut client = Client::new(&addr.to_string(), 0, player, grid, None)
        .await
        .unwrap();
    assert_ok!(client.connect().await);
    assert!(client.poll(Duration::from_secs(2)).await.unwrap());
    assert!(client.is_connected());
    client
}

/// Handles packets until the host stays quiet for a short while.
async fn drain(client: &mut Client) {
    while client.poll(Duration::from_millis(200)).await.unwrap() {}
}

async fn stop(shutdown: mpsc::UnboundedSender<ServerMessage>, handle: tokio::task::JoinHandle<()>) {
    shutdown.send(ServerMessage::Shutdown).unwrap();
    handle.await.unwrap();
}

fn saved_exits(path: &Path) -> SessionExitStore {
    let world = WorldSave::load(path).unwrap().unwrap();
    SessionExitStore::from_data(world.exit_positions)
}

/// RESTORE FLOW TESTS
mod restore_tests {
    use super::*;

    /// Exit on clear terrain, session restarts, entry restores nudged upward
    #[tokio::test]
    async fn restore_after_session_restart() {
        let dir = tempfile::tempdir().unwrap();
        let world_path = dir.path().join("world.json");

        let (addr, shutdown, handle) = start_server(test_world(&[]), world_path.clone()).await;
        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut guide).await;
        assert_eq!(guide.player().mode(), EntryMode::Session);

        guide.player_mut().avatar.position = Vec2::new(500.0, 1200.0);
        assert_ok!(guide.send_state().await);
        sleep(Duration::from_millis(100)).await;
        stop(shutdown, handle).await;

        assert_eq!(
            saved_exits(&world_path).get("Guide"),
            Some(Vec2::new(500.0, 1200.0))
        );

        let world = WorldSave::load(&world_path).unwrap().unwrap();
        let (addr, shutdown, handle) = start_server(world, world_path.clone()).await;
        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut guide).await;

        let player = guide.player();
        assert_eq!(player.avatar.position, Vec2::new(500.0, 1200.0 - UPWARD_NUDGE));
        assert_eq!(player.avatar.velocity, Vec2::ZERO);
        assert!(player.is_immune());
        assert_eq!(
            player.immunity().remaining(player.tick()),
            PersistenceConfig::default().immunity_ticks()
        );
        assert_eq!(player.last_report().unwrap().outcome, EntryOutcome::Restored);

        stop(shutdown, handle).await;
    }

    /// Exit position later filled with terrain is moved to the first clear probe
    #[test]
    fn filled_terrain_is_adjusted() {
        let mut grid = test_grid();
        let mut store = LocalExitStore::new();
        store.save(&Avatar::new("Guide", Vec2::new(320.0, 320.0)));

        grid.set(20, 20, Tile::Solid);

        let mut avatar = Avatar::new("Guide", Vec2::ZERO);
        let mut immunity = ImmunityWindow::new();
        let orchestrator = EntryOrchestrator::new(&PersistenceConfig::default());
        let report = orchestrator.enter(&mut avatar, &mut immunity, &mut store, &grid, 0);

        assert_eq!(
            report.outcome,
            EntryOutcome::RestoredAdjusted {
                from: Vec2::new(320.0, 320.0)
            }
        );
        assert_eq!(report.notice(), Some("restored with adjustment"));
        assert_eq!(avatar.position, Vec2::new(320.0, 336.0 - UPWARD_NUDGE));
        assert!(store.candidate().is_none());
    }

    /// Session restore into filled terrain is adjusted and reported as such
    #[tokio::test]
    async fn session_restore_into_terrain_is_adjusted() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = test_world(&[("Guide", 500.0, 1200.0)]);
        world.grid.set(31, 75, Tile::Solid);
        let grid = world.grid.clone();

        let (addr, shutdown, handle) = start_server(world, dir.path().join("world.json")).await;
        let mut guide = join_world(addr, "Guide", LocalExitStore::new(), grid.clone()).await;
        drain(&mut guide).await;

        let report = guide.player().last_report().unwrap();
        assert_eq!(
            report.outcome,
            EntryOutcome::RestoredAdjusted {
                from: Vec2::new(500.0, 1200.0)
            }
        );
        assert_eq!(report.notice(), Some("restored with adjustment"));
        assert_ne!(guide.player().avatar.position, grid.spawn_point());

        stop(shutdown, handle).await;
    }

    /// Host stopping before the joining avatar reports keeps the stored position
    #[tokio::test]
    async fn shutdown_before_first_report_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let world_path = dir.path().join("world.json");

        let (addr, shutdown, handle) =
            start_server(test_world(&[("Guide", 500.0, 1200.0)]), world_path.clone()).await;
        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut guide).await;
        stop(shutdown, handle).await;

        assert_eq!(
            saved_exits(&world_path).get("Guide"),
            Some(Vec2::new(500.0, 1200.0))
        );
    }

    /// Death before the next snapshot leaves no record anywhere
    #[tokio::test]
    async fn death_before_snapshot_spawns_default() {
        let dir = tempfile::tempdir().unwrap();
        let world_path = dir.path().join("world.json");

        let (addr, shutdown, handle) = start_server(test_world(&[]), world_path.clone()).await;
        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut guide).await;

        guide.player_mut().avatar.position = Vec2::new(500.0, 1200.0);
        assert_ok!(guide.send_state().await);

        // Immunity has to run out before the fatal hit lands.
        for _ in 0..PersistenceConfig::default().immunity_ticks() {
            guide.player_mut().advance(&mut shared::LogCue);
        }
        let verdict = guide.player_mut().on_damage(IncomingDamage {
            hostile_entity: Some(9),
            amount: 500,
            ..Default::default()
        });
        assert_eq!(verdict, Verdict::Allow);
        assert!(!guide.player().avatar.alive);

        assert_ok!(guide.send_state().await);
        assert_ok!(guide.leave().await);
        sleep(Duration::from_millis(100)).await;

        let mut again = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut again).await;
        assert_eq!(again.player().avatar.position, test_grid().spawn_point());
        assert_eq!(again.player().last_report().unwrap().outcome, EntryOutcome::NoRecord);

        stop(shutdown, handle).await;
    }

    /// First-time connection still receives the session record for its name
    #[tokio::test]
    async fn first_connection_gets_restore() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown, handle) = start_server(
            test_world(&[("Guide", 640.0, 800.0)]),
            dir.path().join("world.json"),
        )
        .await;

        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        assert!(guide.poll(Duration::from_secs(2)).await.unwrap());

        assert_eq!(
            guide.player().avatar.position,
            Vec2::new(640.0, 800.0 - UPWARD_NUDGE)
        );
        assert_eq!(guide.player().last_report().unwrap().notice(), Some("restored"));

        stop(shutdown, handle).await;
    }
}

/// AUTHORITY INTERACTION TESTS
mod authority_tests {
    use super::*;

    /// In session mode the local record is neither applied nor consumed
    #[tokio::test]
    async fn session_mode_leaves_local_record_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown, handle) =
            start_server(test_world(&[]), dir.path().join("world.json")).await;

        let mut local = LocalExitStore::new();
        local.save(&Avatar::new("Guide", Vec2::new(96.0, 96.0)));

        let mut guide = join(addr, "Guide", local).await;
        drain(&mut guide).await;

        assert_eq!(guide.player().avatar.position, test_grid().spawn_point());
        assert_eq!(
            guide.player().local_exit().load().unwrap().position,
            Vec2::new(96.0, 96.0)
        );

        stop(shutdown, handle).await;
    }

    /// Restore messages only reach the connection they were meant for
    #[tokio::test]
    async fn restore_is_not_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown, handle) = start_server(
            test_world(&[("Guide", 640.0, 800.0)]),
            dir.path().join("world.json"),
        )
        .await;

        let mut merchant = join(addr, "Merchant", LocalExitStore::new()).await;
        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut guide).await;

        assert!(!merchant.poll(Duration::from_millis(200)).await.unwrap());
        assert_eq!(merchant.player().avatar.position, test_grid().spawn_point());
        assert_ne!(guide.player().avatar.position, test_grid().spawn_point());

        stop(shutdown, handle).await;
    }

    /// Names key the session store, so a second live connection may not share one
    #[tokio::test]
    async fn duplicate_name_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown, handle) = start_server(
            test_world(&[("Guide", 640.0, 800.0)]),
            dir.path().join("world.json"),
        )
        .await;

        let mut guide = join(addr, "Guide", LocalExitStore::new()).await;
        drain(&mut guide).await;
        assert_eq!(guide.player().last_report().unwrap().outcome, EntryOutcome::Restored);

        let player = LocalPlayer::new("Guide", PersistenceConfig::default(), LocalExitStore::new());
        let mut twin = Client::new(&addr.to_string(), 0, player, test_grid(), None)
            .await
            .unwrap();
        assert_ok!(twin.connect().await);
        assert!(twin.poll(Duration::from_secs(2)).await.unwrap());
        assert!(!twin.is_connected());

        stop(shutdown, handle).await;
    }

    /// Local authority survives a process restart through the avatar save
    #[test]
    fn local_authority_round_trip_through_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.json");
        let grid = test_grid();

        let mut store = LocalExitStore::new();
        store.save(&Avatar::new("Guide", Vec2::new(500.0, 1200.0)));
        store.persist(&path, "Guide").unwrap();

        let local_exit = LocalExitStore::open(&path).unwrap();
        let mut player = LocalPlayer::new("Guide", PersistenceConfig::default(), local_exit);
        let report = player.enter_world(&grid, false);

        assert_eq!(player.mode(), EntryMode::Local);
        assert_eq!(report.outcome, EntryOutcome::Restored);
        assert_eq!(report.position, Vec2::new(500.0, 1200.0 - UPWARD_NUDGE));

        // Consumed on entry; the next save carries no position.
        player.local_exit().persist(&path, "Guide").unwrap();
        let reopened = LocalExitStore::open(&path).unwrap();
        assert!(reopened.load().is_none());
    }
}

/// CORRUPTION AND EDGE CASE TESTS
mod containment_tests {
    use super::*;

    #[test]
    fn corrupt_avatar_save_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.json");
        std::fs::write(&path, b"{ \"name\": \"Guide\", \"hasExitPosition\": tru").unwrap();

        let store = LocalExitStore::open(&path).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn mismatched_session_arrays_load_empty() {
        let data = SessionExitData {
            names: vec!["Guide".to_string(), "Merchant".to_string()],
            xs: vec![1.0, 2.0],
            ys: vec![1.0],
        };
        assert!(SessionExitStore::from_data(data).is_empty());
    }

    #[test]
    fn out_of_bounds_restore_falls_back_to_spawn() {
        let grid = test_grid();
        let mut avatar = Avatar::new("Guide", Vec2::ZERO);
        let mut immunity = ImmunityWindow::new();
        let mut source = SessionRestore::new(Vec2::new(-50_000.0, 12.0));

        let orchestrator = EntryOrchestrator::new(&PersistenceConfig::default());
        let report = orchestrator.enter(&mut avatar, &mut immunity, &mut source, &grid, 10);

        assert_eq!(avatar.position, grid.spawn_point());
        assert_eq!(report.notice(), Some("could not restore, used default spawn"));
        assert!(immunity.is_active(10));
    }

    #[test]
    fn restore_payload_survives_transport_packet() {
        let payload = ModMessage::RestoreSavedPosition { x: 640.0, y: 800.0 }.encode();
        let bytes = serialize(&Packet::Mod { payload }).unwrap();

        match deserialize::<Packet>(&bytes).unwrap() {
            Packet::Mod { payload } => {
                assert_eq!(payload.len(), 9);
                assert_eq!(
                    ModMessage::decode(&payload).unwrap(),
                    ModMessage::RestoreSavedPosition { x: 640.0, y: 800.0 }
                );
            }
            _ => panic!("Packet type mismatch after serialization"),
        }
    }

    #[test]
    fn dead_avatar_is_excluded_from_both_stores() {
        let mut avatar = Avatar::new("Guide", Vec2::new(500.0, 1200.0));
        avatar.alive = false;

        let mut local = LocalExitStore::new();
        assert!(local.save(&avatar).is_none());
        assert!(local.load().is_none());

        let mut session = SessionExitStore::new();
        assert!(!session.capture(&avatar));
        assert_eq!(session.snapshot_all([&avatar]), 0);
        assert!(session.get("Guide").is_none());
    }
}
