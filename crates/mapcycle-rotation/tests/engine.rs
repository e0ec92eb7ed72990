//! Integration tests for the map engine against the in-memory server.

use std::sync::Arc;

use mapcycle_protocol::{MapInfo, MapUid, PlayerId, RemoteCall, ServerCallback};
use mapcycle_rotation::{
    LifecycleState, MapEngine, QueueChange, QueueConfig, QueueRejection, Restructure,
    RotationConfig, RotationError, RotationEvent, Submitter, UNLIMITED,
};
use mapcycle_rpc::{InMemoryServer, RemoteClient, RemoteError};
use mapcycle_session::{AuthLevel, SessionConfig};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn uid(s: &str) -> MapUid {
    MapUid::new(s).unwrap()
}

fn pid(s: &str) -> PlayerId {
    PlayerId::new(s).unwrap()
}

fn player(s: &str) -> Submitter {
    Submitter::Player(pid(s))
}

fn map(s: &str) -> MapInfo {
    MapInfo {
        uid: uid(s),
        file_name: format!("{s}.Map.Gbx"),
        name: s.to_uppercase(),
        author: "nadeo".into(),
        environment: "Stadium".into(),
        map_type: "Race".into(),
        author_time: Some(30_000),
    }
}

fn file(s: &str) -> String {
    format!("{s}.Map.Gbx")
}

fn server(names: &[&str]) -> InMemoryServer {
    InMemoryServer::new(names.iter().map(|n| map(n)).collect())
}

/// Defaults, minus automatic restructuring so call logs stay predictable.
fn config() -> RotationConfig {
    RotationConfig {
        restructure_on_begin: false,
        ..Default::default()
    }
}

fn unlimited_config() -> RotationConfig {
    RotationConfig {
        queue: QueueConfig {
            player_limit: UNLIMITED,
            ..Default::default()
        },
        ..config()
    }
}

type Engine = MapEngine<InMemoryServer>;

/// An engine attached to a server with `names`, call log cleared.
async fn started(names: &[&str], config: RotationConfig) -> (Engine, InMemoryServer) {
    let srv = server(names);
    let mut engine = MapEngine::new(srv.clone(), config, SessionConfig::default());
    engine.start().await.unwrap();
    srv.clear_calls();
    (engine, srv)
}

fn cached(engine: &Engine) -> Vec<String> {
    engine.cache().iter().map(|m| m.uid().to_string()).collect()
}

fn queued(engine: &Engine) -> Vec<String> {
    engine
        .queue()
        .entries()
        .iter()
        .map(|e| e.map_uid.to_string())
        .collect()
}

/// Compact, comparable rendering of the events received so far.
fn drain(rx: &mut mpsc::UnboundedReceiver<RotationEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(match event {
            RotationEvent::MapsUpdated { count } => format!("MapsUpdated({count})"),
            RotationEvent::BeginMap(m) => format!("BeginMap({})", m.uid()),
            RotationEvent::EndMap(m) => format!("EndMap({})", m.uid()),
            RotationEvent::QueueChanged { change, entry } => match entry {
                Some(e) => format!("{change:?}({})", e.map_uid),
                None => format!("{change:?}"),
            },
            RotationEvent::NextMapChosen(e) => format!("NextMapChosen({})", e.map_uid),
        });
    }
    out
}

/// Feeds every pending server callback to the engine, the way the
/// runtime does.
async fn pump(engine: &mut Engine, feed: &mut mpsc::UnboundedReceiver<ServerCallback>) {
    while let Ok(callback) = feed.try_recv() {
        match callback {
            ServerCallback::BeginMap { uid, restart } => {
                engine.begin_map(uid, restart).await.unwrap();
            }
            ServerCallback::EndMap => {
                engine.end_map().await.unwrap();
            }
            ServerCallback::MapListModified { list_changed } => {
                engine.on_map_list_modified(list_changed).await.unwrap();
            }
            ServerCallback::PlayerConnected { player } => {
                engine.player_connected(player, AuthLevel::Player);
            }
            ServerCallback::PlayerDisconnected { player } => {
                let _ = engine.player_disconnected(&player);
            }
        }
    }
}

// =========================================================================
// Start / sync
// =========================================================================

#[tokio::test]
async fn test_start_syncs_and_begins_current_map() {
    let (engine, _srv) = started(&["a", "b", "c"], config()).await;

    assert_eq!(cached(&engine), ["a", "b", "c"]);
    assert_eq!(engine.current_map().unwrap().uid(), &uid("a"));
    assert_eq!(engine.lifecycle_state(), LifecycleState::Active);
    assert_eq!(engine.queue().queue_buffer(), vec![uid("a")]);
}

#[tokio::test]
async fn test_sync_paginates_until_short_page() {
    let srv = server(&["a", "b", "c", "d", "e"]);
    let mut engine = MapEngine::new(
        srv.clone(),
        RotationConfig {
            sync_page_size: 2,
            ..config()
        },
        SessionConfig::default(),
    );

    assert_eq!(engine.sync().await, Ok(5));
    assert_eq!(
        srv.calls(),
        vec![
            RemoteCall::GetMapList { offset: 0, length: 2 },
            RemoteCall::GetMapList { offset: 2, length: 2 },
            RemoteCall::GetMapList { offset: 4, length: 2 },
        ]
    );
}

#[tokio::test]
async fn test_sync_stops_on_index_out_of_bounds() {
    let srv = server(&["a", "b", "c", "d"]);
    let mut engine = MapEngine::new(
        srv.clone(),
        RotationConfig {
            sync_page_size: 2,
            ..config()
        },
        SessionConfig::default(),
    );

    assert_eq!(engine.sync().await, Ok(4));
    assert_eq!(srv.calls().len(), 3);
    assert_eq!(cached(&engine), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_sync_stops_at_hard_cap() {
    let srv = server(&["a", "b", "c", "d", "e"]);
    let mut engine = MapEngine::new(
        srv.clone(),
        RotationConfig {
            sync_page_size: 2,
            sync_max_maps: 3,
            ..config()
        },
        SessionConfig::default(),
    );

    assert_eq!(engine.sync().await, Ok(3));
    assert_eq!(cached(&engine), ["a", "b", "c"]);
    assert_eq!(
        srv.calls().last(),
        Some(&RemoteCall::GetMapList { offset: 2, length: 1 })
    );
}

#[tokio::test]
async fn test_sync_failure_leaves_cache_untouched() {
    let (mut engine, srv) = started(&["a", "b", "c"], config()).await;
    srv.replace_rotation(vec![map("c"), map("b")]);
    srv.fail_next("GetMapList", RemoteError::Transport("reset".into()));

    let result = engine.sync().await;

    assert_eq!(
        result,
        Err(RotationError::Remote(RemoteError::Transport("reset".into())))
    );
    assert_eq!(cached(&engine), ["a", "b", "c"]);

    assert_eq!(engine.sync().await, Ok(2));
    assert_eq!(cached(&engine), ["c", "b"]);
}

#[tokio::test]
async fn test_sync_preserves_identity_and_uniqueness() {
    let (mut engine, srv) = started(&["a", "b", "c"], config()).await;
    let a = Arc::clone(engine.cache().get(&uid("a")).unwrap());

    let mut renamed = map("a");
    renamed.name = "Renamed".into();
    srv.replace_rotation(vec![map("c"), renamed, map("b"), map("c")]);
    engine.sync().await.unwrap();

    assert_eq!(cached(&engine), ["c", "a", "b"]);
    assert!(Arc::ptr_eq(&a, engine.cache().get(&uid("a")).unwrap()));
    assert_eq!(a.name(), "Renamed");
    assert_eq!(engine.cache().index_of(&uid("a")), Some(1));
}

#[tokio::test]
async fn test_sync_publishes_maps_updated() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    let mut events = engine.subscribe();

    engine.sync().await.unwrap();

    assert_eq!(drain(&mut events), ["MapsUpdated(2)"]);
}

#[tokio::test]
async fn test_next_map_pointer_change_needs_no_sync() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;

    assert_eq!(engine.on_map_list_modified(false).await, Ok(None));
    assert!(srv.calls().is_empty());
    assert_eq!(engine.on_map_list_modified(true).await, Ok(Some(2)));
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_duplicate_begin_is_ignored() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    let mut events = engine.subscribe();

    engine.begin_map(uid("a"), false).await.unwrap();
    engine.begin_map(uid("a"), false).await.unwrap();

    assert!(drain(&mut events).is_empty());
    assert_eq!(engine.queue().queue_buffer(), vec![uid("a")]);
}

#[tokio::test]
async fn test_begin_of_other_map_ends_previous_first() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    let mut events = engine.subscribe();

    engine.begin_map(uid("b"), false).await.unwrap();

    assert_eq!(drain(&mut events), ["EndMap(a)", "BeginMap(b)"]);
}

#[tokio::test]
async fn test_restart_ends_before_begin() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    let mut events = engine.subscribe();

    engine.begin_map(uid("a"), true).await.unwrap();

    assert_eq!(drain(&mut events), ["EndMap(a)", "BeginMap(a)"]);
    assert_eq!(engine.lifecycle_state(), LifecycleState::Active);
}

#[tokio::test]
async fn test_end_fires_once() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    let mut events = engine.subscribe();

    engine.end_map().await.unwrap();
    engine.end_map().await.unwrap();

    assert_eq!(drain(&mut events), ["EndMap(a)"]);
    assert_eq!(engine.lifecycle_state(), LifecycleState::Ended);
}

#[tokio::test]
async fn test_end_before_any_begin_is_noop() {
    let srv = server(&["a"]);
    let mut engine = MapEngine::new(srv, config(), SessionConfig::default());
    let mut events = engine.subscribe();

    assert_eq!(engine.end_map().await, Ok(None));
    assert!(drain(&mut events).is_empty());
    assert_eq!(engine.lifecycle_state(), LifecycleState::Idle);
}

#[tokio::test]
async fn test_begin_of_unseen_map_fetches_and_appends() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;
    srv.replace_rotation(vec![map("z"), map("b")]);

    engine.begin_map(uid("z"), false).await.unwrap();

    assert!(srv.calls().contains(&RemoteCall::GetCurrentMapInfo));
    assert_eq!(cached(&engine), ["a", "b", "z"]);
    assert_eq!(engine.current_map().unwrap().uid(), &uid("z"));
}

#[tokio::test]
async fn test_begin_disagreeing_with_server_is_not_found() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;
    let mut events = engine.subscribe();

    assert_eq!(
        engine.begin_map(uid("zz"), false).await,
        Err(RotationError::NotFound(uid("zz")))
    );

    assert!(srv.calls().contains(&RemoteCall::GetCurrentMapInfo));
    assert!(drain(&mut events).is_empty());
    assert_eq!(engine.current_map().unwrap().uid(), &uid("a"));
    assert_eq!(engine.lifecycle_state(), LifecycleState::Active);
    assert_eq!(cached(&engine), ["a", "b"]);
}

// =========================================================================
// Queue
// =========================================================================

#[tokio::test]
async fn test_end_to_end_queue_sets_next_map_and_buffers() {
    let (mut engine, srv) = started(
        &["X", "Y", "mapA", "B"],
        RotationConfig {
            queue: QueueConfig {
                buffer_size: 2,
                ..Default::default()
            },
            ..config()
        },
    )
    .await;
    engine.end_map().await.unwrap();
    engine.begin_map(uid("Y"), false).await.unwrap();
    assert_eq!(engine.queue().queue_buffer(), vec![uid("X"), uid("Y")]);

    engine.player_connected(pid("p1"), AuthLevel::Player);
    engine.add_to_queue(player("p1"), uid("mapA")).unwrap();

    let chosen = engine.end_map().await.unwrap().unwrap();
    assert_eq!(chosen.map_uid, uid("mapA"));
    assert_eq!(srv.next(), Some(uid("mapA")));
    assert!(srv.calls().contains(&RemoteCall::SetNextMap { uid: uid("mapA") }));

    engine.begin_map(uid("mapA"), false).await.unwrap();
    assert_eq!(engine.queue().queue_buffer(), vec![uid("Y"), uid("mapA")]);
    assert!(engine.queue().is_empty());
}

#[tokio::test]
async fn test_request_without_connect_event_is_played() {
    let (mut engine, srv) = started(&["X", "mapA", "B"], config()).await;

    engine.add_to_queue(player("p1"), uid("mapA")).unwrap();
    let chosen = engine.end_map().await.unwrap();

    assert_eq!(chosen.unwrap().map_uid, uid("mapA"));
    assert_eq!(srv.next(), Some(uid("mapA")));
    assert!(engine.roster().is_connected(&pid("p1")));
}

#[tokio::test]
async fn test_start_registers_players_already_on_server() {
    let srv = server(&["s", "A", "B"]);
    srv.connect_player(pid("early"));
    let mut engine = MapEngine::new(srv.clone(), unlimited_config(), SessionConfig::default());
    engine.start().await.unwrap();
    assert!(engine.roster().is_connected(&pid("early")));

    engine.add_to_queue(player("early"), uid("A")).unwrap();
    let chosen = engine.end_map().await.unwrap();

    assert_eq!(chosen.unwrap().map_uid, uid("A"));
}

#[tokio::test]
async fn test_sync_players_follows_server_list() {
    let (mut engine, srv) = started(&["a"], config()).await;

    srv.connect_player(pid("late"));
    assert_eq!(engine.sync_players().await, Ok(vec![pid("late")]));
    assert!(engine.roster().is_connected(&pid("late")));

    srv.disconnect_player(pid("late"));
    assert_eq!(engine.sync_players().await, Ok(vec![]));
    assert!(!engine.roster().is_connected(&pid("late")));
}

#[tokio::test]
async fn test_privileged_request_survives_session_expiry() {
    let srv = server(&["s", "A"]);
    let mut engine = MapEngine::new(
        srv.clone(),
        config(),
        SessionConfig {
            disconnected_grace_secs: 0,
        },
    );
    engine.start().await.unwrap();
    engine.player_connected(pid("adm"), AuthLevel::Admin);
    engine.add_to_queue(player("adm"), uid("A")).unwrap();
    engine.player_disconnected(&pid("adm")).unwrap();
    assert_eq!(engine.expire_sessions(), vec![pid("adm")]);

    let chosen = engine.end_map().await.unwrap();

    assert_eq!(chosen.unwrap().map_uid, uid("A"));
    assert_eq!(srv.next(), Some(uid("A")));
}

#[tokio::test]
async fn test_add_to_queue_rejections_are_values() {
    let (mut engine, _srv) = started(&["a", "b", "c"], config()).await;
    engine.player_connected(pid("p1"), AuthLevel::Player);

    assert_eq!(
        engine.add_to_queue(player("p1"), uid("nope")),
        Err(QueueRejection::UnknownMap(uid("nope")))
    );
    assert_eq!(
        engine.add_to_queue(player("p1"), uid("a")),
        Err(QueueRejection::RecentlyPlayed(uid("a")))
    );
    engine.add_to_queue(player("p1"), uid("b")).unwrap();
    assert_eq!(
        engine.add_to_queue(player("p1"), uid("b")),
        Err(QueueRejection::AlreadyQueued(uid("b")))
    );
    assert_eq!(
        engine.add_to_queue(player("p1"), uid("c")),
        Err(QueueRejection::QuotaExceeded { limit: 1 })
    );
    assert_eq!(queued(&engine), ["b"]);
}

#[tokio::test]
async fn test_privileged_player_overrides_buffer() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    engine.player_connected(pid("mod"), AuthLevel::Moderator);

    engine.add_to_queue(player("mod"), uid("a")).unwrap();
    assert_eq!(queued(&engine), ["a"]);
}

#[tokio::test]
async fn test_queue_changes_are_published() {
    let (mut engine, _srv) = started(&["a", "b", "c"], unlimited_config()).await;
    let mut events = engine.subscribe();

    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();
    engine.add_first_to_queue(player("p1"), uid("c")).unwrap();
    engine.remove_from_queue(&Submitter::Server, &uid("b")).unwrap();
    engine.clear_queue(&Submitter::Server).unwrap();

    assert_eq!(
        drain(&mut events),
        ["Added(b)", "AddedFirst(c)", "Removed(b)", "Cleared"]
    );
}

#[tokio::test]
async fn test_clear_queue_needs_clear_level() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    engine.player_connected(pid("pleb"), AuthLevel::Player);
    engine.player_connected(pid("mod"), AuthLevel::Moderator);
    engine.add_to_queue(player("pleb"), uid("b")).unwrap();

    assert_eq!(
        engine.clear_queue(&player("pleb")),
        Err(QueueRejection::NotPermitted)
    );
    assert_eq!(engine.clear_queue(&player("mod")), Ok(1));
}

#[tokio::test]
async fn test_skip_on_leave_stops_at_first_keep() {
    let (mut engine, srv) = started(&["s", "A", "B", "C"], unlimited_config()).await;
    for p in ["pa", "pb", "pc"] {
        engine.player_connected(pid(p), AuthLevel::Player);
    }
    engine.add_to_queue(player("pa"), uid("A")).unwrap();
    engine.add_to_queue(player("pb"), uid("B")).unwrap();
    engine.add_to_queue(player("pc"), uid("C")).unwrap();
    engine.player_disconnected(&pid("pa")).unwrap();
    engine.player_disconnected(&pid("pc")).unwrap();
    let mut events = engine.subscribe();

    let chosen = engine.end_map().await.unwrap().unwrap();

    assert_eq!(chosen.map_uid, uid("B"));
    assert_eq!(queued(&engine), ["C"]);
    assert_eq!(srv.next(), Some(uid("B")));
    assert_eq!(
        drain(&mut events),
        ["EndMap(s)", "Skipped(A)", "NextMapChosen(B)"]
    );
}

#[tokio::test]
async fn test_rotation_change_in_progress_is_swallowed() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;
    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();
    srv.fail_next("SetNextMap", RemoteError::RotationChangeInProgress);

    let chosen = engine.end_map().await.unwrap();

    assert_eq!(chosen.unwrap().map_uid, uid("b"));
    assert_eq!(srv.next(), None);
}

#[tokio::test]
async fn test_other_next_map_failure_is_returned() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;
    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();
    srv.fail_next("SetNextMap", RemoteError::Transport("gone".into()));

    let result = engine.end_map().await;

    assert_eq!(
        result,
        Err(RotationError::Remote(RemoteError::Transport("gone".into())))
    );
    assert_eq!(engine.lifecycle_state(), LifecycleState::Ended);
}

#[tokio::test]
async fn test_dont_queue_next_map_change_is_one_shot() {
    let (mut engine, _srv) = started(&["a", "b", "c"], config()).await;
    engine.add_to_queue(Submitter::Server, uid("c")).unwrap();
    engine.dont_queue_next_map_change();

    assert_eq!(engine.end_map().await, Ok(None));
    assert_eq!(queued(&engine), ["c"]);

    engine.begin_map(uid("b"), false).await.unwrap();
    let chosen = engine.end_map().await.unwrap();
    assert_eq!(chosen.unwrap().map_uid, uid("c"));
}

#[tokio::test]
async fn test_replay_current_queues_current_first() {
    let (mut engine, _srv) = started(&["a", "b"], config()).await;
    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();

    let entry = engine.replay_current(player("p1")).unwrap();

    assert!(entry.priority);
    assert_eq!(queued(&engine), ["a", "b"]);
}

#[tokio::test]
async fn test_replay_current_without_map() {
    let mut engine = MapEngine::new(server(&["a"]), config(), SessionConfig::default());
    assert_eq!(
        engine.replay_current(Submitter::Server),
        Err(RotationError::NoCurrentMap)
    );
}

// =========================================================================
// Restructure
// =========================================================================

#[tokio::test]
async fn test_restructure_below_threshold_makes_no_calls() {
    let (mut engine, srv) = started(
        &["M0", "M1", "M2", "M3", "M4"],
        RotationConfig {
            restructure_threshold: 3,
            ..config()
        },
    )
    .await;
    engine.begin_map(uid("M2"), false).await.unwrap();
    srv.clear_calls();

    assert_eq!(engine.restructure().await, Ok(Restructure::Unchanged));
    assert!(srv.calls().is_empty());
}

#[tokio::test]
async fn test_restructure_rotates_after_current() {
    let (mut engine, srv) = started(
        &["M0", "M1", "M2", "M3", "M4"],
        RotationConfig {
            restructure_threshold: 3,
            ..config()
        },
    )
    .await;
    srv.jump_to_map(&uid("M3")).await.unwrap();
    engine.begin_map(uid("M3"), false).await.unwrap();
    srv.clear_calls();

    assert_eq!(engine.restructure().await, Ok(Restructure::Submitted(4)));
    assert_eq!(
        srv.calls(),
        vec![RemoteCall::ChooseNextMaps {
            file_names: vec![file("M4"), file("M0"), file("M1"), file("M2")],
        }]
    );
    assert_eq!(
        srv.rotation(),
        vec![uid("M3"), uid("M4"), uid("M0"), uid("M1"), uid("M2")]
    );
}

#[tokio::test]
async fn test_restructure_runs_after_begin_when_enabled() {
    let (mut engine, srv) = started(
        &["M0", "M1", "M2", "M3"],
        RotationConfig {
            restructure_threshold: 2,
            restructure_on_begin: true,
            ..Default::default()
        },
    )
    .await;
    let mut feed = srv.callbacks();
    srv.jump_to_map(&uid("M2")).await.unwrap();

    pump(&mut engine, &mut feed).await;

    assert_eq!(cached(&engine), ["M2", "M3", "M0", "M1"]);
    assert_eq!(engine.cache().index_of(&uid("M2")), Some(0));
}

#[tokio::test]
async fn test_restructure_without_current_map() {
    let srv = server(&["a", "b"]);
    let mut engine = MapEngine::new(
        srv.clone(),
        RotationConfig {
            restructure_threshold: 0,
            ..config()
        },
        SessionConfig::default(),
    );

    assert_eq!(engine.restructure().await, Ok(Restructure::Unchanged));
    assert!(srv.calls().is_empty());
}

// =========================================================================
// Rotation changes
// =========================================================================

#[tokio::test]
async fn test_add_map_adds_and_resyncs() {
    let srv = InMemoryServer::with_library(vec![map("a"), map("b")], vec![map("z")]);
    let mut engine = MapEngine::new(srv.clone(), config(), SessionConfig::default());
    engine.start().await.unwrap();

    let added = engine.add_map(&file("z")).await.unwrap();

    assert_eq!(added.uid(), &uid("z"));
    assert_eq!(cached(&engine), ["a", "b", "z"]);
    assert!(Arc::ptr_eq(&added, engine.cache().get(&uid("z")).unwrap()));
}

#[tokio::test]
async fn test_add_map_surfaces_list_full() {
    let srv = InMemoryServer::with_library(vec![map("a"), map("b")], vec![map("z")]);
    srv.set_max_maps(2);
    let mut engine = MapEngine::new(srv.clone(), config(), SessionConfig::default());
    engine.start().await.unwrap();

    assert_eq!(
        engine.add_map(&file("z")).await.map(|m| m.uid().clone()),
        Err(RotationError::Remote(RemoteError::MapListFull))
    );
    assert_eq!(engine.cache().len(), 2);
}

#[tokio::test]
async fn test_remove_maps_batches_and_purges_queue() {
    let (mut engine, srv) = started(&["a", "b", "c"], config()).await;
    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();
    let mut events = engine.subscribe();

    let removed = engine.remove_maps(&[uid("b"), uid("ghost")]).await.unwrap();

    assert_eq!(removed, 1);
    assert_eq!(srv.rotation(), vec![uid("a"), uid("c")]);
    assert_eq!(cached(&engine), ["a", "c"]);
    assert!(engine.queue().is_empty());
    assert_eq!(srv.calls()[0], RemoteCall::RemoveMap { file_name: file("b") });
    assert_eq!(drain(&mut events), ["MapsUpdated(2)", "Purged(b)"]);
}

#[tokio::test]
async fn test_remove_maps_of_unknown_uids_makes_no_calls() {
    let (mut engine, srv) = started(&["a"], config()).await;
    assert_eq!(engine.remove_maps(&[uid("ghost")]).await, Ok(0));
    assert!(srv.calls().is_empty());
}

#[tokio::test]
async fn test_shuffle_keeps_current_first_and_membership() {
    let names = ["a", "b", "c", "d", "e", "f"];
    let (mut engine, srv) = started(&names, config()).await;

    assert_eq!(engine.shuffle().await, Ok(5));

    let mut rotation = srv.rotation();
    assert_eq!(rotation[0], uid("a"));
    rotation.sort();
    assert_eq!(rotation, names.iter().map(|n| uid(n)).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_shuffle_needs_current_map() {
    let mut engine = MapEngine::new(server(&["a", "b"]), config(), SessionConfig::default());
    assert_eq!(engine.shuffle().await, Err(RotationError::NoCurrentMap));
}

#[tokio::test]
async fn test_skip_map_plays_queue_head_without_consuming_more() {
    let (mut engine, srv) = started(&["a", "b", "c"], config()).await;
    let mut feed = srv.callbacks();
    engine.add_to_queue(Submitter::Server, uid("c")).unwrap();
    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();

    let chosen = engine.skip_map().await.unwrap();
    assert_eq!(chosen.unwrap().map_uid, uid("c"));
    assert!(engine.queue().is_dont_queue_armed());

    pump(&mut engine, &mut feed).await;

    assert_eq!(srv.current(), Some(uid("c")));
    assert_eq!(engine.current_map().unwrap().uid(), &uid("c"));
    assert_eq!(queued(&engine), ["b"]);
    assert!(!engine.queue().is_dont_queue_armed());
}

#[tokio::test]
async fn test_jump_to_map_bypasses_queue() {
    let (mut engine, srv) = started(&["a", "b", "c"], config()).await;
    let mut feed = srv.callbacks();
    engine.add_to_queue(Submitter::Server, uid("b")).unwrap();

    engine.jump_to_map(&uid("c")).await.unwrap();
    pump(&mut engine, &mut feed).await;

    assert_eq!(engine.current_map().unwrap().uid(), &uid("c"));
    assert_eq!(queued(&engine), ["b"]);
    assert!(!engine.queue().is_dont_queue_armed());
}

#[tokio::test]
async fn test_jump_to_unknown_map_is_not_found() {
    let (mut engine, srv) = started(&["a"], config()).await;
    assert_eq!(
        engine.jump_to_map(&uid("zz")).await,
        Err(RotationError::NotFound(uid("zz")))
    );
    assert!(srv.calls().is_empty());
}

#[tokio::test]
async fn test_failed_jump_disarms_suppression() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;
    srv.fail_next("JumpToMap", RemoteError::Transport("gone".into()));

    assert!(engine.jump_to_map(&uid("b")).await.is_err());
    assert!(!engine.queue().is_dont_queue_armed());
}

#[tokio::test]
async fn test_restart_map_round_trip() {
    let (mut engine, srv) = started(&["a", "b"], config()).await;
    let mut feed = srv.callbacks();
    let mut events = engine.subscribe();

    engine.restart_map().await.unwrap();
    pump(&mut engine, &mut feed).await;

    assert_eq!(drain(&mut events), ["EndMap(a)", "BeginMap(a)"]);
    assert_eq!(engine.queue().queue_buffer(), vec![uid("a")]);
}

// =========================================================================
// Config / players
// =========================================================================

#[tokio::test]
async fn test_set_config_shrinks_buffer() {
    let (mut engine, _srv) = started(&["a", "b", "c"], config()).await;
    engine.begin_map(uid("b"), false).await.unwrap();
    engine.begin_map(uid("c"), false).await.unwrap();

    engine.set_config(RotationConfig {
        queue: QueueConfig {
            buffer_size: 1,
            ..Default::default()
        },
        ..config()
    });

    assert_eq!(engine.queue().queue_buffer(), vec![uid("c")]);
}

#[tokio::test]
async fn test_player_presence_follows_callbacks() {
    let (mut engine, srv) = started(&["a"], config()).await;
    let mut feed = srv.callbacks();

    srv.connect_player(pid("p1"));
    pump(&mut engine, &mut feed).await;
    assert!(engine.roster().is_connected(&pid("p1")));

    srv.disconnect_player(pid("p1"));
    pump(&mut engine, &mut feed).await;
    assert!(!engine.roster().is_connected(&pid("p1")));
}
