//! Dispatch of server callbacks and handle commands onto the engine.
//!
//! Both functions run inside the engine task, one input at a time. A
//! failure is logged and the loop carries on; nothing here is fatal.

use mapcycle_protocol::{PlayerId, ServerCallback};
use mapcycle_rotation::MapEngine;
use mapcycle_rpc::RemoteClient;
use mapcycle_session::Authorizer;

use crate::handle::Command;

/// Applies one server callback.
pub(crate) async fn handle_callback<R, A>(
    engine: &mut MapEngine<R>,
    authorizer: &A,
    callback: ServerCallback,
) where
    R: RemoteClient,
    A: Authorizer,
{
    match callback {
        ServerCallback::BeginMap { uid, restart } => {
            if let Err(e) = engine.begin_map(uid, restart).await {
                tracing::warn!(error = %e, "map begin handling failed");
            }
        }
        ServerCallback::EndMap => {
            if let Err(e) = engine.end_map().await {
                tracing::warn!(error = %e, "map end handling failed");
            }
        }
        ServerCallback::MapListModified { list_changed } => {
            if let Err(e) = engine.on_map_list_modified(list_changed).await {
                tracing::warn!(error = %e, "resync after list change failed");
            }
        }
        ServerCallback::PlayerConnected { player } => {
            let level = authorizer.auth_level(&player).await;
            engine.player_connected(player, level);
        }
        ServerCallback::PlayerDisconnected { player } => {
            if let Err(e) = engine.player_disconnected(&player) {
                tracing::debug!(error = %e, "disconnect for unknown player");
            }
        }
    }
}

/// Applies one handle command. Returns `true` when the engine should stop.
pub(crate) async fn handle_command<R: RemoteClient>(
    engine: &mut MapEngine<R>,
    command: Command,
) -> bool {
    match command {
        Command::AddToQueue {
            submitter,
            uid,
            reply,
        } => {
            let _ = reply.send(engine.add_to_queue(submitter, uid));
        }
        Command::AddFirstToQueue {
            submitter,
            uid,
            reply,
        } => {
            let _ = reply.send(engine.add_first_to_queue(submitter, uid));
        }
        Command::RemoveFromQueue {
            submitter,
            uid,
            reply,
        } => {
            let _ = reply.send(engine.remove_from_queue(&submitter, &uid));
        }
        Command::ClearQueue { submitter, reply } => {
            let _ = reply.send(engine.clear_queue(&submitter));
        }
        Command::QueueBuffer { reply } => {
            let _ = reply.send(engine.queue().queue_buffer());
        }
        Command::QueuedRanking { reply } => {
            let _ = reply.send(engine.queue().queued_ranking());
        }
        Command::Queuer { uid, reply } => {
            let _ = reply.send(engine.queue().queuer(&uid).cloned());
        }
        Command::NextQueuedEntry { reply } => {
            let _ = reply.send(engine.queue().next_queued_entry().cloned());
        }
        Command::QueueEntries { reply } => {
            let _ = reply.send(engine.queue().entries());
        }
        Command::CurrentMap { reply } => {
            let _ = reply.send(engine.current_map());
        }
        Command::Maps {
            offset,
            length,
            reply,
        } => {
            let maps = engine
                .cache()
                .slice(offset.unwrap_or(0), length.unwrap_or(usize::MAX));
            let _ = reply.send(maps);
        }
        Command::MapsCount { reply } => {
            let _ = reply.send(engine.cache().len());
        }
        Command::MapByUid { uid, reply } => {
            let _ = reply.send(engine.cache().get(&uid).cloned());
        }
        Command::DontQueueNextMapChange { reply } => {
            engine.dont_queue_next_map_change();
            let _ = reply.send(());
        }
        Command::Restructure { reply } => {
            let _ = reply.send(engine.restructure().await);
        }
        Command::Sync { reply } => {
            let _ = reply.send(engine.sync().await);
        }
        Command::SkipMap { reply } => {
            let _ = reply.send(engine.skip_map().await);
        }
        Command::JumpToMap { uid, reply } => {
            let _ = reply.send(engine.jump_to_map(&uid).await);
        }
        Command::RestartMap { reply } => {
            let _ = reply.send(engine.restart_map().await);
        }
        Command::ReplayCurrent { submitter, reply } => {
            let _ = reply.send(engine.replay_current(submitter));
        }
        Command::Shuffle { reply } => {
            let _ = reply.send(engine.shuffle().await);
        }
        Command::AddMap { file_name, reply } => {
            let _ = reply.send(engine.add_map(&file_name).await);
        }
        Command::RemoveMaps { uids, reply } => {
            let _ = reply.send(engine.remove_maps(&uids).await);
        }
        Command::Subscribe { reply } => {
            let _ = reply.send(engine.subscribe());
        }
        Command::Shutdown => {
            tracing::info!("map engine shutting down");
            return true;
        }
    }
    false
}

/// Looks up the level of every connected player. Used after attaching,
/// when players already on the server were added without one.
pub(crate) async fn authorize_players<R, A>(
    engine: &mut MapEngine<R>,
    authorizer: &A,
    players: Vec<PlayerId>,
) where
    R: RemoteClient,
    A: Authorizer,
{
    for player in players {
        let level = authorizer.auth_level(&player).await;
        engine.player_connected(player, level);
    }
}

/// Periodic upkeep: resync the rotation and the player list, and forget
/// long-gone players.
pub(crate) async fn refresh<R, A>(engine: &mut MapEngine<R>, authorizer: &A)
where
    R: RemoteClient,
    A: Authorizer,
{
    if let Err(e) = engine.sync().await {
        tracing::warn!(error = %e, "periodic resync failed");
    }
    match engine.sync_players().await {
        Ok(joined) => authorize_players(engine, authorizer, joined).await,
        Err(e) => tracing::warn!(error = %e, "player list refresh failed"),
    }
    let expired = engine.expire_sessions();
    if !expired.is_empty() {
        tracing::debug!(count = expired.len(), "expired player sessions");
    }
}
