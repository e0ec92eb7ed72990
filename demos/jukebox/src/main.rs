use std::sync::Arc;

use mapcycle::prelude::*;

// ---------------------------------------------------------------------------
// Sample server
// ---------------------------------------------------------------------------

fn map(uid: &str, name: &str, author: &str) -> Result<MapInfo, MapcycleError> {
    Ok(MapInfo {
        uid: uid.parse()?,
        file_name: format!("Campaign/{uid}.Map.Gbx"),
        name: name.into(),
        author: author.into(),
        environment: "Stadium".into(),
        map_type: "TrackMania\\TM_Race".into(),
        author_time: None,
    })
}

fn sample_server() -> Result<InMemoryServer, MapcycleError> {
    let rotation = vec![
        map("spring01", "Spring 01", "nadeo")?,
        map("spring02", "Spring 02", "nadeo")?,
        map("spring03", "Spring 03", "nadeo")?,
        map("canyon_run", "Canyon Run", "lisa")?,
        map("ice_drift", "Ice Drift", "tom")?,
    ];
    let library = vec![map("night_loop", "Night Loop", "lisa")?];
    Ok(InMemoryServer::with_library(rotation, library))
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Logins prefixed with `op_` are server operators.
struct OperatorAuth;

impl Authorizer for OperatorAuth {
    async fn auth_level(&self, player: &PlayerId) -> AuthLevel {
        if player.as_str().starts_with("op_") {
            AuthLevel::Admin
        } else {
            AuthLevel::Player
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn describe(event: &RotationEvent) -> String {
    match event {
        RotationEvent::MapsUpdated { count } => format!("rotation holds {count} maps"),
        RotationEvent::BeginMap(map) => format!("now playing {}", map.name()),
        RotationEvent::EndMap(map) => format!("{} finished", map.name()),
        RotationEvent::QueueChanged { change, entry } => match entry {
            Some(entry) => format!("queue {change:?}: {} by {}", entry.map_uid, entry.submitter),
            None => format!("queue {change:?}"),
        },
        RotationEvent::NextMapChosen(entry) => {
            format!("next up: {} (queued by {})", entry.map_uid, entry.submitter)
        }
    }
}

async fn print_queue(handle: &EngineHandle) -> Result<(), MapcycleError> {
    let entries = handle.queue_entries().await?;
    if entries.is_empty() {
        println!("  queue is empty");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, entry.map_uid, entry.submitter);
    }
    Ok(())
}

async fn print_current(handle: &EngineHandle) -> Result<(), MapcycleError> {
    let current: Option<Arc<Map>> = handle.current_map().await?;
    match current {
        Some(map) => println!("  current map: {} by {}", map.name(), map.author()),
        None => println!("  no map running"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    mapcycle::init_tracing();

    let server = sample_server()?;
    let feed = server.callbacks();
    let engine = RotationServerBuilder::new().build(server.clone(), OperatorAuth, feed);
    let handle = engine.handle();
    let engine_task = tokio::spawn(engine.run());

    let mut events = handle.subscribe().await?;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("[event] {}", describe(&event));
        }
    });

    let alice: PlayerId = "alice".parse()?;
    let bob: PlayerId = "bob".parse()?;
    let operator: PlayerId = "op_sam".parse()?;
    for player in [&alice, &bob, &operator] {
        server.connect_player(player.clone());
    }

    println!("== players queue maps");
    handle
        .add_to_queue(Submitter::Player(alice.clone()), "canyon_run".parse()?)
        .await?;
    handle
        .add_to_queue(Submitter::Player(bob.clone()), "ice_drift".parse()?)
        .await?;
    if let Err(e) = handle
        .add_to_queue(Submitter::Player(alice.clone()), "spring02".parse()?)
        .await
    {
        println!("  alice: {e}");
    }
    if let Err(e) = handle
        .add_to_queue(Submitter::Player(bob.clone()), "spring01".parse()?)
        .await
    {
        println!("  bob: {e}");
    }
    print_queue(&handle).await?;

    println!("== the current map runs out of time");
    server.finish_map();
    print_current(&handle).await?;
    print_queue(&handle).await?;

    println!("== bob leaves, the operator skips");
    server.disconnect_player(bob.clone());
    handle.skip_map().await?;
    print_current(&handle).await?;
    print_queue(&handle).await?;

    println!("== the operator adds a map and replays the current one");
    let added = handle.add_map("Campaign/night_loop.Map.Gbx").await?;
    println!("  added {}", added.name());
    handle.replay_current(Submitter::Player(operator.clone())).await?;
    print_queue(&handle).await?;
    println!("  rotation holds {} maps", handle.maps_count().await?);

    handle.shutdown().await?;
    engine_task.await??;
    printer.await?;
    Ok(())
}
