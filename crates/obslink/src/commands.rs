//! Command dispatch over the facade.

use obslink_core::{ObsSession, RemoteEvent, SourceAction, SourceRef};

use crate::cli::{
    CollectionCommand, Command, FilterCommand, MuteCommand, SceneCommand, SourceCommand,
    SourceTarget, StreamCommand, VirtualcamCommand,
};
use crate::error::CliError;

pub async fn dispatch(command: Command, session: &ObsSession) -> Result<(), CliError> {
    match command {
        Command::Scene(cmd) => scene(cmd, session).await,
        Command::Collection(cmd) => collection(cmd, session).await,
        Command::Source(cmd) => source(cmd, session).await,
        Command::Filter(cmd) => filter(cmd, session).await,
        Command::Mute(cmd) => mute(cmd, session).await,
        Command::Stream(cmd) => stream(cmd, session).await,
        Command::Virtualcam(cmd) => virtualcam(cmd, session).await,
        Command::Events => events(session).await,
    }
}

async fn scene(cmd: SceneCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        SceneCommand::List => {
            for name in session.get_scene_list().await {
                println!("{name}");
            }
        }
        SceneCommand::Current => match session.get_current_scene_name().await {
            Some(name) => println!("{name}"),
            None => return Err(CliError::NoData("current scene")),
        },
        SceneCommand::Set { name } => session.set_current_scene(&name).await,
    }
    Ok(())
}

async fn collection(cmd: CollectionCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        CollectionCommand::List => {
            for name in session.get_scene_collection_list().await {
                println!("{name}");
            }
        }
        CollectionCommand::Current => match session.get_current_scene_collection_name().await {
            Some(name) => println!("{name}"),
            None => return Err(CliError::NoData("current scene collection")),
        },
        CollectionCommand::Set { name } => session.set_current_scene_collection(&name).await,
    }
    Ok(())
}

async fn source(cmd: SourceCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        SourceCommand::List => {
            let sources = session
                .get_all_sources()
                .await
                .ok_or(CliError::NoData("sources"))?;
            for source in sources {
                let filters: Vec<_> = source
                    .filters
                    .iter()
                    .map(|f| format!("{}{}", f.name, if f.enabled { "" } else { " (off)" }))
                    .collect();
                println!("{} [{}]  {}", source.name, source.kind, filters.join(", "));
            }
        }
        SourceCommand::Data => {
            let data = session
                .get_source_data()
                .await
                .ok_or(CliError::NoData("source data"))?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        SourceCommand::Audio => {
            let sources = session
                .get_audio_sources()
                .await
                .ok_or(CliError::NoData("audio sources"))?;
            for source in sources {
                println!("{}", source.name);
            }
        }
        SourceCommand::Visibility { target } => {
            let source = source_ref(target);
            match session.get_source_visibility(&source).await {
                Some(visible) => println!("{}", if visible { "visible" } else { "hidden" }),
                None => return Err(CliError::NoData("source visibility")),
            }
        }
        SourceCommand::Show { target } => {
            session
                .apply_source_visibility(&source_ref(target), SourceAction::Enable)
                .await;
        }
        SourceCommand::Hide { target } => {
            session
                .apply_source_visibility(&source_ref(target), SourceAction::Disable)
                .await;
        }
        SourceCommand::Toggle { target } => {
            session
                .apply_source_visibility(&source_ref(target), SourceAction::Toggle)
                .await;
        }
    }
    Ok(())
}

fn source_ref(target: SourceTarget) -> SourceRef {
    match (target.scene, target.item_id, target.name) {
        (Some(scene), Some(item_id), _) => SourceRef::Item { scene, item_id },
        (_, _, Some(name)) => SourceRef::Name(name),
        // clap's requires/conflicts rules make this unreachable.
        _ => SourceRef::Name(String::new()),
    }
}

async fn filter(cmd: FilterCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        FilterCommand::List { source } => {
            for filter in session.get_source_filters(&source).await {
                println!(
                    "{}  {}",
                    filter.name,
                    if filter.enabled { "enabled" } else { "disabled" }
                );
            }
        }
        FilterCommand::Get { source, filter } => {
            match session.get_filter_enabled(&source, &filter).await {
                Some(enabled) => println!("{}", if enabled { "enabled" } else { "disabled" }),
                None => return Err(CliError::NoData("filter state")),
            }
        }
        FilterCommand::Enable { source, filter } => {
            session
                .apply_filter_action(&source, &filter, SourceAction::Enable)
                .await;
        }
        FilterCommand::Disable { source, filter } => {
            session
                .apply_filter_action(&source, &filter, SourceAction::Disable)
                .await;
        }
        FilterCommand::Toggle { source, filter } => {
            session
                .apply_filter_action(&source, &filter, SourceAction::Toggle)
                .await;
        }
    }
    Ok(())
}

async fn mute(cmd: MuteCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        MuteCommand::Toggle { source } => session.toggle_source_muted(&source).await,
        MuteCommand::On { source } => session.set_source_muted(&source, true).await,
        MuteCommand::Off { source } => session.set_source_muted(&source, false).await,
    }
    Ok(())
}

async fn stream(cmd: StreamCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        StreamCommand::Status => {
            let active = session.get_streaming_status().await;
            println!("{}", if active { "live" } else { "offline" });
        }
        StreamCommand::Start => session.start_streaming().await,
        StreamCommand::Stop => session.stop_streaming().await,
    }
    Ok(())
}

async fn virtualcam(cmd: VirtualcamCommand, session: &ObsSession) -> Result<(), CliError> {
    match cmd {
        VirtualcamCommand::Start => session.start_virtual_cam().await,
        VirtualcamCommand::Stop => session.stop_virtual_cam().await,
    }
    Ok(())
}

/// Print relayed events until Ctrl-C.
async fn events(session: &ObsSession) -> Result<(), CliError> {
    let mut events = session.events();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

fn print_event(event: &RemoteEvent) {
    println!("{}  {}", event.event_id(), event.payload());
}
