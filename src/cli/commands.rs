use std::path::Path;

use anyhow::{anyhow, Result};
use tokio::{io::BufReader, sync::mpsc};
use tracing::{error, info};

use crate::{
    daemon::{
        commands::forward_commands, load_engine, sink::HeadlessSink, start_daemon, Presentation,
    },
    engine::{
        aggregate::CollapsedGroupSet, settings::SettingsUpdate, ClearOutcome, Confirm, Engine,
        FixedAnswer, PurgeOutcome,
    },
    storage::{documents::GroupConfig, json_store::JsonStore, Store},
    utils::clock::{Clock, DefaultClock},
};

use super::{
    output::{Renderer, TerminalSink},
    process::TrackerPause,
    prompt::TerminalPrompt,
};

const COMMAND_BUFFER: usize = 16;

fn gate(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(TerminalPrompt::terminal())
    }
}

/// Runs `operation` while no tracker is writing. Background trackers are restarted afterwards.
async fn with_paused_tracker<T>(
    operation: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    let pause = TrackerPause::pause()?;
    let result = operation.await;
    if pause.was_running() {
        println!("Restarting the background tracker");
    }
    pause
        .resume()
        .inspect_err(|e| error!("Failed to restart the tracker {e:?}"))?;
    result
}

async fn open(dir: &Path) -> Result<(JsonStore, Engine)> {
    let store = JsonStore::new(dir.to_path_buf())?;
    let engine = load_engine(&store, &DefaultClock).await?;
    Ok((store, engine))
}

pub async fn serve(dir: &Path) -> Result<()> {
    start_daemon(
        dir.to_path_buf(),
        Presentation {
            sink: Box::new(HeadlessSink),
            inputs: None,
            collapsed: CollapsedGroupSet::default(),
        },
    )
    .await
}

/// Tracks in the foreground with a live view. Commands are read from stdin.
pub async fn watch(dir: &Path, collapsed: Vec<String>) -> Result<()> {
    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
    tokio::spawn(async move {
        if let Err(e) = forward_commands(BufReader::new(tokio::io::stdin()), sender).await {
            error!("Failed to read commands {e:?}");
        }
    });

    with_paused_tracker(
        start_daemon(
            dir.to_path_buf(),
            Presentation {
                sink: Box::new(TerminalSink::new()),
                inputs: Some(receiver),
                collapsed: CollapsedGroupSet::new(collapsed),
            },
        ),
    )
    .await
}

pub async fn summary(dir: &Path, json: bool, collapsed: Vec<String>) -> Result<()> {
    let (_, engine) = open(dir).await?;
    let view = engine.view(&CollapsedGroupSet::new(collapsed), DefaultClock.time());
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", Renderer::for_stdout().render(&view));
    }
    Ok(())
}

pub(super) async fn purge_stored(
    store: &impl Store,
    mut engine: Engine,
    threshold: Option<u64>,
    gate: &mut dyn Confirm,
) -> Result<PurgeOutcome> {
    let threshold = threshold.unwrap_or(engine.settings().purge_threshold) as f64;
    let preview = engine.purge_preview(threshold);
    println!(
        "{} of {} entries are below {threshold}s",
        preview.candidates,
        engine.ledger().window_times.len()
    );

    let outcome = engine.purge(threshold, gate);
    if let PurgeOutcome::Purged { .. } = outcome {
        store.save(engine.ledger(), engine.settings()).await?;
    }
    Ok(outcome)
}

pub async fn purge(dir: &Path, threshold: Option<u64>, yes: bool) -> Result<()> {
    let outcome = with_paused_tracker(async {
        let (store, engine) = open(dir).await?;
        purge_stored(&store, engine, threshold, gate(yes).as_mut()).await
    })
    .await?;

    match outcome {
        PurgeOutcome::NothingToPurge => println!("Nothing to purge"),
        PurgeOutcome::Declined { .. } => println!("Purge cancelled"),
        PurgeOutcome::Purged { removed } => println!("Purged {removed} entries"),
    }
    Ok(())
}

pub(super) async fn clear_stored(
    store: &impl Store,
    mut engine: Engine,
    gate: &mut dyn Confirm,
) -> Result<ClearOutcome> {
    let outcome = engine.clear(gate, DefaultClock.time());
    if outcome == ClearOutcome::Cleared {
        store.save(engine.ledger(), engine.settings()).await?;
    }
    Ok(outcome)
}

pub async fn clear(dir: &Path, yes: bool) -> Result<()> {
    let outcome = with_paused_tracker(async {
        let (store, engine) = open(dir).await?;
        clear_stored(&store, engine, gate(yes).as_mut()).await
    })
    .await?;

    match outcome {
        ClearOutcome::Declined => println!("Clear cancelled"),
        ClearOutcome::Cleared => println!("Cleared all tracked data"),
    }
    Ok(())
}

pub(super) async fn update_stored(
    store: &impl Store,
    mut engine: Engine,
    update: &SettingsUpdate,
) -> Result<Engine> {
    engine
        .update_settings(update)
        .map_err(|e| anyhow!("{e}, nothing was changed"))?;
    store.save(engine.ledger(), engine.settings()).await?;
    Ok(engine)
}

fn print_settings(engine: &Engine) {
    let settings = engine.settings();
    println!("afk-timeout       {}s", settings.afk_timeout);
    println!("save-interval     {}s", settings.save_interval);
    println!("min-display-time  {}s", settings.min_display_time);
    println!("top-per-group     {}", settings.top_per_group);
    println!("purge-threshold   {}s", settings.purge_threshold);
    println!("title-truncate    {}", settings.title_truncate);
    println!("tracking since    {}", engine.ledger().reset_date);
}

pub async fn settings(dir: &Path, update: SettingsUpdate) -> Result<()> {
    let engine = if update.is_empty() {
        open(dir).await?.1
    } else {
        let engine = with_paused_tracker(async {
            let (store, engine) = open(dir).await?;
            update_stored(&store, engine, &update).await
        })
        .await?;
        info!("Saved settings {:?}", engine.settings());
        engine
    };
    print_settings(&engine);
    Ok(())
}

pub async fn groups(dir: &Path, init: bool) -> Result<()> {
    let store = JsonStore::new(dir.to_path_buf())?;
    if init {
        if store.groups_path().exists() {
            return Err(anyhow!(
                "{} already exists, remove it first to start over",
                store.groups_path().display()
            ));
        }
        store.save_groups(&GroupConfig::default()).await?;
        println!("Wrote {}", store.groups_path().display());
    }

    let config = store.load_groups().await;
    for rule in config.groups.rules() {
        println!("{}: {}", rule.name, rule.suffixes.join(", "));
    }
    println!("Never AFK: {}", config.afk_exempt.join(", "));
    println!("Versioned apps: {}", config.versioned_apps.join(", "));
    Ok(())
}

pub fn path(dir: &Path) -> Result<()> {
    let store = JsonStore::new(dir.to_path_buf())?;
    println!("{}", store.dir().display());
    println!("{}", store.data_path().display());
    println!("{}", store.settings_path().display());
    println!("{}", store.groups_path().display());
    Ok(())
}
