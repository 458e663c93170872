//! spectator: headless spectator for a creature survival lobby.
//!
//! Usage:
//!   spectator --base-url http://127.0.0.1:8000 --lobby 3
//!   spectator --lobby 3 --commands            (JSON commands on stdin)
//!   spectator --lobby 3 dump-day --day 2 --samples 8
//!
//! EVENT LOOP (one thread, cooperative):
//!   - poll timer   → spawn a snapshot fetch, unless one is in flight
//!   - frame timer  → draw the armed playback tick
//!   - inbound      → snapshot, payload and command results from spawned tasks
//!   - stdin        → user commands
//! Fetches never run on the render path.

mod cli;
mod console;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Mode};
use console::ConsoleSurface;
use spectator_core::{
    api::LobbyClient,
    cache::{CacheLookup, PayloadCache},
    clock::local_now_ms,
    command::LobbyCommand,
    config::SpectatorConfig,
    error::SpectatorResult,
    event::SpectatorEvent,
    payload::DayPayload,
    playback::compose_scene,
    poller::{PayloadRequest, SnapshotPoller},
    render::{base_markers, RenderSurface},
    snapshot::StateResponse,
    types::{DayNumber, Millis},
};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};

/// Results handed back to the loop by spawned tasks.
enum Inbound {
    Snapshot {
        epoch:       u64,
        received_at: Millis,
        result:      SpectatorResult<StateResponse>,
    },
    Payload {
        request: PayloadRequest,
        result:  SpectatorResult<Option<DayPayload>>,
    },
    Command {
        command: LobbyCommand,
        result:  SpectatorResult<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let client = LobbyClient::new(&config.server)?;

    log::info!(
        "Spectating lobby {} at {}",
        config.server.lobby_id,
        config.server.base_url
    );

    match cli.mode.unwrap_or(Mode::Watch) {
        Mode::Watch => watch(&config, client, cli.commands).await,
        Mode::DumpDay { day, samples } => dump_day(&client, day, samples).await,
    }
}

async fn watch(config: &SpectatorConfig, client: LobbyClient, read_commands: bool) -> Result<()> {
    if let Err(e) = client.prime_session().await {
        log::warn!("Could not prime session: {e}");
    }

    let mut surface = ConsoleSurface::new();
    let mut poller = SnapshotPoller::new(local_now_ms());
    let (tx, mut rx) = mpsc::unbounded_channel::<Inbound>();

    let mut poll_timer = interval(millis(config.timing.poll_interval_ms));
    poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame_timer = interval(millis(config.timing.frame_interval_ms));
    frame_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = read_commands;
    let mut poll_in_flight = false;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll_timer.tick() => {
                if poll_in_flight {
                    log::debug!("Previous poll still in flight; skipping");
                    continue;
                }
                poll_in_flight = true;
                let epoch = poller.epoch();
                let client = client.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = client.fetch_state().await;
                    let _ = tx.send(Inbound::Snapshot { epoch, received_at: local_now_ms(), result });
                });
            }

            _ = frame_timer.tick() => {
                poller.render_frame(local_now_ms(), &mut surface);
            }

            Some(inbound) = rx.recv() => match inbound {
                Inbound::Snapshot { epoch, received_at, result } => {
                    poll_in_flight = false;
                    match result {
                        Ok(response) => {
                            let outcome = poller.on_snapshot_from(epoch, response, received_at, &mut surface);
                            log_events(&outcome.events);
                            if let Some(request) = outcome.fetch {
                                spawn_payload_fetch(&client, &tx, request);
                            }
                        }
                        Err(e) => poller.on_poll_failed(&e),
                    }
                }
                Inbound::Payload { request, result } => {
                    log_events(&poller.on_payload(request, result));
                }
                Inbound::Command { command, result } => {
                    match result {
                        Ok(message) => {
                            surface.notice(&message);
                            if command == LobbyCommand::Start {
                                log_events(&poller.reset_for_new_match());
                            }
                        }
                        Err(e) if e.is_protocol() => surface.notice(&e.to_string()),
                        Err(e) => {
                            log::warn!("Command {command:?} failed: {e}");
                            surface.notice("Request failed; check the connection.");
                        }
                    }
                    poll_timer.reset_immediately();
                }
            },

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match LobbyCommand::parse_line(&line) {
                    None => {}
                    Some(Err(e)) => surface.notice(&format!("Unrecognised command: {e}")),
                    Some(Ok(LobbyCommand::Quit)) => break,
                    Some(Ok(LobbyCommand::Buy { .. })) if !poller.can_purchase() => {
                        surface.notice("Upgrades can only be bought during the pause.");
                    }
                    Some(Ok(command)) => spawn_command(&client, &tx, command, &config.player_name),
                },
                Ok(None) => {
                    log::debug!("stdin closed; commands disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    log::warn!("Cannot read stdin: {e}");
                    stdin_open = false;
                }
            },

            _ = &mut shutdown => {
                log::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn millis(ms: Millis) -> Duration {
    Duration::from_millis(ms.max(1) as u64)
}

fn spawn_payload_fetch(client: &LobbyClient, tx: &mpsc::UnboundedSender<Inbound>, request: PayloadRequest) {
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = client.fetch_day_payload(request.day).await;
        let _ = tx.send(Inbound::Payload { request, result });
    });
}

fn spawn_command(client: &LobbyClient, tx: &mpsc::UnboundedSender<Inbound>, command: LobbyCommand, player_name: &str) {
    let client = client.clone();
    let tx = tx.clone();
    let player_name = player_name.to_string();
    tokio::spawn(async move {
        let result = run_command(&client, &command, player_name).await;
        let _ = tx.send(Inbound::Command { command, result });
    });
}

async fn run_command(client: &LobbyClient, command: &LobbyCommand, player_name: String) -> SpectatorResult<String> {
    match command {
        LobbyCommand::Join { name } => {
            let name = name.clone().unwrap_or(player_name);
            let receipt = client.join(&name).await?;
            Ok(match receipt.slot {
                Some(slot) => format!("Joined as {name} in slot {slot}"),
                None => format!("Joined as {name}"),
            })
        }
        LobbyCommand::Start => {
            client.start().await?;
            Ok("Match started".to_string())
        }
        LobbyCommand::Buy { kind } => client.buy(*kind).await,
        LobbyCommand::Quit => Ok(String::new()),
    }
}

fn log_events(events: &[SpectatorEvent]) {
    for event in events {
        match event {
            SpectatorEvent::SnapshotApplied { .. } => log::debug!("{}: {event:?}", event.name()),
            _ => log::info!("{}: {event:?}", event.name()),
        }
    }
}

/// Fetch one day through the cache and print its scene at `samples + 1`
/// evenly spaced points.
async fn dump_day(client: &LobbyClient, day: DayNumber, samples: u32) -> Result<()> {
    let mut cache = PayloadCache::new();
    let index = match cache.get(day, |d| client.fetch_day_payload(d)).await? {
        CacheLookup::Ready(Some(index)) => index,
        CacheLookup::Ready(None) => {
            println!("Day {day}: no payload");
            return Ok(());
        }
        CacheLookup::InFlight | CacheLookup::Miss => {
            println!("Day {day}: payload is still being fetched");
            return Ok(());
        }
    };

    println!(
        "Day {day}: {} frames over {} ms (frame_ms {:?})",
        index.frame_count(),
        index.duration_ms,
        index.frame_ms
    );
    if let Some(summary) = &index.summary {
        println!(
            "  births {} deaths {} finished {} winner {:?}",
            summary.births, summary.deaths, summary.finished, summary.winner_slot
        );
        for player in &summary.players {
            println!("  slot {} {:<16} coins {:>4} alive {:>3}", player.slot, player.name, player.coins, player.alive);
        }
    }
    if !index.is_playable() {
        println!("Day {day} has no frames to play");
        return Ok(());
    }

    let bases = match client.fetch_state().await {
        Ok(state) => base_markers(&state.slots),
        Err(e) => {
            log::warn!("Could not load bases: {e}");
            Vec::new()
        }
    };

    let mut surface = ConsoleSurface::unthrottled();
    let steps = samples.max(1);
    for k in 0..=steps {
        let progress = k as f64 / steps as f64;
        if let Some(scene) = compose_scene(&index, progress, &bases) {
            surface.draw_day(&scene);
        }
    }
    Ok(())
}
