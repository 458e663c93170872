use clap::{Parser, Subcommand};
use spectator_core::{
    config::SpectatorConfig,
    types::{DayNumber, LobbyId},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spectator", version, about = "Headless spectator for a creature survival lobby")]
pub struct Cli {
    /// JSON configuration file. Flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Server origin, e.g. http://127.0.0.1:8000
    #[arg(long)]
    pub base_url: Option<String>,

    /// Lobby to watch
    #[arg(long)]
    pub lobby: Option<LobbyId>,

    /// Name used by the join command
    #[arg(long)]
    pub name: Option<String>,

    /// Read JSON commands from stdin, one per line
    #[arg(long)]
    pub commands: bool,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Follow the lobby and play each day as it is simulated (default)
    Watch,
    /// Fetch one day and print its scene at evenly spaced points
    DumpDay {
        #[arg(long)]
        day: DayNumber,
        #[arg(long, default_value_t = 10)]
        samples: u32,
    },
}

impl Cli {
    /// File values first, then flags on top.
    pub fn resolve_config(&self) -> anyhow::Result<SpectatorConfig> {
        let mut config = match &self.config {
            Some(path) => SpectatorConfig::load(path)?,
            None => SpectatorConfig::default(),
        };
        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(lobby) = self.lobby {
            config.server.lobby_id = lobby;
        }
        if let Some(name) = &self.name {
            config.player_name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
