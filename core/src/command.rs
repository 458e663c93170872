use serde::{Deserialize, Serialize};
use crate::api::UpgradeKind;

/// Commands a user may issue while watching, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum LobbyCommand {
    // ── Seat ──────────────────────────────────────
    /// Take a slot. Without a name the configured player name is used.
    Join {
        #[serde(default)]
        name: Option<String>,
    },

    // ── Match ─────────────────────────────────────
    Start,

    // ── Shop (pause only) ─────────────────────────
    Buy { kind: UpgradeKind },

    // ── Runner ────────────────────────────────────
    Quit,
}

impl LobbyCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Result<Self, serde_json::Error>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(serde_json::from_str(line))
    }

    /// Whether the command needs the server at all.
    pub fn is_remote(&self) -> bool {
        !matches!(self, LobbyCommand::Quit)
    }
}
