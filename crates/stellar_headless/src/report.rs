//! JSON reports printed after a run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stellar_core::game::Game;
use stellar_core::generator::TurnSummary;
use stellar_core::ids::PlayerId;
use stellar_core::message::{Message, MessageKind};

/// One inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLine {
    /// Message type.
    pub kind: MessageKind,
    /// Text shown to the player.
    pub text: String,
    /// The object the message is about, as displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl From<&Message> for MessageLine {
    fn from(message: &Message) -> Self {
        Self {
            kind: message.kind,
            text: message.text.clone(),
            target: message.target.map(|t| t.to_string()),
        }
    }
}

/// What happened in one generated year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// The year after generation.
    pub year: u32,
    /// State hash after generation, for comparing hosts.
    pub state_hash: u64,
    /// Battles fought.
    pub battles: usize,
    /// Players declared winners this year, by name.
    pub winners: Vec<String>,
    /// Inbox per player name.
    pub messages: BTreeMap<String, Vec<MessageLine>>,
}

impl TurnReport {
    /// Build a report, naming players as they are in `game`.
    #[must_use]
    pub fn from_summary(summary: &TurnSummary, game: &Game) -> Self {
        let name = |id: PlayerId| {
            game.players
                .get(&id)
                .map_or_else(|| id.to_string(), |p| p.name.clone())
        };
        Self {
            year: summary.year,
            state_hash: summary.state_hash,
            battles: summary.battles.len(),
            winners: summary.winners.iter().copied().map(name).collect(),
            messages: summary
                .messages
                .iter()
                .map(|(id, inbox)| (name(*id), inbox.iter().map(MessageLine::from).collect()))
                .collect(),
        }
    }

    /// Messages of one kind across all players.
    #[must_use]
    pub fn count(&self, kind: MessageKind) -> usize {
        self.messages
            .values()
            .flatten()
            .filter(|m| m.kind == kind)
            .count()
    }
}

/// Summary of a whole `generate` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Year the game was loaded at.
    pub start_year: u32,
    /// Year the game was saved at.
    pub final_year: u32,
    /// Where the game was written.
    pub output: String,
    /// One entry per generated year.
    pub turns: Vec<TurnReport>,
}

impl RunReport {
    /// Pretty JSON for stdout.
    ///
    /// # Errors
    ///
    /// Fails only if a message cannot be encoded.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::generator::TurnGenerator;
    use stellar_test_utils::fixtures::two_empire_game;

    #[test]
    fn test_report_names_players() {
        let mut game = two_empire_game(4);
        let summary = TurnGenerator::new().generate(&mut game).unwrap();
        let report = TurnReport::from_summary(&summary, &game);

        assert_eq!(report.year, game.year);
        assert!(report.messages.contains_key("Ann"));
        assert!(report.messages.contains_key("Bob"));
        assert_eq!(
            report.messages.values().map(Vec::len).sum::<usize>(),
            summary.message_count()
        );
    }

    #[test]
    fn test_report_json_round_trip() {
        let mut game = two_empire_game(4);
        let summary = TurnGenerator::new().generate(&mut game).unwrap();
        let report = RunReport {
            start_year: game.year - 1,
            final_year: game.year,
            output: "galaxy.ron".to_string(),
            turns: vec![TurnReport::from_summary(&summary, &game)],
        };

        let json = report.to_json().unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
