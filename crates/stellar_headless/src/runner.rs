//! Loading, generating and saving games from the command line.

use std::path::{Path, PathBuf};

use stellar_core::error::GameError;
use stellar_core::game::Game;
use stellar_core::generator::TurnGenerator;
use stellar_core::rules::Rules;
use thiserror::Error;
use tracing::{debug, info};

use crate::report::{RunReport, TurnReport};

/// Error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The game or rules could not be parsed, validated or generated.
    #[error(transparent)]
    Game(#[from] GameError),
    /// The report could not be encoded.
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    /// `--turns 0`.
    #[error("Nothing to generate: turn count must be at least 1")]
    NoTurns,
}

/// Arguments of a `generate` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Saved game to load.
    pub game: PathBuf,
    /// Years to generate.
    pub turns: u32,
    /// Where to save. Defaults to overwriting `game`.
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Generate one year in place.
    pub fn new(game: impl Into<PathBuf>) -> Self {
        Self {
            game: game.into(),
            turns: 1,
            output: None,
        }
    }

    /// Set the number of years.
    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }

    /// Save somewhere other than the input file.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.game)
    }
}

/// Drives the turn generator over saved games.
#[derive(Debug, Default)]
pub struct HeadlessRunner {
    generator: TurnGenerator,
}

impl HeadlessRunner {
    /// A runner with the default collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a RON game file.
    pub fn load_game(path: &Path) -> Result<Game, RunnerError> {
        if !path.exists() {
            return Err(RunnerError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let game = Game::from_ron(&contents)?;
        debug!(path = %path.display(), year = game.year, "Loaded game");
        Ok(game)
    }

    /// Save a game as RON.
    pub fn save_game(game: &Game, path: &Path) -> Result<(), RunnerError> {
        std::fs::write(path, game.to_ron()?)?;
        debug!(path = %path.display(), year = game.year, "Saved game");
        Ok(())
    }

    /// Load, generate and save. Nothing is written if any year fails.
    pub fn run(&mut self, config: &RunConfig) -> Result<RunReport, RunnerError> {
        if config.turns == 0 {
            return Err(RunnerError::NoTurns);
        }
        let mut game = Self::load_game(&config.game)?;
        let start_year = game.year;

        let summaries = self.generator.generate_turns(&mut game, config.turns)?;
        let output = config.output_path();
        Self::save_game(&game, output)?;

        info!(
            from = start_year,
            to = game.year,
            output = %output.display(),
            "Generated {} year(s)",
            summaries.len()
        );
        Ok(RunReport {
            start_year,
            final_year: game.year,
            output: output.display().to_string(),
            turns: summaries
                .iter()
                .map(|s| TurnReport::from_summary(s, &game))
                .collect(),
        })
    }

    /// Load a rules file and check it can drive turn generation.
    pub fn validate_rules(path: &Path) -> Result<Rules, RunnerError> {
        if !path.exists() {
            return Err(RunnerError::FileNotFound(path.display().to_string()));
        }
        let rules = Rules::load(path)?;
        info!(path = %path.display(), seed = rules.seed, "Rules are valid");
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_core::message::MessageKind;
    use stellar_test_utils::fixtures::two_empire_game;
    use tempfile::TempDir;

    fn saved_game(dir: &TempDir, seed: u64) -> PathBuf {
        let path = dir.path().join("galaxy.ron");
        HeadlessRunner::save_game(&two_empire_game(seed), &path).unwrap();
        path
    }

    #[test]
    fn test_generate_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = saved_game(&dir, 6);
        let output = dir.path().join("next.ron");
        let config = RunConfig::new(&input).with_turns(3).with_output(&output);

        let report = HeadlessRunner::new().run(&config).unwrap();

        assert_eq!(report.turns.len(), 3);
        assert_eq!(report.final_year, report.start_year + 3);
        let saved = HeadlessRunner::load_game(&output).unwrap();
        assert_eq!(saved.year, report.final_year);
        assert_eq!(saved.state_hash(), report.turns[2].state_hash);
        // Input untouched.
        assert_eq!(HeadlessRunner::load_game(&input).unwrap().year, report.start_year);
    }

    #[test]
    fn test_generate_in_place() {
        let dir = TempDir::new().unwrap();
        let input = saved_game(&dir, 6);

        let report = HeadlessRunner::new().run(&RunConfig::new(&input)).unwrap();

        assert_eq!(HeadlessRunner::load_game(&input).unwrap().year, report.final_year);
        assert!(report.turns[0].count(MessageKind::ItemBuilt) > 0);
    }

    #[test]
    fn test_missing_game_file() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(dir.path().join("nope.ron"));
        let err = HeadlessRunner::new().run(&config).unwrap_err();
        assert!(matches!(err, RunnerError::FileNotFound(_)));
    }

    #[test]
    fn test_zero_turns_rejected() {
        let dir = TempDir::new().unwrap();
        let input = saved_game(&dir, 1);
        let err = HeadlessRunner::new()
            .run(&RunConfig::new(&input).with_turns(0))
            .unwrap_err();
        assert!(matches!(err, RunnerError::NoTurns));
    }

    #[test]
    fn test_corrupt_game_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(year: ").unwrap();
        let err = HeadlessRunner::load_game(&path).unwrap_err();
        assert!(matches!(err, RunnerError::Game(GameError::DataParseError { .. })));
    }

    #[test]
    fn test_validate_default_rules() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.ron");
        let text = ron::ser::to_string_pretty(&Rules::with_seed(9), ron::ser::PrettyConfig::default()).unwrap();
        std::fs::write(&path, text).unwrap();

        let rules = HeadlessRunner::validate_rules(&path).unwrap();
        assert_eq!(rules.seed, 9);
    }

    #[test]
    fn test_validate_rejects_short_cost_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.ron");
        let mut rules = Rules::default();
        rules.research.base_costs.truncate(3);
        let text = ron::ser::to_string_pretty(&rules, ron::ser::PrettyConfig::default()).unwrap();
        std::fs::write(&path, text).unwrap();

        let err = HeadlessRunner::validate_rules(&path).unwrap_err();
        assert!(matches!(err, RunnerError::Game(GameError::InvalidState(_))));
    }
}
