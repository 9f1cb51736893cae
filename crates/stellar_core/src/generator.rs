//! Turn orchestration.
//!
//! [`TurnGenerator::generate`] advances a [`Game`] by one year. The step
//! order is fixed; every step sees the deletions of the steps before it
//! already purged, and specs are recomputed after the steps that change
//! what they derive from.
//!
//! # Example
//!
//! ```
//! use stellar_core::prelude::*;
//!
//! let mut game = Game::new(Rules::with_seed(7));
//! game.add_player("Ann", Race::default());
//!
//! let mut generator = TurnGenerator::new();
//! let summary = generator.generate(&mut game).unwrap();
//! assert_eq!(summary.year, game.year);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::collaborators::{BattleRecord, Collaborators};
use crate::context::TurnContext;
use crate::error::Result;
use crate::game::Game;
use crate::ids::PlayerId;
use crate::message::Message;
use crate::step::{Step, StepContext};
use crate::steps::{
    BattleStep, BombStep, FleetMoveStep, FleetRepairStep, MineFieldDecayStep, MineFieldDetonateStep,
    MineLayingStep, MineSweepStep, PacketMoveStep, PlanetGrowthStep, PlanetMineStep, ProductionStep,
    ResearchStep, SalvageDecayStep, ScanStep, ScoreStep, VictoryCheckStep, WaypointPass, WaypointStep,
};

/// What happened during one generated year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// The new game year.
    pub year: u32,
    /// [`Game::state_hash`] after the turn.
    pub state_hash: u64,
    /// Every player's inbox for the year.
    pub messages: BTreeMap<PlayerId, Vec<Message>>,
    /// Battles fought.
    pub battles: Vec<BattleRecord>,
    /// Players declared winners this year.
    pub winners: Vec<PlayerId>,
}

impl TurnSummary {
    /// Total messages across all players.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}

/// The steps of one year, in execution order.
#[must_use]
pub fn standard_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(WaypointStep::new(WaypointPass::BeforeMovement)),
        Box::new(PacketMoveStep::new(0)),
        Box::new(FleetMoveStep::new()),
        Box::new(SalvageDecayStep::new()),
        Box::new(MineFieldDetonateStep::new()),
        Box::new(PlanetMineStep::new()),
        Box::new(ProductionStep::new()),
        Box::new(ResearchStep::new()),
        Box::new(PlanetGrowthStep::new()),
        Box::new(PacketMoveStep::new(1)),
        Box::new(BattleStep::new()),
        Box::new(BombStep::new()),
        Box::new(WaypointStep::new(WaypointPass::AfterMovement)),
        Box::new(MineFieldDecayStep::new()),
        Box::new(MineLayingStep::new()),
        Box::new(MineSweepStep::new()),
        Box::new(FleetRepairStep::new()),
        Box::new(ScanStep::new()),
        Box::new(ScoreStep::new()),
        Box::new(VictoryCheckStep::new()),
    ]
}

/// Runs the yearly step sequence against a game.
#[derive(Debug, Default)]
pub struct TurnGenerator {
    collaborators: Collaborators,
}

impl TurnGenerator {
    /// A generator using the default collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator using custom collaborators.
    #[must_use]
    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// The collaborators, for hosts that inspect or replace them between turns.
    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collaborators
    }

    /// Generate one year.
    ///
    /// # Errors
    ///
    /// Returns an error if the game's rules are invalid. The game is left
    /// untouched in that case.
    pub fn generate(&mut self, game: &mut Game) -> Result<TurnSummary> {
        game.rules.validate()?;
        let span = info_span!("turn", year = game.year);
        let _guard = span.enter();

        for player in game.players.values_mut() {
            player.messages.clear();
        }
        let victors_before: BTreeSet<PlayerId> = game
            .players
            .values()
            .filter(|p| p.victor)
            .map(|p| p.id)
            .collect();

        game.rebuild_position_index();
        game.recompute_specs();
        let owned_planets = game.owned_planets();
        let mut turn = TurnContext::new();

        for mut step in standard_steps() {
            let name = step.name();
            {
                let mut ctx = StepContext::new(game, &mut turn, &mut self.collaborators);
                step.execute(&mut ctx, &owned_planets);
            }
            let purged = game.purge(&mut turn.pending_deletions);
            if step.recompute_specs_after() {
                game.recompute_specs();
            }
            debug!(step = name, purged, "Step complete");
        }

        game.year += 1;
        let summary = TurnSummary {
            year: game.year,
            state_hash: game.state_hash(),
            messages: game
                .players
                .values()
                .map(|p| (p.id, p.messages.clone()))
                .collect(),
            battles: turn.battles,
            winners: game
                .players
                .values()
                .filter(|p| p.victor && !victors_before.contains(&p.id))
                .map(|p| p.id)
                .collect(),
        };
        info!(
            year = summary.year,
            state_hash = summary.state_hash,
            messages = summary.message_count(),
            battles = summary.battles.len(),
            "Turn generated"
        );
        Ok(summary)
    }

    /// Generate `turns` consecutive years.
    ///
    /// # Errors
    ///
    /// Stops at the first year that fails to generate.
    pub fn generate_turns(&mut self, game: &mut Game, turns: u32) -> Result<Vec<TurnSummary>> {
        (0..turns).map(|_| self.generate(game)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Engine, ShipDesign};
    use crate::fleet::{Fleet, ShipToken, WaypointTask};
    use crate::ids::MapObjectRef;
    use crate::math::Vec2Fixed;
    use crate::message::MessageKind;
    use crate::planet::{Hab, Planet};
    use crate::player::Race;
    use crate::rules::Rules;

    fn small_game(seed: u64) -> Game {
        let mut game = Game::new(Rules::with_seed(seed));
        let ann = game.add_player("Ann", Race::default());
        game.add_player("Bob", Race::default());
        let mut home = Planet::new("Home", Vec2Fixed::from_ints(100, 100), Hab::new(50, 50, 50));
        home.owner = Some(ann);
        home.population = 100_000;
        home.mines = 10;
        home.factories = 10;
        game.add_planet(home);
        game.add_planet(Planet::new("Far", Vec2Fixed::from_ints(160, 100), Hab::new(40, 60, 50)));
        game
    }

    #[test]
    fn test_year_advances_and_inboxes_reset() {
        let mut game = small_game(1);
        let start = game.year;
        let mut generator = TurnGenerator::new();

        let first = generator.generate(&mut game).unwrap();
        let second = generator.generate(&mut game).unwrap();

        assert_eq!(first.year, start + 1);
        assert_eq!(second.year, start + 2);
        let ann = game.players.values().next().unwrap();
        assert_eq!(ann.score_history.len(), 2);
        assert_eq!(ann.messages, second.messages[&ann.id]);
    }

    #[test]
    fn test_same_seed_same_universe() {
        let mut a = small_game(9);
        let mut b = small_game(9);

        let ha = TurnGenerator::new().generate_turns(&mut a, 5).unwrap();
        let hb = TurnGenerator::new().generate_turns(&mut b, 5).unwrap();

        assert_eq!(ha, hb);
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_invalid_rules_leave_game_untouched() {
        let mut game = small_game(1);
        game.rules.research.base_costs.clear();
        let before = game.state_hash();

        assert!(TurnGenerator::new().generate(&mut game).is_err());
        assert_eq!(game.state_hash(), before);
    }

    #[test]
    fn test_colony_ship_settles_after_flight() {
        let mut game = small_game(3);
        let ann = game.planets.values().find_map(|p| p.owner).unwrap();
        let far = game.planets.values().find(|p| p.owner.is_none()).unwrap().id;
        let colony = game.add_design(ShipDesign {
            owner: ann,
            name: "Colony Ship".to_string(),
            mass: 60,
            armor: 10,
            fuel_capacity: 200,
            cargo_capacity: 25,
            engine: Some(Engine::long_hump()),
            num_engines: 1,
            colonizer: true,
            ..ShipDesign::default()
        });
        let mut fleet = Fleet::new(ann, "Settlers", Vec2Fixed::from_ints(100, 100), vec![ShipToken::new(colony, 1)]);
        fleet.cargo.colonists = 25;
        let fleet = game.add_fleet(fleet);
        game.fleets.get_mut(fleet).unwrap().refuel();
        game.add_waypoint(
            fleet,
            Some(MapObjectRef::Planet(far)),
            Vec2Fixed::from_ints(160, 100),
            6,
            WaypointTask::Colonize,
        )
        .unwrap();

        let mut generator = TurnGenerator::new();
        let summaries = generator.generate_turns(&mut game, 3).unwrap();

        let far = game.planets.get(far).unwrap();
        assert_eq!(far.owner, Some(ann));
        assert!(!game.fleets.contains(fleet));
        let colonized = summaries
            .iter()
            .flat_map(|s| s.messages[&ann].iter())
            .filter(|m| m.kind == MessageKind::PlanetColonized)
            .count();
        assert_eq!(colonized, 1);
    }
}
