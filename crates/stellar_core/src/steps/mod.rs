//! The turn steps, one module per phase.
//!
//! Each step is a small struct implementing [`Step`](crate::step::Step).
//! The [`TurnGenerator`](crate::generator::TurnGenerator) owns them and runs
//! them in a fixed order.

mod battle;
mod bomb;
mod mines;
mod movement;
mod packets;
mod planets;
mod production;
mod repair;
mod research;
mod salvage;
mod scan;
mod score;
mod waypoint;

pub use battle::BattleStep;
pub use bomb::BombStep;
pub use mines::{MineFieldDecayStep, MineFieldDetonateStep, MineLayingStep, MineSweepStep};
pub use movement::FleetMoveStep;
pub use packets::{packet_damage, PacketMoveStep};
pub use planets::{growth_for, PlanetGrowthStep, PlanetMineStep};
pub use production::{allocate_partial_build, ProductionStep};
pub use repair::FleetRepairStep;
pub use research::{research_cost, ResearchStep};
pub use salvage::SalvageDecayStep;
pub use scan::ScanStep;
pub use score::{score_for, ScoreStep, VictoryCheckStep};
pub use waypoint::{plan_transfer, scrap_recovery, TransferLevels, TransferPlan, WaypointPass, WaypointStep};

#[cfg(test)]
pub(crate) mod test_support {
    //! Small universes for step tests.

    use crate::cargo::Cost;
    use crate::collaborators::Collaborators;
    use crate::context::TurnContext;
    use crate::design::{Engine, ShipDesign};
    use crate::fleet::{Fleet, ShipToken};
    use crate::game::Game;
    use crate::ids::{DesignId, FleetId, PlanetId, PlayerId};
    use crate::math::Vec2Fixed;
    use crate::planet::{Hab, Planet};
    use crate::player::Race;
    use crate::rules::Rules;
    use crate::step::{Step, StepContext};

    /// Two players, a freighter design and a home planet for player 0.
    pub struct TestUniverse {
        pub game: Game,
        pub turn: TurnContext,
        pub collaborators: Collaborators,
        pub ann: PlayerId,
        pub bob: PlayerId,
        pub freighter: DesignId,
        pub home: PlanetId,
    }

    impl TestUniverse {
        pub fn new() -> Self {
            let mut game = Game::new(Rules::with_seed(42));
            let ann = game.add_player("Ann", Race::default());
            let bob = game.add_player("Bob", Race::default());
            let freighter = game.add_design(ShipDesign {
                owner: ann,
                name: "Freighter".to_string(),
                cost: Cost::new(18, 0, 6, 30),
                mass: 50,
                armor: 20,
                fuel_capacity: 500,
                cargo_capacity: 200,
                engine: Some(Engine::long_hump()),
                num_engines: 1,
                ..ShipDesign::default()
            });
            let mut home = Planet::new("Home", Vec2Fixed::from_ints(100, 100), Hab::new(50, 50, 50));
            home.owner = Some(ann);
            home.race_name = Some("Humanoid".to_string());
            home.homeworld = true;
            home.population = 100_000;
            let home = game.add_planet(home);
            Self {
                game,
                turn: TurnContext::new(),
                collaborators: Collaborators::default(),
                ann,
                bob,
                freighter,
                home,
            }
        }

        /// A fleet of `count` ships of `design` orbiting `planet`.
        pub fn fleet_at_planet(&mut self, owner: PlayerId, design: DesignId, count: i64, planet: PlanetId) -> FleetId {
            let position = self.game.planets.get(planet).map(|p| p.position).unwrap();
            let mut fleet = Fleet::new(owner, "Fleet", position, vec![ShipToken::new(design, count)]);
            fleet.orbiting = Some(planet);
            let id = self.game.add_fleet(fleet);
            self.game.fleets.get_mut(id).unwrap().refuel();
            id
        }

        /// A fleet of `count` ships of `design` in open space.
        pub fn fleet_in_space(&mut self, owner: PlayerId, design: DesignId, count: i64, position: Vec2Fixed) -> FleetId {
            let fleet = Fleet::new(owner, "Fleet", position, vec![ShipToken::new(design, count)]);
            let id = self.game.add_fleet(fleet);
            self.game.fleets.get_mut(id).unwrap().refuel();
            id
        }

        /// Run one step's full lifecycle and purge.
        pub fn run(&mut self, step: &mut dyn Step) {
            let owned = self.game.owned_planets();
            let mut ctx = StepContext::new(&mut self.game, &mut self.turn, &mut self.collaborators);
            step.execute(&mut ctx, &owned);
            self.game.purge(&mut self.turn.pending_deletions);
            if step.recompute_specs_after() {
                self.game.recompute_specs();
            }
        }
    }
}
