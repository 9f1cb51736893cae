//! Test fixtures and helpers.
//!
//! Pre-built designs, races and small galaxies for consistent testing.

use std::collections::BTreeMap;

use fixed::types::I32F32;
use stellar_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// A map position from integer light-years.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// The default race under a readable name.
#[must_use]
pub fn humanoid_race() -> Race {
    Race {
        name: "Humanoid".to_string(),
        ..Race::default()
    }
}

/// An unarmed scout with a normal scanner.
#[must_use]
pub fn scout_design(owner: PlayerId) -> ShipDesign {
    ShipDesign {
        owner,
        name: "Scout".to_string(),
        purpose: DesignPurpose::Scout,
        cost: Cost::new(4, 2, 4, 10),
        mass: 20,
        armor: 20,
        fuel_capacity: 250,
        engine: Some(Engine::long_hump()),
        num_engines: 1,
        scan_range: 75,
        ..ShipDesign::default()
    }
}

/// A medium freighter.
#[must_use]
pub fn freighter_design(owner: PlayerId) -> ShipDesign {
    ShipDesign {
        owner,
        name: "Freighter".to_string(),
        purpose: DesignPurpose::Freighter,
        cost: Cost::new(18, 0, 6, 30),
        mass: 50,
        armor: 20,
        fuel_capacity: 500,
        cargo_capacity: 200,
        engine: Some(Engine::long_hump()),
        num_engines: 1,
        ..ShipDesign::default()
    }
}

/// A colony ship with room for 2,500 colonists.
#[must_use]
pub fn colony_ship_design(owner: PlayerId) -> ShipDesign {
    ShipDesign {
        owner,
        name: "Colony Ship".to_string(),
        purpose: DesignPurpose::Colonizer,
        cost: Cost::new(12, 10, 12, 20),
        mass: 60,
        armor: 10,
        fuel_capacity: 200,
        cargo_capacity: 25,
        engine: Some(Engine::long_hump()),
        num_engines: 1,
        colonizer: true,
        ..ShipDesign::default()
    }
}

/// A gunship.
#[must_use]
pub fn destroyer_design(owner: PlayerId) -> ShipDesign {
    ShipDesign {
        owner,
        name: "Destroyer".to_string(),
        cost: Cost::new(15, 3, 5, 35),
        mass: 80,
        armor: 100,
        fuel_capacity: 280,
        engine: Some(Engine::long_hump()),
        num_engines: 1,
        weapons_power: 60,
        ..ShipDesign::default()
    }
}

/// A bomber carrying two light bombs.
#[must_use]
pub fn bomber_design(owner: PlayerId) -> ShipDesign {
    let bomb = Bomb {
        kill_rate: 6,
        min_kill: 300,
        structure_kill: 2,
    };
    ShipDesign {
        owner,
        name: "Bomber".to_string(),
        purpose: DesignPurpose::Bomber,
        cost: Cost::new(20, 5, 10, 40),
        mass: 90,
        armor: 50,
        fuel_capacity: 300,
        engine: Some(Engine::long_hump()),
        num_engines: 1,
        bombs: vec![bomb, bomb],
        ..ShipDesign::default()
    }
}

/// A ram-scoop mine layer for standard fields.
#[must_use]
pub fn mine_layer_design(owner: PlayerId) -> ShipDesign {
    ShipDesign {
        owner,
        name: "Mine Layer".to_string(),
        cost: Cost::new(20, 10, 20, 40),
        mass: 70,
        armor: 40,
        fuel_capacity: 400,
        engine: Some(Engine::ram_scoop()),
        num_engines: 1,
        mine_lay_rates: BTreeMap::from([(MineFieldType::Standard, 80)]),
        ..ShipDesign::default()
    }
}

/// An orbital station with a dock, a warp 6 mass driver and scanners.
#[must_use]
pub fn starbase_design(owner: PlayerId) -> ShipDesign {
    ShipDesign {
        owner,
        name: "Space Station".to_string(),
        hull: HullKind::Starbase,
        cost: Cost::new(120, 80, 250, 600),
        mass: 500,
        armor: 500,
        weapons_power: 40,
        scan_range: 100,
        pen_scan_range: 50,
        mass_driver_warp: 6,
        dock: true,
        ..ShipDesign::default()
    }
}

/// Incrementally assembles a [`Game`] for tests and benchmarks.
///
/// # Example
///
/// ```
/// use stellar_test_utils::fixtures::{pos, GameBuilder};
///
/// let mut builder = GameBuilder::new(7);
/// let ann = builder.player("Ann");
/// let home = builder.homeworld(ann, pos(100, 100));
/// let game = builder.build();
/// assert_eq!(game.planets.get(home).unwrap().owner, Some(ann));
/// ```
#[derive(Debug)]
pub struct GameBuilder {
    game: Game,
}

impl GameBuilder {
    /// An empty galaxy with seeded rules.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            game: Game::new(Rules::with_seed(seed)),
        }
    }

    /// Start from custom rules.
    #[must_use]
    pub fn with_rules(rules: Rules) -> Self {
        Self {
            game: Game::new(rules),
        }
    }

    /// Direct access to the game under construction.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Add a player of the default race.
    pub fn player(&mut self, name: &str) -> PlayerId {
        self.game.add_player(name, humanoid_race())
    }

    /// Add an unowned planet.
    pub fn planet(&mut self, name: &str, position: Vec2Fixed, hab: Hab) -> PlanetId {
        self.game.add_planet(Planet::new(name, position, hab))
    }

    /// Add a developed homeworld for `owner` with a starting economy and a
    /// queue of auto mines and factories.
    pub fn homeworld(&mut self, owner: PlayerId, position: Vec2Fixed) -> PlanetId {
        let name = format!("Home {}", owner.0);
        let mut planet = Planet::new(name, position, Hab::new(50, 50, 50));
        planet.owner = Some(owner);
        planet.race_name = Some(humanoid_race().name);
        planet.homeworld = true;
        planet.population = 250_000;
        planet.mines = 50;
        planet.factories = 50;
        planet.defenses = 10;
        planet.cargo = Cargo::minerals(500, 300, 400);
        planet.production_queue = ProductionQueue::from_items(vec![
            ProductionQueueItem::new(ProductionItemKind::AutoFactories, 10),
            ProductionQueueItem::new(ProductionItemKind::AutoMines, 10),
        ]);
        self.game.add_planet(planet)
    }

    /// Register a design.
    pub fn design(&mut self, design: ShipDesign) -> DesignId {
        self.game.add_design(design)
    }

    /// Add a fueled fleet orbiting `planet`.
    ///
    /// # Panics
    ///
    /// Panics if `planet` does not exist.
    pub fn fleet_at(&mut self, owner: PlayerId, design: DesignId, count: i64, planet: PlanetId) -> FleetId {
        let position = self
            .game
            .planets
            .get(planet)
            .map(|p| p.position)
            .expect("fleet_at needs an existing planet");
        let mut fleet = Fleet::new(owner, "Fleet", position, vec![ShipToken::new(design, count)]);
        fleet.orbiting = Some(planet);
        let id = self.game.add_fleet(fleet);
        if let Some(f) = self.game.fleets.get_mut(id) {
            f.refuel();
        }
        id
    }

    /// Add a fueled fleet in deep space.
    pub fn fleet_in_space(&mut self, owner: PlayerId, design: DesignId, count: i64, position: Vec2Fixed) -> FleetId {
        let fleet = Fleet::new(owner, "Fleet", position, vec![ShipToken::new(design, count)]);
        let id = self.game.add_fleet(fleet);
        if let Some(f) = self.game.fleets.get_mut(id) {
            f.refuel();
        }
        id
    }

    /// Send `fleet` to `planet` at `warp` with a task.
    ///
    /// # Panics
    ///
    /// Panics if the fleet or planet does not exist.
    pub fn order(&mut self, fleet: FleetId, planet: PlanetId, warp: u8, task: WaypointTask) {
        let position = self.game.planets.get(planet).map(|p| p.position).unwrap_or_default();
        self.game
            .add_waypoint(fleet, Some(MapObjectRef::Planet(planet)), position, warp, task)
            .expect("order needs an existing fleet and planet");
    }

    /// Finish the game, with every spec computed.
    #[must_use]
    pub fn build(mut self) -> Game {
        self.game.recompute_specs();
        self.game.rebuild_position_index();
        self.game
    }
}

/// A four-planet galaxy with two empires, colony ships underway, a mine
/// layer and a warship heading for the neighbor's homeworld.
///
/// Exercises every step within a dozen years.
#[must_use]
pub fn two_empire_game(seed: u64) -> Game {
    let mut b = GameBuilder::new(seed);
    let ann = b.player("Ann");
    let bob = b.player("Bob");

    let ann_home = b.homeworld(ann, pos(100, 100));
    let bob_home = b.homeworld(bob, pos(400, 160));
    let green = b.planet("Green", pos(150, 130), Hab::new(45, 55, 50));
    let rock = b.planet("Rock", pos(330, 200), Hab::new(70, 30, 60));
    b.planet("Ice", pos(250, 40), Hab::new(5, 95, 20));

    for (owner, home, target) in [(ann, ann_home, green), (bob, bob_home, rock)] {
        let station = b.design(starbase_design(owner));
        if let Err(err) = b.game_mut().add_starbase(home, station) {
            panic!("homeworld starbase: {err}");
        }
        let colony = b.design(colony_ship_design(owner));
        let settlers = b.fleet_at(owner, colony, 1, home);
        if let Some(f) = b.game_mut().fleets.get_mut(settlers) {
            f.cargo.colonists = 25;
        }
        b.order(settlers, target, 6, WaypointTask::Colonize);

        let scout = b.design(scout_design(owner));
        let scouts = b.fleet_at(owner, scout, 1, home);
        b.order(scouts, if owner == ann { rock } else { green }, 7, WaypointTask::None);
    }

    let layer = b.design(mine_layer_design(ann));
    let layers = b.fleet_at(ann, layer, 1, ann_home);
    b.order(
        layers,
        green,
        5,
        WaypointTask::LayMineField {
            field_type: MineFieldType::Standard,
            duration: None,
        },
    );

    let destroyer = b.design(destroyer_design(bob));
    let raiders = b.fleet_at(bob, destroyer, 3, bob_home);
    b.order(raiders, green, 6, WaypointTask::None);

    b.build()
}
