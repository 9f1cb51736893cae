//! Planets, their production queues and their derived statistics.

use serde::{Deserialize, Serialize};

use crate::cargo::{Cargo, Cost, Mineral};
use crate::design::ShipDesign;
use crate::ids::{DesignId, FleetId, MapObjectRef, PlanetId, PlayerId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::player::Player;
use crate::rules::Rules;

/// Habitability axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HabAxis {
    /// Gravity.
    Gravity,
    /// Temperature.
    Temperature,
    /// Radiation.
    Radiation,
}

impl HabAxis {
    /// All axes in canonical order.
    pub const ALL: [Self; 3] = [Self::Gravity, Self::Temperature, Self::Radiation];
}

/// Environment values on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hab {
    /// Gravity.
    pub gravity: i32,
    /// Temperature.
    pub temperature: i32,
    /// Radiation.
    pub radiation: i32,
}

impl Hab {
    /// Create a habitability vector.
    #[must_use]
    pub const fn new(gravity: i32, temperature: i32, radiation: i32) -> Self {
        Self {
            gravity,
            temperature,
            radiation,
        }
    }

    /// Value on one axis.
    #[must_use]
    pub const fn get(&self, axis: HabAxis) -> i32 {
        match axis {
            HabAxis::Gravity => self.gravity,
            HabAxis::Temperature => self.temperature,
            HabAxis::Radiation => self.radiation,
        }
    }

    /// Set one axis, clamped to 0..=100.
    pub fn set(&mut self, axis: HabAxis, value: i32) {
        let value = value.clamp(0, 100);
        match axis {
            HabAxis::Gravity => self.gravity = value,
            HabAxis::Temperature => self.temperature = value,
            HabAxis::Radiation => self.radiation = value,
        }
    }
}

/// Mineral concentration per mineral, 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MineralConcentration {
    /// Ironium.
    pub ironium: i64,
    /// Boranium.
    pub boranium: i64,
    /// Germanium.
    pub germanium: i64,
}

impl MineralConcentration {
    /// Create a concentration vector.
    #[must_use]
    pub const fn new(ironium: i64, boranium: i64, germanium: i64) -> Self {
        Self {
            ironium,
            boranium,
            germanium,
        }
    }

    /// Concentration of one mineral.
    #[must_use]
    pub const fn get(&self, mineral: Mineral) -> i64 {
        match mineral {
            Mineral::Ironium => self.ironium,
            Mineral::Boranium => self.boranium,
            Mineral::Germanium => self.germanium,
        }
    }

    fn get_mut(&mut self, mineral: Mineral) -> &mut i64 {
        match mineral {
            Mineral::Ironium => &mut self.ironium,
            Mineral::Boranium => &mut self.boranium,
            Mineral::Germanium => &mut self.germanium,
        }
    }
}

impl Default for MineralConcentration {
    fn default() -> Self {
        Self::new(50, 50, 50)
    }
}

/// Kinds of production queue entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionItemKind {
    /// Mines.
    Mine,
    /// Factories.
    Factory,
    /// Planetary defenses.
    Defense,
    /// Turn resources into one kT of each mineral.
    MineralAlchemy,
    /// Improve the environment by one step.
    Terraform,
    /// Build mines up to the operable maximum every year.
    AutoMines,
    /// Build factories up to the operable maximum every year.
    AutoFactories,
    /// Build defenses up to the maximum every year.
    AutoDefenses,
    /// Spend leftover resources on alchemy every year.
    AutoMineralAlchemy,
    /// Terraform whenever possible.
    AutoTerraform,
    /// A packet of all three minerals.
    MixedPacket,
    /// An ironium packet.
    IroniumPacket,
    /// A boranium packet.
    BoraniumPacket,
    /// A germanium packet.
    GermaniumPacket,
    /// Ships of a design.
    ShipToken,
    /// A starbase, replacing any existing one.
    Starbase,
}

impl ProductionItemKind {
    /// Auto items stay in the queue forever.
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(
            self,
            Self::AutoMines
                | Self::AutoFactories
                | Self::AutoDefenses
                | Self::AutoMineralAlchemy
                | Self::AutoTerraform
        )
    }

    /// Alchemy items turn resources into one kT of each mineral per unit.
    #[must_use]
    pub const fn is_alchemy(self) -> bool {
        matches!(self, Self::MineralAlchemy | Self::AutoMineralAlchemy)
    }

    /// Packet items need a mass driver and a target.
    #[must_use]
    pub const fn is_packet(self) -> bool {
        matches!(
            self,
            Self::MixedPacket | Self::IroniumPacket | Self::BoraniumPacket | Self::GermaniumPacket
        )
    }

    /// Whether the item needs a design.
    #[must_use]
    pub const fn needs_design(self) -> bool {
        matches!(self, Self::ShipToken | Self::Starbase)
    }
}

/// One production queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionQueueItem {
    /// What to build.
    pub kind: ProductionItemKind,
    /// How many to build.
    pub quantity: i64,
    /// Design for ship and starbase items.
    pub design: Option<DesignId>,
    /// Funds already committed toward the next unit.
    pub allocated: Cost,
}

impl ProductionQueueItem {
    /// An item that needs no design.
    #[must_use]
    pub fn new(kind: ProductionItemKind, quantity: i64) -> Self {
        Self {
            kind,
            quantity,
            design: None,
            allocated: Cost::ZERO,
        }
    }

    /// A ship or starbase item.
    #[must_use]
    pub fn with_design(kind: ProductionItemKind, quantity: i64, design: DesignId) -> Self {
        Self {
            design: Some(design),
            ..Self::new(kind, quantity)
        }
    }
}

/// Ordered production queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProductionQueue {
    /// Items, front first.
    pub items: Vec<ProductionQueueItem>,
}

impl ProductionQueue {
    /// A queue holding the given items.
    #[must_use]
    pub fn from_items(items: Vec<ProductionQueueItem>) -> Self {
        Self { items }
    }

    /// Append an item.
    pub fn push(&mut self, item: ProductionQueueItem) {
        self.items.push(item);
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Derived planet statistics, recomputed by [`compute_planet_spec`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlanetSpec {
    /// Habitability for the owner's race, in percent.
    pub habitability: i64,
    /// Population capacity.
    pub max_population: i64,
    /// Mines that can ever be built.
    pub max_mines: i64,
    /// Factories that can ever be built.
    pub max_factories: i64,
    /// Defenses that can ever be built.
    pub max_defenses: i64,
    /// Mines the current population can operate.
    pub max_operable_mines: i64,
    /// Factories the current population can operate.
    pub max_operable_factories: i64,
    /// Resources produced per year.
    pub resources_per_year: i64,
    /// Minerals mined per year.
    pub mining_output: Cargo,
    /// Share of bombs and packets stopped by defenses, 0..=1.
    #[serde(with = "fixed_serde")]
    pub defense_coverage: Fixed,
    /// Mass driver rating of the starbase, zero without one.
    pub mass_driver_warp: u8,
    /// The starbase can refuel and repair.
    pub has_dock: bool,
    /// Scanner range in ly.
    pub scan_range: i64,
    /// Penetrating scanner range in ly.
    pub pen_scan_range: i64,
}

/// A planet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Planet {
    /// Identifier, assigned on insertion.
    pub id: PlanetId,
    /// Planet name.
    pub name: String,
    /// Position.
    pub position: Vec2Fixed,
    /// Owning player.
    pub owner: Option<PlayerId>,
    /// Name of the race living here.
    pub race_name: Option<String>,
    /// Starting planet of its owner.
    pub homeworld: bool,
    /// Population in colonists.
    pub population: i64,
    /// Mines.
    pub mines: i64,
    /// Factories.
    pub factories: i64,
    /// Planetary defenses.
    pub defenses: i64,
    /// Mineral concentration.
    pub concentration: MineralConcentration,
    /// kT mined toward the next concentration loss, per mineral.
    pub mining_progress: Cargo,
    /// Surface minerals (colonists unused; population is separate).
    pub cargo: Cargo,
    /// Current environment.
    pub hab: Hab,
    /// Environment before any terraforming.
    pub original_hab: Hab,
    /// Orbiting starbase.
    pub starbase: Option<FleetId>,
    /// Production queue.
    pub production_queue: ProductionQueue,
    /// Packet destination.
    pub packet_target: Option<PlanetId>,
    /// Packet launch speed; zero means the mass driver rating.
    pub packet_speed: u8,
    /// Where fleets ordered to route here are sent on to.
    pub route_target: Option<MapObjectRef>,
    /// Fleet that newly built ships join.
    pub reinforce_fleet: Option<FleetId>,
    /// Resources added next year, from ultimate recycling.
    pub bonus_resources: i64,
    /// Derived statistics.
    pub spec: PlanetSpec,
}

impl Planet {
    /// An unowned planet.
    #[must_use]
    pub fn new(name: impl Into<String>, position: Vec2Fixed, hab: Hab) -> Self {
        Self {
            id: PlanetId::default(),
            name: name.into(),
            position,
            owner: None,
            race_name: None,
            homeworld: false,
            population: 0,
            mines: 0,
            factories: 0,
            defenses: 0,
            concentration: MineralConcentration::default(),
            mining_progress: Cargo::ZERO,
            cargo: Cargo::ZERO,
            hab,
            original_hab: hab,
            starbase: None,
            production_queue: ProductionQueue::default(),
            packet_target: None,
            packet_speed: 0,
            route_target: None,
            reinforce_fleet: None,
            bonus_resources: 0,
            spec: PlanetSpec::default(),
        }
    }

    /// Whether `player` owns this planet.
    #[must_use]
    pub fn owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Population expressed as cargo kT.
    #[must_use]
    pub const fn colonist_kt(&self) -> i64 {
        self.population / 100
    }

    /// Add mined minerals and lower concentration for every
    /// `depletion_kt` mined.
    pub fn apply_mining(&mut self, mined: Cargo, depletion_kt: i64) {
        self.cargo += mined.without_colonists();
        if depletion_kt <= 0 {
            return;
        }
        for mineral in Mineral::ALL {
            let progress = self.mining_progress.mineral(mineral) + mined.mineral(mineral);
            let drops = progress / depletion_kt;
            self.mining_progress
                .add(mineral.cargo_type(), mined.mineral(mineral) - drops * depletion_kt);
            let concentration = self.concentration.get_mut(mineral);
            *concentration = (*concentration - drops).max(1);
        }
    }

    /// Remove the owner after the population died out.
    pub fn depopulate(&mut self) {
        self.owner = None;
        self.race_name = None;
        self.population = 0;
        self.production_queue.clear();
        self.reinforce_fleet = None;
        self.route_target = None;
        self.packet_target = None;
    }
}

/// Share of incoming damage stopped by `defenses`: `1 - 0.99^defenses`.
#[must_use]
pub fn defense_coverage(defenses: i64) -> Fixed {
    let factor = Fixed::from_num(99) / Fixed::from_num(100);
    let mut remaining = Fixed::ONE;
    for _ in 0..defenses.clamp(0, 1000) {
        remaining *= factor;
    }
    Fixed::ONE - remaining
}

/// Compute derived statistics for a planet.
///
/// `owner` is the owning player, `starbase` the design of the orbiting
/// starbase. Unowned planets get zero capacities.
#[must_use]
pub fn compute_planet_spec(
    planet: &Planet,
    owner: Option<&Player>,
    starbase: Option<&ShipDesign>,
    rules: &Rules,
) -> PlanetSpec {
    let mut spec = PlanetSpec {
        defense_coverage: defense_coverage(planet.defenses),
        max_defenses: rules.production.max_defenses,
        scan_range: rules.scanning.planet_scan_range,
        pen_scan_range: rules.scanning.planet_pen_scan_range,
        ..PlanetSpec::default()
    };

    if let Some(design) = starbase {
        spec.mass_driver_warp = design.mass_driver_warp;
        spec.has_dock = design.dock;
        spec.scan_range = spec.scan_range.max(design.scan_range);
        spec.pen_scan_range = spec.pen_scan_range.max(design.pen_scan_range);
    }

    let Some(player) = owner else {
        return spec;
    };
    let race = &player.race;

    spec.habitability = race.habitability(&planet.hab, rules.growth.min_habitability);
    spec.max_population = if spec.habitability > 0 {
        rules.growth.max_population * spec.habitability / 100
    } else {
        0
    };

    // Capacity uses the larger of current and maximum population so that an
    // overcrowded planet can still operate what it has.
    let capacity_pop = spec.max_population.max(planet.population);
    spec.max_mines = capacity_pop * race.num_mines / 10_000;
    spec.max_factories = capacity_pop * race.num_factories / 10_000;
    spec.max_operable_mines = planet.population * race.num_mines / 10_000;
    spec.max_operable_factories = planet.population * race.num_factories / 10_000;

    let operable_factories = planet.factories.min(spec.max_operable_factories);
    let pop_resources = if race.colonists_per_resource > 0 {
        planet.population / race.colonists_per_resource
    } else {
        0
    };
    spec.resources_per_year = pop_resources + operable_factories * race.factory_output / 10;

    let operable_mines = planet.mines.min(spec.max_operable_mines);
    let mut output = Cargo::ZERO;
    for mineral in Mineral::ALL {
        output.add(
            mineral.cargo_type(),
            operable_mines * planet.concentration.get(mineral) * race.mine_output / 1000,
        );
    }
    spec.mining_output = output;

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PlayerId;
    use crate::player::Race;

    fn owned_planet(population: i64) -> (Planet, Player) {
        let player = Player::new(PlayerId(0), "Ann", Race::default());
        let mut planet = Planet::new("Home", Vec2Fixed::ZERO, Hab::new(50, 50, 50));
        planet.owner = Some(PlayerId(0));
        planet.population = population;
        (planet, player)
    }

    #[test]
    fn test_unowned_planet_spec_is_empty() {
        let planet = Planet::new("Rock", Vec2Fixed::ZERO, Hab::new(50, 50, 50));
        let spec = compute_planet_spec(&planet, None, None, &Rules::default());
        assert_eq!(spec.max_population, 0);
        assert_eq!(spec.resources_per_year, 0);
    }

    #[test]
    fn test_planet_spec_capacities() {
        let (mut planet, player) = owned_planet(100_000);
        planet.mines = 200;
        planet.factories = 50;
        let spec = compute_planet_spec(&planet, Some(&player), None, &Rules::default());

        assert_eq!(spec.habitability, 100);
        assert_eq!(spec.max_population, 1_000_000);
        assert_eq!(spec.max_mines, 1000);
        assert_eq!(spec.max_operable_mines, 100);
        // 100 resources from colonists, 50 factories * 10 / 10.
        assert_eq!(spec.resources_per_year, 150);
        // 100 operable mines * 50% * 10 / 1000.
        assert_eq!(spec.mining_output, Cargo::minerals(50, 50, 50));
    }

    #[test]
    fn test_starbase_sets_mass_driver_and_dock() {
        let (planet, player) = owned_planet(10_000);
        let design = ShipDesign {
            mass_driver_warp: 7,
            dock: true,
            ..ShipDesign::default()
        };
        let spec = compute_planet_spec(&planet, Some(&player), Some(&design), &Rules::default());
        assert_eq!(spec.mass_driver_warp, 7);
        assert!(spec.has_dock);
    }

    #[test]
    fn test_defense_coverage() {
        assert_eq!(defense_coverage(0), Fixed::ZERO);
        let hundred = defense_coverage(100);
        // 1 - 0.99^100 is about 0.634.
        assert!(hundred > Fixed::from_num(0.63) && hundred < Fixed::from_num(0.64));
    }

    #[test]
    fn test_apply_mining_depletes_concentration() {
        let (mut planet, _) = owned_planet(0);
        planet.apply_mining(Cargo::minerals(250, 50, 0), 100);
        assert_eq!(planet.cargo, Cargo::minerals(250, 50, 0));
        assert_eq!(planet.concentration.ironium, 48);
        assert_eq!(planet.mining_progress.ironium, 50);
        assert_eq!(planet.concentration.boranium, 50);

        planet.apply_mining(Cargo::minerals(0, 50, 0), 100);
        assert_eq!(planet.concentration.boranium, 49);
        assert_eq!(planet.mining_progress.boranium, 0);
    }
}
