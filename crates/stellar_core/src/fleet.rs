//! Fleets, their waypoints and their derived statistics.
//!
//! Starbases are fleets too: a fleet with a single starbase token, bound to
//! the planet it orbits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cargo::{Cargo, CargoType, Cost};
use crate::design::{Bomb, Engine, ShipDesign};
use crate::game::Storage;
use crate::ids::{DesignId, FleetId, MapObjectRef, PlanetId, PlayerId, WaypointId};
use crate::math::Vec2Fixed;
use crate::mine_field::MineFieldType;

/// A stack of identical ships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipToken {
    /// Design of every ship in the stack.
    pub design: DesignId,
    /// Number of ships.
    pub quantity: i64,
    /// Armor damage carried by the stack, spread over its ships.
    pub damage: i64,
}

impl ShipToken {
    /// An undamaged stack.
    #[must_use]
    pub const fn new(design: DesignId, quantity: i64) -> Self {
        Self {
            design,
            quantity,
            damage: 0,
        }
    }

    /// Add damage. Every full `armor` of damage destroys one ship.
    /// Returns the number of ships destroyed.
    pub fn apply_damage(&mut self, damage: i64, armor: i64) -> i64 {
        if damage <= 0 || self.quantity <= 0 {
            return 0;
        }
        self.damage += damage;
        if armor <= 0 {
            let destroyed = self.quantity;
            self.quantity = 0;
            self.damage = 0;
            return destroyed;
        }
        let destroyed = (self.damage / armor).min(self.quantity);
        self.quantity -= destroyed;
        self.damage -= destroyed * armor;
        if self.quantity == 0 {
            self.damage = 0;
        }
        destroyed
    }
}

/// Transport sub-task actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransportAction {
    /// Do nothing with this cargo type.
    #[default]
    None,
    /// Load as much as fits.
    LoadAll,
    /// Load up to an amount.
    LoadAmount,
    /// Fuel only: keep just what the remaining trip needs.
    LoadOptimal,
    /// Fill to a percentage of the hold.
    FillPercent,
    /// Fill to a percentage of the hold and wait until reached.
    WaitForPercent,
    /// Bring the fleet's amount to an absolute level and wait until reached.
    SetAmountTo,
    /// Unload everything.
    UnloadAll,
    /// Unload up to an amount.
    UnloadAmount,
    /// Bring the waypoint's amount to an absolute level and wait until reached.
    SetWaypointTo,
    /// Fill remaining space after every other task.
    LoadDunnage,
}

/// One cargo type's transport order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransportTask {
    /// What to do.
    pub action: TransportAction,
    /// Amount or percentage, depending on the action.
    pub amount: i64,
}

impl TransportTask {
    /// Create a transport task.
    #[must_use]
    pub const fn new(action: TransportAction, amount: i64) -> Self {
        Self { action, amount }
    }
}

/// Transport orders per cargo type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportTasks {
    /// Ironium.
    pub ironium: TransportTask,
    /// Boranium.
    pub boranium: TransportTask,
    /// Germanium.
    pub germanium: TransportTask,
    /// Colonists.
    pub colonists: TransportTask,
    /// Fuel.
    pub fuel: TransportTask,
}

impl TransportTasks {
    /// The order for one cargo type.
    #[must_use]
    pub const fn get(&self, cargo_type: CargoType) -> TransportTask {
        match cargo_type {
            CargoType::Ironium => self.ironium,
            CargoType::Boranium => self.boranium,
            CargoType::Germanium => self.germanium,
            CargoType::Colonists => self.colonists,
            CargoType::Fuel => self.fuel,
        }
    }

    /// Replace the order for one cargo type.
    pub fn set(&mut self, cargo_type: CargoType, task: TransportTask) {
        match cargo_type {
            CargoType::Ironium => self.ironium = task,
            CargoType::Boranium => self.boranium = task,
            CargoType::Germanium => self.germanium = task,
            CargoType::Colonists => self.colonists = task,
            CargoType::Fuel => self.fuel = task,
        }
    }

    /// Builder-style single order.
    #[must_use]
    pub fn with(mut self, cargo_type: CargoType, action: TransportAction, amount: i64) -> Self {
        self.set(cargo_type, TransportTask::new(action, amount));
        self
    }
}

/// What a fleet does at a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WaypointTask {
    /// Nothing.
    #[default]
    None,
    /// Load and unload cargo.
    Transport(TransportTasks),
    /// Colonize the target planet.
    Colonize,
    /// Scrap the fleet.
    ScrapFleet,
    /// Mine the orbited planet.
    RemoteMining,
    /// Lay mines for `duration` years, or forever.
    LayMineField {
        /// Field type to lay.
        field_type: MineFieldType,
        /// Years left, `None` for no limit.
        duration: Option<u32>,
    },
    /// Merge into the target fleet.
    MergeWithFleet,
    /// Intercept enemy fleets within range.
    Patrol {
        /// Interception range in ly.
        range: i64,
        /// Interception warp, zero for the current warp.
        warp: u8,
    },
    /// Let the target planet send the fleet on.
    Route,
    /// Give the fleet to another player.
    TransferFleet {
        /// Receiving player.
        to_player: PlayerId,
    },
}

impl WaypointTask {
    /// Tasks that keep a fleet busy while it sits still.
    #[must_use]
    pub const fn is_continuous(&self) -> bool {
        matches!(
            self,
            Self::LayMineField { .. } | Self::RemoteMining | Self::Patrol { .. }
        )
    }
}

/// A stop in a fleet's flight plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Waypoint {
    /// Identifier, unique for the game.
    pub id: WaypointId,
    /// Object at the stop; `None` for open space.
    pub target: Option<MapObjectRef>,
    /// Where the stop is.
    pub position: Vec2Fixed,
    /// Requested travel speed to this stop.
    pub warp: u8,
    /// Task at this stop.
    pub task: WaypointTask,
    /// Do not leave until the transport orders are satisfied.
    pub wait_at_waypoint: bool,
    /// Target before it went missing.
    pub original_target: Option<MapObjectRef>,
    /// Position before the target went missing.
    pub original_position: Option<Vec2Fixed>,
    /// The fleet left this stop and is still travelling to the next.
    #[serde(default)]
    pub partially_complete: bool,
}

impl Waypoint {
    /// A waypoint; ids are assigned by [`Game::new_waypoint`](crate::game::Game::new_waypoint).
    #[must_use]
    pub fn new(
        id: WaypointId,
        position: Vec2Fixed,
        target: Option<MapObjectRef>,
        warp: u8,
        task: WaypointTask,
    ) -> Self {
        Self {
            id,
            target,
            position,
            warp,
            task,
            wait_at_waypoint: false,
            original_target: None,
            original_position: None,
            partially_complete: false,
        }
    }

    /// The target planet, if the target is a planet.
    #[must_use]
    pub fn target_planet(&self) -> Option<PlanetId> {
        self.target.and_then(MapObjectRef::as_planet)
    }

    /// The target fleet, if the target is a fleet.
    #[must_use]
    pub fn target_fleet(&self) -> Option<FleetId> {
        self.target.and_then(MapObjectRef::as_fleet)
    }

    /// The target as originally ordered, ignoring any deep-space fallback.
    #[must_use]
    pub fn restored(&self) -> Self {
        let mut restored = self.clone();
        if let Some(target) = self.original_target {
            restored.target = Some(target);
        }
        if let Some(position) = self.original_position {
            restored.position = position;
        }
        restored.original_target = None;
        restored.original_position = None;
        restored.wait_at_waypoint = false;
        restored.partially_complete = false;
        restored
    }
}

/// Derived fleet statistics, recomputed by [`compute_fleet_spec`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FleetSpec {
    /// Empty mass in kT.
    pub mass: i64,
    /// Armor of all ships.
    pub armor: i64,
    /// Cargo hold in kT.
    pub cargo_capacity: i64,
    /// Fuel tank in mg.
    pub fuel_capacity: i64,
    /// Worst engine across the fleet; `None` if any ship cannot move.
    pub engine: Option<Engine>,
    /// Engines across the fleet.
    pub num_engines: i64,
    /// Some ship carries a colonization module.
    pub colonizer: bool,
    /// Some ship carries an orbital construction module.
    pub orbital_construction: bool,
    /// Remote mining rate.
    pub mining_rate: i64,
    /// Mines laid per year by field type.
    pub mine_lay_rates: BTreeMap<MineFieldType, i64>,
    /// Mines swept per year.
    pub mine_sweep: i64,
    /// Bombs and how many of each are carried.
    pub bombs: Vec<(Bomb, i64)>,
    /// Damage dealt per battle round.
    pub weapons_power: i64,
    /// Scanner range in ly.
    pub scan_range: i64,
    /// Penetrating scanner range in ly.
    pub pen_scan_range: i64,
    /// Build cost of all ships.
    pub cost: Cost,
    /// Ships in the fleet.
    pub total_ships: i64,
    /// Ships without weapons or bombs.
    pub unarmed_ships: i64,
    /// The fleet is a starbase.
    pub starbase: bool,
    /// Mass driver rating.
    pub mass_driver_warp: u8,
    /// Starbase dock.
    pub dock: bool,
}

impl FleetSpec {
    /// Whether the fleet can fight.
    #[must_use]
    pub fn armed(&self) -> bool {
        self.weapons_power > 0 || !self.bombs.is_empty()
    }
}

/// Compute derived statistics from a fleet's ship stacks.
///
/// Tokens whose design is missing are logged and contribute nothing.
#[must_use]
pub fn compute_fleet_spec(tokens: &[ShipToken], designs: &Storage<DesignId, ShipDesign>) -> FleetSpec {
    let mut spec = FleetSpec::default();
    let mut engine: Option<Engine> = None;
    let mut immobile = false;

    for token in tokens {
        let Some(design) = designs.get(token.design) else {
            tracing::error!(design = %token.design, "Fleet token references a missing design");
            continue;
        };
        let qty = token.quantity;

        spec.mass += design.mass * qty;
        spec.armor += design.armor * qty;
        spec.cargo_capacity += design.cargo_capacity * qty;
        spec.fuel_capacity += design.fuel_capacity * qty;
        spec.num_engines += design.num_engines * qty;
        spec.colonizer |= design.colonizer;
        spec.orbital_construction |= design.orbital_construction;
        spec.mining_rate += design.mining_rate * qty;
        for (field_type, rate) in &design.mine_lay_rates {
            *spec.mine_lay_rates.entry(*field_type).or_insert(0) += rate * qty;
        }
        spec.mine_sweep += design.mine_sweep * qty;
        for bomb in &design.bombs {
            spec.bombs.push((*bomb, qty));
        }
        spec.weapons_power += design.weapons_power * qty;
        spec.scan_range = spec.scan_range.max(design.scan_range);
        spec.pen_scan_range = spec.pen_scan_range.max(design.pen_scan_range);
        spec.cost += design.cost * qty;
        spec.total_ships += qty;
        if !design.is_armed() {
            spec.unarmed_ships += qty;
        }
        if design.is_starbase() {
            spec.starbase = true;
            spec.mass_driver_warp = spec.mass_driver_warp.max(design.mass_driver_warp);
            spec.dock |= design.dock;
        }

        match (&design.engine, engine) {
            (Some(e), None) => engine = Some(*e),
            (Some(e), Some(current)) => engine = Some(current.worst(e)),
            (None, _) => immobile = true,
        }
    }

    spec.engine = if immobile { None } else { engine };
    spec
}

/// A fleet of ships, or a starbase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fleet {
    /// Identifier, assigned on insertion.
    pub id: FleetId,
    /// Fleet name.
    pub name: String,
    /// Owning player.
    pub owner: PlayerId,
    /// Position.
    pub position: Vec2Fixed,
    /// Fuel in mg.
    pub fuel: i64,
    /// Cargo hold contents.
    pub cargo: Cargo,
    /// Ship stacks.
    pub tokens: Vec<ShipToken>,
    /// Flight plan. Waypoint 0 is the current position.
    pub waypoints: Vec<Waypoint>,
    /// Re-append waypoints as they are reached.
    pub repeat_orders: bool,
    /// Years spent idle since the last order.
    pub idle_turns: u32,
    /// Planet being orbited.
    pub orbiting: Option<PlanetId>,
    /// Planet this starbase belongs to.
    pub starbase_of: Option<PlanetId>,
    /// Battle plan index; all plans fight the same way.
    pub battle_plan: u32,
    /// Years since the fleet was built.
    pub age: u32,
    /// Derived statistics.
    pub spec: FleetSpec,
}

impl Fleet {
    /// A fleet with no waypoints; see [`Game::add_fleet`](crate::game::Game::add_fleet).
    #[must_use]
    pub fn new(owner: PlayerId, name: impl Into<String>, position: Vec2Fixed, tokens: Vec<ShipToken>) -> Self {
        Self {
            id: FleetId::default(),
            name: name.into(),
            owner,
            position,
            fuel: 0,
            cargo: Cargo::ZERO,
            tokens,
            waypoints: Vec::new(),
            repeat_orders: false,
            idle_turns: 0,
            orbiting: None,
            starbase_of: None,
            battle_plan: 0,
            age: 0,
            spec: FleetSpec::default(),
        }
    }

    /// Whether this fleet is a starbase.
    #[must_use]
    pub fn is_starbase(&self) -> bool {
        self.starbase_of.is_some()
    }

    /// Mass including cargo.
    #[must_use]
    pub fn total_mass(&self) -> i64 {
        self.spec.mass + self.cargo.total()
    }

    /// Free hold space in kT.
    #[must_use]
    pub fn free_cargo(&self) -> i64 {
        (self.spec.cargo_capacity - self.cargo.total()).max(0)
    }

    /// Free tank space in mg.
    #[must_use]
    pub fn free_fuel(&self) -> i64 {
        (self.spec.fuel_capacity - self.fuel).max(0)
    }

    /// Amount held of a cargo type, fuel included.
    #[must_use]
    pub fn amount(&self, cargo_type: CargoType) -> i64 {
        match cargo_type {
            CargoType::Fuel => self.fuel,
            other => self.cargo.get(other),
        }
    }

    /// Space left for a cargo type.
    #[must_use]
    pub fn space_for(&self, cargo_type: CargoType) -> i64 {
        match cargo_type {
            CargoType::Fuel => self.free_fuel(),
            _ => self.free_cargo(),
        }
    }

    /// Add (or remove, with a negative amount) a cargo type, fuel included.
    pub fn transfer(&mut self, cargo_type: CargoType, amount: i64) {
        match cargo_type {
            CargoType::Fuel => self.fuel += amount,
            other => self.cargo.add(other, amount),
        }
    }

    /// Fill the tank.
    pub fn refuel(&mut self) {
        self.fuel = self.fuel.max(self.spec.fuel_capacity);
    }

    /// Merge stacks of the same design and drop empty ones.
    pub fn consolidate_tokens(&mut self) {
        let mut merged: Vec<ShipToken> = Vec::with_capacity(self.tokens.len());
        for token in self.tokens.drain(..) {
            if token.quantity <= 0 {
                continue;
            }
            match merged.iter_mut().find(|t| t.design == token.design) {
                Some(existing) => {
                    existing.quantity += token.quantity;
                    existing.damage += token.damage;
                }
                None => merged.push(token),
            }
        }
        self.tokens = merged;
    }

    /// The current waypoint.
    #[must_use]
    pub fn current_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    /// Fuel needed to fly the remaining waypoints at their warps.
    #[must_use]
    pub fn fuel_for_route(&self) -> i64 {
        let Some(engine) = self.spec.engine else {
            return 0;
        };
        let mass = self.total_mass();
        let mut from = self.position;
        let mut total = 0;
        for waypoint in self.waypoints.iter().skip(1) {
            total += engine.fuel_cost(mass, from.distance(waypoint.position), waypoint.warp);
            from = waypoint.position;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::ShipDesign;
    use crate::ids::EntityKey;

    fn designs() -> Storage<DesignId, ShipDesign> {
        let mut designs = Storage::new();
        designs.insert_with(|id| ShipDesign {
            id,
            name: "Freighter".to_string(),
            cost: Cost::new(10, 0, 5, 20),
            mass: 50,
            armor: 20,
            fuel_capacity: 300,
            cargo_capacity: 100,
            engine: Some(Engine::long_hump()),
            num_engines: 1,
            ..ShipDesign::default()
        });
        designs.insert_with(|id| ShipDesign {
            id,
            name: "Destroyer".to_string(),
            mass: 80,
            armor: 200,
            fuel_capacity: 250,
            engine: Some(Engine::ram_scoop()),
            num_engines: 1,
            weapons_power: 30,
            ..ShipDesign::default()
        });
        designs
    }

    #[test]
    fn test_compute_fleet_spec_sums_stacks() {
        let designs = designs();
        let tokens = vec![
            ShipToken::new(DesignId::from_index(1), 2),
            ShipToken::new(DesignId::from_index(2), 1),
        ];
        let spec = compute_fleet_spec(&tokens, &designs);
        assert_eq!(spec.mass, 180);
        assert_eq!(spec.cargo_capacity, 200);
        assert_eq!(spec.fuel_capacity, 850);
        assert_eq!(spec.cost, Cost::new(20, 0, 10, 40));
        assert_eq!(spec.total_ships, 3);
        assert_eq!(spec.unarmed_ships, 2);
        assert!(spec.armed());
        let engine = spec.engine.unwrap();
        assert_eq!(engine.free_speed(), 1);
    }

    #[test]
    fn test_missing_design_contributes_nothing() {
        let designs = designs();
        let tokens = vec![ShipToken::new(DesignId::from_index(99), 4)];
        let spec = compute_fleet_spec(&tokens, &designs);
        assert_eq!(spec.total_ships, 0);
        assert!(spec.engine.is_none());
    }

    #[test]
    fn test_token_damage_destroys_whole_ships() {
        let mut token = ShipToken::new(DesignId(1), 3);
        assert_eq!(token.apply_damage(50, 20), 2);
        assert_eq!(token.quantity, 1);
        assert_eq!(token.damage, 10);
        assert_eq!(token.apply_damage(100, 20), 1);
        assert_eq!(token.quantity, 0);
    }

    #[test]
    fn test_restored_waypoint_uses_original_target() {
        let mut wp = Waypoint::new(
            WaypointId(5),
            Vec2Fixed::from_ints(10, 10),
            None,
            5,
            WaypointTask::None,
        );
        wp.original_target = Some(MapObjectRef::Fleet(FleetId(3)));
        wp.original_position = Some(Vec2Fixed::from_ints(1, 2));
        let restored = wp.restored();
        assert_eq!(restored.target, Some(MapObjectRef::Fleet(FleetId(3))));
        assert_eq!(restored.position, Vec2Fixed::from_ints(1, 2));
        assert!(restored.original_target.is_none());
    }

    #[test]
    fn test_consolidate_tokens() {
        let mut fleet = Fleet::new(
            PlayerId(0),
            "A",
            Vec2Fixed::ZERO,
            vec![
                ShipToken::new(DesignId(1), 2),
                ShipToken::new(DesignId(2), 0),
                ShipToken::new(DesignId(1), 3),
            ],
        );
        fleet.consolidate_tokens();
        assert_eq!(fleet.tokens, vec![ShipToken::new(DesignId(1), 5)]);
    }
}
