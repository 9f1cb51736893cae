//! Ship and starbase designs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cargo::Cost;
use crate::ids::{DesignId, PlayerId};
use crate::math::Fixed;
use crate::mine_field::MineFieldType;
use crate::rules::MAX_WARP;

/// Hull category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HullKind {
    /// A ship that can travel.
    #[default]
    Ship,
    /// An immobile station bound to a planet.
    Starbase,
}

/// What the design was built for. Informational except for `StarterColony`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DesignPurpose {
    /// Unspecified.
    #[default]
    None,
    /// Scanner ship.
    Scout,
    /// Colony ship.
    Colonizer,
    /// Cargo hauler.
    Freighter,
    /// Fuel tanker.
    FuelFreighter,
    /// Planet bomber.
    Bomber,
    /// Warship.
    Fighter,
    /// Mine layer.
    MineLayer,
    /// Remote miner.
    Miner,
    /// Regular starbase.
    Starbase,
    /// Starbase installed by orbital construction colonizers.
    StarterColony,
}

/// Engine fuel model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Engine {
    /// Fuel usage per warp factor 0..=10, in mg per 100 kT per 100 ly.
    pub fuel_usage: [i64; 11],
    /// Regenerates fuel while travelling at or below the free speed.
    pub ram_scoop: bool,
}

impl Engine {
    /// The long hump engine most starting designs carry.
    #[must_use]
    pub const fn long_hump() -> Self {
        Self {
            fuel_usage: [0, 0, 20, 60, 100, 100, 105, 450, 750, 900, 1080],
            ram_scoop: false,
        }
    }

    /// A ram scoop engine that travels warp 6 for free.
    #[must_use]
    pub const fn ram_scoop() -> Self {
        Self {
            fuel_usage: [0, 0, 0, 0, 0, 0, 0, 165, 375, 600, 720],
            ram_scoop: true,
        }
    }

    /// Usage at a warp factor, with warps above 10 treated as 10.
    #[must_use]
    pub fn usage(&self, warp: u8) -> i64 {
        self.fuel_usage[usize::from(warp.min(MAX_WARP))]
    }

    /// Highest warp that burns no fuel.
    #[must_use]
    pub fn free_speed(&self) -> u8 {
        (1..=MAX_WARP)
            .take_while(|w| self.usage(*w) == 0)
            .last()
            .unwrap_or(0)
    }

    /// Fuel (mg) needed to move `mass_kt` over `distance` light-years at `warp`.
    ///
    /// `ceil(mass * distance * usage / 10000)`.
    #[must_use]
    pub fn fuel_cost(&self, mass_kt: i64, distance: Fixed, warp: u8) -> i64 {
        let usage = self.usage(warp);
        if usage == 0 || mass_kt <= 0 || distance <= Fixed::ZERO {
            return 0;
        }
        let numerator = Fixed::from_num(mass_kt.saturating_mul(usage)).saturating_mul(distance);
        let cost = numerator / Fixed::from_num(10_000);
        cost.ceil().to_num::<i64>()
    }

    /// Light-years `fuel` mg moves `mass_kt` at `warp`. `None` when travel is free.
    #[must_use]
    pub fn range(&self, mass_kt: i64, fuel: i64, warp: u8) -> Option<Fixed> {
        let usage = self.usage(warp);
        if usage == 0 || mass_kt <= 0 {
            return None;
        }
        let per_ly = Fixed::from_num(mass_kt.saturating_mul(usage)) / Fixed::from_num(10_000);
        Some(Fixed::from_num(fuel.max(0)) / per_ly)
    }

    /// The worse of two engines at every warp.
    #[must_use]
    pub fn worst(&self, other: &Self) -> Self {
        let mut fuel_usage = self.fuel_usage;
        for (usage, theirs) in fuel_usage.iter_mut().zip(other.fuel_usage) {
            *usage = (*usage).max(theirs);
        }
        Self {
            fuel_usage,
            ram_scoop: self.ram_scoop && other.ram_scoop,
        }
    }
}

/// One bomb, as carried by a single ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bomb {
    /// Population killed, in tenths of a percent.
    pub kill_rate: i64,
    /// Minimum colonists killed.
    pub min_kill: i64,
    /// Structures destroyed.
    pub structure_kill: i64,
}

/// A ship or starbase design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipDesign {
    /// Identifier, assigned on insertion.
    pub id: DesignId,
    /// Owning player.
    pub owner: PlayerId,
    /// Design name.
    pub name: String,
    /// Hull category.
    pub hull: HullKind,
    /// Intended use.
    pub purpose: DesignPurpose,
    /// Build cost per ship.
    pub cost: Cost,
    /// Empty mass in kT.
    pub mass: i64,
    /// Armor per ship.
    pub armor: i64,
    /// Fuel tank in mg.
    pub fuel_capacity: i64,
    /// Cargo hold in kT.
    pub cargo_capacity: i64,
    /// Engine, if the hull can move.
    pub engine: Option<Engine>,
    /// Engines per ship.
    pub num_engines: i64,
    /// Carries a colonization module.
    pub colonizer: bool,
    /// Carries an orbital construction module.
    pub orbital_construction: bool,
    /// Remote mining rate.
    pub mining_rate: i64,
    /// Mines laid per year by field type.
    pub mine_lay_rates: BTreeMap<MineFieldType, i64>,
    /// Mines swept per year.
    pub mine_sweep: i64,
    /// Bombs per ship.
    pub bombs: Vec<Bomb>,
    /// Damage dealt per battle round.
    pub weapons_power: i64,
    /// Normal scanner range in ly.
    pub scan_range: i64,
    /// Penetrating scanner range in ly.
    pub pen_scan_range: i64,
    /// Mass driver rating, zero without one.
    pub mass_driver_warp: u8,
    /// Refuels and repairs fleets in orbit.
    pub dock: bool,
}

impl Default for ShipDesign {
    fn default() -> Self {
        Self {
            id: DesignId::default(),
            owner: PlayerId::default(),
            name: String::new(),
            hull: HullKind::Ship,
            purpose: DesignPurpose::None,
            cost: Cost::ZERO,
            mass: 0,
            armor: 0,
            fuel_capacity: 0,
            cargo_capacity: 0,
            engine: None,
            num_engines: 0,
            colonizer: false,
            orbital_construction: false,
            mining_rate: 0,
            mine_lay_rates: BTreeMap::new(),
            mine_sweep: 0,
            bombs: Vec::new(),
            weapons_power: 0,
            scan_range: 0,
            pen_scan_range: 0,
            mass_driver_warp: 0,
            dock: false,
        }
    }
}

impl ShipDesign {
    /// Whether this design is a starbase.
    #[must_use]
    pub fn is_starbase(&self) -> bool {
        self.hull == HullKind::Starbase
    }

    /// Whether this design can fight.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.weapons_power > 0 || !self.bombs.is_empty()
    }

    /// Mines laid per year for a field type.
    #[must_use]
    pub fn mine_lay_rate(&self, field_type: MineFieldType) -> i64 {
        self.mine_lay_rates.get(&field_type).copied().unwrap_or(0)
    }
}
