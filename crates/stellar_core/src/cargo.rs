//! Cargo and cost vectors.
//!
//! Both are four-component vectors with component-wise arithmetic. Cargo is
//! measured in kilotons (colonists: 100 colonists = 1 kT); cost adds a
//! resources component to the three minerals. All math is integer.

use serde::{Deserialize, Serialize};

/// The three minerals mined, shipped and spent throughout the galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mineral {
    /// Ironium.
    Ironium,
    /// Boranium.
    Boranium,
    /// Germanium.
    Germanium,
}

impl Mineral {
    /// All minerals in canonical order.
    pub const ALL: [Self; 3] = [Self::Ironium, Self::Boranium, Self::Germanium];

    /// The matching cargo type.
    #[must_use]
    pub const fn cargo_type(self) -> CargoType {
        match self {
            Self::Ironium => CargoType::Ironium,
            Self::Boranium => CargoType::Boranium,
            Self::Germanium => CargoType::Germanium,
        }
    }
}

/// Anything a transport order can move.
///
/// Fuel is not part of the cargo hold but can be transferred between fleets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CargoType {
    /// Ironium, in kT.
    Ironium,
    /// Boranium, in kT.
    Boranium,
    /// Germanium, in kT.
    Germanium,
    /// Colonists, in kT (100 colonists per kT).
    Colonists,
    /// Fuel, in mg.
    Fuel,
}

impl CargoType {
    /// Transport sub-task order: the hold contents, then fuel.
    pub const ALL: [Self; 5] = [
        Self::Ironium,
        Self::Boranium,
        Self::Germanium,
        Self::Colonists,
        Self::Fuel,
    ];

    /// Hold contents in dunnage priority order.
    pub const HOLD: [Self; 4] = [
        Self::Ironium,
        Self::Boranium,
        Self::Germanium,
        Self::Colonists,
    ];

    /// Whether this type occupies cargo hold space.
    #[must_use]
    pub const fn is_hold(self) -> bool {
        !matches!(self, Self::Fuel)
    }
}

impl std::fmt::Display for CargoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ironium => "ironium",
            Self::Boranium => "boranium",
            Self::Germanium => "germanium",
            Self::Colonists => "colonists",
            Self::Fuel => "fuel",
        };
        f.write_str(name)
    }
}

/// Contents of a cargo hold or planet surface, in kT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cargo {
    /// Ironium.
    pub ironium: i64,
    /// Boranium.
    pub boranium: i64,
    /// Germanium.
    pub germanium: i64,
    /// Colonists, in kT.
    pub colonists: i64,
}

impl Cargo {
    /// Empty cargo.
    pub const ZERO: Self = Self {
        ironium: 0,
        boranium: 0,
        germanium: 0,
        colonists: 0,
    };

    /// Create a new cargo vector.
    #[must_use]
    pub const fn new(ironium: i64, boranium: i64, germanium: i64, colonists: i64) -> Self {
        Self {
            ironium,
            boranium,
            germanium,
            colonists,
        }
    }

    /// Minerals only.
    #[must_use]
    pub const fn minerals(ironium: i64, boranium: i64, germanium: i64) -> Self {
        Self::new(ironium, boranium, germanium, 0)
    }

    /// Amount of one hold cargo type. Fuel is never in a hold and reads as zero.
    #[must_use]
    pub const fn get(&self, cargo_type: CargoType) -> i64 {
        match cargo_type {
            CargoType::Ironium => self.ironium,
            CargoType::Boranium => self.boranium,
            CargoType::Germanium => self.germanium,
            CargoType::Colonists => self.colonists,
            CargoType::Fuel => 0,
        }
    }

    /// Add (or with a negative amount, remove) one cargo type.
    pub fn add(&mut self, cargo_type: CargoType, amount: i64) {
        match cargo_type {
            CargoType::Ironium => self.ironium += amount,
            CargoType::Boranium => self.boranium += amount,
            CargoType::Germanium => self.germanium += amount,
            CargoType::Colonists => self.colonists += amount,
            CargoType::Fuel => {}
        }
    }

    /// Amount of one mineral.
    #[must_use]
    pub const fn mineral(&self, mineral: Mineral) -> i64 {
        self.get(mineral.cargo_type())
    }

    /// Total mass in kT.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.ironium + self.boranium + self.germanium + self.colonists
    }

    /// Whether every component is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// The mineral part of this cargo as a cost with zero resources.
    #[must_use]
    pub const fn to_cost(&self) -> Cost {
        Cost::new(self.ironium, self.boranium, self.germanium, 0)
    }

    /// Drop the colonists.
    #[must_use]
    pub const fn without_colonists(self) -> Self {
        Self::minerals(self.ironium, self.boranium, self.germanium)
    }
}

impl std::ops::Add for Cargo {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.ironium + rhs.ironium,
            self.boranium + rhs.boranium,
            self.germanium + rhs.germanium,
            self.colonists + rhs.colonists,
        )
    }
}

impl std::ops::Sub for Cargo {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.ironium - rhs.ironium,
            self.boranium - rhs.boranium,
            self.germanium - rhs.germanium,
            self.colonists - rhs.colonists,
        )
    }
}

impl std::ops::AddAssign for Cargo {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Cargo {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Build cost: three minerals plus resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Ironium, in kT.
    pub ironium: i64,
    /// Boranium, in kT.
    pub boranium: i64,
    /// Germanium, in kT.
    pub germanium: i64,
    /// Resources.
    pub resources: i64,
}

impl Cost {
    /// Zero cost.
    pub const ZERO: Self = Self {
        ironium: 0,
        boranium: 0,
        germanium: 0,
        resources: 0,
    };

    /// Create a new cost vector.
    #[must_use]
    pub const fn new(ironium: i64, boranium: i64, germanium: i64, resources: i64) -> Self {
        Self {
            ironium,
            boranium,
            germanium,
            resources,
        }
    }

    /// Resources only.
    #[must_use]
    pub const fn resources(resources: i64) -> Self {
        Self::new(0, 0, 0, resources)
    }

    /// Components in canonical order.
    #[must_use]
    pub const fn components(&self) -> [i64; 4] {
        [self.ironium, self.boranium, self.germanium, self.resources]
    }

    /// Build a cost from components in canonical order.
    #[must_use]
    pub const fn from_components(c: [i64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Amount of one mineral.
    #[must_use]
    pub const fn mineral(&self, mineral: Mineral) -> i64 {
        match mineral {
            Mineral::Ironium => self.ironium,
            Mineral::Boranium => self.boranium,
            Mineral::Germanium => self.germanium,
        }
    }

    /// The mineral part as cargo.
    #[must_use]
    pub const fn to_cargo(&self) -> Cargo {
        Cargo::minerals(self.ironium, self.boranium, self.germanium)
    }

    /// Whether every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.ironium == 0 && self.boranium == 0 && self.germanium == 0 && self.resources == 0
    }

    /// Whether `self` covers `other` in every component.
    #[must_use]
    pub const fn covers(&self, other: &Self) -> bool {
        self.ironium >= other.ironium
            && self.boranium >= other.boranium
            && self.germanium >= other.germanium
            && self.resources >= other.resources
    }

    /// Multiply every component by `percent / 100`, flooring each.
    #[must_use]
    pub fn scale_percent(&self, percent: i64) -> Self {
        let c = self.components().map(|v| v * percent / 100);
        Self::from_components(c)
    }

    /// Multiply every component by `numerator / denominator`, flooring each.
    #[must_use]
    pub fn scale_ratio(&self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::ZERO;
        }
        let c = self
            .components()
            .map(|v| (i128::from(v) * i128::from(numerator) / i128::from(denominator)) as i64);
        Self::from_components(c)
    }

    /// Component-wise difference floored at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: &Self) -> Self {
        let a = self.components();
        let b = other.components();
        Self::from_components([
            (a[0] - b[0]).max(0),
            (a[1] - b[1]).max(0),
            (a[2] - b[2]).max(0),
            (a[3] - b[3]).max(0),
        ])
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(&self, other: &Self) -> Self {
        let a = self.components();
        let b = other.components();
        Self::from_components([
            a[0].min(b[0]),
            a[1].min(b[1]),
            a[2].min(b[2]),
            a[3].min(b[3]),
        ])
    }

    /// How many whole units of `unit` these funds pay for.
    ///
    /// Components the unit does not need are ignored; a unit that costs
    /// nothing at all yields `i64::MAX`.
    #[must_use]
    pub fn times_affordable(&self, unit: &Self) -> i64 {
        self.components()
            .iter()
            .zip(unit.components())
            .filter(|(_, need)| *need > 0)
            .map(|(have, need)| (*have).max(0) / need)
            .min()
            .unwrap_or(i64::MAX)
    }
}

impl std::ops::Add for Cost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.ironium + rhs.ironium,
            self.boranium + rhs.boranium,
            self.germanium + rhs.germanium,
            self.resources + rhs.resources,
        )
    }
}

impl std::ops::Sub for Cost {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.ironium - rhs.ironium,
            self.boranium - rhs.boranium,
            self.germanium - rhs.germanium,
            self.resources - rhs.resources,
        )
    }
}

impl std::ops::Mul<i64> for Cost {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from_components(self.components().map(|v| v * rhs))
    }
}

impl std::ops::AddAssign for Cost {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Cost {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
