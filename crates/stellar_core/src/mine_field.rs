//! Mine fields.

use serde::{Deserialize, Serialize};

use crate::ids::{MineFieldId, PlayerId};
use crate::math::{isqrt_u64, Fixed, Vec2Fixed};

/// Mine field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MineFieldType {
    /// Damages fleets; can be detonated.
    Standard,
    /// Damages fleets heavily.
    Heavy,
    /// Stops fleets without damaging them.
    SpeedBump,
}

/// Per-type mine field behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MineFieldStats {
    /// Fleets at or below this warp pass safely.
    pub safe_warp: u8,
    /// Hit chance per ly per warp over the safe speed, in hundredths of a percent.
    pub hit_chance: u32,
    /// Minimum damage dealt to a fleet.
    pub min_damage_per_fleet: i64,
    /// Damage per engine.
    pub damage_per_engine: i64,
    /// Minimum damage to a ram scoop fleet.
    pub min_damage_per_fleet_ram_scoop: i64,
    /// Damage per ram scoop engine.
    pub damage_per_engine_ram_scoop: i64,
    /// Sweep effectiveness in percent.
    pub sweep_factor: i64,
    /// Minimum mines lost to decay each year.
    pub min_decay: u64,
    /// The field can be detonated.
    pub can_detonate: bool,
}

impl MineFieldStats {
    /// Standard field defaults.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            safe_warp: 4,
            hit_chance: 30,
            min_damage_per_fleet: 500,
            damage_per_engine: 100,
            min_damage_per_fleet_ram_scoop: 600,
            damage_per_engine_ram_scoop: 125,
            sweep_factor: 100,
            min_decay: 10,
            can_detonate: true,
        }
    }

    /// Heavy field defaults.
    #[must_use]
    pub const fn heavy() -> Self {
        Self {
            safe_warp: 6,
            hit_chance: 100,
            min_damage_per_fleet: 2000,
            damage_per_engine: 500,
            min_damage_per_fleet_ram_scoop: 2500,
            damage_per_engine_ram_scoop: 600,
            sweep_factor: 100,
            min_decay: 10,
            can_detonate: false,
        }
    }

    /// Speed bump field defaults.
    #[must_use]
    pub const fn speed_bump() -> Self {
        Self {
            safe_warp: 5,
            hit_chance: 350,
            min_damage_per_fleet: 0,
            damage_per_engine: 0,
            min_damage_per_fleet_ram_scoop: 0,
            damage_per_engine_ram_scoop: 0,
            sweep_factor: 333,
            min_decay: 10,
            can_detonate: false,
        }
    }
}

/// A mine field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MineField {
    /// Identifier, assigned on insertion.
    pub id: MineFieldId,
    /// Owning player.
    pub owner: PlayerId,
    /// Field type.
    pub field_type: MineFieldType,
    /// Center.
    pub position: Vec2Fixed,
    /// Mine count. Can exceed 32 bits.
    pub num_mines: u64,
    /// The owner ordered the field detonated.
    pub detonate: bool,
}

impl MineField {
    /// A new field.
    #[must_use]
    pub fn new(owner: PlayerId, field_type: MineFieldType, position: Vec2Fixed, num_mines: u64) -> Self {
        Self {
            id: MineFieldId::default(),
            owner,
            field_type,
            position,
            num_mines,
            detonate: false,
        }
    }

    /// Radius in ly, the square root of the mine count.
    #[must_use]
    pub fn radius(&self) -> Fixed {
        let root = isqrt_u64(self.num_mines).min(i32::MAX as u64);
        Fixed::from_num(root)
    }

    /// Whether a point lies inside the field.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        let radius = self.radius();
        self.position.distance_squared(point) <= radius.saturating_mul(radius)
    }

    /// Remove mines, never below zero. Returns how many were removed.
    pub fn remove_mines(&mut self, count: u64) -> u64 {
        let removed = count.min(self.num_mines);
        self.num_mines -= removed;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_square_root() {
        let field = MineField::new(PlayerId(0), MineFieldType::Standard, Vec2Fixed::ZERO, 1600);
        assert_eq!(field.radius(), Fixed::from_num(40));
        assert!(field.contains(Vec2Fixed::from_ints(40, 0)));
        assert!(!field.contains(Vec2Fixed::from_ints(30, 30)));
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let field = MineField::new(
            PlayerId(0),
            MineFieldType::Heavy,
            Vec2Fixed::ZERO,
            10_000_000_000,
        );
        assert_eq!(field.radius(), Fixed::from_num(100_000));
    }

    #[test]
    fn test_remove_mines_saturates() {
        let mut field = MineField::new(PlayerId(0), MineFieldType::Standard, Vec2Fixed::ZERO, 15);
        assert_eq!(field.remove_mines(40), 15);
        assert_eq!(field.num_mines, 0);
    }
}
