//! Game rules: every tunable constant plus the seeded random generator.
//!
//! Rules are data-driven and loadable from RON. The random generator lives
//! here so that every draw in a turn comes from one seeded stream, consumed
//! in the fixed iteration order of the turn pipeline.
//!
//! # Example RON
//!
//! ```ron
//! Rules(
//!     seed: 42,
//!     scrap: ScrapRules(normal_numerator: 1, normal_denominator: 3, ..),
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::cargo::Cost;
use crate::error::{GameError, Result};
use crate::mine_field::{MineFieldStats, MineFieldType};

/// Highest tech level in any field.
pub const MAX_TECH_LEVEL: u32 = 26;

/// Highest warp factor.
pub const MAX_WARP: u8 = 10;

/// Complete rule set for a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Seed for the game's random generator.
    pub seed: u64,
    /// Mine field stats keyed by field type.
    pub mine_field_stats: BTreeMap<MineFieldType, MineFieldStats>,
    /// Mine field decay and impact rules.
    pub mine_fields: MineFieldRules,
    /// Scrapping recovery rates.
    pub scrap: ScrapRules,
    /// Mineral packet costs and physics.
    pub packets: PacketRules,
    /// Production item costs not set by the race.
    pub production: ProductionRules,
    /// Population growth and habitability constants.
    pub growth: GrowthRules,
    /// Research costs.
    pub research: ResearchRules,
    /// Armor repair rates.
    pub repair: RepairRules,
    /// Salvage decay.
    pub salvage: SalvageRules,
    /// Planetary scanner ranges.
    pub scanning: ScanRules,
    /// Victory conditions.
    pub victory: VictoryConditions,
    /// Generator state, seeded from `seed` on first use.
    rng: Option<ChaCha8Rng>,
}

impl Default for Rules {
    fn default() -> Self {
        let mut mine_field_stats = BTreeMap::new();
        mine_field_stats.insert(MineFieldType::Standard, MineFieldStats::standard());
        mine_field_stats.insert(MineFieldType::Heavy, MineFieldStats::heavy());
        mine_field_stats.insert(MineFieldType::SpeedBump, MineFieldStats::speed_bump());

        Self {
            seed: 0,
            mine_field_stats,
            mine_fields: MineFieldRules::default(),
            scrap: ScrapRules::default(),
            packets: PacketRules::default(),
            production: ProductionRules::default(),
            growth: GrowthRules::default(),
            research: ResearchRules::default(),
            repair: RepairRules::default(),
            salvage: SalvageRules::default(),
            scanning: ScanRules::default(),
            victory: VictoryConditions::default(),
            rng: None,
        }
    }
}

impl Rules {
    /// Default rules with a specific seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Load rules from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let rules: Self = ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Parse rules from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let rules: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.research.base_costs.len() <= MAX_TECH_LEVEL as usize {
            return Err(GameError::InvalidState(format!(
                "research cost table needs {} entries, found {}",
                MAX_TECH_LEVEL + 1,
                self.research.base_costs.len()
            )));
        }
        if self.scrap.normal_denominator <= 0 {
            return Err(GameError::InvalidState(
                "scrap recovery denominator must be positive".to_string(),
            ));
        }
        if self.mine_fields.max_decay_percent > 100 {
            return Err(GameError::InvalidState(
                "mine field decay cannot exceed 100%".to_string(),
            ));
        }
        if self.packets.mineral_per_packet <= 0 {
            return Err(GameError::InvalidState(
                "packets must carry minerals".to_string(),
            ));
        }
        Ok(())
    }

    /// Stats for a mine field type, if the rules define them.
    #[must_use]
    pub fn mine_field_stats(&self, field_type: MineFieldType) -> Option<&MineFieldStats> {
        self.mine_field_stats.get(&field_type)
    }

    /// The game's random generator.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        let seed = self.seed;
        self.rng.get_or_insert_with(|| ChaCha8Rng::seed_from_u64(seed))
    }

    /// Roll a chance expressed in hundredths of a percent (0..=10000).
    pub fn roll_basis_points(&mut self, chance: u32) -> bool {
        if chance == 0 {
            return false;
        }
        self.rng().gen_range(0..10_000u32) < chance
    }

    /// Position in the random stream, for state hashing.
    #[must_use]
    pub fn rng_word_pos(&self) -> u128 {
        self.rng.as_ref().map_or(0, ChaCha8Rng::get_word_pos)
    }
}

/// Mine field decay and impact rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MineFieldRules {
    /// Yearly decay for every field.
    pub base_decay_percent: u64,
    /// Extra yearly decay per planet inside the field.
    pub planet_decay_percent: u64,
    /// Decay cap.
    pub max_decay_percent: u64,
    /// Mines lost when a fleet hits the field, as 1/n of the field.
    pub impact_reduction_divisor: u64,
    /// Minimum mines lost on impact.
    pub min_impact_reduction: u64,
    /// Mines lost on detonation, as 1/n of the field.
    pub detonation_reduction_divisor: u64,
    /// Fields at or below this count are removed.
    pub removal_threshold: u64,
}

impl Default for MineFieldRules {
    fn default() -> Self {
        Self {
            base_decay_percent: 2,
            planet_decay_percent: 4,
            max_decay_percent: 50,
            impact_reduction_divisor: 20,
            min_impact_reduction: 10,
            detonation_reduction_divisor: 4,
            removal_threshold: 10,
        }
    }
}

/// Scrapping recovery rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapRules {
    /// Recovered share of the build cost, numerator.
    pub normal_numerator: i64,
    /// Recovered share of the build cost, denominator.
    pub normal_denominator: i64,
    /// Ultimate recycling at a planet without a starbase, percent.
    pub ultimate_recycling_planet_percent: i64,
    /// Ultimate recycling at a planet with a starbase, percent.
    pub ultimate_recycling_starbase_percent: i64,
}

impl Default for ScrapRules {
    fn default() -> Self {
        Self {
            normal_numerator: 1,
            normal_denominator: 3,
            ultimate_recycling_planet_percent: 45,
            ultimate_recycling_starbase_percent: 90,
        }
    }
}

/// Mineral packet costs and physics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketRules {
    /// kT of mineral a single-mineral packet carries.
    pub mineral_per_packet: i64,
    /// kT of mineral consumed to build a single-mineral packet.
    pub mineral_cost_per_packet: i64,
    /// kT of each mineral a mixed packet carries.
    pub mixed_per_mineral: i64,
    /// kT of each mineral consumed to build a mixed packet.
    pub mixed_cost_per_mineral: i64,
    /// Resources to launch one packet.
    pub resource_cost: i64,
    /// Divisor in the uncaught-packet damage formula.
    pub damage_divisor: i64,
}

impl Default for PacketRules {
    fn default() -> Self {
        Self {
            mineral_per_packet: 100,
            mineral_cost_per_packet: 110,
            mixed_per_mineral: 40,
            mixed_cost_per_mineral: 44,
            resource_cost: 10,
            damage_divisor: 160,
        }
    }
}

/// Production item costs not set by the race.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionRules {
    /// Cost of one defense.
    pub defense_cost: Cost,
    /// Cost of one mineral alchemy conversion.
    pub alchemy_cost: Cost,
    /// Alchemy cost for races with the discount.
    pub alchemy_discount_cost: Cost,
    /// Cost of one terraform step.
    pub terraform_cost: Cost,
    /// Defenses per planet.
    pub max_defenses: i64,
}

impl Default for ProductionRules {
    fn default() -> Self {
        Self {
            defense_cost: Cost::new(5, 5, 5, 15),
            alchemy_cost: Cost::resources(100),
            alchemy_discount_cost: Cost::resources(25),
            terraform_cost: Cost::resources(100),
            max_defenses: 100,
        }
    }
}

/// Population growth and habitability constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthRules {
    /// Population of a 100% habitability planet.
    pub max_population: i64,
    /// Fill percentage above which crowding slows growth.
    pub crowding_threshold_percent: i64,
    /// Percent of the population above capacity that dies each year.
    pub overcrowding_death_percent: i64,
    /// Most negative habitability.
    pub min_habitability: i64,
    /// Kilotons mined per point of concentration lost.
    pub mining_depletion_kt: i64,
}

impl Default for GrowthRules {
    fn default() -> Self {
        Self {
            max_population: 1_000_000,
            crowding_threshold_percent: 25,
            overcrowding_death_percent: 4,
            min_habitability: -45,
            mining_depletion_kt: 100,
        }
    }
}

/// Research cost table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchRules {
    /// Base cost of reaching each level, indexed by level.
    pub base_costs: Vec<i64>,
    /// Extra cost per level already known across all fields.
    pub cost_per_known_level: i64,
}

impl Default for ResearchRules {
    fn default() -> Self {
        Self {
            base_costs: vec![
                0, 50, 80, 130, 210, 340, 550, 890, 1440, 2330, 3770, 6100, 9870, 13850, 18040,
                22440, 27050, 31870, 36900, 42140, 47590, 53250, 59120, 65200, 71490, 77990,
                84700,
            ],
            cost_per_known_level: 10,
        }
    }
}

/// Armor repaired per year, in percent of design armor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairRules {
    /// Fleets that moved this year.
    pub moving_percent: i64,
    /// Fleets that sat still in deep space.
    pub stationary_percent: i64,
    /// Fleets orbiting any planet.
    pub orbiting_percent: i64,
    /// Fleets at an own planet with a docking starbase, and starbases.
    pub starbase_percent: i64,
}

impl Default for RepairRules {
    fn default() -> Self {
        Self {
            moving_percent: 1,
            stationary_percent: 2,
            orbiting_percent: 3,
            starbase_percent: 10,
        }
    }
}

/// Salvage decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalvageRules {
    /// Percent of each mineral lost per year.
    pub decay_percent: i64,
    /// Minimum kT of each mineral lost per year.
    pub min_decay: i64,
}

impl Default for SalvageRules {
    fn default() -> Self {
        Self {
            decay_percent: 10,
            min_decay: 10,
        }
    }
}

/// Planetary scanner ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRules {
    /// Normal scanner range of every owned planet, in ly.
    pub planet_scan_range: i64,
    /// Penetrating scanner range of every owned planet, in ly.
    pub planet_pen_scan_range: i64,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            planet_scan_range: 50,
            planet_pen_scan_range: 0,
        }
    }
}

/// Conditions for declaring a winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryConditions {
    /// No winner before this many years have passed.
    pub min_years: u32,
    /// How many enabled criteria a player must meet.
    pub required_count: u32,
    /// Own this share of all planets.
    pub owned_planets_percent: Option<u32>,
    /// Reach this sum of tech levels.
    pub tech_levels_sum: Option<u32>,
    /// Reach this score.
    pub score: Option<i64>,
}

impl Default for VictoryConditions {
    fn default() -> Self {
        Self {
            min_years: 50,
            required_count: 1,
            owned_planets_percent: Some(60),
            tech_levels_sum: Some(100),
            score: Some(5000),
        }
    }
}
