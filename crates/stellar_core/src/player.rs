//! Players, their races and their technology.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cargo::Cost;
use crate::ids::{DesignId, MapObjectRef, PlayerId};
use crate::message::{Message, MessageKind};
use crate::planet::{Hab, HabAxis, ProductionQueueItem};
use crate::rules::MAX_TECH_LEVEL;

/// Research fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum TechField {
    /// Energy.
    #[default]
    Energy,
    /// Weapons.
    Weapons,
    /// Propulsion.
    Propulsion,
    /// Construction.
    Construction,
    /// Electronics.
    Electronics,
    /// Biotechnology.
    Biotechnology,
}

impl TechField {
    /// All fields in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Energy,
        Self::Weapons,
        Self::Propulsion,
        Self::Construction,
        Self::Electronics,
        Self::Biotechnology,
    ];
}

/// Tech level per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TechLevels {
    /// Energy.
    pub energy: u32,
    /// Weapons.
    pub weapons: u32,
    /// Propulsion.
    pub propulsion: u32,
    /// Construction.
    pub construction: u32,
    /// Electronics.
    pub electronics: u32,
    /// Biotechnology.
    pub biotechnology: u32,
}

impl TechLevels {
    /// Level in one field.
    #[must_use]
    pub const fn get(&self, field: TechField) -> u32 {
        match field {
            TechField::Energy => self.energy,
            TechField::Weapons => self.weapons,
            TechField::Propulsion => self.propulsion,
            TechField::Construction => self.construction,
            TechField::Electronics => self.electronics,
            TechField::Biotechnology => self.biotechnology,
        }
    }

    /// Mutable level in one field.
    pub fn get_mut(&mut self, field: TechField) -> &mut u32 {
        match field {
            TechField::Energy => &mut self.energy,
            TechField::Weapons => &mut self.weapons,
            TechField::Propulsion => &mut self.propulsion,
            TechField::Construction => &mut self.construction,
            TechField::Electronics => &mut self.electronics,
            TechField::Biotechnology => &mut self.biotechnology,
        }
    }

    /// Sum of all levels.
    #[must_use]
    pub fn sum(&self) -> u32 {
        TechField::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// The lowest field that is not maxed out, first in canonical order on ties.
    #[must_use]
    pub fn lowest_open_field(&self) -> Option<TechField> {
        TechField::ALL
            .iter()
            .copied()
            .filter(|f| self.get(*f) < MAX_TECH_LEVEL)
            .min_by_key(|f| self.get(*f))
    }
}

/// Habitable range on one axis, on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabRange {
    /// Lowest habitable value.
    pub min: i32,
    /// Highest habitable value.
    pub max: i32,
    /// The race does not care about this axis.
    pub immune: bool,
}

impl HabRange {
    /// A range from `min` to `max`.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            immune: false,
        }
    }

    /// An immune axis.
    #[must_use]
    pub const fn immune() -> Self {
        Self {
            min: 0,
            max: 100,
            immune: true,
        }
    }

    /// Middle of the range.
    #[must_use]
    pub const fn center(&self) -> i32 {
        (self.min + self.max) / 2
    }
}

impl Default for HabRange {
    fn default() -> Self {
        Self::new(15, 85)
    }
}

/// Racial traits that change formulas throughout turn generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceTraits {
    /// Scrapping recovers more and yields bonus resources.
    pub ultimate_recycling: bool,
    /// Remote miners may work the race's own planets.
    pub can_remote_mine_own_planets: bool,
    /// Standard mine fields can be detonated.
    pub can_detonate_mines: bool,
    /// Mineral alchemy is cheaper.
    pub mineral_alchemy_discount: bool,
    /// Own packets do not decay when thrown over their safe speed.
    pub packet_physics: bool,
}

/// A player's race.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Race {
    /// Singular name.
    pub name: String,
    /// Yearly growth rate in percent.
    pub growth_rate: i64,
    /// Gravity range.
    pub gravity: HabRange,
    /// Temperature range.
    pub temperature: HabRange,
    /// Radiation range.
    pub radiation: HabRange,
    /// Colonists needed to produce one resource.
    pub colonists_per_resource: i64,
    /// Resources produced by ten factories.
    pub factory_output: i64,
    /// Cost of one factory.
    pub factory_cost: Cost,
    /// Factories operable per 10,000 colonists.
    pub num_factories: i64,
    /// kT mined by ten mines at 100% concentration, per mineral.
    pub mine_output: i64,
    /// Cost of one mine.
    pub mine_cost: Cost,
    /// Mines operable per 10,000 colonists.
    pub num_mines: i64,
    /// Racial traits.
    pub traits: RaceTraits,
}

impl Default for Race {
    fn default() -> Self {
        Self {
            name: "Humanoid".to_string(),
            growth_rate: 15,
            gravity: HabRange::default(),
            temperature: HabRange::default(),
            radiation: HabRange::default(),
            colonists_per_resource: 1000,
            factory_output: 10,
            factory_cost: Cost::new(0, 0, 4, 10),
            num_factories: 10,
            mine_output: 10,
            mine_cost: Cost::resources(5),
            num_mines: 10,
            traits: RaceTraits::default(),
        }
    }
}

impl Race {
    /// Habitable range on one axis.
    #[must_use]
    pub const fn range(&self, axis: HabAxis) -> &HabRange {
        match axis {
            HabAxis::Gravity => &self.gravity,
            HabAxis::Temperature => &self.temperature,
            HabAxis::Radiation => &self.radiation,
        }
    }

    /// Habitability of a planet for this race, in percent.
    ///
    /// Inside every range this is the mean of the per-axis scores. Any axis
    /// outside its range makes the planet hostile: the result is the negative
    /// sum of the out-of-range distances, floored at `min_habitability`.
    #[must_use]
    pub fn habitability(&self, hab: &Hab, min_habitability: i64) -> i64 {
        let mut total = 0i64;
        let mut hostile = 0i64;

        for axis in HabAxis::ALL {
            let range = self.range(axis);
            if range.immune {
                total += 100;
                continue;
            }
            let value = hab.get(axis);
            if value < range.min {
                hostile += i64::from(range.min - value);
            } else if value > range.max {
                hostile += i64::from(value - range.max);
            } else {
                let half_width = i64::from(((range.max - range.min) / 2).max(1));
                let off_center = i64::from((value - range.center()).abs());
                total += (100 - 100 * off_center / half_width).max(0);
            }
        }

        if hostile > 0 {
            (-hostile).max(min_habitability)
        } else {
            total / 3
        }
    }
}

/// Diplomatic stance toward another player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Relation {
    /// Neither friend nor enemy.
    Neutral,
    /// Allied.
    Friend,
    /// At war.
    #[default]
    Enemy,
}

/// One year's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Game year.
    pub year: u32,
    /// Owned planets.
    pub planets: i64,
    /// Owned starbases.
    pub starbases: i64,
    /// Armed ships.
    pub armed_ships: i64,
    /// Unarmed ships.
    pub unarmed_ships: i64,
    /// Sum of tech levels.
    pub tech_levels: i64,
    /// Yearly resources across all planets.
    pub resources: i64,
    /// Total population.
    pub population: i64,
    /// Final score.
    pub score: i64,
}

/// A player in the game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Player number.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// The player's race.
    pub race: Race,
    /// Tech levels.
    pub tech: TechLevels,
    /// Field currently researched.
    pub research_field: TechField,
    /// Share of planetary resources spent on research, in percent.
    pub research_percent: i64,
    /// Resources spent toward the next level of the current field.
    pub research_spent: i64,
    /// Resources set aside for research this year, not yet spent.
    pub leftover_resources: i64,
    /// Stance toward other players. Missing entries are enemies.
    pub relations: BTreeMap<PlayerId, Relation>,
    /// Queue given to newly colonized planets.
    pub default_production_plan: Vec<ProductionQueueItem>,
    /// This year's messages.
    pub messages: Vec<Message>,
    /// Score per year.
    pub score_history: Vec<ScoreRecord>,
    /// Objects this player has discovered, and whether a penetrating scan saw them.
    pub discoveries: BTreeMap<MapObjectRef, bool>,
    /// Design installed as a starbase by orbital construction colonizers.
    pub starter_colony: Option<DesignId>,
    /// Whether the player has won.
    pub victor: bool,
}

impl Player {
    /// A new player with default research settings.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, race: Race) -> Self {
        Self {
            id,
            name: name.into(),
            race,
            tech: TechLevels::default(),
            research_field: TechField::Energy,
            research_percent: 15,
            research_spent: 0,
            leftover_resources: 0,
            relations: BTreeMap::new(),
            default_production_plan: Vec::new(),
            messages: Vec::new(),
            score_history: Vec::new(),
            discoveries: BTreeMap::new(),
            starter_colony: None,
            victor: false,
        }
    }

    /// Stance toward another player. A player is always its own friend.
    #[must_use]
    pub fn relation_to(&self, other: PlayerId) -> Relation {
        if other == self.id {
            return Relation::Friend;
        }
        self.relations.get(&other).copied().unwrap_or_default()
    }

    /// Whether this player treats `other` as a friend.
    #[must_use]
    pub fn is_friend(&self, other: PlayerId) -> bool {
        self.relation_to(other) == Relation::Friend
    }

    /// Append a message to the inbox.
    pub fn message(&mut self, kind: MessageKind, text: impl Into<String>, target: Option<MapObjectRef>) {
        self.messages.push(Message::new(kind, text, target));
    }

    /// Number of inbox messages of one kind.
    #[must_use]
    pub fn count_messages(&self, kind: MessageKind) -> usize {
        self.messages.iter().filter(|m| m.kind == kind).count()
    }

    /// Latest score, if any year has been scored.
    #[must_use]
    pub fn score(&self) -> Option<&ScoreRecord> {
        self.score_history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_habitability_center_is_perfect() {
        let race = Race::default();
        let hab = Hab::new(50, 50, 50);
        assert_eq!(race.habitability(&hab, -45), 100);
    }

    #[test]
    fn test_habitability_edge_and_hostile() {
        let race = Race::default();
        // Gravity at the edge of its range scores zero on that axis.
        assert_eq!(race.habitability(&Hab::new(85, 50, 50), -45), 66);
        // 10 below and 50 above.
        assert_eq!(race.habitability(&Hab::new(5, 50, 50), -45), -10);
        assert_eq!(race.habitability(&Hab::new(0, 100, 0), -45), -45);
    }

    #[test]
    fn test_immune_axis_scores_full() {
        let race = Race {
            radiation: HabRange::immune(),
            ..Race::default()
        };
        assert_eq!(race.habitability(&Hab::new(50, 50, 0), -45), 100);
    }

    #[test]
    fn test_relations_default_to_enemy() {
        let mut player = Player::new(PlayerId(0), "Ann", Race::default());
        assert!(player.is_friend(PlayerId(0)));
        assert_eq!(player.relation_to(PlayerId(1)), Relation::Enemy);
        player.relations.insert(PlayerId(1), Relation::Friend);
        assert!(player.is_friend(PlayerId(1)));
    }

    #[test]
    fn test_lowest_open_field() {
        let mut tech = TechLevels {
            energy: 3,
            weapons: 1,
            propulsion: 1,
            construction: 5,
            electronics: 2,
            biotechnology: 4,
        };
        assert_eq!(tech.lowest_open_field(), Some(TechField::Weapons));
        for field in TechField::ALL {
            *tech.get_mut(field) = MAX_TECH_LEVEL;
        }
        assert_eq!(tech.lowest_open_field(), None);
        assert_eq!(tech.sum(), MAX_TECH_LEVEL * 6);
    }
}
