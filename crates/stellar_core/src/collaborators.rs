//! External collaborators the turn pipeline calls into.
//!
//! Battle resolution, ground combat, intel discovery and mine damage are
//! interfaces here. Each has a default implementation so a game can run
//! out of the box; hosts can swap in their own through [`Collaborators`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::PlanetInvasion;
use crate::design::ShipDesign;
use crate::fleet::{Fleet, ShipToken};
use crate::game::Storage;
use crate::ids::{DesignId, FleetId, MapObjectRef, PlayerId};
use crate::math::{Fixed, Vec2Fixed};
use crate::mine_field::MineFieldStats;
use crate::planet::Planet;
use crate::player::Player;
use crate::rules::Rules;

/// Rounds after which a battle ends undecided.
pub const MAX_BATTLE_ROUNDS: u32 = 16;

/// One ship stack taking part in a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatStack {
    /// Fleet the stack belongs to.
    pub fleet: FleetId,
    /// Index of the stack in the fleet's token list.
    pub token_index: usize,
    /// Owning player.
    pub owner: PlayerId,
    /// Ships and damage, written back after the battle.
    pub token: ShipToken,
    /// Armor per ship.
    pub armor: i64,
    /// Damage per ship per round.
    pub weapons_power: i64,
}

impl CombatStack {
    /// Armor left across the stack.
    #[must_use]
    pub fn remaining_armor(&self) -> i64 {
        (self.token.quantity * self.armor - self.token.damage).max(0)
    }

    /// Whether any ships are left.
    #[must_use]
    pub fn alive(&self) -> bool {
        self.token.quantity > 0
    }
}

/// A battle at one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battle {
    /// Where the battle happens.
    pub position: Vec2Fixed,
    /// All participating stacks, ordered by fleet then token.
    pub stacks: Vec<CombatStack>,
    /// Unordered pairs of players that fight each other, smaller id first.
    pub hostile_pairs: BTreeSet<(PlayerId, PlayerId)>,
}

impl Battle {
    /// Whether two players fight each other here.
    #[must_use]
    pub fn hostile(&self, a: PlayerId, b: PlayerId) -> bool {
        let pair = if a < b { (a, b) } else { (b, a) };
        self.hostile_pairs.contains(&pair)
    }
}

/// Outcome of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecord {
    /// Where the battle happened.
    pub position: Vec2Fixed,
    /// Players involved.
    pub participants: Vec<PlayerId>,
    /// Rounds fought.
    pub rounds: u32,
    /// Ships lost per player.
    pub ships_destroyed: BTreeMap<PlayerId, i64>,
}

/// Resolves a battle by mutating the stacks in place.
pub trait BattleEngine {
    /// Fight until one side is gone or the round limit is reached.
    fn fight(&mut self, battle: &mut Battle, rules: &mut Rules) -> BattleRecord;
}

/// Deterministic weapons-against-armor exchange.
///
/// Each round every armed stack in order fires its full power at the first
/// live hostile stack, spilling excess onto the next one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttritionBattleEngine;

impl BattleEngine for AttritionBattleEngine {
    fn fight(&mut self, battle: &mut Battle, _rules: &mut Rules) -> BattleRecord {
        let before: Vec<i64> = battle.stacks.iter().map(|s| s.token.quantity).collect();
        let mut rounds = 0;

        while rounds < MAX_BATTLE_ROUNDS {
            let mut fired = false;
            for shooter in 0..battle.stacks.len() {
                let (owner, mut power) = {
                    let s = &battle.stacks[shooter];
                    (s.owner, s.token.quantity * s.weapons_power)
                };
                if power <= 0 {
                    continue;
                }
                for target in 0..battle.stacks.len() {
                    if power <= 0 {
                        break;
                    }
                    let target_owner = battle.stacks[target].owner;
                    if !battle.stacks[target].alive() || !battle.hostile(owner, target_owner) {
                        continue;
                    }
                    fired = true;
                    let stack = &mut battle.stacks[target];
                    let hit = power.min(stack.remaining_armor().max(1));
                    let armor = stack.armor;
                    stack.token.apply_damage(hit, armor);
                    power -= hit;
                }
            }
            if !fired {
                break;
            }
            rounds += 1;
        }

        let mut participants: Vec<PlayerId> = battle.stacks.iter().map(|s| s.owner).collect();
        participants.sort_unstable();
        participants.dedup();

        let mut ships_destroyed = BTreeMap::new();
        for (stack, start) in battle.stacks.iter().zip(before) {
            let lost = start - stack.token.quantity;
            if lost > 0 {
                *ships_destroyed.entry(stack.owner).or_insert(0) += lost;
            }
        }

        debug!(rounds, ?ships_destroyed, "Battle resolved");
        BattleRecord {
            position: battle.position,
            participants,
            rounds,
            ships_destroyed,
        }
    }
}

/// Result of a ground invasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvasionOutcome {
    /// Whether the attacker took the planet.
    pub attacker_won: bool,
    /// Previous owner.
    pub defender: Option<PlayerId>,
    /// Population left on the planet.
    pub survivors: i64,
}

/// Resolves colonist drops on enemy planets.
pub trait InvasionResolver {
    /// Fight the ground battle and update ownership and population.
    fn resolve(&mut self, planet: &mut Planet, invasion: &PlanetInvasion) -> InvasionOutcome;
}

/// Attackers fight at 110%, defenders are boosted by defense coverage.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundCombatInvasionResolver;

impl InvasionResolver for GroundCombatInvasionResolver {
    fn resolve(&mut self, planet: &mut Planet, invasion: &PlanetInvasion) -> InvasionOutcome {
        let defender = planet.owner;
        let attack = invasion.colonists * 11 / 10;
        let boost = (Fixed::from_num(planet.population) * planet.spec.defense_coverage).to_num::<i64>();
        let defense = planet.population + boost;

        if attack > defense {
            let survivors = attack - defense;
            planet.owner = Some(invasion.attacker);
            planet.population = survivors;
            planet.production_queue.clear();
            planet.reinforce_fleet = None;
            planet.route_target = None;
            planet.packet_target = None;
            InvasionOutcome {
                attacker_won: true,
                defender,
                survivors,
            }
        } else {
            let survivors = if defense > 0 {
                (i128::from(planet.population) * i128::from(defense - attack) / i128::from(defense))
                    as i64
            } else {
                0
            };
            planet.population = survivors;
            InvasionOutcome {
                attacker_won: false,
                defender,
                survivors,
            }
        }
    }
}

/// Receives intel events.
pub trait Discoverer {
    /// `player` has seen `object`.
    fn discover(&mut self, player: &mut Player, object: MapObjectRef, penetrating: bool);
}

/// Records discoveries in the player's discovery log.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryLog;

impl Discoverer for DiscoveryLog {
    fn discover(&mut self, player: &mut Player, object: MapObjectRef, penetrating: bool) {
        let seen = player.discoveries.entry(object).or_insert(false);
        *seen |= penetrating;
    }
}

/// Damage dealt to a fleet by a mine hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MineDamage {
    /// Total damage.
    pub damage: i64,
    /// Ships destroyed.
    pub ships_destroyed: i64,
    /// The fleet has no ships left.
    pub fleet_destroyed: bool,
}

/// Applies mine hits to fleets.
pub trait MineFieldDamager {
    /// Damage `fleet` for one hit by a field with `stats`.
    fn damage_fleet(
        &mut self,
        fleet: &mut Fleet,
        designs: &Storage<DesignId, ShipDesign>,
        stats: &MineFieldStats,
    ) -> MineDamage;
}

/// Damage per engine with a per-fleet minimum, spread evenly over the ships.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMineFieldDamager;

impl MineFieldDamager for StandardMineFieldDamager {
    fn damage_fleet(
        &mut self,
        fleet: &mut Fleet,
        designs: &Storage<DesignId, ShipDesign>,
        stats: &MineFieldStats,
    ) -> MineDamage {
        let ram_scoop = fleet.spec.engine.is_some_and(|e| e.ram_scoop);
        let (min_damage, per_engine) = if ram_scoop {
            (stats.min_damage_per_fleet_ram_scoop, stats.damage_per_engine_ram_scoop)
        } else {
            (stats.min_damage_per_fleet, stats.damage_per_engine)
        };
        let damage = (fleet.spec.num_engines * per_engine).max(min_damage);
        let total_ships: i64 = fleet.tokens.iter().map(|t| t.quantity).sum();
        if damage <= 0 || total_ships <= 0 {
            return MineDamage::default();
        }

        let mut ships_destroyed = 0;
        for token in &mut fleet.tokens {
            let armor = designs.get(token.design).map_or(0, |d| d.armor);
            let share = damage * token.quantity / total_ships;
            ships_destroyed += token.apply_damage(share, armor);
        }
        fleet.tokens.retain(|t| t.quantity > 0);

        MineDamage {
            damage,
            ships_destroyed,
            fleet_destroyed: fleet.tokens.is_empty(),
        }
    }
}

/// The collaborators a turn generator calls.
pub struct Collaborators {
    /// Battle resolution.
    pub battle_engine: Box<dyn BattleEngine>,
    /// Ground combat.
    pub invasion_resolver: Box<dyn InvasionResolver>,
    /// Intel sink.
    pub discoverer: Box<dyn Discoverer>,
    /// Mine hit damage.
    pub mine_field_damager: Box<dyn MineFieldDamager>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            battle_engine: Box::new(AttritionBattleEngine),
            invasion_resolver: Box::new(GroundCombatInvasionResolver),
            discoverer: Box::new(DiscoveryLog),
            mine_field_damager: Box::new(StandardMineFieldDamager),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Engine;
    use crate::fleet::compute_fleet_spec;
    use crate::planet::Hab;
    use crate::player::Race;

    fn stack(fleet: u32, owner: u8, quantity: i64, armor: i64, power: i64) -> CombatStack {
        CombatStack {
            fleet: FleetId(fleet),
            token_index: 0,
            owner: PlayerId(owner),
            token: ShipToken::new(DesignId(1), quantity),
            armor,
            weapons_power: power,
        }
    }

    #[test]
    fn test_attrition_stronger_side_wins() {
        let mut battle = Battle {
            position: Vec2Fixed::ZERO,
            stacks: vec![stack(1, 0, 5, 100, 50), stack(2, 1, 2, 50, 10)],
            hostile_pairs: BTreeSet::from([(PlayerId(0), PlayerId(1))]),
        };
        let record = AttritionBattleEngine.fight(&mut battle, &mut Rules::default());
        assert!(!battle.stacks[1].alive());
        assert!(battle.stacks[0].alive());
        assert_eq!(record.ships_destroyed.get(&PlayerId(1)), Some(&2));
        assert_eq!(record.participants, vec![PlayerId(0), PlayerId(1)]);
        assert_eq!(record.rounds, 1);
    }

    #[test]
    fn test_friends_do_not_fight() {
        let mut battle = Battle {
            position: Vec2Fixed::ZERO,
            stacks: vec![stack(1, 0, 5, 100, 50), stack(2, 1, 2, 50, 10)],
            hostile_pairs: BTreeSet::new(),
        };
        let record = AttritionBattleEngine.fight(&mut battle, &mut Rules::default());
        assert_eq!(record.rounds, 0);
        assert!(record.ships_destroyed.is_empty());
    }

    #[test]
    fn test_invasion_success_and_failure() {
        let mut planet = Planet::new("Target", Vec2Fixed::ZERO, Hab::new(50, 50, 50));
        planet.owner = Some(PlayerId(1));
        planet.population = 1000;
        let invasion = PlanetInvasion {
            planet: planet.id,
            fleet: FleetId(1),
            attacker: PlayerId(0),
            colonists: 2000,
        };
        let outcome = GroundCombatInvasionResolver.resolve(&mut planet, &invasion);
        assert!(outcome.attacker_won);
        assert_eq!(outcome.defender, Some(PlayerId(1)));
        assert_eq!(planet.owner, Some(PlayerId(0)));
        assert_eq!(planet.population, 1200);

        planet.population = 10_000;
        let outcome = GroundCombatInvasionResolver.resolve(&mut planet, &invasion);
        assert!(!outcome.attacker_won);
        assert_eq!(planet.owner, Some(PlayerId(0)));
        assert_eq!(planet.population, 7800);
    }

    #[test]
    fn test_discovery_log_keeps_penetration() {
        let mut player = Player::new(PlayerId(0), "Ann", Race::default());
        let object = MapObjectRef::Fleet(FleetId(4));
        DiscoveryLog.discover(&mut player, object, true);
        DiscoveryLog.discover(&mut player, object, false);
        assert_eq!(player.discoveries.get(&object), Some(&true));
    }

    #[test]
    fn test_standard_mine_damage_spreads_over_ships() {
        let mut designs = Storage::new();
        let design = designs.insert_with(|id| ShipDesign {
            id,
            armor: 100,
            num_engines: 1,
            engine: Some(Engine::long_hump()),
            ..ShipDesign::default()
        });
        let mut fleet = Fleet::new(
            PlayerId(0),
            "Scouts",
            Vec2Fixed::ZERO,
            vec![ShipToken::new(design, 10)],
        );
        fleet.spec = compute_fleet_spec(&fleet.tokens, &designs);

        // 10 engines * 100 = 1000 damage over 10 ships of 100 armor.
        let result =
            StandardMineFieldDamager.damage_fleet(&mut fleet, &designs, &MineFieldStats::standard());
        assert_eq!(result.damage, 1000);
        assert_eq!(result.ships_destroyed, 10);
        assert!(result.fleet_destroyed);
    }

    #[test]
    fn test_speed_bump_deals_no_damage() {
        let designs = Storage::new();
        let mut fleet = Fleet::new(PlayerId(0), "A", Vec2Fixed::ZERO, vec![ShipToken::new(DesignId(1), 1)]);
        let result =
            StandardMineFieldDamager.damage_fleet(&mut fleet, &designs, &MineFieldStats::speed_bump());
        assert_eq!(result, MineDamage::default());
        assert_eq!(fleet.tokens.len(), 1);
    }
}
