//! Battles between hostile fleets sharing a location.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::collaborators::{Battle, CombatStack};
use crate::ids::{FleetId, MapObjectRef, PlayerId};
use crate::math::Vec2Fixed;
use crate::message::MessageKind;
use crate::step::{Step, StepContext};

/// Finds every location where hostile players meet and lets the battle
/// engine resolve it.
#[derive(Debug, Default)]
pub struct BattleStep;

impl BattleStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn position_key(position: Vec2Fixed) -> (i64, i64) {
    (position.x.to_bits(), position.y.to_bits())
}

impl Step for BattleStep {
    fn name(&self) -> &'static str {
        "battle"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let mut locations: BTreeMap<(i64, i64), Vec<FleetId>> = BTreeMap::new();
        for fleet in ctx.game.fleets.values() {
            if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(fleet.id)) {
                continue;
            }
            locations
                .entry(position_key(fleet.position))
                .or_default()
                .push(fleet.id);
        }

        for fleets in locations.into_values() {
            if let Some(battle) = form_battle(ctx, &fleets) {
                fight(ctx, battle);
            }
        }
    }

    fn recompute_specs_after(&self) -> bool {
        true
    }
}

/// A battle among `fleets`, if two mutually unfriendly players are present
/// and at least one of them is armed.
fn form_battle(ctx: &StepContext<'_>, fleets: &[FleetId]) -> Option<Battle> {
    let game = &*ctx.game;
    let mut owners: BTreeMap<PlayerId, bool> = BTreeMap::new();
    for fleet in fleets.iter().filter_map(|id| game.fleets.get(*id)) {
        *owners.entry(fleet.owner).or_insert(false) |= fleet.spec.armed();
    }

    let mut hostile_pairs = BTreeSet::new();
    for (a, a_armed) in &owners {
        for (b, b_armed) in owners.range(*a..).skip(1) {
            let enemies = !game.is_friend(*a, *b) && !game.is_friend(*b, *a);
            if enemies && (*a_armed || *b_armed) {
                hostile_pairs.insert((*a, *b));
            }
        }
    }
    if hostile_pairs.is_empty() {
        return None;
    }
    let fighting: BTreeSet<PlayerId> = hostile_pairs.iter().flat_map(|(a, b)| [*a, *b]).collect();

    let mut stacks = Vec::new();
    let mut position = Vec2Fixed::ZERO;
    for fleet in fleets.iter().filter_map(|id| game.fleets.get(*id)) {
        position = fleet.position;
        if !fighting.contains(&fleet.owner) {
            continue;
        }
        for (token_index, token) in fleet.tokens.iter().enumerate() {
            let (armor, weapons_power) = game
                .designs
                .get(token.design)
                .map_or((0, 0), |d| (d.armor, d.weapons_power));
            stacks.push(CombatStack {
                fleet: fleet.id,
                token_index,
                owner: fleet.owner,
                token: token.clone(),
                armor,
                weapons_power,
            });
        }
    }
    Some(Battle {
        position,
        stacks,
        hostile_pairs,
    })
}

fn fight(ctx: &mut StepContext<'_>, mut battle: Battle) {
    let record = ctx
        .collaborators
        .battle_engine
        .fight(&mut battle, &mut ctx.game.rules);
    info!(position = ?record.position, rounds = record.rounds, losses = ?record.ships_destroyed, "Battle");

    let touched: BTreeSet<FleetId> = battle.stacks.iter().map(|s| s.fleet).collect();
    for stack in battle.stacks {
        if let Some(token) = ctx
            .game
            .fleets
            .get_mut(stack.fleet)
            .and_then(|f| f.tokens.get_mut(stack.token_index))
        {
            *token = stack.token;
        }
    }

    for id in touched {
        let Some(fleet) = ctx.game.fleets.get_mut(id) else {
            continue;
        };
        fleet.tokens.retain(|t| t.quantity > 0);
        let owner = fleet.owner;
        if fleet.tokens.is_empty() {
            debug!(fleet = %id, "Destroyed in battle");
            ctx.turn.queue_deletion(MapObjectRef::Fleet(id));
            ctx.game.message(
                owner,
                MessageKind::FleetDestroyed,
                format!("{id} was destroyed in battle"),
                Some(MapObjectRef::Fleet(id)),
            );
        } else {
            ctx.game.recompute_fleet_spec(id);
        }
    }

    for player in &record.participants {
        let lost = record.ships_destroyed.get(player).copied().unwrap_or(0);
        let text = format!(
            "Battle at ({}, {}) lasted {} rounds; you lost {lost} ships",
            record.position.x, record.position.y, record.rounds
        );
        ctx.game.message(*player, MessageKind::Battle, text, None);
    }
    ctx.turn.battles.push(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::ShipDesign;
    use crate::player::Relation;
    use crate::steps::test_support::TestUniverse;

    fn warship(u: &mut TestUniverse, owner: PlayerId) -> crate::ids::DesignId {
        u.game.add_design(ShipDesign {
            owner,
            name: "Destroyer".to_string(),
            armor: 100,
            weapons_power: 60,
            ..ShipDesign::default()
        })
    }

    #[test]
    fn test_armed_fleet_destroys_freighters() {
        let mut u = TestUniverse::new();
        let bob = u.bob;
        let ship = warship(&mut u, bob);
        let at = Vec2Fixed::from_ints(500, 500);
        let raider = u.fleet_in_space(u.bob, ship, 2, at);
        let victim = u.fleet_in_space(u.ann, u.freighter, 3, at);

        u.run(&mut BattleStep::new());

        assert!(!u.game.fleets.contains(victim));
        assert!(u.game.fleets.contains(raider));
        assert_eq!(u.turn.battles.len(), 1);
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::Battle), 1);
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::FleetDestroyed), 1);
    }

    #[test]
    fn test_unarmed_fleets_do_not_fight() {
        let mut u = TestUniverse::new();
        let at = Vec2Fixed::from_ints(500, 500);
        u.fleet_in_space(u.bob, u.freighter, 1, at);
        u.fleet_in_space(u.ann, u.freighter, 1, at);

        u.run(&mut BattleStep::new());

        assert!(u.turn.battles.is_empty());
    }

    #[test]
    fn test_one_sided_friendship_prevents_battle() {
        let mut u = TestUniverse::new();
        u.game
            .player_mut(u.ann)
            .unwrap()
            .relations
            .insert(u.bob, Relation::Friend);
        let bob = u.bob;
        let ship = warship(&mut u, bob);
        let at = Vec2Fixed::from_ints(500, 500);
        u.fleet_in_space(u.bob, ship, 1, at);
        let ann = u.fleet_in_space(u.ann, u.freighter, 1, at);

        u.run(&mut BattleStep::new());

        assert!(u.turn.battles.is_empty());
        assert!(u.game.fleets.contains(ann));
    }

    #[test]
    fn test_separate_locations_do_not_fight() {
        let mut u = TestUniverse::new();
        let bob = u.bob;
        let ship = warship(&mut u, bob);
        u.fleet_in_space(u.bob, ship, 1, Vec2Fixed::from_ints(500, 500));
        u.fleet_in_space(u.ann, u.freighter, 1, Vec2Fixed::from_ints(501, 500));

        u.run(&mut BattleStep::new());

        assert!(u.turn.battles.is_empty());
    }
}
