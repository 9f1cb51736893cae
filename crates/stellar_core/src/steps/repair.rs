//! Armor repair.

use tracing::trace;

use crate::fleet::Fleet;
use crate::game::Game;
use crate::ids::FleetId;
use crate::rules::RepairRules;
use crate::step::{Step, StepContext};

/// Repairs damaged ships by a share of their design armor each year.
#[derive(Debug, Default)]
pub struct FleetRepairStep;

impl FleetRepairStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Yearly repair rate in percent of design armor for `fleet`.
fn repair_percent(game: &Game, fleet: &Fleet, moved: bool, rules: &RepairRules) -> i64 {
    if fleet.is_starbase() {
        return rules.starbase_percent;
    }
    if moved {
        return rules.moving_percent;
    }
    match fleet.orbiting.and_then(|id| game.planets.get(id)) {
        Some(planet) if planet.owner == Some(fleet.owner) && planet.spec.has_dock => {
            rules.starbase_percent
        }
        Some(_) => rules.orbiting_percent,
        None => rules.stationary_percent,
    }
}

impl Step for FleetRepairStep {
    fn name(&self) -> &'static str {
        "fleet_repair"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let game = &*ctx.game;
        let moved = &ctx.turn.moved_fleets;
        let damaged: Vec<(FleetId, i64)> = game
            .fleets
            .values()
            .filter(|f| f.tokens.iter().any(|t| t.damage > 0))
            .map(|f| (f.id, repair_percent(game, f, moved.contains(&f.id), &game.rules.repair)))
            .collect();

        let game = &mut *ctx.game;
        for (id, percent) in damaged {
            let Some(fleet) = game.fleets.get_mut(id) else {
                continue;
            };
            for token in fleet.tokens.iter_mut().filter(|t| t.damage > 0) {
                let armor = game.designs.get(token.design).map_or(0, |d| d.armor);
                let repaired = (armor * token.quantity * percent / 100).max(1);
                token.damage = (token.damage - repaired).max(0);
            }
            trace!(fleet = %id, percent, "Repaired");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{HullKind, ShipDesign};
    use crate::math::Vec2Fixed;
    use crate::planet::{Hab, Planet};
    use crate::steps::test_support::TestUniverse;

    fn damage(u: &mut TestUniverse, fleet: FleetId, amount: i64) {
        u.game.fleets.get_mut(fleet).unwrap().tokens[0].damage = amount;
    }

    fn damage_of(u: &TestUniverse, fleet: FleetId) -> i64 {
        u.game.fleets.get(fleet).unwrap().tokens[0].damage
    }

    #[test]
    fn test_repair_rates_by_situation() {
        let mut u = TestUniverse::new();
        let rock = u
            .game
            .add_planet(Planet::new("Rock", Vec2Fixed::from_ints(300, 300), Hab::new(50, 50, 50)));
        // Armor 20 per ship, 10 ships: 200 armor in the stack.
        let deep = u.fleet_in_space(u.ann, u.freighter, 10, Vec2Fixed::from_ints(700, 700));
        let orbit = u.fleet_at_planet(u.ann, u.freighter, 10, rock);
        let moving = u.fleet_in_space(u.ann, u.freighter, 10, Vec2Fixed::from_ints(800, 800));
        for id in [deep, orbit, moving] {
            damage(&mut u, id, 100);
        }
        u.turn.moved_fleets.insert(moving);

        u.run(&mut FleetRepairStep::new());

        assert_eq!(damage_of(&u, deep), 96);
        assert_eq!(damage_of(&u, orbit), 94);
        assert_eq!(damage_of(&u, moving), 98);
    }

    #[test]
    fn test_dock_starbase_repairs_fastest() {
        let mut u = TestUniverse::new();
        let dock = u.game.add_design(ShipDesign {
            owner: u.ann,
            name: "Dock".to_string(),
            hull: HullKind::Starbase,
            armor: 1000,
            dock: true,
            ..ShipDesign::default()
        });
        let starbase = u.game.add_starbase(u.home, dock).unwrap();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 10, u.home);
        damage(&mut u, fleet, 100);
        damage(&mut u, starbase, 500);

        u.run(&mut FleetRepairStep::new());

        assert_eq!(damage_of(&u, fleet), 80);
        assert_eq!(damage_of(&u, starbase), 400);
    }

    #[test]
    fn test_repair_never_goes_negative() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_in_space(u.ann, u.freighter, 10, Vec2Fixed::from_ints(700, 700));
        damage(&mut u, fleet, 1);

        u.run(&mut FleetRepairStep::new());

        assert_eq!(damage_of(&u, fleet), 0);
    }
}
