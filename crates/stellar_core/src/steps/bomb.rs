//! Orbital bombardment of enemy planets.

use tracing::info;

use crate::fleet::Fleet;
use crate::ids::{FleetId, MapObjectRef, PlanetId};
use crate::math::Fixed;
use crate::message::MessageKind;
use crate::step::{Step, StepContext};

/// Colonists and structures one bombing run destroys before defenses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Payload {
    kill_tenths: i64,
    min_kill: i64,
    structure_kill: i64,
}

fn payload(fleet: &Fleet) -> Payload {
    fleet
        .spec
        .bombs
        .iter()
        .fold(Payload::default(), |acc, (bomb, count)| Payload {
            kill_tenths: acc.kill_tenths + bomb.kill_rate * count,
            min_kill: acc.min_kill + bomb.min_kill * count,
            structure_kill: acc.structure_kill + bomb.structure_kill * count,
        })
}

/// Fleets carrying bombs attack the enemy planet they orbit, unless a
/// starbase protects it.
#[derive(Debug, Default)]
pub struct BombStep;

impl BombStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for BombStep {
    fn name(&self) -> &'static str {
        "bomb"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let mut runs: Vec<(FleetId, PlanetId)> = Vec::new();
        for fleet in ctx.game.fleets.values() {
            if fleet.spec.starbase
                || fleet.spec.bombs.is_empty()
                || ctx.turn.is_pending_deletion(MapObjectRef::Fleet(fleet.id))
            {
                continue;
            }
            let Some(planet) = fleet.orbiting.and_then(|id| ctx.game.planets.get(id)) else {
                continue;
            };
            let Some(owner) = planet.owner else {
                continue;
            };
            if planet.starbase.is_none() && !ctx.game.is_friend(fleet.owner, owner) {
                runs.push((fleet.id, planet.id));
            }
        }

        for (fleet, planet) in runs {
            bomb(ctx, fleet, planet);
        }
    }

    fn recompute_specs_after(&self) -> bool {
        true
    }
}

fn bomb(ctx: &mut StepContext<'_>, fleet_id: FleetId, planet_id: PlanetId) {
    let Some(fleet) = ctx.game.fleets.get(fleet_id) else {
        return;
    };
    let attacker = fleet.owner;
    let load = payload(fleet);
    let Some(planet) = ctx.game.planets.get_mut(planet_id) else {
        return;
    };
    let Some(defender) = planet.owner else {
        return;
    };

    let shielded = Fixed::ONE - planet.spec.defense_coverage;
    let scale = |amount: i64| (Fixed::from_num(amount) * shielded).to_num::<i64>();
    let raw_kill = (i128::from(planet.population) * i128::from(load.kill_tenths) / 1000) as i64;
    let killed = scale(raw_kill).max(scale(load.min_kill)).min(planet.population);

    let structures = scale(load.structure_kill);
    let (share, extra) = (structures / 3, structures % 3);
    let mut destroyed = [0_i64; 3];
    for (i, (count, lost)) in [&mut planet.mines, &mut planet.factories, &mut planet.defenses]
        .into_iter()
        .zip(destroyed.iter_mut())
        .enumerate()
    {
        let hit = share + i64::from((i as i64) < extra);
        *lost = hit.min(*count);
        *count -= *lost;
    }

    planet.population -= killed;
    let depopulated = planet.population == 0;
    if depopulated {
        planet.depopulate();
    }
    let text = format!(
        "{fleet_id} bombed {} killing {killed} colonists, {} mines, {} factories and {} defenses",
        planet.name, destroyed[0], destroyed[1], destroyed[2]
    );
    info!(fleet = %fleet_id, planet = %planet_id, killed, ?destroyed, "Planet bombed");

    let target = Some(MapObjectRef::Planet(planet_id));
    ctx.game
        .message(attacker, MessageKind::PlanetBombed, text.clone(), target);
    ctx.game.message(defender, MessageKind::PlanetBombed, text, target);
    if depopulated {
        ctx.game.message(
            defender,
            MessageKind::PlanetDepopulated,
            format!("{planet_id} lost its entire population"),
            target,
        );
    }
    ctx.game.recompute_planet_spec(planet_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Bomb, HullKind, ShipDesign};
    use crate::ids::{DesignId, PlayerId};
    use crate::player::Relation;
    use crate::steps::test_support::TestUniverse;

    fn bomber(u: &mut TestUniverse, owner: PlayerId) -> DesignId {
        u.game.add_design(ShipDesign {
            owner,
            name: "Bomber".to_string(),
            armor: 50,
            bombs: vec![Bomb {
                kill_rate: 6,
                min_kill: 300,
                structure_kill: 2,
            }],
            ..ShipDesign::default()
        })
    }

    fn fortify(u: &mut TestUniverse) {
        let home = u.game.planets.get_mut(u.home).unwrap();
        home.mines = 30;
        home.factories = 30;
        u.game.recompute_specs();
    }

    #[test]
    fn test_bombers_kill_colonists_and_structures() {
        let mut u = TestUniverse::new();
        fortify(&mut u);
        let bob = u.bob;
        let design = bomber(&mut u, bob);
        u.fleet_at_planet(u.bob, design, 10, u.home);

        u.run(&mut BombStep::new());

        let home = u.game.planets.get(u.home).unwrap();
        // 6% of 100,000 beats the 3,000 minimum.
        assert_eq!(home.population, 94_000);
        assert_eq!((home.mines, home.factories, home.defenses), (23, 23, 0));
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::PlanetBombed), 1);
        assert_eq!(u.game.player(u.bob).unwrap().count_messages(MessageKind::PlanetBombed), 1);
    }

    #[test]
    fn test_minimum_kill_applies_to_small_colonies() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().population = 10_000;
        let bob = u.bob;
        let design = bomber(&mut u, bob);
        u.fleet_at_planet(u.bob, design, 10, u.home);

        u.run(&mut BombStep::new());

        assert_eq!(u.game.planets.get(u.home).unwrap().population, 7_000);
    }

    #[test]
    fn test_defenses_reduce_bomb_damage() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().defenses = 100;
        u.game.recompute_specs();
        let bob = u.bob;
        let design = bomber(&mut u, bob);
        u.fleet_at_planet(u.bob, design, 10, u.home);

        u.run(&mut BombStep::new());

        let home = u.game.planets.get(u.home).unwrap();
        assert!(home.population > 94_000);
        assert!(home.population < 100_000);
    }

    #[test]
    fn test_starbase_shields_planet() {
        let mut u = TestUniverse::new();
        let station = u.game.add_design(ShipDesign {
            owner: u.ann,
            name: "Station".to_string(),
            hull: HullKind::Starbase,
            armor: 500,
            ..ShipDesign::default()
        });
        u.game.add_starbase(u.home, station).unwrap();
        let bob = u.bob;
        let design = bomber(&mut u, bob);
        u.fleet_at_planet(u.bob, design, 10, u.home);

        u.run(&mut BombStep::new());

        assert_eq!(u.game.planets.get(u.home).unwrap().population, 100_000);
    }

    #[test]
    fn test_friends_do_not_bomb() {
        let mut u = TestUniverse::new();
        u.game
            .player_mut(u.bob)
            .unwrap()
            .relations
            .insert(u.ann, Relation::Friend);
        let bob = u.bob;
        let design = bomber(&mut u, bob);
        u.fleet_at_planet(u.bob, design, 10, u.home);

        u.run(&mut BombStep::new());

        assert_eq!(u.game.planets.get(u.home).unwrap().population, 100_000);
    }
}
