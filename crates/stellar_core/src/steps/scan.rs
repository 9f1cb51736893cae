//! Scanner sweeps feeding the discoverer.

use std::collections::BTreeMap;

use tracing::debug;

use crate::game::Game;
use crate::ids::{MapObjectRef, PlayerId};
use crate::map_object::MapObject;
use crate::math::{Fixed, Vec2Fixed};
use crate::step::{Step, StepContext};

/// A scanner: position, normal range and penetrating range in ly.
type Scanner = (Vec2Fixed, i64, i64);

fn scanners(game: &Game) -> BTreeMap<PlayerId, Vec<Scanner>> {
    let mut scanners: BTreeMap<PlayerId, Vec<Scanner>> = BTreeMap::new();
    for planet in game.planets.values() {
        if let Some(owner) = planet.owner {
            scanners.entry(owner).or_default().push((
                planet.position,
                planet.spec.scan_range,
                planet.spec.pen_scan_range,
            ));
        }
    }
    for fleet in game.fleets.values() {
        if fleet.spec.scan_range > 0 || fleet.spec.pen_scan_range > 0 {
            scanners.entry(fleet.owner).or_default().push((
                fleet.position,
                fleet.spec.scan_range,
                fleet.spec.pen_scan_range,
            ));
        }
    }
    scanners
}

fn objects(game: &Game) -> Vec<(MapObjectRef, Vec2Fixed, Option<PlayerId>)> {
    fn entry(o: &impl MapObject) -> (MapObjectRef, Vec2Fixed, Option<PlayerId>) {
        (o.object_ref(), o.position(), o.owner())
    }
    let mut all = Vec::new();
    all.extend(game.planets.values().map(entry));
    all.extend(game.fleets.values().map(entry));
    all.extend(game.mine_fields.values().map(entry));
    all.extend(game.packets.values().map(entry));
    all.extend(game.salvage.values().map(entry));
    all.extend(game.wormholes.values().map(entry));
    all
}

fn within(a: Vec2Fixed, b: Vec2Fixed, range: i64) -> bool {
    range > 0 && a.distance(b) <= Fixed::from_num(range)
}

/// Every player discovers the foreign objects inside its scanner ranges.
#[derive(Debug, Default)]
pub struct ScanStep;

impl ScanStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for ScanStep {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let scanners = scanners(ctx.game);
        let objects = objects(ctx.game);

        for (player_id, sources) in scanners {
            let Some(player) = ctx.game.players.get_mut(&player_id) else {
                continue;
            };
            let mut seen = 0;
            for (object, position, owner) in &objects {
                if *owner == Some(player_id) {
                    continue;
                }
                let penetrating = sources.iter().any(|(at, _, pen)| within(*at, *position, *pen));
                if penetrating || sources.iter().any(|(at, range, _)| within(*at, *position, *range)) {
                    ctx.collaborators.discoverer.discover(player, *object, penetrating);
                    seen += 1;
                }
            }
            debug!(player = %player_id, seen, "Scanned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::{Hab, Planet};
    use crate::steps::test_support::TestUniverse;

    #[test]
    fn test_planet_scanner_sees_nearby_fleets() {
        let mut u = TestUniverse::new();
        let near = u.fleet_in_space(u.bob, u.freighter, 1, Vec2Fixed::from_ints(130, 100));
        let far = u.fleet_in_space(u.bob, u.freighter, 1, Vec2Fixed::from_ints(400, 400));

        u.run(&mut ScanStep::new());

        let ann = u.game.player(u.ann).unwrap();
        assert_eq!(ann.discoveries.get(&MapObjectRef::Fleet(near)), Some(&false));
        assert!(!ann.discoveries.contains_key(&MapObjectRef::Fleet(far)));
        assert!(!ann.discoveries.contains_key(&MapObjectRef::Planet(u.home)));
    }

    #[test]
    fn test_penetrating_scanner_marks_discovery() {
        let mut u = TestUniverse::new();
        u.game.rules.scanning.planet_pen_scan_range = 40;
        let rock = u
            .game
            .add_planet(Planet::new("Rock", Vec2Fixed::from_ints(130, 100), Hab::new(50, 50, 50)));
        u.game.recompute_specs();

        u.run(&mut ScanStep::new());

        let ann = u.game.player(u.ann).unwrap();
        assert_eq!(ann.discoveries.get(&MapObjectRef::Planet(rock)), Some(&true));
    }

    #[test]
    fn test_players_without_scanners_see_nothing() {
        let mut u = TestUniverse::new();
        u.run(&mut ScanStep::new());
        assert!(u.game.player(u.bob).unwrap().discoveries.is_empty());
    }
}
