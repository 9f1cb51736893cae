//! Fleet movement, fuel use and mine field collisions.

use tracing::{debug, error, warn};

use crate::design::Engine;
use crate::fleet::WaypointTask;
use crate::ids::{FleetId, MapObjectRef, MineFieldId};
use crate::math::{segment_circle_span, Fixed, Vec2Fixed};
use crate::message::MessageKind;
use crate::step::{Step, StepContext};

/// How one year of travel splits between the ordered warp and the free
/// speed a fleet falls back to when its tank runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Leg {
    warp: u8,
    warp_distance: Fixed,
    free_distance: Fixed,
    out_of_fuel: bool,
}

impl Leg {
    fn total(&self) -> Fixed {
        self.warp_distance + self.free_distance
    }
}

fn warp_speed(warp: u8) -> Fixed {
    let warp = i32::from(warp);
    Fixed::from_num(warp * warp)
}

fn plan_leg(engine: &Engine, mass: i64, fuel: i64, warp: u8, distance: Fixed) -> Leg {
    let speed = warp_speed(warp);
    let reach = distance.min(speed);
    if engine.fuel_cost(mass, reach, warp) <= fuel {
        return Leg {
            warp,
            warp_distance: reach,
            free_distance: Fixed::ZERO,
            out_of_fuel: false,
        };
    }

    let affordable = engine.range(mass, fuel, warp).unwrap_or(reach).min(reach);
    let year_left = if speed > Fixed::ZERO {
        (Fixed::ONE - affordable / speed).max(Fixed::ZERO)
    } else {
        Fixed::ZERO
    };
    let free_reach = warp_speed(engine.free_speed()).saturating_mul(year_left);
    Leg {
        warp,
        warp_distance: affordable,
        free_distance: free_reach.min(distance - affordable).max(Fixed::ZERO),
        out_of_fuel: true,
    }
}

/// Fuel burned and scooped for travelling `travelled` of a planned leg.
fn fuel_change(engine: &Engine, mass: i64, fuel: i64, leg: &Leg, travelled: Fixed) -> (i64, i64) {
    let at_warp = travelled.min(leg.warp_distance);
    let burned = engine.fuel_cost(mass, at_warp, leg.warp).min(fuel);
    let scooped = if !engine.ram_scoop {
        0
    } else if leg.warp <= engine.free_speed() {
        travelled.to_num::<i64>()
    } else {
        (travelled - at_warp).max(Fixed::ZERO).to_num::<i64>()
    };
    (burned, scooped)
}

/// Moves every fleet with somewhere to go.
#[derive(Debug, Default)]
pub struct FleetMoveStep;

impl FleetMoveStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for FleetMoveStep {
    fn name(&self) -> &'static str {
        "fleet_move"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        for id in ctx.game.fleets.sorted_ids() {
            if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(id)) {
                continue;
            }
            move_fleet(ctx, id);
        }
    }
}

/// Point waypoint 1 at its target's current position, falling back to the
/// last known position if the target is gone. Returns the destination.
fn resolve_destination(ctx: &mut StepContext<'_>, id: FleetId) -> Option<Vec2Fixed> {
    let next = ctx.game.fleets.get(id)?.waypoints.get(1)?;
    let (position, missing) = match next.target {
        Some(target) if ctx.game.contains(target) && !ctx.turn.is_pending_deletion(target) => {
            (ctx.game.object_position(target).unwrap_or(next.position), None)
        }
        Some(target) => (next.position, Some(target)),
        None => (next.position, None),
    };
    let waypoint = ctx.game.fleets.get_mut(id)?.waypoints.get_mut(1)?;
    if let Some(target) = missing {
        debug!(fleet = %id, target = %target, "Waypoint target is gone; heading for its last position");
        waypoint.original_target = waypoint.original_target.or(Some(target));
        waypoint.original_position = waypoint.original_position.or(Some(waypoint.position));
        waypoint.target = None;
    }
    waypoint.position = position;
    Some(position)
}

fn move_fleet(ctx: &mut StepContext<'_>, id: FleetId) {
    let Some(fleet) = ctx.game.fleets.get(id) else {
        return;
    };
    if fleet.is_starbase() || fleet.waypoints.len() < 2 {
        return;
    }
    if fleet.waypoints[0].wait_at_waypoint {
        debug!(fleet = %id, "Waiting at waypoint");
        return;
    }
    let Some(engine) = fleet.spec.engine else {
        debug!(fleet = %id, "Fleet cannot move");
        return;
    };
    let warp = fleet.waypoints[1].warp;
    if warp == 0 {
        return;
    }
    let Some(dest) = resolve_destination(ctx, id) else {
        return;
    };

    let Some(fleet) = ctx.game.fleets.get(id) else {
        return;
    };
    let owner = fleet.owner;
    let start = fleet.position;
    let mass = fleet.total_mass();
    let fuel = fleet.fuel;
    let distance = start.distance(dest);
    let leg = plan_leg(&engine, mass, fuel, warp, distance);

    let hit = mine_collision(ctx, id, start, dest, leg.total(), warp);
    if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(id)) {
        return;
    }
    let travelled = hit.unwrap_or_else(|| leg.total());
    let (burned, scooped) = fuel_change(&engine, mass, fuel, &leg, travelled);
    let position = start.move_toward(dest, travelled);
    let arrived = position == dest;

    if let Some(fleet) = ctx.game.fleets.get_mut(id) {
        fleet.fuel -= burned;
        if scooped > 0 {
            fleet.fuel = (fleet.fuel + scooped).min(fleet.spec.fuel_capacity.max(fleet.fuel));
        }
        fleet.position = position;
        if travelled > Fixed::ZERO {
            fleet.orbiting = None;
        }
    }
    if travelled > Fixed::ZERO {
        ctx.turn.moved_fleets.insert(id);
    }
    if leg.out_of_fuel {
        warn!(fleet = %id, "Fleet ran out of fuel");
        ctx.game.message(
            owner,
            MessageKind::FleetOutOfFuel,
            format!("{id} has run out of fuel"),
            Some(MapObjectRef::Fleet(id)),
        );
    }

    if arrived {
        arrive(ctx, id);
    } else if travelled > Fixed::ZERO {
        depart(ctx, id, position);
    } else {
        debug!(fleet = %id, "Fleet did not move, keeping waypoint orders");
    }
}

/// The fleet is somewhere between waypoints 0 and 1. Waypoint 0 becomes a
/// plain marker at the current position.
fn depart(ctx: &mut StepContext<'_>, id: FleetId, position: Vec2Fixed) {
    let Some(fleet) = ctx.game.fleets.get(id) else {
        return;
    };
    let first = &fleet.waypoints[0];
    let repeat = (fleet.repeat_orders && !first.partially_complete).then(|| first.restored());
    if let Some(waypoint) = repeat {
        let again = ctx.game.reissue_waypoint(&waypoint);
        if let Some(fleet) = ctx.game.fleets.get_mut(id) {
            fleet.waypoints.push(again);
        }
    }
    if let Some(first) = ctx.game.fleets.get_mut(id).and_then(|f| f.waypoints.first_mut()) {
        first.target = None;
        first.position = position;
        first.task = WaypointTask::None;
        first.wait_at_waypoint = false;
        first.partially_complete = true;
    }
}

/// The fleet reached waypoint 1.
fn arrive(ctx: &mut StepContext<'_>, id: FleetId) {
    let Some(fleet) = ctx.game.fleets.get_mut(id) else {
        return;
    };
    let consumed = fleet.waypoints.remove(0);
    let owner = fleet.owner;
    if fleet.repeat_orders && !consumed.partially_complete {
        let again = ctx.game.reissue_waypoint(&consumed.restored());
        if let Some(fleet) = ctx.game.fleets.get_mut(id) {
            fleet.waypoints.push(again);
        }
    }

    let target = ctx
        .game
        .fleets
        .get(id)
        .and_then(|f| f.waypoints.first())
        .and_then(|wp| wp.target);

    if let Some(MapObjectRef::Wormhole(entry)) = target {
        let exit = ctx
            .game
            .wormholes
            .get(entry)
            .and_then(|w| w.companion)
            .and_then(|c| ctx.game.wormholes.get(c))
            .map(|w| (w.id, w.position));
        if let Some((exit, position)) = exit {
            if let Some(fleet) = ctx.game.fleets.get_mut(id) {
                fleet.position = position;
                if let Some(first) = fleet.waypoints.first_mut() {
                    first.position = position;
                    first.target = Some(MapObjectRef::Wormhole(exit));
                }
            }
            debug!(fleet = %id, entry = %entry, exit = %exit, "Wormhole jump");
            ctx.game.message(
                owner,
                MessageKind::WormholeTravelled,
                format!("{id} travelled through {entry} to {exit}"),
                Some(MapObjectRef::Wormhole(exit)),
            );
        }
    }

    let Some(position) = ctx.game.fleets.get(id).map(|f| f.position) else {
        return;
    };
    let orbiting = target
        .and_then(MapObjectRef::as_planet)
        .filter(|p| ctx.game.planets.get(*p).is_some_and(|p| p.position == position))
        .or_else(|| ctx.game.planet_at(position));
    let refuel = orbiting
        .and_then(|p| ctx.game.planets.get(p))
        .is_some_and(|p| p.owned_by(owner) && p.starbase.is_some());

    if let Some(fleet) = ctx.game.fleets.get_mut(id) {
        fleet.orbiting = orbiting;
        if refuel {
            fleet.refuel();
        }
    }
    debug!(fleet = %id, ?orbiting, refuel, "Fleet arrived");
}

/// Roll for mine hits along the path. Returns the distance at which the
/// fleet was stopped, if it was.
fn mine_collision(
    ctx: &mut StepContext<'_>,
    id: FleetId,
    start: Vec2Fixed,
    dest: Vec2Fixed,
    travel: Fixed,
    warp: u8,
) -> Option<Fixed> {
    if travel <= Fixed::ZERO {
        return None;
    }
    let owner = ctx.game.fleets.get(id)?.owner;
    let end = start.move_toward(dest, travel);

    let mut crossings: Vec<(Fixed, Fixed, MineFieldId)> = Vec::new();
    for field in ctx.game.mine_fields.values() {
        if ctx.game.is_friend(field.owner, owner)
            || ctx.turn.is_pending_deletion(MapObjectRef::MineField(field.id))
        {
            continue;
        }
        let Some(stats) = ctx.game.rules.mine_field_stats(field.field_type) else {
            error!(mine_field = %field.id, field_type = ?field.field_type, "No stats for mine field type");
            continue;
        };
        if warp <= stats.safe_warp {
            continue;
        }
        if let Some((enter, exit)) = segment_circle_span(start, end, field.position, field.radius()) {
            crossings.push((enter, exit, field.id));
        }
    }
    crossings.sort();

    for (enter, exit, field_id) in crossings {
        let Some((field_type, field_owner)) = ctx.game.mine_fields.get(field_id).map(|f| (f.field_type, f.owner)) else {
            continue;
        };
        let Some(stats) = ctx.game.rules.mine_field_stats(field_type).copied() else {
            continue;
        };
        let chance = stats
            .hit_chance
            .saturating_mul(u32::from(warp - stats.safe_warp));
        let mut at = enter;
        let mut hit = None;
        while at <= exit {
            if ctx.game.rules.roll_basis_points(chance) {
                hit = Some(at);
                break;
            }
            at += Fixed::ONE;
        }
        let Some(at) = hit else {
            continue;
        };

        let game = &mut *ctx.game;
        let Some(fleet) = game.fleets.get_mut(id) else {
            return Some(at);
        };
        let damage = ctx
            .collaborators
            .mine_field_damager
            .damage_fleet(fleet, &game.designs, &stats);

        let divisor = game.rules.mine_fields.impact_reduction_divisor;
        let min_reduction = game.rules.mine_fields.min_impact_reduction;
        let threshold = game.rules.mine_fields.removal_threshold;
        if let Some(field) = game.mine_fields.get_mut(field_id) {
            let reduction = field
                .num_mines
                .checked_div(divisor)
                .unwrap_or(0)
                .max(min_reduction);
            field.remove_mines(reduction);
            if field.num_mines <= threshold {
                ctx.turn.queue_deletion(MapObjectRef::MineField(field_id));
            }
        }

        debug!(fleet = %id, mine_field = %field_id, damage = damage.damage, "Mine hit");
        let text = format!(
            "{id} hit {field_id}, took {} damage and lost {} ships",
            damage.damage, damage.ships_destroyed
        );
        game.message(owner, MessageKind::MineFieldHit, text.clone(), Some(MapObjectRef::Fleet(id)));
        game.message(field_owner, MessageKind::MineFieldHit, text, Some(MapObjectRef::MineField(field_id)));

        if damage.fleet_destroyed {
            ctx.turn.queue_deletion(MapObjectRef::Fleet(id));
            game.message(
                owner,
                MessageKind::FleetDestroyed,
                format!("{id} was destroyed in {field_id}"),
                Some(MapObjectRef::MineField(field_id)),
            );
        } else {
            game.recompute_fleet_spec(id);
        }
        return Some(at);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::CargoType;
    use crate::design::ShipDesign;
    use crate::fleet::{TransportAction, TransportTasks};
    use crate::map_object::Wormhole;
    use crate::mine_field::{MineField, MineFieldStats, MineFieldType};
    use crate::planet::{Hab, Planet};
    use crate::steps::test_support::TestUniverse;

    fn send(u: &mut TestUniverse, fleet: FleetId, target: Option<MapObjectRef>, position: Vec2Fixed, warp: u8) {
        u.game
            .add_waypoint(fleet, target, position, warp, WaypointTask::None)
            .unwrap();
    }

    #[test]
    fn test_plan_leg_within_fuel() {
        let leg = plan_leg(&Engine::long_hump(), 50, 500, 6, Fixed::from_num(30));
        assert_eq!(leg.total(), Fixed::from_num(30));
        assert!(!leg.out_of_fuel);
    }

    #[test]
    fn test_plan_leg_falls_back_to_free_speed() {
        let leg = plan_leg(&Engine::long_hump(), 50, 0, 5, Fixed::from_num(100));
        assert!(leg.out_of_fuel);
        assert_eq!(leg.warp_distance, Fixed::ZERO);
        // Warp 1 for the whole year.
        assert_eq!(leg.free_distance, Fixed::ONE);
    }

    #[test]
    fn test_arrival_burns_fuel_and_orbits() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        let target = u
            .game
            .add_planet(Planet::new("Near", Vec2Fixed::from_ints(130, 100), Hab::new(50, 50, 50)));
        send(&mut u, fleet, Some(MapObjectRef::Planet(target)), Vec2Fixed::ZERO, 6);

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.position, Vec2Fixed::from_ints(130, 100));
        assert_eq!(f.waypoints.len(), 1);
        assert_eq!(f.orbiting, Some(target));
        // ceil(50 kT * 30 ly * 105 / 10000) = 16.
        assert_eq!(f.fuel, 484);
        assert!(u.turn.moved_fleets.contains(&fleet));
    }

    #[test]
    fn test_partial_move_leaves_marker() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        send(&mut u, fleet, None, Vec2Fixed::from_ints(200, 100), 5);

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.position, Vec2Fixed::from_ints(125, 100));
        assert_eq!(f.waypoints.len(), 2);
        assert!(f.waypoints[0].partially_complete);
        assert_eq!(f.waypoints[0].position, f.position);
        assert!(f.orbiting.is_none());
    }

    #[test]
    fn test_out_of_fuel_creeps_and_messages() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game.fleets.get_mut(fleet).unwrap().fuel = 0;
        send(&mut u, fleet, None, Vec2Fixed::from_ints(200, 100), 5);

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.position, Vec2Fixed::from_ints(101, 100));
        assert_eq!(f.fuel, 0);
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::FleetOutOfFuel), 1);
    }

    #[test]
    fn test_repeat_orders_reappend_waypoint() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game.fleets.get_mut(fleet).unwrap().repeat_orders = true;
        send(&mut u, fleet, None, Vec2Fixed::from_ints(110, 100), 5);
        let first_id = u.game.fleets.get(fleet).unwrap().waypoints[0].id;

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.waypoints.len(), 2);
        assert_eq!(f.waypoints[1].target, Some(MapObjectRef::Planet(u.home)));
        assert_ne!(f.waypoints[1].id, first_id);
    }

    #[test]
    fn test_missing_target_falls_back_to_last_position() {
        let mut u = TestUniverse::new();
        let chaser = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        let quarry = u.fleet_in_space(u.bob, u.freighter, 1, Vec2Fixed::from_ints(110, 100));
        send(&mut u, chaser, Some(MapObjectRef::Fleet(quarry)), Vec2Fixed::ZERO, 6);
        u.turn.queue_deletion(MapObjectRef::Fleet(quarry));

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(chaser).unwrap();
        assert_eq!(f.position, Vec2Fixed::from_ints(110, 100));
        assert_eq!(f.waypoints[0].original_target, Some(MapObjectRef::Fleet(quarry)));
        assert!(f.waypoints[0].target.is_none());
    }

    #[test]
    fn test_wormhole_moves_fleet_to_companion() {
        let mut u = TestUniverse::new();
        let a = u.game.add_wormhole(Wormhole::new(Vec2Fixed::from_ints(110, 100)));
        let b = u.game.add_wormhole(Wormhole::new(Vec2Fixed::from_ints(900, 900)));
        u.game.link_wormholes(a, b).unwrap();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        send(&mut u, fleet, Some(MapObjectRef::Wormhole(a)), Vec2Fixed::ZERO, 5);

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.position, Vec2Fixed::from_ints(900, 900));
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::WormholeTravelled), 1);
    }

    #[test]
    fn test_refuel_at_own_starbase() {
        let mut u = TestUniverse::new();
        let station = u.game.add_design(crate::design::ShipDesign {
            owner: u.ann,
            hull: crate::design::HullKind::Starbase,
            dock: true,
            ..crate::design::ShipDesign::default()
        });
        u.game.add_starbase(u.home, station).unwrap();
        let fleet = u.fleet_in_space(u.ann, u.freighter, 1, Vec2Fixed::from_ints(90, 100));
        u.game.fleets.get_mut(fleet).unwrap().fuel = 100;
        let home = u.home;
        send(&mut u, fleet, Some(MapObjectRef::Planet(home)), Vec2Fixed::ZERO, 5);

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.orbiting, Some(u.home));
        assert_eq!(f.fuel, 500);
    }

    #[test]
    fn test_mine_hit_stops_and_damages_fleet() {
        let mut u = TestUniverse::new();
        u.game.rules.mine_field_stats.insert(
            MineFieldType::Standard,
            MineFieldStats {
                hit_chance: 10_000,
                ..MineFieldStats::standard()
            },
        );
        u.game.add_mine_field(MineField::new(
            u.bob,
            MineFieldType::Standard,
            Vec2Fixed::from_ints(150, 100),
            400,
        ));
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        send(&mut u, fleet, None, Vec2Fixed::from_ints(200, 100), 9);

        u.run(&mut FleetMoveStep::new());

        // 500 damage against 20 armor destroys the freighter.
        assert!(!u.game.fleets.contains(fleet));
        let field = u.game.mine_fields.values().next().unwrap();
        assert_eq!(field.num_mines, 380);
        assert_eq!(u.game.player(u.bob).unwrap().count_messages(MessageKind::MineFieldHit), 1);
    }

    #[test]
    fn test_mine_hit_survivor_stops_inside_field() {
        let mut u = TestUniverse::new();
        let hulk = u.game.add_design(ShipDesign {
            owner: u.ann,
            name: "Hulk".to_string(),
            mass: 50,
            armor: 2000,
            fuel_capacity: 500,
            engine: Some(Engine::long_hump()),
            num_engines: 1,
            ..ShipDesign::default()
        });
        u.game.rules.mine_field_stats.insert(
            MineFieldType::Standard,
            MineFieldStats {
                hit_chance: 10_000,
                ..MineFieldStats::standard()
            },
        );
        u.game.add_mine_field(MineField::new(
            u.bob,
            MineFieldType::Standard,
            Vec2Fixed::from_ints(150, 100),
            400,
        ));
        let fleet = u.fleet_at_planet(u.ann, hulk, 1, u.home);
        send(&mut u, fleet, None, Vec2Fixed::from_ints(200, 100), 9);

        u.run(&mut FleetMoveStep::new());

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.tokens[0].quantity, 1);
        assert_eq!(f.tokens[0].damage, 500);
        // Stopped where the path enters the field, short of warp 9's 81 ly.
        assert!(f.position.x > Fixed::from_num(100));
        assert!(f.position.x < Fixed::from_num(181));
        assert!(f.orbiting.is_none());
        assert_eq!(f.waypoints.len(), 2);
        assert!(f.waypoints[0].partially_complete);
        assert_eq!(f.waypoints[0].position, f.position);
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::FleetDestroyed), 0);
    }

    #[test]
    fn test_stuck_fleet_keeps_waypoint_task() {
        let mut u = TestUniverse::new();
        let thirsty = u.game.add_design(ShipDesign {
            owner: u.ann,
            name: "Thirsty".to_string(),
            mass: 50,
            fuel_capacity: 500,
            cargo_capacity: 100,
            engine: Some(Engine {
                fuel_usage: [0, 10, 20, 60, 100, 100, 105, 450, 750, 900, 1080],
                ram_scoop: false,
            }),
            num_engines: 1,
            ..ShipDesign::default()
        });
        let fleet = u.fleet_at_planet(u.ann, thirsty, 1, u.home);
        let load = WaypointTask::Transport(TransportTasks::default().with(
            CargoType::Ironium,
            TransportAction::LoadAll,
            0,
        ));
        {
            let f = u.game.fleets.get_mut(fleet).unwrap();
            f.fuel = 0;
            f.waypoints[0].task = load;
        }
        send(&mut u, fleet, None, Vec2Fixed::from_ints(200, 100), 5);

        u.run(&mut FleetMoveStep::new());

        let home = u.home;
        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(f.position, Vec2Fixed::from_ints(100, 100));
        assert_eq!(f.orbiting, Some(home));
        assert_eq!(f.waypoints.len(), 2);
        assert_eq!(f.waypoints[0].task, load);
        assert_eq!(f.waypoints[0].target, Some(MapObjectRef::Planet(home)));
        assert!(!f.waypoints[0].partially_complete);
        assert!(!u.turn.moved_fleets.contains(&fleet));
    }

    #[test]
    fn test_slow_fleets_pass_mines_safely() {
        let mut u = TestUniverse::new();
        u.game.rules.mine_field_stats.insert(
            MineFieldType::Standard,
            MineFieldStats {
                hit_chance: 10_000,
                ..MineFieldStats::standard()
            },
        );
        u.game.add_mine_field(MineField::new(
            u.bob,
            MineFieldType::Standard,
            Vec2Fixed::from_ints(110, 100),
            400,
        ));
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        send(&mut u, fleet, None, Vec2Fixed::from_ints(116, 100), 4);

        u.run(&mut FleetMoveStep::new());

        assert_eq!(u.game.fleets.get(fleet).unwrap().position, Vec2Fixed::from_ints(116, 100));
    }
}
