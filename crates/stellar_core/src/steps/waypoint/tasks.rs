//! Non-transport waypoint tasks.
//!
//! Every handler re-validates against current state, since an earlier
//! category in the same pass may have changed it. Invalid orders are reset
//! to [`WaypointTask::None`] and messaged to the owner.

use tracing::{debug, error, info, warn};

use crate::cargo::{Cargo, CargoType, Cost};
use crate::fleet::WaypointTask;
use crate::game::Game;
use crate::ids::{FleetId, MapObjectRef, PlanetId, PlayerId};
use crate::map_object::Salvage;
use crate::message::MessageKind;
use crate::planet::ProductionQueue;
use crate::rules::ScrapRules;
use crate::step::StepContext;

/// Warp used to leave along a planet's route when the order gave none.
const DEFAULT_ROUTE_WARP: u8 = 5;

/// Warp used to intercept when a patrol order gave none.
const DEFAULT_PATROL_WARP: u8 = 6;

/// Reset a fleet's current task and tell the owner why.
fn reject(game: &mut Game, fleet: FleetId, kind: MessageKind, reason: &str) {
    let Some(f) = game.fleets.get_mut(fleet) else {
        return;
    };
    if let Some(waypoint) = f.waypoints.first_mut() {
        waypoint.task = WaypointTask::None;
    }
    let owner = f.owner;
    warn!(fleet = %fleet, ?kind, reason, "Rejected waypoint task");
    game.message(owner, kind, format!("{fleet}: {reason}"), Some(MapObjectRef::Fleet(fleet)));
}

/// The planet a fleet is at, preferring its waypoint target.
fn planet_here(game: &Game, fleet: FleetId) -> Option<PlanetId> {
    let f = game.fleets.get(fleet)?;
    let target = f.current_waypoint().and_then(|wp| wp.target_planet());
    target
        .filter(|id| game.planets.get(*id).is_some_and(|p| p.position == f.position))
        .or(f.orbiting)
        .or_else(|| game.planet_at(f.position))
}

/// Minerals and bonus resources recovered from scrapping ships worth `cost`.
///
/// `at_planet` is `None` in deep space, otherwise whether the planet has a
/// starbase. Ultimate recycling only helps at a planet.
#[must_use]
pub fn scrap_recovery(cost: &Cost, rules: &ScrapRules, ultimate_recycling: bool, at_planet: Option<bool>) -> (Cargo, i64) {
    match (ultimate_recycling, at_planet) {
        (true, Some(has_starbase)) => {
            let percent = if has_starbase {
                rules.ultimate_recycling_starbase_percent
            } else {
                rules.ultimate_recycling_planet_percent
            };
            let recovered = cost.scale_percent(percent);
            (recovered.to_cargo(), recovered.resources)
        }
        _ => (
            cost.scale_ratio(rules.normal_numerator, rules.normal_denominator).to_cargo(),
            0,
        ),
    }
}

/// Break a fleet up at its planet or into salvage, and queue it for deletion.
pub(super) fn scrap_fleet(ctx: &mut StepContext<'_>, fleet: FleetId) {
    let planet = planet_here(ctx.game, fleet);
    let game = &mut *ctx.game;
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    let owner = f.owner;
    let position = f.position;
    let held = f.cargo;
    let ultimate = game
        .player(owner)
        .is_some_and(|p| p.race.traits.ultimate_recycling);
    let at_planet = planet.and_then(|id| game.planets.get(id)).map(|p| p.starbase.is_some());
    let (minerals, bonus) = scrap_recovery(&f.spec.cost, &game.rules.scrap, ultimate, at_planet);

    match planet.and_then(|id| game.planets.get_mut(id)) {
        Some(p) => {
            p.cargo += minerals + held.without_colonists();
            if p.owned_by(owner) {
                p.population += held.colonists * 100;
            }
            p.bonus_resources += bonus;
        }
        None => {
            game.add_salvage(Salvage::new(Some(owner), position, minerals + held));
        }
    }

    ctx.turn.queue_deletion(MapObjectRef::Fleet(fleet));
    debug!(fleet = %fleet, ?minerals, bonus, "Fleet scrapped");
    game.message(
        owner,
        MessageKind::FleetScrapped,
        format!("{fleet} was scrapped"),
        planet.map(MapObjectRef::Planet),
    );
}

/// Settle the target planet with the fleet's colonists.
pub(super) fn colonize(ctx: &mut StepContext<'_>, fleet: FleetId) {
    let game = &mut *ctx.game;
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    let owner = f.owner;
    let target = f
        .current_waypoint()
        .and_then(|wp| wp.target_planet())
        .filter(|id| game.planets.get(*id).is_some_and(|p| p.position == f.position));

    let problem = match target.and_then(|id| game.planets.get(id)) {
        None => Some("the target is not a planet"),
        Some(p) if p.owner.is_some() => Some("the planet is already inhabited"),
        Some(_) if f.cargo.colonists <= 0 => Some("the fleet carries no colonists"),
        Some(_) if !f.spec.colonizer => Some("the fleet has no colonization module"),
        Some(_) => None,
    };
    if let Some(reason) = problem {
        reject(game, fleet, MessageKind::InvalidColonize, reason);
        return;
    }
    let Some(planet_id) = target else {
        return;
    };

    let colonists = f.cargo.colonists;
    let orbital_construction = f.spec.orbital_construction;
    let (race_name, plan, starter) = match game.player(owner) {
        Some(p) => (p.race.name.clone(), p.default_production_plan.clone(), p.starter_colony),
        None => {
            error!(fleet = %fleet, player = %owner, "Colonizing fleet has no player");
            return;
        }
    };

    if let Some(f) = game.fleets.get_mut(fleet) {
        f.cargo.add(CargoType::Colonists, -colonists);
    }
    let name = match game.planets.get_mut(planet_id) {
        Some(p) => {
            p.owner = Some(owner);
            p.race_name = Some(race_name);
            p.population = colonists * 100;
            p.production_queue = ProductionQueue::from_items(plan);
            p.name.clone()
        }
        None => return,
    };

    if orbital_construction {
        if let Some(design) = starter {
            if let Err(e) = game.add_starbase(planet_id, design) {
                error!(planet = %planet_id, error = %e, "Could not install starter colony");
            }
        }
    }
    game.recompute_planet_spec(planet_id);

    info!(fleet = %fleet, planet = %planet_id, colonists = colonists * 100, "Planet colonized");
    game.message(
        owner,
        MessageKind::PlanetColonized,
        format!("{name} has been colonized with {} colonists", colonists * 100),
        Some(MapObjectRef::Planet(planet_id)),
    );

    scrap_fleet(ctx, fleet);
}

/// Mine the orbited planet.
pub(super) fn remote_mine(ctx: &mut StepContext<'_>, fleet: FleetId) {
    let planet = planet_here(ctx.game, fleet);
    let game = &mut *ctx.game;
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    let owner = f.owner;
    let rate = f.spec.mining_rate;
    let own_allowed = game
        .player(owner)
        .is_some_and(|p| p.race.traits.can_remote_mine_own_planets);

    let problem = match planet.and_then(|id| game.planets.get(id)) {
        None => Some("there is no planet to mine"),
        Some(p) if p.owner.is_some() && !(own_allowed && p.owned_by(owner)) => {
            Some("only uninhabited planets can be mined remotely")
        }
        Some(_) if rate <= 0 => Some("the fleet has no mining equipment"),
        Some(_) => None,
    };
    if let Some(reason) = problem {
        reject(game, fleet, MessageKind::InvalidRemoteMining, reason);
        return;
    }
    let Some(planet_id) = planet else {
        return;
    };

    let depletion = game.rules.growth.mining_depletion_kt;
    let Some(p) = game.planets.get_mut(planet_id) else {
        return;
    };
    let mut mined = Cargo::ZERO;
    for mineral in crate::cargo::Mineral::ALL {
        mined.add(mineral.cargo_type(), rate * p.concentration.get(mineral) / 100);
    }
    p.apply_mining(mined, depletion);
    let name = p.name.clone();

    if let Some(player) = ctx.game.players.get_mut(&owner) {
        ctx.collaborators
            .discoverer
            .discover(player, MapObjectRef::Planet(planet_id), true);
    }
    debug!(fleet = %fleet, planet = %planet_id, ?mined, "Remote mining");
    ctx.game.message(
        owner,
        MessageKind::RemoteMined,
        format!("{fleet} mined {} kT from {name}", mined.total()),
        Some(MapObjectRef::Planet(planet_id)),
    );
}

/// Resolve every queued invasion, in queue order.
pub(super) fn resolve_invasions(ctx: &mut StepContext<'_>) {
    let invasions = std::mem::take(&mut ctx.turn.invasions);
    for invasion in invasions {
        let attacker_race = ctx
            .game
            .player(invasion.attacker)
            .map(|p| p.race.name.clone());
        let Some(planet) = ctx.game.planets.get_mut(invasion.planet) else {
            error!(planet = %invasion.planet, "Invaded planet is missing");
            continue;
        };
        if planet.owned_by(invasion.attacker) {
            // An earlier drop this pass already took it.
            planet.population += invasion.colonists;
            continue;
        }
        let name = planet.name.clone();
        let outcome = ctx.collaborators.invasion_resolver.resolve(planet, &invasion);

        if outcome.attacker_won {
            planet.race_name = attacker_race;
            if let Some(starbase) = planet.starbase {
                ctx.turn.queue_deletion(MapObjectRef::Fleet(starbase));
            }
        }
        ctx.game.recompute_planet_spec(invasion.planet);

        let target = Some(MapObjectRef::Planet(invasion.planet));
        let (kind, text) = if outcome.attacker_won {
            (
                MessageKind::PlanetInvaded,
                format!("{name} was invaded; {} colonists survive", outcome.survivors),
            )
        } else {
            (
                MessageKind::InvasionRepelled,
                format!("The invasion of {name} was repelled"),
            )
        };
        info!(planet = %invasion.planet, attacker = %invasion.attacker, won = outcome.attacker_won, "Invasion resolved");
        ctx.game.message(invasion.attacker, kind, text.clone(), target);
        if let Some(defender) = outcome.defender {
            ctx.game.message(defender, kind, text, target);
        }
    }
}

/// Fold the fleet into its target fleet.
pub(super) fn merge(ctx: &mut StepContext<'_>, fleet: FleetId) {
    let game = &mut *ctx.game;
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    let owner = f.owner;
    let position = f.position;
    let target = f.current_waypoint().and_then(|wp| wp.target_fleet());

    let problem = match target.and_then(|id| game.fleets.get(id).map(|t| (id, t))) {
        None => Some("the target is not a fleet"),
        Some((id, _)) if id == fleet => Some("a fleet cannot merge with itself"),
        Some((_, t)) if t.owner != owner => Some("the target fleet belongs to another player"),
        Some((_, t)) if t.is_starbase() => Some("ships cannot merge into a starbase"),
        Some((_, t)) if t.position != position => Some("the target fleet is elsewhere"),
        Some((id, _)) if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(id)) => {
            Some("the target fleet no longer exists")
        }
        Some(_) => None,
    };
    if let Some(reason) = problem {
        reject(game, fleet, MessageKind::InvalidMerge, reason);
        return;
    }
    let Some(target) = target else {
        return;
    };

    let Some(source) = game.fleets.get_mut(fleet) else {
        return;
    };
    let tokens = std::mem::take(&mut source.tokens);
    let cargo = std::mem::replace(&mut source.cargo, Cargo::ZERO);
    let fuel = std::mem::replace(&mut source.fuel, 0);

    if let Some(t) = game.fleets.get_mut(target) {
        t.tokens.extend(tokens);
        t.consolidate_tokens();
        t.cargo += cargo;
        t.fuel += fuel;
    }
    game.recompute_fleet_spec(target);
    ctx.turn.queue_deletion(MapObjectRef::Fleet(fleet));

    debug!(fleet = %fleet, target = %target, "Fleets merged");
    game.message(
        owner,
        MessageKind::FleetsMerged,
        format!("{fleet} merged into {target}"),
        Some(MapObjectRef::Fleet(target)),
    );
}

/// Send the fleet on along its planet's route.
pub(super) fn route(ctx: &mut StepContext<'_>, fleet: FleetId) {
    let game = &mut *ctx.game;
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    let owner = f.owner;
    let warp = f.current_waypoint().map_or(0, |wp| wp.warp);
    let planet = f
        .current_waypoint()
        .and_then(|wp| wp.target_planet())
        .filter(|id| game.planets.get(*id).is_some_and(|p| p.position == f.position));

    let destination = planet.and_then(|id| game.planets.get(id)).and_then(|p| {
        let friendly = p.owner.is_some_and(|o| game.is_friend(o, owner));
        let target = p.route_target?;
        let position = game.object_position(target)?;
        friendly.then_some((target, position))
    });
    let Some((target, position)) = destination else {
        reject(game, fleet, MessageKind::InvalidRoute, "the planet has no route for this fleet");
        return;
    };

    let warp = if warp == 0 { DEFAULT_ROUTE_WARP } else { warp };
    let next = game.new_waypoint(position, Some(target), warp, WaypointTask::None);
    if let Some(f) = game.fleets.get_mut(fleet) {
        f.waypoints.truncate(1);
        if let Some(current) = f.waypoints.first_mut() {
            current.task = WaypointTask::None;
        }
        f.waypoints.push(next);
    }
    debug!(fleet = %fleet, target = %target, "Fleet routed");
    game.message(owner, MessageKind::FleetRouted, format!("{fleet} routed to {target}"), Some(target));
}

/// Give the fleet to another player.
pub(super) fn transfer(ctx: &mut StepContext<'_>, fleet: FleetId, to_player: PlayerId) {
    let game = &mut *ctx.game;
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    let owner = f.owner;
    let problem = if game.player(to_player).is_none() {
        Some("the receiving player does not exist")
    } else if to_player == owner {
        Some("the fleet already belongs to that player")
    } else if f.is_starbase() {
        Some("starbases cannot be given away")
    } else {
        None
    };
    if let Some(reason) = problem {
        reject(game, fleet, MessageKind::InvalidTransfer, reason);
        return;
    }

    if let Some(f) = game.fleets.get_mut(fleet) {
        f.owner = to_player;
        f.waypoints.truncate(1);
        if let Some(current) = f.waypoints.first_mut() {
            current.task = WaypointTask::None;
        }
        f.repeat_orders = false;
        f.idle_turns = 0;
    }
    info!(fleet = %fleet, from = %owner, to = %to_player, "Fleet transferred");
    let target = Some(MapObjectRef::Fleet(fleet));
    game.message(owner, MessageKind::FleetTransferred, format!("{fleet} was given to {to_player}"), target);
    game.message(to_player, MessageKind::FleetTransferred, format!("{fleet} was received from {owner}"), target);
}

/// Chase the nearest hostile fleet within range.
pub(super) fn patrol(ctx: &mut StepContext<'_>, fleet: FleetId, range: i64, warp: u8) {
    let game = &mut *ctx.game;
    if range <= 0 {
        reject(game, fleet, MessageKind::InvalidPatrol, "the patrol range must be positive");
        return;
    }
    let Some(f) = game.fleets.get(fleet) else {
        return;
    };
    if f.waypoints.len() > 1 {
        return;
    }
    let owner = f.owner;
    let position = f.position;
    let current_warp = f.current_waypoint().map_or(0, |wp| wp.warp);
    let range = crate::math::Fixed::from_num(range);

    let nearest = game
        .fleets
        .values()
        .filter(|other| other.id != fleet && !other.is_starbase())
        .filter(|other| !game.is_friend(owner, other.owner))
        .filter(|other| !ctx.turn.is_pending_deletion(MapObjectRef::Fleet(other.id)))
        .map(|other| (position.distance(other.position), other.id, other.position))
        .filter(|(distance, _, _)| *distance <= range)
        .min_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let Some((_, target, target_position)) = nearest else {
        return;
    };

    let warp = match (warp, current_warp) {
        (0, 0) => DEFAULT_PATROL_WARP,
        (0, w) | (w, _) => w,
    };
    let next = game.new_waypoint(target_position, Some(MapObjectRef::Fleet(target)), warp, WaypointTask::None);
    if let Some(f) = game.fleets.get_mut(fleet) {
        f.waypoints.push(next);
    }
    debug!(fleet = %fleet, target = %target, "Patrol intercept");
    game.message(
        owner,
        MessageKind::PatrolIntercept,
        format!("{fleet} is intercepting {target}"),
        Some(MapObjectRef::Fleet(target)),
    );
}

/// Check that the fleet can lay the ordered field type. Laying happens in
/// the mine laying step.
pub(super) fn validate_mine_laying(ctx: &mut StepContext<'_>, fleet: FleetId, field_type: crate::mine_field::MineFieldType) {
    let game = &mut *ctx.game;
    let can_lay = game
        .fleets
        .get(fleet)
        .is_some_and(|f| f.spec.mine_lay_rates.get(&field_type).copied().unwrap_or(0) > 0);
    if !can_lay {
        reject(game, fleet, MessageKind::InvalidMineLaying, "the fleet cannot lay that kind of mine");
    }
}

/// Flag fleets with nothing left to do. Called once per year.
pub(super) fn mark_idle(ctx: &mut StepContext<'_>) {
    let game = &mut *ctx.game;
    let mut newly_idle = Vec::new();
    for id in game.fleets.sorted_ids() {
        if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(id)) {
            continue;
        }
        let Some(f) = game.fleets.get_mut(id) else {
            continue;
        };
        if f.is_starbase() {
            continue;
        }
        let busy = f.waypoints.len() > 1 || f.waypoints.first().is_some_and(|wp| wp.task.is_continuous());
        if busy {
            f.idle_turns = 0;
            continue;
        }
        if f.idle_turns == 0 {
            newly_idle.push((f.owner, id));
        }
        f.idle_turns = f.idle_turns.saturating_add(1);
    }
    for (owner, id) in newly_idle {
        game.message(
            owner,
            MessageKind::FleetIdle,
            format!("{id} has completed its orders"),
            Some(MapObjectRef::Fleet(id)),
        );
    }
}
