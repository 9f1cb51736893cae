//! Cargo transfers between a fleet and whatever sits at its waypoint.

use tracing::{debug, warn};

use crate::cargo::{Cargo, CargoType};
use crate::context::PlanetInvasion;
use crate::fleet::{TransportAction, TransportTask};
use crate::game::Game;
use crate::ids::{FleetId, MapObjectRef, PlanetId, PlayerId, SalvageId};
use crate::map_object::Salvage;
use crate::math::Vec2Fixed;
use crate::message::MessageKind;
use crate::step::StepContext;

/// Amounts a transfer plan is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferLevels {
    /// What the fleet holds.
    pub fleet_has: i64,
    /// Room left in the fleet.
    pub fleet_space: i64,
    /// What the other holder has.
    pub holder_has: i64,
    /// Room left in the other holder.
    pub holder_space: i64,
    /// Hold or tank size, for percentage orders.
    pub capacity: i64,
    /// Fuel the rest of the route needs, for `LoadOptimal`.
    pub fuel_required: i64,
}

/// How much moves and whether the fleet should wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferPlan {
    /// Positive loads into the fleet, negative unloads from it.
    pub amount: i64,
    /// The order's target was not reached.
    pub wait: bool,
}

impl TransferPlan {
    const NONE: Self = Self { amount: 0, wait: false };

    const fn load(amount: i64, wanted: i64, waits: bool) -> Self {
        Self {
            amount,
            wait: waits && amount < wanted,
        }
    }

    const fn unload(amount: i64, wanted: i64, waits: bool) -> Self {
        Self {
            amount: -amount,
            wait: waits && amount < wanted,
        }
    }
}

/// Work out one transport order against the current levels.
///
/// Percentages floor. Loads never exceed the fleet's room or the holder's
/// stock; unloads never exceed the fleet's stock or the holder's room.
#[must_use]
pub fn plan_transfer(task: TransportTask, levels: TransferLevels) -> TransferPlan {
    let TransferLevels {
        fleet_has,
        fleet_space,
        holder_has,
        holder_space,
        capacity,
        fuel_required,
    } = levels;
    let loadable = |wanted: i64| wanted.min(holder_has).min(fleet_space).max(0);
    let unloadable = |wanted: i64| wanted.min(fleet_has).min(holder_space).max(0);
    let amount = task.amount.max(0);

    match task.action {
        TransportAction::None => TransferPlan::NONE,
        TransportAction::LoadAll | TransportAction::LoadDunnage => {
            TransferPlan::load(loadable(holder_has), 0, false)
        }
        TransportAction::LoadAmount => TransferPlan::load(loadable(amount), amount, false),
        TransportAction::UnloadAll => TransferPlan::unload(unloadable(fleet_has), 0, false),
        TransportAction::UnloadAmount => TransferPlan::unload(unloadable(amount), amount, false),
        TransportAction::FillPercent | TransportAction::WaitForPercent => {
            let target = capacity * amount.min(100) / 100;
            let shortfall = target - fleet_has;
            if shortfall <= 0 {
                return TransferPlan::NONE;
            }
            let waits = task.action == TransportAction::WaitForPercent;
            TransferPlan::load(loadable(shortfall), shortfall, waits)
        }
        TransportAction::SetAmountTo => {
            if fleet_has < amount {
                let shortfall = amount - fleet_has;
                TransferPlan::load(loadable(shortfall), shortfall, true)
            } else {
                let excess = fleet_has - amount;
                TransferPlan::unload(unloadable(excess), excess, true)
            }
        }
        TransportAction::SetWaypointTo => {
            if holder_has > amount {
                let excess = holder_has - amount;
                TransferPlan::load(loadable(excess), excess, true)
            } else {
                let shortfall = amount - holder_has;
                TransferPlan::unload(unloadable(shortfall), shortfall, true)
            }
        }
        TransportAction::LoadOptimal => {
            if fleet_has > fuel_required {
                TransferPlan::unload(unloadable(fleet_has - fuel_required), 0, false)
            } else {
                TransferPlan::load(loadable(fuel_required - fleet_has), 0, false)
            }
        }
    }
}

/// Whether an order moves cargo into the fleet, given the current levels.
#[must_use]
pub fn is_load(task: TransportTask, levels: TransferLevels) -> bool {
    match task.action {
        TransportAction::LoadAll
        | TransportAction::LoadAmount
        | TransportAction::LoadDunnage
        | TransportAction::FillPercent
        | TransportAction::WaitForPercent => true,
        TransportAction::None | TransportAction::UnloadAll | TransportAction::UnloadAmount => false,
        TransportAction::SetAmountTo => levels.fleet_has < task.amount,
        TransportAction::SetWaypointTo => levels.holder_has > task.amount,
        TransportAction::LoadOptimal => levels.fleet_has <= levels.fuel_required,
    }
}

/// The other side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Holder {
    Planet(PlanetId),
    Fleet(FleetId),
    Salvage(SalvageId),
    Space,
}

/// Find what the fleet's current waypoint points at, if the fleet is there.
pub(super) fn resolve_holder(game: &Game, fleet: FleetId) -> Holder {
    let Some(f) = game.fleets.get(fleet) else {
        return Holder::Space;
    };
    let target = f.current_waypoint().and_then(|wp| wp.target);
    let at_fleet = |obj: MapObjectRef| game.object_position(obj) == Some(f.position);
    match target {
        Some(MapObjectRef::Planet(id)) if at_fleet(MapObjectRef::Planet(id)) => Holder::Planet(id),
        Some(MapObjectRef::Fleet(id)) if id != fleet && at_fleet(MapObjectRef::Fleet(id)) => Holder::Fleet(id),
        Some(MapObjectRef::Salvage(id)) if at_fleet(MapObjectRef::Salvage(id)) => Holder::Salvage(id),
        _ => f.orbiting.map_or(Holder::Space, Holder::Planet),
    }
}

fn holder_amount(game: &Game, holder: Holder, cargo_type: CargoType) -> i64 {
    match holder {
        Holder::Planet(id) => game.planets.get(id).map_or(0, |p| match cargo_type {
            CargoType::Colonists => p.colonist_kt(),
            CargoType::Fuel => 0,
            other => p.cargo.get(other),
        }),
        Holder::Fleet(id) => game.fleets.get(id).map_or(0, |f| f.amount(cargo_type)),
        Holder::Salvage(id) => game.salvage.get(id).map_or(0, |s| s.cargo.get(cargo_type)),
        Holder::Space => 0,
    }
}

fn holder_space(game: &Game, holder: Holder, cargo_type: CargoType) -> i64 {
    match (holder, cargo_type) {
        (Holder::Fleet(id), _) => game.fleets.get(id).map_or(0, |f| f.space_for(cargo_type)),
        (_, CargoType::Fuel) => 0,
        (Holder::Planet(_), _) => i64::MAX,
        (Holder::Salvage(_) | Holder::Space, CargoType::Colonists) => 0,
        (Holder::Salvage(_) | Holder::Space, _) => i64::MAX,
    }
}

/// Current levels for one cargo type between a fleet and its holder.
pub(super) fn levels(game: &Game, fleet: FleetId, holder: Holder, cargo_type: CargoType) -> TransferLevels {
    let Some(f) = game.fleets.get(fleet) else {
        return TransferLevels::default();
    };
    TransferLevels {
        fleet_has: f.amount(cargo_type),
        fleet_space: f.space_for(cargo_type),
        holder_has: holder_amount(game, holder, cargo_type),
        holder_space: holder_space(game, holder, cargo_type),
        capacity: match cargo_type {
            CargoType::Fuel => f.spec.fuel_capacity,
            _ => f.spec.cargo_capacity,
        },
        fuel_required: f.fuel_for_route(),
    }
}

/// Why a transfer cannot happen.
fn rejection(game: &Game, fleet: FleetId, holder: Holder, cargo_type: CargoType, loading: bool) -> Option<&'static str> {
    let owner = game.fleets.get(fleet)?.owner;
    match holder {
        Holder::Space if loading => Some("there is nothing here to load from"),
        Holder::Space if cargo_type.is_hold() && cargo_type != CargoType::Colonists => None,
        Holder::Space => Some("only minerals can be jettisoned into space"),
        Holder::Salvage(_) if cargo_type == CargoType::Colonists || cargo_type == CargoType::Fuel => {
            Some("salvage only holds minerals")
        }
        Holder::Salvage(_) => None,
        Holder::Planet(_) if cargo_type == CargoType::Fuel => Some("planets do not store fuel"),
        Holder::Planet(id) => {
            let planet_owner = game.planets.get(id).and_then(|p| p.owner);
            if loading {
                return (planet_owner != Some(owner)).then_some("cargo can only be loaded from your own planets");
            }
            if cargo_type != CargoType::Colonists || planet_owner == Some(owner) {
                return None;
            }
            match planet_owner {
                None => Some("colonists can only settle an unowned planet by colonizing it"),
                Some(other) if game.is_friend(owner, other) => Some("colonists cannot be dropped on a friendly planet"),
                Some(_) => None,
            }
        }
        Holder::Fleet(id) => {
            let other_owner = game.fleets.get(id).map(|f| f.owner);
            if other_owner == Some(owner) {
                None
            } else if loading {
                Some("cargo can only be loaded from your own fleets")
            } else if cargo_type == CargoType::Colonists {
                Some("colonists cannot be transferred to another player's fleet")
            } else {
                None
            }
        }
    }
}

/// Whether unloading colonists here is an invasion.
fn is_invasion(game: &Game, fleet: FleetId, holder: Holder, cargo_type: CargoType) -> Option<PlanetId> {
    let Holder::Planet(id) = holder else {
        return None;
    };
    if cargo_type != CargoType::Colonists {
        return None;
    }
    let owner = game.fleets.get(fleet)?.owner;
    let planet_owner = game.planets.get(id)?.owner?;
    (planet_owner != owner && !game.is_friend(owner, planet_owner)).then_some(id)
}

fn apply_to_holder(
    game: &mut Game,
    holder: Holder,
    cargo_type: CargoType,
    amount: i64,
    position: Vec2Fixed,
    owner: PlayerId,
) {
    match holder {
        Holder::Planet(id) => {
            if let Some(planet) = game.planets.get_mut(id) {
                match cargo_type {
                    CargoType::Colonists => planet.population += amount * 100,
                    CargoType::Fuel => {}
                    other => planet.cargo.add(other, amount),
                }
            }
        }
        Holder::Fleet(id) => {
            if let Some(other) = game.fleets.get_mut(id) {
                other.transfer(cargo_type, amount);
            }
        }
        Holder::Salvage(id) => {
            if let Some(salvage) = game.salvage.get_mut(id) {
                salvage.cargo.add(cargo_type, amount);
            }
        }
        Holder::Space => {
            let mut cargo = Cargo::ZERO;
            cargo.add(cargo_type, amount);
            game.add_salvage(Salvage::new(Some(owner), position, cargo));
        }
    }
}

/// Run one transport order for one cargo type.
///
/// Returns whether the fleet should wait at the waypoint.
pub(super) fn execute_order(ctx: &mut StepContext<'_>, fleet: FleetId, cargo_type: CargoType, task: TransportTask) -> bool {
    let game = &mut *ctx.game;
    let holder = resolve_holder(game, fleet);
    let current = levels(game, fleet, holder, cargo_type);
    let loading = is_load(task, current);

    if let Some(reason) = rejection(game, fleet, holder, cargo_type, loading) {
        let Some(owner) = game.fleets.get(fleet).map(|f| f.owner) else {
            return false;
        };
        warn!(fleet = %fleet, cargo = %cargo_type, reason, "Rejected cargo transfer");
        game.message(
            owner,
            MessageKind::InvalidCargoTransfer,
            format!("{fleet} cannot transfer {cargo_type}: {reason}"),
            Some(MapObjectRef::Fleet(fleet)),
        );
        return false;
    }

    let plan = plan_transfer(task, current);
    if plan.amount == 0 {
        return plan.wait;
    }

    let Some((owner, position)) = game.fleets.get(fleet).map(|f| (f.owner, f.position)) else {
        return false;
    };

    if plan.amount < 0 {
        if let Some(planet) = is_invasion(game, fleet, holder, cargo_type) {
            let kt = -plan.amount;
            if let Some(f) = game.fleets.get_mut(fleet) {
                f.transfer(CargoType::Colonists, -kt);
            }
            ctx.turn.invasions.push(PlanetInvasion {
                planet,
                fleet,
                attacker: owner,
                colonists: kt * 100,
            });
            debug!(fleet = %fleet, planet = %planet, colonists = kt * 100, "Invasion queued");
            return plan.wait;
        }
    }

    if let Some(f) = game.fleets.get_mut(fleet) {
        f.transfer(cargo_type, plan.amount);
    }
    apply_to_holder(game, holder, cargo_type, -plan.amount, position, owner);

    let verb = if plan.amount > 0 { "loaded" } else { "unloaded" };
    debug!(fleet = %fleet, cargo = %cargo_type, amount = plan.amount, "Cargo transferred");
    game.message(
        owner,
        MessageKind::CargoTransferred,
        format!("{fleet} {verb} {} {cargo_type}", plan.amount.abs()),
        Some(MapObjectRef::Fleet(fleet)),
    );
    plan.wait
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(fleet_has: i64, fleet_space: i64, holder_has: i64, holder_space: i64) -> TransferLevels {
        TransferLevels {
            fleet_has,
            fleet_space,
            holder_has,
            holder_space,
            capacity: fleet_has + fleet_space,
            fuel_required: 0,
        }
    }

    fn task(action: TransportAction, amount: i64) -> TransportTask {
        TransportTask::new(action, amount)
    }

    #[test]
    fn test_load_all_is_capped_by_space() {
        let plan = plan_transfer(task(TransportAction::LoadAll, 0), levels(0, 60, 100, i64::MAX));
        assert_eq!(plan, TransferPlan { amount: 60, wait: false });
    }

    #[test]
    fn test_unload_amount_is_capped_by_request() {
        let plan = plan_transfer(task(TransportAction::UnloadAmount, 30), levels(50, 50, 0, i64::MAX));
        assert_eq!(plan.amount, -30);
    }

    #[test]
    fn test_set_amount_short_waits() {
        let plan = plan_transfer(task(TransportAction::SetAmountTo, 25), levels(0, 200, 20, i64::MAX));
        assert_eq!(plan, TransferPlan { amount: 20, wait: true });
    }

    #[test]
    fn test_set_amount_above_target_unloads() {
        let plan = plan_transfer(task(TransportAction::SetAmountTo, 10), levels(40, 160, 0, i64::MAX));
        assert_eq!(plan, TransferPlan { amount: -30, wait: false });
    }

    #[test]
    fn test_set_waypoint_to_fills_holder() {
        let plan = plan_transfer(task(TransportAction::SetWaypointTo, 50), levels(30, 170, 10, i64::MAX));
        assert_eq!(plan, TransferPlan { amount: -30, wait: true });
    }

    #[test]
    fn test_percent_orders_floor_and_only_wait_when_asked() {
        // 33% of 100 is 33.
        let fill = plan_transfer(task(TransportAction::FillPercent, 33), levels(0, 100, 10, i64::MAX));
        assert_eq!(fill, TransferPlan { amount: 10, wait: false });
        let wait = plan_transfer(task(TransportAction::WaitForPercent, 33), levels(0, 100, 10, i64::MAX));
        assert_eq!(wait, TransferPlan { amount: 10, wait: true });
        let done = plan_transfer(task(TransportAction::WaitForPercent, 33), levels(40, 60, 10, i64::MAX));
        assert_eq!(done, TransferPlan::default());
    }

    #[test]
    fn test_load_optimal_keeps_route_fuel() {
        let mut surplus = levels(300, 200, 0, 1000);
        surplus.fuel_required = 120;
        assert_eq!(plan_transfer(task(TransportAction::LoadOptimal, 0), surplus).amount, -180);

        let mut short = levels(50, 450, 500, 0);
        short.fuel_required = 120;
        assert_eq!(plan_transfer(task(TransportAction::LoadOptimal, 0), short).amount, 70);
    }

    #[test]
    fn test_classification_follows_levels() {
        let t = task(TransportAction::SetAmountTo, 25);
        assert!(is_load(t, levels(0, 100, 0, 0)));
        assert!(!is_load(t, levels(30, 70, 0, 0)));
        let w = task(TransportAction::SetWaypointTo, 25);
        assert!(is_load(w, levels(0, 100, 40, 0)));
        assert!(!is_load(w, levels(0, 100, 10, 0)));
    }
}
