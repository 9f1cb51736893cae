//! Waypoint task processing.
//!
//! Every fleet's waypoint-0 order is sorted into a category, then each
//! category runs for all fleets before the next one starts:
//!
//! 1. Scrap
//! 2. Colonize
//! 3. Remote mining (after movement only)
//! 4. Unload
//! 5. Invade
//! 6. Load
//! 7. Load dunnage
//! 8. Everything else (merge, route, transfer, patrol, mine laying checks)
//!
//! The step runs twice a year, before and after movement. A waypoint
//! handled in the first pass is skipped in the second.

mod tasks;
mod transport;

use tracing::{debug, error};

pub use tasks::scrap_recovery;
pub use transport::{plan_transfer, TransferLevels, TransferPlan};

use crate::cargo::CargoType;
use crate::fleet::{TransportAction, TransportTask, TransportTasks, WaypointTask};
use crate::game::OwnedPlanets;
use crate::ids::{FleetId, MapObjectRef, WaypointId};
use crate::step::{Step, StepContext};

/// Which of the two yearly passes a waypoint step is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointPass {
    /// Before fleets move.
    BeforeMovement,
    /// After fleets move; also runs remote mining and idle checks.
    AfterMovement,
}

#[derive(Debug, Clone, Copy)]
struct TransportOrder {
    fleet: FleetId,
    cargo_type: CargoType,
    task: TransportTask,
}

#[derive(Debug, Default)]
struct Batches {
    waypoints: Vec<WaypointId>,
    scrap: Vec<FleetId>,
    colonize: Vec<FleetId>,
    remote_mine: Vec<FleetId>,
    /// Load and unload orders, split by direction once scrap, colonize and
    /// remote mining have changed cargo levels.
    transfers: Vec<TransportOrder>,
    dunnage: Vec<TransportOrder>,
    other: Vec<(FleetId, WaypointTask)>,
}

/// Runs waypoint tasks for one pass.
#[derive(Debug)]
pub struct WaypointStep {
    pass: WaypointPass,
    batches: Batches,
}

impl WaypointStep {
    /// A step for the given pass.
    #[must_use]
    pub fn new(pass: WaypointPass) -> Self {
        Self {
            pass,
            batches: Batches::default(),
        }
    }

    fn sort_transport(&mut self, fleet: FleetId, tasks: TransportTasks) {
        for cargo_type in CargoType::ALL {
            let task = tasks.get(cargo_type);
            let order = TransportOrder {
                fleet,
                cargo_type,
                task,
            };
            match task.action {
                TransportAction::None => {}
                TransportAction::LoadDunnage => self.batches.dunnage.push(order),
                _ => self.batches.transfers.push(order),
            }
        }
    }

    /// Split transfers into unload and load batches against current levels.
    fn split_transfers(ctx: &StepContext<'_>, orders: &[TransportOrder]) -> (Vec<TransportOrder>, Vec<TransportOrder>) {
        let mut unload = Vec::new();
        let mut load = Vec::new();
        for order in orders {
            if !Self::live(ctx, order.fleet) {
                continue;
            }
            let holder = transport::resolve_holder(ctx.game, order.fleet);
            let levels = transport::levels(ctx.game, order.fleet, holder, order.cargo_type);
            if transport::is_load(order.task, levels) {
                load.push(*order);
            } else {
                unload.push(*order);
            }
        }
        (unload, load)
    }

    /// Run a transport batch, keeping each fleet's waypoint waiting if any
    /// of its orders came up short.
    fn run_transport(ctx: &mut StepContext<'_>, orders: &[TransportOrder]) {
        for order in orders {
            if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(order.fleet)) {
                continue;
            }
            let wait = transport::execute_order(ctx, order.fleet, order.cargo_type, order.task);
            if wait {
                if let Some(waypoint) = ctx
                    .game
                    .fleets
                    .get_mut(order.fleet)
                    .and_then(|f| f.waypoints.first_mut())
                {
                    waypoint.wait_at_waypoint = true;
                }
            }
        }
    }

    fn live(ctx: &StepContext<'_>, fleet: FleetId) -> bool {
        ctx.game.fleets.contains(fleet) && !ctx.turn.is_pending_deletion(MapObjectRef::Fleet(fleet))
    }
}

impl Step for WaypointStep {
    fn name(&self) -> &'static str {
        match self.pass {
            WaypointPass::BeforeMovement => "waypoint_tasks_0",
            WaypointPass::AfterMovement => "waypoint_tasks_1",
        }
    }

    fn pre_process(&mut self, ctx: &mut StepContext<'_>, _owned_planets: &OwnedPlanets) {
        self.batches = Batches::default();

        for id in ctx.game.fleets.sorted_ids() {
            if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(id)) {
                continue;
            }
            let Some(fleet) = ctx.game.fleets.get_mut(id) else {
                continue;
            };
            if fleet.is_starbase() {
                continue;
            }
            let Some(waypoint) = fleet.waypoints.first_mut() else {
                error!(fleet = %id, "Fleet has no waypoints");
                continue;
            };
            if ctx.turn.processed_waypoints.contains(&waypoint.id) {
                continue;
            }
            self.batches.waypoints.push(waypoint.id);
            let task = waypoint.task;
            if matches!(task, WaypointTask::Transport(_)) {
                // Transport orders decide afresh each pass whether to wait.
                waypoint.wait_at_waypoint = false;
            }

            match task {
                WaypointTask::None => {}
                WaypointTask::Transport(tasks) => self.sort_transport(id, tasks),
                WaypointTask::ScrapFleet => self.batches.scrap.push(id),
                WaypointTask::Colonize => self.batches.colonize.push(id),
                WaypointTask::RemoteMining => {
                    if self.pass == WaypointPass::AfterMovement {
                        self.batches.remote_mine.push(id);
                    }
                }
                other => self.batches.other.push((id, other)),
            }
        }

        debug!(
            step = self.name(),
            waypoints = self.batches.waypoints.len(),
            "Waypoint tasks gathered"
        );
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let batches = std::mem::take(&mut self.batches);

        for &fleet in &batches.scrap {
            if Self::live(ctx, fleet) {
                tasks::scrap_fleet(ctx, fleet);
            }
        }
        for &fleet in &batches.colonize {
            if Self::live(ctx, fleet) {
                tasks::colonize(ctx, fleet);
            }
        }
        for &fleet in &batches.remote_mine {
            if Self::live(ctx, fleet) {
                tasks::remote_mine(ctx, fleet);
            }
        }
        let (unload, load) = Self::split_transfers(ctx, &batches.transfers);
        Self::run_transport(ctx, &unload);
        tasks::resolve_invasions(ctx);
        Self::run_transport(ctx, &load);
        Self::run_transport(ctx, &batches.dunnage);

        for &(fleet, task) in &batches.other {
            if !Self::live(ctx, fleet) {
                continue;
            }
            match task {
                WaypointTask::MergeWithFleet => tasks::merge(ctx, fleet),
                WaypointTask::Route => tasks::route(ctx, fleet),
                WaypointTask::TransferFleet { to_player } => tasks::transfer(ctx, fleet, to_player),
                WaypointTask::Patrol { range, warp } => tasks::patrol(ctx, fleet, range, warp),
                WaypointTask::LayMineField { field_type, .. } => {
                    tasks::validate_mine_laying(ctx, fleet, field_type);
                }
                WaypointTask::None
                | WaypointTask::Transport(_)
                | WaypointTask::Colonize
                | WaypointTask::ScrapFleet
                | WaypointTask::RemoteMining => {}
            }
        }

        if self.pass == WaypointPass::AfterMovement {
            tasks::mark_idle(ctx);
        }

        self.batches.waypoints = batches.waypoints;
    }

    fn post_process(&mut self, ctx: &mut StepContext<'_>) {
        ctx.turn
            .processed_waypoints
            .extend(self.batches.waypoints.drain(..));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::Cargo;
    use crate::design::ShipDesign;
    use crate::message::MessageKind;
    use crate::planet::{Hab, Planet};
    use crate::steps::test_support::TestUniverse;

    fn transport(cargo_type: CargoType, action: TransportAction, amount: i64) -> WaypointTask {
        WaypointTask::Transport(TransportTasks::default().with(cargo_type, action, amount))
    }

    #[test]
    fn test_load_all_moves_everything() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().cargo = Cargo::minerals(100, 0, 0);
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game
            .set_waypoint_task(fleet, 0, transport(CargoType::Ironium, TransportAction::LoadAll, 0))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        assert_eq!(u.game.planets.get(u.home).unwrap().cargo.ironium, 0);
        assert_eq!(u.game.fleets.get(fleet).unwrap().cargo.ironium, 100);
    }

    #[test]
    fn test_set_amount_short_sets_wait() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().cargo = Cargo::minerals(20, 0, 0);
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game
            .set_waypoint_task(fleet, 0, transport(CargoType::Ironium, TransportAction::SetAmountTo, 25))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        let f = u.game.fleets.get(fleet).unwrap();
        assert_eq!(u.game.planets.get(u.home).unwrap().cargo.ironium, 0);
        assert_eq!(f.cargo.ironium, 20);
        assert!(f.waypoints[0].wait_at_waypoint);
    }

    #[test]
    fn test_dunnage_fills_space_left_by_explicit_loads() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().cargo = Cargo::minerals(100, 100, 100);
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        let tasks = TransportTasks::default()
            .with(CargoType::Ironium, TransportAction::LoadDunnage, 0)
            .with(CargoType::Boranium, TransportAction::LoadDunnage, 0)
            .with(CargoType::Germanium, TransportAction::LoadDunnage, 0)
            .with(CargoType::Colonists, TransportAction::LoadAmount, 50);
        u.game
            .set_waypoint_task(fleet, 0, WaypointTask::Transport(tasks))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        // 50 kT of colonists first, then 150 kT of dunnage in mineral order.
        assert_eq!(u.game.fleets.get(fleet).unwrap().cargo, Cargo::new(100, 50, 0, 50));
        let home = u.game.planets.get(u.home).unwrap();
        assert_eq!(home.cargo, Cargo::minerals(0, 50, 100));
        assert_eq!(home.population, 95_000);
    }

    #[test]
    fn test_set_waypoint_to_sees_scrapped_minerals() {
        let mut u = TestUniverse::new();
        let scrapper = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game.fleets.get_mut(scrapper).unwrap().cargo = Cargo::minerals(5, 0, 1);
        u.game.set_waypoint_task(scrapper, 0, WaypointTask::ScrapFleet).unwrap();
        let hauler = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game
            .set_waypoint_task(hauler, 0, transport(CargoType::Ironium, TransportAction::SetWaypointTo, 0))
            .unwrap();
        let supplier = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game.fleets.get_mut(supplier).unwrap().cargo = Cargo::minerals(20, 0, 0);
        u.game
            .set_waypoint_task(supplier, 0, transport(CargoType::Ironium, TransportAction::UnloadAll, 0))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        // The planet had no ironium until the scrap landed 11 kT on it, so the
        // hauler loads after the supplier's 20 kT unload.
        assert_eq!(u.game.planets.get(u.home).unwrap().cargo.ironium, 0);
        assert_eq!(u.game.fleets.get(supplier).unwrap().cargo.ironium, 0);
        assert_eq!(u.game.fleets.get(hauler).unwrap().cargo.ironium, 31);
        assert!(!u.game.fleets.get(hauler).unwrap().waypoints[0].wait_at_waypoint);
    }

    #[test]
    fn test_second_pass_skips_processed_waypoint() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().cargo = Cargo::minerals(500, 0, 0);
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game
            .set_waypoint_task(fleet, 0, transport(CargoType::Ironium, TransportAction::LoadAmount, 50))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));
        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));
        u.run(&mut WaypointStep::new(WaypointPass::AfterMovement));

        assert_eq!(u.game.fleets.get(fleet).unwrap().cargo.ironium, 50);
        assert_eq!(u.game.planets.get(u.home).unwrap().cargo.ironium, 450);
    }

    #[test]
    fn test_scrap_at_planet_recovers_a_third() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game.fleets.get_mut(fleet).unwrap().cargo = Cargo::minerals(5, 0, 1);
        u.game.set_waypoint_task(fleet, 0, WaypointTask::ScrapFleet).unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        // Cost 18/0/6: a third is 6/0/2, plus the 5/0/1 carried.
        assert_eq!(u.game.planets.get(u.home).unwrap().cargo, Cargo::minerals(11, 0, 3));
        assert!(!u.game.fleets.contains(fleet));
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::FleetScrapped), 1);
    }

    #[test]
    fn test_scrap_in_space_leaves_salvage() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_in_space(u.ann, u.freighter, 3, crate::math::Vec2Fixed::from_ints(5, 5));
        u.game.set_waypoint_task(fleet, 0, WaypointTask::ScrapFleet).unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        let salvage: Vec<_> = u.game.salvage.values().collect();
        assert_eq!(salvage.len(), 1);
        assert_eq!(salvage[0].cargo, Cargo::minerals(18, 0, 6));
    }

    #[test]
    fn test_ultimate_recycling_rates() {
        let rules = crate::rules::ScrapRules::default();
        let cost = crate::cargo::Cost::new(100, 0, 20, 50);
        assert_eq!(scrap_recovery(&cost, &rules, true, Some(false)), (Cargo::minerals(45, 0, 9), 22));
        assert_eq!(scrap_recovery(&cost, &rules, true, Some(true)), (Cargo::minerals(90, 0, 18), 45));
        assert_eq!(scrap_recovery(&cost, &rules, true, None), (Cargo::minerals(33, 0, 6), 0));
    }

    #[test]
    fn test_merge_into_foreign_fleet_is_rejected() {
        let mut u = TestUniverse::new();
        let mine = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        let theirs = u.fleet_at_planet(u.bob, u.freighter, 1, u.home);
        let position = u.game.fleets.get(theirs).unwrap().position;
        u.game
            .add_waypoint(mine, Some(MapObjectRef::Fleet(theirs)), position, 5, WaypointTask::None)
            .unwrap();
        // Point waypoint 0 at the other fleet with a merge order.
        {
            let f = u.game.fleets.get_mut(mine).unwrap();
            f.waypoints[0].target = Some(MapObjectRef::Fleet(theirs));
            f.waypoints[0].task = WaypointTask::MergeWithFleet;
        }

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        let f = u.game.fleets.get(mine).unwrap();
        assert_eq!(f.waypoints.len(), 2);
        assert_eq!(f.waypoints[0].task, WaypointTask::None);
        assert_eq!(f.tokens.len(), 1);
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::InvalidMerge), 1);
    }

    #[test]
    fn test_merge_combines_fleets() {
        let mut u = TestUniverse::new();
        let a = u.fleet_at_planet(u.ann, u.freighter, 2, u.home);
        let b = u.fleet_at_planet(u.ann, u.freighter, 3, u.home);
        {
            let f = u.game.fleets.get_mut(a).unwrap();
            f.waypoints[0].target = Some(MapObjectRef::Fleet(b));
            f.waypoints[0].task = WaypointTask::MergeWithFleet;
            f.cargo = Cargo::minerals(10, 0, 0);
        }

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        assert!(!u.game.fleets.contains(a));
        let merged = u.game.fleets.get(b).unwrap();
        assert_eq!(merged.tokens[0].quantity, 5);
        assert_eq!(merged.cargo.ironium, 10);
        assert_eq!(merged.spec.total_ships, 5);
    }

    #[test]
    fn test_colonize_claims_planet() {
        let mut u = TestUniverse::new();
        let colony_ship = u.game.add_design(ShipDesign {
            owner: u.ann,
            cost: crate::cargo::Cost::new(30, 0, 0, 60),
            mass: 20,
            cargo_capacity: 25,
            colonizer: true,
            ..ShipDesign::default()
        });
        let target = u
            .game
            .add_planet(Planet::new("New", crate::math::Vec2Fixed::from_ints(300, 300), Hab::new(50, 50, 50)));
        let fleet = u.fleet_at_planet(u.ann, colony_ship, 1, target);
        u.game.fleets.get_mut(fleet).unwrap().cargo = Cargo::new(0, 0, 0, 25);
        u.game.set_waypoint_task(fleet, 0, WaypointTask::Colonize).unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        let planet = u.game.planets.get(target).unwrap();
        assert_eq!(planet.owner, Some(u.ann));
        assert_eq!(planet.population, 2500);
        assert_eq!(planet.race_name.as_deref(), Some("Humanoid"));
        assert_eq!(planet.cargo, Cargo::minerals(10, 0, 0));
        assert!(!u.game.fleets.contains(fleet));
    }

    #[test]
    fn test_colonize_owned_planet_fails() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);
        u.game.fleets.get_mut(fleet).unwrap().cargo = Cargo::new(0, 0, 0, 10);
        u.game.set_waypoint_task(fleet, 0, WaypointTask::Colonize).unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        assert!(u.game.fleets.contains(fleet));
        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::InvalidColonize), 1);
        assert_eq!(u.game.planets.get(u.home).unwrap().population, 100_000);
    }

    #[test]
    fn test_unloading_colonists_on_enemy_planet_invades() {
        let mut u = TestUniverse::new();
        let mut enemy = Planet::new("Enemy", crate::math::Vec2Fixed::from_ints(200, 200), Hab::new(50, 50, 50));
        enemy.owner = Some(u.bob);
        enemy.population = 1000;
        let enemy = u.game.add_planet(enemy);
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, enemy);
        u.game.fleets.get_mut(fleet).unwrap().cargo = Cargo::new(0, 0, 0, 20);
        u.game
            .set_waypoint_task(fleet, 0, transport(CargoType::Colonists, TransportAction::UnloadAll, 0))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        let planet = u.game.planets.get(enemy).unwrap();
        // 2000 troops at 110% against 1000 defenders.
        assert_eq!(planet.owner, Some(u.ann));
        assert_eq!(planet.population, 1200);
        assert_eq!(u.game.fleets.get(fleet).unwrap().cargo.colonists, 0);
        assert_eq!(u.game.player(u.bob).unwrap().count_messages(MessageKind::PlanetInvaded), 1);
    }

    #[test]
    fn test_idle_message_sent_once() {
        let mut u = TestUniverse::new();
        let fleet = u.fleet_at_planet(u.ann, u.freighter, 1, u.home);

        u.run(&mut WaypointStep::new(WaypointPass::AfterMovement));
        u.turn = crate::context::TurnContext::new();
        u.run(&mut WaypointStep::new(WaypointPass::AfterMovement));

        assert_eq!(u.game.player(u.ann).unwrap().count_messages(MessageKind::FleetIdle), 1);
        assert_eq!(u.game.fleets.get(fleet).unwrap().idle_turns, 2);
    }

    #[test]
    fn test_loading_from_foreign_planet_is_rejected() {
        let mut u = TestUniverse::new();
        u.game.planets.get_mut(u.home).unwrap().cargo = Cargo::minerals(100, 0, 0);
        let design = u.freighter;
        let fleet = u.fleet_at_planet(u.bob, design, 1, u.home);
        u.game
            .set_waypoint_task(fleet, 0, transport(CargoType::Ironium, TransportAction::LoadAll, 0))
            .unwrap();

        u.run(&mut WaypointStep::new(WaypointPass::BeforeMovement));

        assert_eq!(u.game.planets.get(u.home).unwrap().cargo.ironium, 100);
        assert_eq!(u.game.player(u.bob).unwrap().count_messages(MessageKind::InvalidCargoTransfer), 1);
    }
}
