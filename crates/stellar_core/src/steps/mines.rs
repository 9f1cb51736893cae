//! Mine field upkeep: decay, detonation, laying and sweeping.

use tracing::{debug, error};

use crate::context::TurnContext;
use crate::fleet::WaypointTask;
use crate::game::Game;
use crate::ids::{FleetId, MapObjectRef, MineFieldId};
use crate::mine_field::{MineField, MineFieldType};
use crate::message::MessageKind;
use crate::step::{Step, StepContext};

fn queue_if_spent(game: &Game, turn: &mut TurnContext, id: MineFieldId) {
    let threshold = game.rules.mine_fields.removal_threshold;
    if game.mine_fields.get(id).is_some_and(|f| f.num_mines <= threshold) {
        debug!(mine_field = %id, "Mine field spent");
        turn.queue_deletion(MapObjectRef::MineField(id));
    }
}

/// Yearly decay. Planets inside a field speed it up.
#[derive(Debug, Default)]
pub struct MineFieldDecayStep;

impl MineFieldDecayStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for MineFieldDecayStep {
    fn name(&self) -> &'static str {
        "mine_field_decay"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        let rules = &ctx.game.rules.mine_fields;
        let (base, per_planet, cap) = (rules.base_decay_percent, rules.planet_decay_percent, rules.max_decay_percent);

        for id in ctx.game.mine_fields.sorted_ids() {
            let Some(field) = ctx.game.mine_fields.get(id) else {
                continue;
            };
            let Some(stats) = ctx.game.rules.mine_field_stats(field.field_type) else {
                error!(mine_field = %id, field_type = ?field.field_type, "No stats for mine field type");
                continue;
            };
            let planets = ctx
                .game
                .planets
                .values()
                .filter(|p| field.contains(p.position))
                .count() as u64;
            let percent = (base + per_planet * planets).min(cap);
            let decay = (field.num_mines * percent / 100).max(stats.min_decay);

            if let Some(field) = ctx.game.mine_fields.get_mut(id) {
                field.remove_mines(decay);
                debug!(mine_field = %id, decay, left = field.num_mines, "Mine field decayed");
            }
            queue_if_spent(ctx.game, ctx.turn, id);
        }
    }
}

/// Detonates standard fields whose owners can and want to.
#[derive(Debug, Default)]
pub struct MineFieldDetonateStep;

impl MineFieldDetonateStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for MineFieldDetonateStep {
    fn name(&self) -> &'static str {
        "mine_field_detonate"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        for id in ctx.game.mine_fields.sorted_ids() {
            if ctx.turn.is_pending_deletion(MapObjectRef::MineField(id)) {
                continue;
            }
            let Some(field) = ctx.game.mine_fields.get(id) else {
                continue;
            };
            if !field.detonate {
                continue;
            }
            let owner = field.owner;
            let allowed = ctx
                .game
                .player(owner)
                .is_some_and(|p| p.race.traits.can_detonate_mines);
            let Some(stats) = ctx.game.rules.mine_field_stats(field.field_type).copied() else {
                error!(mine_field = %id, field_type = ?field.field_type, "No stats for mine field type");
                continue;
            };
            if !allowed || !stats.can_detonate {
                continue;
            }
            let field = field.clone();
            detonate(ctx, &field, &stats);
        }
    }
}

fn detonate(ctx: &mut StepContext<'_>, field: &MineField, stats: &crate::mine_field::MineFieldStats) {
    let victims: Vec<FleetId> = ctx
        .game
        .fleets
        .values()
        .filter(|f| !f.is_starbase() && field.contains(f.position))
        .filter(|f| !ctx.turn.is_pending_deletion(MapObjectRef::Fleet(f.id)))
        .map(|f| f.id)
        .collect();

    for id in victims {
        let game = &mut *ctx.game;
        let Some(fleet) = game.fleets.get_mut(id) else {
            continue;
        };
        let fleet_owner = fleet.owner;
        let damage = ctx
            .collaborators
            .mine_field_damager
            .damage_fleet(fleet, &game.designs, stats);
        debug!(mine_field = %field.id, fleet = %id, damage = damage.damage, "Detonation damage");
        if damage.fleet_destroyed {
            ctx.turn.queue_deletion(MapObjectRef::Fleet(id));
            game.message(
                fleet_owner,
                MessageKind::FleetDestroyed,
                format!("{id} was destroyed by the detonation of {}", field.id),
                Some(MapObjectRef::MineField(field.id)),
            );
        } else {
            game.recompute_fleet_spec(id);
            game.message(
                fleet_owner,
                MessageKind::MineFieldHit,
                format!("{id} took {} damage from the detonation of {}", damage.damage, field.id),
                Some(MapObjectRef::Fleet(id)),
            );
        }
    }

    let rules = &ctx.game.rules.mine_fields;
    let (divisor, min_reduction) = (rules.detonation_reduction_divisor, rules.min_impact_reduction);
    if let Some(f) = ctx.game.mine_fields.get_mut(field.id) {
        let reduction = f.num_mines.checked_div(divisor).unwrap_or(0).max(min_reduction);
        f.remove_mines(reduction);
    }
    ctx.game.message(
        field.owner,
        MessageKind::MineFieldDetonated,
        format!("{} detonated", field.id),
        Some(MapObjectRef::MineField(field.id)),
    );
    queue_if_spent(ctx.game, ctx.turn, field.id);
}

/// Fleets with a lay-mines order add to a covering field or start one.
#[derive(Debug, Default)]
pub struct MineLayingStep;

impl MineLayingStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for MineLayingStep {
    fn name(&self) -> &'static str {
        "mine_laying"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        for id in ctx.game.fleets.sorted_ids() {
            if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(id)) {
                continue;
            }
            let Some(fleet) = ctx.game.fleets.get(id) else {
                continue;
            };
            let Some(WaypointTask::LayMineField { field_type, duration }) =
                fleet.waypoints.first().map(|wp| wp.task)
            else {
                continue;
            };
            let rate = fleet.spec.mine_lay_rates.get(&field_type).copied().unwrap_or(0);
            if rate <= 0 {
                continue;
            }
            lay_mines(ctx, id, field_type, rate.unsigned_abs());

            let next = match duration {
                Some(years) if years <= 1 => WaypointTask::None,
                Some(years) => WaypointTask::LayMineField {
                    field_type,
                    duration: Some(years - 1),
                },
                None => continue,
            };
            if let Some(wp) = ctx.game.fleets.get_mut(id).and_then(|f| f.waypoints.first_mut()) {
                wp.task = next;
            }
        }
    }
}

fn lay_mines(ctx: &mut StepContext<'_>, fleet: FleetId, field_type: MineFieldType, count: u64) {
    let Some((owner, position)) = ctx.game.fleets.get(fleet).map(|f| (f.owner, f.position)) else {
        return;
    };
    let existing = ctx
        .game
        .mine_fields
        .values()
        .find(|f| {
            f.owner == owner
                && f.field_type == field_type
                && f.contains(position)
                && !ctx.turn.is_pending_deletion(MapObjectRef::MineField(f.id))
        })
        .map(|f| f.id);

    let field = match existing {
        Some(id) => {
            if let Some(f) = ctx.game.mine_fields.get_mut(id) {
                f.num_mines = f.num_mines.saturating_add(count);
            }
            id
        }
        None => ctx
            .game
            .add_mine_field(MineField::new(owner, field_type, position, count)),
    };
    debug!(fleet = %fleet, mine_field = %field, count, "Mines laid");
    ctx.game.message(
        owner,
        MessageKind::MinesLaid,
        format!("{fleet} laid {count} mines in {field}"),
        Some(MapObjectRef::MineField(field)),
    );
}

/// Armed fleets sweep enemy fields they sit in.
#[derive(Debug, Default)]
pub struct MineSweepStep;

impl MineSweepStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Step for MineSweepStep {
    fn name(&self) -> &'static str {
        "mine_sweep"
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        for fleet_id in ctx.game.fleets.sorted_ids() {
            if ctx.turn.is_pending_deletion(MapObjectRef::Fleet(fleet_id)) {
                continue;
            }
            let Some(fleet) = ctx.game.fleets.get(fleet_id) else {
                continue;
            };
            if fleet.spec.mine_sweep <= 0 || !fleet.spec.armed() {
                continue;
            }
            let (owner, position, sweep) = (fleet.owner, fleet.position, fleet.spec.mine_sweep);

            let fields: Vec<MineFieldId> = ctx
                .game
                .mine_fields
                .values()
                .filter(|f| !ctx.game.is_friend(owner, f.owner) && f.contains(position))
                .filter(|f| !ctx.turn.is_pending_deletion(MapObjectRef::MineField(f.id)))
                .map(|f| f.id)
                .collect();

            for field_id in fields {
                let Some(field) = ctx.game.mine_fields.get(field_id) else {
                    continue;
                };
                let Some(stats) = ctx.game.rules.mine_field_stats(field.field_type) else {
                    error!(mine_field = %field_id, field_type = ?field.field_type, "No stats for mine field type");
                    continue;
                };
                let field_owner = field.owner;
                let amount = (sweep * stats.sweep_factor / 100).max(0).unsigned_abs();
                let removed = ctx
                    .game
                    .mine_fields
                    .get_mut(field_id)
                    .map_or(0, |f| f.remove_mines(amount));

                let text = format!("{fleet_id} swept {removed} mines from {field_id}");
                ctx.game
                    .message(owner, MessageKind::MineFieldSwept, text.clone(), Some(MapObjectRef::Fleet(fleet_id)));
                ctx.game.message(
                    field_owner,
                    MessageKind::MineFieldSwept,
                    text,
                    Some(MapObjectRef::MineField(field_id)),
                );
                queue_if_spent(ctx.game, ctx.turn, field_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::ShipDesign;
    use crate::math::Vec2Fixed;
    use crate::steps::test_support::TestUniverse;

    fn field(u: &mut TestUniverse, owner: crate::ids::PlayerId, x: i32, mines: u64) -> MineFieldId {
        u.game
            .add_mine_field(MineField::new(owner, MineFieldType::Standard, Vec2Fixed::from_ints(x, 500), mines))
    }

    #[test]
    fn test_decay_rates_and_removal() {
        let mut u = TestUniverse::new();
        let bob = u.bob;
        let big = field(&mut u, bob, 1000, 1000);
        let small = field(&mut u, bob, 2000, 100);
        let tiny = field(&mut u, bob, 3000, 20);

        u.run(&mut MineFieldDecayStep::new());

        assert_eq!(u.game.mine_fields.get(big).unwrap().num_mines, 980);
        // 2% of 100 is below the minimum decay of 10.
        assert_eq!(u.game.mine_fields.get(small).unwrap().num_mines, 90);
        assert!(!u.game.mine_fields.contains(tiny));
    }

    #[test]
    fn test_planets_inside_speed_decay() {
        let mut u = TestUniverse::new();
        let id = u.game.add_mine_field(MineField::new(
            u.bob,
            MineFieldType::Standard,
            Vec2Fixed::from_ints(100, 100),
            1000,
        ));

        u.run(&mut MineFieldDecayStep::new());

        // 2% plus 4% for the home planet.
        assert_eq!(u.game.mine_fields.get(id).unwrap().num_mines, 940);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let mut u = TestUniverse::new();
        let bob = u.bob;
        let id = field(&mut u, bob, 1000, 5000);
        let mut last = 5000;
        for _ in 0..20 {
            u.run(&mut MineFieldDecayStep::new());
            let Some(f) = u.game.mine_fields.get(id) else {
                break;
            };
            assert!(f.num_mines < last);
            last = f.num_mines;
        }
    }

    #[test]
    fn test_detonation_damages_fleets_inside() {
        let mut u = TestUniverse::new();
        u.game.player_mut(u.bob).unwrap().race.traits.can_detonate_mines = true;
        let bob = u.bob;
        let id = field(&mut u, bob, 1000, 400);
        u.game.mine_fields.get_mut(id).unwrap().detonate = true;
        let victim = u.fleet_in_space(u.ann, u.freighter, 1, Vec2Fixed::from_ints(1005, 500));
        let outside = u.fleet_in_space(u.ann, u.freighter, 1, Vec2Fixed::from_ints(1100, 500));

        u.run(&mut MineFieldDetonateStep::new());

        assert!(!u.game.fleets.contains(victim));
        assert!(u.game.fleets.contains(outside));
        // max(10, 400 / 4)
        assert_eq!(u.game.mine_fields.get(id).unwrap().num_mines, 300);
        assert_eq!(u.game.player(u.bob).unwrap().count_messages(MessageKind::MineFieldDetonated), 1);
    }

    #[test]
    fn test_detonation_needs_trait() {
        let mut u = TestUniverse::new();
        let bob = u.bob;
        let id = field(&mut u, bob, 1000, 400);
        u.game.mine_fields.get_mut(id).unwrap().detonate = true;
        let fleet = u.fleet_in_space(u.ann, u.freighter, 1, Vec2Fixed::from_ints(1000, 500));

        u.run(&mut MineFieldDetonateStep::new());

        assert!(u.game.fleets.contains(fleet));
        assert_eq!(u.game.mine_fields.get(id).unwrap().num_mines, 400);
    }

    fn minelayer(u: &mut TestUniverse, duration: Option<u32>) -> FleetId {
        let design = u.game.add_design(ShipDesign {
            owner: u.ann,
            name: "Layer".to_string(),
            mine_lay_rates: [(MineFieldType::Standard, 50)].into_iter().collect(),
            ..ShipDesign::default()
        });
        let fleet = u.fleet_in_space(u.ann, design, 2, Vec2Fixed::from_ints(600, 600));
        u.game
            .set_waypoint_task(
                fleet,
                0,
                WaypointTask::LayMineField {
                    field_type: MineFieldType::Standard,
                    duration,
                },
            )
            .unwrap();
        fleet
    }

    #[test]
    fn test_laying_creates_then_grows_field() {
        let mut u = TestUniverse::new();
        minelayer(&mut u, None);

        u.run(&mut MineLayingStep::new());
        u.run(&mut MineLayingStep::new());

        assert_eq!(u.game.mine_fields.len(), 1);
        let f = u.game.mine_fields.values().next().unwrap();
        assert_eq!(f.num_mines, 200);
        assert_eq!(f.owner, u.ann);
    }

    #[test]
    fn test_laying_duration_counts_down() {
        let mut u = TestUniverse::new();
        let fleet = minelayer(&mut u, Some(2));

        u.run(&mut MineLayingStep::new());
        assert_eq!(
            u.game.fleets.get(fleet).unwrap().waypoints[0].task,
            WaypointTask::LayMineField {
                field_type: MineFieldType::Standard,
                duration: Some(1)
            }
        );
        u.run(&mut MineLayingStep::new());
        assert_eq!(u.game.fleets.get(fleet).unwrap().waypoints[0].task, WaypointTask::None);
        u.run(&mut MineLayingStep::new());
        assert_eq!(u.game.mine_fields.values().next().unwrap().num_mines, 200);
    }

    #[test]
    fn test_sweep_only_enemy_fields() {
        let mut u = TestUniverse::new();
        let sweeper = u.game.add_design(ShipDesign {
            owner: u.ann,
            name: "Sweeper".to_string(),
            weapons_power: 10,
            mine_sweep: 40,
            ..ShipDesign::default()
        });
        let bob = u.bob;
        let enemy = field(&mut u, bob, 1000, 900);
        let ann = u.ann;
        let own = field(&mut u, ann, 1000, 900);
        u.fleet_in_space(u.ann, sweeper, 1, Vec2Fixed::from_ints(1000, 500));

        u.run(&mut MineSweepStep::new());

        assert_eq!(u.game.mine_fields.get(enemy).unwrap().num_mines, 860);
        assert_eq!(u.game.mine_fields.get(own).unwrap().num_mines, 900);
        assert_eq!(u.game.player(u.bob).unwrap().count_messages(MessageKind::MineFieldSwept), 1);
    }
}
