//! Production queues.
//!
//! Each owned planet spends its surface minerals and its share of the
//! year's resources on its queue, front to back. A unit that cannot be paid
//! for in full keeps a proportional allocation on its item for next year and
//! blocks the rest of the queue, except auto items, which give their
//! allocation back and let later items try.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use crate::cargo::{Cargo, Cost, Mineral};
use crate::fleet::{Fleet, ShipToken};
use crate::game::{Game, OwnedPlanets};
use crate::ids::{DesignId, FleetId, MapObjectRef, PlanetId, PlayerId};
use crate::message::MessageKind;
use crate::packet::MineralPacket;
use crate::planet::{Planet, ProductionItemKind, ProductionQueueItem};
use crate::player::Player;
use crate::rules::PacketRules;
use crate::step::{Step, StepContext};
use crate::terraform::{terraform_once, terraform_steps_available};

/// The part of `cost_per` that `funds` can cover in proportion.
///
/// Every component is scaled by the smallest coverage ratio among the
/// components the unit needs, floored. A component the unit does not need
/// counts as fully covered; the ratio never exceeds one.
#[must_use]
pub fn allocate_partial_build(cost_per: &Cost, funds: &Cost) -> Cost {
    // Ratio as numerator / denominator, starting at 1.
    let mut ratio = (1i128, 1i128);
    for (have, need) in funds.components().into_iter().zip(cost_per.components()) {
        if need <= 0 {
            continue;
        }
        let have = i128::from(have.max(0)).min(i128::from(need));
        let need = i128::from(need);
        if have * ratio.1 < ratio.0 * need {
            ratio = (have, need);
        }
    }
    let scaled = cost_per
        .components()
        .map(|c| (i128::from(c.max(0)) * ratio.0 / ratio.1) as i64);
    Cost::from_components(scaled)
}

/// Wanted units and unit cost for one queue item this year.
#[derive(Debug, Clone, Copy)]
struct ItemPlan {
    wanted: i64,
    capped: bool,
    cost: Cost,
}

enum ItemOutcome {
    Remove,
    Keep,
    Stop,
}

fn item_label(kind: ProductionItemKind) -> &'static str {
    use ProductionItemKind as K;
    match kind {
        K::Mine | K::AutoMines => "mines",
        K::Factory | K::AutoFactories => "factories",
        K::Defense | K::AutoDefenses => "defenses",
        K::MineralAlchemy | K::AutoMineralAlchemy => "mineral alchemy",
        K::Terraform | K::AutoTerraform => "terraform",
        K::MixedPacket => "mixed packet",
        K::IroniumPacket => "ironium packet",
        K::BoraniumPacket => "boranium packet",
        K::GermaniumPacket => "germanium packet",
        K::ShipToken => "ships",
        K::Starbase => "starbase",
    }
}

fn packet_mineral(kind: ProductionItemKind) -> Option<Mineral> {
    match kind {
        ProductionItemKind::IroniumPacket => Some(Mineral::Ironium),
        ProductionItemKind::BoraniumPacket => Some(Mineral::Boranium),
        ProductionItemKind::GermaniumPacket => Some(Mineral::Germanium),
        _ => None,
    }
}

/// Unit cost and cargo of a packet item.
fn packet_terms(kind: ProductionItemKind, rules: &PacketRules) -> (Cost, Cargo) {
    match packet_mineral(kind) {
        Some(mineral) => {
            let mut cost = Cost::resources(rules.resource_cost);
            let mut cargo = Cargo::ZERO;
            cargo.add(mineral.cargo_type(), rules.mineral_per_packet);
            let mut minerals = Cargo::ZERO;
            minerals.add(mineral.cargo_type(), rules.mineral_cost_per_packet);
            cost += minerals.to_cost();
            (cost, cargo)
        }
        None => {
            let each = rules.mixed_cost_per_mineral;
            (
                Cost::new(each, each, each, rules.resource_cost),
                Cargo::minerals(rules.mixed_per_mineral, rules.mixed_per_mineral, rules.mixed_per_mineral),
            )
        }
    }
}

fn plan_item(
    game: &Game,
    planet: &Planet,
    player: &Player,
    item: &ProductionQueueItem,
) -> Result<ItemPlan, (MessageKind, String)> {
    use ProductionItemKind as K;
    let rules = &game.rules;
    let race = &player.race;
    let spec = &planet.spec;

    let (limit, cost) = match item.kind {
        K::Mine => (Some(spec.max_mines - planet.mines), race.mine_cost),
        K::AutoMines => (Some(spec.max_operable_mines - planet.mines), race.mine_cost),
        K::Factory => (Some(spec.max_factories - planet.factories), race.factory_cost),
        K::AutoFactories => (
            Some(spec.max_operable_factories - planet.factories),
            race.factory_cost,
        ),
        K::Defense | K::AutoDefenses => (
            Some(spec.max_defenses - planet.defenses),
            rules.production.defense_cost,
        ),
        K::MineralAlchemy | K::AutoMineralAlchemy => {
            let cost = if race.traits.mineral_alchemy_discount {
                rules.production.alchemy_discount_cost
            } else {
                rules.production.alchemy_cost
            };
            (None, cost)
        }
        K::Terraform | K::AutoTerraform => (
            Some(terraform_steps_available(
                &planet.hab,
                &planet.original_hab,
                race,
                &player.tech,
            )),
            rules.production.terraform_cost,
        ),
        K::MixedPacket | K::IroniumPacket | K::BoraniumPacket | K::GermaniumPacket => {
            if spec.mass_driver_warp == 0 {
                return Err((
                    MessageKind::PacketBuildFailed,
                    format!("{} has no mass driver to launch packets", planet.name),
                ));
            }
            if !planet.packet_target.is_some_and(|t| game.planets.contains(t)) {
                return Err((
                    MessageKind::PacketBuildFailed,
                    format!("{} has no packet target", planet.name),
                ));
            }
            (None, packet_terms(item.kind, &rules.packets).0)
        }
        K::ShipToken | K::Starbase => {
            let design = item
                .design
                .and_then(|d| game.designs.get(d))
                .filter(|d| d.owner == player.id)
                .ok_or_else(|| {
                    (
                        MessageKind::ProductionInvalid,
                        format!("{} has no design for a {} item", planet.name, item_label(item.kind)),
                    )
                })?;
            if design.is_starbase() != (item.kind == K::Starbase) {
                return Err((
                    MessageKind::ProductionInvalid,
                    format!("{} cannot build {} as {}", planet.name, design.name, item_label(item.kind)),
                ));
            }
            if item.kind == K::ShipToken {
                (None, design.cost)
            } else {
                let existing = planet
                    .starbase
                    .and_then(|f| game.fleets.get(f))
                    .and_then(|f| f.tokens.first())
                    .and_then(|t| game.designs.get(t.design));
                if existing.is_some_and(|e| e.id == design.id) {
                    return Err((
                        MessageKind::ProductionInvalid,
                        format!("{} already has a {}", planet.name, design.name),
                    ));
                }
                let credit = existing.map_or(Cost::ZERO, |e| e.cost);
                (Some(1), design.cost.saturating_sub(&credit))
            }
        }
    };

    let quantity = item.quantity.max(0);
    let wanted = limit.map_or(quantity, |l| quantity.min(l.max(0)));
    Ok(ItemPlan {
        wanted,
        capped: wanted < quantity,
        cost,
    })
}

/// Builds production queues on every owned planet.
#[derive(Debug, Default)]
pub struct ProductionStep {
    planets: Vec<PlanetId>,
    /// Fleets built this year, by planet and design.
    new_fleets: BTreeMap<(PlanetId, DesignId), FleetId>,
}

impl ProductionStep {
    /// Create the step.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn produce(&mut self, ctx: &mut StepContext<'_>, planet_id: PlanetId) {
        let Some(planet) = ctx.game.planets.get(planet_id) else {
            return;
        };
        let Some(owner) = planet.owner else {
            return;
        };
        let Some(player) = ctx.game.player(owner) else {
            error!(planet = %planet_id, player = %owner, "Planet owner is not a player");
            return;
        };
        let resources = planet.spec.resources_per_year + planet.bonus_resources;
        let research = resources * player.research_percent.clamp(0, 100) / 100;
        let mut funds = planet.cargo.to_cost() + Cost::resources(resources - research);

        let items = match ctx.game.planets.get_mut(planet_id) {
            Some(p) => {
                p.bonus_resources = 0;
                std::mem::take(&mut p.production_queue.items)
            }
            None => return,
        };

        let mut kept = Vec::with_capacity(items.len());
        let mut items = items.into_iter();
        while let Some(mut item) = items.next() {
            match self.build_item(ctx, planet_id, owner, &mut item, &mut funds) {
                ItemOutcome::Remove => {}
                ItemOutcome::Keep => kept.push(item),
                ItemOutcome::Stop => {
                    kept.push(item);
                    kept.extend(items.by_ref());
                }
            }
        }

        if let Some(p) = ctx.game.planets.get_mut(planet_id) {
            p.production_queue.items = kept;
            p.cargo = Cargo::new(funds.ironium, funds.boranium, funds.germanium, p.cargo.colonists);
        }
        if let Some(player) = ctx.game.player_mut(owner) {
            player.leftover_resources += research + funds.resources.max(0);
        }
        ctx.game.recompute_planet_spec(planet_id);
    }

    fn build_item(
        &mut self,
        ctx: &mut StepContext<'_>,
        planet_id: PlanetId,
        owner: PlayerId,
        item: &mut ProductionQueueItem,
        funds: &mut Cost,
    ) -> ItemOutcome {
        let auto = item.kind.is_auto();
        let plan = {
            let (Some(planet), Some(player)) = (ctx.game.planets.get(planet_id), ctx.game.player(owner)) else {
                return ItemOutcome::Keep;
            };
            plan_item(ctx.game, planet, player, item)
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err((kind, text)) => {
                warn!(planet = %planet_id, item = ?item.kind, reason = %text, "Dropping production item");
                *funds += item.allocated;
                ctx.game.message(owner, kind, text, Some(MapObjectRef::Planet(planet_id)));
                return ItemOutcome::Remove;
            }
        };

        if plan.wanted == 0 {
            if auto {
                return ItemOutcome::Keep;
            }
            *funds += item.allocated;
            return ItemOutcome::Remove;
        }

        let mut available = *funds + item.allocated;
        item.allocated = Cost::ZERO;
        let built = plan.wanted.min(available.times_affordable(&plan.cost));
        if built > 0 {
            available -= plan.cost * built;
            self.apply(ctx, planet_id, owner, item, built);
            if item.kind.is_alchemy() {
                // Surface minerals live in the working pool until the queue is done.
                available += Cost::new(built, built, built, 0);
            }
        }

        if built == plan.wanted {
            *funds = available;
            if auto {
                return ItemOutcome::Keep;
            }
            item.quantity -= built;
            return if item.quantity <= 0 || plan.capped {
                ItemOutcome::Remove
            } else {
                ItemOutcome::Keep
            };
        }

        if auto {
            *funds = available;
            return ItemOutcome::Keep;
        }
        item.quantity -= built;
        let partial = allocate_partial_build(&plan.cost, &available);
        item.allocated = partial;
        *funds = available - partial;
        debug!(planet = %planet_id, item = ?item.kind, ?partial, "Partial allocation");
        ItemOutcome::Stop
    }

    fn apply(
        &mut self,
        ctx: &mut StepContext<'_>,
        planet_id: PlanetId,
        owner: PlayerId,
        item: &ProductionQueueItem,
        built: i64,
    ) {
        use ProductionItemKind as K;
        match item.kind {
            K::ShipToken => {
                if let Some(design) = item.design {
                    self.build_ships(ctx, planet_id, owner, design, built);
                }
                return;
            }
            K::Starbase => {
                if let Some(design) = item.design {
                    build_starbase(ctx, planet_id, owner, design);
                }
                return;
            }
            K::MixedPacket | K::IroniumPacket | K::BoraniumPacket | K::GermaniumPacket => {
                launch_packet(ctx, planet_id, owner, item.kind, built);
                return;
            }
            _ => {}
        }

        let (race, tech) = match ctx.game.player(owner) {
            Some(p) => (p.race.clone(), p.tech),
            None => return,
        };
        let Some(planet) = ctx.game.planets.get_mut(planet_id) else {
            return;
        };
        let mut done = built;
        match item.kind {
            K::Mine | K::AutoMines => planet.mines += built,
            K::Factory | K::AutoFactories => planet.factories += built,
            K::Defense | K::AutoDefenses => planet.defenses += built,
            K::Terraform | K::AutoTerraform => {
                let original = planet.original_hab;
                done = (0..built)
                    .filter_map(|_| terraform_once(&mut planet.hab, &original, &race, &tech))
                    .count() as i64;
            }
            _ => {}
        }
        let text = format!("{} built {done} {}", planet.name, item_label(item.kind));
        ctx.game.recompute_planet_spec(planet_id);
        ctx.game
            .message(owner, MessageKind::ItemBuilt, text, Some(MapObjectRef::Planet(planet_id)));
    }

    fn build_ships(
        &mut self,
        ctx: &mut StepContext<'_>,
        planet_id: PlanetId,
        owner: PlayerId,
        design_id: DesignId,
        count: i64,
    ) {
        let Some(planet) = ctx.game.planets.get(planet_id) else {
            return;
        };
        let position = planet.position;
        let reinforce = planet.reinforce_fleet.filter(|f| {
            ctx.game.fleets.get(*f).is_some_and(|f| {
                f.owner == owner && f.orbiting == Some(planet_id) && !f.is_starbase()
            })
        });
        let joining = reinforce.or_else(|| {
            self.new_fleets
                .get(&(planet_id, design_id))
                .copied()
                .filter(|f| ctx.game.fleets.contains(*f))
        });
        let Some(design) = ctx.game.designs.get(design_id) else {
            return;
        };
        let design_name = design.name.clone();
        let fuel = design.fuel_capacity * count;

        let fleet_id = match joining {
            Some(id) => {
                if let Some(fleet) = ctx.game.fleets.get_mut(id) {
                    fleet.tokens.push(ShipToken::new(design_id, count));
                    fleet.consolidate_tokens();
                    fleet.fuel += fuel;
                }
                ctx.game.recompute_fleet_spec(id);
                id
            }
            None => {
                let mut fleet = Fleet::new(owner, design_name.clone(), position, vec![ShipToken::new(design_id, count)]);
                fleet.orbiting = Some(planet_id);
                let id = ctx.game.add_fleet(fleet);
                if let Some(fleet) = ctx.game.fleets.get_mut(id) {
                    fleet.name = format!("{design_name} #{}", id.0);
                    fleet.refuel();
                }
                self.new_fleets.insert((planet_id, design_id), id);
                id
            }
        };

        if let Some(player) = ctx.game.players.get_mut(&owner) {
            ctx.collaborators
                .discoverer
                .discover(player, MapObjectRef::Fleet(fleet_id), true);
        }
        debug!(planet = %planet_id, fleet = %fleet_id, count, "Ships built");
        ctx.game.message(
            owner,
            MessageKind::FleetBuilt,
            format!("{count} {design_name} built and assigned to {fleet_id}"),
            Some(MapObjectRef::Fleet(fleet_id)),
        );
    }
}

fn build_starbase(ctx: &mut StepContext<'_>, planet_id: PlanetId, owner: PlayerId, design: DesignId) {
    let existing = ctx
        .game
        .planets
        .get(planet_id)
        .and_then(|p| p.starbase)
        .filter(|f| ctx.game.fleets.contains(*f));
    let starbase = match existing {
        Some(id) => {
            if let Some(fleet) = ctx.game.fleets.get_mut(id) {
                fleet.tokens = vec![ShipToken::new(design, 1)];
            }
            ctx.game.recompute_fleet_spec(id);
            if let Some(fleet) = ctx.game.fleets.get_mut(id) {
                fleet.refuel();
            }
            ctx.game.recompute_planet_spec(planet_id);
            id
        }
        None => match ctx.game.add_starbase(planet_id, design) {
            Ok(id) => id,
            Err(err) => {
                error!(planet = %planet_id, %err, "Could not install starbase");
                return;
            }
        },
    };
    ctx.game.message(
        owner,
        MessageKind::StarbaseBuilt,
        format!("{starbase} completed"),
        Some(MapObjectRef::Planet(planet_id)),
    );
}

fn launch_packet(
    ctx: &mut StepContext<'_>,
    planet_id: PlanetId,
    owner: PlayerId,
    kind: ProductionItemKind,
    built: i64,
) {
    let Some(planet) = ctx.game.planets.get(planet_id) else {
        return;
    };
    let Some(target) = planet.packet_target else {
        return;
    };
    let driver = planet.spec.mass_driver_warp;
    let warp = if planet.packet_speed > 0 {
        planet.packet_speed
    } else {
        driver
    };
    let position = planet.position;
    let cargo = packet_terms(kind, &ctx.game.rules.packets).1;
    let cargo = Cargo::minerals(cargo.ironium * built, cargo.boranium * built, cargo.germanium * built);

    let packet = ctx
        .game
        .add_packet(MineralPacket::new(owner, position, cargo, warp, driver, target));
    debug!(planet = %planet_id, packet = %packet, warp, "Packet launched");
    ctx.game.message(
        owner,
        MessageKind::PacketLaunched,
        format!("{packet} launched at warp {warp} carrying {} kT", cargo.total()),
        Some(MapObjectRef::MineralPacket(packet)),
    );
}

impl Step for ProductionStep {
    fn name(&self) -> &'static str {
        "production"
    }

    fn pre_process(&mut self, _ctx: &mut StepContext<'_>, owned_planets: &OwnedPlanets) {
        self.new_fleets.clear();
        self.planets = owned_planets.values().flatten().copied().collect();
        self.planets.sort_unstable();
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        for planet in std::mem::take(&mut self.planets) {
            self.produce(ctx, planet);
        }
    }

    fn recompute_specs_after(&self) -> bool {
        true
    }
}
