//! Mineral packet flight, catching and bombardment.

use tracing::{debug, warn};

use crate::cargo::{Cargo, Mineral};
use crate::ids::{MapObjectRef, PacketId};
use crate::math::Fixed;
use crate::message::MessageKind;
use crate::step::{Step, StepContext};

/// Colonist-equivalent damage from `uncaught_kt` of minerals arriving at
/// `packet_warp` against a driver rated `driver_warp`.
#[must_use]
pub fn packet_damage(uncaught_kt: i64, packet_warp: u8, driver_warp: u8, divisor: i64) -> i64 {
    let packet = i64::from(packet_warp).pow(2);
    let driver = i64::from(driver_warp).pow(2);
    if divisor <= 0 || packet <= driver {
        return 0;
    }
    (uncaught_kt.max(0) * (packet - driver) / divisor).max(0)
}

/// Moves packets. The second pass moves only packets launched after the
/// first pass.
#[derive(Debug)]
pub struct PacketMoveStep {
    pass: u8,
    moved: Vec<PacketId>,
}

impl PacketMoveStep {
    /// Create the step for pass 0 or 1.
    #[must_use]
    pub fn new(pass: u8) -> Self {
        Self {
            pass,
            moved: Vec::new(),
        }
    }
}

impl Step for PacketMoveStep {
    fn name(&self) -> &'static str {
        if self.pass == 0 {
            "packet_move_0"
        } else {
            "packet_move_1"
        }
    }

    fn process(&mut self, ctx: &mut StepContext<'_>) {
        self.moved.clear();
        for id in ctx.game.packets.sorted_ids() {
            if ctx.turn.processed_packets.contains(&id)
                || ctx.turn.is_pending_deletion(MapObjectRef::MineralPacket(id))
            {
                continue;
            }
            move_packet(ctx, id);
            self.moved.push(id);
        }
    }

    fn post_process(&mut self, ctx: &mut StepContext<'_>) {
        ctx.turn.processed_packets.extend(self.moved.drain(..));
    }
}

fn move_packet(ctx: &mut StepContext<'_>, id: PacketId) {
    let Some(packet) = ctx.game.packets.get(id) else {
        return;
    };
    let Some(destination) = ctx.game.planets.get(packet.target).map(|p| p.position) else {
        warn!(packet = %id, target = %packet.target, "Packet target is gone");
        ctx.turn.queue_deletion(MapObjectRef::MineralPacket(id));
        return;
    };
    let speed = packet.speed();
    let distance = packet.position.distance(destination);
    if distance <= speed {
        if let Some(packet) = ctx.game.packets.get_mut(id) {
            packet.position = destination;
            packet.distance_travelled += distance;
        }
        arrive(ctx, id);
        return;
    }

    let ages = !ctx
        .game
        .player(packet.owner)
        .is_some_and(|p| p.race.traits.packet_physics);
    if let Some(packet) = ctx.game.packets.get_mut(id) {
        packet.position = packet.position.move_toward(destination, speed);
        packet.distance_travelled += speed;
        if ages {
            packet.decay();
        }
        debug!(packet = %id, cargo = packet.cargo.total(), "Packet moved");
    }
}

fn arrive(ctx: &mut StepContext<'_>, id: PacketId) {
    ctx.turn.queue_deletion(MapObjectRef::MineralPacket(id));
    let Some(packet) = ctx.game.packets.get(id).cloned() else {
        return;
    };
    let divisor = ctx.game.rules.packets.damage_divisor;
    let Some(planet) = ctx.game.planets.get_mut(packet.target) else {
        return;
    };
    let planet_id = planet.id;
    let driver = planet.spec.mass_driver_warp;
    let target = Some(MapObjectRef::Planet(planet_id));

    if planet.owner.is_none() || driver >= packet.warp {
        planet.cargo += packet.cargo.without_colonists();
        let text = format!("{id} delivered {} kT to {}", packet.cargo.total(), planet.name);
        let owner = planet.owner;
        debug!(packet = %id, planet = %planet_id, "Packet caught");
        ctx.game
            .message(packet.owner, MessageKind::PacketArrived, text.clone(), target);
        if let Some(owner) = owner.filter(|o| *o != packet.owner) {
            ctx.game.message(owner, MessageKind::PacketArrived, text, target);
        }
    } else {
        let (numerator, denominator) = (i64::from(driver).pow(2), i64::from(packet.warp).pow(2));
        let mut caught = Cargo::ZERO;
        for mineral in Mineral::ALL {
            caught.add(
                mineral.cargo_type(),
                packet.cargo.mineral(mineral) * numerator / denominator,
            );
        }
        let uncaught = packet.cargo.without_colonists().total() - caught.total();
        let damage = packet_damage(uncaught, packet.warp, driver, divisor);
        let shielded = Fixed::ONE - planet.spec.defense_coverage;
        let killed = (Fixed::from_num(damage.saturating_mul(100)) * shielded).to_num::<i64>();

        planet.cargo += caught;
        planet.population = (planet.population - killed).max(0);
        planet.defenses = (planet.defenses - damage / 10).max(0);
        let depopulated = planet.population == 0;
        let owner = planet.owner;
        let text = format!(
            "{id} struck {} killing {killed} colonists and {} defenses",
            planet.name,
            damage / 10
        );
        if depopulated {
            planet.depopulate();
        }
        warn!(packet = %id, planet = %planet_id, damage, killed, "Packet bombardment");

        ctx.game
            .message(packet.owner, MessageKind::PacketBombardment, text.clone(), target);
        if let Some(owner) = owner {
            if owner != packet.owner {
                ctx.game.message(owner, MessageKind::PacketBombardment, text, target);
            }
            if depopulated {
                ctx.game.message(
                    owner,
                    MessageKind::PlanetDepopulated,
                    format!("{planet_id} lost its entire population"),
                    target,
                );
            }
        }
    }

    if let Some(player) = ctx.game.players.get_mut(&packet.owner) {
        ctx.collaborators
            .discoverer
            .discover(player, MapObjectRef::Planet(planet_id), false);
    }
    ctx.game.recompute_planet_spec(planet_id);
}
