//! Per-turn scratch state shared between steps.

use std::collections::BTreeSet;

use crate::collaborators::BattleRecord;
use crate::ids::{FleetId, MapObjectRef, PacketId, PlanetId, PlayerId, WaypointId};

/// A colonist drop onto another player's planet, resolved after all
/// unloads of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanetInvasion {
    /// Invaded planet.
    pub planet: PlanetId,
    /// Fleet that dropped the troops.
    pub fleet: FleetId,
    /// Invading player.
    pub attacker: PlayerId,
    /// Colonists dropped.
    pub colonists: i64,
}

/// Signals that later steps read from earlier ones within one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    /// Waypoints whose tasks already ran this turn.
    pub processed_waypoints: BTreeSet<WaypointId>,
    /// Packets that already moved this turn.
    pub processed_packets: BTreeSet<PacketId>,
    /// Objects to remove at the next purge.
    pub pending_deletions: Vec<MapObjectRef>,
    /// Invasions waiting to be resolved.
    pub invasions: Vec<PlanetInvasion>,
    /// Fleets that moved this turn.
    pub moved_fleets: BTreeSet<FleetId>,
    /// Battles fought this turn.
    pub battles: Vec<BattleRecord>,
}

impl TurnContext {
    /// Fresh context for a new turn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an object for deletion at the next purge. Queuing twice is harmless.
    pub fn queue_deletion(&mut self, object: MapObjectRef) {
        if !self.pending_deletions.contains(&object) {
            self.pending_deletions.push(object);
        }
    }

    /// Whether an object is waiting to be purged.
    #[must_use]
    pub fn is_pending_deletion(&self, object: MapObjectRef) -> bool {
        self.pending_deletions.contains(&object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_deletion_dedupes() {
        let mut ctx = TurnContext::new();
        ctx.queue_deletion(MapObjectRef::Fleet(FleetId(1)));
        ctx.queue_deletion(MapObjectRef::Fleet(FleetId(1)));
        assert_eq!(ctx.pending_deletions.len(), 1);
        assert!(ctx.is_pending_deletion(MapObjectRef::Fleet(FleetId(1))));
        assert!(!ctx.is_pending_deletion(MapObjectRef::Fleet(FleetId(2))));
    }
}
