//! Player-facing messages.
//!
//! Every visible consequence of turn generation lands in the affected
//! player's inbox as a typed [`Message`]. The text is for humans; the
//! [`MessageKind`] and the condition that triggered it are what tests and
//! clients rely on.

use serde::{Deserialize, Serialize};

use crate::ids::MapObjectRef;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Cargo moved between a fleet and a planet or fleet.
    CargoTransferred,
    /// A transport order could not be carried out.
    InvalidCargoTransfer,
    /// A planet was colonized.
    PlanetColonized,
    /// A colonize order could not be carried out.
    InvalidColonize,
    /// A fleet was scrapped.
    FleetScrapped,
    /// A fleet mined a planet remotely.
    RemoteMined,
    /// A remote mining order could not be carried out.
    InvalidRemoteMining,
    /// Two fleets merged.
    FleetsMerged,
    /// A merge order could not be carried out.
    InvalidMerge,
    /// A fleet was routed onward by a planet.
    FleetRouted,
    /// A route order could not be carried out.
    InvalidRoute,
    /// A fleet changed hands.
    FleetTransferred,
    /// A transfer order could not be carried out.
    InvalidTransfer,
    /// A patrol order could not be carried out.
    InvalidPatrol,
    /// A patrolling fleet set out to intercept an enemy.
    PatrolIntercept,
    /// A mine laying order could not be carried out.
    InvalidMineLaying,
    /// A fleet has nothing left to do.
    FleetIdle,
    /// A fleet ran out of fuel.
    FleetOutOfFuel,
    /// A fleet travelled through a wormhole.
    WormholeTravelled,
    /// A fleet struck a mine.
    MineFieldHit,
    /// A mine field was detonated.
    MineFieldDetonated,
    /// Mines were swept.
    MineFieldSwept,
    /// Mines were laid.
    MinesLaid,
    /// A production item was built.
    ItemBuilt,
    /// A production item was dropped from the queue.
    ProductionInvalid,
    /// A packet item had no mass driver or no target.
    PacketBuildFailed,
    /// A mineral packet was launched.
    PacketLaunched,
    /// A mineral packet arrived.
    PacketArrived,
    /// A mineral packet struck a planet.
    PacketBombardment,
    /// A new fleet was built.
    FleetBuilt,
    /// A starbase was built.
    StarbaseBuilt,
    /// A tech level was gained.
    TechGained,
    /// A battle took place.
    Battle,
    /// A fleet was destroyed.
    FleetDestroyed,
    /// A planet was bombed.
    PlanetBombed,
    /// A planet was invaded successfully.
    PlanetInvaded,
    /// An invasion was repelled.
    InvasionRepelled,
    /// A planet lost its whole population.
    PlanetDepopulated,
    /// A player won the game.
    Victory,
}

/// One inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Message type.
    pub kind: MessageKind,
    /// Human readable text.
    pub text: String,
    /// The object the message is about.
    pub target: Option<MapObjectRef>,
}

impl Message {
    /// Create a message.
    #[must_use]
    pub fn new(kind: MessageKind, text: impl Into<String>, target: Option<MapObjectRef>) -> Self {
        Self {
            kind,
            text: text.into(),
            target,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target {
            Some(target) => write!(f, "[{:?} {target}] {}", self.kind, self.text),
            None => write!(f, "[{:?}] {}", self.kind, self.text),
        }
    }
}
