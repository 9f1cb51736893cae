//! The map object capability and the smaller map objects.

use serde::{Deserialize, Serialize};

use crate::cargo::{Cargo, Mineral};
use crate::fleet::Fleet;
use crate::ids::{MapObjectRef, PlayerId, SalvageId, WormholeId};
use crate::math::Vec2Fixed;
use crate::mine_field::MineField;
use crate::packet::MineralPacket;
use crate::planet::Planet;

/// Anything with a place on the galaxy map.
pub trait MapObject {
    /// Reference to this object.
    fn object_ref(&self) -> MapObjectRef;
    /// Current position.
    fn position(&self) -> Vec2Fixed;
    /// Owning player, if any.
    fn owner(&self) -> Option<PlayerId>;
}

/// Minerals left behind by scrapping in deep space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salvage {
    /// Identifier, assigned on insertion.
    pub id: SalvageId,
    /// Player whose fleet left it.
    pub owner: Option<PlayerId>,
    /// Position.
    pub position: Vec2Fixed,
    /// Minerals.
    pub cargo: Cargo,
}

impl Salvage {
    /// New salvage; colonists are dropped.
    #[must_use]
    pub fn new(owner: Option<PlayerId>, position: Vec2Fixed, cargo: Cargo) -> Self {
        Self {
            id: SalvageId::default(),
            owner,
            position,
            cargo: cargo.without_colonists(),
        }
    }

    /// Lose `percent` of each mineral, at least `min_decay` kT each.
    pub fn decay(&mut self, percent: i64, min_decay: i64) {
        for mineral in Mineral::ALL {
            let amount = self.cargo.mineral(mineral);
            if amount <= 0 {
                continue;
            }
            let loss = (amount * percent / 100).max(min_decay).min(amount);
            self.cargo.add(mineral.cargo_type(), -loss);
        }
    }
}

/// One end of a wormhole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wormhole {
    /// Identifier, assigned on insertion.
    pub id: WormholeId,
    /// Position.
    pub position: Vec2Fixed,
    /// The other end.
    pub companion: Option<WormholeId>,
    /// Stability rating; informational.
    pub stability: u32,
}

impl Wormhole {
    /// A wormhole end without a companion.
    #[must_use]
    pub fn new(position: Vec2Fixed) -> Self {
        Self {
            id: WormholeId::default(),
            position,
            companion: None,
            stability: 0,
        }
    }
}

impl MapObject for Planet {
    fn object_ref(&self) -> MapObjectRef {
        MapObjectRef::Planet(self.id)
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn owner(&self) -> Option<PlayerId> {
        self.owner
    }
}

impl MapObject for Fleet {
    fn object_ref(&self) -> MapObjectRef {
        MapObjectRef::Fleet(self.id)
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.owner)
    }
}

impl MapObject for MineField {
    fn object_ref(&self) -> MapObjectRef {
        MapObjectRef::MineField(self.id)
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.owner)
    }
}

impl MapObject for MineralPacket {
    fn object_ref(&self) -> MapObjectRef {
        MapObjectRef::MineralPacket(self.id)
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn owner(&self) -> Option<PlayerId> {
        Some(self.owner)
    }
}

impl MapObject for Salvage {
    fn object_ref(&self) -> MapObjectRef {
        MapObjectRef::Salvage(self.id)
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn owner(&self) -> Option<PlayerId> {
        self.owner
    }
}

impl MapObject for Wormhole {
    fn object_ref(&self) -> MapObjectRef {
        MapObjectRef::Wormhole(self.id)
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn owner(&self) -> Option<PlayerId> {
        None
    }
}
