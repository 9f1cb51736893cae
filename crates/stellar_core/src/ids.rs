//! Strongly typed identifiers for everything on the galaxy map.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);

        impl $name {
            /// Create a new identifier.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Player number. Players are numbered from zero in join order.
    PlayerId(u8),
    "player"
);
id_type!(
    /// Planet identifier.
    PlanetId(u32),
    "planet"
);
id_type!(
    /// Fleet identifier. Starbases are fleets too.
    FleetId(u32),
    "fleet"
);
id_type!(
    /// Mine field identifier.
    MineFieldId(u32),
    "minefield"
);
id_type!(
    /// Mineral packet identifier.
    PacketId(u32),
    "packet"
);
id_type!(
    /// Salvage identifier.
    SalvageId(u32),
    "salvage"
);
id_type!(
    /// Wormhole identifier.
    WormholeId(u32),
    "wormhole"
);
id_type!(
    /// Ship design identifier.
    DesignId(u32),
    "design"
);
id_type!(
    /// Waypoint identifier, unique for the lifetime of a game.
    WaypointId(u64),
    "waypoint"
);

/// Identifier that can key a [`Storage`](crate::game::Storage).
pub trait EntityKey: Copy + Ord + std::hash::Hash + std::fmt::Debug {
    /// Build the key for a raw index.
    fn from_index(index: u32) -> Self;
    /// Raw index of this key.
    fn index(self) -> u32;
}

macro_rules! entity_key {
    ($($name:ident),*) => {
        $(
            impl EntityKey for $name {
                fn from_index(index: u32) -> Self {
                    Self(index)
                }

                fn index(self) -> u32 {
                    self.0
                }
            }
        )*
    };
}

entity_key!(PlanetId, FleetId, MineFieldId, PacketId, SalvageId, WormholeId, DesignId);

/// A reference to any object that has a position on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MapObjectRef {
    /// A planet.
    Planet(PlanetId),
    /// A fleet or starbase.
    Fleet(FleetId),
    /// A mine field.
    MineField(MineFieldId),
    /// A mineral packet in flight.
    MineralPacket(PacketId),
    /// Salvage left by scrapping in deep space.
    Salvage(SalvageId),
    /// A wormhole endpoint.
    Wormhole(WormholeId),
}

impl MapObjectRef {
    /// The planet id, if this refers to a planet.
    #[must_use]
    pub const fn as_planet(self) -> Option<PlanetId> {
        match self {
            Self::Planet(id) => Some(id),
            _ => None,
        }
    }

    /// The fleet id, if this refers to a fleet.
    #[must_use]
    pub const fn as_fleet(self) -> Option<FleetId> {
        match self {
            Self::Fleet(id) => Some(id),
            _ => None,
        }
    }

    /// The wormhole id, if this refers to a wormhole.
    #[must_use]
    pub const fn as_wormhole(self) -> Option<WormholeId> {
        match self {
            Self::Wormhole(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for MapObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planet(id) => id.fmt(f),
            Self::Fleet(id) => id.fmt(f),
            Self::MineField(id) => id.fmt(f),
            Self::MineralPacket(id) => id.fmt(f),
            Self::Salvage(id) => id.fmt(f),
            Self::Wormhole(id) => id.fmt(f),
        }
    }
}
