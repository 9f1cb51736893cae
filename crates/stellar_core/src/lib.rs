//! # Stellar Core
//!
//! Deterministic turn generation for a space-empire strategy game.
//!
//! One call to [`TurnGenerator::generate`] advances a [`Game`] by exactly
//! one year: fleets carry out their waypoint orders and move, mine fields
//! and packets do their damage, planets produce, research, grow, battles
//! are fought, and every player gets a typed inbox of what happened.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO besides (de)serializing a game or rules
//! - No system randomness (every roll goes through the seeded generator in [`rules::Rules`])
//! - No floating-point math (positions and ratios use fixed-point)
//!
//! ## Crate Structure
//!
//! - [`game`] - Shared game state and deferred deletion
//! - [`steps`] - The yearly steps
//! - [`generator`] - Step ordering and the turn summary
//! - [`collaborators`] - Battle, invasion, discovery and mine damage seams
//! - [`rules`] - Tunable constants and the seeded random generator
//! - [`math`] - Fixed-point math utilities
//!
//! [`TurnGenerator::generate`]: generator::TurnGenerator::generate
//! [`Game`]: game::Game

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cargo;
pub mod collaborators;
pub mod context;
pub mod design;
pub mod error;
pub mod fleet;
pub mod game;
pub mod generator;
pub mod ids;
pub mod map_object;
pub mod math;
pub mod message;
pub mod mine_field;
pub mod packet;
pub mod planet;
pub mod player;
pub mod rules;
pub mod step;
pub mod steps;
pub mod terraform;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cargo::{Cargo, CargoType, Cost, Mineral};
    pub use crate::collaborators::{
        AttritionBattleEngine, Battle, BattleEngine, BattleRecord, Collaborators, CombatStack,
        Discoverer, DiscoveryLog, GroundCombatInvasionResolver, InvasionResolver, MineFieldDamager,
        StandardMineFieldDamager,
    };
    pub use crate::context::TurnContext;
    pub use crate::design::{Bomb, DesignPurpose, Engine, HullKind, ShipDesign};
    pub use crate::error::{GameError, Result};
    pub use crate::fleet::{
        Fleet, FleetSpec, ShipToken, TransportAction, TransportTask, TransportTasks, Waypoint,
        WaypointTask,
    };
    pub use crate::game::{Game, OwnedPlanets, Storage};
    pub use crate::generator::{standard_steps, TurnGenerator, TurnSummary};
    pub use crate::ids::{
        DesignId, FleetId, MapObjectRef, MineFieldId, PacketId, PlanetId, PlayerId, SalvageId,
        WaypointId, WormholeId,
    };
    pub use crate::map_object::{MapObject, Salvage, Wormhole};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::message::{Message, MessageKind};
    pub use crate::mine_field::{MineField, MineFieldStats, MineFieldType};
    pub use crate::packet::MineralPacket;
    pub use crate::planet::{Hab, Planet, PlanetSpec, ProductionItemKind, ProductionQueue, ProductionQueueItem};
    pub use crate::player::{Player, Race, RaceTraits, Relation, ScoreRecord, TechField, TechLevels};
    pub use crate::rules::Rules;
    pub use crate::step::{Step, StepContext};
}
