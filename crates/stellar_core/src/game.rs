//! Shared game state.
//!
//! [`Game`] owns every map object, player and design. Steps receive it by
//! mutable reference; nothing is global.
//!
//! # Determinism
//!
//! - No floating-point math (positions use [`Fixed`](crate::math::Fixed))
//! - One seeded generator, owned by [`Rules`]
//! - Entities live in ordered maps, so iteration and serialization order
//!   never depend on hashing
//! - Deletion is deferred to [`Game::purge`]

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::design::ShipDesign;
use crate::error::{GameError, Result};
use crate::fleet::{compute_fleet_spec, Fleet, ShipToken, Waypoint, WaypointTask};
use crate::ids::{
    DesignId, EntityKey, FleetId, MapObjectRef, MineFieldId, PacketId, PlanetId, PlayerId,
    SalvageId, WaypointId, WormholeId,
};
use crate::map_object::{MapObject, Salvage, Wormhole};
use crate::math::Vec2Fixed;
use crate::message::MessageKind;
use crate::mine_field::MineField;
use crate::packet::MineralPacket;
use crate::planet::{compute_planet_spec, Planet, ProductionQueueItem};
use crate::player::{Player, Race};
use crate::rules::Rules;

/// First game year.
pub const STARTING_YEAR: u32 = 2400;

/// Planets owned by each player, computed at the start of a turn.
pub type OwnedPlanets = BTreeMap<PlayerId, Vec<PlanetId>>;

/// Storage for one kind of entity.
///
/// Ids are allocated from a counter that never reuses a value. Iteration
/// follows id order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Storage<K: EntityKey, V> {
    items: BTreeMap<K, V>,
    next_id: u32,
}

impl<K: EntityKey, V> Default for Storage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKey, V> Storage<K, V> {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocate an id and insert the value built for it.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> V) -> K {
        let id = K::from_index(self.next_id);
        self.next_id += 1;
        self.items.insert(id, build(id));
        id
    }

    /// Remove a value by id.
    pub fn remove(&mut self, id: K) -> Option<V> {
        self.items.remove(&id)
    }

    /// Get a value by id.
    #[must_use]
    pub fn get(&self, id: K) -> Option<&V> {
        self.items.get(&id)
    }

    /// Get a mutable value by id.
    pub fn get_mut(&mut self, id: K) -> Option<&mut V> {
        self.items.get_mut(&id)
    }

    /// Check if an id exists.
    #[must_use]
    pub fn contains(&self, id: K) -> bool {
        self.items.contains_key(&id)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids in ascending order, detached from the storage so callers can
    /// mutate while walking them.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<K> {
        self.items.keys().copied().collect()
    }

    /// Iterate in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.items.iter()
    }

    /// Iterate values in id order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.items.values()
    }

    /// Iterate mutable values in id order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.items.values_mut()
    }
}

type PositionKey = (i64, i64);

fn position_key(position: Vec2Fixed) -> PositionKey {
    (position.x.to_bits(), position.y.to_bits())
}

/// The whole universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    /// Current year.
    pub year: u32,
    /// Year the game started.
    pub start_year: u32,
    /// Rules and the random generator.
    pub rules: Rules,
    /// Players by number.
    pub players: BTreeMap<PlayerId, Player>,
    /// Ship designs of every player.
    pub designs: Storage<DesignId, ShipDesign>,
    /// Planets.
    pub planets: Storage<PlanetId, Planet>,
    /// Fleets and starbases.
    pub fleets: Storage<FleetId, Fleet>,
    /// Mine fields.
    pub mine_fields: Storage<MineFieldId, MineField>,
    /// Packets in flight.
    pub packets: Storage<PacketId, MineralPacket>,
    /// Salvage.
    pub salvage: Storage<SalvageId, Salvage>,
    /// Wormholes.
    pub wormholes: Storage<WormholeId, Wormhole>,
    next_waypoint_id: u64,
    #[serde(skip)]
    objects_by_position: BTreeMap<PositionKey, Vec<MapObjectRef>>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(Rules::default())
    }
}

impl Game {
    /// An empty universe.
    #[must_use]
    pub fn new(rules: Rules) -> Self {
        Self {
            year: STARTING_YEAR,
            start_year: STARTING_YEAR,
            rules,
            players: BTreeMap::new(),
            designs: Storage::new(),
            planets: Storage::new(),
            fleets: Storage::new(),
            mine_fields: Storage::new(),
            packets: Storage::new(),
            salvage: Storage::new(),
            wormholes: Storage::new(),
            next_waypoint_id: 1,
            objects_by_position: BTreeMap::new(),
        }
    }

    /// Years since the game started.
    #[must_use]
    pub fn years_elapsed(&self) -> u32 {
        self.year.saturating_sub(self.start_year)
    }

    /// Add a player. Players are numbered in join order.
    pub fn add_player(&mut self, name: impl Into<String>, race: Race) -> PlayerId {
        let id = PlayerId(self.players.len().min(usize::from(u8::MAX)) as u8);
        self.players.insert(id, Player::new(id, name, race));
        id
    }

    /// Add a ship design.
    pub fn add_design(&mut self, design: ShipDesign) -> DesignId {
        self.designs.insert_with(|id| ShipDesign { id, ..design })
    }

    /// Add a planet.
    pub fn add_planet(&mut self, planet: Planet) -> PlanetId {
        let id = self.planets.insert_with(|id| Planet { id, ..planet });
        self.index_object(MapObjectRef::Planet(id));
        self.recompute_planet_spec(id);
        id
    }

    /// Add a fleet. A fleet without waypoints gets one at its position.
    pub fn add_fleet(&mut self, fleet: Fleet) -> FleetId {
        let id = self.fleets.insert_with(|id| Fleet { id, ..fleet });
        let needs_waypoint = self.fleets.get(id).is_some_and(|f| f.waypoints.is_empty());
        if needs_waypoint {
            let (position, orbiting) = self
                .fleets
                .get(id)
                .map(|f| (f.position, f.orbiting))
                .unwrap_or_default();
            let target = orbiting.map(MapObjectRef::Planet);
            let waypoint = self.new_waypoint(position, target, 0, WaypointTask::None);
            if let Some(fleet) = self.fleets.get_mut(id) {
                fleet.waypoints.push(waypoint);
            }
        }
        self.index_object(MapObjectRef::Fleet(id));
        self.recompute_fleet_spec(id);
        id
    }

    /// Add a starbase fleet bound to `planet`, replacing the planet's link.
    pub fn add_starbase(&mut self, planet: PlanetId, design: DesignId) -> Result<FleetId> {
        let (owner, position, name) = {
            let p = self
                .planets
                .get(planet)
                .ok_or(GameError::EntityNotFound(MapObjectRef::Planet(planet)))?;
            let owner = p.owner.ok_or_else(|| {
                GameError::InvalidState(format!("{planet} has no owner for a starbase"))
            })?;
            (owner, p.position, format!("{} Starbase", p.name))
        };
        if !self.designs.contains(design) {
            return Err(GameError::DesignNotFound(design));
        }
        let mut fleet = Fleet::new(owner, name, position, vec![ShipToken::new(design, 1)]);
        fleet.starbase_of = Some(planet);
        fleet.orbiting = Some(planet);
        let id = self.add_fleet(fleet);
        if let Some(fleet) = self.fleets.get_mut(id) {
            fleet.refuel();
        }
        if let Some(p) = self.planets.get_mut(planet) {
            p.starbase = Some(id);
        }
        self.recompute_planet_spec(planet);
        Ok(id)
    }

    /// Add a mine field.
    pub fn add_mine_field(&mut self, field: MineField) -> MineFieldId {
        let id = self.mine_fields.insert_with(|id| MineField { id, ..field });
        self.index_object(MapObjectRef::MineField(id));
        id
    }

    /// Add a packet.
    pub fn add_packet(&mut self, packet: MineralPacket) -> PacketId {
        let id = self.packets.insert_with(|id| MineralPacket { id, ..packet });
        self.index_object(MapObjectRef::MineralPacket(id));
        id
    }

    /// Add salvage.
    pub fn add_salvage(&mut self, salvage: Salvage) -> SalvageId {
        let id = self.salvage.insert_with(|id| Salvage { id, ..salvage });
        self.index_object(MapObjectRef::Salvage(id));
        id
    }

    /// Add a wormhole end.
    pub fn add_wormhole(&mut self, wormhole: Wormhole) -> WormholeId {
        let id = self.wormholes.insert_with(|id| Wormhole { id, ..wormhole });
        self.index_object(MapObjectRef::Wormhole(id));
        id
    }

    /// Link two wormhole ends to each other.
    pub fn link_wormholes(&mut self, a: WormholeId, b: WormholeId) -> Result<()> {
        if !self.wormholes.contains(b) {
            return Err(GameError::EntityNotFound(MapObjectRef::Wormhole(b)));
        }
        let first = self
            .wormholes
            .get_mut(a)
            .ok_or(GameError::EntityNotFound(MapObjectRef::Wormhole(a)))?;
        first.companion = Some(b);
        if let Some(second) = self.wormholes.get_mut(b) {
            second.companion = Some(a);
        }
        Ok(())
    }

    /// A waypoint with a fresh id.
    pub fn new_waypoint(
        &mut self,
        position: Vec2Fixed,
        target: Option<MapObjectRef>,
        warp: u8,
        task: WaypointTask,
    ) -> Waypoint {
        let id = WaypointId(self.next_waypoint_id);
        self.next_waypoint_id += 1;
        Waypoint::new(id, position, target, warp, task)
    }

    /// Give a waypoint a fresh id.
    pub fn reissue_waypoint(&mut self, waypoint: &Waypoint) -> Waypoint {
        let id = WaypointId(self.next_waypoint_id);
        self.next_waypoint_id += 1;
        Waypoint {
            id,
            ..waypoint.clone()
        }
    }

    /// Append a waypoint at an object or a point in space.
    pub fn add_waypoint(
        &mut self,
        fleet: FleetId,
        target: Option<MapObjectRef>,
        position: Vec2Fixed,
        warp: u8,
        task: WaypointTask,
    ) -> Result<WaypointId> {
        if !self.fleets.contains(fleet) {
            return Err(GameError::EntityNotFound(MapObjectRef::Fleet(fleet)));
        }
        let position = match target {
            Some(obj) => self
                .object_position(obj)
                .ok_or(GameError::EntityNotFound(obj))?,
            None => position,
        };
        let waypoint = self.new_waypoint(position, target, warp, task);
        let id = waypoint.id;
        if let Some(f) = self.fleets.get_mut(fleet) {
            f.waypoints.push(waypoint);
        }
        Ok(id)
    }

    /// Replace the task of a fleet's waypoint.
    pub fn set_waypoint_task(&mut self, fleet: FleetId, index: usize, task: WaypointTask) -> Result<()> {
        let f = self
            .fleets
            .get_mut(fleet)
            .ok_or(GameError::EntityNotFound(MapObjectRef::Fleet(fleet)))?;
        let waypoint = f.waypoints.get_mut(index).ok_or_else(|| {
            GameError::InvalidState(format!("{fleet} has no waypoint {index}"))
        })?;
        waypoint.task = task;
        Ok(())
    }

    /// Append an item to a planet's production queue.
    pub fn queue_production(&mut self, planet: PlanetId, item: ProductionQueueItem) -> Result<()> {
        if let Some(design) = item.design {
            if !self.designs.contains(design) {
                return Err(GameError::DesignNotFound(design));
            }
        }
        let p = self
            .planets
            .get_mut(planet)
            .ok_or(GameError::EntityNotFound(MapObjectRef::Planet(planet)))?;
        p.production_queue.push(item);
        Ok(())
    }

    /// A player by number.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// A mutable player by number.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Send a message to a player. Unknown players are ignored.
    pub fn message(
        &mut self,
        player: PlayerId,
        kind: MessageKind,
        text: impl Into<String>,
        target: Option<MapObjectRef>,
    ) {
        if let Some(p) = self.players.get_mut(&player) {
            p.message(kind, text, target);
        }
    }

    /// Whether `a` treats `b` as a friend. Unknown players are nobody's friend.
    #[must_use]
    pub fn is_friend(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b || self.player(a).is_some_and(|p| p.is_friend(b))
    }

    /// Planets owned by each player, in id order.
    #[must_use]
    pub fn owned_planets(&self) -> OwnedPlanets {
        let mut owned = OwnedPlanets::new();
        for player in self.players.keys() {
            owned.insert(*player, Vec::new());
        }
        for planet in self.planets.values() {
            if let Some(owner) = planet.owner {
                owned.entry(owner).or_default().push(planet.id);
            }
        }
        owned
    }

    /// Whether an object still exists.
    #[must_use]
    pub fn contains(&self, object: MapObjectRef) -> bool {
        match object {
            MapObjectRef::Planet(id) => self.planets.contains(id),
            MapObjectRef::Fleet(id) => self.fleets.contains(id),
            MapObjectRef::MineField(id) => self.mine_fields.contains(id),
            MapObjectRef::MineralPacket(id) => self.packets.contains(id),
            MapObjectRef::Salvage(id) => self.salvage.contains(id),
            MapObjectRef::Wormhole(id) => self.wormholes.contains(id),
        }
    }

    /// Current position of an object.
    #[must_use]
    pub fn object_position(&self, object: MapObjectRef) -> Option<Vec2Fixed> {
        match object {
            MapObjectRef::Planet(id) => self.planets.get(id).map(MapObject::position),
            MapObjectRef::Fleet(id) => self.fleets.get(id).map(MapObject::position),
            MapObjectRef::MineField(id) => self.mine_fields.get(id).map(MapObject::position),
            MapObjectRef::MineralPacket(id) => self.packets.get(id).map(MapObject::position),
            MapObjectRef::Salvage(id) => self.salvage.get(id).map(MapObject::position),
            MapObjectRef::Wormhole(id) => self.wormholes.get(id).map(MapObject::position),
        }
    }

    /// Owner of an object.
    #[must_use]
    pub fn object_owner(&self, object: MapObjectRef) -> Option<PlayerId> {
        match object {
            MapObjectRef::Planet(id) => self.planets.get(id).and_then(MapObject::owner),
            MapObjectRef::Fleet(id) => self.fleets.get(id).and_then(MapObject::owner),
            MapObjectRef::MineField(id) => self.mine_fields.get(id).and_then(MapObject::owner),
            MapObjectRef::MineralPacket(id) => self.packets.get(id).and_then(MapObject::owner),
            MapObjectRef::Salvage(id) => self.salvage.get(id).and_then(MapObject::owner),
            MapObjectRef::Wormhole(_) => None,
        }
    }

    /// Objects indexed at exactly this position.
    ///
    /// The index is rebuilt at every purge; planets and wormholes never move
    /// so lookups for them are always current.
    #[must_use]
    pub fn objects_at(&self, position: Vec2Fixed) -> &[MapObjectRef] {
        self.objects_by_position
            .get(&position_key(position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The planet at exactly this position.
    #[must_use]
    pub fn planet_at(&self, position: Vec2Fixed) -> Option<PlanetId> {
        self.objects_at(position)
            .iter()
            .find_map(|obj| obj.as_planet())
    }

    fn index_object(&mut self, object: MapObjectRef) {
        if let Some(position) = self.object_position(object) {
            let entry = self
                .objects_by_position
                .entry(position_key(position))
                .or_default();
            if !entry.contains(&object) {
                entry.push(object);
                entry.sort_unstable();
            }
        }
    }

    /// Rebuild the position index from scratch.
    pub fn rebuild_position_index(&mut self) {
        let mut index: BTreeMap<PositionKey, Vec<MapObjectRef>> = BTreeMap::new();
        let mut add = |object: MapObjectRef, position: Vec2Fixed| {
            index.entry(position_key(position)).or_default().push(object);
        };
        for p in self.planets.values() {
            add(p.object_ref(), p.position);
        }
        for f in self.fleets.values() {
            add(f.object_ref(), f.position);
        }
        for m in self.mine_fields.values() {
            add(m.object_ref(), m.position);
        }
        for p in self.packets.values() {
            add(p.object_ref(), p.position);
        }
        for s in self.salvage.values() {
            add(s.object_ref(), s.position);
        }
        for w in self.wormholes.values() {
            add(w.object_ref(), w.position);
        }
        for objects in index.values_mut() {
            objects.sort_unstable();
        }
        self.objects_by_position = index;
    }

    /// Remove every object queued for deletion and drain the queue.
    ///
    /// Removing a starbase unlinks it from its planet; removing a fleet
    /// clears any planet that named it as reinforcement target.
    pub fn purge(&mut self, deletions: &mut Vec<MapObjectRef>) -> usize {
        let mut removed = 0;
        for object in deletions.drain(..) {
            let existed = match object {
                MapObjectRef::Fleet(id) => match self.fleets.remove(id) {
                    Some(fleet) => {
                        if let Some(planet) = fleet.starbase_of.and_then(|p| self.planets.get_mut(p)) {
                            if planet.starbase == Some(id) {
                                planet.starbase = None;
                            }
                        }
                        for planet in self.planets.values_mut() {
                            if planet.reinforce_fleet == Some(id) {
                                planet.reinforce_fleet = None;
                            }
                        }
                        true
                    }
                    None => false,
                },
                MapObjectRef::MineField(id) => self.mine_fields.remove(id).is_some(),
                MapObjectRef::MineralPacket(id) => self.packets.remove(id).is_some(),
                MapObjectRef::Salvage(id) => self.salvage.remove(id).is_some(),
                MapObjectRef::Planet(id) => self.planets.remove(id).is_some(),
                MapObjectRef::Wormhole(id) => self.wormholes.remove(id).is_some(),
            };
            if existed {
                debug!(object = %object, "Purged");
                removed += 1;
            }
        }
        self.rebuild_position_index();
        removed
    }

    /// Recompute one fleet's spec.
    pub fn recompute_fleet_spec(&mut self, id: FleetId) {
        let Some(fleet) = self.fleets.get(id) else {
            return;
        };
        let spec = compute_fleet_spec(&fleet.tokens, &self.designs);
        if let Some(fleet) = self.fleets.get_mut(id) {
            fleet.spec = spec;
        }
    }

    /// Recompute one planet's spec.
    pub fn recompute_planet_spec(&mut self, id: PlanetId) {
        let Some(planet) = self.planets.get(id) else {
            return;
        };
        let owner = planet.owner.and_then(|o| self.players.get(&o));
        let starbase = planet
            .starbase
            .and_then(|f| self.fleets.get(f))
            .and_then(|f| f.tokens.first())
            .and_then(|t| self.designs.get(t.design));
        let spec = compute_planet_spec(planet, owner, starbase, &self.rules);
        if let Some(planet) = self.planets.get_mut(id) {
            planet.spec = spec;
        }
    }

    /// Recompute every fleet and planet spec. Fleets go first because
    /// planet specs read starbase fleets.
    pub fn recompute_specs(&mut self) {
        for id in self.fleets.sorted_ids() {
            self.recompute_fleet_spec(id);
        }
        for id in self.planets.sorted_ids() {
            self.recompute_planet_spec(id);
        }
    }

    /// Hash of the whole game state.
    ///
    /// Two games with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.year.hash(&mut hasher);
        self.rules.seed.hash(&mut hasher);
        self.rules.rng_word_pos().hash(&mut hasher);
        self.next_waypoint_id.hash(&mut hasher);

        self.players.hash(&mut hasher);
        self.designs.hash(&mut hasher);
        self.planets.hash(&mut hasher);
        self.fleets.hash(&mut hasher);
        self.mine_fields.hash(&mut hasher);
        self.packets.hash(&mut hasher);
        self.salvage.hash(&mut hasher);
        self.wormholes.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the game to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize game: {e}")))
    }

    /// Deserialize a game from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut game: Self = bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize game: {e}")))?;
        game.rebuild_position_index();
        Ok(game)
    }

    /// Serialize the game to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Serialization(format!("Failed to write game RON: {e}")))
    }

    /// Parse a game from RON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid game or its rules do not
    /// validate.
    pub fn from_ron(text: &str) -> Result<Self> {
        let mut game: Self = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<game>".to_string(),
            message: e.to_string(),
        })?;
        game.rules.validate()?;
        game.rebuild_position_index();
        Ok(game)
    }
}
