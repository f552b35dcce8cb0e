//! Entities and the Entity Arena
//!
//! An entity is one simulation object: physical state plus a kind-specific
//! payload, with behavior dispatched through the kind's `EntityBehavior`.
//! Entities live in a generational slot arena with an explicit reference
//! count per slot:
//! - Every live reference (list membership, a creator's ownership) holds one
//!   count. The entity is destroyed exactly when the count reaches zero.
//! - Freed slots are reused with a bumped generation, so stale `EntityId`
//!   handles never resolve to a different entity.
//! - Misuse (retain/release on a stale handle, release past zero) is a
//!   caller bug: debug-asserted, ignored in release builds.
//!
//! While a lifecycle callback runs, the entity value is moved out of its
//! slot so the behavior can hold `&mut Entity` alongside `&mut Environment`.
//! The slot itself (count and generation) stays addressable, which keeps
//! retain/release and spawn requests working from inside callbacks.

use macroquad::math::Vec3;

use super::environment::Environment;
use crate::entities::orb::OrbData;
use crate::entities::player::PlayerData;
use crate::render::{DrawCall, Shader};

/// Flag set by the entity itself: does not move, skip motion integration.
pub const FLAG_STATIC: u32 = 0x0001;

/// Flag set by the engine: the entity is in contact with the ground.
pub const FLAG_GROUNDED: u32 = 0x0100;

/// Handle to an entity slot. Valid while the slot generation matches;
/// resolving a stale handle yields `None` rather than a recycled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Slot index within the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Lifecycle state read by the environment's destroy sweep.
/// `Destroy` is one-way: nothing transitions back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Normal,
    Destroy,
}

/// Kind-specific payload. Only the owning kind's behavior code touches its
/// variant; the engine never inspects the contents.
pub enum Payload {
    None,
    Player(PlayerData),
    Orb(OrbData),
    #[cfg(test)]
    Probe,
}

/// A message delivered through `receive` dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Damage(f32),
    Interact,
}

/// One simulation object.
pub struct Entity {
    /// Caller-assigned id, unique within an environment by convention.
    pub id: u32,
    /// Resolves the behavior; fixed at creation.
    pub kind: EntityKind,
    pub state: EntityState,

    /// Bounding spheroid.
    pub radius: f32,
    pub height: f32,

    /// Motion state.
    pub pos: Vec3,
    pub vel: Vec3,
    /// Low bits are entity-owned (`FLAG_STATIC`), high bits engine-owned
    /// (`FLAG_GROUNDED`).
    pub flags: u32,

    /// Motion on ground.
    pub motion: Vec3,
    pub friction: f32,

    /// Reserved for perception systems.
    pub awareness: f32,

    pub data: Payload,
}

/// Lifecycle callbacks for one entity kind. Every method defaults to a
/// no-op; a kind implements only the events it cares about.
///
/// `init`/`destroy` bracket the entity's storage lifetime. `load`/`update`/
/// `save`/`unload` are driven by the environment state machine. `draw`
/// receives a fresh submission record and is responsible for submitting it.
/// A callback must not drive its own entity's reference count to zero while
/// it is executing.
pub trait EntityBehavior {
    fn init(&self, _entity: &mut Entity) {}
    fn destroy(&self, _entity: &mut Entity) {}

    fn load(&self, _entity: &mut Entity, _env: &mut Environment) {}
    fn update(&self, _entity: &mut Entity, _env: &mut Environment) {}
    fn save(&self, _entity: &mut Entity, _env: &mut Environment) {}
    fn unload(&self, _entity: &mut Entity, _env: &mut Environment) {}

    fn draw<'a>(&self, _entity: &'a mut Entity, _shader: &'a Shader, _call: DrawCall<'a>) {}

    fn receive(&self, _entity: &mut Entity, _sender: Option<&Entity>, _message: &Message) {}
    fn collide(&self, _entity: &mut Entity, _other: &Entity) {}
    fn react(&self, _entity: &mut Entity, _other: &Entity, _dist: f32) {}
}

/// Entity kind registry. Adding a kind means adding a variant here and an
/// arm in `behavior`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Orb,
    #[cfg(test)]
    Probe,
}

impl EntityKind {
    /// Resolve the behavior for this kind.
    pub fn behavior(self) -> &'static dyn EntityBehavior {
        match self {
            EntityKind::Player => &crate::entities::player::PlayerBehavior,
            EntityKind::Orb => &crate::entities::orb::OrbBehavior,
            #[cfg(test)]
            EntityKind::Probe => &probe::ProbeBehavior,
        }
    }
}

/// A numeric kind id with no registered entry.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind id {0}")]
pub struct UnknownEntityKind(pub u32);

impl TryFrom<u32> for EntityKind {
    type Error = UnknownEntityKind;

    fn try_from(id: u32) -> Result<Self, UnknownEntityKind> {
        match id {
            0 => Ok(EntityKind::Player),
            1 => Ok(EntityKind::Orb),
            other => Err(UnknownEntityKind(other)),
        }
    }
}

struct Slot {
    generation: u32,
    refs: u32,
    /// `None` while the entity is moved out for a callback, or once the
    /// slot is freed.
    entity: Option<Entity>,
}

/// Slot storage plus reference counting for all entities of one
/// environment.
pub struct EntityArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Create an entity with a reference count of one (the creator's) and
    /// zeroed motion state, running the kind's `init` before the entity is
    /// reachable through the arena.
    pub fn create(&mut self, id: u32, kind: EntityKind, pos: Vec3) -> EntityId {
        let mut entity = Entity {
            id,
            kind,
            state: EntityState::Normal,
            radius: 0.0,
            height: 0.0,
            pos,
            vel: Vec3::ZERO,
            flags: 0,
            motion: Vec3::ZERO,
            friction: 0.0,
            awareness: 0.0,
            data: Payload::None,
        };
        kind.behavior().init(&mut entity);

        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.refs = 1;
                slot.entity = Some(entity);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    refs: 1,
                    entity: Some(entity),
                });
                (self.slots.len() - 1) as u32
            }
        };

        EntityId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn live_slot(&self, id: EntityId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.refs > 0)
    }

    fn live_slot_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.refs > 0)
    }

    /// True while the handle resolves to a live slot.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.live_slot(id).is_some()
    }

    /// Current reference count, or zero for a stale handle.
    pub fn refs(&self, id: EntityId) -> u32 {
        self.live_slot(id).map_or(0, |slot| slot.refs)
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.refs > 0).count()
    }

    /// Take one more reference on the entity.
    pub fn retain(&mut self, id: EntityId) {
        match self.live_slot_mut(id) {
            Some(slot) => slot.refs += 1,
            None => debug_assert!(false, "retain on a stale entity handle"),
        }
    }

    /// Give up one reference. When the count reaches zero the kind's
    /// `destroy` runs exactly once and the slot is freed, invalidating
    /// every outstanding handle.
    pub fn release(&mut self, id: EntityId) {
        let Some(slot) = self.live_slot_mut(id) else {
            debug_assert!(false, "release on a stale entity handle");
            return;
        };
        slot.refs -= 1;
        if slot.refs > 0 {
            return;
        }

        let entity = slot.entity.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        match entity {
            Some(mut entity) => entity.kind.behavior().destroy(&mut entity),
            // The entity was moved out for one of its own callbacks; that
            // callback released the last reference, which the contract
            // forbids.
            None => debug_assert!(false, "entity destroyed from inside its own callback"),
        }
    }

    /// Borrow a live entity. `None` while it is moved out for a callback.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.live_slot(id).and_then(|slot| slot.entity.as_ref())
    }

    /// Mutably borrow a live entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.live_slot_mut(id).and_then(|slot| slot.entity.as_mut())
    }

    /// Move the entity out of its slot for a callback. The slot stays
    /// live; pair with `restore`.
    pub(crate) fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.live_slot_mut(id).and_then(|slot| slot.entity.take())
    }

    /// Put an entity taken with `take` back into its slot.
    pub(crate) fn restore(&mut self, id: EntityId, entity: Entity) {
        match self.live_slot_mut(id) {
            Some(slot) => {
                debug_assert!(slot.entity.is_none(), "restore into an occupied slot");
                slot.entity = Some(entity);
            }
            // Slot freed while the entity was out: contract violation
            // already reported in `release`; the payload drops without its
            // destroy hook.
            None => debug_assert!(false, "restore into a stale slot"),
        }
    }
}

impl Default for EntityArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EntityArena {
    fn drop(&mut self) {
        let leaked = self.live_count();
        if leaked > 0 {
            log::warn!("entity arena dropped with {leaked} live entities");
        }
    }
}

#[cfg(test)]
pub(crate) mod probe {
    //! A test-only entity kind that records every lifecycle event it
    //! receives into a thread-local log.

    use std::cell::{Cell, RefCell};

    use super::*;

    thread_local! {
        static EVENTS: RefCell<Vec<(u32, &'static str)>> = const { RefCell::new(Vec::new()) };
        static SPAWN_ON_UPDATE: Cell<bool> = const { Cell::new(false) };
    }

    /// Clear the event log and knobs. Call at the start of each test.
    pub fn reset() {
        EVENTS.with(|events| events.borrow_mut().clear());
        SPAWN_ON_UPDATE.with(|flag| flag.set(false));
    }

    /// Snapshot of the recorded (entity id, event) pairs, in order.
    pub fn events() -> Vec<(u32, &'static str)> {
        EVENTS.with(|events| events.borrow().clone())
    }

    /// How many times `event` was recorded for entity `id`.
    pub fn count(id: u32, event: &str) -> usize {
        events().iter().filter(|(i, e)| *i == id && *e == event).count()
    }

    /// Make the next probe `update` spawn another probe at its position.
    pub fn spawn_on_next_update() {
        SPAWN_ON_UPDATE.with(|flag| flag.set(true));
    }

    fn record(id: u32, event: &'static str) {
        EVENTS.with(|events| events.borrow_mut().push((id, event)));
    }

    pub struct ProbeBehavior;

    impl EntityBehavior for ProbeBehavior {
        fn init(&self, entity: &mut Entity) {
            entity.data = Payload::Probe;
            record(entity.id, "init");
        }

        fn destroy(&self, entity: &mut Entity) {
            record(entity.id, "destroy");
        }

        fn load(&self, entity: &mut Entity, _env: &mut Environment) {
            record(entity.id, "load");
        }

        fn update(&self, entity: &mut Entity, env: &mut Environment) {
            record(entity.id, "update");
            if SPAWN_ON_UPDATE.with(|flag| flag.take()) {
                env.spawn(EntityKind::Probe, entity.pos);
            }
        }

        fn save(&self, entity: &mut Entity, _env: &mut Environment) {
            record(entity.id, "save");
        }

        fn unload(&self, entity: &mut Entity, _env: &mut Environment) {
            record(entity.id, "unload");
        }

        fn receive(&self, entity: &mut Entity, _sender: Option<&Entity>, message: &Message) {
            record(entity.id, "receive");
            if let Message::Damage(_) = message {
                entity.state = EntityState::Destroy;
            }
        }

        fn collide(&self, entity: &mut Entity, _other: &Entity) {
            record(entity.id, "collide");
        }

        fn react(&self, entity: &mut Entity, _other: &Entity, _dist: f32) {
            record(entity.id, "react");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refcount_roundtrip() {
        probe::reset();
        let mut arena = EntityArena::new();
        let id = arena.create(7, EntityKind::Probe, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(arena.refs(id), 1);

        arena.retain(id);
        assert_eq!(arena.refs(id), 2);
        arena.release(id);
        assert_eq!(arena.refs(id), 1);

        // Still alive and observably unchanged.
        let entity = arena.get(id).unwrap();
        assert_eq!(entity.id, 7);
        assert_eq!(entity.state, EntityState::Normal);
        assert_eq!(entity.pos, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(probe::count(7, "destroy"), 0);
    }

    #[test]
    fn test_destroy_runs_exactly_once() {
        probe::reset();
        let mut arena = EntityArena::new();
        let id = arena.create(1, EntityKind::Probe, Vec3::ZERO);
        arena.retain(id);

        arena.release(id);
        assert_eq!(probe::count(1, "destroy"), 0);

        arena.release(id);
        assert_eq!(probe::count(1, "destroy"), 1);
        assert!(!arena.is_alive(id));
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_init_runs_at_creation() {
        probe::reset();
        let mut arena = EntityArena::new();
        let id = arena.create(3, EntityKind::Probe, Vec3::ZERO);
        assert_eq!(probe::count(3, "init"), 1);
        assert!(matches!(arena.get(id).unwrap().data, Payload::Probe));
    }

    #[test]
    fn test_generation_invalidates_stale_handles() {
        probe::reset();
        let mut arena = EntityArena::new();
        let first = arena.create(1, EntityKind::Probe, Vec3::ZERO);
        arena.release(first);

        let second = arena.create(2, EntityKind::Probe, Vec3::ZERO);
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(!arena.is_alive(first));
        assert!(arena.is_alive(second));
        assert!(arena.get(first).is_none());
    }

    #[test]
    fn test_kind_registry_checked_conversion() {
        assert_eq!(EntityKind::try_from(0), Ok(EntityKind::Player));
        assert_eq!(EntityKind::try_from(1), Ok(EntityKind::Orb));
        assert_eq!(EntityKind::try_from(99), Err(UnknownEntityKind(99)));
    }
}
