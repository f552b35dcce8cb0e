//! Environment
//!
//! The per-session orchestrator. Owns the entity arena, the live and
//! pending entity lists, the player singleton and the shader handle, and
//! drives the frame state machine:
//!
//! INIT -> PRELOAD -> LOAD -> RUN <-> UNLOAD -> INIT
//!
//! Each branch of `update` is evaluated unconditionally when reached, so a
//! fresh environment falls through to RUN within its first `update` call.
//! Within one RUN tick the order is fixed: every live entity updates, then
//! pending spawns are promoted (loaded and appended), then entities flagged
//! `Destroy` are swept out in a single forward pass. The pending list is
//! the reason a spawn never receives `update` in the tick it was requested
//! and never enters the live list mid-iteration.

use log::info;
use macroquad::math::{Mat4, Vec3};

use super::array::DynArray;
use super::entity::{EntityArena, EntityId, EntityKind, EntityState, Message};
use crate::config::Config;
use crate::entities::player;
use crate::input::InputState;
use crate::render::{DrawCall, Shader};
use crate::window::WindowEvent;

/// Coarse lifecycle phase of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
    Init,
    Preload,
    Load,
    Run,
    Unload,
}

/// One running simulation instance.
pub struct Environment {
    config: Config,
    shader: Option<Shader>,

    arena: EntityArena,
    /// The live, updating and drawable set. Membership holds one reference.
    entities: DynArray<EntityId>,
    /// Entities requested for addition but not yet promoted. Membership
    /// holds one reference.
    new_entities: DynArray<EntityId>,

    state: EnvState,
    player: EntityId,
    pub input: InputState,

    next_id: u32,
}

impl Environment {
    /// Create a fresh environment in the INIT state. The player singleton
    /// is created here and owned by the environment until drop.
    pub fn new(config: Config) -> Self {
        let mut arena = EntityArena::new();
        let player = player::create(&mut arena);
        Self {
            config,
            shader: None,
            arena,
            entities: DynArray::new(),
            new_entities: DynArray::new(),
            state: EnvState::Init,
            player,
            input: InputState::default(),
            next_id: player::PLAYER_ENTITY_ID + 1,
        }
    }

    /// Hand the environment its rendering handle and push the initial
    /// projection for the current surface size. Without a shader, `draw`
    /// is a no-op (headless operation).
    pub fn attach_shader(&mut self, shader: Shader, width: f32, height: f32) {
        shader.set_projection(self.projection(width, height));
        self.shader = Some(shader);
    }

    pub fn state(&self) -> EnvState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the player singleton's entity.
    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn arena(&self) -> &EntityArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut EntityArena {
        &mut self.arena
    }

    /// The live entity list, in update and draw order.
    pub fn entities(&self) -> &[EntityId] {
        self.entities.as_slice()
    }

    /// Entities awaiting promotion into the live list.
    pub fn pending(&self) -> &[EntityId] {
        self.new_entities.as_slice()
    }

    /// Next caller-assigned entity id.
    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create an entity of `kind` and stage it for the next promotion.
    /// The returned handle is kept alive by the pending-list reference.
    pub fn spawn(&mut self, kind: EntityKind, pos: Vec3) -> EntityId {
        let id = self.alloc_id();
        let handle = self.arena.create(id, kind, pos);
        self.add_entity(handle);
        self.arena.release(handle);
        handle
    }

    /// Stage an entity for addition to the live list. Takes a reference on
    /// the entity; never touches the live list directly, so it is safe to
    /// call from inside an entity's own callbacks.
    pub fn add_entity(&mut self, id: EntityId) {
        self.arena.retain(id);
        self.new_entities.push(id);
    }

    /// Ask the environment to tear the running simulation down. Processed
    /// by the next `update` call.
    pub fn request_unload(&mut self) {
        self.state = EnvState::Unload;
    }

    /// Advance the state machine by one tick.
    pub fn update(&mut self) {
        if self.state == EnvState::Init {
            // Asset preload kickoff goes here.
            self.state = EnvState::Preload;
        }

        if self.state == EnvState::Preload {
            // Awaiting preload completion goes here.
            self.state = EnvState::Load;
        }

        if self.state == EnvState::Load {
            self.arena.retain(self.player);
            self.entities.push(self.player);

            let mut i = 0;
            while i < self.entities.len() {
                self.load_entity(self.entities[i]);
                i += 1;
            }

            info!("environment running ({} entities)", self.entities.len());
            self.state = EnvState::Run;
        }

        if self.state == EnvState::Run {
            // Entity update. The live list cannot change during this pass:
            // spawns go to the pending list, removal waits for the sweep.
            let mut i = 0;
            while i < self.entities.len() {
                self.update_entity(self.entities[i]);
                i += 1;
            }

            // Promote pending spawns. A load callback may stage further
            // spawns; they are picked up in the same pass.
            let mut i = 0;
            while i < self.new_entities.len() {
                let id = self.new_entities[i];
                self.load_entity(id);
                self.entities.push(id);
                i += 1;
            }
            self.new_entities.clear();

            // Sweep stale entities. Runs after promotion so a fresh spawn
            // is never evicted in the tick it arrived.
            let mut i = 0;
            while i < self.entities.len() {
                let id = self.entities[i];
                let destroy = self
                    .arena
                    .get(id)
                    .map_or(true, |entity| entity.state == EntityState::Destroy);
                if destroy {
                    self.entities.remove(i);
                    self.unload_entity(id);
                    self.arena.release(id);
                } else {
                    i += 1;
                }
            }
        }

        if self.state == EnvState::Unload {
            let mut i = 0;
            while i < self.entities.len() {
                let id = self.entities[i];
                self.save_entity(id);
                self.unload_entity(id);
                self.arena.release(id);
                i += 1;
            }

            // Pending entities never loaded; they get no callbacks.
            let mut i = 0;
            while i < self.new_entities.len() {
                self.arena.release(self.new_entities[i]);
                i += 1;
            }

            self.entities.clear();
            self.new_entities.clear();

            info!("environment unloaded");
            self.state = EnvState::Init;
        }

        self.input.end_frame();
    }

    /// Submit one frame. Entities draw in live-list order; no sorting or
    /// batching happens here. Outside RUN only the player overlay is drawn.
    pub fn draw(&mut self) {
        let Environment {
            shader,
            arena,
            entities,
            state,
            player,
            ..
        } = self;
        let Some(shader) = shader.as_ref() else {
            return;
        };

        if *state == EnvState::Run {
            if let Some(entity) = arena.get(*player) {
                shader.set_view(player::view_matrix(entity));
            }

            let mut i = 0;
            while i < entities.len() {
                let id = entities[i];
                if let Some(mut entity) = arena.take(id) {
                    entity.kind.behavior().draw(&mut entity, shader, DrawCall::default());
                    arena.restore(id, entity);
                }
                i += 1;
            }
        }

        if let Some(entity) = arena.get(*player) {
            player::draw_overlay(entity, *state, entities.len());
        }
    }

    /// Feed one window event into the environment: resizes recompute the
    /// projection, everything else lands in the input snapshot.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::Resize { width, height } => {
                let projection = self.projection(width, height);
                if let Some(shader) = self.shader.as_ref() {
                    shader.set_projection(projection);
                }
            }
            _ => self.input.apply(event),
        }
    }

    /// Projection for the current camera parameters at the given surface
    /// size.
    pub fn projection(&self, width: f32, height: f32) -> Mat4 {
        let camera = &self.config.camera;
        perspective(width, height, camera.fov, camera.near, camera.far)
    }

    // -------------------------------------------------------------------
    // Dispatch. Each forwards to the kind's behavior with the entity moved
    // out of its slot, so the behavior holds `&mut Entity` alongside
    // `&mut Environment` without aliasing.
    // -------------------------------------------------------------------

    pub fn load_entity(&mut self, id: EntityId) {
        let Some(mut entity) = self.arena.take(id) else {
            return;
        };
        entity.kind.behavior().load(&mut entity, self);
        self.arena.restore(id, entity);
    }

    pub fn update_entity(&mut self, id: EntityId) {
        let Some(mut entity) = self.arena.take(id) else {
            return;
        };
        entity.kind.behavior().update(&mut entity, self);
        self.arena.restore(id, entity);
    }

    pub fn save_entity(&mut self, id: EntityId) {
        let Some(mut entity) = self.arena.take(id) else {
            return;
        };
        entity.kind.behavior().save(&mut entity, self);
        self.arena.restore(id, entity);
    }

    pub fn unload_entity(&mut self, id: EntityId) {
        let Some(mut entity) = self.arena.take(id) else {
            return;
        };
        entity.kind.behavior().unload(&mut entity, self);
        self.arena.restore(id, entity);
    }

    /// Deliver a message to `target`. The sender is passed through when it
    /// is live and not currently moved out for its own callback.
    pub fn send_message(&mut self, target: EntityId, sender: Option<EntityId>, message: &Message) {
        let Some(mut entity) = self.arena.take(target) else {
            return;
        };
        {
            let sender = sender.and_then(|id| self.arena.get(id));
            entity.kind.behavior().receive(&mut entity, sender, message);
        }
        self.arena.restore(target, entity);
    }

    /// Dispatch a collision event to `target` against `other`.
    pub fn collide(&mut self, target: EntityId, other: EntityId) {
        let Some(mut entity) = self.arena.take(target) else {
            return;
        };
        if let Some(other) = self.arena.get(other) {
            entity.kind.behavior().collide(&mut entity, other);
        }
        self.arena.restore(target, entity);
    }

    /// Dispatch a proximity event to `target` about `other` at `dist`.
    pub fn react(&mut self, target: EntityId, other: EntityId, dist: f32) {
        let Some(mut entity) = self.arena.take(target) else {
            return;
        };
        if let Some(other) = self.arena.get(other) {
            entity.kind.behavior().react(&mut entity, other, dist);
        }
        self.arena.restore(target, entity);
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        let entities = std::mem::take(&mut self.entities);
        entities.destroy_with(|id| {
            self.unload_entity(id);
            self.arena.release(id);
        });

        let pending = std::mem::take(&mut self.new_entities);
        pending.destroy_with(|id| self.arena.release(id));

        self.arena.release(self.player);
    }
}

/// Standard GL perspective projection: `f = 1/tan(fov/2)`, near/far mapped
/// to the clip bounds.
pub fn perspective(width: f32, height: f32, fov: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov, width / height.max(1.0), near, far)
}

#[cfg(test)]
mod tests {
    use macroquad::math::{vec3, Vec3};

    use super::*;
    use crate::engine::entity::probe;

    fn fresh_env() -> Environment {
        probe::reset();
        Environment::new(Config::default())
    }

    #[test]
    fn test_first_update_falls_through_to_run() {
        let mut env = fresh_env();
        assert_eq!(env.state(), EnvState::Init);

        env.update();
        assert_eq!(env.state(), EnvState::Run);
        assert_eq!(env.entities(), &[env.player()]);
        // Creator reference plus live-list membership.
        assert_eq!(env.arena().refs(env.player()), 2);

        env.update();
        env.update();
        assert_eq!(env.state(), EnvState::Run);
        assert_eq!(env.entities().len(), 1);
    }

    #[test]
    fn test_spawn_is_pending_until_promotion() {
        let mut env = fresh_env();
        env.update();

        let orb = env.spawn(EntityKind::Probe, vec3(1.0, 0.0, 0.0));
        assert_eq!(env.pending(), &[orb]);
        assert!(!env.entities().contains(&orb));
        assert_eq!(env.arena().refs(orb), 1);

        // The next tick promotes it: loaded exactly once, present in the
        // live list, but not updated in the tick it was promoted.
        env.update();
        assert!(env.entities().contains(&orb));
        assert!(env.pending().is_empty());
        assert_eq!(probe::count(1, "load"), 1);
        assert_eq!(probe::count(1, "update"), 0);

        env.update();
        assert_eq!(probe::count(1, "load"), 1);
        assert_eq!(probe::count(1, "update"), 1);
    }

    #[test]
    fn test_spawn_from_update_callback_is_not_updated_same_tick() {
        let mut env = fresh_env();
        env.update();
        env.spawn(EntityKind::Probe, Vec3::ZERO);
        env.update(); // promotes the first probe

        probe::spawn_on_next_update();
        env.update();

        // The first probe (id 1) spawned a second one (id 2) from inside
        // its update. The spawn was loaded by this tick's promotion but
        // must not have been updated yet.
        assert_eq!(env.entities().len(), 3);
        assert_eq!(probe::count(2, "load"), 1);
        assert_eq!(probe::count(2, "update"), 0);

        env.update();
        assert_eq!(probe::count(2, "update"), 1);
    }

    #[test]
    fn test_destroy_sweep_unloads_and_releases() {
        let mut env = fresh_env();
        env.update();
        let orb = env.spawn(EntityKind::Probe, Vec3::ZERO);
        env.update();
        assert!(env.entities().contains(&orb));

        env.arena_mut().get_mut(orb).unwrap().state = EntityState::Destroy;
        env.update();

        assert!(!env.entities().contains(&orb));
        assert!(!env.arena().is_alive(orb));
        assert_eq!(probe::count(1, "unload"), 1);
        assert_eq!(probe::count(1, "destroy"), 1);
    }

    #[test]
    fn test_damage_message_marks_for_destruction() {
        let mut env = fresh_env();
        env.update();
        let orb = env.spawn(EntityKind::Probe, Vec3::ZERO);
        env.update();

        env.send_message(orb, Some(env.player()), &Message::Damage(1.0));
        assert_eq!(probe::count(1, "receive"), 1);
        assert_eq!(
            env.arena().get(orb).unwrap().state,
            EntityState::Destroy
        );

        env.update();
        assert!(!env.arena().is_alive(orb));
    }

    #[test]
    fn test_unload_returns_to_init_and_releases_everything() {
        let mut env = fresh_env();
        env.update();
        let live = env.spawn(EntityKind::Probe, Vec3::ZERO);
        env.update();
        let pending = env.spawn(EntityKind::Probe, Vec3::ZERO);

        env.request_unload();
        env.update();

        assert_eq!(env.state(), EnvState::Init);
        assert!(env.entities().is_empty());
        assert!(env.pending().is_empty());

        // The live probe got save + unload and was destroyed with its
        // membership reference.
        assert_eq!(probe::count(1, "save"), 1);
        assert_eq!(probe::count(1, "unload"), 1);
        assert!(!env.arena().is_alive(live));

        // The pending probe was released without any callbacks.
        assert_eq!(probe::count(2, "load"), 0);
        assert_eq!(probe::count(2, "save"), 0);
        assert_eq!(probe::count(2, "unload"), 0);
        assert_eq!(probe::count(2, "destroy"), 1);
        assert!(!env.arena().is_alive(pending));

        // The player survives on the environment's creator reference.
        assert!(env.arena().is_alive(env.player()));
        assert_eq!(env.arena().refs(env.player()), 1);

        // And the machine restarts cleanly.
        env.update();
        assert_eq!(env.state(), EnvState::Run);
        assert_eq!(env.entities(), &[env.player()]);
    }

    #[test]
    fn test_update_order_follows_live_list() {
        let mut env = fresh_env();
        env.update();
        env.spawn(EntityKind::Probe, Vec3::ZERO);
        env.spawn(EntityKind::Probe, Vec3::ZERO);
        env.update(); // promote both, in order
        env.update(); // first updates for both

        let updates: Vec<u32> = probe::events()
            .into_iter()
            .filter(|(_, event)| *event == "update")
            .map(|(id, _)| id)
            .collect();
        assert_eq!(updates, vec![1, 2]);
    }

    #[test]
    fn test_collide_and_react_forward_to_behavior() {
        let mut env = fresh_env();
        env.update();
        let a = env.spawn(EntityKind::Probe, Vec3::ZERO);
        let b = env.spawn(EntityKind::Probe, vec3(2.0, 0.0, 0.0));
        env.update();

        env.collide(a, b);
        env.react(b, a, 2.0);
        assert_eq!(probe::count(1, "collide"), 1);
        assert_eq!(probe::count(2, "react"), 1);
    }

    #[test]
    fn test_perspective_matches_closed_form() {
        let fov = 1.4f32;
        let near = 0.03f32;
        let far = 300.0f32;
        let m = perspective(512.0, 512.0, fov, near, far);

        let f = 1.0 / (fov / 2.0).tan();
        let d = far - near;
        assert!((m.x_axis.x - f).abs() < 1e-5);
        assert!((m.y_axis.y - f).abs() < 1e-5);
        assert!((m.z_axis.z - (-(far + near) / d)).abs() < 1e-4);
        assert!((m.z_axis.w - (-1.0)).abs() < 1e-6);
        assert!((m.w_axis.z - (-2.0 * far * near / d)).abs() < 1e-4);
    }
}
