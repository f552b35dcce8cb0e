//! Engine core: the entity lifecycle and the environment state machine.
//!
//! - `DynArray`: the ordered sequence backing the entity lists
//! - `Entity` / `EntityArena`: reference-counted simulation objects with
//!   behavior dispatched per kind
//! - `Environment`: the per-session orchestrator driving the frame state
//!   machine
//!
//! Nothing in here touches the GPU directly; rendering goes through the
//! draw-submission interface in `crate::render`.

// Parts of the dispatch surface (collide/react, message delivery) exist for
// collaborators like physics that are not wired up yet.
#![allow(dead_code)]

pub mod array;
pub mod entity;
pub mod environment;

pub use array::DynArray;
pub use entity::{
    Entity, EntityArena, EntityBehavior, EntityId, EntityKind, EntityState, Message, Payload,
};
pub use environment::{EnvState, Environment};
