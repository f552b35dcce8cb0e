//! Entity kind implementations.
//!
//! Each kind is a unit struct implementing `EntityBehavior` plus its payload
//! type, registered in `EntityKind::behavior`. The engine core never
//! special-cases a kind; everything here goes through the same dispatch.

pub mod orb;
pub mod player;
