//! Entity registry: bookkeeping of live simulated objects.
//!
//! Entities are shared references; the registry assigns ids and keeps the
//! id and type indexes but never owns an entity's internal state.
//!
//! # Invariants
//! - Ids assigned within one epoch (between resets) are unique and strictly
//!   increasing in assignment order.
//! - Every registered entity sits in exactly one type bucket; empty buckets
//!   are removed.
//! - Iteration follows insertion order among the currently held entities.
//! - Changes queued through [`PendingChanges`] are applied only between
//!   passes, never while an entity update is running.

pub mod entity;
pub mod pending;
pub mod registry;

pub use entity::{Collidable, Disposable, Entity, EntityRef, Updatable, entity_ref};
pub use pending::{PendingChange, PendingChanges};
pub use registry::{EntityRegistry, RegistryError};

pub fn crate_info() -> &'static str {
    concat!("labyrinth-ecs v", env!("CARGO_PKG_VERSION"))
}
