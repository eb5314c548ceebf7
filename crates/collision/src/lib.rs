//! Collision: pushes entities out of static box colliders.
//!
//! Resolution is penalty-based and planar. Each collider is tested in turn
//! against the entity's current position on the X/Z plane (Y is ignored), and
//! an overlapping entity is displaced straight away from the closest point
//! on the box by the penetration depth.
//!
//! Colliders are processed independently and in order, so near a corner
//! shared by several boxes the result depends on collider order and may
//! under- or over-correct. Every tick costs O(entities x colliders); there
//! is no spatial partitioning.

mod resolver;

pub use resolver::{CollisionResolver, SEPARATION_EPSILON, resolve_against};

pub fn crate_info() -> &'static str {
    concat!("labyrinth-collision v", env!("CARGO_PKG_VERSION"))
}
