//! Shared types for the labyrinth runtime.
//!
//! Everything here is plain data: identifiers, collider volumes, and the
//! simulation configuration. No behavior that depends on frame ordering
//! lives in this crate.

pub mod config;
pub mod types;

pub use config::{ConfigError, SimConfig};
pub use types::{Aabb, EntityId};

pub fn crate_info() -> &'static str {
    concat!("labyrinth-common v", env!("CARGO_PKG_VERSION"))
}
