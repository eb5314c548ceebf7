//! Kernel: subsystem lifecycle orchestration.
//!
//! # Invariants
//! - Bring-up order places every dependency before its dependents.
//! - Cycles and unknown dependencies are rejected before any `init` runs.
//! - `update` follows bring-up order; `dispose` runs in exactly the reverse.
//! - A failing `dispose` never prevents the remaining subsystems from disposing.
//!
//! The manager is an ordinary value, not a global. Subsystems never see the
//! manager itself, so registering from inside a lifecycle callback is ruled
//! out by construction.

pub mod clock;
pub mod error;
mod graph;
pub mod manager;
pub mod subsystem;

pub use clock::FrameClock;
pub use error::{DisposeFailure, KernelError, SubsystemError};
pub use manager::{SystemManager, SystemState};
pub use subsystem::{Dependencies, Subsystem, SystemHandle};

pub fn crate_info() -> &'static str {
    concat!("labyrinth-kernel v", env!("CARGO_PKG_VERSION"))
}
