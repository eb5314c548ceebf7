/// Failures raised by the orchestrator itself.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("system \"{system}\" depends on unknown system \"{dependency}\"")]
    UnknownDependency { system: String, dependency: String },
    /// `cycle` lists the members in traversal order with the first one
    /// repeated at the end, e.g. `["a", "b", "a"]`.
    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
    #[error("failed to initialize system \"{name}\": {source}")]
    InitFailed {
        name: String,
        #[source]
        source: SubsystemError,
    },
    #[error("system manager has been shut down; reset it before calling init again")]
    ShutDown,
}

/// Failures reported by a subsystem's own `init` or `dispose`.
#[derive(Debug, thiserror::Error)]
pub enum SubsystemError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),
    #[error("{0}")]
    Failed(String),
}

impl SubsystemError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// One subsystem whose `dispose` failed during shutdown.
#[derive(Debug)]
pub struct DisposeFailure {
    pub name: String,
    pub error: SubsystemError,
}
