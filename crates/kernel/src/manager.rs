use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::error::{DisposeFailure, KernelError};
use crate::graph::topological_order;
use crate::subsystem::{Dependencies, Subsystem, SystemHandle};

/// Lifecycle state of one registered subsystem. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Registered,
    Initialized,
    Disposed,
}

#[derive(Debug)]
struct SystemEntry {
    handle: SystemHandle,
    dependencies: IndexSet<String>,
    state: SystemState,
}

/// Brings subsystems up in dependency order, drives them every frame, and
/// tears them down in reverse.
///
/// Registration order is kept (IndexMap) and used as the root order of the
/// dependency sort, so two managers fed the same registrations produce the
/// same bring-up order.
#[derive(Debug, Default)]
pub struct SystemManager {
    systems: IndexMap<String, SystemEntry>,
    order: Vec<String>,
    initialized: bool,
    shut_down: bool,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem under a unique name.
    ///
    /// A duplicate name is logged and ignored; the existing registration is
    /// kept untouched. Returns whether the subsystem was stored.
    pub fn register<S: Subsystem>(
        &mut self,
        name: impl Into<String>,
        system: S,
        dependencies: &[&str],
    ) -> bool {
        self.register_handle(name, SystemHandle::new(system), dependencies)
    }

    /// Register a subsystem the caller keeps its own shared handle to.
    pub fn register_shared<S: Subsystem>(
        &mut self,
        name: impl Into<String>,
        system: Rc<RefCell<S>>,
        dependencies: &[&str],
    ) -> bool {
        self.register_handle(name, SystemHandle::from_shared(system), dependencies)
    }

    pub fn register_handle(
        &mut self,
        name: impl Into<String>,
        handle: SystemHandle,
        dependencies: &[&str],
    ) -> bool {
        let name = name.into();
        if self.shut_down {
            tracing::warn!(system = %name, "system manager is shut down; registration ignored");
            return false;
        }
        if self.systems.contains_key(&name) {
            tracing::warn!(system = %name, "system is already registered");
            return false;
        }
        let dependencies: IndexSet<String> =
            dependencies.iter().map(|d| (*d).to_owned()).collect();
        tracing::debug!(system = %name, deps = ?dependencies, "registered system");
        self.systems.insert(
            name,
            SystemEntry {
                handle,
                dependencies,
                state: SystemState::Registered,
            },
        );
        true
    }

    /// Bring every registered subsystem up in dependency order.
    ///
    /// The order is computed and validated before any `init` runs, so an
    /// unknown dependency or a cycle leaves every subsystem `Registered`.
    /// A failing `init` aborts the pass: earlier subsystems stay initialized
    /// and later ones are not attempted. Calling `init` again after such a
    /// failure only initializes the subsystems still `Registered`.
    pub fn init(&mut self) -> Result<(), KernelError> {
        if self.shut_down {
            return Err(KernelError::ShutDown);
        }
        if self.initialized {
            tracing::warn!("system manager already initialized");
            return Ok(());
        }
        let _span = tracing::info_span!("systems_init").entered();

        self.order = topological_order(
            self.systems
                .iter()
                .map(|(name, entry)| (name.as_str(), &entry.dependencies)),
        )?;

        for name in &self.order {
            let Some(entry) = self.systems.get(name.as_str()) else {
                continue;
            };
            if entry.state != SystemState::Registered {
                continue;
            }

            let mut handles = Vec::with_capacity(entry.dependencies.len());
            for dep in &entry.dependencies {
                let Some(dep_entry) = self.systems.get(dep.as_str()) else {
                    return Err(KernelError::UnknownDependency {
                        system: name.clone(),
                        dependency: dep.clone(),
                    });
                };
                handles.push((dep.clone(), dep_entry.handle.clone()));
            }
            let deps = Dependencies::from_handles(handles);

            let result = entry.handle.borrow_mut().init(&deps);
            if let Err(source) = result {
                tracing::error!(system = %name, error = %source, "failed to initialize system");
                return Err(KernelError::InitFailed {
                    name: name.clone(),
                    source,
                });
            }
            if let Some(entry) = self.systems.get_mut(name.as_str()) {
                entry.state = SystemState::Initialized;
            }
            tracing::debug!(system = %name, "initialized system");
        }

        self.initialized = true;
        tracing::info!(order = ?self.order, "systems initialized");
        Ok(())
    }

    /// Advance every initialized subsystem by `dt`, in bring-up order.
    pub fn update(&mut self, dt: f32) {
        let _span = tracing::trace_span!("systems_update", dt).entered();
        for name in &self.order {
            if let Some(entry) = self.systems.get(name.as_str()) {
                if entry.state == SystemState::Initialized {
                    entry.handle.borrow_mut().update(dt);
                }
            }
        }
    }

    /// Dispose every initialized subsystem in reverse bring-up order.
    ///
    /// Best effort: a failure is logged and collected, and disposal moves on
    /// to the next subsystem. Every attempted subsystem ends `Disposed`.
    /// Afterwards the manager is shut down until [`reset`](Self::reset).
    pub fn dispose(&mut self) -> Vec<DisposeFailure> {
        let _span = tracing::info_span!("systems_dispose").entered();
        let mut failures = Vec::new();

        for name in self.order.iter().rev() {
            let Some(entry) = self.systems.get_mut(name.as_str()) else {
                continue;
            };
            if entry.state != SystemState::Initialized {
                continue;
            }
            let result = entry.handle.borrow_mut().dispose();
            entry.state = SystemState::Disposed;
            match result {
                Ok(()) => tracing::debug!(system = %name, "disposed system"),
                Err(error) => {
                    tracing::error!(system = %name, %error, "error disposing system");
                    failures.push(DisposeFailure {
                        name: name.clone(),
                        error,
                    });
                }
            }
        }

        self.initialized = false;
        self.shut_down = true;
        failures
    }

    /// Forget every registration and start a fresh epoch. Does not dispose.
    pub fn reset(&mut self) {
        self.systems.clear();
        self.order.clear();
        self.initialized = false;
        self.shut_down = false;
    }

    pub fn get(&self, name: &str) -> Option<&SystemHandle> {
        self.systems.get(name).map(|entry| &entry.handle)
    }

    /// Typed lookup of a registered subsystem.
    pub fn get_as<S: Subsystem>(&self, name: &str) -> Option<Rc<RefCell<S>>> {
        self.get(name).and_then(SystemHandle::downcast)
    }

    pub fn has(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    pub fn state(&self, name: &str) -> Option<SystemState> {
        self.systems.get(name).map(|entry| entry.state)
    }

    /// Declared dependencies of `name`, in declaration order.
    pub fn dependencies(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        self.systems
            .get(name)
            .map(|entry| entry.dependencies.iter().map(String::as_str))
    }

    /// Names in registration order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.keys().map(String::as_str).collect()
    }

    /// Bring-up order computed by the last [`init`](Self::init).
    pub fn init_order(&self) -> &[String] {
        &self.order
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}
