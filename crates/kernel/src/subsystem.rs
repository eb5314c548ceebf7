use std::any::Any;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::SubsystemError;

/// A unit of the runtime driven by the [`SystemManager`](crate::SystemManager).
///
/// Every lifecycle hook is optional: the default implementation is the
/// "not applicable" case and does nothing.
pub trait Subsystem: 'static {
    /// Called once during bring-up, after every declared dependency has
    /// been initialized. `deps` holds exactly those dependencies.
    fn init(&mut self, deps: &Dependencies) -> Result<(), SubsystemError> {
        let _ = deps;
        Ok(())
    }

    /// Called once per frame, in bring-up order.
    fn update(&mut self, dt: f32) {
        let _ = dt;
    }

    /// Called once during shutdown, in reverse bring-up order.
    fn dispose(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }
}

/// Shared handle to a registered subsystem.
///
/// The same allocation is viewed both as `dyn Subsystem` (for the lifecycle)
/// and as `dyn Any` (for typed lookup), so callers can get their concrete
/// type back with [`downcast`](Self::downcast).
#[derive(Clone)]
pub struct SystemHandle {
    system: Rc<RefCell<dyn Subsystem>>,
    any: Rc<dyn Any>,
}

impl SystemHandle {
    pub fn new<S: Subsystem>(system: S) -> Self {
        Self::from_shared(Rc::new(RefCell::new(system)))
    }

    /// Wrap a subsystem the caller keeps its own handle to.
    pub fn from_shared<S: Subsystem>(shared: Rc<RefCell<S>>) -> Self {
        let any: Rc<dyn Any> = shared.clone();
        Self { system: shared, any }
    }

    /// Typed access to the underlying subsystem, if it is an `S`.
    pub fn downcast<S: Subsystem>(&self) -> Option<Rc<RefCell<S>>> {
        self.any.clone().downcast::<RefCell<S>>().ok()
    }

    pub fn is<S: Subsystem>(&self) -> bool {
        self.any.is::<RefCell<S>>()
    }

    /// Whether both handles point at the same subsystem.
    pub fn ptr_eq(&self, other: &SystemHandle) -> bool {
        Rc::ptr_eq(&self.any, &other.any)
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, dyn Subsystem> {
        self.system.borrow_mut()
    }
}

impl fmt::Debug for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemHandle")
            .field("strong_count", &Rc::strong_count(&self.any))
            .finish_non_exhaustive()
    }
}

/// The initialized dependencies handed to [`Subsystem::init`], in the order
/// they were declared at registration.
#[derive(Debug, Default, Clone)]
pub struct Dependencies {
    handles: Vec<(String, SystemHandle)>,
}

impl Dependencies {
    pub(crate) fn from_handles(handles: Vec<(String, SystemHandle)>) -> Self {
        Self { handles }
    }

    pub fn get(&self, name: &str) -> Option<&SystemHandle> {
        self.handles
            .iter()
            .find(|(dep, _)| dep == name)
            .map(|(_, handle)| handle)
    }

    /// Typed lookup by dependency name.
    pub fn get_as<S: Subsystem>(&self, name: &str) -> Option<Rc<RefCell<S>>> {
        self.get(name).and_then(SystemHandle::downcast)
    }

    /// First declared dependency whose concrete type is `S`.
    pub fn find<S: Subsystem>(&self) -> Option<Rc<RefCell<S>>> {
        self.handles.iter().find_map(|(_, handle)| handle.downcast())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SystemHandle)> {
        self.handles
            .iter()
            .map(|(name, handle)| (name.as_str(), handle))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
