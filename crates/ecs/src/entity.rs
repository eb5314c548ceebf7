use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use labyrinth_common::EntityId;

/// Shared reference to a registered entity.
pub type EntityRef = Rc<RefCell<dyn Entity>>;

/// Wrap an entity into a shareable [`EntityRef`].
pub fn entity_ref<E: Entity>(entity: E) -> EntityRef {
    Rc::new(RefCell::new(entity))
}

/// A simulated object known to the [`EntityRegistry`](crate::EntityRegistry).
///
/// Beyond the identity slot, every capability is optional. The accessors
/// return `None` by default, and the registry and collision resolver skip an
/// entity that does not expose the capability they need.
pub trait Entity: Any {
    /// Identity slot. `None` until the registry assigns one.
    fn id(&self) -> Option<EntityId>;

    /// Written once by the registry when the entity carries no id.
    fn set_id(&mut self, id: EntityId);

    fn is_disposed(&self) -> bool {
        false
    }

    fn updatable(&mut self) -> Option<&mut dyn Updatable> {
        None
    }

    fn disposable(&mut self) -> Option<&mut dyn Disposable> {
        None
    }

    fn collidable(&mut self) -> Option<&mut dyn Collidable> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Per-frame behavior (movement, animation).
pub trait Updatable {
    fn update(&mut self, dt: f32);
}

/// Entity-owned teardown. Implementations should make
/// [`Entity::is_disposed`] return `true` afterwards.
pub trait Disposable {
    fn dispose(&mut self);
}

/// A position plus a planar collision radius.
pub trait Collidable {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    fn radius(&self) -> f32;
}
