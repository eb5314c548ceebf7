use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use labyrinth_common::EntityId;
use labyrinth_kernel::{Subsystem, SubsystemError};

use crate::entity::EntityRef;
use crate::pending::{PendingChange, PendingChanges};

/// Errors from entity registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("entity id {0} is already registered")]
    IdInUse(EntityId),
}

struct Slot {
    entity: EntityRef,
    kind: String,
}

/// Id and type bookkeeping for live entities.
///
/// Both indexes are insertion-ordered maps. Removal uses `shift_remove`, so
/// iteration always reflects relative insertion order among the entities
/// currently held; that order is part of the contract of
/// [`get_all`](Self::get_all), [`get_by_type`](Self::get_by_type) and
/// [`update_all`](Self::update_all).
///
/// The registry is usually shared as `Rc<RefCell<EntityRegistry>>`. An
/// entity must not borrow it from inside its own update, since the registry
/// is already mutably borrowed for the pass and the `RefCell` panics.
/// Queue registrations and removals through [`pending`](Self::pending)
/// instead; they are applied once the pass completes.
pub struct EntityRegistry {
    entities: IndexMap<EntityId, Slot>,
    by_type: IndexMap<String, Vec<EntityId>>,
    next_id: EntityId,
    pending: PendingChanges,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
            by_type: IndexMap::new(),
            next_id: EntityId::FIRST,
            pending: PendingChanges::default(),
        }
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.entities.len())
            .field("types", &self.by_type.keys().collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entity` under the type tag `kind` and return its id.
    ///
    /// An entity without an id gets the next counter value written into its
    /// identity slot. An entity that already carries an id keeps it, and the
    /// counter is moved past it so later assignments stay unique. A carried
    /// id that is already live is rejected and nothing changes.
    pub fn register(
        &mut self,
        entity: EntityRef,
        kind: impl Into<String>,
    ) -> Result<EntityId, RegistryError> {
        let kind = kind.into();
        let carried = entity.borrow().id();
        let id = match carried {
            Some(id) => {
                if self.entities.contains_key(&id) {
                    tracing::warn!(%id, kind = %kind, "entity id already registered");
                    return Err(RegistryError::IdInUse(id));
                }
                if id >= self.next_id {
                    self.next_id = id.next();
                }
                id
            }
            None => {
                let id = self.next_id;
                self.next_id = id.next();
                entity.borrow_mut().set_id(id);
                id
            }
        };

        self.by_type.entry(kind.clone()).or_default().push(id);
        self.entities.insert(id, Slot { entity, kind });
        tracing::trace!(%id, "registered entity");
        Ok(id)
    }

    /// Remove the entity with `id` from both indexes. Returns it, or `None`
    /// when no such entity is registered.
    pub fn unregister(&mut self, id: EntityId) -> Option<EntityRef> {
        let slot = self.entities.shift_remove(&id)?;
        if let Some(bucket) = self.by_type.get_mut(&slot.kind) {
            bucket.retain(|held| *held != id);
            if bucket.is_empty() {
                self.by_type.shift_remove(&slot.kind);
            }
        }
        tracing::trace!(%id, kind = %slot.kind, "unregistered entity");
        Some(slot.entity)
    }

    /// Remove `entity` by the id in its identity slot.
    ///
    /// No-op when the entity has no id, or when that id now belongs to a
    /// different entity.
    pub fn unregister_entity(&mut self, entity: &EntityRef) -> Option<EntityRef> {
        let id = entity.borrow().id()?;
        let held = self.entities.get(&id)?;
        if !Rc::ptr_eq(&held.entity, entity) {
            return None;
        }
        self.unregister(id)
    }

    /// All live entities in insertion order.
    pub fn get_all(&self) -> Vec<EntityRef> {
        self.entities.values().map(|slot| slot.entity.clone()).collect()
    }

    /// Entities registered under `kind`, in insertion order.
    pub fn get_by_type(&self, kind: &str) -> Vec<EntityRef> {
        self.by_type
            .get(kind)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.entities.get(id))
                    .map(|slot| slot.entity.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_by_id(&self, id: EntityId) -> Option<&EntityRef> {
        self.entities.get(&id).map(|slot| &slot.entity)
    }

    /// Type tag an entity was registered under.
    pub fn type_of(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(|slot| slot.kind.as_str())
    }

    /// Live count, either in total or for one type tag.
    pub fn count(&self, kind: Option<&str>) -> usize {
        match kind {
            Some(kind) => self.by_type.get(kind).map_or(0, Vec::len),
            None => self.entities.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Type tags with at least one live entity, in first-seen order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Handle for queueing registrations from inside an update pass.
    pub fn pending(&self) -> PendingChanges {
        self.pending.clone()
    }

    /// Run the update capability of every live entity, then apply queued
    /// changes.
    pub fn update_all(&mut self, dt: f32) {
        let _span = tracing::trace_span!("entities_update", dt).entered();
        for slot in self.entities.values() {
            let mut entity = slot.entity.borrow_mut();
            if entity.is_disposed() {
                continue;
            }
            if let Some(behavior) = entity.updatable() {
                behavior.update(dt);
            }
        }
        self.flush_pending();
    }

    /// Apply every queued change in FIFO order. Rejected registrations are
    /// logged and returned.
    pub fn flush_pending(&mut self) -> Vec<RegistryError> {
        let mut rejected = Vec::new();
        while let Some(change) = self.pending.pop() {
            match change {
                PendingChange::Register { entity, kind } => {
                    if let Err(err) = self.register(entity, kind) {
                        rejected.push(err);
                    }
                }
                PendingChange::Unregister(id) => {
                    self.unregister(id);
                }
            }
        }
        rejected
    }

    /// Dispose every live entity that is not yet disposed, then
    /// [`clear`](Self::clear).
    pub fn dispose_all(&mut self) {
        let snapshot = self.get_all();
        tracing::debug!(count = snapshot.len(), "disposing all entities");
        for entity in &snapshot {
            let mut entity = entity.borrow_mut();
            if entity.is_disposed() {
                continue;
            }
            if let Some(teardown) = entity.disposable() {
                teardown.dispose();
            }
        }
        self.clear();
    }

    /// Drop all bookkeeping and restart the id counter.
    ///
    /// This starts a new epoch: ids handed out afterwards may repeat ids
    /// from before the clear. Queued changes are discarded.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.by_type.clear();
        self.next_id = EntityId::FIRST;
        let discarded = self.pending.discard();
        if discarded > 0 {
            tracing::debug!(discarded, "discarded pending entity changes on clear");
        }
    }
}

impl Subsystem for EntityRegistry {
    fn update(&mut self, dt: f32) {
        self.update_all(dt);
    }

    fn dispose(&mut self) -> Result<(), SubsystemError> {
        self.dispose_all();
        Ok(())
    }
}
