use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use labyrinth_common::EntityId;

use crate::entity::EntityRef;

/// A registry mutation deferred until the current pass completes.
pub enum PendingChange {
    Register { entity: EntityRef, kind: String },
    Unregister(EntityId),
}

impl fmt::Debug for PendingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register { kind, .. } => f.debug_struct("Register").field("kind", kind).finish(),
            Self::Unregister(id) => f.debug_tuple("Unregister").field(id).finish(),
        }
    }
}

/// Cloneable queue of registry mutations.
///
/// Entity code running inside `update_all` cannot borrow the registry, so
/// it queues spawns and despawns here instead. The registry applies them in
/// FIFO order once the pass is over, or on an explicit
/// [`flush_pending`](crate::EntityRegistry::flush_pending).
#[derive(Clone, Default)]
pub struct PendingChanges {
    queue: Rc<RefCell<VecDeque<PendingChange>>>,
}

impl PendingChanges {
    /// Queue a registration. The id is assigned when the queue is applied.
    pub fn register(&self, entity: EntityRef, kind: impl Into<String>) {
        self.queue.borrow_mut().push_back(PendingChange::Register {
            entity,
            kind: kind.into(),
        });
    }

    pub fn unregister(&self, id: EntityId) {
        self.queue
            .borrow_mut()
            .push_back(PendingChange::Unregister(id));
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub(crate) fn pop(&self) -> Option<PendingChange> {
        self.queue.borrow_mut().pop_front()
    }

    /// Drop everything queued. Returns how many changes were discarded.
    pub(crate) fn discard(&self) -> usize {
        let mut queue = self.queue.borrow_mut();
        let n = queue.len();
        queue.clear();
        n
    }
}

impl fmt::Debug for PendingChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingChanges")
            .field("len", &self.len())
            .finish()
    }
}
