use super::Store;
use log::error;
use std::ops::{Deref, DerefMut};

/// Anything owning a store that undo sessions can be opened on.
pub trait UndoTarget {
    fn undo_store(&mut self) -> &mut Store;
}

impl UndoTarget for Store {
    fn undo_store(&mut self) -> &mut Store {
        self
    }
}

/// Scoped undo state.
///
/// Dropping the session without calling `push` or `squash` reverts every
/// change made through it. The session dereferences to its target so the
/// guarded work is written against the target itself.
pub struct UndoSession<'a, T: UndoTarget + ?Sized> {
    target: &'a mut T,
    revision: u64,
    done: bool,
}

impl<'a, T: UndoTarget + ?Sized> UndoSession<'a, T> {
    pub fn new(target: &'a mut T) -> Self {
        let revision = target.undo_store().start_undo_session();
        Self {
            target,
            revision,
            done: false,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Keep the undo state on the stack, it can still be undone later.
    pub fn push(mut self) {
        self.done = true;
    }

    /// Merge the changes into the enclosing undo state.
    pub fn squash(mut self) -> Result<(), super::StoreError> {
        self.done = true;
        self.target.undo_store().squash()
    }

    /// Revert now instead of on drop.
    pub fn undo(mut self) -> Result<(), super::StoreError> {
        self.done = true;
        self.target.undo_store().undo()
    }
}

impl<T: UndoTarget + ?Sized> Deref for UndoSession<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: UndoTarget + ?Sized> DerefMut for UndoSession<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: UndoTarget + ?Sized> Drop for UndoSession<'_, T> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        if let Err(e) = self.target.undo_store().undo() {
            error!("failed to undo session at revision {}: {}", self.revision, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{ObjectId, Table};
    use crate::impl_object;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: ObjectId,
        value: u64,
    }

    impl_object!(Counter, Table::GlobalProperties, {});

    fn store_with_counter() -> (Store, ObjectId) {
        let mut store = Store::new(1 << 16);
        store.register::<Counter>();
        let id = store
            .create(Counter { id: 0, value: 1 })
            .expect("counter created");
        (store, id)
    }

    #[test]
    fn test_drop_reverts() {
        let (mut store, id) = store_with_counter();
        {
            let mut session = UndoSession::new(&mut store);
            session
                .modify::<Counter, _>(id, |c| c.value = 5)
                .expect("modified");
            assert_eq!(session.get::<Counter>(id).map(|c| c.value), Ok(5));
        }
        assert_eq!(store.get::<Counter>(id).map(|c| c.value), Ok(1));
        assert_eq!(store.undo_depth(), 0);
    }

    #[test]
    fn test_push_keeps_state() {
        let (mut store, id) = store_with_counter();
        let session = UndoSession::new(&mut store);
        session.push();
        store.modify::<Counter, _>(id, |c| c.value = 7).expect("modified");
        assert_eq!(store.undo_depth(), 1);

        store.undo().expect("undone");
        assert_eq!(store.get::<Counter>(id).map(|c| c.value), Ok(1));
    }

    #[test]
    fn test_nested_squash() {
        let (mut store, id) = store_with_counter();
        let mut outer = UndoSession::new(&mut store);
        {
            let mut inner = UndoSession::new(&mut *outer);
            inner.modify::<Counter, _>(id, |c| c.value = 9).expect("modified");
            inner.squash().expect("squashed");
        }
        assert_eq!(outer.get::<Counter>(id).map(|c| c.value), Ok(9));
        drop(outer);
        assert_eq!(store.get::<Counter>(id).map(|c| c.value), Ok(1));
    }
}
