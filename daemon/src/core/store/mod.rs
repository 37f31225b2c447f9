//! Versioned object store.
//!
//! Every chain object lives in a typed table with any number of secondary
//! indices. Mutations made while an undo state is open are logged with the
//! previous value of the object, so the state can be rolled back in exact
//! reverse order, merged into its parent or committed.

mod key;
mod object;
mod session;
mod table;

pub use key::IndexKey;
pub use object::{IndexSpec, Object, ObjectId};
pub use session::{UndoSession, UndoTarget};
pub use table::{Table, TypedTable};

use ezira_common::crypto::{hash, Hash};
use log::{debug, error, log_enabled, trace, Level};
use std::{
    any::Any,
    collections::{HashMap, VecDeque},
};
use strum::IntoEnumIterator;
use table::AnyTable;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Object #{id} not found in table {table}")]
    NotFound { table: Table, id: ObjectId },

    #[error("No object with this key in index {index} of table {table}")]
    KeyNotFound { table: Table, index: &'static str },

    #[error("Unique constraint of index {index} violated in table {table}")]
    UniqueConstraint { table: Table, index: &'static str },

    #[error("Store capacity exceeded: {needed} bytes needed, capacity is {capacity}")]
    OutOfMemory { needed: u64, capacity: u64 },

    #[error("Table {0} is not registered")]
    UnknownTable(Table),

    #[error("No undo session is active")]
    NoActiveSession,

    #[error("Undo state of table {0} does not match its object type")]
    CorruptedUndoState(Table),

    #[error("Object encoding failed: {0}")]
    Encoding(String),
}

impl StoreError {
    // Errors after which the store content can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::OutOfMemory { .. }
                | StoreError::CorruptedUndoState(_)
                | StoreError::Encoding(_)
        )
    }
}

enum UndoEntry {
    Created { table: Table, id: ObjectId },
    // Modified or removed object, with its value when the state began
    Restore { table: Table, previous: Box<dyn Any> },
}

struct UndoState {
    revision: u64,
    entries: Vec<UndoEntry>,
    // Next id of every table that created objects in this state
    next_ids: HashMap<Table, ObjectId>,
}

pub struct Store {
    tables: HashMap<Table, Box<dyn AnyTable>>,
    undo_stack: VecDeque<UndoState>,
    revision: u64,
    capacity: u64,
}

impl Store {
    pub fn new(capacity: u64) -> Self {
        Self {
            tables: HashMap::new(),
            undo_stack: VecDeque::new(),
            revision: 0,
            capacity,
        }
    }

    pub fn register<T: Object>(&mut self) {
        self.tables
            .entry(T::TABLE)
            .or_insert_with(|| Box::new(TypedTable::<T>::new()));
    }

    pub fn table<T: Object>(&self) -> Result<&TypedTable<T>, StoreError> {
        self.tables
            .get(&T::TABLE)
            .and_then(|table| table.as_any().downcast_ref::<TypedTable<T>>())
            .ok_or(StoreError::UnknownTable(T::TABLE))
    }

    fn table_mut<T: Object>(&mut self) -> Result<&mut TypedTable<T>, StoreError> {
        self.tables
            .get_mut(&T::TABLE)
            .and_then(|table| table.as_any_mut().downcast_mut::<TypedTable<T>>())
            .ok_or(StoreError::UnknownTable(T::TABLE))
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn used_bytes(&self) -> u64 {
        self.tables.values().map(|table| table.used_bytes()).sum()
    }

    fn check_capacity(&self, old_size: u64, new_size: u64) -> Result<(), StoreError> {
        let needed = self.used_bytes() - old_size + new_size;
        if needed > self.capacity {
            error!(
                "store capacity exceeded: {} bytes needed, capacity is {}",
                needed, self.capacity
            );
            return Err(StoreError::OutOfMemory {
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn record(&mut self, entry: UndoEntry) {
        if let Some(state) = self.undo_stack.back_mut() {
            state.entries.push(entry);
        }
    }

    /// Insert a new object, the store assigns its id.
    pub fn create<T: Object>(&mut self, object: T) -> Result<ObjectId, StoreError> {
        let (_, size) = self.table::<T>()?.size_delta(&object)?;
        self.check_capacity(0, size)?;

        let table = self.table_mut::<T>()?;
        let next_id = table.next_id();
        let id = table.insert(object, size)?;

        if let Some(state) = self.undo_stack.back_mut() {
            state.next_ids.entry(T::TABLE).or_insert(next_id);
        }
        self.record(UndoEntry::Created {
            table: T::TABLE,
            id,
        });
        trace!("created {} #{}", T::TABLE, id);
        Ok(id)
    }

    /// Change an object in place, keeping every index in sync.
    pub fn modify<T: Object, R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StoreError> {
        let table = self.table::<T>()?;
        let mut object = table
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound { table: T::TABLE, id })?;
        let result = f(&mut object);
        object.set_id(id);

        let (old_size, new_size) = table.size_delta(&object)?;
        self.check_capacity(old_size, new_size)?;

        let previous = self.table_mut::<T>()?.replace(object, new_size)?;
        self.record(UndoEntry::Restore {
            table: T::TABLE,
            previous: Box::new(previous),
        });
        Ok(result)
    }

    pub fn remove<T: Object>(&mut self, id: ObjectId) -> Result<T, StoreError> {
        let object = self.table_mut::<T>()?.remove(id)?;
        self.record(UndoEntry::Restore {
            table: T::TABLE,
            previous: Box::new(object.clone()),
        });
        trace!("removed {} #{}", T::TABLE, id);
        Ok(object)
    }

    pub fn find<T: Object>(&self, id: ObjectId) -> Option<&T> {
        self.table::<T>().ok()?.get(id)
    }

    pub fn get<T: Object>(&self, id: ObjectId) -> Result<&T, StoreError> {
        self.table::<T>()?
            .get(id)
            .ok_or(StoreError::NotFound { table: T::TABLE, id })
    }

    /// Lookup through a unique index.
    pub fn find_by<T: Object>(&self, index: usize, key: &IndexKey) -> Option<&T> {
        self.table::<T>().ok()?.find_unique(index, key)
    }

    pub fn get_by<T: Object>(&self, index: usize, key: &IndexKey) -> Result<&T, StoreError> {
        self.find_by(index, key).ok_or(StoreError::KeyNotFound {
            table: T::TABLE,
            index: T::INDICES.get(index).map(|spec| spec.name).unwrap_or("unknown"),
        })
    }

    /// Every object in id order.
    pub fn iter<T: Object>(&self) -> impl Iterator<Item = &T> + '_ {
        self.table::<T>().ok().into_iter().flat_map(|table| table.iter())
    }

    /// Objects whose key in `index` starts with `prefix`, in index order.
    pub fn iter_index<'a, T: Object>(
        &'a self,
        index: usize,
        prefix: &'a IndexKey,
    ) -> impl Iterator<Item = &'a T> + 'a {
        self.table::<T>()
            .ok()
            .into_iter()
            .flat_map(move |table| table.index_range(index, prefix))
    }

    pub fn count<T: Object>(&self) -> usize {
        self.tables.get(&T::TABLE).map(|t| t.len()).unwrap_or(0)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Only allowed while no undo state is open.
    pub fn set_revision(&mut self, revision: u64) -> Result<(), StoreError> {
        if !self.undo_stack.is_empty() {
            return Err(StoreError::NoActiveSession);
        }
        self.revision = revision;
        Ok(())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Open a new undo state and return its revision.
    pub fn start_undo_session(&mut self) -> u64 {
        self.revision += 1;
        self.undo_stack.push_back(UndoState {
            revision: self.revision,
            entries: Vec::new(),
            next_ids: HashMap::new(),
        });
        self.revision
    }

    /// Revert every change of the latest undo state, newest first.
    pub fn undo(&mut self) -> Result<(), StoreError> {
        let state = self.undo_stack.pop_back().ok_or(StoreError::NoActiveSession)?;
        if log_enabled!(Level::Debug) {
            debug!(
                "undo revision {} ({} changes)",
                state.revision,
                state.entries.len()
            );
        }

        for entry in state.entries.into_iter().rev() {
            match entry {
                UndoEntry::Created { table, id } => {
                    self.tables
                        .get_mut(&table)
                        .ok_or(StoreError::UnknownTable(table))?
                        .undo_create(id)?;
                }
                UndoEntry::Restore { table, previous } => {
                    self.tables
                        .get_mut(&table)
                        .ok_or(StoreError::UnknownTable(table))?
                        .undo_restore(previous)?;
                }
            }
        }

        for (table, next_id) in state.next_ids {
            if let Some(table) = self.tables.get_mut(&table) {
                table.set_next_id(next_id);
            }
        }

        self.revision -= 1;
        Ok(())
    }

    /// Merge the latest undo state into the one below it.
    ///
    /// With a single state open, its changes become permanent.
    pub fn squash(&mut self) -> Result<(), StoreError> {
        let state = self.undo_stack.pop_back().ok_or(StoreError::NoActiveSession)?;
        if let Some(parent) = self.undo_stack.back_mut() {
            parent.entries.extend(state.entries);
            for (table, next_id) in state.next_ids {
                parent.next_ids.entry(table).or_insert(next_id);
            }
        }
        self.revision -= 1;
        Ok(())
    }

    /// Drop the undo states up to `revision`, their changes become permanent.
    pub fn commit(&mut self, revision: u64) {
        while self
            .undo_stack
            .front()
            .is_some_and(|state| state.revision <= revision)
        {
            self.undo_stack.pop_front();
        }
    }

    pub fn undo_all(&mut self) -> Result<(), StoreError> {
        while !self.undo_stack.is_empty() {
            self.undo()?;
        }
        Ok(())
    }

    /// Digest of every table, index orderings and id counters included.
    pub fn state_digest(&self) -> Result<Hash, StoreError> {
        let mut bytes = Vec::new();
        for table in Table::iter() {
            if let Some(content) = self.tables.get(&table) {
                bytes.extend_from_slice(table.as_ref().as_bytes());
                bytes.extend_from_slice(&content.encode()?);
            }
        }
        Ok(hash(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_object;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: ObjectId,
        name: String,
        group: u32,
    }

    impl_object!(Item, Table::Accounts, {
        BY_NAME: unique => |o| IndexKey::new().with_str(&o.name),
        BY_GROUP: non_unique => |o| IndexKey::new().with_u32(o.group).with_str(&o.name),
    });

    fn item(name: &str, group: u32) -> Item {
        Item {
            id: 0,
            name: name.to_string(),
            group,
        }
    }

    fn store() -> Store {
        let mut store = Store::new(1 << 20);
        store.register::<Item>();
        store
    }

    fn find_name<'a>(store: &'a Store, name: &str) -> Option<&'a Item> {
        store.find_by::<Item>(Item::BY_NAME, &IndexKey::new().with_str(name))
    }

    #[test]
    fn test_create_modify_remove() -> Result<(), StoreError> {
        let mut store = store();
        let id = store.create(item("alice", 1))?;
        assert_eq!(store.get::<Item>(id)?.name, "alice");

        store.modify::<Item, _>(id, |o| o.name = "bob".to_string())?;
        assert!(find_name(&store, "alice").is_none());
        assert_eq!(find_name(&store, "bob").map(|o| o.id), Some(id));

        store.remove::<Item>(id)?;
        assert!(store.find::<Item>(id).is_none());
        assert!(matches!(
            store.get::<Item>(id),
            Err(StoreError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unique_constraint() -> Result<(), StoreError> {
        let mut store = store();
        store.create(item("alice", 1))?;
        let bob = store.create(item("bob", 1))?;
        assert!(matches!(
            store.create(item("alice", 2)),
            Err(StoreError::UniqueConstraint { .. })
        ));
        assert!(matches!(
            store.modify::<Item, _>(bob, |o| o.name = "alice".to_string()),
            Err(StoreError::UniqueConstraint { .. })
        ));
        // The failed modification left bob untouched
        assert_eq!(store.get::<Item>(bob)?.name, "bob");
        Ok(())
    }

    #[test]
    fn test_undo_restores_everything() -> Result<(), StoreError> {
        let mut store = store();
        let alice = store.create(item("alice", 1))?;
        let bob = store.create(item("bob", 2))?;
        let before = store.state_digest()?;

        store.start_undo_session();
        store.modify::<Item, _>(alice, |o| o.group = 3)?;
        store.remove::<Item>(bob)?;
        store.create(item("carol", 1))?;
        store.modify::<Item, _>(alice, |o| o.name = "dave".to_string())?;
        assert_ne!(store.state_digest()?, before);

        store.undo()?;
        assert_eq!(store.state_digest()?, before);
        assert_eq!(find_name(&store, "bob").map(|o| o.id), Some(bob));

        // Ids are handed out again after an undo
        assert_eq!(store.create(item("erin", 1))?, 2);
        Ok(())
    }

    #[test]
    fn test_squash_then_undo() -> Result<(), StoreError> {
        let mut store = store();
        let before = store.state_digest()?;

        store.start_undo_session();
        store.create(item("alice", 1))?;
        store.start_undo_session();
        store.create(item("bob", 1))?;
        store.squash()?;
        assert_eq!(store.revision(), 1);
        assert_eq!(store.count::<Item>(), 2);

        store.undo()?;
        assert_eq!(store.count::<Item>(), 0);
        assert_eq!(store.state_digest()?, before);
        Ok(())
    }

    #[test]
    fn test_commit_drops_old_states() -> Result<(), StoreError> {
        let mut store = store();
        store.start_undo_session();
        store.create(item("alice", 1))?;
        store.start_undo_session();
        store.create(item("bob", 1))?;

        store.commit(1);
        assert_eq!(store.undo_depth(), 1);
        store.undo()?;
        assert_eq!(store.count::<Item>(), 1);
        assert!(matches!(store.undo(), Err(StoreError::NoActiveSession)));
        Ok(())
    }

    #[test]
    fn test_index_prefix_iteration() -> Result<(), StoreError> {
        let mut store = store();
        store.create(item("carol", 2))?;
        store.create(item("bob", 1))?;
        store.create(item("alice", 1))?;

        let prefix = IndexKey::new().with_u32(1);
        let names: Vec<&str> = store
            .iter_index::<Item>(Item::BY_GROUP, &prefix)
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
        Ok(())
    }

    #[test]
    fn test_capacity_is_fatal() {
        let mut store = Store::new(64);
        store.register::<Item>();
        let result = store.create(item(&"x".repeat(100), 1));
        match result {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("object larger than the capacity was stored"),
        }
        assert_eq!(store.count::<Item>(), 0);
    }

    #[derive(Debug, Clone)]
    enum Action {
        Create(u8, u32),
        Rename(usize, u8),
        Regroup(usize, u32),
        Remove(usize),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            (0u8..16, 0u32..4).prop_map(|(name, group)| Action::Create(name, group)),
            (0usize..32, 0u8..16).prop_map(|(at, name)| Action::Rename(at, name)),
            (0usize..32, 0u32..4).prop_map(|(at, group)| Action::Regroup(at, group)),
            (0usize..32).prop_map(Action::Remove),
        ]
    }

    fn named(name: u8, group: u32) -> Item {
        item(&format!("item-{}", name), group)
    }

    proptest! {
        // Unique violations are part of the mix, failed changes must leave no trace either
        #[test]
        fn test_undo_is_exact(
            setup in prop::collection::vec((0u8..16, 0u32..4), 0..8),
            actions in prop::collection::vec(action(), 1..40),
        ) {
            let mut store = store();
            for (name, group) in setup {
                let _ = store.create(named(name, group));
            }
            let before = store.state_digest().unwrap();
            let used = store.used_bytes();

            store.start_undo_session();
            for action in actions {
                let ids: Vec<ObjectId> = store.iter::<Item>().map(|o| o.id).collect();
                let pick = |at: usize| ids.get(at % ids.len().max(1)).copied();
                match action {
                    Action::Create(name, group) => {
                        let _ = store.create(named(name, group));
                    }
                    Action::Rename(at, name) => {
                        if let Some(id) = pick(at) {
                            let _ = store.modify::<Item, _>(id, |o| o.name = format!("item-{}", name));
                        }
                    }
                    Action::Regroup(at, group) => {
                        if let Some(id) = pick(at) {
                            let _ = store.modify::<Item, _>(id, |o| o.group = group);
                        }
                    }
                    Action::Remove(at) => {
                        if let Some(id) = pick(at) {
                            let _ = store.remove::<Item>(id);
                        }
                    }
                }
            }
            store.undo().unwrap();

            prop_assert_eq!(store.state_digest().unwrap(), before);
            prop_assert_eq!(store.used_bytes(), used);
            prop_assert_eq!(store.revision(), 0);
        }
    }
}
