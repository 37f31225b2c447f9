use super::{IndexKey, Object, ObjectId, StoreError};
use log::trace;
use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
};
use strum::{AsRefStr, Display, EnumIter};

// All tables of the chain state
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    // {id} => {DynamicGlobalPropertyObject}
    GlobalProperties,
    // {name} => {AccountObject}
    Accounts,
    // {account} => {AccountAuthorityObject}
    AccountAuthorities,
    // {account, id} => {OwnerAuthorityHistoryObject}
    OwnerAuthorityHistory,
    // {account_to_recover} => {AccountRecoveryRequestObject}
    AccountRecoveryRequests,
    // {account_to_recover} => {ChangeRecoveryAccountRequestObject}
    ChangeRecoveryAccountRequests,
    // {symbol} => {AssetObject}
    Assets,
    // {owner, symbol} => {AccountBalanceObject}
    Balances,
    // {from, request_id} => {SavingsWithdrawObject}
    SavingsWithdrawals,
    // {from, to} => {UnstakeRouteObject}
    UnstakeRoutes,
    // {from, transfer_id} => {RecurringTransferObject}
    RecurringTransfers,
    // {from, escrow_id} => {EscrowObject}
    Escrows,
    // {account} => {MediatorObject}
    Mediators,
    // {author, permlink} => {CommentObject}
    Comments,
    // {comment, voter} => {CommentVoteObject}
    CommentVotes,
    // {comment, viewer} => {CommentViewObject}
    CommentViews,
    // {comment, sharer} => {CommentShareObject}
    CommentShares,
    // {symbol} => {RewardFundObject}
    RewardFunds,
    // {seller, order_id} => {LimitOrderObject}
    LimitOrders,
    // {owner} => {ProducerObject}
    Producers,
    // {slot} => {BlockSummaryObject}
    BlockSummaries,
    // {trx_id} => {TransactionObject}
    Transactions,
}

/// Type erased view of a table, used by the undo log and the digest.
pub(crate) trait AnyTable: Any {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn len(&self) -> usize;

    // Encoded size of every stored object
    fn used_bytes(&self) -> u64;

    fn next_id(&self) -> ObjectId;

    fn set_next_id(&mut self, id: ObjectId);

    fn undo_create(&mut self, id: ObjectId) -> Result<(), StoreError>;

    // Put back an object removed or modified since the undo state began
    fn undo_restore(&mut self, previous: Box<dyn Any>) -> Result<(), StoreError>;

    // Canonical encoding of the objects and every index ordering
    fn encode(&self) -> Result<Vec<u8>, StoreError>;
}

/// Rows of one object type and their secondary indices.
pub struct TypedTable<T: Object> {
    objects: BTreeMap<ObjectId, T>,
    // One ordered set per entry of T::INDICES
    indices: Vec<BTreeSet<(IndexKey, ObjectId)>>,
    sizes: BTreeMap<ObjectId, u64>,
    used_bytes: u64,
    next_id: ObjectId,
}

pub(crate) fn encoded_size<T: Object>(object: &T) -> Result<u64, StoreError> {
    bincode::serialized_size(object).map_err(|e| StoreError::Encoding(e.to_string()))
}

impl<T: Object> TypedTable<T> {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            indices: T::INDICES.iter().map(|_| BTreeSet::new()).collect(),
            sizes: BTreeMap::new(),
            used_bytes: 0,
            next_id: 0,
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.objects.get(&id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.objects.values()
    }

    // Object ids under `prefix` in index order
    pub fn index_range<'a>(
        &'a self,
        index: usize,
        prefix: &'a IndexKey,
    ) -> impl Iterator<Item = &'a T> + 'a {
        self.indices
            .get(index)
            .into_iter()
            .flat_map(move |set| set.range((prefix.clone(), 0)..))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .filter_map(move |(_, id)| self.objects.get(id))
    }

    pub fn find_unique(&self, index: usize, key: &IndexKey) -> Option<&T> {
        let set = self.indices.get(index)?;
        let (found, id) = set.range((key.clone(), 0)..).next()?;
        if found == key {
            self.objects.get(id)
        } else {
            None
        }
    }

    fn check_unique(&self, object: &T, ignore: Option<ObjectId>) -> Result<(), StoreError> {
        for (index, spec) in T::INDICES.iter().enumerate() {
            if !spec.unique {
                continue;
            }

            let key = object.index_key(index);
            if let Some(existing) = self.find_unique(index, &key) {
                if Some(existing.id()) != ignore {
                    return Err(StoreError::UniqueConstraint {
                        table: T::TABLE,
                        index: spec.name,
                    });
                }
            }
        }
        Ok(())
    }

    fn index(&mut self, object: &T) {
        let id = object.id();
        for (index, set) in self.indices.iter_mut().enumerate() {
            set.insert((object.index_key(index), id));
        }
    }

    fn unindex(&mut self, object: &T) {
        let id = object.id();
        for (index, set) in self.indices.iter_mut().enumerate() {
            set.remove(&(object.index_key(index), id));
        }
    }

    fn store(&mut self, object: T, size: u64) {
        let id = object.id();
        self.index(&object);
        self.used_bytes += size;
        if let Some(previous) = self.sizes.insert(id, size) {
            self.used_bytes -= previous;
        }
        self.objects.insert(id, object);
    }

    fn take(&mut self, id: ObjectId) -> Option<T> {
        let object = self.objects.remove(&id)?;
        self.unindex(&object);
        if let Some(size) = self.sizes.remove(&id) {
            self.used_bytes -= size;
        }
        Some(object)
    }

    /// Size the object would add, checked by the store against its capacity.
    pub fn size_delta(&self, object: &T) -> Result<(u64, u64), StoreError> {
        let new_size = encoded_size(object)?;
        let old_size = self.sizes.get(&object.id()).copied().unwrap_or(0);
        Ok((old_size, new_size))
    }

    pub fn insert(&mut self, mut object: T, size: u64) -> Result<ObjectId, StoreError> {
        let id = self.next_id;
        object.set_id(id);
        self.check_unique(&object, None)?;
        self.next_id += 1;
        self.store(object, size);
        Ok(id)
    }

    /// Replace an object, returning the previous version.
    pub fn replace(&mut self, object: T, size: u64) -> Result<T, StoreError> {
        let id = object.id();
        self.check_unique(&object, Some(id))?;
        let previous = self.take(id).ok_or(StoreError::NotFound {
            table: T::TABLE,
            id,
        })?;
        self.store(object, size);
        Ok(previous)
    }

    pub fn remove(&mut self, id: ObjectId) -> Result<T, StoreError> {
        self.take(id)
            .ok_or(StoreError::NotFound { table: T::TABLE, id })
    }
}

impl<T: Object> AnyTable for TypedTable<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    fn next_id(&self) -> ObjectId {
        self.next_id
    }

    fn set_next_id(&mut self, id: ObjectId) {
        self.next_id = id;
    }

    fn undo_create(&mut self, id: ObjectId) -> Result<(), StoreError> {
        trace!("undo create {} #{}", T::TABLE, id);
        self.remove(id).map(|_| ())
    }

    fn undo_restore(&mut self, previous: Box<dyn Any>) -> Result<(), StoreError> {
        let previous = previous
            .downcast::<T>()
            .map_err(|_| StoreError::CorruptedUndoState(T::TABLE))?;
        let id = previous.id();
        trace!("undo restore {} #{}", T::TABLE, id);

        // Indices of the current version must go before the old one returns
        self.take(id);
        let size = encoded_size(previous.as_ref())?;
        self.store(*previous, size);
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let objects: Vec<&T> = self.objects.values().collect();
        bincode::serialize(&(self.next_id, objects, &self.indices))
            .map_err(|e| StoreError::Encoding(e.to_string()))
    }
}
