use super::{IndexKey, Table};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Identifier assigned by the store, unique within a table and never reused.
pub type ObjectId = u64;

/// Secondary index declaration of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    pub const fn unique(name: &'static str) -> Self {
        Self { name, unique: true }
    }

    pub const fn non_unique(name: &'static str) -> Self {
        Self {
            name,
            unique: false,
        }
    }
}

/// Row type of a store table.
///
/// The store keeps one ordered map per entry of `INDICES`, fed by
/// `index_key`, and updates all of them with the row itself.
pub trait Object: Clone + Debug + PartialEq + Serialize + DeserializeOwned + 'static {
    const TABLE: Table;
    const INDICES: &'static [IndexSpec];

    fn id(&self) -> ObjectId;

    fn set_id(&mut self, id: ObjectId);

    // Key of this object in the index at position `index` of INDICES
    fn index_key(&self, index: usize) -> IndexKey;
}

/// Implement `Object` for a struct with an `id` field.
///
/// Indices are listed as `NAME: unique|non_unique => |object| key`, their
/// position becomes an associated const usable with the store lookups.
#[macro_export]
macro_rules! impl_object {
    (@consts $position:expr, ) => {};
    (@consts $position:expr, $index:ident $(, $rest:ident)*) => {
        pub const $index: usize = $position;
        $crate::impl_object!(@consts $position + 1usize, $($rest),*);
    };
    ($type:ty, $table:expr, { $($index:ident: $kind:ident => |$obj:ident| $key:expr),* $(,)? }) => {
        impl $type {
            $crate::impl_object!(@consts 0usize, $($index),*);
        }

        impl $crate::core::store::Object for $type {
            const TABLE: $crate::core::store::Table = $table;
            const INDICES: &'static [$crate::core::store::IndexSpec] = &[
                $($crate::core::store::IndexSpec::$kind(stringify!($index))),*
            ];

            fn id(&self) -> $crate::core::store::ObjectId {
                self.id
            }

            fn set_id(&mut self, id: $crate::core::store::ObjectId) {
                self.id = id;
            }

            #[allow(unused_variables, unused_mut, unused_assignments)]
            fn index_key(&self, index: usize) -> $crate::core::store::IndexKey {
                let mut position = 0usize;
                $(
                    if index == position {
                        let $obj = self;
                        return $key;
                    }
                    position += 1;
                )*
                $crate::core::store::IndexKey::new()
            }
        }
    };
}
