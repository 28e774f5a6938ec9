//! # Handles
//!
//! Cheap, clonable references to records of an entity.
//!
//! A handle is the pair (entity, slot id). It never borrows the store for
//! longer than a single call, so handles can be freely stored, hashed and
//! passed around while editors mutate the entity. Every accessor resolves
//! the slot first and returns [`StoreError::InvalidHandle`] once the record
//! has been deleted.
//!
//! Equality compares the owning entity by pointer and the slot id (index
//! and version); hashing uses the slot id alone.

pub mod atom;
pub mod bond;
pub mod chain;
pub mod entity;
pub mod residue;
pub mod torsion;

pub use atom::AtomHandle;
pub use bond::BondHandle;
pub use chain::ChainHandle;
pub use entity::{EntityHandle, create_entity, create_entity_with_config};
pub use residue::ResidueHandle;
pub use torsion::TorsionHandle;

use crate::core::models::ids::RecordRef;
use crate::core::props::{GenericPropContainer, PropBag};
use crate::error::{Result, StoreError};

/// Anything that addresses a single record of an entity.
pub trait RecordHandle {
    fn entity(&self) -> &EntityHandle;

    fn record(&self) -> RecordRef;

    /// Whether the record still exists.
    fn is_valid(&self) -> bool {
        self.entity().store().contains(self.record())
    }
}

impl<H: RecordHandle> GenericPropContainer for H {
    fn with_props<R>(&self, f: impl FnOnce(Option<&PropBag>) -> R) -> Result<R> {
        let store = self.entity().store();
        Ok(f(store.props(self.record())?))
    }

    fn with_props_mut<R>(&self, f: impl FnOnce(&mut Option<PropBag>) -> R) -> Result<R> {
        let mut store = self.entity().store_mut();
        Ok(f(store.props_slot_mut(self.record())?))
    }
}

/// Fails with [`StoreError::ForeignHandle`] unless `handle` belongs to
/// `entity`.
pub(crate) fn ensure_same_entity<H: RecordHandle>(entity: &EntityHandle, handle: &H) -> Result<()> {
    if entity.ptr_eq(handle.entity()) {
        Ok(())
    } else {
        Err(StoreError::ForeignHandle {
            kind: handle.record().kind(),
        })
    }
}

/// Implements identity traits for a record handle with `entity` and `id`
/// fields.
macro_rules! record_handle {
    ($handle:ident, $id:ty, $variant:ident) => {
        impl $handle {
            pub(crate) fn new(entity: $crate::handles::EntityHandle, id: $id) -> Self {
                Self { entity, id }
            }

            pub fn id(&self) -> $id {
                self.id
            }
        }

        impl $crate::handles::RecordHandle for $handle {
            fn entity(&self) -> &$crate::handles::EntityHandle {
                &self.entity
            }

            fn record(&self) -> $crate::core::models::ids::RecordRef {
                $crate::core::models::ids::RecordRef::$variant(self.id)
            }
        }

        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id && self.entity.ptr_eq(&other.entity)
            }
        }

        impl Eq for $handle {}

        impl std::hash::Hash for $handle {
            fn hash<S: std::hash::Hasher>(&self, state: &mut S) {
                self.id.hash(state);
            }
        }

        impl std::fmt::Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($handle)).field(&self.id).finish()
            }
        }
    };
}

pub(crate) use record_handle;
