use crate::core::models::ids::RecordRef;
use crate::handles::{AtomHandle, EntityHandle, RecordHandle};
use std::ops::Deref;

/// An atom entry of a view. Dereferences to the atom handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomView {
    handle: AtomHandle,
}

impl AtomView {
    pub(crate) fn new(handle: AtomHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &AtomHandle {
        &self.handle
    }
}

impl Deref for AtomView {
    type Target = AtomHandle;

    fn deref(&self) -> &AtomHandle {
        &self.handle
    }
}

impl RecordHandle for AtomView {
    fn entity(&self) -> &EntityHandle {
        self.handle.entity()
    }

    fn record(&self) -> RecordRef {
        self.handle.record()
    }
}
