use super::{EditMode, EditorCore, EditorState};
use crate::error::Result;
use crate::handles::{AtomHandle, EntityHandle};
use nalgebra::{Matrix4, Point3};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Editor for Cartesian coordinates and the entity-wide transform.
pub struct XcsEditor {
    core: EditorCore,
}

impl XcsEditor {
    pub(crate) fn open(entity: EntityHandle, mode: EditMode) -> Result<Self> {
        Ok(Self {
            core: EditorCore::open(entity, mode)?,
        })
    }

    /// Moves an atom; `position` is given with the entity transform applied.
    pub fn set_position(&mut self, atom: &AtomHandle, position: Point3<f64>) -> Result<()> {
        self.core.check(atom)?;
        self.core
            .entity
            .store_mut()
            .set_position(atom.id(), position)?;
        self.core.edited();
        Ok(())
    }

    /// Moves an atom in the untransformed frame.
    pub fn set_original_position(&mut self, atom: &AtomHandle, position: Point3<f64>) -> Result<()> {
        self.core.check(atom)?;
        self.core
            .entity
            .store_mut()
            .set_original_position(atom.id(), position)?;
        self.core.edited();
        Ok(())
    }

    /// Moves several atoms at once. Every handle is checked before any
    /// atom moves, so a stale handle leaves the geometry untouched.
    pub fn set_positions(&mut self, moves: &[(AtomHandle, Point3<f64>)]) -> Result<()> {
        {
            let store = self.core.entity.store();
            for (atom, _) in moves {
                self.core.check(atom)?;
                store.atom(atom.id())?;
            }
        }
        {
            let mut store = self.core.entity.store_mut();
            for (atom, position) in moves {
                store.set_position(atom.id(), *position)?;
            }
        }
        debug!(count = moves.len(), "Moved atoms");
        self.core.edited();
        Ok(())
    }

    /// Composes `m` on top of the current transform.
    pub fn apply_transform(&mut self, m: &Matrix4<f64>) -> Result<()> {
        self.core.entity.store_mut().apply_transform(m)?;
        self.core.edited();
        Ok(())
    }

    /// Replaces the entity transform.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SingularTransform`](crate::error::StoreError::SingularTransform)
    /// if `m` has no inverse.
    pub fn set_transform(&mut self, m: Matrix4<f64>) -> Result<()> {
        self.core.entity.store_mut().set_transform(m)?;
        self.core.edited();
        Ok(())
    }

    /// Closes the editor, running any pending recomputation.
    pub fn commit(mut self) -> EditorState {
        self.core.finish()
    }
}

impl Deref for XcsEditor {
    type Target = EditorCore;

    fn deref(&self) -> &EditorCore {
        &self.core
    }
}

impl DerefMut for XcsEditor {
    fn deref_mut(&mut self) -> &mut EditorCore {
        &mut self.core
    }
}
