use super::{AtomView, ViewAddFlags};
use crate::core::models::ids::{RecordKind, RecordRef};
use crate::core::models::residue::ResNum;
use crate::error::{Result, StoreError};
use crate::handles::{AtomHandle, EntityHandle, RecordHandle, ResidueHandle, ensure_same_entity};

#[derive(Debug, Clone)]
pub struct ResidueView {
    handle: ResidueHandle,
    atoms: Vec<AtomView>,
}

impl ResidueView {
    pub(crate) fn new(handle: ResidueHandle) -> Self {
        Self {
            handle,
            atoms: Vec::new(),
        }
    }

    pub fn handle(&self) -> &ResidueHandle {
        &self.handle
    }

    pub fn name(&self) -> Result<String> {
        self.handle.name()
    }

    pub fn number(&self) -> Result<ResNum> {
        self.handle.number()
    }

    /// Atom entries in view order, skipping deleted atoms.
    pub fn atoms(&self) -> impl Iterator<Item = &AtomView> {
        self.atoms.iter().filter(|a| a.is_valid())
    }

    pub fn atom_count(&self) -> usize {
        self.atoms().count()
    }

    pub fn find_atom(&self, name: &str) -> Option<&AtomView> {
        self.atoms()
            .find(|a| a.name().is_ok_and(|n| n == name))
    }

    /// Adds an atom of this residue.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::HierarchyMismatch`] if the atom belongs to
    /// another residue.
    pub fn add_atom(&mut self, atom: &AtomHandle, flags: ViewAddFlags) -> Result<&mut AtomView> {
        ensure_same_entity(self.handle.entity(), atom)?;
        if atom.residue()? != self.handle {
            return Err(StoreError::HierarchyMismatch {
                kind: RecordKind::Atom,
            });
        }
        if flags.contains(ViewAddFlags::CHECK_DUPLICATES) {
            if let Some(idx) = self.atoms.iter().position(|a| a.handle() == atom) {
                return Ok(&mut self.atoms[idx]);
            }
        }
        let idx = self.atoms.len();
        self.atoms.push(AtomView::new(atom.clone()));
        Ok(&mut self.atoms[idx])
    }

    /// Adds every atom the residue currently has.
    pub(crate) fn include_atoms(&mut self, flags: ViewAddFlags) -> Result<()> {
        for atom in self.handle.atoms()? {
            self.add_atom(&atom, flags)?;
        }
        Ok(())
    }

    /// Removes every entry of `atom`; returns whether any existed.
    pub fn remove_atom(&mut self, atom: &AtomHandle) -> bool {
        let before = self.atoms.len();
        self.atoms.retain(|a| a.handle() != atom);
        self.atoms.len() != before
    }

    pub(crate) fn prune(&mut self) {
        self.atoms.retain(|a| a.is_valid());
    }
}

impl RecordHandle for ResidueView {
    fn entity(&self) -> &EntityHandle {
        self.handle.entity()
    }

    fn record(&self) -> RecordRef {
        self.handle.record()
    }
}
