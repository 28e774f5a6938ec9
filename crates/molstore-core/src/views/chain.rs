use super::{AtomView, ResidueView, ViewAddFlags};
use crate::core::models::ids::{RecordKind, RecordRef};
use crate::core::models::residue::{ResNum, find_by_number};
use crate::error::{Result, StoreError};
use crate::handles::{
    AtomHandle, ChainHandle, EntityHandle, RecordHandle, ResidueHandle, ensure_same_entity,
};

/// A chain entry of a view.
///
/// Keeps track of whether residues were added in non-decreasing number
/// order; while they were, [`find_residue`](Self::find_residue) tries a
/// binary search before scanning.
#[derive(Debug, Clone)]
pub struct ChainView {
    handle: ChainHandle,
    pub(super) residues: Vec<ResidueView>,
    in_sequence: bool,
}

impl ChainView {
    pub(crate) fn new(handle: ChainHandle) -> Self {
        Self {
            handle,
            residues: Vec::new(),
            in_sequence: true,
        }
    }

    pub fn handle(&self) -> &ChainHandle {
        &self.handle
    }

    pub fn name(&self) -> Result<String> {
        self.handle.name()
    }

    /// Whether the live residues are in non-decreasing number order.
    ///
    /// Once an out-of-order add clears the flag it stays cleared. Otherwise
    /// the current numbers are checked, since the entity may have renumbered
    /// residues after they were added.
    pub fn in_sequence(&self) -> bool {
        if !self.in_sequence {
            return false;
        }
        let numbers: Vec<_> = self.residues().filter_map(|r| r.number().ok()).collect();
        numbers.windows(2).all(|w| w[0] <= w[1])
    }

    /// Residue entries in view order, skipping deleted residues.
    pub fn residues(&self) -> impl Iterator<Item = &ResidueView> {
        self.residues.iter().filter(|r| r.is_valid())
    }

    pub fn residue_count(&self) -> usize {
        self.residues().count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &AtomView> {
        self.residues().flat_map(ResidueView::atoms)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms().count()
    }

    pub fn find_residue(&self, number: impl Into<ResNum>) -> Option<&ResidueView> {
        let idx = find_by_number(&self.residues, number.into(), self.in_sequence, |r| {
            r.number().ok()
        })?;
        self.residues.get(idx)
    }

    pub fn find_atom(&self, number: impl Into<ResNum>, name: &str) -> Option<&AtomView> {
        self.find_residue(number)?.find_atom(name)
    }

    /// Adds a residue of this chain.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::HierarchyMismatch`] if the residue belongs to
    /// another chain.
    pub fn add_residue(
        &mut self,
        residue: &ResidueHandle,
        flags: ViewAddFlags,
    ) -> Result<&mut ResidueView> {
        ensure_same_entity(self.handle.entity(), residue)?;
        let existing = flags
            .contains(ViewAddFlags::CHECK_DUPLICATES)
            .then(|| self.position_of(residue))
            .flatten();
        let idx = match existing {
            Some(idx) => idx,
            None => self.push_residue(residue)?,
        };

        let entry = &mut self.residues[idx];
        if flags.contains(ViewAddFlags::INCLUDE_ATOMS) {
            entry.include_atoms(flags)?;
        }
        Ok(entry)
    }

    /// The first entry of `residue`, created empty if missing.
    pub(crate) fn residue_entry(&mut self, residue: &ResidueHandle) -> Result<&mut ResidueView> {
        ensure_same_entity(self.handle.entity(), residue)?;
        let idx = match self.position_of(residue) {
            Some(idx) => idx,
            None => self.push_residue(residue)?,
        };
        Ok(&mut self.residues[idx])
    }

    fn position_of(&self, residue: &ResidueHandle) -> Option<usize> {
        self.residues.iter().position(|r| r.handle() == residue)
    }

    fn push_residue(&mut self, residue: &ResidueHandle) -> Result<usize> {
        if residue.chain()? != self.handle {
            return Err(StoreError::HierarchyMismatch {
                kind: RecordKind::Residue,
            });
        }
        let number = residue.number()?;
        let last = self.residues.last().and_then(|r| r.number().ok());
        if last.is_some_and(|last| number < last) {
            self.in_sequence = false;
        }
        self.residues.push(ResidueView::new(residue.clone()));
        Ok(self.residues.len() - 1)
    }

    /// Removes every entry of `residue`; returns whether any existed.
    pub fn remove_residue(&mut self, residue: &ResidueHandle) -> bool {
        let before = self.residues.len();
        self.residues.retain(|r| r.handle() != residue);
        self.residues.len() != before
    }

    pub(crate) fn remove_atom(&mut self, atom: &AtomHandle) -> bool {
        self.residues
            .iter_mut()
            .fold(false, |removed, r| r.remove_atom(atom) || removed)
    }

    pub(crate) fn prune(&mut self) {
        self.residues.retain(|r| r.is_valid());
        for residue in &mut self.residues {
            residue.prune();
        }
    }
}

impl RecordHandle for ChainView {
    fn entity(&self) -> &EntityHandle {
        self.handle.entity()
    }

    fn record(&self) -> RecordRef {
        self.handle.record()
    }
}
