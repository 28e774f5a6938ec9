//! # Editors
//!
//! All mutation of an entity goes through an editor. Only one editor may be
//! open per entity at a time; opening a second one fails with
//! [`StoreError::EditorAlreadyOpen`](crate::error::StoreError::EditorAlreadyOpen).
//!
//! ## Modes
//!
//! - [`EditMode::Unbuffered`] recomputes derived state (connector forest,
//!   internal coordinates, spatial index) and notifies observers after
//!   every call.
//! - [`EditMode::Buffered`] only records what became stale; everything is
//!   recomputed once when the editor is committed or dropped.
//!
//! Both editors share the structural operations of [`EditorCore`] through
//! `Deref`. [`XcsEditor`] adds Cartesian edits and global transforms,
//! [`IcsEditor`] adds internal-coordinate edits along the connector forest.

pub mod ics;
pub mod xcs;

pub use ics::IcsEditor;
pub use xcs::XcsEditor;

use crate::core::models::atom::AtomProp;
use crate::core::models::chain::ChainType;
use crate::core::models::residue::ResNum;
use crate::core::models::topology::BondOrder;
use crate::error::Result;
use crate::handles::{
    AtomHandle, BondHandle, ChainHandle, EntityHandle, RecordHandle, ResidueHandle, TorsionHandle,
    ensure_same_entity,
};
use nalgebra::Point3;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    Buffered,
    #[default]
    Unbuffered,
}

/// Lifecycle of an editor.
///
/// `Idle` until the first successful edit. Buffered editors stay `Editing`
/// until committed; unbuffered editors are `Applied` after every edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorState {
    Idle,
    Editing,
    Committed,
    Applied,
}

/// Structural editing shared by both editor kinds.
pub struct EditorCore {
    entity: EntityHandle,
    mode: EditMode,
    state: EditorState,
    closed: bool,
}

impl EditorCore {
    fn open(entity: EntityHandle, mode: EditMode) -> Result<Self> {
        entity.store_mut().open_editor()?;
        debug!(?mode, "Opened editor");
        Ok(Self {
            entity,
            mode,
            state: EditorState::Idle,
            closed: false,
        })
    }

    pub fn entity(&self) -> &EntityHandle {
        &self.entity
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    fn check<H: RecordHandle>(&self, handle: &H) -> Result<()> {
        ensure_same_entity(&self.entity, handle)
    }

    /// Called after every successful edit.
    fn edited(&mut self) {
        match self.mode {
            EditMode::Unbuffered => {
                self.entity.flush_and_notify();
                self.state = EditorState::Applied;
            }
            EditMode::Buffered => self.state = EditorState::Editing,
        }
    }

    /// Recomputes stale state and notifies observers without closing the
    /// editor.
    pub fn update(&mut self) {
        self.entity.flush_and_notify();
        if self.state == EditorState::Editing {
            self.state = EditorState::Committed;
        }
    }

    /// Closes the editor exactly once, flushing pending work.
    fn finish(&mut self) -> EditorState {
        if self.closed {
            return self.state;
        }
        self.closed = true;
        self.entity.store_mut().close_editor();
        self.entity.flush_and_notify();
        self.state = match self.mode {
            EditMode::Buffered => EditorState::Committed,
            EditMode::Unbuffered => EditorState::Applied,
        };
        debug!(mode = ?self.mode, "Closed editor");
        self.state
    }

    // ---- creation -----------------------------------------------------------

    pub fn create_chain(&mut self, name: &str) -> ChainHandle {
        let id = self.entity.store_mut().create_chain(name);
        self.edited();
        ChainHandle::new(self.entity.clone(), id)
    }

    pub fn set_chain_type(&mut self, chain: &ChainHandle, chain_type: ChainType) -> Result<()> {
        self.check(chain)?;
        self.entity
            .store_mut()
            .set_chain_type(chain.id(), chain_type)?;
        self.edited();
        Ok(())
    }

    pub fn append_residue(
        &mut self,
        chain: &ChainHandle,
        name: &str,
        number: impl Into<ResNum>,
    ) -> Result<ResidueHandle> {
        self.check(chain)?;
        let id = self
            .entity
            .store_mut()
            .append_residue(chain.id(), name, number.into())?;
        self.edited();
        Ok(ResidueHandle::new(self.entity.clone(), id))
    }

    pub fn insert_residue_after(
        &mut self,
        after: &ResidueHandle,
        name: &str,
        number: impl Into<ResNum>,
    ) -> Result<ResidueHandle> {
        self.check(after)?;
        let id = self
            .entity
            .store_mut()
            .insert_residue_after(after.id(), name, number.into())?;
        self.edited();
        Ok(ResidueHandle::new(self.entity.clone(), id))
    }

    /// Inserts an atom at `position`, given with the entity transform
    /// applied.
    pub fn insert_atom(
        &mut self,
        residue: &ResidueHandle,
        name: &str,
        position: Point3<f64>,
        prop: AtomProp,
    ) -> Result<AtomHandle> {
        self.check(residue)?;
        let id = self
            .entity
            .store_mut()
            .insert_atom(residue.id(), name, position, prop)?;
        self.edited();
        Ok(AtomHandle::new(self.entity.clone(), id))
    }

    /// Bonds two atoms with a single bond.
    pub fn connect(&mut self, a: &AtomHandle, b: &AtomHandle) -> Result<BondHandle> {
        self.connect_with_order(a, b, BondOrder::Single)
    }

    /// # Errors
    ///
    /// Fails with [`StoreError::DuplicateBond`](crate::error::StoreError::DuplicateBond)
    /// if the atoms are already bonded and with
    /// [`StoreError::SelfBond`](crate::error::StoreError::SelfBond) if `a`
    /// and `b` are the same atom.
    pub fn connect_with_order(
        &mut self,
        a: &AtomHandle,
        b: &AtomHandle,
        order: BondOrder,
    ) -> Result<BondHandle> {
        self.check(a)?;
        self.check(b)?;
        let id = self.entity.store_mut().connect(a.id(), b.id(), order)?;
        self.edited();
        Ok(BondHandle::new(self.entity.clone(), id))
    }

    pub fn set_bond_order(&mut self, bond: &BondHandle, order: BondOrder) -> Result<()> {
        self.check(bond)?;
        self.entity.store_mut().set_bond_order(bond.id(), order)?;
        self.edited();
        Ok(())
    }

    /// Adds a named torsion over four atoms, which need not be bonded.
    pub fn add_torsion(
        &mut self,
        name: &str,
        a: &AtomHandle,
        b: &AtomHandle,
        c: &AtomHandle,
        d: &AtomHandle,
    ) -> Result<TorsionHandle> {
        for atom in [a, b, c, d] {
            self.check(atom)?;
        }
        let id = self
            .entity
            .store_mut()
            .add_torsion(name, [a.id(), b.id(), c.id(), d.id()])?;
        self.edited();
        Ok(TorsionHandle::new(self.entity.clone(), id))
    }

    // ---- deletion -----------------------------------------------------------

    /// Deletes a chain with all its residues, atoms, bonds and torsions.
    pub fn delete_chain(&mut self, chain: &ChainHandle) -> Result<()> {
        self.check(chain)?;
        self.entity.store_mut().delete_chain(chain.id())?;
        self.edited();
        Ok(())
    }

    pub fn delete_residue(&mut self, residue: &ResidueHandle) -> Result<()> {
        self.check(residue)?;
        self.entity.store_mut().delete_residue(residue.id())?;
        self.edited();
        Ok(())
    }

    pub fn delete_all_atoms(&mut self, residue: &ResidueHandle) -> Result<()> {
        self.check(residue)?;
        self.entity.store_mut().delete_all_atoms(residue.id())?;
        self.edited();
        Ok(())
    }

    /// Deletes an atom together with its bonds and any torsion naming it.
    pub fn delete_atom(&mut self, atom: &AtomHandle) -> Result<()> {
        self.check(atom)?;
        self.entity.store_mut().delete_atom(atom.id())?;
        self.edited();
        Ok(())
    }

    pub fn delete_bond(&mut self, bond: &BondHandle) -> Result<()> {
        self.check(bond)?;
        self.entity.store_mut().delete_bond(bond.id())?;
        self.edited();
        Ok(())
    }

    pub fn delete_torsion(&mut self, torsion: &TorsionHandle) -> Result<()> {
        self.check(torsion)?;
        self.entity.store_mut().delete_torsion(torsion.id())?;
        self.edited();
        Ok(())
    }

    // ---- naming and numbering -----------------------------------------------

    pub fn rename_chain(&mut self, chain: &ChainHandle, name: &str) -> Result<()> {
        self.check(chain)?;
        self.entity.store_mut().rename_chain(chain.id(), name)?;
        self.edited();
        Ok(())
    }

    pub fn rename_residue(&mut self, residue: &ResidueHandle, name: &str) -> Result<()> {
        self.check(residue)?;
        self.entity.store_mut().rename_residue(residue.id(), name)?;
        self.edited();
        Ok(())
    }

    pub fn set_one_letter_code(&mut self, residue: &ResidueHandle, code: char) -> Result<()> {
        self.check(residue)?;
        self.entity
            .store_mut()
            .set_one_letter_code(residue.id(), code)?;
        self.edited();
        Ok(())
    }

    pub fn rename_atom(&mut self, atom: &AtomHandle, name: &str) -> Result<()> {
        self.check(atom)?;
        self.entity.store_mut().rename_atom(atom.id(), name)?;
        self.edited();
        Ok(())
    }

    pub fn set_atom_prop(&mut self, atom: &AtomHandle, prop: AtomProp) -> Result<()> {
        self.check(atom)?;
        self.entity.store_mut().set_atom_prop(atom.id(), prop)?;
        self.edited();
        Ok(())
    }

    pub fn set_residue_number(
        &mut self,
        residue: &ResidueHandle,
        number: impl Into<ResNum>,
    ) -> Result<()> {
        self.check(residue)?;
        self.entity
            .store_mut()
            .set_residue_number(residue.id(), number.into())?;
        self.edited();
        Ok(())
    }

    /// Renumbers a chain from `start`. With `keep_spacing` gaps and
    /// insertion codes are kept, otherwise numbers become consecutive.
    pub fn renumber_chain(&mut self, chain: &ChainHandle, start: i32, keep_spacing: bool) -> Result<()> {
        self.check(chain)?;
        self.entity
            .store_mut()
            .renumber_chain(chain.id(), start, keep_spacing)?;
        self.edited();
        Ok(())
    }

    // ---- alternate locations ------------------------------------------------

    /// Records an alternate location; `position` is given with the entity
    /// transform applied.
    pub fn add_alt_position(&mut self, atom: &AtomHandle, group: &str, position: Point3<f64>) -> Result<()> {
        self.check(atom)?;
        self.entity
            .store_mut()
            .add_alt_position(atom.id(), group, position)?;
        self.edited();
        Ok(())
    }

    /// Moves the atom to the coordinates stored for `group`. Returns `false`
    /// if the atom has no such group.
    pub fn switch_alt_position(&mut self, atom: &AtomHandle, group: &str) -> Result<bool> {
        self.check(atom)?;
        let switched = self
            .entity
            .store_mut()
            .switch_alt_position(atom.id(), group)?;
        if switched {
            self.edited();
        }
        Ok(switched)
    }
}

impl Drop for EditorCore {
    fn drop(&mut self) {
        self.finish();
    }
}
