use super::{AtomHandle, ChainHandle, EntityHandle, record_handle};
use crate::core::models::ids::ResidueId;
use crate::core::models::residue::{ResNum, Residue};
use crate::error::Result;

#[derive(Clone)]
pub struct ResidueHandle {
    entity: EntityHandle,
    id: ResidueId,
}

record_handle!(ResidueHandle, ResidueId, Residue);

impl ResidueHandle {
    fn read<R>(&self, f: impl FnOnce(&Residue) -> R) -> Result<R> {
        let store = self.entity.store();
        Ok(f(store.residue(self.id)?))
    }

    pub fn name(&self) -> Result<String> {
        self.read(|r| r.name.clone())
    }

    pub fn number(&self) -> Result<ResNum> {
        self.read(|r| r.number)
    }

    pub fn one_letter_code(&self) -> Result<char> {
        self.read(|r| r.one_letter_code)
    }

    pub fn chain(&self) -> Result<ChainHandle> {
        let id = self.read(|r| r.chain_id)?;
        Ok(ChainHandle::new(self.entity.clone(), id))
    }

    /// Atoms in insertion order.
    pub fn atoms(&self) -> Result<Vec<AtomHandle>> {
        let ids = self.read(|r| r.atoms().to_vec())?;
        Ok(ids
            .into_iter()
            .map(|id| AtomHandle::new(self.entity.clone(), id))
            .collect())
    }

    pub fn atom_count(&self) -> Result<usize> {
        self.read(|r| r.atoms().len())
    }

    /// First atom with the given name.
    pub fn find_atom(&self, name: &str) -> Result<Option<AtomHandle>> {
        let id = self.entity.store().find_atom_in_residue(self.id, name)?;
        Ok(id.map(|id| AtomHandle::new(self.entity.clone(), id)))
    }

    /// Position of the residue within its chain.
    pub fn index(&self) -> Result<usize> {
        self.entity.store().residue_index(self.id)
    }

    pub fn next(&self) -> Result<Option<ResidueHandle>> {
        self.neighbor(1)
    }

    pub fn prev(&self) -> Result<Option<ResidueHandle>> {
        self.neighbor(-1)
    }

    fn neighbor(&self, offset: isize) -> Result<Option<ResidueHandle>> {
        let id = self.entity.store().residue_at_offset(self.id, offset)?;
        Ok(id.map(|id| ResidueHandle::new(self.entity.clone(), id)))
    }
}
