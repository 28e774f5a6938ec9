use super::{AtomHandle, EntityHandle, record_handle};
use crate::core::models::ids::BondId;
use crate::core::models::topology::{Bond, BondOrder};
use crate::core::utils::geometry::bond_length;
use crate::error::Result;

#[derive(Clone)]
pub struct BondHandle {
    entity: EntityHandle,
    id: BondId,
}

record_handle!(BondHandle, BondId, Bond);

impl BondHandle {
    fn read<R>(&self, f: impl FnOnce(&Bond) -> R) -> Result<R> {
        let store = self.entity.store();
        Ok(f(store.bond(self.id)?))
    }

    pub fn first(&self) -> Result<AtomHandle> {
        let id = self.read(|b| b.first)?;
        Ok(AtomHandle::new(self.entity.clone(), id))
    }

    pub fn second(&self) -> Result<AtomHandle> {
        let id = self.read(|b| b.second)?;
        Ok(AtomHandle::new(self.entity.clone(), id))
    }

    pub fn order(&self) -> Result<BondOrder> {
        self.read(|b| b.order)
    }

    /// Current distance between the bonded atoms.
    pub fn length(&self) -> Result<f64> {
        let store = self.entity.store();
        let bond = store.bond(self.id)?;
        Ok(bond_length(
            &store.position(bond.first)?,
            &store.position(bond.second)?,
        ))
    }

    /// The partner of `atom` in this bond, or `None` if `atom` is not part
    /// of it.
    pub fn other(&self, atom: &AtomHandle) -> Result<Option<AtomHandle>> {
        let other = self.read(|b| b.other(atom.id()))?;
        Ok(other.map(|id| AtomHandle::new(self.entity.clone(), id)))
    }
}
