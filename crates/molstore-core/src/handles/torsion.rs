use super::{AtomHandle, EntityHandle, record_handle};
use crate::core::models::ids::TorsionId;
use crate::error::Result;

#[derive(Clone)]
pub struct TorsionHandle {
    entity: EntityHandle,
    id: TorsionId,
}

record_handle!(TorsionHandle, TorsionId, Torsion);

impl TorsionHandle {
    pub fn name(&self) -> Result<String> {
        Ok(self.entity.store().torsion(self.id)?.name.clone())
    }

    pub fn atoms(&self) -> Result<[AtomHandle; 4]> {
        let ids = self.entity.store().torsion(self.id)?.atoms;
        Ok(ids.map(|id| AtomHandle::new(self.entity.clone(), id)))
    }

    /// Current dihedral in radians, in `(-π, π]`.
    pub fn angle(&self) -> Result<f64> {
        let store = self.entity.store();
        store.dihedral(store.torsion(self.id)?.atoms)
    }
}
