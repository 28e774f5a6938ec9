use super::{BondHandle, ChainHandle, EntityHandle, ResidueHandle, record_handle};
use crate::core::connectors::InternalCoords;
use crate::core::models::atom::{Atom, AtomProp};
use crate::core::models::ids::AtomId;
use crate::error::Result;
use nalgebra::Point3;

#[derive(Clone)]
pub struct AtomHandle {
    entity: EntityHandle,
    id: AtomId,
}

record_handle!(AtomHandle, AtomId, Atom);

impl AtomHandle {
    fn read<R>(&self, f: impl FnOnce(&Atom) -> R) -> Result<R> {
        let store = self.entity.store();
        Ok(f(store.atom(self.id)?))
    }

    pub fn name(&self) -> Result<String> {
        self.read(|a| a.name.clone())
    }

    /// `chain.residue-name residue-number.atom`, e.g. `A.ALA12.CA`.
    pub fn qualified_name(&self) -> Result<String> {
        let store = self.entity.store();
        let atom = store.atom(self.id)?;
        let residue = store.residue(atom.residue_id)?;
        let chain = store.chain(residue.chain_id)?;
        Ok(format!(
            "{}.{}{}.{}",
            chain.name, residue.name, residue.number, atom.name
        ))
    }

    pub fn element(&self) -> Result<String> {
        self.read(|a| a.prop.element.clone())
    }

    pub fn prop(&self) -> Result<AtomProp> {
        self.read(|a| a.prop.clone())
    }

    /// Position with the entity transform applied.
    pub fn position(&self) -> Result<Point3<f64>> {
        self.read(|a| a.position())
    }

    /// Position before the entity transform.
    pub fn original_position(&self) -> Result<Point3<f64>> {
        self.read(|a| a.original_position())
    }

    pub fn alt_groups(&self) -> Result<Vec<String>> {
        self.read(|a| a.alt_groups().map(str::to_string).collect::<Vec<_>>())
    }

    pub fn active_alt_group(&self) -> Result<Option<String>> {
        self.read(|a| a.active_alt_group().map(str::to_string))
    }

    /// Alternate position of `group` with the entity transform applied.
    pub fn alt_position(&self, group: &str) -> Result<Option<Point3<f64>>> {
        let store = self.entity.store();
        let transform = store.transform();
        Ok(store
            .atom(self.id)?
            .alt_position(group)
            .map(|p| transform.transform_point(&p)))
    }

    pub fn residue(&self) -> Result<ResidueHandle> {
        let id = self.read(|a| a.residue_id)?;
        Ok(ResidueHandle::new(self.entity.clone(), id))
    }

    pub fn chain(&self) -> Result<ChainHandle> {
        let store = self.entity.store();
        let residue = store.residue(store.atom(self.id)?.residue_id)?;
        Ok(ChainHandle::new(self.entity.clone(), residue.chain_id))
    }

    /// Bonds of this atom in insertion order.
    pub fn bonds(&self) -> Result<Vec<BondHandle>> {
        let ids = self.entity.store().bonds_of(self.id)?;
        Ok(ids
            .into_iter()
            .map(|id| BondHandle::new(self.entity.clone(), id))
            .collect())
    }

    pub fn bonded_partners(&self) -> Result<Vec<AtomHandle>> {
        let ids = self.entity.store().bonded_partners(self.id)?;
        Ok(ids
            .into_iter()
            .map(|id| AtomHandle::new(self.entity.clone(), id))
            .collect())
    }

    pub fn bond_to(&self, other: &AtomHandle) -> Result<Option<BondHandle>> {
        let store = self.entity.store();
        store.atom(self.id)?;
        store.atom(other.id)?;
        Ok(store
            .bond_between(self.id, other.id)
            .map(|id| BondHandle::new(self.entity.clone(), id)))
    }

    pub fn is_bonded_to(&self, other: &AtomHandle) -> Result<bool> {
        Ok(self.bond_to(other)?.is_some())
    }

    /// Bond length, angle and torsion along this atom's primary connectors.
    pub fn internal_coords(&self) -> Result<InternalCoords> {
        self.entity.store_mut().internal_coords(self.id)
    }

    /// The atom this one hangs from in the connector forest, if any.
    pub fn primary_connector_parent(&self) -> Result<Option<AtomHandle>> {
        let parent = self.entity.store_mut().primary_parent(self.id)?;
        Ok(parent.map(|id| AtomHandle::new(self.entity.clone(), id)))
    }
}
