use super::{AtomHandle, EntityHandle, ResidueHandle, record_handle};
use crate::core::models::chain::{Chain, ChainType};
use crate::core::models::ids::ChainId;
use crate::core::models::residue::ResNum;
use crate::error::Result;

#[derive(Clone)]
pub struct ChainHandle {
    entity: EntityHandle,
    id: ChainId,
}

record_handle!(ChainHandle, ChainId, Chain);

impl ChainHandle {
    fn read<R>(&self, f: impl FnOnce(&Chain) -> R) -> Result<R> {
        let store = self.entity.store();
        Ok(f(store.chain(self.id)?))
    }

    pub fn name(&self) -> Result<String> {
        self.read(|c| c.name.clone())
    }

    pub fn chain_type(&self) -> Result<ChainType> {
        self.read(|c| c.chain_type)
    }

    /// Whether residue numbers are non-decreasing along the chain.
    pub fn in_sequence(&self) -> Result<bool> {
        self.read(|c| c.in_sequence())
    }

    pub fn residues(&self) -> Result<Vec<ResidueHandle>> {
        let ids = self.read(|c| c.residues().to_vec())?;
        Ok(ids
            .into_iter()
            .map(|id| ResidueHandle::new(self.entity.clone(), id))
            .collect())
    }

    pub fn residue_count(&self) -> Result<usize> {
        self.read(|c| c.residues().len())
    }

    pub fn atom_count(&self) -> Result<usize> {
        let store = self.entity.store();
        let chain = store.chain(self.id)?;
        Ok(chain
            .residues()
            .iter()
            .filter_map(|&id| store.residue(id).ok())
            .map(|r| r.atoms().len())
            .sum())
    }

    pub fn find_residue(&self, number: impl Into<ResNum>) -> Result<Option<ResidueHandle>> {
        let id = self.entity.store().find_residue(self.id, number.into())?;
        Ok(id.map(|id| ResidueHandle::new(self.entity.clone(), id)))
    }

    pub fn find_atom(&self, number: impl Into<ResNum>, name: &str) -> Result<Option<AtomHandle>> {
        match self.find_residue(number)? {
            Some(residue) => residue.find_atom(name),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomProp;
    use crate::editors::EditMode;
    use crate::handles::create_entity;
    use nalgebra::Point3;

    #[test]
    fn find_residue_switches_to_linear_scan_when_out_of_order() {
        let entity = create_entity();
        let mut ed = entity.edit_xcs(EditMode::Unbuffered).unwrap();
        let chain = ed.create_chain("B");
        ed.set_chain_type(&chain, ChainType::Protein).unwrap();
        for n in [3, 1, 7] {
            let r = ed.append_residue(&chain, "ALA", n).unwrap();
            ed.insert_atom(&r, "CA", Point3::origin(), AtomProp::with_element("C"))
                .unwrap();
        }
        ed.commit();

        assert!(!chain.in_sequence().unwrap());
        assert_eq!(chain.chain_type().unwrap(), ChainType::Protein);
        assert_eq!(
            chain.find_residue(1).unwrap().unwrap().number().unwrap(),
            ResNum::new(1)
        );
        assert!(chain.find_residue(2).unwrap().is_none());
        assert!(chain.find_atom(7, "CA").unwrap().is_some());
        assert!(chain.find_atom(7, "CB").unwrap().is_none());
        assert_eq!(chain.residue_count().unwrap(), 3);
        assert_eq!(chain.atom_count().unwrap(), 3);
    }

    #[test]
    fn insertion_code_residues_are_found() {
        let entity = create_entity();
        let mut ed = entity.edit_xcs(EditMode::Unbuffered).unwrap();
        let chain = ed.create_chain("A");
        ed.append_residue(&chain, "ALA", 27).unwrap();
        let inserted = ed
            .append_residue(&chain, "GLY", ResNum::with_ins_code(27, 'A'))
            .unwrap();
        ed.append_residue(&chain, "SER", 28).unwrap();
        ed.commit();

        assert!(chain.in_sequence().unwrap());
        assert_eq!(
            chain.find_residue(ResNum::with_ins_code(27, 'A')).unwrap(),
            Some(inserted)
        );
    }
}
