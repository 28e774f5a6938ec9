use super::{AtomView, ChainView, ResidueView, ViewAddFlags};
use crate::core::models::ids::{AtomId, RecordKind, RecordRef};
use crate::core::models::residue::ResNum;
use crate::error::{Result, StoreError};
use crate::handles::{
    AtomHandle, BondHandle, ChainHandle, EntityHandle, RecordHandle, ResidueHandle,
    ensure_same_entity,
};
use nalgebra::Point3;
use std::collections::HashSet;
use tracing::warn;

/// A selection of chains, residues, atoms and bonds of one entity.
#[derive(Debug, Clone)]
pub struct EntityView {
    entity: EntityHandle,
    chains: Vec<ChainView>,
    bonds: Vec<BondHandle>,
}

impl EntityView {
    pub(crate) fn new(entity: EntityHandle) -> Self {
        Self {
            entity,
            chains: Vec::new(),
            bonds: Vec::new(),
        }
    }

    /// A view holding every chain, residue, atom and bond in entity order.
    pub(crate) fn full(entity: EntityHandle) -> Self {
        let mut view = Self::new(entity.clone());
        for chain in entity.chains() {
            if let Err(err) = view.add_chain(&chain, ViewAddFlags::INCLUDE_ATOMS) {
                warn!(%err, "Skipping chain while building full view");
            }
        }
        view.bonds = entity.bonds();
        view
    }

    // ---- listing ------------------------------------------------------------

    /// Chain entries in view order, skipping deleted chains.
    pub fn chains(&self) -> impl Iterator<Item = &ChainView> {
        self.chains.iter().filter(|c| c.is_valid())
    }

    pub fn residues(&self) -> impl Iterator<Item = &ResidueView> {
        self.chains().flat_map(ChainView::residues)
    }

    pub fn atoms(&self) -> impl Iterator<Item = &AtomView> {
        self.chains().flat_map(ChainView::atoms)
    }

    pub fn bonds(&self) -> impl Iterator<Item = &BondHandle> {
        self.bonds.iter().filter(|b| b.is_valid())
    }

    pub fn chain_count(&self) -> usize {
        self.chains().count()
    }

    pub fn residue_count(&self) -> usize {
        self.residues().count()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms().count()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds().count()
    }

    pub fn contains_atom(&self, atom: &AtomHandle) -> bool {
        self.atoms().any(|a| a.handle() == atom)
    }

    // ---- lookup -------------------------------------------------------------

    pub fn find_chain(&self, name: &str) -> Option<&ChainView> {
        self.chains().find(|c| c.name().is_ok_and(|n| n == name))
    }

    pub fn find_residue(&self, chain_name: &str, number: impl Into<ResNum>) -> Option<&ResidueView> {
        self.find_chain(chain_name)?.find_residue(number)
    }

    pub fn find_atom(
        &self,
        chain_name: &str,
        number: impl Into<ResNum>,
        atom_name: &str,
    ) -> Option<&AtomView> {
        self.find_chain(chain_name)?.find_atom(number, atom_name)
    }

    /// Atoms of this view within `radius` of `point`, in spatial-index
    /// order.
    pub fn find_within(&self, point: &Point3<f64>, radius: f64) -> Vec<AtomHandle> {
        let members = self.atom_ids();
        self.entity
            .find_within(point, radius)
            .into_iter()
            .filter(|a| members.contains(&a.id()))
            .collect()
    }

    fn atom_ids(&self) -> HashSet<AtomId> {
        self.atoms().map(|a| a.id()).collect()
    }

    // ---- adding -------------------------------------------------------------

    /// Adds a chain. With [`ViewAddFlags::INCLUDE_ATOMS`] its residues and
    /// atoms are added too; combined with
    /// [`ViewAddFlags::CHECK_DUPLICATES`] this completes an existing entry.
    pub fn add_chain(&mut self, chain: &ChainHandle, flags: ViewAddFlags) -> Result<&mut ChainView> {
        ensure_same_entity(&self.entity, chain)?;
        if !chain.is_valid() {
            return Err(StoreError::InvalidHandle {
                kind: RecordKind::Chain,
            });
        }
        let existing = flags
            .contains(ViewAddFlags::CHECK_DUPLICATES)
            .then(|| self.chain_position(chain))
            .flatten();
        let idx = existing.unwrap_or_else(|| self.push_chain(chain));

        let entry = &mut self.chains[idx];
        if flags.contains(ViewAddFlags::INCLUDE_ATOMS) {
            for residue in chain.residues()? {
                entry.add_residue(&residue, flags)?;
            }
        }
        Ok(entry)
    }

    /// Adds a residue under the first entry of its chain, creating that
    /// entry if needed.
    pub fn add_residue(
        &mut self,
        residue: &ResidueHandle,
        flags: ViewAddFlags,
    ) -> Result<&mut ResidueView> {
        ensure_same_entity(&self.entity, residue)?;
        let chain = residue.chain()?;
        let idx = self.chain_entry(&chain);
        self.chains[idx].add_residue(residue, flags)
    }

    /// Adds an atom under the first entries of its residue and chain,
    /// creating them if needed.
    pub fn add_atom(&mut self, atom: &AtomHandle, flags: ViewAddFlags) -> Result<&mut AtomView> {
        ensure_same_entity(&self.entity, atom)?;
        let residue = atom.residue()?;
        let chain = residue.chain()?;
        let idx = self.chain_entry(&chain);
        self.chains[idx]
            .residue_entry(&residue)?
            .add_atom(atom, flags)
    }

    /// Adds a bond; returns `false` if it was already present and
    /// duplicates are checked.
    pub fn add_bond(&mut self, bond: &BondHandle, flags: ViewAddFlags) -> Result<bool> {
        ensure_same_entity(&self.entity, bond)?;
        if !bond.is_valid() {
            return Err(StoreError::InvalidHandle {
                kind: RecordKind::Bond,
            });
        }
        if flags.contains(ViewAddFlags::CHECK_DUPLICATES) && self.bonds.contains(bond) {
            return Ok(false);
        }
        self.bonds.push(bond.clone());
        Ok(true)
    }

    /// Adds every entity bond whose two atoms are both in the view and that
    /// the view does not hold yet. Returns the number of bonds added.
    pub fn add_all_inclusive_bonds(&mut self) -> usize {
        let members = self.atom_ids();
        let known: HashSet<BondHandle> = self.bonds.iter().cloned().collect();
        let before = self.bonds.len();
        for bond in self.entity.bonds() {
            let inside = match (bond.first(), bond.second()) {
                (Ok(a), Ok(b)) => members.contains(&a.id()) && members.contains(&b.id()),
                _ => false,
            };
            if inside && !known.contains(&bond) {
                self.bonds.push(bond);
            }
        }
        self.bonds.len() - before
    }

    fn chain_position(&self, chain: &ChainHandle) -> Option<usize> {
        self.chains.iter().position(|c| c.handle() == chain)
    }

    fn push_chain(&mut self, chain: &ChainHandle) -> usize {
        self.chains.push(ChainView::new(chain.clone()));
        self.chains.len() - 1
    }

    fn chain_entry(&mut self, chain: &ChainHandle) -> usize {
        match self.chain_position(chain) {
            Some(idx) => idx,
            None => self.push_chain(chain),
        }
    }

    // ---- removal ------------------------------------------------------------

    /// Removes every entry of `chain` from the view. The entity is not
    /// touched.
    pub fn remove_chain(&mut self, chain: &ChainHandle) -> bool {
        let before = self.chains.len();
        self.chains.retain(|c| c.handle() != chain);
        self.chains.len() != before
    }

    pub fn remove_residue(&mut self, residue: &ResidueHandle) -> bool {
        self.chains
            .iter_mut()
            .fold(false, |removed, c| c.remove_residue(residue) || removed)
    }

    pub fn remove_atom(&mut self, atom: &AtomHandle) -> bool {
        self.chains
            .iter_mut()
            .fold(false, |removed, c| c.remove_atom(atom) || removed)
    }

    pub fn remove_bond(&mut self, bond: &BondHandle) -> bool {
        let before = self.bonds.len();
        self.bonds.retain(|b| b != bond);
        self.bonds.len() != before
    }

    /// Drops every entry whose record was deleted from the entity.
    pub fn prune(&mut self) {
        self.chains.retain(|c| c.is_valid());
        for chain in &mut self.chains {
            chain.prune();
        }
        self.bonds.retain(|b| b.is_valid());
    }
}

impl RecordHandle for EntityView {
    fn entity(&self) -> &EntityHandle {
        &self.entity
    }

    fn record(&self) -> RecordRef {
        RecordRef::Entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomProp;
    use crate::core::props::GenericPropContainer;
    use crate::editors::EditMode;
    use crate::handles::create_entity;

    /// Chain A with residues 1..=3 (N, CA, C each, bonded along the
    /// backbone) and chain B with a single water oxygen.
    fn peptide() -> EntityHandle {
        let entity = create_entity();
        let mut ed = entity.edit_xcs(EditMode::Buffered).unwrap();
        let a = ed.create_chain("A");
        let mut previous: Option<AtomHandle> = None;
        for i in 1..=3 {
            let residue = ed.append_residue(&a, "GLY", i).unwrap();
            for (k, name) in ["N", "CA", "C"].iter().enumerate() {
                let x = 3.6 * (i - 1) as f64 + 1.2 * k as f64;
                let atom = ed
                    .insert_atom(&residue, name, Point3::new(x, 0.0, 0.0), AtomProp::default())
                    .unwrap();
                if let Some(prev) = &previous {
                    ed.connect(prev, &atom).unwrap();
                }
                previous = Some(atom);
            }
        }
        let b = ed.create_chain("B");
        let water = ed.append_residue(&b, "HOH", 101).unwrap();
        ed.insert_atom(&water, "O", Point3::new(0.0, 20.0, 0.0), AtomProp::with_element("O"))
            .unwrap();
        ed.commit();
        entity
    }

    #[test]
    fn full_view_mirrors_the_entity() {
        let entity = peptide();
        let view = entity.create_full_view();
        assert_eq!(view.chain_count(), 2);
        assert_eq!(view.residue_count(), 4);
        assert_eq!(view.atom_count(), 10);
        assert_eq!(view.bond_count(), 8);
        let names: Vec<_> = view.atoms().take(3).map(|a| a.name().unwrap()).collect();
        assert_eq!(names, ["N", "CA", "C"]);
        assert!(view.find_chain("A").unwrap().in_sequence());
    }

    #[test]
    fn add_atom_creates_missing_parents() {
        let entity = peptide();
        let ca = entity.find_atom("A", 2, "CA").unwrap();
        let mut view = entity.create_empty_view();
        view.add_atom(&ca, ViewAddFlags::empty()).unwrap();

        assert_eq!(view.chain_count(), 1);
        assert_eq!(view.residue_count(), 1);
        assert_eq!(view.find_atom("A", 2, "CA").unwrap().handle(), &ca);
        assert!(view.find_atom("A", 2, "N").is_none());
    }

    #[test]
    fn duplicates_depend_on_the_check_flag() {
        let entity = peptide();
        let residue = entity.find_residue("A", 1).unwrap();
        let mut view = entity.create_empty_view();

        view.add_residue(&residue, ViewAddFlags::INCLUDE_ATOMS).unwrap();
        view.add_residue(&residue, ViewAddFlags::empty()).unwrap();
        assert_eq!(view.residue_count(), 2);

        let mut checked = entity.create_empty_view();
        let flags = ViewAddFlags::INCLUDE_ATOMS | ViewAddFlags::CHECK_DUPLICATES;
        checked.add_residue(&residue, flags).unwrap();
        checked.add_residue(&residue, flags).unwrap();
        let n = residue.find_atom("N").unwrap().unwrap();
        checked.add_atom(&n, ViewAddFlags::CHECK_DUPLICATES).unwrap();
        assert_eq!(checked.residue_count(), 1);
        assert_eq!(checked.atom_count(), 3);

        checked.add_atom(&n, ViewAddFlags::empty()).unwrap();
        assert_eq!(checked.atom_count(), 4);
    }

    #[test]
    fn residue_order_controls_in_sequence() {
        let entity = peptide();
        let chain = entity.find_chain("A").unwrap();
        let residues = chain.residues().unwrap();
        let mut view = entity.create_empty_view();

        view.add_residue(&residues[0], ViewAddFlags::empty()).unwrap();
        view.add_residue(&residues[2], ViewAddFlags::empty()).unwrap();
        assert!(view.find_chain("A").unwrap().in_sequence());
        assert_eq!(view.find_residue("A", 3).unwrap().handle(), &residues[2]);

        view.add_residue(&residues[1], ViewAddFlags::empty()).unwrap();
        let chain_view = view.find_chain("A").unwrap();
        assert!(!chain_view.in_sequence());
        assert_eq!(chain_view.find_residue(2).unwrap().handle(), &residues[1]);
        assert_eq!(chain_view.find_residue(3).unwrap().handle(), &residues[2]);
    }

    #[test]
    fn records_must_match_their_parent_entry() {
        let entity = peptide();
        let mut view = entity.create_full_view();
        let water = entity.find_residue("B", 101).unwrap();
        let chain_a = view.find_chain("A").unwrap().handle().clone();
        let entry = view.add_chain(&chain_a, ViewAddFlags::CHECK_DUPLICATES).unwrap();
        assert_eq!(
            entry.add_residue(&water, ViewAddFlags::empty()).unwrap_err(),
            StoreError::HierarchyMismatch {
                kind: RecordKind::Residue
            }
        );

        let other = peptide();
        let foreign = other.find_chain("A").unwrap();
        assert_eq!(
            view.add_chain(&foreign, ViewAddFlags::empty()).unwrap_err(),
            StoreError::ForeignHandle {
                kind: RecordKind::Chain
            }
        );
    }

    #[test]
    fn deleted_records_are_skipped_until_pruned() {
        let entity = peptide();
        let mut view = entity.create_full_view();
        let residue = entity.find_residue("A", 2).unwrap();
        {
            let mut ed = entity.edit_xcs(EditMode::Unbuffered).unwrap();
            ed.delete_residue(&residue).unwrap();
        }

        assert_eq!(view.residue_count(), 3);
        assert_eq!(view.atom_count(), 7);
        assert_eq!(view.bond_count(), 4);
        assert!(view.find_residue("A", 2).is_none());

        view.prune();
        assert_eq!(view.chains[0].residues.len(), 2);
        assert_eq!(view.bonds.len(), 4);
    }

    #[test]
    fn deleted_residues_do_not_hide_later_ones() {
        let entity = peptide();
        let view = entity.create_full_view();
        let third = entity.find_residue("A", 3).unwrap();
        {
            let mut ed = entity.edit_xcs(EditMode::Unbuffered).unwrap();
            ed.delete_residue(&entity.find_residue("A", 2).unwrap()).unwrap();
        }

        let chain_view = view.find_chain("A").unwrap();
        assert!(chain_view.in_sequence());
        assert_eq!(chain_view.find_residue(3).unwrap().handle(), &third);
        assert!(chain_view.find_residue(1).is_some());
        assert_eq!(view.find_atom("A", 3, "CA").unwrap().name().unwrap(), "CA");
    }

    #[test]
    fn renumbering_in_the_entity_is_seen_by_views() {
        let entity = peptide();
        let view = entity.create_full_view();
        let first = entity.find_residue("A", 1).unwrap();
        assert!(view.find_chain("A").unwrap().in_sequence());
        {
            let mut ed = entity.edit_xcs(EditMode::Unbuffered).unwrap();
            ed.set_residue_number(&first, 10).unwrap();
        }

        let chain_view = view.find_chain("A").unwrap();
        assert!(!chain_view.in_sequence());
        assert_eq!(chain_view.find_residue(10).unwrap().handle(), &first);
        assert!(chain_view.find_residue(1).is_none());
        assert!(chain_view.find_residue(3).is_some());
    }

    #[test]
    fn removal_only_edits_the_view() {
        let entity = peptide();
        let mut view = entity.create_full_view();
        let residue = entity.find_residue("A", 1).unwrap();
        let water = entity.find_atom("B", 101, "O").unwrap();

        assert!(view.remove_residue(&residue));
        assert!(!view.remove_residue(&residue));
        assert!(view.remove_atom(&water));
        assert_eq!(view.residue_count(), 3);
        assert_eq!(view.atom_count(), 6);
        assert!(residue.is_valid());
        assert_eq!(entity.atom_count(), 10);

        let chain_b = entity.find_chain("B").unwrap();
        assert!(view.remove_chain(&chain_b));
        assert_eq!(view.chain_count(), 1);
    }

    #[test]
    fn inclusive_bonds_need_both_atoms() {
        let entity = peptide();
        let mut view = entity.create_empty_view();
        let flags = ViewAddFlags::INCLUDE_ATOMS;
        view.add_residue(&entity.find_residue("A", 1).unwrap(), flags)
            .unwrap();
        view.add_residue(&entity.find_residue("A", 2).unwrap(), flags)
            .unwrap();

        assert_eq!(view.add_all_inclusive_bonds(), 5);
        assert_eq!(view.add_all_inclusive_bonds(), 0);

        let bond = entity.bonds().pop().unwrap();
        assert!(view.add_bond(&bond, ViewAddFlags::CHECK_DUPLICATES).unwrap());
        assert!(!view.add_bond(&bond, ViewAddFlags::CHECK_DUPLICATES).unwrap());
        assert_eq!(view.bond_count(), 6);
    }

    #[test]
    fn find_within_is_limited_to_view_atoms() {
        let entity = peptide();
        let mut view = entity.create_empty_view();
        view.add_residue(&entity.find_residue("A", 1).unwrap(), ViewAddFlags::INCLUDE_ATOMS)
            .unwrap();

        let origin = Point3::origin();
        assert_eq!(entity.find_within(&origin, 4.0).len(), 4);
        let near = view.find_within(&origin, 4.0);
        assert_eq!(near.len(), 3);
        assert!(near.iter().all(|a| view.contains_atom(a)));
    }

    #[test]
    fn properties_are_forwarded_to_records() {
        let entity = peptide();
        let view = entity.create_full_view();
        let atom_view = view.find_atom("A", 1, "CA").unwrap();
        atom_view.set_float_prop("charge", -0.25).unwrap();
        view.find_chain("A")
            .unwrap()
            .set_string_prop("label", "heavy")
            .unwrap();
        view.set_int_prop("models", 1).unwrap();

        let ca = entity.find_atom("A", 1, "CA").unwrap();
        assert_eq!(ca.get_float_prop("charge").unwrap(), -0.25);
        assert_eq!(
            entity.find_chain("A").unwrap().get_string_prop("label").unwrap(),
            "heavy"
        );
        assert_eq!(entity.get_int_prop("models").unwrap(), 1);
    }
}
