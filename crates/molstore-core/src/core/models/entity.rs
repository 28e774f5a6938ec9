use super::atom::{Atom, AtomProp};
use super::chain::{Chain, ChainType};
use super::ids::{AtomId, BondId, ChainId, RecordKind, RecordRef, ResidueId, TorsionId};
use super::residue::{ResNum, Residue, find_by_number};
use super::topology::{Bond, BondOrder, Torsion};
use crate::config::{ConfigError, EntityConfig};
use crate::core::connectors::{ConnectorForest, InternalCoords};
use crate::core::observer::EntityEvent;
use crate::core::props::PropBag;
use crate::core::spatial::SpatialOrganizer;
use crate::core::utils::geometry::dihedral_angle;
use crate::error::{Result, StoreError};
use bitflags::bitflags;
use nalgebra::{Matrix4, Point3};
use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, trace};

bitflags! {
    /// Derived state that must be recomputed before it can be trusted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// The bonded graph or atom order changed; the connector forest is stale.
        const TOPOLOGY = 0b001;
        /// Positions changed; cached internal coordinates are stale.
        const INTERNAL_COORDS = 0b010;
        /// Every indexed position moved; the spatial grid must be rebuilt.
        const SPATIAL = 0b100;
    }
}

bitflags! {
    /// Observer notifications accumulated since the last flush.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    struct PendingEvents: u8 {
        const TOPOLOGY = 0b01;
        const GEOMETRY = 0b10;
    }
}

fn invalid(kind: RecordKind) -> StoreError {
    StoreError::InvalidHandle { kind }
}

/// Owner of every record of one molecular entity.
///
/// Records live in slot maps, so an id handed out for a deleted record never
/// resolves again. Chains, bonds and torsions remember their insertion order
/// separately because slot maps reuse freed slots.
///
/// Mutating methods are crate-private: outside code goes through an editor,
/// which decides when [`flush`](Self::flush) recomputes derived state.
#[derive(Debug, Clone)]
pub struct EntityStore {
    config: EntityConfig,
    chains: SlotMap<ChainId, Chain>,
    chain_order: Vec<ChainId>,
    residues: SlotMap<ResidueId, Residue>,
    atoms: SlotMap<AtomId, Atom>,
    bonds: SlotMap<BondId, Bond>,
    bond_order: Vec<BondId>,
    torsions: SlotMap<TorsionId, Torsion>,
    torsion_order: Vec<TorsionId>,
    /// Bonded neighbours of every atom, in bond insertion order.
    adjacency: SecondaryMap<AtomId, Vec<(AtomId, BondId)>>,
    transform: Matrix4<f64>,
    inverse_transform: Matrix4<f64>,
    props: Option<PropBag>,
    connectors: ConnectorForest,
    spatial: SpatialOrganizer,
    dirty: DirtyFlags,
    pending: PendingEvents,
    editor_open: bool,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::from_validated(EntityConfig::default())
    }
}

impl EntityStore {
    /// Creates an empty store with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCellSize`] for a non-positive or
    /// non-finite spatial cell size.
    pub fn with_config(config: EntityConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: EntityConfig) -> Self {
        let spatial = SpatialOrganizer::new(config.spatial_cell_size);
        Self {
            config,
            chains: SlotMap::with_key(),
            chain_order: Vec::new(),
            residues: SlotMap::with_key(),
            atoms: SlotMap::with_key(),
            bonds: SlotMap::with_key(),
            bond_order: Vec::new(),
            torsions: SlotMap::with_key(),
            torsion_order: Vec::new(),
            adjacency: SecondaryMap::new(),
            transform: Matrix4::identity(),
            inverse_transform: Matrix4::identity(),
            props: None,
            connectors: ConnectorForest::new(),
            spatial,
            dirty: DirtyFlags::empty(),
            pending: PendingEvents::empty(),
            editor_open: false,
        }
    }

    /// Returns an independent deep copy with no open editor and no pending
    /// notifications.
    pub fn deep_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.editor_open = false;
        copy.pending = PendingEvents::empty();
        copy
    }

    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    // ---- record access ------------------------------------------------------

    pub fn chain(&self, id: ChainId) -> Result<&Chain> {
        self.chains.get(id).ok_or(invalid(RecordKind::Chain))
    }

    pub fn residue(&self, id: ResidueId) -> Result<&Residue> {
        self.residues.get(id).ok_or(invalid(RecordKind::Residue))
    }

    pub fn atom(&self, id: AtomId) -> Result<&Atom> {
        self.atoms.get(id).ok_or(invalid(RecordKind::Atom))
    }

    pub fn bond(&self, id: BondId) -> Result<&Bond> {
        self.bonds.get(id).ok_or(invalid(RecordKind::Bond))
    }

    pub fn torsion(&self, id: TorsionId) -> Result<&Torsion> {
        self.torsions.get(id).ok_or(invalid(RecordKind::Torsion))
    }

    fn chain_mut(&mut self, id: ChainId) -> Result<&mut Chain> {
        self.chains.get_mut(id).ok_or(invalid(RecordKind::Chain))
    }

    fn residue_mut(&mut self, id: ResidueId) -> Result<&mut Residue> {
        self.residues.get_mut(id).ok_or(invalid(RecordKind::Residue))
    }

    fn atom_mut(&mut self, id: AtomId) -> Result<&mut Atom> {
        self.atoms.get_mut(id).ok_or(invalid(RecordKind::Atom))
    }

    /// Whether `record` still resolves in this store.
    pub fn contains(&self, record: RecordRef) -> bool {
        match record {
            RecordRef::Entity => true,
            RecordRef::Chain(id) => self.chains.contains_key(id),
            RecordRef::Residue(id) => self.residues.contains_key(id),
            RecordRef::Atom(id) => self.atoms.contains_key(id),
            RecordRef::Bond(id) => self.bonds.contains_key(id),
            RecordRef::Torsion(id) => self.torsions.contains_key(id),
        }
    }

    /// Chains in insertion order.
    pub fn chain_ids(&self) -> &[ChainId] {
        &self.chain_order
    }

    /// All residues in hierarchy order (chain order, then residue order).
    pub fn residue_ids(&self) -> Vec<ResidueId> {
        self.chain_order
            .iter()
            .filter_map(|&c| self.chains.get(c))
            .flat_map(|chain| chain.residues.iter().copied())
            .collect()
    }

    /// All atoms in hierarchy order (chain, residue, then atom order).
    pub fn atom_ids(&self) -> Vec<AtomId> {
        self.residue_ids()
            .into_iter()
            .filter_map(|r| self.residues.get(r))
            .flat_map(|residue| residue.atoms.iter().copied())
            .collect()
    }

    /// Bonds in insertion order.
    pub fn bond_ids(&self) -> &[BondId] {
        &self.bond_order
    }

    /// Torsions in insertion order.
    pub fn torsion_ids(&self) -> &[TorsionId] {
        &self.torsion_order
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn torsion_count(&self) -> usize {
        self.torsions.len()
    }

    // ---- lookups ------------------------------------------------------------

    /// Finds the first chain with the given name.
    pub fn find_chain(&self, name: &str) -> Option<ChainId> {
        self.chain_order
            .iter()
            .copied()
            .find(|&id| self.chains.get(id).is_some_and(|c| c.name == name))
    }

    /// Finds a residue by number within a chain.
    ///
    /// Uses binary search while the chain is in sequence, a linear scan
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the chain does not exist.
    pub fn find_residue(&self, chain_id: ChainId, number: ResNum) -> Result<Option<ResidueId>> {
        let chain = self.chain(chain_id)?;
        let found = find_by_number(&chain.residues, number, chain.in_sequence, |id| {
            self.residues.get(*id).map(|r| r.number)
        });
        Ok(found.map(|idx| chain.residues[idx]))
    }

    /// Finds the first atom named `name` in a residue.
    pub fn find_atom_in_residue(&self, residue_id: ResidueId, name: &str) -> Result<Option<AtomId>> {
        let residue = self.residue(residue_id)?;
        Ok(residue
            .atoms
            .iter()
            .copied()
            .find(|&id| self.atoms.get(id).is_some_and(|a| a.name == name)))
    }

    /// Finds an atom by chain name, residue number and atom name.
    pub fn find_atom(&self, chain_name: &str, number: ResNum, atom_name: &str) -> Option<AtomId> {
        let chain_id = self.find_chain(chain_name)?;
        let residue_id = self.find_residue(chain_id, number).ok()??;
        self.find_atom_in_residue(residue_id, atom_name).ok()?
    }

    pub fn find_torsion(&self, name: &str) -> Option<TorsionId> {
        self.torsion_order
            .iter()
            .copied()
            .find(|&id| self.torsions.get(id).is_some_and(|t| t.name == name))
    }

    /// Position of a residue within its chain.
    pub fn residue_index(&self, residue_id: ResidueId) -> Result<usize> {
        let residue = self.residue(residue_id)?;
        self.chain(residue.chain_id)?
            .residues
            .iter()
            .position(|&id| id == residue_id)
            .ok_or(StoreError::HierarchyMismatch {
                kind: RecordKind::Residue,
            })
    }

    /// Returns the residue `offset` places away from `residue_id` in its
    /// chain, if there is one.
    pub fn residue_at_offset(&self, residue_id: ResidueId, offset: isize) -> Result<Option<ResidueId>> {
        let index = self.residue_index(residue_id)?;
        let chain = self.chain(self.residue(residue_id)?.chain_id)?;
        Ok(index
            .checked_add_signed(offset)
            .and_then(|i| chain.residues.get(i))
            .copied())
    }

    // ---- bonded graph -------------------------------------------------------

    pub fn bond_between(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.adjacency
            .get(a)?
            .iter()
            .find(|(neighbor, _)| *neighbor == b)
            .map(|(_, bond)| *bond)
    }

    pub fn are_bonded(&self, a: AtomId, b: AtomId) -> bool {
        self.bond_between(a, b).is_some()
    }

    /// Bonds of an atom in insertion order.
    pub fn bonds_of(&self, atom_id: AtomId) -> Result<Vec<BondId>> {
        self.atom(atom_id)?;
        Ok(self
            .adjacency
            .get(atom_id)
            .map(|n| n.iter().map(|(_, bond)| *bond).collect())
            .unwrap_or_default())
    }

    pub fn bonded_partners(&self, atom_id: AtomId) -> Result<Vec<AtomId>> {
        self.atom(atom_id)?;
        Ok(self
            .adjacency
            .get(atom_id)
            .map(|n| n.iter().map(|(atom, _)| *atom).collect())
            .unwrap_or_default())
    }

    // ---- geometry -----------------------------------------------------------

    pub fn transform(&self) -> Matrix4<f64> {
        self.transform
    }

    pub fn position(&self, atom_id: AtomId) -> Result<Point3<f64>> {
        Ok(self.atom(atom_id)?.position)
    }

    /// Current dihedral of four atoms in radians.
    pub fn dihedral(&self, atoms: [AtomId; 4]) -> Result<f64> {
        let [a, b, c, d] = atoms;
        Ok(dihedral_angle(
            &self.position(a)?,
            &self.position(b)?,
            &self.position(c)?,
            &self.position(d)?,
        ))
    }

    /// Atoms whose indexed position lies within `radius` of `point`.
    ///
    /// The grid reflects the positions at the last flush plus any
    /// single-atom moves since; a global transform applied by a buffered
    /// editor becomes visible at commit.
    pub fn find_within(&self, point: &Point3<f64>, radius: f64) -> Vec<AtomId> {
        self.spatial
            .find_within(point, radius)
            .into_iter()
            .filter(|&id| self.atoms.contains_key(id))
            .collect()
    }

    /// The connector forest as of the last rebuild. Call
    /// [`ensure_connectors`](Self::ensure_connectors) first when topology
    /// may have changed.
    pub fn connectors(&self) -> &ConnectorForest {
        &self.connectors
    }

    /// Cached internal coordinates of an atom, recomputed first if stale.
    pub fn internal_coords(&mut self, atom_id: AtomId) -> Result<InternalCoords> {
        self.atom(atom_id)?;
        self.ensure_connectors();
        Ok(self
            .connectors
            .internal_coords(atom_id)
            .unwrap_or_default())
    }

    pub fn primary_parent(&mut self, atom_id: AtomId) -> Result<Option<AtomId>> {
        self.atom(atom_id)?;
        self.ensure_connectors();
        Ok(self.connectors.parent(atom_id))
    }

    // ---- properties ---------------------------------------------------------

    pub fn props(&self, record: RecordRef) -> Result<Option<&PropBag>> {
        Ok(match record {
            RecordRef::Entity => self.props.as_ref(),
            RecordRef::Chain(id) => self.chain(id)?.props.as_ref(),
            RecordRef::Residue(id) => self.residue(id)?.props.as_ref(),
            RecordRef::Atom(id) => self.atom(id)?.props.as_ref(),
            RecordRef::Bond(id) => self.bond(id)?.props.as_ref(),
            RecordRef::Torsion(id) => self.torsion(id)?.props.as_ref(),
        })
    }

    pub(crate) fn props_slot_mut(&mut self, record: RecordRef) -> Result<&mut Option<PropBag>> {
        let kind = record.kind();
        let slot = match record {
            RecordRef::Entity => Some(&mut self.props),
            RecordRef::Chain(id) => self.chains.get_mut(id).map(|r| &mut r.props),
            RecordRef::Residue(id) => self.residues.get_mut(id).map(|r| &mut r.props),
            RecordRef::Atom(id) => self.atoms.get_mut(id).map(|r| &mut r.props),
            RecordRef::Bond(id) => self.bonds.get_mut(id).map(|r| &mut r.props),
            RecordRef::Torsion(id) => self.torsions.get_mut(id).map(|r| &mut r.props),
        };
        slot.ok_or(invalid(kind))
    }

    // ---- editor bookkeeping -------------------------------------------------

    pub fn is_editing(&self) -> bool {
        self.editor_open
    }

    pub(crate) fn open_editor(&mut self) -> Result<()> {
        if self.editor_open {
            return Err(StoreError::EditorAlreadyOpen);
        }
        self.editor_open = true;
        Ok(())
    }

    pub(crate) fn close_editor(&mut self) {
        self.editor_open = false;
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    fn mark_topology_changed(&mut self) {
        self.dirty |= DirtyFlags::TOPOLOGY;
        self.pending |= PendingEvents::TOPOLOGY;
    }

    fn mark_renamed(&mut self) {
        self.pending |= PendingEvents::TOPOLOGY;
    }

    fn mark_geometry_changed(&mut self) {
        self.dirty |= DirtyFlags::INTERNAL_COORDS;
        self.pending |= PendingEvents::GEOMETRY;
    }

    /// Rebuilds the connector forest and internal-coordinate cache if stale.
    pub(crate) fn ensure_connectors(&mut self) {
        if self.dirty.contains(DirtyFlags::TOPOLOGY) {
            self.rebuild_connectors();
        } else if self.dirty.contains(DirtyFlags::INTERNAL_COORDS) {
            self.refresh_internal_coords();
        }
        self.dirty
            .remove(DirtyFlags::TOPOLOGY | DirtyFlags::INTERNAL_COORDS);
    }

    /// Recomputes every piece of stale derived state and drains the events
    /// observers should hear about, topology before geometry.
    pub(crate) fn flush(&mut self) -> Vec<EntityEvent> {
        self.ensure_connectors();
        if self.dirty.contains(DirtyFlags::SPATIAL) {
            self.rebuild_spatial();
            self.dirty.remove(DirtyFlags::SPATIAL);
        }

        let mut events = Vec::new();
        if self.pending.contains(PendingEvents::TOPOLOGY) {
            events.push(EntityEvent::TopologyChanged);
        }
        if self.pending.contains(PendingEvents::GEOMETRY) {
            events.push(EntityEvent::GeometryChanged);
        }
        self.pending = PendingEvents::empty();
        events
    }

    fn rebuild_connectors(&mut self) {
        let order = self.atom_ids();
        self.connectors = ConnectorForest::build(&order, &self.adjacency);
        self.refresh_internal_coords();
        debug!(
            atoms = order.len(),
            roots = self.connectors.roots().len(),
            secondary = self.connectors.secondary_count(),
            "Rebuilt connector forest"
        );
    }

    fn refresh_internal_coords(&mut self) {
        let atoms = &self.atoms;
        self.connectors
            .refresh_internal_coords(|id| atoms.get(id).map(|a| a.position));
    }

    fn rebuild_spatial(&mut self) {
        self.spatial
            .rebuild(self.atoms.iter().map(|(id, atom)| (id, atom.position)));
        debug!(atoms = self.spatial.len(), "Rebuilt spatial index");
    }

    // ---- structural editing -------------------------------------------------

    pub(crate) fn create_chain(&mut self, name: &str) -> ChainId {
        let id = self.chains.insert(Chain::new(name, ChainType::default()));
        self.chain_order.push(id);
        self.mark_topology_changed();
        id
    }

    pub(crate) fn set_chain_type(&mut self, chain_id: ChainId, chain_type: ChainType) -> Result<()> {
        self.chain_mut(chain_id)?.chain_type = chain_type;
        self.mark_renamed();
        Ok(())
    }

    /// Appends a residue at the end of a chain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the chain does not exist.
    pub(crate) fn append_residue(
        &mut self,
        chain_id: ChainId,
        name: &str,
        number: ResNum,
    ) -> Result<ResidueId> {
        self.chain(chain_id)?;
        let last_number = self
            .chains
            .get(chain_id)
            .and_then(|c| c.residues.last())
            .and_then(|&r| self.residues.get(r))
            .map(|r| r.number);

        let id = self.residues.insert(Residue::new(number, name, chain_id));
        let chain = self.chain_mut(chain_id)?;
        chain.residues.push(id);
        if last_number.is_some_and(|last| last > number) {
            chain.in_sequence = false;
        }
        self.mark_topology_changed();
        Ok(id)
    }

    /// Inserts a residue directly after `after` in the same chain.
    pub(crate) fn insert_residue_after(
        &mut self,
        after: ResidueId,
        name: &str,
        number: ResNum,
    ) -> Result<ResidueId> {
        let index = self.residue_index(after)?;
        let chain_id = self.residue(after)?.chain_id;

        let id = self.residues.insert(Residue::new(number, name, chain_id));
        self.chain_mut(chain_id)?.residues.insert(index + 1, id);
        self.refresh_in_sequence(chain_id);
        self.mark_topology_changed();
        Ok(id)
    }

    /// Inserts an atom at `position`, given in the transformed frame.
    pub(crate) fn insert_atom(
        &mut self,
        residue_id: ResidueId,
        name: &str,
        position: Point3<f64>,
        prop: AtomProp,
    ) -> Result<AtomId> {
        self.residue(residue_id)?;
        let original = self.inverse_transform.transform_point(&position);
        let id = self
            .atoms
            .insert(Atom::new(name, residue_id, original, position, prop));
        self.residue_mut(residue_id)?.add_atom(id);
        self.adjacency.insert(id, Vec::new());
        self.spatial.insert(id, position);
        self.mark_topology_changed();
        Ok(id)
    }

    /// Bonds two atoms.
    ///
    /// # Errors
    ///
    /// * [`StoreError::InvalidHandle`] if either atom does not exist.
    /// * [`StoreError::SelfBond`] if `a == b`.
    /// * [`StoreError::DuplicateBond`] if the atoms are already bonded.
    pub(crate) fn connect(&mut self, a: AtomId, b: AtomId, order: BondOrder) -> Result<BondId> {
        self.atom(a)?;
        self.atom(b)?;
        if a == b {
            return Err(StoreError::SelfBond);
        }
        if self.are_bonded(a, b) {
            return Err(StoreError::DuplicateBond);
        }

        let id = self.bonds.insert(Bond::new(a, b, order));
        self.bond_order.push(id);
        for (atom, partner) in [(a, b), (b, a)] {
            if let Some(neighbors) = self.adjacency.get_mut(atom) {
                neighbors.push((partner, id));
            }
        }
        self.mark_topology_changed();
        Ok(id)
    }

    pub(crate) fn set_bond_order(&mut self, bond_id: BondId, order: BondOrder) -> Result<()> {
        self.bonds
            .get_mut(bond_id)
            .ok_or(invalid(RecordKind::Bond))?
            .order = order;
        self.mark_renamed();
        Ok(())
    }

    /// Adds a named torsion. The atoms need not be bonded in sequence.
    pub(crate) fn add_torsion(&mut self, name: &str, atoms: [AtomId; 4]) -> Result<TorsionId> {
        for &atom in &atoms {
            self.atom(atom)?;
        }
        let id = self.torsions.insert(Torsion::new(name, atoms));
        self.torsion_order.push(id);
        self.mark_renamed();
        Ok(id)
    }

    pub(crate) fn delete_bond(&mut self, bond_id: BondId) -> Result<()> {
        let bond = self.bonds.remove(bond_id).ok_or(invalid(RecordKind::Bond))?;
        self.bond_order.retain(|&id| id != bond_id);
        for atom in [bond.first, bond.second] {
            if let Some(neighbors) = self.adjacency.get_mut(atom) {
                neighbors.retain(|(_, id)| *id != bond_id);
            }
        }
        trace!(?bond_id, "Deleted bond");
        self.mark_topology_changed();
        Ok(())
    }

    pub(crate) fn delete_torsion(&mut self, torsion_id: TorsionId) -> Result<()> {
        self.torsions
            .remove(torsion_id)
            .ok_or(invalid(RecordKind::Torsion))?;
        self.torsion_order.retain(|&id| id != torsion_id);
        self.mark_renamed();
        Ok(())
    }

    /// Deletes an atom together with its bonds and the torsions naming it.
    pub(crate) fn delete_atom(&mut self, atom_id: AtomId) -> Result<()> {
        let atom = self.atoms.remove(atom_id).ok_or(invalid(RecordKind::Atom))?;

        // 1. Detach from the parent residue
        if let Some(residue) = self.residues.get_mut(atom.residue_id) {
            residue.remove_atom(atom_id);
        }

        // 2. Drop bonds and the partner side of the adjacency
        let neighbors = self.adjacency.remove(atom_id).unwrap_or_default();
        for (partner, bond_id) in neighbors {
            self.bonds.remove(bond_id);
            if let Some(list) = self.adjacency.get_mut(partner) {
                list.retain(|(_, id)| *id != bond_id);
            }
        }
        self.bond_order.retain(|&id| self.bonds.contains_key(id));

        // 3. Drop torsions that reference the atom
        self.torsions.retain(|_, torsion| !torsion.contains(atom_id));
        self.torsion_order
            .retain(|&id| self.torsions.contains_key(id));

        // 4. Leave the spatial index
        self.spatial.remove(atom_id);

        trace!(?atom_id, name = %atom.name, "Deleted atom");
        self.mark_topology_changed();
        Ok(())
    }

    pub(crate) fn delete_all_atoms(&mut self, residue_id: ResidueId) -> Result<()> {
        for atom_id in self.residue(residue_id)?.atoms.clone() {
            self.delete_atom(atom_id)?;
        }
        Ok(())
    }

    pub(crate) fn delete_residue(&mut self, residue_id: ResidueId) -> Result<()> {
        self.delete_all_atoms(residue_id)?;
        let residue = self
            .residues
            .remove(residue_id)
            .ok_or(invalid(RecordKind::Residue))?;
        if let Some(chain) = self.chains.get_mut(residue.chain_id) {
            chain.residues.retain(|&id| id != residue_id);
        }
        self.refresh_in_sequence(residue.chain_id);
        trace!(?residue_id, name = %residue.name, "Deleted residue");
        self.mark_topology_changed();
        Ok(())
    }

    pub(crate) fn delete_chain(&mut self, chain_id: ChainId) -> Result<()> {
        for residue_id in self.chain(chain_id)?.residues.clone() {
            self.delete_residue(residue_id)?;
        }
        let chain = self.chains.remove(chain_id).ok_or(invalid(RecordKind::Chain))?;
        self.chain_order.retain(|&id| id != chain_id);
        trace!(?chain_id, name = %chain.name, "Deleted chain");
        self.mark_topology_changed();
        Ok(())
    }

    pub(crate) fn rename_chain(&mut self, chain_id: ChainId, name: &str) -> Result<()> {
        self.chain_mut(chain_id)?.name = name.to_string();
        self.mark_renamed();
        Ok(())
    }

    pub(crate) fn rename_residue(&mut self, residue_id: ResidueId, name: &str) -> Result<()> {
        self.residue_mut(residue_id)?.name = name.to_string();
        self.mark_renamed();
        Ok(())
    }

    pub(crate) fn set_one_letter_code(&mut self, residue_id: ResidueId, code: char) -> Result<()> {
        self.residue_mut(residue_id)?.one_letter_code = code;
        self.mark_renamed();
        Ok(())
    }

    pub(crate) fn rename_atom(&mut self, atom_id: AtomId, name: &str) -> Result<()> {
        self.atom_mut(atom_id)?.name = name.to_string();
        self.mark_renamed();
        Ok(())
    }

    pub(crate) fn set_atom_prop(&mut self, atom_id: AtomId, prop: AtomProp) -> Result<()> {
        self.atom_mut(atom_id)?.prop = prop;
        self.mark_renamed();
        Ok(())
    }

    pub(crate) fn set_residue_number(&mut self, residue_id: ResidueId, number: ResNum) -> Result<()> {
        let residue = self.residue_mut(residue_id)?;
        residue.number = number;
        let chain_id = residue.chain_id;
        self.refresh_in_sequence(chain_id);
        self.mark_renamed();
        Ok(())
    }

    /// Renumbers every residue of a chain starting at `start`.
    ///
    /// With `keep_spacing` the existing gaps are preserved by shifting all
    /// numbers by the same offset; otherwise residues are numbered
    /// consecutively and insertion codes are cleared.
    pub(crate) fn renumber_chain(&mut self, chain_id: ChainId, start: i32, keep_spacing: bool) -> Result<()> {
        let residue_ids = self.chain(chain_id)?.residues.clone();
        if keep_spacing {
            let first = residue_ids
                .iter()
                .find_map(|&id| self.residues.get(id))
                .map(|r| r.number.num);
            if let Some(first) = first {
                let offset = start - first;
                for &id in &residue_ids {
                    if let Some(residue) = self.residues.get_mut(id) {
                        residue.number.num += offset;
                    }
                }
            }
        } else {
            let mut next = start;
            for &id in &residue_ids {
                if let Some(residue) = self.residues.get_mut(id) {
                    residue.number = ResNum::new(next);
                    next += 1;
                }
            }
        }
        self.refresh_in_sequence(chain_id);
        self.mark_renamed();
        Ok(())
    }

    fn refresh_in_sequence(&mut self, chain_id: ChainId) {
        let Some(chain) = self.chains.get(chain_id) else {
            return;
        };
        let numbers: Vec<ResNum> = chain
            .residues
            .iter()
            .filter_map(|&id| self.residues.get(id).map(|r| r.number))
            .collect();
        let in_sequence = numbers.windows(2).all(|w| w[0] <= w[1]);
        if let Some(chain) = self.chains.get_mut(chain_id) {
            chain.in_sequence = in_sequence;
        }
    }

    // ---- positions ----------------------------------------------------------

    fn place_atom(&mut self, atom_id: AtomId, original: Point3<f64>, position: Point3<f64>) -> Result<()> {
        let atom = self.atom_mut(atom_id)?;
        atom.original_position = original;
        atom.position = position;
        if !self.dirty.contains(DirtyFlags::SPATIAL) {
            self.spatial.update(atom_id, position);
        }
        self.mark_geometry_changed();
        Ok(())
    }

    /// Moves an atom to `position` in the transformed frame.
    pub(crate) fn set_position(&mut self, atom_id: AtomId, position: Point3<f64>) -> Result<()> {
        let original = self.inverse_transform.transform_point(&position);
        self.place_atom(atom_id, original, position)
    }

    pub(crate) fn set_original_position(&mut self, atom_id: AtomId, original: Point3<f64>) -> Result<()> {
        let position = self.transform.transform_point(&original);
        self.place_atom(atom_id, original, position)
    }

    /// Applies `m` to the current positions of `atoms`.
    pub(crate) fn transform_atoms(&mut self, atoms: &[AtomId], m: &Matrix4<f64>) -> Result<()> {
        for &atom_id in atoms {
            let moved = m.transform_point(&self.position(atom_id)?);
            self.set_position(atom_id, moved)?;
        }
        Ok(())
    }

    /// Replaces the global transform and recomputes every transformed
    /// position from the original coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SingularTransform`] if `m` has no inverse; the
    /// store is left unchanged.
    pub(crate) fn set_transform(&mut self, m: Matrix4<f64>) -> Result<()> {
        let inverse = m.try_inverse().ok_or(StoreError::SingularTransform)?;
        self.transform = m;
        self.inverse_transform = inverse;
        for atom in self.atoms.values_mut() {
            atom.position = m.transform_point(&atom.original_position);
        }
        self.dirty |= DirtyFlags::SPATIAL;
        self.mark_geometry_changed();
        Ok(())
    }

    /// Composes `m` on top of the current transform (`m * current`).
    pub(crate) fn apply_transform(&mut self, m: &Matrix4<f64>) -> Result<()> {
        self.set_transform(m * self.transform)
    }

    /// Stores an alternate location for an atom; `position` is in the
    /// transformed frame.
    pub(crate) fn add_alt_position(&mut self, atom_id: AtomId, group: &str, position: Point3<f64>) -> Result<()> {
        let original = self.inverse_transform.transform_point(&position);
        self.atom_mut(atom_id)?
            .alt_positions
            .insert(group.to_string(), original);
        Ok(())
    }

    /// Loads the coordinates of `group` into the atom.
    ///
    /// The coordinates being replaced are saved back under the previously
    /// active group, if any. Returns `false` when the atom has no such group.
    pub(crate) fn switch_alt_position(&mut self, atom_id: AtomId, group: &str) -> Result<bool> {
        let atom = self.atom_mut(atom_id)?;
        if atom.active_alt.as_deref() == Some(group) {
            return Ok(true);
        }
        let Some(&target) = atom.alt_positions.get(group) else {
            return Ok(false);
        };
        if let Some(previous) = atom.active_alt.take() {
            let current = atom.original_position;
            atom.alt_positions.insert(previous, current);
        }
        atom.active_alt = Some(group.to_string());
        self.set_original_position(atom_id, target)?;
        Ok(true)
    }
}
