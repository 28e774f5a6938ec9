use super::{AtomHandle, BondHandle, ChainHandle, RecordHandle, ResidueHandle, TorsionHandle};
use crate::config::{ConfigError, EntityConfig};
use crate::core::models::entity::EntityStore;
use crate::core::models::ids::RecordRef;
use crate::core::models::residue::ResNum;
use crate::core::observer::{EntityEvent, ObserverId, ObserverRegistry};
use crate::editors::{EditMode, IcsEditor, XcsEditor};
use crate::error::Result;
use crate::views::EntityView;
use nalgebra::{Matrix4, Point3};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

struct EntityInner {
    store: RefCell<EntityStore>,
    observers: RefCell<ObserverRegistry>,
}

/// Shared owner of an [`EntityStore`].
///
/// Cloning the handle shares the entity; use [`copy`](Self::copy) for an
/// independent deep copy. The store is only ever borrowed for the duration
/// of one call, and observers run after that borrow is released, so an
/// observer may freely read the entity through handles.
#[derive(Clone)]
pub struct EntityHandle {
    inner: Rc<EntityInner>,
}

/// Creates an empty entity with the default configuration.
pub fn create_entity() -> EntityHandle {
    EntityHandle::from_store(EntityStore::new())
}

/// Creates an empty entity after validating `config`.
pub fn create_entity_with_config(config: EntityConfig) -> std::result::Result<EntityHandle, ConfigError> {
    Ok(EntityHandle::from_store(EntityStore::with_config(config)?))
}

impl EntityHandle {
    fn from_store(store: EntityStore) -> Self {
        Self {
            inner: Rc::new(EntityInner {
                store: RefCell::new(store),
                observers: RefCell::new(ObserverRegistry::new()),
            }),
        }
    }

    pub(crate) fn store(&self) -> Ref<'_, EntityStore> {
        self.inner.store.borrow()
    }

    pub(crate) fn store_mut(&self) -> RefMut<'_, EntityStore> {
        self.inner.store.borrow_mut()
    }

    /// Whether both handles refer to the same entity.
    pub fn ptr_eq(&self, other: &EntityHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn config(&self) -> EntityConfig {
        self.store().config().clone()
    }

    /// Deep copy into a new, independent entity. Observers are not copied.
    pub fn copy(&self) -> EntityHandle {
        EntityHandle::from_store(self.store().deep_copy())
    }

    // ---- observers ----------------------------------------------------------

    pub fn add_observer(&self, callback: impl Fn(&EntityEvent) + 'static) -> ObserverId {
        self.inner.observers.borrow_mut().add(Box::new(callback))
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.borrow_mut().remove(id)
    }

    /// Recomputes stale derived state and tells observers about it.
    pub(crate) fn flush_and_notify(&self) {
        let events = self.store_mut().flush();
        if events.is_empty() {
            return;
        }
        let observers = self.inner.observers.borrow();
        for event in events {
            observers.notify(event);
        }
    }

    // ---- editors ------------------------------------------------------------

    /// Opens a Cartesian-coordinate editor. `None` selects the configured
    /// default mode.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EditorAlreadyOpen`](crate::error::StoreError::EditorAlreadyOpen)
    /// while another editor on this entity is alive.
    pub fn edit_xcs(&self, mode: impl Into<Option<EditMode>>) -> Result<XcsEditor> {
        let mode = self.resolve_mode(mode.into());
        XcsEditor::open(self.clone(), mode)
    }

    /// Opens an internal-coordinate editor. `None` selects the configured
    /// default mode.
    pub fn edit_ics(&self, mode: impl Into<Option<EditMode>>) -> Result<IcsEditor> {
        let mode = self.resolve_mode(mode.into());
        IcsEditor::open(self.clone(), mode)
    }

    fn resolve_mode(&self, mode: Option<EditMode>) -> EditMode {
        mode.unwrap_or_else(|| self.store().config().default_edit_mode)
    }

    pub fn is_editing(&self) -> bool {
        self.store().is_editing()
    }

    // ---- queries ------------------------------------------------------------

    pub fn chains(&self) -> Vec<ChainHandle> {
        self.store()
            .chain_ids()
            .iter()
            .map(|&id| ChainHandle::new(self.clone(), id))
            .collect()
    }

    pub fn residues(&self) -> Vec<ResidueHandle> {
        self.store()
            .residue_ids()
            .into_iter()
            .map(|id| ResidueHandle::new(self.clone(), id))
            .collect()
    }

    /// All atoms in hierarchy order.
    pub fn atoms(&self) -> Vec<AtomHandle> {
        self.store()
            .atom_ids()
            .into_iter()
            .map(|id| AtomHandle::new(self.clone(), id))
            .collect()
    }

    pub fn bonds(&self) -> Vec<BondHandle> {
        self.store()
            .bond_ids()
            .iter()
            .map(|&id| BondHandle::new(self.clone(), id))
            .collect()
    }

    pub fn torsions(&self) -> Vec<TorsionHandle> {
        self.store()
            .torsion_ids()
            .iter()
            .map(|&id| TorsionHandle::new(self.clone(), id))
            .collect()
    }

    pub fn chain_count(&self) -> usize {
        self.store().chain_count()
    }

    pub fn residue_count(&self) -> usize {
        self.store().residue_count()
    }

    pub fn atom_count(&self) -> usize {
        self.store().atom_count()
    }

    pub fn bond_count(&self) -> usize {
        self.store().bond_count()
    }

    pub fn torsion_count(&self) -> usize {
        self.store().torsion_count()
    }

    pub fn find_chain(&self, name: &str) -> Option<ChainHandle> {
        let id = self.store().find_chain(name)?;
        Some(ChainHandle::new(self.clone(), id))
    }

    pub fn find_residue(&self, chain_name: &str, number: impl Into<ResNum>) -> Option<ResidueHandle> {
        let id = {
            let store = self.store();
            let chain = store.find_chain(chain_name)?;
            store.find_residue(chain, number.into()).ok()??
        };
        Some(ResidueHandle::new(self.clone(), id))
    }

    pub fn find_atom(
        &self,
        chain_name: &str,
        number: impl Into<ResNum>,
        atom_name: &str,
    ) -> Option<AtomHandle> {
        let id = self.store().find_atom(chain_name, number.into(), atom_name)?;
        Some(AtomHandle::new(self.clone(), id))
    }

    pub fn find_torsion(&self, name: &str) -> Option<TorsionHandle> {
        let id = self.store().find_torsion(name)?;
        Some(TorsionHandle::new(self.clone(), id))
    }

    /// Atoms within `radius` of `point`, in no particular order.
    ///
    /// While a buffered editor is open, changes to the global transform are
    /// not yet reflected.
    pub fn find_within(&self, point: &Point3<f64>, radius: f64) -> Vec<AtomHandle> {
        self.store()
            .find_within(point, radius)
            .into_iter()
            .map(|id| AtomHandle::new(self.clone(), id))
            .collect()
    }

    pub fn transform(&self) -> Matrix4<f64> {
        self.store().transform()
    }

    // ---- views --------------------------------------------------------------

    /// View containing every chain, residue, atom and bond of the entity.
    pub fn create_full_view(&self) -> EntityView {
        EntityView::full(self.clone())
    }

    pub fn create_empty_view(&self) -> EntityView {
        EntityView::new(self.clone())
    }
}

impl RecordHandle for EntityHandle {
    fn entity(&self) -> &EntityHandle {
        self
    }

    fn record(&self) -> RecordRef {
        RecordRef::Entity
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EntityHandle {}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.store.try_borrow() {
            Ok(store) => f
                .debug_struct("EntityHandle")
                .field("chains", &store.chain_count())
                .field("residues", &store.residue_count())
                .field("atoms", &store.atom_count())
                .field("bonds", &store.bond_count())
                .finish(),
            Err(_) => f.write_str("EntityHandle(<borrowed>)"),
        }
    }
}
