//! # molstore
//!
//! An in-memory store for molecular entities (chains, residues, atoms, bonds
//! and named torsions) that keeps Cartesian coordinates and internal
//! coordinates consistent under incremental edits.
//!
//! ## Architectural Philosophy
//!
//! The library is layered so that every mutation flows through one narrow
//! path and every derived structure knows when it is stale.
//!
//! - **[`core`]: The Foundation.** Record types and the `EntityStore` that
//!   owns them, the generic property bag, the connector forest that derives
//!   internal coordinates from the bonded graph, and the spatial grid used
//!   for proximity queries.
//!
//! - **[`handles`] and [`views`]: The Read Side.** Handles are cheap,
//!   clonable references to single records that detect deletion. Views are
//!   ordered, independently owned selections of handles.
//!
//! - **[`editors`]: The Write Side.** Cartesian (`XcsEditor`) and
//!   internal-coordinate (`IcsEditor`) editors are the only way to change an
//!   entity. They recompute derived state either after every call or once on
//!   commit, and notify observers afterwards.
//!
//! Entities are single-threaded by construction: handles share the store
//! through `Rc`, so they are neither `Send` nor `Sync`.

pub mod config;
pub mod core;
pub mod editors;
pub mod error;
pub mod handles;
pub mod views;

/// The types needed for everyday use of the store.
pub mod prelude {
    pub use crate::config::{EntityConfig, EntityConfigBuilder, load_config};
    pub use crate::core::models::atom::AtomProp;
    pub use crate::core::models::chain::ChainType;
    pub use crate::core::models::residue::ResNum;
    pub use crate::core::models::topology::BondOrder;
    pub use crate::core::observer::EntityEvent;
    pub use crate::core::props::{GenericProp, GenericPropContainer};
    pub use crate::editors::{EditMode, EditorState, IcsEditor, XcsEditor};
    pub use crate::error::{Result, StoreError};
    pub use crate::handles::{
        AtomHandle, BondHandle, ChainHandle, EntityHandle, RecordHandle, ResidueHandle,
        TorsionHandle, create_entity, create_entity_with_config,
    };
    pub use crate::views::{AtomView, ChainView, EntityView, ResidueView, ViewAddFlags};
    pub use nalgebra::{Matrix4, Point3, Vector3};
}
