//! # Core Models Module
//!
//! Record types of a molecular entity and the store that owns them.
//!
//! ## Overview
//!
//! An entity is a hierarchy of chains, residues and atoms, plus bonds and
//! named torsions between atoms. Every record lives in a slot map inside
//! [`entity::EntityStore`] and is addressed by a versioned id from [`ids`];
//! ids of deleted records never resolve again.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom record with original, transformed and alternate positions
//! - [`residue`] - Residue record and the `ResNum` residue number type
//! - [`chain`] - Chain record with its in-sequence flag
//! - [`topology`] - Bond and torsion records
//! - [`entity`] - The entity store: structural edits, transforms, lookups
//! - [`ids`] - Slot id types and the `RecordRef` record address
//!
//! ## Usage
//!
//! Outside this crate the store is reached through an
//! [`EntityHandle`](crate::handles::EntityHandle); structural changes go
//! through its editors.
//!
//! ```
//! use molstore::prelude::*;
//!
//! # fn main() -> molstore::error::Result<()> {
//! let entity = create_entity();
//! let mut editor = entity.edit_xcs(EditMode::Buffered)?;
//! let chain = editor.create_chain("A");
//! let residue = editor.append_residue(&chain, "ALA", 1)?;
//! editor.insert_atom(&residue, "CA", Point3::origin(), AtomProp::with_element("C"))?;
//! editor.commit();
//! assert_eq!(entity.atom_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod atom;
pub mod chain;
pub mod entity;
pub mod ids;
pub mod residue;
pub mod topology;
