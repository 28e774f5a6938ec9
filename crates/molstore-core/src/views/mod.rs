//! # Views
//!
//! Ordered, possibly filtered and possibly duplicated selections of records.
//!
//! A view mirrors the chain → residue → atom hierarchy with its own
//! containers, so its order is whatever order records were added in and is
//! independent of the entity. Editing a view never touches the entity, and
//! deleting records from the entity never touches the view: stale entries
//! are skipped by every listing and count until [`EntityView::prune`]
//! drops them.
//!
//! All view types implement [`RecordHandle`](crate::handles::RecordHandle),
//! so generic properties read and written through a view land on the
//! underlying record.

pub mod atom;
pub mod chain;
pub mod entity;
pub mod residue;

pub use atom::AtomView;
pub use chain::ChainView;
pub use entity::EntityView;
pub use residue::ResidueView;

use bitflags::bitflags;

bitflags! {
    /// Options for adding records to a view.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ViewAddFlags: u32 {
        /// Return the existing entry instead of adding the record again.
        const CHECK_DUPLICATES = 0x1;
        /// Also add the children of the record (residues and atoms).
        const INCLUDE_ATOMS = 0x2;
    }
}
