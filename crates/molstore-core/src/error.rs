use thiserror::Error;

use crate::core::models::ids::RecordKind;
use crate::core::props::PropError;

/// Errors surfaced by handles, views and editors.
///
/// Geometric edits that cannot be evaluated (for example an angle whose atoms
/// are not bonded to the pivot) are not errors; editors report them as
/// `Ok(false)`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Invalid {kind} handle: the record was deleted or never existed")]
    InvalidHandle { kind: RecordKind },

    #[error("The {kind} handle belongs to a different entity")]
    ForeignHandle { kind: RecordKind },

    #[error("Property error: {0}")]
    Property(#[from] PropError),

    #[error("Atoms are already bonded")]
    DuplicateBond,

    #[error("An atom cannot be bonded to itself")]
    SelfBond,

    #[error("Another editor is already open on this entity")]
    EditorAlreadyOpen,

    #[error("Transform matrix is not invertible")]
    SingularTransform,

    #[error("The {kind} does not belong to the expected parent record")]
    HierarchyMismatch { kind: RecordKind },
}

pub type Result<T> = std::result::Result<T, StoreError>;
