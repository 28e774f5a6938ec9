use super::ids::ResidueId;
use crate::core::props::PropBag;
use nalgebra::Point3;
use std::collections::BTreeMap;

/// Per-atom crystallographic and chemical attributes.
///
/// These are the fields every structure importer fills in; anything
/// format-specific belongs in the atom's generic property bag instead.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomProp {
    /// Chemical element symbol (e.g. "C", "N", "FE").
    pub element: String,
    /// Crystallographic occupancy, 1.0 for fully occupied sites.
    pub occupancy: f64,
    /// Isotropic temperature factor in Å².
    pub b_factor: f64,
    /// Formal or partial charge in elementary charge units.
    pub charge: f64,
    /// Whether the atom was read from a HETATM record.
    pub is_hetatm: bool,
}

impl Default for AtomProp {
    fn default() -> Self {
        Self {
            element: String::new(),
            occupancy: 1.0,
            b_factor: 0.0,
            charge: 0.0,
            is_hetatm: false,
        }
    }
}

impl AtomProp {
    pub fn with_element(element: &str) -> Self {
        Self {
            element: element.to_string(),
            ..Self::default()
        }
    }
}

/// An atom record owned by the entity store.
///
/// The store keeps two positions per atom: `original_position` is the
/// untransformed coordinate, `position` is the same coordinate with the
/// entity's global transform applied. The store is responsible for keeping
/// `position == transform * original_position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "N", "O").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    pub prop: AtomProp,
    pub(crate) original_position: Point3<f64>,
    pub(crate) position: Point3<f64>,
    /// Alternate locations keyed by group name, stored untransformed.
    pub(crate) alt_positions: BTreeMap<String, Point3<f64>>,
    /// Group whose coordinates are currently loaded into `original_position`.
    pub(crate) active_alt: Option<String>,
    pub(crate) props: Option<PropBag>,
}

impl Atom {
    pub(crate) fn new(
        name: &str,
        residue_id: ResidueId,
        original_position: Point3<f64>,
        position: Point3<f64>,
        prop: AtomProp,
    ) -> Self {
        Self {
            name: name.to_string(),
            residue_id,
            prop,
            original_position,
            position,
            alt_positions: BTreeMap::new(),
            active_alt: None,
            props: None,
        }
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn original_position(&self) -> Point3<f64> {
        self.original_position
    }

    pub fn alt_groups(&self) -> impl Iterator<Item = &str> {
        self.alt_positions.keys().map(String::as_str)
    }

    pub fn alt_position(&self, group: &str) -> Option<Point3<f64>> {
        self.alt_positions.get(group).copied()
    }

    pub fn active_alt_group(&self) -> Option<&str> {
        self.active_alt.as_deref()
    }

    pub fn props(&self) -> Option<&PropBag> {
        self.props.as_ref()
    }
}
