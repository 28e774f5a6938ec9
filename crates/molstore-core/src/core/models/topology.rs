use super::ids::AtomId;
use crate::core::props::PropBag;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::Aromatic => "aromatic",
        }
    }

    /// SMILES bond symbol.
    pub fn symbol(&self) -> char {
        match self {
            Self::Single => '-',
            Self::Double => '=',
            Self::Triple => '#',
            Self::Aromatic => ':',
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized bond order '{0}'")]
pub struct ParseBondOrderError(pub String);

/// Accepts names, digits and SMILES symbols, case-insensitively.
impl FromStr for BondOrder {
    type Err = ParseBondOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let order = match s.trim().to_ascii_lowercase().as_str() {
            "single" | "1" | "-" => Self::Single,
            "double" | "2" | "=" => Self::Double,
            "triple" | "3" | "#" => Self::Triple,
            "aromatic" | "ar" | ":" => Self::Aromatic,
            _ => return Err(ParseBondOrderError(s.to_string())),
        };
        Ok(order)
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An undirected bond. `first` and `second` keep the order given to
/// `connect`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub first: AtomId,
    pub second: AtomId,
    pub order: BondOrder,
    pub(crate) props: Option<PropBag>,
}

impl Bond {
    pub(crate) fn new(first: AtomId, second: AtomId, order: BondOrder) -> Self {
        Self {
            first,
            second,
            order,
            props: None,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.first == atom_id || self.second == atom_id
    }

    /// The partner of `atom_id`, or `None` if the atom is not in this bond.
    pub fn other(&self, atom_id: AtomId) -> Option<AtomId> {
        match atom_id {
            id if id == self.first => Some(self.second),
            id if id == self.second => Some(self.first),
            _ => None,
        }
    }

    pub fn props(&self) -> Option<&PropBag> {
        self.props.as_ref()
    }
}

/// A named dihedral over an ordered 4-tuple of atoms.
///
/// The atoms are not required to be bonded in sequence; editing the angle
/// through the internal-coordinate editor is only possible when they are.
#[derive(Debug, Clone, PartialEq)]
pub struct Torsion {
    pub name: String,
    pub atoms: [AtomId; 4],
    pub(crate) props: Option<PropBag>,
}

impl Torsion {
    pub(crate) fn new(name: &str, atoms: [AtomId; 4]) -> Self {
        Self {
            name: name.to_string(),
            atoms,
            props: None,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atoms.contains(&atom_id)
    }

    pub fn props(&self) -> Option<&PropBag> {
        self.props.as_ref()
    }
}
