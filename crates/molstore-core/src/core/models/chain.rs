use super::ids::ResidueId;
use crate::core::props::PropBag;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Broad classification of a chain's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainType {
    Protein,
    Dna,
    Rna,
    Polysaccharide,
    Ligand,
    Water,
    #[default]
    Other,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protein => "protein",
            Self::Dna => "dna",
            Self::Rna => "rna",
            Self::Polysaccharide => "polysaccharide",
            Self::Ligand => "ligand",
            Self::Water => "water",
            Self::Other => "other",
        }
    }

    pub fn is_polymer(&self) -> bool {
        matches!(
            self,
            Self::Protein | Self::Dna | Self::Rna | Self::Polysaccharide
        )
    }
}

/// Unknown names map to [`ChainType::Other`], so parsing never fails.
impl FromStr for ChainType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "protein" | "peptide" => Self::Protein,
            "dna" => Self::Dna,
            "rna" => Self::Rna,
            "polysaccharide" | "saccharide" => Self::Polysaccharide,
            "ligand" => Self::Ligand,
            "water" | "solvent" => Self::Water,
            _ => Self::Other,
        })
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub name: String,
    pub chain_type: ChainType,
    pub(crate) residues: Vec<ResidueId>,
    pub(crate) in_sequence: bool,
    pub(crate) props: Option<PropBag>,
}

impl Chain {
    pub(crate) fn new(name: &str, chain_type: ChainType) -> Self {
        Self {
            name: name.to_string(),
            chain_type,
            residues: Vec::new(),
            in_sequence: true,
            props: None,
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    /// Whether residue numbers are non-decreasing in chain order, which
    /// enables binary search by residue number.
    pub fn in_sequence(&self) -> bool {
        self.in_sequence
    }

    pub fn props(&self) -> Option<&PropBag> {
        self.props.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_type_parsing_is_lenient() {
        assert_eq!("Protein".parse::<ChainType>(), Ok(ChainType::Protein));
        assert_eq!(" DNA ".parse::<ChainType>(), Ok(ChainType::Dna));
        assert_eq!("solvent".parse::<ChainType>(), Ok(ChainType::Water));
        assert_eq!("lipid".parse::<ChainType>(), Ok(ChainType::Other));
    }

    #[test]
    fn chain_type_names_parse_back() {
        for ty in [
            ChainType::Protein,
            ChainType::Dna,
            ChainType::Rna,
            ChainType::Polysaccharide,
            ChainType::Ligand,
            ChainType::Water,
            ChainType::Other,
        ] {
            assert_eq!(ty.to_string().parse::<ChainType>(), Ok(ty));
        }
        assert!(ChainType::Rna.is_polymer());
        assert!(!ChainType::Water.is_polymer());
    }

    #[test]
    fn new_chain_is_empty_and_in_sequence() {
        let chain = Chain::new("A", ChainType::Protein);
        assert_eq!(chain.name, "A");
        assert!(chain.residues().is_empty());
        assert!(chain.in_sequence());
        assert!(chain.props().is_none());
    }
}
