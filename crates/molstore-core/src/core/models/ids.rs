use slotmap::new_key_type;

new_key_type! {
    pub struct AtomId;
    pub struct ResidueId;
    pub struct ChainId;
    pub struct BondId;
    pub struct TorsionId;
}

/// Identifies any record owned by an [`EntityStore`](super::entity::EntityStore),
/// including the entity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Entity,
    Chain(ChainId),
    Residue(ResidueId),
    Atom(AtomId),
    Bond(BondId),
    Torsion(TorsionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Entity,
    Chain,
    Residue,
    Atom,
    Bond,
    Torsion,
}

impl RecordRef {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordRef::Entity => RecordKind::Entity,
            RecordRef::Chain(_) => RecordKind::Chain,
            RecordRef::Residue(_) => RecordKind::Residue,
            RecordRef::Atom(_) => RecordKind::Atom,
            RecordRef::Bond(_) => RecordKind::Bond,
            RecordRef::Torsion(_) => RecordKind::Torsion,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RecordKind::Entity => "entity",
                RecordKind::Chain => "chain",
                RecordKind::Residue => "residue",
                RecordKind::Atom => "atom",
                RecordKind::Bond => "bond",
                RecordKind::Torsion => "torsion",
            }
        )
    }
}
