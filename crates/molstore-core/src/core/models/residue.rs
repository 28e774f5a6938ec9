use super::ids::{AtomId, ChainId};
use crate::core::props::PropBag;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A residue number with an optional PDB insertion code.
///
/// Ordering is by number first, then by insertion code, with the plain
/// number sorting before any of its insertion variants (`12 < 12A < 12B < 13`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResNum {
    pub num: i32,
    pub ins_code: Option<char>,
}

impl ResNum {
    pub fn new(num: i32) -> Self {
        Self {
            num,
            ins_code: None,
        }
    }

    pub fn with_ins_code(num: i32, ins_code: char) -> Self {
        Self {
            num,
            ins_code: Some(ins_code),
        }
    }
}

impl From<i32> for ResNum {
    fn from(num: i32) -> Self {
        Self::new(num)
    }
}

impl Ord for ResNum {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num
            .cmp(&other.num)
            .then_with(|| self.ins_code.cmp(&other.ins_code))
    }
}

impl PartialOrd for ResNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ResNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ins_code {
            Some(code) => write!(f, "{}{}", self.num, code),
            None => write!(f, "{}", self.num),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid residue number string '{0}'")]
pub struct ParseResNumError(pub String);

impl FromStr for ResNum {
    type Err = ParseResNumError;

    /// Parses "12", "-3" or "12A" style residue numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseResNumError(s.to_string());
        let (digits, ins_code) = match trimmed.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => (&trimmed[..trimmed.len() - 1], Some(c)),
            Some(_) => (trimmed, None),
            None => return Err(err()),
        };
        let num = digits.parse::<i32>().map_err(|_| err())?;
        Ok(Self { num, ins_code })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub name: String,                  // Name of the residue (e.g., "ALA", "GLY")
    pub number: ResNum,                // Residue sequence number
    pub one_letter_code: char,         // '?' when unknown
    pub chain_id: ChainId,             // ID of the parent chain
    pub(crate) atoms: Vec<AtomId>,     // Atoms in insertion order
    pub(crate) props: Option<PropBag>, // Lazily allocated generic properties
}

impl Residue {
    pub(crate) fn new(number: ResNum, name: &str, chain_id: ChainId) -> Self {
        Self {
            name: name.to_string(),
            number,
            one_letter_code: '?',
            chain_id,
            atoms: Vec::new(),
            props: None,
        }
    }

    pub(crate) fn add_atom(&mut self, atom_id: AtomId) {
        self.atoms.push(atom_id);
    }

    pub(crate) fn remove_atom(&mut self, atom_id: AtomId) {
        self.atoms.retain(|&id| id != atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn props(&self) -> Option<&PropBag> {
        self.props.as_ref()
    }
}

/// Finds the position of `number` in an ordered list of residue-like items.
///
/// When `in_sequence` is set a binary search is tried first. A miss falls
/// back to a scan, since unresolvable entries or numbers changed after the
/// flag was computed can hide a live match from the binary search. `key`
/// returns `None` for entries that can no longer be resolved, which never
/// match.
pub(crate) fn find_by_number<T>(
    items: &[T],
    number: ResNum,
    in_sequence: bool,
    key: impl Fn(&T) -> Option<ResNum>,
) -> Option<usize> {
    if in_sequence {
        let idx = items.partition_point(|item| key(item).is_some_and(|n| n < number));
        if items.get(idx).is_some_and(|item| key(item) == Some(number)) {
            return Some(idx);
        }
    }
    items.iter().position(|item| key(item) == Some(number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    fn dummy_chain_id(n: u64) -> ChainId {
        ChainId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn new_residue_initializes_fields_correctly() {
        let chain_id = dummy_chain_id(1);
        let residue = Residue::new(ResNum::new(10), "GLY", chain_id);
        assert_eq!(residue.number, ResNum::new(10));
        assert_eq!(residue.name, "GLY");
        assert_eq!(residue.one_letter_code, '?');
        assert_eq!(residue.chain_id, chain_id);
        assert!(residue.atoms().is_empty());
        assert!(residue.props().is_none());
    }

    #[test]
    fn add_and_remove_atom_keep_insertion_order() {
        let mut residue = Residue::new(ResNum::new(5), "ALA", dummy_chain_id(2));
        let a = dummy_atom_id(1);
        let b = dummy_atom_id(2);
        let c = dummy_atom_id(3);
        residue.add_atom(a);
        residue.add_atom(b);
        residue.add_atom(c);
        residue.remove_atom(b);
        assert_eq!(residue.atoms(), &[a, c]);

        residue.remove_atom(dummy_atom_id(99));
        assert_eq!(residue.atoms(), &[a, c]);
    }

    #[test]
    fn resnum_orders_insertion_codes_after_plain_number() {
        let plain = ResNum::new(12);
        let a = ResNum::with_ins_code(12, 'A');
        let b = ResNum::with_ins_code(12, 'B');
        let next = ResNum::new(13);
        assert!(plain < a);
        assert!(a < b);
        assert!(b < next);
    }

    #[test]
    fn resnum_parses_and_displays() {
        assert_eq!("12".parse::<ResNum>().unwrap(), ResNum::new(12));
        assert_eq!("-3".parse::<ResNum>().unwrap(), ResNum::new(-3));
        assert_eq!(
            "27A".parse::<ResNum>().unwrap(),
            ResNum::with_ins_code(27, 'A')
        );
        assert!("".parse::<ResNum>().is_err());
        assert!("A".parse::<ResNum>().is_err());
        assert!("1.5".parse::<ResNum>().is_err());
        assert_eq!(ResNum::with_ins_code(27, 'A').to_string(), "27A");
        assert_eq!(ResNum::new(-3).to_string(), "-3");
    }

    #[test]
    fn find_by_number_uses_binary_or_linear_search() {
        let sorted = vec![ResNum::new(1), ResNum::new(2), ResNum::new(5), ResNum::new(9)];
        assert_eq!(find_by_number(&sorted, ResNum::new(5), true, |n| Some(*n)), Some(2));
        assert_eq!(find_by_number(&sorted, ResNum::new(4), true, |n| Some(*n)), None);
        assert_eq!(find_by_number(&sorted, ResNum::new(10), true, |n| Some(*n)), None);

        let unsorted = vec![ResNum::new(9), ResNum::new(1), ResNum::new(5)];
        assert_eq!(find_by_number(&unsorted, ResNum::new(5), false, |n| Some(*n)), Some(2));
        assert_eq!(find_by_number(&unsorted, ResNum::new(1), false, |n| Some(*n)), Some(1));
    }

    #[test]
    fn find_by_number_skips_unresolvable_entries() {
        let items = vec![Some(ResNum::new(1)), None, Some(ResNum::new(3))];
        assert_eq!(find_by_number(&items, ResNum::new(3), false, |n| *n), Some(2));
        assert_eq!(find_by_number(&items, ResNum::new(2), false, |n| *n), None);
    }

    #[test]
    fn binary_search_misses_fall_back_to_a_scan() {
        let with_gap = vec![Some(ResNum::new(1)), None, Some(ResNum::new(3))];
        assert_eq!(find_by_number(&with_gap, ResNum::new(3), true, |n| *n), Some(2));
        assert_eq!(find_by_number(&with_gap, ResNum::new(1), true, |n| *n), Some(0));

        let renumbered = vec![ResNum::new(10), ResNum::new(2), ResNum::new(3), ResNum::new(4)];
        assert_eq!(find_by_number(&renumbered, ResNum::new(10), true, |n| Some(*n)), Some(0));
        assert_eq!(find_by_number(&renumbered, ResNum::new(7), true, |n| Some(*n)), None);
    }
}
