//! Spanning forest over the bonded graph and the internal-coordinate cache
//! derived from it.
//!
//! Every atom gets at most one *primary* connector to the neighbour that
//! discovered it during a breadth-first traversal. The primary chain
//! atom → parent → grandparent → great-grandparent defines the atom's bond
//! length, bond angle and torsion. Bonds that close rings are kept as
//! *secondary* connectors. The forest is rebuilt from scratch on every
//! topology change; the traversal order is fully determined by the atom
//! order and the bond insertion order, so rebuilding the same graph always
//! yields the same forest.

use super::models::ids::{AtomId, BondId};
use super::utils::geometry::{bond_angle, bond_length, dihedral_angle};
use nalgebra::Point3;
use slotmap::SecondaryMap;
use std::collections::VecDeque;

/// Cached internal coordinates of one atom along its primary chain.
///
/// Each value is `None` when the chain of primary connectors is too short
/// to define it (roots have no bond length, their children no angle, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InternalCoords {
    pub bond_length: Option<f64>,
    pub angle: Option<f64>,
    pub torsion: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectorForest {
    parent: SecondaryMap<AtomId, AtomId>,
    children: SecondaryMap<AtomId, Vec<AtomId>>,
    secondary: SecondaryMap<AtomId, Vec<AtomId>>,
    roots: Vec<AtomId>,
    coords: SecondaryMap<AtomId, InternalCoords>,
}

impl ConnectorForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the forest by breadth-first traversal.
    ///
    /// `atom_order` determines which atoms become roots; each atom's bonds are
    /// followed in the order they appear in `adjacency`. The first edge that
    /// reaches an atom becomes its primary connector.
    pub fn build(
        atom_order: &[AtomId],
        adjacency: &SecondaryMap<AtomId, Vec<(AtomId, BondId)>>,
    ) -> Self {
        let mut forest = Self::new();
        for &atom in atom_order {
            forest.children.insert(atom, Vec::new());
            forest.secondary.insert(atom, Vec::new());
        }

        let mut visited: SecondaryMap<AtomId, ()> = SecondaryMap::new();
        let mut queue = VecDeque::new();

        for &root in atom_order {
            if visited.contains_key(root) {
                continue;
            }
            visited.insert(root, ());
            forest.roots.push(root);
            queue.push_back(root);

            while let Some(atom) = queue.pop_front() {
                let Some(neighbors) = adjacency.get(atom) else {
                    continue;
                };
                for &(neighbor, _) in neighbors {
                    if !visited.contains_key(neighbor) {
                        visited.insert(neighbor, ());
                        forest.parent.insert(neighbor, atom);
                        if let Some(children) = forest.children.get_mut(atom) {
                            children.push(neighbor);
                        }
                        queue.push_back(neighbor);
                    } else if forest.parent.get(atom) != Some(&neighbor)
                        && forest.parent.get(neighbor) != Some(&atom)
                    {
                        forest.add_secondary(atom, neighbor);
                    }
                }
            }
        }
        forest
    }

    fn add_secondary(&mut self, a: AtomId, b: AtomId) {
        if let Some(list) = self.secondary.get_mut(a) {
            if list.contains(&b) {
                return;
            }
            list.push(b);
        }
        if let Some(list) = self.secondary.get_mut(b) {
            list.push(a);
        }
    }

    pub fn parent(&self, atom: AtomId) -> Option<AtomId> {
        self.parent.get(atom).copied()
    }

    pub fn children(&self, atom: AtomId) -> &[AtomId] {
        self.children.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn secondary(&self, atom: AtomId) -> &[AtomId] {
        self.secondary.get(atom).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[AtomId] {
        &self.roots
    }

    pub fn secondary_count(&self) -> usize {
        self.secondary.values().map(Vec::len).sum::<usize>() / 2
    }

    /// Whether `a` and `b` are joined by a primary or secondary connector.
    pub fn are_connected(&self, a: AtomId, b: AtomId) -> bool {
        self.parent(a) == Some(b) || self.parent(b) == Some(a) || self.secondary(a).contains(&b)
    }

    /// Returns `atom` followed by all of its descendants (depth-first).
    pub fn subtree(&self, atom: AtomId) -> Vec<AtomId> {
        let mut result = Vec::new();
        let mut stack = vec![atom];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    pub fn is_ancestor(&self, ancestor: AtomId, atom: AtomId) -> bool {
        let mut current = self.parent(atom);
        while let Some(a) = current {
            if a == ancestor {
                return true;
            }
            current = self.parent(a);
        }
        false
    }

    /// Recomputes the internal-coordinate cache from Cartesian positions.
    pub fn refresh_internal_coords(&mut self, position: impl Fn(AtomId) -> Option<Point3<f64>>) {
        let mut coords = SecondaryMap::with_capacity(self.children.len());
        for atom in self.children.keys() {
            coords.insert(atom, self.compute_internal_coords(atom, &position));
        }
        self.coords = coords;
    }

    fn compute_internal_coords(
        &self,
        atom: AtomId,
        position: &impl Fn(AtomId) -> Option<Point3<f64>>,
    ) -> InternalCoords {
        let p = self.parent(atom);
        let gp = p.and_then(|p| self.parent(p));
        let ggp = gp.and_then(|gp| self.parent(gp));

        let pos_d = position(atom);
        let pos_c = p.and_then(position);
        let pos_b = gp.and_then(position);
        let pos_a = ggp.and_then(position);

        InternalCoords {
            bond_length: pos_d.zip(pos_c).map(|(d, c)| bond_length(&c, &d)),
            angle: match (pos_b, pos_c, pos_d) {
                (Some(b), Some(c), Some(d)) => Some(bond_angle(&b, &c, &d)),
                _ => None,
            },
            torsion: match (pos_a, pos_b, pos_c, pos_d) {
                (Some(a), Some(b), Some(c), Some(d)) => Some(dihedral_angle(&a, &b, &c, &d)),
                _ => None,
            },
        }
    }

    pub fn internal_coords(&self, atom: AtomId) -> Option<InternalCoords> {
        self.coords.get(atom).copied()
    }
}
