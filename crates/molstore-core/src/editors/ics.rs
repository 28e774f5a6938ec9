//! Internal-coordinate editing.
//!
//! Every edit is realised as one rigid motion of a subtree of the connector
//! forest: a rotation about the central bond for torsions, about the angle
//! normal for bond angles, and a translation along the bond for lengths.
//! The motion is built as a single homogeneous matrix and applied once per
//! moving atom. An edit that cannot be expressed this way (unbonded atoms,
//! ring closures, degenerate axes) returns `false` and moves nothing.

use super::{EditMode, EditorCore, EditorState};
use crate::core::connectors::ConnectorForest;
use crate::core::models::ids::AtomId;
use crate::core::utils::geometry::{
    any_perpendicular, bond_angle, bond_length, normalize_angle, rotation_about_axis,
    translation_along,
};
use crate::error::Result;
use crate::handles::{AtomHandle, BondHandle, EntityHandle, TorsionHandle};
use std::f64::consts::PI;
use std::ops::{Deref, DerefMut};
use tracing::{debug, instrument, warn};

const DEGENERATE_AXIS: f64 = 1e-8;

/// Editor for bond lengths, bond angles and torsion angles.
pub struct IcsEditor {
    core: EditorCore,
}

/// Picks the atoms to rotate for a torsion edit and the direction of the
/// rotation about the `b → c` axis.
///
/// Candidates are `(root, required parent, sign)`. A `+` set rotates the
/// `d` side and must hold `d` but neither `a` nor `b`; a `-` set rotates
/// the `a` side and must hold `a` but neither `c` nor `d`.
fn torsion_moving_set(
    forest: &ConnectorForest,
    [a, b, c, d]: [AtomId; 4],
    update_others: bool,
) -> Option<(Vec<AtomId>, f64)> {
    let whole_side = [(c, b, 1.0), (b, c, -1.0)];
    let terminal = [(d, c, 1.0), (a, b, -1.0)];
    let candidates = if update_others {
        whole_side.to_vec()
    } else {
        terminal.into_iter().chain(whole_side).collect()
    };

    candidates.into_iter().find_map(|(root, pivot, sign)| {
        if forest.parent(root) != Some(pivot) {
            return None;
        }
        let set = forest.subtree(root);
        let valid = if sign > 0.0 {
            set.contains(&d) && !set.contains(&a) && !set.contains(&b)
        } else {
            set.contains(&a) && !set.contains(&c) && !set.contains(&d)
        };
        valid.then_some((set, sign))
    })
}

impl IcsEditor {
    pub(crate) fn open(entity: EntityHandle, mode: EditMode) -> Result<Self> {
        Ok(Self {
            core: EditorCore::open(entity, mode)?,
        })
    }

    /// Sets a named torsion to `angle` radians.
    ///
    /// With `update_others` false only the atoms beyond the terminal
    /// connector move, so other torsions around the same bond keep their
    /// values. With `update_others` true the whole side beyond the central
    /// bond rotates and every torsion around it shifts by the same amount.
    /// Neither setting holds sibling torsions fixed by compensating them.
    pub fn set_torsion_angle(
        &mut self,
        torsion: &TorsionHandle,
        angle: f64,
        update_others: bool,
    ) -> Result<bool> {
        let atoms = self.torsion_atoms(torsion)?;
        self.rotate_dihedral(atoms, |current| angle - current, update_others)
    }

    /// Rotates a named torsion by `delta` radians.
    pub fn rotate_torsion_angle(
        &mut self,
        torsion: &TorsionHandle,
        delta: f64,
        update_others: bool,
    ) -> Result<bool> {
        let atoms = self.torsion_atoms(torsion)?;
        self.rotate_dihedral(atoms, |_| delta, update_others)
    }

    /// Sets the dihedral `a-b-c-d` without a named torsion.
    pub fn set_dihedral_angle(
        &mut self,
        a: &AtomHandle,
        b: &AtomHandle,
        c: &AtomHandle,
        d: &AtomHandle,
        angle: f64,
        update_others: bool,
    ) -> Result<bool> {
        for atom in [a, b, c, d] {
            self.core.check(atom)?;
        }
        self.rotate_dihedral(
            [a.id(), b.id(), c.id(), d.id()],
            |current| angle - current,
            update_others,
        )
    }

    fn torsion_atoms(&self, torsion: &TorsionHandle) -> Result<[AtomId; 4]> {
        self.core.check(torsion)?;
        Ok(self.core.entity.store().torsion(torsion.id())?.atoms)
    }

    #[instrument(skip_all, fields(atoms = ?atoms, update_others))]
    fn rotate_dihedral(
        &mut self,
        atoms: [AtomId; 4],
        delta_for: impl FnOnce(f64) -> f64,
        update_others: bool,
    ) -> Result<bool> {
        let [a, b, c, d] = atoms;
        {
            let mut store = self.core.entity.store_mut();
            for id in atoms {
                store.atom(id)?;
            }
            if !(store.are_bonded(a, b) && store.are_bonded(b, c) && store.are_bonded(c, d)) {
                warn!("Torsion atoms are not bonded in sequence");
                return Ok(false);
            }

            store.ensure_connectors();
            let Some((moving, sign)) = torsion_moving_set(store.connectors(), atoms, update_others)
            else {
                warn!("No subtree can realise the torsion, likely a ring bond");
                return Ok(false);
            };

            let current = store.dihedral(atoms)?;
            let delta = normalize_angle(delta_for(current));
            let (pivot, far) = (store.position(b)?, store.position(c)?);
            let Some(m) = rotation_about_axis(&pivot, &(far - pivot), sign * delta) else {
                warn!("Central bond has zero length");
                return Ok(false);
            };

            store.transform_atoms(&moving, &m)?;
            debug!(moved = moving.len(), delta, "Rotated torsion");
        }
        self.core.edited();
        Ok(true)
    }

    /// Sets the angle `x-pivot-y` to `angle` radians, which must lie in
    /// `[0, π]`.
    ///
    /// Both atoms must be bonded to the pivot. The side hanging from the
    /// pivot through `y` moves if it can, otherwise the side through `x`.
    #[instrument(skip_all, fields(angle))]
    pub fn set_angle(
        &mut self,
        x: &AtomHandle,
        pivot: &AtomHandle,
        y: &AtomHandle,
        angle: f64,
    ) -> Result<bool> {
        for atom in [x, pivot, y] {
            self.core.check(atom)?;
        }
        let (x, p, y) = (x.id(), pivot.id(), y.id());
        {
            let mut store = self.core.entity.store_mut();
            for id in [x, p, y] {
                store.atom(id)?;
            }
            if !(0.0..=PI).contains(&angle) {
                warn!("Bond angle out of range");
                return Ok(false);
            }
            if x == y || !store.are_bonded(x, p) || !store.are_bonded(y, p) {
                warn!("Angle atoms are not both bonded to the pivot");
                return Ok(false);
            }

            store.ensure_connectors();
            let forest = store.connectors();
            let moving = if forest.parent(y) == Some(p) {
                Some((forest.subtree(y), 1.0)).filter(|(set, _)| !set.contains(&x))
            } else if forest.parent(x) == Some(p) {
                Some((forest.subtree(x), -1.0)).filter(|(set, _)| !set.contains(&y))
            } else {
                None
            };
            let Some((moving, sign)) = moving else {
                warn!("No subtree can realise the angle");
                return Ok(false);
            };

            let (px, pp, py) = (store.position(x)?, store.position(p)?, store.position(y)?);
            let (u, v) = (px - pp, py - pp);
            let mut axis = u.cross(&v);
            if axis.norm() < DEGENERATE_AXIS {
                axis = any_perpendicular(&v);
            }
            let delta = angle - bond_angle(&px, &pp, &py);
            let Some(m) = rotation_about_axis(&pp, &axis, sign * delta) else {
                return Ok(false);
            };

            store.transform_atoms(&moving, &m)?;
            debug!(moved = moving.len(), delta, "Bent angle");
        }
        self.core.edited();
        Ok(true)
    }

    /// Sets the length of a primary connector by sliding the downstream
    /// subtree along the bond.
    pub fn set_bond_length(&mut self, bond: &BondHandle, length: f64) -> Result<bool> {
        self.core.check(bond)?;
        {
            let mut store = self.core.entity.store_mut();
            let record = store.bond(bond.id())?;
            let (a, b) = (record.first, record.second);
            if !(length.is_finite() && length > 0.0) {
                warn!(length, "Bond length must be positive");
                return Ok(false);
            }

            store.ensure_connectors();
            let forest = store.connectors();
            let (anchor, tip) = if forest.parent(b) == Some(a) {
                (a, b)
            } else if forest.parent(a) == Some(b) {
                (b, a)
            } else {
                warn!("Bond is not a primary connector");
                return Ok(false);
            };
            let moving = forest.subtree(tip);

            let (from, to) = (store.position(anchor)?, store.position(tip)?);
            let Some(m) = translation_along(&(to - from), length - bond_length(&from, &to)) else {
                warn!("Bonded atoms coincide");
                return Ok(false);
            };

            store.transform_atoms(&moving, &m)?;
            debug!(moved = moving.len(), length, "Stretched bond");
        }
        self.core.edited();
        Ok(true)
    }

    /// Closes the editor, running any pending recomputation.
    pub fn commit(mut self) -> EditorState {
        self.core.finish()
    }
}

impl Deref for IcsEditor {
    type Target = EditorCore;

    fn deref(&self) -> &EditorCore {
        &self.core
    }
}

impl DerefMut for IcsEditor {
    fn deref_mut(&mut self) -> &mut EditorCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomProp;
    use crate::core::models::ids::RecordKind;
    use crate::error::StoreError;
    use crate::handles::create_entity;
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-9;

    fn same_angle(a: f64, b: f64) -> bool {
        normalize_angle(a - b).abs() < 1e-9
    }

    fn close(a: Point3<f64>, b: Point3<f64>) -> bool {
        (a - b).norm() < TOLERANCE
    }

    /// Inserts atoms in order and bonds them along `bonds`.
    fn build(
        positions: &[[f64; 3]],
        bonds: &[(usize, usize)],
    ) -> (EntityHandle, Vec<AtomHandle>) {
        let entity = create_entity();
        let mut ed = entity.edit_xcs(EditMode::Buffered).unwrap();
        let chain = ed.create_chain("A");
        let residue = ed.append_residue(&chain, "UNK", 1).unwrap();
        let atoms = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                ed.insert_atom(
                    &residue,
                    &format!("X{i}"),
                    Point3::new(p[0], p[1], p[2]),
                    AtomProp::with_element("C"),
                )
                .unwrap()
            })
            .collect::<Vec<_>>();
        for &(i, j) in bonds {
            ed.connect(&atoms[i], &atoms[j]).unwrap();
        }
        ed.commit();
        (entity, atoms)
    }

    fn trans_butane() -> (EntityHandle, Vec<AtomHandle>, TorsionHandle) {
        let (entity, atoms) = build(
            &[
                [-0.5, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.5, 0.0, 0.0],
                [2.0, -1.0, 0.0],
            ],
            &[(0, 1), (1, 2), (2, 3)],
        );
        let mut ed = entity.edit_xcs(EditMode::Unbuffered).unwrap();
        let torsion = ed
            .add_torsion("phi", &atoms[0], &atoms[1], &atoms[2], &atoms[3])
            .unwrap();
        ed.commit();
        (entity, atoms, torsion)
    }

    fn zigzag(n: usize) -> (EntityHandle, Vec<AtomHandle>) {
        let positions = (0..n)
            .map(|i| [1.5 * i as f64, (i % 2) as f64, 0.1 * (i / 2) as f64])
            .collect::<Vec<_>>();
        let bonds = (1..n).map(|i| (i - 1, i)).collect::<Vec<_>>();
        build(&positions, &bonds)
    }

    fn positions(atoms: &[AtomHandle]) -> Vec<Point3<f64>> {
        atoms.iter().map(|a| a.position().unwrap()).collect()
    }

    #[test]
    fn trans_to_cis_rotates_only_the_last_atom() {
        let (entity, atoms, torsion) = trans_butane();
        assert!(same_angle(torsion.angle().unwrap(), PI));
        let before = positions(&atoms);

        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        assert!(ed.set_torsion_angle(&torsion, 0.0, false).unwrap());
        assert!(same_angle(torsion.angle().unwrap(), 0.0));
        ed.commit();

        let after = positions(&atoms);
        assert_eq!(after[..3], before[..3]);
        assert!(close(after[3], Point3::new(2.0, 1.0, 0.0)));
        let ic = atoms[3].internal_coords().unwrap();
        assert!(same_angle(ic.torsion.unwrap(), 0.0));
    }

    #[test]
    fn set_torsion_angle_is_idempotent() {
        let (entity, _atoms, torsion) = trans_butane();
        let mut ed = entity.edit_ics(EditMode::Buffered).unwrap();
        for degrees in [-170.0_f64, -90.0, 0.0, 45.0, 120.0, 180.0] {
            let target = degrees.to_radians();
            assert!(ed.set_torsion_angle(&torsion, target, false).unwrap());
            assert!(same_angle(torsion.angle().unwrap(), target));
            assert!(ed.set_torsion_angle(&torsion, target, false).unwrap());
            assert!(same_angle(torsion.angle().unwrap(), target));
        }
    }

    #[test]
    fn rotate_torsion_angle_adds_to_the_current_value() {
        let (entity, _atoms, torsion) = trans_butane();
        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        assert!(ed.rotate_torsion_angle(&torsion, -PI / 2.0, false).unwrap());
        assert!(same_angle(torsion.angle().unwrap(), PI / 2.0));
    }

    #[test]
    fn independent_torsions_are_isolated() {
        let (entity, atoms) = zigzag(6);
        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        let upstream = ed
            .add_torsion("t2", &atoms[0], &atoms[1], &atoms[2], &atoms[3])
            .unwrap();
        let downstream = ed
            .add_torsion("t1", &atoms[2], &atoms[3], &atoms[4], &atoms[5])
            .unwrap();
        let before = upstream.angle().unwrap();

        assert!(ed.set_torsion_angle(&downstream, 1.0, false).unwrap());
        assert!(same_angle(downstream.angle().unwrap(), 1.0));
        assert!(same_angle(upstream.angle().unwrap(), before));
    }

    #[test]
    fn update_others_controls_sibling_torsions() {
        let layout = [
            [-0.5, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.5, 0.0, 0.0],
            [2.0, -1.0, 0.0],
            [2.0, 0.5, 0.866],
        ];
        let bonds = [(0, 1), (1, 2), (2, 3), (2, 4)];

        for update_others in [false, true] {
            let (entity, atoms) = build(&layout, &bonds);
            let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
            let t = ed
                .add_torsion("t", &atoms[0], &atoms[1], &atoms[2], &atoms[3])
                .unwrap();
            let sibling = ed
                .add_torsion("s", &atoms[0], &atoms[1], &atoms[2], &atoms[4])
                .unwrap();
            let sibling_before = sibling.angle().unwrap();
            let delta = 0.0 - t.angle().unwrap();

            assert!(ed.set_torsion_angle(&t, 0.0, update_others).unwrap());
            assert!(same_angle(t.angle().unwrap(), 0.0));
            let expected = if update_others {
                sibling_before + delta
            } else {
                sibling_before
            };
            assert!(same_angle(sibling.angle().unwrap(), expected));
        }
    }

    #[test]
    fn ring_torsions_are_rejected() {
        let (entity, atoms) = build(
            &[
                [0.0, 0.0, 0.0],
                [1.5, 0.0, 0.0],
                [1.5, 1.5, 0.0],
                [0.0, 1.5, 0.0],
            ],
            &[(0, 1), (1, 2), (2, 3), (3, 0)],
        );
        let before = positions(&atoms);
        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        for update_others in [false, true] {
            assert!(
                !ed.set_dihedral_angle(&atoms[0], &atoms[1], &atoms[2], &atoms[3], 1.0, update_others)
                    .unwrap()
            );
        }
        ed.commit();
        assert_eq!(positions(&atoms), before);
    }

    #[test]
    fn unbonded_torsions_are_rejected() {
        let (entity, atoms) = zigzag(4);
        let torsion = {
            let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
            ed.add_torsion("bad", &atoms[0], &atoms[2], &atoms[1], &atoms[3])
                .unwrap()
        };
        let before = positions(&atoms);
        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        assert!(!ed.set_torsion_angle(&torsion, 0.5, false).unwrap());
        assert_eq!(positions(&atoms), before);
        assert_eq!(ed.state(), EditorState::Idle);
    }

    #[test]
    fn set_angle_requires_bonds_to_the_pivot() {
        let (entity, atoms) = zigzag(4);
        let before = positions(&atoms);
        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();

        assert!(!ed.set_angle(&atoms[0], &atoms[1], &atoms[3], 1.5).unwrap());
        assert!(!ed.set_angle(&atoms[0], &atoms[1], &atoms[2], 4.0).unwrap());
        assert!(!ed.set_angle(&atoms[0], &atoms[1], &atoms[0], 1.0).unwrap());
        ed.commit();
        assert_eq!(positions(&atoms), before);
    }

    #[test]
    fn set_angle_moves_the_downstream_side() {
        let (entity, atoms) = zigzag(4);
        let target = 100.0_f64.to_radians();
        let length_before = (atoms[3].position().unwrap() - atoms[2].position().unwrap()).norm();

        let mut ed = entity.edit_ics(EditMode::Buffered).unwrap();
        assert!(ed.set_angle(&atoms[0], &atoms[1], &atoms[2], target).unwrap());
        ed.commit();

        let p = positions(&atoms);
        assert!((bond_angle(&p[0], &p[1], &p[2]) - target).abs() < TOLERANCE);
        assert!(close(p[0], Point3::new(0.0, 0.0, 0.0)));
        assert!(((p[3] - p[2]).norm() - length_before).abs() < TOLERANCE);

        let mut ed = entity.edit_ics(EditMode::Buffered).unwrap();
        assert!(ed.set_angle(&atoms[3], &atoms[2], &atoms[1], 1.2).unwrap());
        ed.commit();
        let q = positions(&atoms);
        assert!((bond_angle(&q[3], &q[2], &q[1]) - 1.2).abs() < TOLERANCE);
        assert_eq!(q[..3], p[..3]);
    }

    #[test]
    fn set_bond_length_slides_the_subtree() {
        let (entity, atoms) = zigzag(4);
        let bond = atoms[1].bond_to(&atoms[2]).unwrap().unwrap();
        let tail_before = (atoms[3].position().unwrap() - atoms[2].position().unwrap()).norm();

        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        assert!(ed.set_bond_length(&bond, 2.0).unwrap());
        assert!(!ed.set_bond_length(&bond, -1.0).unwrap());
        ed.commit();

        assert!((bond.length().unwrap() - 2.0).abs() < TOLERANCE);
        let tail_after = (atoms[3].position().unwrap() - atoms[2].position().unwrap()).norm();
        assert!((tail_after - tail_before).abs() < TOLERANCE);
        assert_eq!(atoms[0].position().unwrap(), Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn ring_closure_bonds_cannot_be_stretched() {
        let (entity, atoms) = build(
            &[[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [0.75, 1.3, 0.0]],
            &[(0, 1), (1, 2), (2, 0)],
        );
        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        let closure = atoms[1].bond_to(&atoms[2]).unwrap().unwrap();
        assert!(!ed.set_bond_length(&closure, 2.0).unwrap());
    }

    #[test]
    fn deleted_and_foreign_handles_are_errors() {
        let (entity, atoms, torsion) = trans_butane();
        let (_other, _, foreign) = trans_butane();

        let mut ed = entity.edit_ics(EditMode::Unbuffered).unwrap();
        assert_eq!(
            ed.set_torsion_angle(&foreign, 0.0, false).unwrap_err(),
            StoreError::ForeignHandle {
                kind: RecordKind::Torsion
            }
        );
        ed.delete_atom(&atoms[3]).unwrap();
        assert_eq!(
            ed.set_torsion_angle(&torsion, 0.0, false).unwrap_err(),
            StoreError::InvalidHandle {
                kind: RecordKind::Torsion
            }
        );
    }
}
