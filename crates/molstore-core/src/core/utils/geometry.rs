use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};
use std::f64::consts::PI;

const DEGENERATE_EPSILON: f64 = 1e-12;

pub fn bond_length(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (b - a).norm()
}

/// Angle `a`–`pivot`–`b` in radians, in `[0, π]`.
pub fn bond_angle(a: &Point3<f64>, pivot: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - pivot).angle(&(b - pivot))
}

/// IUPAC dihedral angle of `a`–`b`–`c`–`d` in radians, in `(-π, π]`.
///
/// Positive angles correspond to a right-handed rotation of `d` about the
/// `b → c` axis. Collinear input yields `0.0`.
pub fn dihedral_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let b1 = b - a;
    let b2 = c - b;
    let b3 = d - c;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);

    let x = n1.dot(&n2);
    let y = b2.norm() * b1.dot(&n2);
    normalize_angle(y.atan2(x))
}

/// Wraps an angle into `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    } else if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Homogeneous rotation by `angle` radians about the line through `origin`
/// along `axis`. Returns `None` for a zero-length axis.
pub fn rotation_about_axis(
    origin: &Point3<f64>,
    axis: &Vector3<f64>,
    angle: f64,
) -> Option<Matrix4<f64>> {
    let axis = Unit::try_new(*axis, DEGENERATE_EPSILON)?;
    let rotation = Rotation3::from_axis_angle(&axis, angle);
    Some(
        Matrix4::new_translation(&origin.coords)
            * rotation.to_homogeneous()
            * Matrix4::new_translation(&-origin.coords),
    )
}

pub fn translation_along(direction: &Vector3<f64>, distance: f64) -> Option<Matrix4<f64>> {
    let direction = Unit::try_new(*direction, DEGENERATE_EPSILON)?;
    Some(Matrix4::new_translation(&(direction.into_inner() * distance)))
}

/// Returns some unit vector perpendicular to `v`, used when a bend axis is
/// undefined because the two arms are collinear.
pub fn any_perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let helper = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    (helper - v * (v.dot(&helper) / v.norm_squared().max(DEGENERATE_EPSILON))).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn dihedral_of_trans_configuration_is_pi() {
        let a = Point3::new(1.0, 0.0, -1.0);
        let b = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(0.0, 0.0, 1.0);
        let d = Point3::new(-1.0, 0.0, 2.0);
        assert!(approx(dihedral_angle(&a, &b, &c, &d).abs(), PI));
    }

    #[test]
    fn dihedral_sign_follows_right_hand_rule_about_b_to_c() {
        let a = Point3::new(1.0, 0.0, -1.0);
        let b = Point3::origin();
        let c = Point3::new(0.0, 0.0, 1.0);
        let d = Point3::new(0.0, 1.0, 2.0);
        assert!(approx(dihedral_angle(&a, &b, &c, &d), PI / 2.0));

        let d_neg = Point3::new(0.0, -1.0, 2.0);
        assert!(approx(dihedral_angle(&a, &b, &c, &d_neg), -PI / 2.0));
    }

    #[test]
    fn bond_angle_is_measured_at_pivot() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let pivot = Point3::origin();
        let b = Point3::new(0.0, 2.0, 0.0);
        assert!(approx(bond_angle(&a, &pivot, &b), PI / 2.0));
        assert!(approx(bond_length(&pivot, &b), 2.0));
    }

    #[test]
    fn normalize_angle_wraps_into_half_open_interval() {
        assert!(approx(normalize_angle(5.0 * PI / 2.0), PI / 2.0));
        assert!(approx(normalize_angle(-PI), PI));
        assert!(approx(normalize_angle(PI / 4.0 + 2.0 * PI), PI / 4.0));
        assert!(approx(normalize_angle(-3.0 * PI / 2.0), PI / 2.0));
    }

    #[test]
    fn rotation_about_axis_keeps_points_on_the_axis_fixed() {
        let origin = Point3::new(1.0, 1.0, 0.0);
        let m = rotation_about_axis(&origin, &Vector3::z(), PI / 2.0).unwrap();

        let on_axis = Point3::new(1.0, 1.0, 5.0);
        assert!((m.transform_point(&on_axis) - on_axis).norm() < TOLERANCE);

        let off_axis = Point3::new(2.0, 1.0, 0.0);
        let rotated = m.transform_point(&off_axis);
        assert!((rotated - Point3::new(1.0, 2.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn degenerate_axes_are_rejected() {
        assert!(rotation_about_axis(&Point3::origin(), &Vector3::zeros(), 1.0).is_none());
        assert!(translation_along(&Vector3::zeros(), 1.0).is_none());
    }

    #[test]
    fn translation_along_moves_by_distance() {
        let m = translation_along(&Vector3::new(0.0, 3.0, 0.0), 0.5).unwrap();
        let moved = m.transform_point(&Point3::origin());
        assert!((moved - Point3::new(0.0, 0.5, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn any_perpendicular_is_orthogonal_unit_vector() {
        for v in [Vector3::x(), Vector3::new(0.3, -2.0, 1.0), Vector3::z()] {
            let p = any_perpendicular(&v);
            assert!(approx(p.norm(), 1.0));
            assert!(p.dot(&v).abs() < TOLERANCE);
        }
    }
}
