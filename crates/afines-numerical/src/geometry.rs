use crate::vec2::Vec2;

/// The angle between two displacement vectors, clamped through `acos` to stay
/// well-defined when rounding pushes the cosine just outside `[-1, 1]`.
pub fn angle(delr1: &Vec2, delr2: &Vec2) -> f64 {
    let len1 = delr1.length();
    let len2 = delr2.length();
    if len1 == 0.0 || len2 == 0.0 {
        return 0.0;
    }
    let c = (delr1.dot(delr2) / (len1 * len2)).clamp(-1.0, 1.0);
    c.acos()
}

/// Result of evaluating a harmonic bending potential on a bead triplet: the
/// energy and the forces that act on the two outer springs' shared direction.
pub struct BendResult {
    pub energy: f64,
    pub force1: Vec2,
    pub force2: Vec2,
}

/// Harmonic bend potential `½ kb (θ - θ0)²` with analytic forces.
///
/// `delr1`, `delr2` are the displacement vectors of the two consecutive springs
/// of a filament triplet (bead n → n+1, bead n+1 → n+2). The forces are
/// returned along each spring's own direction; the caller distributes them to
/// the three beads per §4.4.
pub fn bend_harmonic(kb: f64, theta0: f64, delr1: Vec2, delr2: Vec2) -> BendResult {
    let len1 = delr1.length();
    let len2 = delr2.length();
    if len1 == 0.0 || len2 == 0.0 {
        return BendResult { energy: 0.0, force1: Vec2::ZERO, force2: Vec2::ZERO };
    }

    let theta = angle(&delr1, &delr2);
    let dtheta = theta - theta0;
    let energy = 0.5 * kb * dtheta * dtheta;

    // d(theta)/d(delr) via d(cos theta)/d(delr) and dtheta/dcos = -1/sin(theta)
    let sin_theta = theta.sin();
    let prefactor = if sin_theta.abs() < 1e-8 {
        // small-angle regularization: avoid dividing by ~0 near theta = 0 or pi
        0.0
    } else {
        -kb * dtheta / sin_theta
    };

    let cos_theta = (delr1.dot(&delr2) / (len1 * len2)).clamp(-1.0, 1.0);
    let d1 = delr2 * (1.0 / (len1 * len2)) - delr1 * (cos_theta / (len1 * len1));
    let d2 = delr1 * (1.0 / (len1 * len2)) - delr2 * (cos_theta / (len2 * len2));

    BendResult {
        energy,
        force1: d1 * prefactor,
        force2: d2 * prefactor,
    }
}
