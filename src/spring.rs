use std::collections::HashSet;

use afines_numerical::{Mat2x2, Vec2};

use crate::bead::Bead;
use crate::simbox::SimBox;

/// Identifies a motor within a `XlinkEnsemble`; opaque outside this crate.
pub type MotorId = u64;

/// Which of a motor's two heads an attachment entry refers to.
pub type Head = u8;

/// A harmonic (or Fraenkel-FENE) edge between two consecutive beads of one
/// filament.
///
/// A `Spring` is owned by its filament; it carries no back-pointer to it (the
/// filament already owns the spring, so a back-reference would be a cycle).
/// What a spring *does* carry is the non-owning set of motor heads currently
/// attached to it (§3, "Ownership rules").
#[derive(Clone, Debug)]
pub struct Spring {
    bead_indices: (usize, usize),
    l0: f64,
    kl: f64,
    /// absolute maximum extension (`max_ext_ratio · l0`); only meaningful when `fene` is set
    max_ext: f64,
    eps_ext: f64,
    fene: bool,
    disp: Vec2,
    length: f64,
    direction: Vec2,
    force: Vec2,
    motor_set: HashSet<(MotorId, Head)>,
}

impl Spring {
    pub fn new(bead_index: usize, l0: f64, kl: f64, max_ext_ratio: f64, fene: bool) -> Spring {
        let max_ext = max_ext_ratio * l0;
        Spring {
            bead_indices: (bead_index, bead_index + 1),
            l0,
            kl,
            max_ext,
            eps_ext: 0.01 * max_ext,
            fene,
            disp: Vec2::ZERO,
            length: l0,
            direction: Vec2::ZERO,
            force: Vec2::ZERO,
            motor_set: HashSet::new(),
        }
    }

    pub fn bead_indices(&self) -> (usize, usize) {
        self.bead_indices
    }

    pub fn set_bead_indices(&mut self, i0: usize) {
        self.bead_indices = (i0, i0 + 1);
    }

    pub fn l0(&self) -> f64 {
        self.l0
    }

    pub fn set_l0(&mut self, l0: f64) {
        self.l0 = l0;
        if self.fene {
            let ratio = self.max_ext / self.l0.max(f64::EPSILON);
            self.max_ext = ratio * l0;
            self.eps_ext = 0.01 * self.max_ext;
        }
    }

    pub fn kl(&self) -> f64 {
        self.kl
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn disp(&self) -> Vec2 {
        self.disp
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn motors(&self) -> &HashSet<(MotorId, Head)> {
        &self.motor_set
    }

    pub fn add_motor(&mut self, motor: MotorId, head: Head) {
        self.motor_set.insert((motor, head));
    }

    pub fn remove_motor(&mut self, motor: MotorId, head: Head) {
        self.motor_set.remove(&(motor, head));
    }

    /// Recomputes `disp`, `length` and `direction` from the current bead
    /// positions, using the box's minimum-image convention.
    pub fn step(&mut self, beads: &[Bead], bx: &SimBox) {
        let (i0, i1) = self.bead_indices;
        self.disp = bx.rij(beads[i1].pos() - beads[i0].pos());
        self.length = self.disp.length();
        self.direction = if self.length != 0.0 { self.disp * (1.0 / self.length) } else { Vec2::ZERO };
    }

    /// Recomputes `force` from the current geometry: harmonic or Fraenkel-FENE.
    pub fn update_force(&mut self) {
        let kf = if self.fene {
            let ext = (self.l0 - self.length).abs();
            let scaled_ext = if self.max_ext - ext > self.eps_ext {
                ext / self.max_ext
            } else {
                (self.max_ext - self.eps_ext) / self.max_ext
            };
            self.kl / (1.0 - scaled_ext * scaled_ext)
        } else {
            self.kl
        };
        self.force = self.direction * (kf * (self.length - self.l0));
    }

    /// Applies the spring force to its two endpoint beads (equal and opposite).
    pub fn filament_update(&self, beads: &mut [Bead]) {
        let (i0, i1) = self.bead_indices;
        beads[i0].add_force(self.force);
        beads[i1].add_force(-self.force);
    }

    /// The energy stored in this spring, `½·F²/kl` for the harmonic case (used
    /// for the `PE_stretch` invariant check; the FENE energy is not separately
    /// broken out since the engine defaults to the harmonic form for reporting).
    pub fn stretching_energy(&self) -> f64 {
        if self.kl == 0.0 {
            return 0.0;
        }
        0.5 * self.force.length_squared() / self.kl
    }

    /// `F ⊗ disp`, this spring's contribution to the stretching virial.
    pub fn virial(&self) -> Mat2x2 {
        self.force.outer(&self.disp)
    }

    /// The closest point on the segment `[h0, h1]` to `p`, together with the
    /// clamped arc-length parameter `t ∈ [0, 1]` used by motor attachment and
    /// excluded volume (`intpoint` in the original AFINES `spring` class).
    pub fn intpoint(&self, beads: &[Bead], p: Vec2) -> (Vec2, f64) {
        let (i0, _) = self.bead_indices;
        let h0 = beads[i0].pos();
        if self.length == 0.0 {
            return (h0, 0.0);
        }
        let t = ((p - h0).dot(&self.direction) / self.length).clamp(0.0, 1.0);
        (h0 + self.direction * (t * self.length), t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simbox::BoundaryCondition;

    fn two_beads(p0: Vec2, p1: Vec2) -> Vec<Bead> {
        vec![Bead::new(p0, 0.1, 1.0), Bead::new(p1, 0.1, 1.0)]
    }

    #[test]
    fn harmonic_force_at_rest_length_is_zero() {
        let beads = two_beads(Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0));
        let bx = SimBox::new(BoundaryCondition::Open, 10.0, 10.0);
        let mut s = Spring::new(0, 1.0, 10.0, 1.5, false);
        s.step(&beads, &bx);
        s.update_force();
        assert!(s.force().length() < 1e-12);
    }

    #[test]
    fn stretched_harmonic_spring_pulls_inward() {
        let beads = two_beads(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        let bx = SimBox::new(BoundaryCondition::Open, 10.0, 10.0);
        let mut s = Spring::new(0, 1.0, 10.0, 1.5, false);
        s.step(&beads, &bx);
        s.update_force();
        // stretched beyond l0: force on bead0 points away from bead1 in the AFINES
        // convention (force = kl*(len-l0)*direction, applied +on i0, -on i1)
        assert!(s.force().x > 0.0);
    }

    #[test]
    fn intpoint_clamps_to_segment() {
        let beads = two_beads(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        let bx = SimBox::new(BoundaryCondition::Open, 10.0, 10.0);
        let mut s = Spring::new(0, 1.0, 10.0, 1.5, false);
        s.step(&beads, &bx);
        let (p, t) = s.intpoint(&beads, Vec2::new(2.0, 1.0));
        assert_eq!(t, 1.0);
        assert_eq!(p, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn motor_set_roundtrips() {
        let mut s = Spring::new(0, 1.0, 10.0, 1.5, false);
        s.add_motor(7, 0);
        assert!(s.motors().contains(&(7, 0)));
        s.remove_motor(7, 0);
        assert!(s.motors().is_empty());
    }
}
