use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use afines_numerical::Vec2;
use afines_montecarlo::RateEvent;

use crate::filament::Filament;
use crate::quadrants::Quadrants;
use crate::simbox::SimBox;
use crate::spring::MotorId;

/// Which filament segment (if any) a motor head is attached to, and where
/// along it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HeadState {
    Free { pos: Vec2 },
    Bound { fil_idx: usize, spring_idx: usize, pos_on_spring: f64 },
}

/// Kinetic and mechanical constants shared by every head of one motor. The
/// same struct models both active motors (myosin) and passive crosslinkers:
/// they differ only in the values plugged in here (§6, `a_motor_*`/`p_motor_*`).
#[derive(Clone, Copy, Debug)]
pub struct MotorParams {
    pub k_on: f64,
    pub k_off: f64,
    pub k_end: f64,
    /// unloaded walking speed; zero for a passive crosslinker
    pub v0: f64,
    pub f_stall: f64,
    pub kl: f64,
    pub rest_length: f64,
    pub viscosity: f64,
    pub head_length: f64,
    pub cutoff: f64,
    pub dt: f64,
    pub temperature: f64,
}

/// A two-headed crosslinking element: an active motor (myosin) or a passive
/// crosslinker, depending on `params`. Heads are independent state machines
/// that share one harmonic tether (§4.7).
#[derive(Clone, Debug)]
pub struct Motor {
    id: MotorId,
    heads: [HeadState; 2],
    params: MotorParams,
    force: Vec2,
}

impl Motor {
    pub fn new(id: MotorId, head0: Vec2, head1: Vec2, params: MotorParams) -> Motor {
        Motor {
            id,
            heads: [HeadState::Free { pos: head0 }, HeadState::Free { pos: head1 }],
            params,
            force: Vec2::ZERO,
        }
    }

    pub fn id(&self) -> MotorId {
        self.id
    }

    pub fn heads(&self) -> [HeadState; 2] {
        self.heads
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn is_bound(&self, k: usize) -> bool {
        matches!(self.heads[k], HeadState::Bound { .. })
    }

    /// Attaches head `k` directly to a known segment, bypassing the kinetic
    /// attach trial. Used when building an initial configuration that starts
    /// with motors already bound (e.g. read back from a restart file), where
    /// there is no step to run `try_attach` against.
    pub fn bind(&mut self, k: usize, filaments: &mut [Filament], fil_idx: usize, spring_idx: usize, pos_on_spring: f64) {
        filaments[fil_idx].springs_mut()[spring_idx].add_motor(self.id, k as u8);
        self.heads[k] = HeadState::Bound { fil_idx, spring_idx, pos_on_spring };
    }

    /// Forces head `k` to `Free` at `pos`, without touching any spring's
    /// `motor_set`. The caller (the owning filament's ensemble) is
    /// responsible for having already removed this head from its host
    /// spring, since a destroyed filament's springs no longer exist to update.
    pub fn set_free(&mut self, k: usize, pos: Vec2) {
        self.heads[k] = HeadState::Free { pos };
    }

    /// Overwrites head `k`'s `Bound` state directly, without touching any
    /// spring's `motor_set`. Used after a filament growth insertion shifts
    /// every spring past the new bead up by one index: the head's physical
    /// host spring is unchanged, only its numbering moved, so no
    /// `remove_motor`/`add_motor` bookkeeping is needed (the caller handles
    /// that separately for the one head whose host segment was split).
    pub(crate) fn relocate_head(&mut self, k: usize, fil_idx: usize, spring_idx: usize, pos_on_spring: f64) {
        self.heads[k] = HeadState::Bound { fil_idx, spring_idx, pos_on_spring };
    }

    pub fn head_pos(&self, k: usize, filaments: &[Filament]) -> Vec2 {
        match self.heads[k] {
            HeadState::Free { pos } => pos,
            HeadState::Bound { fil_idx, spring_idx, pos_on_spring } => {
                let s = &filaments[fil_idx].springs()[spring_idx];
                let (i0, _) = s.bead_indices();
                filaments[fil_idx].beads()[i0].pos() + s.direction() * pos_on_spring
            }
        }
    }

    /// Runs one state-machine step for both heads, then recomputes the
    /// motor's spring tension from the resulting head positions.
    pub fn step(&mut self, filaments: &mut [Filament], quadrants: &Quadrants, bx: &SimBox, rng: &mut SmallRng) {
        match (self.is_bound(0), self.is_bound(1)) {
            (false, false) => {
                self.try_attach(0, filaments, quadrants, bx, rng);
                self.try_attach(1, filaments, quadrants, bx, rng);
                self.diffuse_free(0, filaments, bx, rng);
                self.diffuse_free(1, filaments, bx, rng);
            }
            (true, false) => {
                self.try_attach(1, filaments, quadrants, bx, rng);
                if !self.is_bound(1) {
                    self.diffuse_free(1, filaments, bx, rng);
                }
                self.walk(0, filaments, bx, rng);
            }
            (false, true) => {
                self.try_attach(0, filaments, quadrants, bx, rng);
                if !self.is_bound(0) {
                    self.diffuse_free(0, filaments, bx, rng);
                }
                self.walk(1, filaments, bx, rng);
            }
            (true, true) => {
                self.walk(0, filaments, bx, rng);
                self.walk(1, filaments, bx, rng);
            }
        }

        let p0 = self.head_pos(0, filaments);
        let p1 = self.head_pos(1, filaments);
        let disp = bx.rij(p1 - p0);
        let length = disp.length();
        let direction = if length != 0.0 { disp * (1.0 / length) } else { Vec2::ZERO };
        self.force = direction * (self.params.kl * (length - self.params.rest_length));
    }

    /// Attempts to bind head `k` to the nearest eligible segment within
    /// `cutoff`, weighted uniformly among candidates (§4.7 Attach).
    fn try_attach(&mut self, k: usize, filaments: &[Filament], quadrants: &Quadrants, bx: &SimBox, rng: &mut SmallRng) {
        if self.is_bound(k) {
            return;
        }
        if !RateEvent::new(self.params.k_on).fires(self.params.dt, rng) {
            return;
        }
        let p = self.head_pos(k, filaments);
        let other_fil = match self.heads[1 - k] {
            HeadState::Bound { fil_idx, .. } => Some(fil_idx),
            HeadState::Free { .. } => None,
        };

        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for &(fil_idx, spring_idx) in &quadrants.nearby(p, bx) {
            if Some(fil_idx) == other_fil {
                continue;
            }
            let spring = &filaments[fil_idx].springs()[spring_idx];
            let (point, t) = spring.intpoint(filaments[fil_idx].beads(), p);
            let dist = bx.rij(point - p).length();
            if dist <= self.params.cutoff {
                candidates.push((fil_idx, spring_idx, t * spring.length()));
            }
        }

        if candidates.is_empty() {
            return;
        }
        let chosen = candidates[rng.gen_range(0..candidates.len())];
        self.heads[k] = HeadState::Bound { fil_idx: chosen.0, spring_idx: chosen.1, pos_on_spring: chosen.2 };
    }

    /// Advances a bound head along its filament, hopping to the next segment
    /// toward the (+)-end when it reaches the end of the current one, and
    /// detaching when there is no next segment (§4.7 Walk/Detach).
    fn walk(&mut self, k: usize, filaments: &mut [Filament], bx: &SimBox, rng: &mut SmallRng) {
        let (fil_idx, mut spring_idx, mut s) = match self.heads[k] {
            HeadState::Bound { fil_idx, spring_idx, pos_on_spring } => (fil_idx, spring_idx, pos_on_spring),
            HeadState::Free { .. } => return,
        };

        let spring_dir = filaments[fil_idx].springs()[spring_idx].direction();
        let f_parallel = self.force.dot(&spring_dir);
        let v_eff = self.params.v0 * (1.0 - f_parallel / self.params.f_stall).clamp(0.0, 1.0);
        s += v_eff * self.params.dt;

        let mut spring_len = filaments[fil_idx].springs()[spring_idx].length();
        while s > spring_len {
            if spring_idx + 1 >= filaments[fil_idx].springs().len() {
                // no further segment toward the (+)-end: detach at the end rate
                if RateEvent::new(self.params.k_end).fires(self.params.dt, rng) {
                    let pos = self.head_pos(k, filaments);
                    filaments[fil_idx].springs_mut()[spring_idx].remove_motor(self.id, k as u8);
                    self.heads[k] = HeadState::Free { pos };
                }
                return;
            }
            s -= spring_len;
            filaments[fil_idx].springs_mut()[spring_idx].remove_motor(self.id, k as u8);
            spring_idx += 1;
            filaments[fil_idx].springs_mut()[spring_idx].add_motor(self.id, k as u8);
            spring_len = filaments[fil_idx].springs()[spring_idx].length();
        }

        self.heads[k] = HeadState::Bound { fil_idx, spring_idx, pos_on_spring: s };

        if !RateEvent::new(self.params.k_off).fires(self.params.dt, rng) {
            return;
        }
        let pos = self.head_pos(k, filaments);
        filaments[fil_idx].springs_mut()[spring_idx].remove_motor(self.id, k as u8);
        self.heads[k] = HeadState::Free { pos };
    }

    /// Moves a free head by one overdamped-Langevin step, tethered harmonically
    /// to the opposite head (or undriven if both heads are free).
    fn diffuse_free(&mut self, k: usize, filaments: &[Filament], bx: &SimBox, rng: &mut SmallRng) {
        let pos = match self.heads[k] {
            HeadState::Free { pos } => pos,
            HeadState::Bound { .. } => return,
        };
        let drag = 4.0 * std::f64::consts::PI * self.params.viscosity * self.params.head_length;
        let bd_prefactor = (self.params.temperature / (2.0 * self.params.dt * drag)).sqrt();
        let rnd = Vec2::new(StandardNormal.sample(rng), StandardNormal.sample(rng));
        let f_brn = rnd * (bd_prefactor * drag);
        let v = (self.force * if k == 0 { 1.0 } else { -1.0 } + f_brn) * (1.0 / drag);
        let new_pos = bx.pos(pos + v * self.params.dt);
        self.heads[k] = HeadState::Free { pos: new_pos };
    }

    /// Distributes the motor's spring tension onto the endpoint beads of each
    /// bound head's host segment, by linear interpolation of `pos_on_spring`.
    pub fn apply_forces(&self, filaments: &mut [Filament]) {
        for k in 0..2 {
            if let HeadState::Bound { fil_idx, spring_idx, pos_on_spring } = self.heads[k] {
                let sign = if k == 0 { 1.0 } else { -1.0 };
                let f = self.force * sign;
                let spring_len = filaments[fil_idx].springs()[spring_idx].length().max(1e-12);
                let t = (pos_on_spring / spring_len).clamp(0.0, 1.0);
                let (i0, i1) = filaments[fil_idx].springs()[spring_idx].bead_indices();
                filaments[fil_idx].beads_mut()[i0].add_force(f * (1.0 - t));
                filaments[fil_idx].beads_mut()[i1].add_force(f * t);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filament::FilamentParams;
    use crate::simbox::BoundaryCondition;
    use rand::SeedableRng;

    fn fil_params() -> FilamentParams {
        FilamentParams {
            kl: 10.0,
            max_ext_ratio: 1.5,
            fene: false,
            kb: 0.0,
            dt: 1e-3,
            temperature: 0.0,
            frac_force: 1e6,
            kgrow: 0.0,
            lgrow: 0.0,
            l0_min: 0.1,
            l0_max: 2.0,
            max_springs: 10,
            spring_rest_len: 1.0,
            bead_length: 0.1,
            viscosity: 1e-3,
        }
    }

    fn motor_params() -> MotorParams {
        MotorParams {
            k_on: 0.0,
            k_off: 0.0,
            k_end: 0.0,
            v0: 1.0,
            f_stall: 10.0,
            kl: 1.0,
            rest_length: 0.1,
            viscosity: 1e-3,
            head_length: 0.02,
            cutoff: 0.1,
            dt: 1e-3,
            temperature: 0.0,
        }
    }

    #[test]
    fn bound_head_walks_toward_plus_end() {
        let mut filaments = vec![Filament::new(
            (0..6).map(|i| Vec2::new(i as f64, 0.0)).collect(),
            fil_params(),
        )];
        let bx = SimBox::new(BoundaryCondition::Periodic, 20.0, 20.0);
        filaments[0].update_stretching(&bx);

        let mut m = Motor::new(1, Vec2::new(2.5, 0.0), Vec2::new(2.5, 0.1), motor_params());
        m.heads[0] = HeadState::Bound { fil_idx: 0, spring_idx: 2, pos_on_spring: 0.5 };
        filaments[0].springs_mut()[2].add_motor(1, 0);

        let mut rng = SmallRng::seed_from_u64(3);
        let quadrants = Quadrants::new(1.0);
        for _ in 0..1000 {
            m.step(&mut filaments, &quadrants, &bx, &mut rng);
        }
        if let HeadState::Bound { pos_on_spring, spring_idx, .. } = m.heads()[0] {
            let total = spring_idx as f64 + pos_on_spring - 2.0;
            assert!(total > 0.5, "expected forward progress, got spring {spring_idx} s {pos_on_spring}");
        } else {
            panic!("head detached unexpectedly");
        }
    }
}
