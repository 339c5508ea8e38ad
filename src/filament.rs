use afines_numerical::{bend_harmonic, Mat2x2, Vec2};
use afines_montecarlo::RateEvent;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, StandardNormal};

use crate::bead::Bead;
use crate::simbox::SimBox;
use crate::spring::Spring;

/// Parameters shared by every spring/bead of one filament; bundled so growth
/// and fracture can stamp out new filaments/springs without threading a dozen
/// arguments through every call.
#[derive(Clone, Copy, Debug)]
pub struct FilamentParams {
    pub kl: f64,
    pub max_ext_ratio: f64,
    pub fene: bool,
    pub kb: f64,
    pub dt: f64,
    pub temperature: f64,
    pub frac_force: f64,
    pub kgrow: f64,
    pub lgrow: f64,
    pub l0_min: f64,
    pub l0_max: f64,
    pub max_springs: usize,
    pub spring_rest_len: f64,
    pub bead_length: f64,
    pub viscosity: f64,
}

/// The outcome of a growth attempt, reported so the owning ensemble can keep
/// motor `(fil_idx, spring_idx)` back-references coherent (§4.6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrowthEvent {
    /// `spring[0].l0` simply grew; no spring was inserted, nothing to renumber.
    ExtendedRestLength,
    /// A bead/spring was inserted at the filament's (-)-end. `split_at` is the
    /// arc length (measured from the old bead 0) at which the old spring 0 was
    /// divided: a motor head bound to the old spring 0 at arc length `x` now
    /// belongs to the new spring 0 if `x <= split_at`, or to the new spring 1
    /// at offset `x - split_at` otherwise. Every other spring's index shifted
    /// up by one and must be reassigned per §4.6.
    InsertedBead { split_at: f64 },
}

/// An ordered chain of beads and the springs connecting them, with a harmonic
/// bending penalty along the chain.
#[derive(Clone, Debug)]
pub struct Filament {
    beads: Vec<Bead>,
    springs: Vec<Spring>,
    params: FilamentParams,
    /// Stokes drag of this filament's beads (they all share one radius/viscosity,
    /// so one scalar damp suffices, matching the reference implementation).
    damp: f64,
    bd_prefactor: f64,
    prev_rnd: Vec<Vec2>,
    pe_stretch: f64,
    pe_bend: f64,
    vir_stretch: Mat2x2,
    vir_bend: Mat2x2,
    ke_vel: f64,
    ke_vir: f64,
}

impl Filament {
    /// Builds a filament from explicit bead positions, all springs at rest
    /// length `params.spring_rest_len`.
    pub fn new(bead_positions: Vec<Vec2>, params: FilamentParams) -> Filament {
        let beads: Vec<Bead> = bead_positions
            .iter()
            .map(|&p| Bead::new(p, params.bead_length, params.viscosity))
            .collect();
        let damp = beads.first().map(|b| b.drag()).unwrap_or(1.0);
        let bd_prefactor = (params.temperature / (2.0 * params.dt * damp)).sqrt();

        let mut springs = Vec::with_capacity(beads.len().saturating_sub(1));
        for i in 0..beads.len().saturating_sub(1) {
            springs.push(Spring::new(i, params.spring_rest_len, params.kl, params.max_ext_ratio, params.fene));
        }

        Filament {
            prev_rnd: vec![Vec2::ZERO; beads.len()],
            beads,
            springs,
            params,
            damp,
            bd_prefactor,
            pe_stretch: 0.0,
            pe_bend: 0.0,
            vir_stretch: Mat2x2::ZERO,
            vir_bend: Mat2x2::ZERO,
            ke_vel: 0.0,
            ke_vir: 0.0,
        }
    }

    pub fn beads(&self) -> &[Bead] {
        &self.beads
    }

    pub fn beads_mut(&mut self) -> &mut [Bead] {
        &mut self.beads
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    pub fn springs_mut(&mut self) -> &mut [Spring] {
        &mut self.springs
    }

    pub fn params(&self) -> FilamentParams {
        self.params
    }

    pub fn pe_stretch(&self) -> f64 {
        self.pe_stretch
    }

    pub fn pe_bend(&self) -> f64 {
        self.pe_bend
    }

    pub fn vir_stretch(&self) -> Mat2x2 {
        self.vir_stretch
    }

    pub fn vir_bend(&self) -> Mat2x2 {
        self.vir_bend
    }

    pub fn ke_vel(&self) -> f64 {
        self.ke_vel
    }

    pub fn ke_vir(&self) -> f64 {
        self.ke_vir
    }

    pub fn zero_forces(&mut self) {
        for b in &mut self.beads {
            b.zero_force();
        }
    }

    /// Recomputes every spring's geometry and force, applies them to the two
    /// endpoint beads, and refreshes the cached `pe_stretch`/`vir_stretch`.
    pub fn update_stretching(&mut self, bx: &SimBox) {
        self.pe_stretch = 0.0;
        self.vir_stretch = Mat2x2::ZERO;
        for s in &mut self.springs {
            s.step(&self.beads, bx);
            s.update_force();
            s.filament_update(&mut self.beads);
            self.pe_stretch += s.stretching_energy();
            self.vir_stretch += s.virial();
        }
    }

    /// Evaluates the harmonic bending potential on every bead triplet and
    /// applies the resulting forces, per §4.4.
    pub fn update_bending(&mut self) {
        self.pe_bend = 0.0;
        self.vir_bend = Mat2x2::ZERO;
        if self.springs.len() < 2 {
            return;
        }
        for n in 0..self.springs.len() - 1 {
            let delr1 = self.springs[n].disp();
            let delr2 = self.springs[n + 1].disp();
            let result = bend_harmonic(self.params.kb, 0.0, delr1, delr2);

            self.beads[n].add_force(-result.force1);
            self.beads[n + 1].add_force(result.force1 - result.force2);
            self.beads[n + 2].add_force(result.force2);

            self.pe_bend += result.energy;
            self.vir_bend += delr1.outer(&result.force1) + delr2.outer(&result.force2);
        }
    }

    /// Advances every bead by one overdamped-Langevin step (§4.3) and then
    /// refreshes spring geometry.
    pub fn integrate(&mut self, bx: &SimBox, rng: &mut SmallRng) {
        self.ke_vel = 0.0;
        self.ke_vir = 0.0;
        let dt = self.params.dt;
        for i in 0..self.beads.len() {
            let new_rnd = Vec2::new(
                StandardNormal.sample(rng),
                StandardNormal.sample(rng),
            );
            let f = self.beads[i].force();
            let f_brn = (new_rnd + self.prev_rnd[i]) * (self.bd_prefactor * self.damp);
            let v = (f + f_brn) * (1.0 / self.damp);
            let pos = self.beads[i].pos();

            self.ke_vel += v.length_squared();
            self.ke_vir += -0.5 * (f + f_brn).dot(&pos);

            let new_pos = bx.pos(pos + v * dt);
            self.beads[i].set_pos(new_pos);
            self.beads[i].zero_force();
            self.prev_rnd[i] = new_rnd;
        }
        for s in &mut self.springs {
            s.step(&self.beads, bx);
        }
    }

    /// Attempts the per-step growth Monte Carlo event of §4.6. Returns `None`
    /// when the trial did not fire or the filament is already at `max_springs`.
    pub fn try_grow(&mut self, bx: &SimBox, rng: &mut SmallRng) -> Option<GrowthEvent> {
        if self.springs.len() >= self.params.max_springs {
            return None;
        }
        if !RateEvent::new(self.params.kgrow).fires(self.params.dt, rng) {
            return None;
        }

        let l0 = self.springs[0].l0();
        if l0 + self.params.lgrow < self.params.l0_max {
            self.springs[0].set_l0(l0 + self.params.lgrow);
            return Some(GrowthEvent::ExtendedRestLength);
        }

        let rest_len = self.params.spring_rest_len;
        let old_length = self.springs[0].length();
        let direction0 = self.springs[0].direction();
        let new_bead_pos = self.beads[1].pos() - direction0 * rest_len;
        let new_bead = Bead::new(new_bead_pos, self.params.bead_length, self.params.viscosity);

        self.beads.insert(1, new_bead);
        self.prev_rnd.insert(1, Vec2::ZERO);

        // shift every spring but 0 up by one bead slot; spring 0 keeps (0, 1)
        // and is reset below to span the old bead 0 to the new bead
        for s in &mut self.springs[1..] {
            let (i0, _) = s.bead_indices();
            s.set_bead_indices(i0 + 1);
        }

        self.springs[0].set_l0((self.springs[0].l0() - rest_len).max(self.params.l0_min));
        self.springs[0].step(&self.beads, bx);

        let mut new_spring1 = Spring::new(1, rest_len, self.params.kl, self.params.max_ext_ratio, self.params.fene);
        new_spring1.step(&self.beads, bx);
        self.springs.insert(1, new_spring1);

        let split_at = (old_length - rest_len).max(0.0);
        Some(GrowthEvent::InsertedBead { split_at })
    }

    /// Returns the index of the first spring whose force exceeds
    /// `frac_force`, if any (§4.5). Call only after `update_stretching`.
    pub fn first_overstretched_spring(&self) -> Option<usize> {
        self.springs.iter().position(|s| s.force().length() > self.params.frac_force)
    }

    /// Splits this filament at `node` in place: beads `[0..=node]` stay at
    /// `self`'s own index (so any absolute `fil_idx` motors hold into the
    /// owning ensemble's filament list stays valid), and beads `[node+1..]`
    /// become a freshly built fragment returned to the caller for the ensemble
    /// to push onto the end of its list. The caller must detach every motor
    /// bound to this filament's springs *before* calling `split_off` (§4.5):
    /// the springs beyond `node` are dropped here.
    pub fn split_off(&mut self, node: usize) -> Filament {
        let tail_positions: Vec<Vec2> = self.beads[node + 1..].iter().map(|b| b.pos()).collect();
        self.beads.truncate(node + 1);
        self.prev_rnd.truncate(node + 1);
        self.springs.truncate(node);

        Filament::new(tail_positions, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simbox::BoundaryCondition;

    fn params() -> FilamentParams {
        FilamentParams {
            kl: 10.0,
            max_ext_ratio: 1.5,
            fene: false,
            kb: 0.0,
            dt: 1e-4,
            temperature: 0.0,
            frac_force: 100.0,
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

    #[test]
    fn zero_kt_zero_rates_is_identity_map() {
        let mut f = Filament::new(vec![Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0)], params());
        let bx = SimBox::new(BoundaryCondition::Periodic, 10.0, 10.0);
        let before: Vec<Vec2> = f.beads().iter().map(|b| b.pos()).collect();
        let mut rng = SmallRng_for_tests();
        f.zero_forces();
        f.update_stretching(&bx);
        f.update_bending();
        f.integrate(&bx, &mut rng);
        let after: Vec<Vec2> = f.beads().iter().map(|b| b.pos()).collect();
        for (b, a) in before.iter().zip(after.iter()) {
            assert!((a.x - b.x).abs() < 1e-12, "a={a:?} b={b:?}");
            assert!((a.y - b.y).abs() < 1e-12);
        }
    }

    #[test]
    fn two_bead_spring_relaxes_to_rest_length() {
        let mut p = params();
        p.dt = 1e-3;
        let mut f = Filament::new(vec![Vec2::new(-0.4, 0.0), Vec2::new(0.4, 0.0)], p);
        let bx = SimBox::new(BoundaryCondition::Periodic, 10.0, 10.0);
        let mut rng = SmallRng_for_tests();
        for _ in 0..10_000 {
            f.zero_forces();
            f.update_stretching(&bx);
            f.update_bending();
            f.integrate(&bx, &mut rng);
        }
        assert!((f.springs()[0].length() - 1.0).abs() < 1e-3);
        assert!(f.pe_stretch() < 1e-4);
    }

    #[test]
    fn split_preserves_bead_positions() {
        let mut f = Filament::new(
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)],
            params(),
        );
        let tail = f.split_off(0);
        assert_eq!(f.beads().len(), 1);
        assert_eq!(tail.beads().len(), 2);
        assert_eq!(tail.beads()[0].pos(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn growth_insertion_keeps_the_spring_chain_connected() {
        let mut p = params();
        p.kgrow = 1.0e6;
        p.lgrow = 0.1;
        p.l0_max = 1.0; // spring 0 already at rest length 1.0, so growth must insert a bead
        p.dt = 1.0;
        let mut f = Filament::new(
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)],
            p,
        );
        let bx = SimBox::new(BoundaryCondition::Periodic, 20.0, 20.0);
        f.update_stretching(&bx);
        let mut rng = SmallRng_for_tests();

        let event = f.try_grow(&bx, &mut rng);
        assert!(matches!(event, Some(GrowthEvent::InsertedBead { .. })), "expected a bead insertion, got {event:?}");

        assert_eq!(f.beads().len(), 4);
        assert_eq!(f.springs().len(), 3);
        for (i, s) in f.springs().iter().enumerate() {
            assert_eq!(s.bead_indices(), (i, i + 1), "spring {i} should connect beads {i} and {}", i + 1);
        }
    }

    #[allow(non_snake_case)]
    fn SmallRng_for_tests() -> SmallRng {
        use rand::SeedableRng;
        SmallRng::seed_from_u64(42)
    }
}
