use afines_numerical::{Mat2x2, Vec2};

use crate::filament::Filament;
use crate::quadrants::Quadrants;
use crate::simbox::SimBox;

/// Parameters of the soft, shifted-truncated harmonic repulsion between beads
/// and nearby segments of other filaments (§4.9).
#[derive(Clone, Copy, Debug)]
pub struct ExcludedVolumeParams {
    pub rmax: f64,
    pub amplitude: f64,
}

/// Accumulated contribution of one `update` pass, reported alongside the
/// stretching/bending energies in the per-frame output (§6 `pe.txt`).
#[derive(Clone, Copy, Debug, Default)]
pub struct ExcludedVolumeResult {
    pub pe_exv: f64,
    pub virial: Mat2x2,
}

/// Applies pairwise bead/segment repulsion across `filaments`, using
/// `quadrants` to restrict the search to nearby segments instead of an O(N²)
/// scan, and returns the aggregated energy and virial.
///
/// A bead only repels segments of a *different* filament: springs adjacent to
/// a bead on its own filament are connected by a bonded spring already, so
/// excluding same-filament pairs avoids double-counting bonded interactions
/// as excluded volume (mirrors `PolymerRules::if_pair_excluded` in spirit).
pub fn update_excluded_volume(
    filaments: &mut [Filament],
    quadrants: &Quadrants,
    bx: &SimBox,
    params: ExcludedVolumeParams,
) -> ExcludedVolumeResult {
    let mut result = ExcludedVolumeResult::default();
    if params.amplitude == 0.0 || params.rmax <= 0.0 {
        return result;
    }

    let n_fil = filaments.len();
    for bead_fil in 0..n_fil {
        let n_beads = filaments[bead_fil].beads().len();
        for bead_idx in 0..n_beads {
            let p = filaments[bead_fil].beads()[bead_idx].pos();
            let candidates = quadrants.nearby(p, bx);

            let mut applied = Vec2::ZERO;
            for &(seg_fil, seg_idx) in &candidates {
                if seg_fil == bead_fil {
                    continue;
                }
                let spring = &filaments[seg_fil].springs()[seg_idx];
                let (point, t) = spring.intpoint(filaments[seg_fil].beads(), p);
                let delta = bx.rij(p - point);
                let dist = delta.length();
                if dist >= params.rmax || dist == 0.0 {
                    continue;
                }

                let normal = delta * (1.0 / dist);
                let ext = params.rmax - dist;
                let magnitude = params.amplitude * ext;
                let f = normal * magnitude;

                applied += f;
                result.pe_exv += 0.5 * params.amplitude * ext * ext;
                result.virial += f.outer(&delta);

                let (i0, i1) = spring.bead_indices();
                let force_on_segment = -f;
                filaments[seg_fil].beads_mut()[i0].add_force(force_on_segment * (1.0 - t));
                filaments[seg_fil].beads_mut()[i1].add_force(force_on_segment * t);
            }
            filaments[bead_fil].beads_mut()[bead_idx].add_force(applied);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filament::FilamentParams;
    use crate::simbox::BoundaryCondition;

    fn params() -> FilamentParams {
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

    #[test]
    fn overlapping_filaments_repel() {
        let bx = SimBox::new(BoundaryCondition::Open, 20.0, 20.0);
        let mut f0 = Filament::new(vec![Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0)], params());
        let mut f1 = Filament::new(vec![Vec2::new(0.0, -0.01), Vec2::new(1.0, -0.01)], params());
        f0.update_stretching(&bx);
        f1.update_stretching(&bx);

        let mut quadrants = Quadrants::new(1.0);
        let pos0 = vec![Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0)];
        let pos1 = vec![Vec2::new(0.0, -0.01), Vec2::new(1.0, -0.01)];
        quadrants.rebuild(vec![(0usize, pos0.as_slice()), (1usize, pos1.as_slice())].into_iter(), &bx);

        let mut filaments = vec![f0, f1];
        let result = update_excluded_volume(&mut filaments, &quadrants, &bx, ExcludedVolumeParams { rmax: 0.05, amplitude: 1.0 });
        assert!(result.pe_exv > 0.0);
        assert!(filaments[0].beads()[0].force().y < 0.0);
    }

    #[test]
    fn zero_amplitude_is_a_no_op() {
        let bx = SimBox::new(BoundaryCondition::Open, 20.0, 20.0);
        let mut filaments = vec![Filament::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)], params())];
        let quadrants = Quadrants::new(1.0);
        let result = update_excluded_volume(&mut filaments, &quadrants, &bx, ExcludedVolumeParams { rmax: 1.0, amplitude: 0.0 });
        assert_eq!(result.pe_exv, 0.0);
    }
}
