use afines_numerical::Vec2;

use crate::filament::Filament;

/// An external force field acting on every bead, independent of the network's
/// own internal interactions (§4.10).
#[derive(Clone, Copy, Debug)]
pub enum ExternalForce {
    None,
    /// A repulsive wall at the origin: beads inside radius `r` feel no force;
    /// beads outside are pulled back with `F = -k·(1 - r/|pos|)·pos`.
    Circle { radius: f64, stiffness: f64 },
}

impl ExternalForce {
    pub fn apply(&self, filaments: &mut [Filament]) {
        match *self {
            ExternalForce::None => {}
            ExternalForce::Circle { radius, stiffness } => {
                for fil in filaments.iter_mut() {
                    for bead in fil.beads_mut() {
                        let pos = bead.pos();
                        let r = pos.length();
                        if r > radius && r > 0.0 {
                            let f = pos * (-stiffness * (1.0 - radius / r));
                            bead.add_force(f);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filament::FilamentParams;

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
    fn none_leaves_forces_untouched() {
        let mut filaments = vec![Filament::new(vec![Vec2::new(5.0, 0.0), Vec2::new(6.0, 0.0)], params())];
        ExternalForce::None.apply(&mut filaments);
        assert_eq!(filaments[0].beads()[0].force(), Vec2::ZERO);
    }

    #[test]
    fn circle_pulls_beads_outside_radius_inward() {
        let mut filaments = vec![Filament::new(vec![Vec2::new(5.0, 0.0), Vec2::new(6.0, 0.0)], params())];
        ExternalForce::Circle { radius: 2.0, stiffness: 1.0 }.apply(&mut filaments);
        assert!(filaments[0].beads()[0].force().x < 0.0);
    }

    #[test]
    fn circle_leaves_beads_inside_radius_unforced() {
        let mut filaments = vec![Filament::new(vec![Vec2::new(0.1, 0.0), Vec2::new(0.2, 0.0)], params())];
        ExternalForce::Circle { radius: 2.0, stiffness: 1.0 }.apply(&mut filaments);
        assert_eq!(filaments[0].beads()[0].force(), Vec2::ZERO);
    }
}
