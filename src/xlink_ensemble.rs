use afines_numerical::Mat2x2;
use rand::rngs::SmallRng;

use crate::filament::Filament;
use crate::motor::{Motor, MotorParams};
use crate::quadrants::Quadrants;
use crate::simbox::SimBox;

/// A population of crosslinking elements sharing one set of kinetic/mechanical
/// parameters: one `XlinkEnsemble` for active motors (`a_motor_*`), another
/// for passive crosslinkers (`p_motor_*`); the engine itself does not
/// distinguish the two beyond the parameters each ensemble was built with.
#[derive(Clone, Debug)]
pub struct XlinkEnsemble {
    motors: Vec<Motor>,
    params: MotorParams,
    pe_total: f64,
    virial_total: Mat2x2,
}

impl XlinkEnsemble {
    pub fn new(motors: Vec<Motor>, params: MotorParams) -> XlinkEnsemble {
        XlinkEnsemble { motors, params, pe_total: 0.0, virial_total: Mat2x2::ZERO }
    }

    pub fn motors(&self) -> &[Motor] {
        &self.motors
    }

    pub fn params(&self) -> MotorParams {
        self.params
    }

    pub fn pe_total(&self) -> f64 {
        self.pe_total
    }

    pub fn virial_total(&self) -> Mat2x2 {
        self.virial_total
    }

    /// Runs one state-machine step for every motor in the population and
    /// applies the resulting spring forces to the host filaments (§4.12 step 3).
    pub fn step(&mut self, filaments: &mut [Filament], quadrants: &Quadrants, bx: &SimBox, rng: &mut SmallRng) {
        self.pe_total = 0.0;
        self.virial_total = Mat2x2::ZERO;
        for motor in &mut self.motors {
            motor.step(filaments, quadrants, bx, rng);
            motor.apply_forces(filaments);

            let disp = motor.force();
            let kl = self.params.kl;
            if kl > 0.0 {
                self.pe_total += 0.5 * disp.length_squared() / kl;
            }
            self.virial_total += disp.outer(&disp);
        }
    }

    /// Detaches every head bound to `fil_idx`, returning heads to `Free` at
    /// their last attached position. Called before a filament is destroyed by
    /// fracture (§4.5).
    pub fn detach_from_filament(&mut self, filaments: &[Filament], fil_idx: usize) {
        for motor in &mut self.motors {
            for k in 0..2 {
                if let crate::motor::HeadState::Bound { fil_idx: bound_fil, .. } = motor.heads()[k] {
                    if bound_fil == fil_idx {
                        let pos = motor.head_pos(k, filaments);
                        motor.set_free(k, pos);
                    }
                }
            }
        }
    }

    /// Reassigns every motor head bound to `fil_idx` after a growth bead
    /// insertion split the old spring 0 into a new spring 0 and spring 1 at
    /// arc length `split_at` (§4.6): a head on the old spring 0 moves to the
    /// new spring 0 or 1 depending on which side of the split it fell on, and
    /// every head on a later spring simply shifts its `spring_idx` by one.
    pub fn remap_growth(&mut self, filaments: &mut [Filament], fil_idx: usize, split_at: f64) {
        for motor in &mut self.motors {
            for k in 0..2 {
                if let crate::motor::HeadState::Bound { fil_idx: bf, spring_idx, pos_on_spring } = motor.heads()[k] {
                    if bf != fil_idx {
                        continue;
                    }
                    if spring_idx == 0 {
                        if pos_on_spring > split_at {
                            filaments[fil_idx].springs_mut()[0].remove_motor(motor.id(), k as u8);
                            filaments[fil_idx].springs_mut()[1].add_motor(motor.id(), k as u8);
                            motor.relocate_head(k, fil_idx, 1, pos_on_spring - split_at);
                        }
                    } else {
                        motor.relocate_head(k, fil_idx, spring_idx + 1, pos_on_spring);
                    }
                }
            }
        }
    }

    pub fn bound_fraction(&self) -> f64 {
        if self.motors.is_empty() {
            return 0.0;
        }
        let bound_heads: usize = self.motors.iter().map(|m| (m.is_bound(0) as usize) + (m.is_bound(1) as usize)).sum();
        bound_heads as f64 / (2.0 * self.motors.len() as f64)
    }
}
