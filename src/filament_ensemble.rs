use afines_numerical::Mat2x2;
use rand::rngs::SmallRng;

use crate::error::{AfinesError, Result};
use crate::excluded_volume::{update_excluded_volume, ExcludedVolumeParams};
use crate::external_force::ExternalForce;
use crate::filament::{Filament, GrowthEvent};
use crate::quadrants::Quadrants;
use crate::simbox::SimBox;
use crate::xlink_ensemble::XlinkEnsemble;

impl afines_sim::System for FilamentEnsemble {
    fn get_size(&self) -> usize {
        self.filaments.len()
    }
}

/// Aggregated energies and virials for one completed step, matching the
/// columns of `pe.txt`/`ke.txt` (§6).
#[derive(Clone, Copy, Debug, Default)]
pub struct StepReport {
    pub pe_stretch: f64,
    pub pe_bend: f64,
    pub pe_exv: f64,
    pub pe_motor: f64,
    pub pe_xlink: f64,
    pub ke_net: f64,
    pub vir_stretch: Mat2x2,
    pub vir_bend: Mat2x2,
    pub vir_exv: Mat2x2,
    pub vir_motor: Mat2x2,
    pub vir_xlink: Mat2x2,
    pub n_fractures: u32,
}

/// The full simulated network: filaments, the two crosslinking populations,
/// the spatial index and the shared box, advanced one time step at a time in
/// the authoritative order of §4.12.
#[derive(Clone)]
pub struct FilamentEnsemble {
    filaments: Vec<Filament>,
    motors: XlinkEnsemble,
    xlinks: XlinkEnsemble,
    quadrants: Quadrants,
    quad_update_period: u32,
    steps_since_quad_update: u32,
    check_dup_in_quad: bool,
    exv_params: ExcludedVolumeParams,
    external: ExternalForce,
    bx: SimBox,
    t: f64,
    dt: f64,
}

impl FilamentEnsemble {
    pub fn new(
        filaments: Vec<Filament>,
        motors: XlinkEnsemble,
        xlinks: XlinkEnsemble,
        quad_cell_size: f64,
        quad_update_period: u32,
        quad_off_flag: bool,
        check_dup_in_quad: bool,
        exv_params: ExcludedVolumeParams,
        external: ExternalForce,
        bx: SimBox,
        t0: f64,
        dt: f64,
    ) -> FilamentEnsemble {
        FilamentEnsemble {
            filaments,
            motors,
            xlinks,
            quadrants: if quad_off_flag { Quadrants::new_disabled() } else { Quadrants::new(quad_cell_size) },
            // a disabled grid's flat fallback list must track bead motion every
            // step, so force a period of 1 regardless of the configured value
            quad_update_period: if quad_off_flag { 1 } else { quad_update_period.max(1) },
            steps_since_quad_update: 0,
            check_dup_in_quad,
            exv_params,
            external,
            bx,
            t: t0,
            dt,
        }
    }

    /// Elapsed simulated time, advanced by `dt` at the end of every [`step`](Self::step).
    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn filaments(&self) -> &[Filament] {
        &self.filaments
    }

    pub fn motors(&self) -> &XlinkEnsemble {
        &self.motors
    }

    pub fn xlinks(&self) -> &XlinkEnsemble {
        &self.xlinks
    }

    pub fn simbox(&self) -> &SimBox {
        &self.bx
    }

    /// Rebuilds the quadrant grid if this step is due for one, returning
    /// whether a rebuild happened.
    fn rebuild_quadrants_if_due(&mut self) -> bool {
        let due = self.steps_since_quad_update == 0;
        if due {
            let positions: Vec<Vec<afines_numerical::Vec2>> =
                self.filaments.iter().map(|f| f.beads().iter().map(|b| b.pos()).collect()).collect();
            self.quadrants.rebuild(positions.iter().enumerate().map(|(i, p)| (i, p.as_slice())), &self.bx);
        }
        self.steps_since_quad_update = (self.steps_since_quad_update + 1) % self.quad_update_period;
        due
    }

    /// Advances the whole network by one time step, returning the aggregated
    /// energies/virials for this step (§4.12). Fails with `AfinesError::Invariant`
    /// if `check_dup_in_quad` is set and a just-rebuilt quadrant cell holds the
    /// same segment twice.
    pub fn step(&mut self, rng: &mut SmallRng) -> Result<StepReport> {
        let rebuilt = self.rebuild_quadrants_if_due();
        if rebuilt && self.check_dup_in_quad {
            if let Some((fil_idx, spring_idx)) = self.quadrants.find_duplicate() {
                return Err(AfinesError::Invariant {
                    t: self.t,
                    detail: format!("segment (fil {fil_idx}, spring {spring_idx}) registered twice in one quadrant cell"),
                });
            }
        }

        for f in &mut self.filaments {
            f.zero_forces();
            f.update_stretching(&self.bx);
            f.update_bending();
        }
        let exv = update_excluded_volume(&mut self.filaments, &self.quadrants, &self.bx, self.exv_params);
        self.external.apply(&mut self.filaments);

        self.motors.step(&mut self.filaments, &self.quadrants, &self.bx, rng);
        self.xlinks.step(&mut self.filaments, &self.quadrants, &self.bx, rng);

        let mut ke_net = 0.0;
        for f in &mut self.filaments {
            f.integrate(&self.bx, rng);
            ke_net += f.ke_vel();
        }

        let mut n_fractures = 0u32;
        let mut i = 0;
        while i < self.filaments.len() {
            if let Some(GrowthEvent::InsertedBead { split_at }) = self.filaments[i].try_grow(&self.bx, rng) {
                self.motors.remap_growth(&mut self.filaments, i, split_at);
                self.xlinks.remap_growth(&mut self.filaments, i, split_at);
                log::debug!("filament {i} grew a new bead");
            }
            if let Some(node) = self.filaments[i].first_overstretched_spring() {
                self.motors.detach_from_filament(&self.filaments, i);
                self.xlinks.detach_from_filament(&self.filaments, i);
                let tail = self.filaments[i].split_off(node);
                self.filaments.push(tail);
                n_fractures += 1;
                log::info!("filament fractured at node {node}, now {} filaments", self.filaments.len());
                continue;
            }
            i += 1;
        }

        self.t += self.dt;

        let mut pe_stretch = 0.0;
        let mut pe_bend = 0.0;
        let mut vir_stretch = Mat2x2::ZERO;
        let mut vir_bend = Mat2x2::ZERO;
        for f in &self.filaments {
            pe_stretch += f.pe_stretch();
            pe_bend += f.pe_bend();
            vir_stretch += f.vir_stretch();
            vir_bend += f.vir_bend();
        }

        Ok(StepReport {
            pe_stretch,
            pe_bend,
            pe_exv: exv.pe_exv,
            pe_motor: self.motors.pe_total(),
            pe_xlink: self.xlinks.pe_total(),
            ke_net,
            vir_stretch,
            vir_bend,
            vir_exv: exv.virial,
            vir_motor: self.motors.virial_total(),
            vir_xlink: self.xlinks.virial_total(),
            n_fractures,
        })
    }

    /// Drains every bead's current position, grouped by filament: the shape
    /// `io::writers` needs to emit one `actins.txt` frame.
    pub fn bead_snapshot(&self) -> Vec<Vec<(afines_numerical::Vec2, f64)>> {
        self.filaments
            .iter()
            .map(|f| f.beads().iter().map(|b| (b.pos(), b.length())).collect())
            .collect()
    }

    /// Applies a shear strain increment to the box and affinely shifts every
    /// bead's x-coordinate by `d_gamma · y` (§4.11).
    pub fn apply_shear(&mut self, d_gamma: f64) {
        self.bx.update_d_strain(d_gamma);
        for f in &mut self.filaments {
            for b in f.beads_mut() {
                let pos = b.pos();
                b.set_pos(afines_numerical::Vec2::new(pos.x + d_gamma * pos.y, pos.y));
            }
        }
    }
}
