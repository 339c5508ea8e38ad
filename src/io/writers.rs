use std::any::Any;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use afines_sim::Observer;

use crate::error::AfinesError;
use crate::filament_ensemble::FilamentEnsemble;

fn buffered_writer(path: &Path) -> Result<BufWriter<File>, AfinesError> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes `actins.txt`: one header line then one `x y r fil_idx` line per bead.
pub struct ActinsWriter {
    out: BufWriter<File>,
}

impl ActinsWriter {
    pub fn new(path: &Path) -> Result<ActinsWriter, AfinesError> {
        Ok(ActinsWriter { out: buffered_writer(path)? })
    }
}

impl Observer for ActinsWriter {
    type S = FilamentEnsemble;

    fn observe(&mut self, object: &Self::S) {
        let snapshot = object.bead_snapshot();
        let nbeads: usize = snapshot.iter().map(|f| f.len()).sum();
        writeln!(self.out, "t = {}\tN = {}", object.t(), nbeads).ok();
        for (fil_idx, beads) in snapshot.iter().enumerate() {
            for (pos, r) in beads {
                writeln!(self.out, "{}\t{}\t{}\t{}", pos.x, pos.y, r, fil_idx).ok();
            }
        }
    }

    fn flush(&mut self) {
        self.out.flush().ok();
    }

    fn name(&self) -> &str {
        "ActinsWriter"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Writes `links.txt`: one header line then one `x0 y0 dx dy fil_idx` line per spring.
pub struct LinksWriter {
    out: BufWriter<File>,
}

impl LinksWriter {
    pub fn new(path: &Path) -> Result<LinksWriter, AfinesError> {
        Ok(LinksWriter { out: buffered_writer(path)? })
    }
}

impl Observer for LinksWriter {
    type S = FilamentEnsemble;

    fn observe(&mut self, object: &Self::S) {
        let filaments = object.filaments();
        let nsprings: usize = filaments.iter().map(|f| f.springs().len()).sum();
        writeln!(self.out, "t = {}\tN = {}", object.t(), nsprings).ok();
        for (fil_idx, f) in filaments.iter().enumerate() {
            for s in f.springs() {
                let (i0, _) = s.bead_indices();
                let origin = f.beads()[i0].pos();
                let d = s.disp();
                writeln!(self.out, "{}\t{}\t{}\t{}\t{}", origin.x, origin.y, d.x, d.y, fil_idx).ok();
            }
        }
    }

    fn flush(&mut self) {
        self.out.flush().ok();
    }

    fn name(&self) -> &str {
        "LinksWriter"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Writes `amotors.txt`/`pmotors.txt`: one header line then one
/// `x0 y0 dx dy state0 state1 fil0 fil1 spring0 spring1` line per motor, with
/// `-1` standing in for an unbound head's filament/spring index.
pub struct MotorsWriter {
    out: BufWriter<File>,
    xlink: bool,
}

impl MotorsWriter {
    pub fn new(path: &Path, xlink: bool) -> Result<MotorsWriter, AfinesError> {
        Ok(MotorsWriter { out: buffered_writer(path)?, xlink })
    }
}

impl Observer for MotorsWriter {
    type S = FilamentEnsemble;

    fn observe(&mut self, object: &Self::S) {
        use crate::motor::HeadState;

        let ensemble = if self.xlink { object.xlinks() } else { object.motors() };
        let motors = ensemble.motors();
        writeln!(self.out, "t = {}\tN = {}", object.t(), motors.len()).ok();
        for m in motors {
            let p0 = m.head_pos(0, object.filaments());
            let p1 = m.head_pos(1, object.filaments());
            let d = p1 - p0;

            let describe = |h: HeadState| -> (i32, i32, i32) {
                match h {
                    HeadState::Free { .. } => (0, -1, -1),
                    HeadState::Bound { fil_idx, spring_idx, .. } => (1, fil_idx as i32, spring_idx as i32),
                }
            };
            let (s0, fil0, spring0) = describe(m.heads()[0]);
            let (s1, fil1, spring1) = describe(m.heads()[1]);

            writeln!(
                self.out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                p0.x, p0.y, d.x, d.y, s0, s1, fil0, fil1, spring0, spring1
            )
            .ok();
        }
    }

    fn flush(&mut self) {
        self.out.flush().ok();
    }

    fn name(&self) -> &str {
        if self.xlink { "PmotorsWriter" } else { "AmotorsWriter" }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Writes `pe.txt`: per frame, the stretching/bending/motor/crosslinker
/// energies, the current shear strain and the four accumulated virial tensors.
pub struct EnergyWriter {
    out: BufWriter<File>,
}

impl EnergyWriter {
    pub fn new(path: &Path) -> Result<EnergyWriter, AfinesError> {
        let mut out = buffered_writer(path)?;
        writeln!(out, "# pe_stretch\tpe_bend\tpe_motor\tpe_xlink\td_strain\tvir_stretch\tvir_bend\tvir_motor\tvir_xlink").ok();
        Ok(EnergyWriter { out })
    }

    pub fn record(&mut self, report: &crate::filament_ensemble::StepReport, d_strain: f64) {
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{} {} {} {}\t{} {} {} {}\t{} {} {} {}\t{} {} {} {}",
            report.pe_stretch,
            report.pe_bend,
            report.pe_motor,
            report.pe_xlink,
            d_strain,
            report.vir_stretch.xx, report.vir_stretch.xy, report.vir_stretch.yx, report.vir_stretch.yy,
            report.vir_bend.xx, report.vir_bend.xy, report.vir_bend.yx, report.vir_bend.yy,
            report.vir_motor.xx, report.vir_motor.xy, report.vir_motor.yx, report.vir_motor.yy,
            report.vir_xlink.xx, report.vir_xlink.xy, report.vir_xlink.yx, report.vir_xlink.yy,
        )
        .ok();
    }

    pub fn flush(&mut self) {
        self.out.flush().ok();
    }
}

/// Writes `ke.txt`: per frame, `KE_net KE_motor KE_xlink`.
pub struct KineticEnergyWriter {
    out: BufWriter<File>,
}

impl KineticEnergyWriter {
    pub fn new(path: &Path) -> Result<KineticEnergyWriter, AfinesError> {
        Ok(KineticEnergyWriter { out: buffered_writer(path)? })
    }

    pub fn record(&mut self, ke_net: f64, ke_motor: f64, ke_xlink: f64) {
        writeln!(self.out, "{ke_net}\t{ke_motor}\t{ke_xlink}").ok();
    }

    pub fn flush(&mut self) {
        self.out.flush().ok();
    }
}
