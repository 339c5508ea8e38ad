use rand_distr::{Distribution, Uniform};

use afines_numerical::Vec2;

use crate::config::Config;
use crate::error::{AfinesError, Result};
use crate::excluded_volume::ExcludedVolumeParams;
use crate::external_force::ExternalForce;
use crate::filament::{Filament, FilamentParams};
use crate::filament_ensemble::FilamentEnsemble;
use crate::io::writers::{ActinsWriter, EnergyWriter, KineticEnergyWriter, LinksWriter, MotorsWriter};
use crate::motor::{Motor, MotorParams};
use crate::rng::RngStreams;
use crate::simbox::SimBox;
use crate::xlink_ensemble::XlinkEnsemble;

#[derive(Clone, Copy)]
struct StressParams {
    stress1: f64,
    rate1: f64,
    stress2: f64,
    rate2: f64,
    t2: f64,
}

#[derive(Clone, Copy)]
struct OscParams {
    amplitude: f64,
    freq: f64,
    t0: f64,
}

#[derive(Clone, Copy)]
struct DiffParams {
    pct: f64,
    freq: f64,
    t0: f64,
}

/// Which strain protocols are active this step, decided once at startup from
/// the raw configuration (§4.11). The reference `network.cpp` applies
/// stress-, oscillatory-, and differential-strain control as three
/// independent `if` blocks that each add into the same per-step strain
/// accumulator; any subset of the flags may be set at once, so this sums
/// each active protocol's contribution rather than picking a single one.
struct ShearProtocol {
    stress: Option<StressParams>,
    osc: Option<OscParams>,
    diff: Option<DiffParams>,
    prev_osc_target: f64,
}

impl ShearProtocol {
    fn from_config(config: &Config) -> ShearProtocol {
        let raw = |k: &str| -> Option<f64> { config.raw.get(k).and_then(|v| v.parse().ok()) };
        let flag = |k: &str| -> bool { config.raw.get(k).map(|v| v == "true" || v == "1").unwrap_or(false) };

        let stress = flag("stress_flag").then(|| StressParams {
            stress1: raw("stress1").unwrap_or(0.0),
            rate1: raw("stress_rate1").unwrap_or(0.0),
            stress2: raw("stress2").unwrap_or(0.0),
            rate2: raw("stress_rate2").unwrap_or(0.0),
            t2: raw("time_of_dstrain2").unwrap_or(f64::INFINITY),
        });
        let osc = flag("osc_strain_flag").then(|| OscParams {
            amplitude: raw("d_strain_pct").unwrap_or(0.0) * config.xrange,
            freq: raw("d_strain_freq").unwrap_or(0.0),
            t0: raw("time_of_dstrain").unwrap_or(0.0),
        });
        let diff = flag("diff_strain_flag").then(|| DiffParams {
            pct: raw("d_strain_pct").unwrap_or(0.0) * config.xrange,
            freq: raw("d_strain_freq").unwrap_or(0.0),
            t0: raw("time_of_dstrain").unwrap_or(0.0),
        });

        ShearProtocol { stress, osc, diff, prev_osc_target: 0.0 }
    }

    /// The strain increment to apply this step, summing every active
    /// protocol's independent contribution (§4.11).
    fn strain_increment(&mut self, t: f64, dt_eval: f64, sigma_xy: f64) -> f64 {
        let mut d_strain = 0.0;

        if let Some(StressParams { stress1, rate1, stress2, rate2, t2 }) = self.stress {
            let (target, rate) = if t < t2 { (stress1, rate1) } else { (stress2, rate2) };
            d_strain += rate * (target - sigma_xy) * dt_eval;
        }

        if let Some(OscParams { amplitude, freq, t0 }) = self.osc {
            let target = if t < t0 {
                0.0
            } else {
                let phase = freq * (t - t0);
                let triangle = 2.0 * (phase - (phase + 0.5).floor()).abs() - 0.5;
                amplitude * 2.0 * triangle
            };
            d_strain += target - self.prev_osc_target;
            self.prev_osc_target = target;
        }

        if let Some(DiffParams { pct, freq, t0 }) = self.diff {
            if t >= t0 {
                d_strain += pct * freq * dt_eval;
            }
        }

        d_strain
    }
}

fn build_filaments(config: &Config, rng: &mut rand::rngs::SmallRng) -> Vec<Filament> {
    let half_x = Uniform::new(-config.xrange / 2.0, config.xrange / 2.0);
    let half_y = Uniform::new(-config.yrange / 2.0, config.yrange / 2.0);
    let angle_dist = Uniform::new(0.0, std::f64::consts::TAU);

    let params = FilamentParams {
        kl: config.link_stretching_stiffness,
        max_ext_ratio: 1.0 + config.fene_pct,
        fene: config.fene_pct > 0.0,
        kb: config.polymer_bending_modulus,
        dt: config.dt,
        temperature: config.temperature,
        frac_force: config.fracture_force,
        kgrow: config.kgrow,
        lgrow: config.lgrow,
        l0_min: config.l0min,
        l0_max: config.l0max,
        max_springs: config.nlink_max,
        spring_rest_len: config.link_length,
        bead_length: config.actin_length,
        viscosity: config.viscosity,
    };

    (0..config.npolymer)
        .map(|_| {
            let origin = Vec2::new(half_x.sample(rng), half_y.sample(rng));
            let theta = angle_dist.sample(rng);
            let dir = Vec2::new(theta.cos(), theta.sin());
            let positions: Vec<Vec2> = (0..config.nmonomer).map(|i| origin + dir * (i as f64 * config.link_length)).collect();
            Filament::new(positions, params)
        })
        .collect()
}

fn build_xlink_ensemble(prefix: &str, config: &Config, rng: &mut rand::rngs::SmallRng, filaments: &[Filament]) -> XlinkEnsemble {
    let raw = |k: &str, default: f64| -> f64 {
        config.raw.get(&format!("{prefix}_{k}")).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let count: usize = config.raw.get(&format!("{prefix}_num")).and_then(|v| v.parse().ok()).unwrap_or(0);

    let params = MotorParams {
        k_on: raw("k_on", 1.0),
        k_off: raw("k_off", 1.0),
        k_end: raw("k_end", 1.0),
        v0: raw("v0", if prefix == "a_motor" { 1.0 } else { 0.0 }),
        f_stall: raw("stall_force", 10.0),
        kl: raw("stiffness", 1.0),
        rest_length: raw("rest_length", 0.1),
        viscosity: config.viscosity,
        head_length: raw("head_length", 0.02),
        cutoff: raw("cutoff", 0.25),
        dt: config.dt,
        temperature: config.temperature,
    };

    let half_x = Uniform::new(-config.xrange / 2.0, config.xrange / 2.0);
    let half_y = Uniform::new(-config.yrange / 2.0, config.yrange / 2.0);
    let motors: Vec<Motor> = (0..count)
        .map(|i| {
            let p0 = Vec2::new(half_x.sample(rng), half_y.sample(rng));
            let p1 = p0 + Vec2::new(params.rest_length, 0.0);
            Motor::new(i as u64, p0, p1, params)
        })
        .collect();
    let _ = filaments;
    XlinkEnsemble::new(motors, params)
}

/// Builds the initial `FilamentEnsemble` from a resolved [`Config`], either by
/// randomly placing `npolymer` filaments of `nmonomer` beads (§6) or, when
/// `config.restart` names a readable file, by reading back its last frame.
pub fn build_ensemble(config: &Config, rng: &mut rand::rngs::SmallRng) -> Result<FilamentEnsemble> {
    let filaments = match &config.restart {
        Some(path) => match crate::io::restart::read_actins(path) {
            Ok(restart_filaments) => {
                let params = FilamentParams {
                    kl: config.link_stretching_stiffness,
                    max_ext_ratio: 1.0 + config.fene_pct,
                    fene: config.fene_pct > 0.0,
                    kb: config.polymer_bending_modulus,
                    dt: config.dt,
                    temperature: config.temperature,
                    frac_force: config.fracture_force,
                    kgrow: config.kgrow,
                    lgrow: config.lgrow,
                    l0_min: config.l0min,
                    l0_max: config.l0max,
                    max_springs: config.nlink_max,
                    spring_rest_len: config.link_length,
                    bead_length: config.actin_length,
                    viscosity: config.viscosity,
                };
                restart_filaments
                    .into_iter()
                    .map(|rf| Filament::new(rf.beads.into_iter().map(|(p, _)| p).collect(), params))
                    .collect()
            }
            Err(e) => return Err(AfinesError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))),
        },
        None => build_filaments(config, rng),
    };

    let motors = build_xlink_ensemble("a_motor", config, rng, &filaments);
    let xlinks = build_xlink_ensemble("p_motor", config, rng, &filaments);

    let exv_params = ExcludedVolumeParams { rmax: config.rmax, amplitude: config.kexv };
    let external = if config.circle_flag {
        ExternalForce::Circle { radius: config.circle_radius, stiffness: config.circle_spring_constant }
    } else {
        ExternalForce::None
    };

    let quad_cell_size = config.grid_factor * config.link_length.max(1e-6);

    Ok(FilamentEnsemble::new(
        filaments,
        motors,
        xlinks,
        quad_cell_size,
        config.quad_update_period,
        config.quad_off_flag,
        config.check_dup_in_quad,
        exv_params,
        external,
        SimBox::with_strain(config.bc_kind, config.xrange, config.yrange, config.restart_strain * config.yrange),
        config.restart_time.max(config.tinit),
        config.dt,
    ))
}

/// Runs a full simulation from `config`, writing the output files of §6 into
/// `config.dir`, and returns after `tfinal` is reached.
pub fn run(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.dir)?;

    let mut streams = RngStreams::new(config.myseed);
    let mut rng = streams.next_stream();

    let mut ensemble = build_ensemble(config, &mut rng)?;
    let mut shear = ShearProtocol::from_config(config);

    let out = |name: &str| config.dir.join(name);
    let mut actins = ActinsWriter::new(&out("actins.txt"))?;
    let mut links = LinksWriter::new(&out("links.txt"))?;
    let mut amotors = MotorsWriter::new(&out("amotors.txt"), false)?;
    let mut pmotors = MotorsWriter::new(&out("pmotors.txt"), true)?;
    let mut pe = EnergyWriter::new(&out("pe.txt"))?;
    let mut ke = KineticEnergyWriter::new(&out("ke.txt"))?;

    use afines_sim::Observer;

    let n_steps = ((config.tfinal - config.tinit) / config.dt).round().max(0.0) as u64;
    let frame_period = (n_steps / config.nframes.max(1) as u64).max(1);
    let msg_period = (n_steps / config.nmsgs.max(1) as u64).max(1);

    let n_bw_shear: u64 = config.raw.get("n_bw_shear").and_then(|v| v.parse().ok()).unwrap_or(1);
    let mut total_strain = config.restart_strain;

    for step in 0..n_steps {
        let report = ensemble.step(&mut rng)?;

        if step % n_bw_shear == 0 {
            let area = config.xrange * config.yrange;
            let vir_xy_total = report.vir_stretch.xy + report.vir_bend.xy + report.vir_motor.xy + report.vir_xlink.xy;
            let sigma_xy = if area > 0.0 { vir_xy_total / area } else { 0.0 };
            let dt_eval = config.dt * n_bw_shear as f64;
            let increment = shear.strain_increment(ensemble.t(), dt_eval, sigma_xy);
            ensemble.apply_shear(increment);
            total_strain += increment;
        }

        pe.record(&report, total_strain);
        // motors/crosslinkers are overdamped and carry no separate velocity
        // accumulator, so their columns are reported as zero (unlike pe_motor/pe_xlink,
        // which come from their spring tension and are tracked above).
        ke.record(report.ke_net, 0.0, 0.0);

        if step % frame_period == 0 {
            actins.observe(&ensemble);
            links.observe(&ensemble);
            amotors.observe(&ensemble);
            pmotors.observe(&ensemble);
        }
        if step % msg_period == 0 {
            log::info!("t = {:.6}  n_filaments = {}  fractures = {}", ensemble.t(), ensemble.filaments().len(), report.n_fractures);
        }
    }

    actins.flush();
    links.flush();
    amotors.flush();
    pmotors.flush();
    pe.flush();
    ke.flush();
    Ok(())
}
