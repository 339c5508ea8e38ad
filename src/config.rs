use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{AfinesError, Result};
use crate::simbox::BoundaryCondition;

/// Command-line flags, mirroring the recognized `key=value` configuration
/// options (§6) so either surface can drive a run. Any flag left at its
/// default defers to the configuration file; the file in turn defers to the
/// engine's built-in defaults in [`Config::from_entries`].
#[derive(Parser, Debug, Default)]
#[clap(name = "afines")]
#[clap(version)]
#[clap(about = "2D Brownian-dynamics simulation of actomyosin networks", long_about = None)]
pub struct Cli {
    /// path to a flat key=value configuration file
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    #[clap(long)]
    pub bnd_cnd: Option<String>,
    #[clap(long)]
    pub xrange: Option<f64>,
    #[clap(long)]
    pub yrange: Option<f64>,
    #[clap(long)]
    pub dt: Option<f64>,
    #[clap(long)]
    pub tinit: Option<f64>,
    #[clap(long)]
    pub tfinal: Option<f64>,
    #[clap(long)]
    pub nframes: Option<u32>,
    #[clap(long)]
    pub nmsgs: Option<u32>,
    #[clap(long)]
    pub viscosity: Option<f64>,
    #[clap(long)]
    pub temperature: Option<f64>,
    #[clap(long)]
    pub dir: Option<PathBuf>,
    #[clap(long)]
    pub myseed: Option<u64>,
    #[clap(long)]
    pub restart: Option<PathBuf>,
}

/// The fully resolved simulation configuration: defaults, overlaid by the
/// config file (if any), overlaid by CLI flags (§6).
#[derive(Clone, Debug)]
pub struct Config {
    pub bc_kind: BoundaryCondition,
    pub xrange: f64,
    pub yrange: f64,
    pub dt: f64,
    pub tinit: f64,
    pub tfinal: f64,
    pub nframes: u32,
    pub nmsgs: u32,
    pub viscosity: f64,
    pub temperature: f64,
    pub dir: PathBuf,
    pub myseed: u64,
    pub restart: Option<PathBuf>,
    pub restart_time: f64,
    pub restart_strain: f64,
    pub grid_factor: f64,
    pub quad_off_flag: bool,
    pub quad_update_period: u32,
    pub check_dup_in_quad: bool,
    pub npolymer: u32,
    pub nmonomer: u32,
    pub actin_length: f64,
    pub link_length: f64,
    pub polymer_bending_modulus: f64,
    pub link_stretching_stiffness: f64,
    pub fene_pct: f64,
    pub fracture_force: f64,
    pub rmax: f64,
    pub kexv: f64,
    pub kgrow: f64,
    pub lgrow: f64,
    pub l0min: f64,
    pub l0max: f64,
    pub nlink_max: usize,
    pub circle_flag: bool,
    pub circle_radius: f64,
    pub circle_spring_constant: f64,
    /// every recognized key not promoted to a named field above (motor/xlink
    /// parameter blocks, shear protocol options): kept as raw strings and
    /// parsed by the driver/ensemble builders that know how to interpret them.
    pub raw: HashMap<String, String>,
}

impl Config {
    /// Loads defaults, overlays the config file named by `cli.config` (if
    /// given), then overlays any CLI flags that were explicitly set.
    pub fn load(cli: &Cli) -> Result<Config> {
        let mut entries = HashMap::new();
        if let Some(path) = &cli.config {
            entries = parse_key_value_file(path)?;
        }

        let mut config = Config::from_entries(&entries)?;

        if let Some(v) = &cli.bnd_cnd {
            config.bc_kind = BoundaryCondition::parse(v)
                .ok_or_else(|| AfinesError::Config(format!("unknown bnd_cnd: {v}")))?;
        }
        if let Some(v) = cli.xrange { config.xrange = v; }
        if let Some(v) = cli.yrange { config.yrange = v; }
        if let Some(v) = cli.dt { config.dt = v; }
        if let Some(v) = cli.tinit { config.tinit = v; }
        if let Some(v) = cli.tfinal { config.tfinal = v; }
        if let Some(v) = cli.nframes { config.nframes = v; }
        if let Some(v) = cli.nmsgs { config.nmsgs = v; }
        if let Some(v) = cli.viscosity { config.viscosity = v; }
        if let Some(v) = cli.temperature { config.temperature = v; }
        if let Some(v) = &cli.dir { config.dir = v.clone(); }
        if let Some(v) = cli.myseed { config.myseed = v; }
        if let Some(v) = &cli.restart { config.restart = Some(v.clone()); }

        entries.retain(|k, _| !PROMOTED_KEYS.contains(&k.as_str()));
        config.raw = entries;

        Ok(config)
    }

    fn from_entries(entries: &HashMap<String, String>) -> Result<Config> {
        let get_str = |k: &str, default: &str| entries.get(k).map(|s| s.as_str()).unwrap_or(default).to_string();
        let get_f64 = |k: &str, default: f64| -> Result<f64> {
            match entries.get(k) {
                Some(v) => v.parse().map_err(|_| AfinesError::Config(format!("{k}: expected a number, got {v:?}"))),
                None => Ok(default),
            }
        };
        let get_u32 = |k: &str, default: u32| -> Result<u32> {
            match entries.get(k) {
                Some(v) => v.parse().map_err(|_| AfinesError::Config(format!("{k}: expected an integer, got {v:?}"))),
                None => Ok(default),
            }
        };
        let get_bool = |k: &str, default: bool| -> Result<bool> {
            match entries.get(k) {
                Some(v) => v.parse().map_err(|_| AfinesError::Config(format!("{k}: expected true/false, got {v:?}"))),
                None => Ok(default),
            }
        };

        let bc_kind = BoundaryCondition::parse(&get_str("bnd_cnd", "open"))
            .ok_or_else(|| AfinesError::Config(format!("unknown bnd_cnd: {}", get_str("bnd_cnd", "open"))))?;

        Ok(Config {
            bc_kind,
            xrange: get_f64("xrange", 10.0)?,
            yrange: get_f64("yrange", 10.0)?,
            dt: get_f64("dt", 1e-4)?,
            tinit: get_f64("tinit", 0.0)?,
            tfinal: get_f64("tfinal", 1.0)?,
            nframes: get_u32("nframes", 1000)?,
            nmsgs: get_u32("nmsgs", 1000)?,
            viscosity: get_f64("viscosity", 1e-3)?,
            temperature: get_f64("temperature", 0.004)?,
            dir: PathBuf::from(get_str("dir", ".")),
            myseed: entries.get("myseed").map(|v| v.parse()).transpose()
                .map_err(|_| AfinesError::Config("myseed: expected an integer".into()))?
                .unwrap_or(1),
            restart: entries.get("restart").map(PathBuf::from),
            restart_time: get_f64("restart_time", 0.0)?,
            restart_strain: get_f64("restart_strain", 0.0)?,
            grid_factor: get_f64("grid_factor", 1.0)?,
            quad_off_flag: get_bool("quad_off_flag", false)?,
            quad_update_period: get_u32("quad_update_period", 1)?,
            check_dup_in_quad: get_bool("check_dup_in_quad", false)?,
            npolymer: get_u32("npolymer", 1)?,
            nmonomer: get_u32("nmonomer", 11)?,
            actin_length: get_f64("actin_length", 1.0)?,
            link_length: get_f64("link_length", 1.0)?,
            polymer_bending_modulus: get_f64("polymer_bending_modulus", 0.04)?,
            link_stretching_stiffness: get_f64("link_stretching_stiffness", 1.0)?,
            fene_pct: get_f64("fene_pct", 0.5)?,
            fracture_force: get_f64("fracture_force", f64::INFINITY)?,
            rmax: get_f64("rmax", 0.5)?,
            kexv: get_f64("kexv", 1.0)?,
            kgrow: get_f64("kgrow", 0.0)?,
            lgrow: get_f64("lgrow", 0.0)?,
            l0min: get_f64("l0min", 0.5)?,
            l0max: get_f64("l0max", 2.0)?,
            nlink_max: get_u32("nlink_max", 25)? as usize,
            circle_flag: get_bool("circle_flag", false)?,
            circle_radius: get_f64("circle_radius", 5.0)?,
            circle_spring_constant: get_f64("circle_spring_constant", 1.0)?,
            raw: HashMap::new(),
        })
    }
}

const PROMOTED_KEYS: &[&str] = &[
    "bnd_cnd", "xrange", "yrange", "dt", "tinit", "tfinal", "nframes", "nmsgs", "viscosity",
    "temperature", "dir", "myseed", "restart", "restart_time", "restart_strain", "grid_factor",
    "quad_off_flag", "quad_update_period", "check_dup_in_quad", "npolymer", "nmonomer",
    "actin_length", "link_length", "polymer_bending_modulus", "link_stretching_stiffness",
    "fene_pct", "fracture_force", "rmax", "kexv", "kgrow", "lgrow", "l0min", "l0max",
    "nlink_max", "circle_flag", "circle_radius", "circle_spring_constant",
];

fn parse_key_value_file(path: &Path) -> Result<HashMap<String, String>> {
    let text = fs::read_to_string(path)?;
    let mut entries = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((k, v)) => {
                entries.insert(k.trim().to_string(), v.trim().to_string());
            }
            None => return Err(AfinesError::Config(format!("malformed configuration line: {line:?}"))),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_with_no_entries() {
        let config = Config::from_entries(&HashMap::new()).unwrap();
        assert_eq!(config.bc_kind, BoundaryCondition::Open);
        assert_eq!(config.npolymer, 1);
    }

    #[test]
    fn unknown_boundary_condition_is_a_config_error() {
        let mut entries = HashMap::new();
        entries.insert("bnd_cnd".to_string(), "nonsense".to_string());
        let err = Config::from_entries(&entries).unwrap_err();
        assert!(matches!(err, AfinesError::Config(_)));
    }

    #[test]
    fn malformed_line_is_rejected() {
        let dir = std::env::temp_dir().join(format!("afines-test-config-{}", std::process::id()));
        fs::write(&dir, "dt=1e-4\nnot-a-kv-line\n").unwrap();
        let err = parse_key_value_file(&dir).unwrap_err();
        fs::remove_file(&dir).ok();
        assert!(matches!(err, AfinesError::Config(_)));
    }
}
