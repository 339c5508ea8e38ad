use std::fs;
use std::path::Path;

use afines_numerical::Vec2;

use crate::error::{AfinesError, Result};

/// One filament's bead positions and per-bead radius, as read back from an
/// `actins.txt`-formatted restart file.
pub struct RestartFilament {
    pub beads: Vec<(Vec2, f64)>,
}

/// Parses the last frame of an `actins.txt`-formatted file into per-filament
/// bead lists, grouped by the trailing `fil_idx` column.
///
/// Returns `Io` on a missing or malformed file; the caller decides whether
/// that degrades to a fresh start or is fatal, per §6/§7.
pub fn read_actins(path: &Path) -> Result<Vec<RestartFilament>> {
    let text = fs::read_to_string(path)?;
    let mut frames: Vec<Vec<(usize, Vec2, f64)>> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("t =") {
            frames.push(Vec::new());
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(AfinesError::Config(format!("malformed actins line: {line:?}")));
        }
        let parse = |s: &str| s.parse::<f64>().map_err(|_| AfinesError::Config(format!("not a number: {s:?}")));
        let x = parse(fields[0])?;
        let y = parse(fields[1])?;
        let r = parse(fields[2])?;
        let fil_idx: usize = fields[3].parse().map_err(|_| AfinesError::Config(format!("not an index: {:?}", fields[3])))?;

        match frames.last_mut() {
            Some(frame) => frame.push((fil_idx, Vec2::new(x, y), r)),
            None => return Err(AfinesError::Config("actins data before first header line".into())),
        }
    }

    let last_frame = frames.into_iter().last().ok_or_else(|| AfinesError::Config("empty restart file".into()))?;
    let max_fil = last_frame.iter().map(|(idx, _, _)| *idx).max().unwrap_or(0);
    let mut filaments: Vec<RestartFilament> = (0..=max_fil).map(|_| RestartFilament { beads: Vec::new() }).collect();
    for (fil_idx, pos, r) in last_frame {
        filaments[fil_idx].beads.push((pos, r));
    }
    Ok(filaments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_last_frame_grouped_by_filament() {
        let dir = std::env::temp_dir().join(format!("afines-test-restart-{}", std::process::id()));
        fs::write(
            &dir,
            "t = 0\tN = 2\n0.0\t0.0\t0.1\t0\n1.0\t0.0\t0.1\t0\nt = 1\tN = 2\n0.1\t0.0\t0.1\t0\n1.1\t0.0\t0.1\t0\n",
        )
        .unwrap();
        let filaments = read_actins(&dir).unwrap();
        fs::remove_file(&dir).ok();
        assert_eq!(filaments.len(), 1);
        assert_eq!(filaments[0].beads.len(), 2);
        assert_eq!(filaments[0].beads[0].0, Vec2::new(0.1, 0.0));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_actins(Path::new("/nonexistent/path/actins.txt")).unwrap_err();
        assert!(matches!(err, AfinesError::Io(_)));
    }
}
