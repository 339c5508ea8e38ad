use std::collections::HashMap;

use afines_numerical::Vec2;

use crate::simbox::{BoundaryCondition, SimBox};

/// A segment reference: `(filament index, spring index within that filament)`.
pub type SegmentId = (usize, usize);

/// A uniform grid over the simulation box, rebuilt once per time step, mapping
/// each cell to every spring whose bounding box overlaps it.
///
/// This plays the role of the original AFINES "quadrants": motor attachment
/// needs to find, for one head, every spring within `search_radius` without
/// scanning every filament, and a rebuild-every-step grid is cheap enough at
/// the network densities this engine targets (no incremental `update`/`extend`
/// bookkeeping is needed, unlike a true neighbor list).
#[derive(Clone)]
pub struct Quadrants {
    cell_size: f64,
    n_cols: i64,
    n_rows: i64,
    disabled: bool,
    cells: HashMap<(i64, i64), Vec<SegmentId>>,
    flat: Vec<SegmentId>,
}

impl Quadrants {
    pub fn new(cell_size: f64) -> Quadrants {
        Quadrants { cell_size: cell_size.max(1e-9), n_cols: 1, n_rows: 1, disabled: false, cells: HashMap::new(), flat: Vec::new() }
    }

    /// Builds a grid that never partitions space: every `nearby` query returns
    /// every registered segment instead. This is `quad_off_flag`'s fallback
    /// (§4.8), always correct, just O(n) per query rather than O(1).
    pub fn new_disabled() -> Quadrants {
        Quadrants { cell_size: 1.0, n_cols: 1, n_rows: 1, disabled: true, cells: HashMap::new(), flat: Vec::new() }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// The unwrapped cell a point falls in, taking the box's domain as
    /// `[-lx/2, lx/2) x [-ly/2, ly/2)`.
    fn raw_cell(&self, p: Vec2, bx: &SimBox) -> (i64, i64) {
        (
            ((p.x + 0.5 * bx.lx()) / self.cell_size).floor() as i64,
            ((p.y + 0.5 * bx.ly()) / self.cell_size).floor() as i64,
        )
    }

    /// Canonicalizes a raw cell index into `[0, n_cols) x [0, n_rows)` for
    /// whichever axes `bx`'s boundary condition makes periodic, applying the
    /// Lees-Edwards x-shift whenever the y-index wraps: the sheared periodic
    /// image is offset in x by `delta_rx` every time the box repeats in y.
    fn wrap_cell(&self, col: i64, row: i64, bx: &SimBox) -> (i64, i64) {
        let periodic_x = matches!(bx.bc_kind(), BoundaryCondition::Periodic | BoundaryCondition::LeesEdwards | BoundaryCondition::XPeriodic);
        let periodic_y = matches!(bx.bc_kind(), BoundaryCondition::Periodic | BoundaryCondition::LeesEdwards | BoundaryCondition::YPeriodic);

        let mut col = col;
        let mut row = row;
        if periodic_y && self.n_rows > 0 {
            let wraps = row.div_euclid(self.n_rows);
            row = row.rem_euclid(self.n_rows);
            if bx.bc_kind() == BoundaryCondition::LeesEdwards && wraps != 0 {
                col += (wraps as f64 * bx.delta_rx() / self.cell_size).round() as i64;
            }
        }
        if periodic_x && self.n_cols > 0 {
            col = col.rem_euclid(self.n_cols);
        }
        (col, row)
    }

    /// Clears and repopulates the grid from every filament's bead chain,
    /// inserting each spring's id into every cell its bounding box overlaps
    /// (not just its midpoint), so a query near either endpoint still finds
    /// it even when `cell_size` is smaller than the spring's length (§4.8).
    pub fn rebuild<'a>(&mut self, filaments: impl Iterator<Item = (usize, &'a [Vec2])>, bx: &SimBox) {
        self.cells.clear();
        self.flat.clear();
        self.n_cols = ((bx.lx() / self.cell_size).ceil() as i64).max(1);
        self.n_rows = ((bx.ly() / self.cell_size).ceil() as i64).max(1);

        for (fil_idx, positions) in filaments {
            for spring_idx in 0..positions.len().saturating_sub(1) {
                self.flat.push((fil_idx, spring_idx));
                if self.disabled {
                    continue;
                }
                let (c0, r0) = self.raw_cell(positions[spring_idx], bx);
                let (c1, r1) = self.raw_cell(positions[spring_idx + 1], bx);
                let (lo_c, hi_c) = (c0.min(c1), c0.max(c1));
                let (lo_r, hi_r) = (r0.min(r1), r0.max(r1));
                for row in lo_r..=hi_r {
                    for col in lo_c..=hi_c {
                        let cell = self.wrap_cell(col, row, bx);
                        self.cells.entry(cell).or_default().push((fil_idx, spring_idx));
                    }
                }
            }
        }
    }

    /// Every segment registered in the 3x3 block of cells around `p` (the
    /// candidate set for a motor head attachment search within one `cell_size`
    /// of `p`; the caller still checks the exact distance via `Spring::intpoint`),
    /// or every segment in the grid if this `Quadrants` is disabled.
    pub fn nearby(&self, p: Vec2, bx: &SimBox) -> Vec<SegmentId> {
        if self.disabled {
            return self.flat.clone();
        }
        let (c0, r0) = self.raw_cell(p, bx);
        let mut out = Vec::new();
        for dr in -1..=1 {
            for dc in -1..=1 {
                let cell = self.wrap_cell(c0 + dc, r0 + dr, bx);
                if let Some(segs) = self.cells.get(&cell) {
                    out.extend_from_slice(segs);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Scans every cell for a segment id registered twice (an invariant
    /// regression test enabled by `check_dup_in_quad`, §4.8); returns the
    /// first duplicate found, since a properly built grid never needs to
    /// insert the same segment into the same cell more than once per rebuild.
    pub fn find_duplicate(&self) -> Option<SegmentId> {
        for segs in self.cells.values() {
            let mut seen = std::collections::HashSet::new();
            for &id in segs {
                if !seen.insert(id) {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn n_cols(&self) -> i64 {
        self.n_cols
    }

    pub fn n_rows(&self) -> i64 {
        self.n_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simbox::BoundaryCondition;

    #[test]
    fn rebuild_then_nearby_finds_own_cell() {
        let mut q = Quadrants::new(1.0);
        let bx = SimBox::new(BoundaryCondition::Open, 40.0, 40.0);
        let near = vec![Vec2::new(0.2, 0.2), Vec2::new(0.3, 0.2)];
        let far = vec![Vec2::new(15.0, 15.0), Vec2::new(15.1, 15.0)];
        q.rebuild(vec![(0usize, near.as_slice()), (1usize, far.as_slice())].into_iter(), &bx);
        let hits = q.nearby(Vec2::new(0.0, 0.0), &bx);
        assert!(hits.contains(&(0, 0)));
        assert!(!hits.contains(&(1, 0)));
    }

    #[test]
    fn empty_grid_returns_nothing() {
        let q = Quadrants::new(1.0);
        let bx = SimBox::new(BoundaryCondition::Open, 20.0, 20.0);
        assert!(q.nearby(Vec2::new(0.0, 0.0), &bx).is_empty());
    }

    #[test]
    fn long_spring_is_found_near_either_endpoint() {
        let mut q = Quadrants::new(1.0);
        let bx = SimBox::new(BoundaryCondition::Open, 20.0, 20.0);
        let positions = vec![Vec2::new(-4.0, 0.0), Vec2::new(4.0, 0.0)];
        q.rebuild(std::iter::once((0usize, positions.as_slice())), &bx);
        assert!(q.nearby(Vec2::new(-4.0, 0.0), &bx).contains(&(0, 0)));
        assert!(q.nearby(Vec2::new(4.0, 0.0), &bx).contains(&(0, 0)));
        assert!(q.nearby(Vec2::new(0.0, 0.0), &bx).contains(&(0, 0)));
    }

    #[test]
    fn wide_bbox_wrapping_twice_into_one_cell_is_flagged_as_duplicate() {
        let mut q = Quadrants::new(1.0);
        let bx = SimBox::new(BoundaryCondition::Periodic, 2.0, 2.0);
        let positions = vec![Vec2::new(-0.9, 0.0), Vec2::new(1.1, 0.0)];
        q.rebuild(std::iter::once((0usize, positions.as_slice())), &bx);
        assert_eq!(q.find_duplicate(), Some((0, 0)));
    }

    #[test]
    fn disabled_grid_returns_every_segment_regardless_of_distance() {
        let mut q = Quadrants::new_disabled();
        let bx = SimBox::new(BoundaryCondition::Open, 100.0, 100.0);
        let near = vec![Vec2::new(0.0, 0.0), Vec2::new(0.1, 0.0)];
        let far = vec![Vec2::new(40.0, 40.0), Vec2::new(40.1, 40.0)];
        q.rebuild(vec![(0usize, near.as_slice()), (1usize, far.as_slice())].into_iter(), &bx);
        let hits = q.nearby(Vec2::new(0.0, 0.0), &bx);
        assert!(hits.contains(&(0, 0)));
        assert!(hits.contains(&(1, 0)));
    }

    #[test]
    fn periodic_query_wraps_across_boundary() {
        let mut q = Quadrants::new(1.0);
        let bx = SimBox::new(BoundaryCondition::Periodic, 10.0, 10.0);
        let positions = vec![Vec2::new(-4.9, 0.0), Vec2::new(-4.5, 0.0)];
        q.rebuild(std::iter::once((0usize, positions.as_slice())), &bx);
        let hits = q.nearby(Vec2::new(4.9, 0.0), &bx);
        assert!(hits.contains(&(0, 0)));
    }
}
