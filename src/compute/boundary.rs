//! Wavefield boundary recording for time reversal.
//!
//! During a gradient-enabled forward pass, a thin shell of the wavefield
//! just inside the absorbing layer is recorded at every step, along with
//! one full snapshot of the terminal state. Replaying the shell while
//! stepping backwards reconstructs the interior wavefield exactly: the
//! field at step `it-1` is determined by the field at `it` plus the
//! boundary values, so nothing else from the forward pass needs storing.

use super::fields::AcousticFields;
use super::grid::SimGrid;

/// Shell thickness in cells. The second-order stencil reads one cell past
/// the pressure update, and the reverse velocity recomputation reads one
/// more; three cells cover both with margin.
const SHELL: usize = 3;

/// Recorded boundary samples and terminal snapshot for one shot.
#[derive(Debug, Clone)]
pub struct BoundaryStore {
    shell: Vec<usize>,
    nt: usize,
    /// `nt` frames of `[p, vx, vz]` shell samples, contiguous per frame.
    data: Vec<f64>,
    term_p: Vec<f64>,
    term_vx: Vec<f64>,
    term_vz: Vec<f64>,
}

impl BoundaryStore {
    pub fn new(grid: &SimGrid, nt: usize) -> Self {
        let shell = shell_indices(grid);
        let frame = 3 * shell.len();
        Self {
            shell,
            nt,
            data: vec![0.0; nt * frame],
            term_p: vec![0.0; grid.size()],
            term_vx: vec![0.0; grid.size()],
            term_vz: vec![0.0; grid.size()],
        }
    }

    #[inline]
    fn frame(&self, it: usize) -> usize {
        debug_assert!(it < self.nt);
        it * 3 * self.shell.len()
    }

    /// Record the shell of `f` as the state after step `it`.
    pub fn save_shell(&mut self, it: usize, f: &AcousticFields) {
        let n = self.shell.len();
        let base = self.frame(it);
        for (j, &cell) in self.shell.iter().enumerate() {
            self.data[base + j] = f.p[cell];
            self.data[base + n + j] = f.vx[cell];
            self.data[base + 2 * n + j] = f.vz[cell];
        }
    }

    /// Write the recorded shell for step `it` back into the field.
    pub fn force_shell(&self, it: usize, f: &mut AcousticFields) {
        let n = self.shell.len();
        let base = self.frame(it);
        for (j, &cell) in self.shell.iter().enumerate() {
            f.p[cell] = self.data[base + j];
            f.vx[cell] = self.data[base + n + j];
            f.vz[cell] = self.data[base + 2 * n + j];
        }
    }

    /// Record the terminal state (pressure and the staggered velocities).
    pub fn save_terminal(&mut self, f: &AcousticFields) {
        self.term_p.copy_from_slice(&f.p);
        self.term_vx.copy_from_slice(&f.vx);
        self.term_vz.copy_from_slice(&f.vz);
    }

    /// Initialize a field from the terminal snapshot for the reverse pass.
    pub fn restore_terminal(&self, f: &mut AcousticFields) {
        f.p.copy_from_slice(&self.term_p);
        f.vx.copy_from_slice(&self.term_vx);
        f.vz.copy_from_slice(&self.term_vz);
    }
}

/// Flat indices of the interior cells within `SHELL` cells of the
/// absorbing layer, on all four sides.
fn shell_indices(grid: &SimGrid) -> Vec<usize> {
    let mut indices = Vec::new();
    let z = grid.interior_z();
    let x = grid.interior_x();
    for iz in z.clone() {
        let near_z = iz < z.start + SHELL || iz >= z.end - SHELL;
        for ix in x.clone() {
            let near_x = ix < x.start + SHELL || ix >= x.end - SHELL;
            if near_z || near_x {
                indices.push(grid.idx(iz, ix));
            }
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::acoustic::Stepper;
    use crate::compute::cpml::CpmlProfile;
    use crate::compute::materials::PaddedMedium;
    use crate::schema::{CpmlConfig, Medium};

    #[test]
    fn test_shell_is_a_ring() {
        let grid = SimGrid::new(20, 20, 5, 1.0, 1.0);
        let shell = shell_indices(&grid);
        // Full interior ring: 20^2 minus the untouched 14^2 core.
        assert_eq!(shell.len(), 20 * 20 - 14 * 14);
        for &cell in &shell {
            let iz = cell / grid.npx;
            let ix = cell % grid.npx;
            assert!(grid.in_interior(iz, ix), "shell must stay interior");
        }
    }

    #[test]
    fn test_save_force_round_trip() {
        let grid = SimGrid::new(20, 20, 5, 1.0, 1.0);
        let mut store = BoundaryStore::new(&grid, 4);
        let mut f = AcousticFields::new(&grid);

        for (i, v) in f.p.iter_mut().enumerate() {
            *v = i as f64;
        }
        for (i, v) in f.vx.iter_mut().enumerate() {
            *v = 2.0 * i as f64;
        }
        store.save_shell(2, &f);

        let mut g = AcousticFields::new(&grid);
        store.force_shell(2, &mut g);
        let probe = grid.idx(5, 7);
        assert_eq!(g.p[probe], probe as f64);
        assert_eq!(g.vx[probe], 2.0 * probe as f64);
        // Core cells are untouched by the shell.
        assert_eq!(g.p[grid.idx(12, 12)], 0.0);
    }

    #[test]
    fn test_terminal_round_trip() {
        let grid = SimGrid::new(10, 10, 3, 1.0, 1.0);
        let mut store = BoundaryStore::new(&grid, 1);
        let mut f = AcousticFields::new(&grid);
        f.p[37] = 4.5;
        f.vz[11] = -1.0;
        store.save_terminal(&f);

        let mut g = AcousticFields::new(&grid);
        store.restore_terminal(&mut g);
        assert_eq!(g.p[37], 4.5);
        assert_eq!(g.vz[11], -1.0);
    }

    #[test]
    fn test_time_reversal_reconstructs_first_step() {
        // Forward pass with boundary recording, then replay backwards:
        // the state after the first step must come back to round-off,
        // even though the wave crossed well into the absorbing layer.
        let medium = Medium::homogeneous(60, 60, 10.0, 10.0, 2000.0, 2000.0);
        let grid = SimGrid::new(60, 60, 20, 10.0, 10.0);
        let padded = PaddedMedium::new(&medium, &grid);
        let tuning = CpmlConfig::default();
        let dt = 2e-3;
        let nt = 150;
        let prof_z = CpmlProfile::new(20, 10.0, dt, padded.vp_max, &tuning);
        let prof_x = CpmlProfile::new(20, 10.0, dt, padded.vp_max, &tuning);
        let stepper = Stepper {
            grid: &grid,
            medium: &padded,
            prof_z: &prof_z,
            prof_x: &prof_x,
            dt,
        };

        let mut f = AcousticFields::new(&grid);
        let (cz, cx) = (grid.npz / 2, grid.npx / 2);
        for dz in -2i64..=2 {
            for dx in -2i64..=2 {
                let r2 = (dz * dz + dx * dx) as f64;
                f.p[grid.idx((cz as i64 + dz) as usize, (cx as i64 + dx) as usize)] =
                    (-r2 / 2.0).exp();
            }
        }

        let mut store = BoundaryStore::new(&grid, nt);
        let mut p_first = Vec::new();
        let mut vx_first = Vec::new();
        for it in 0..nt {
            stepper.step_forward(&mut f);
            store.save_shell(it, &f);
            if it == 0 {
                p_first = f.p.clone();
                vx_first = f.vx.clone();
            }
        }
        store.save_terminal(&f);

        let mut r = AcousticFields::new(&grid);
        store.restore_terminal(&mut r);
        for it in (1..nt).rev() {
            store.force_shell(it, &mut r);
            stepper.step_reverse(&mut r);
        }

        // Compare inside the shell, where reconstruction is defined.
        let mut num = 0.0f64;
        let mut den = 0.0f64;
        for iz in grid.npml + SHELL..grid.npz - grid.npml - SHELL {
            for ix in grid.npml + SHELL..grid.npx - grid.npml - SHELL {
                let i = grid.idx(iz, ix);
                num += (r.p[i] - p_first[i]).powi(2) + (r.vx[i] - vx_first[i]).powi(2);
                den += p_first[i].powi(2) + vx_first[i].powi(2);
            }
        }
        let rel = (num / den.max(f64::MIN_POSITIVE)).sqrt();
        assert!(
            rel < 1e-8,
            "time reversal must reconstruct the first step, relative error {:.3e}",
            rel
        );
        assert!(den > 0.0, "reference state must be non-trivial");
    }
}
