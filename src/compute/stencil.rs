//! Staggered-grid derivative primitives.
//!
//! All staggering index arithmetic lives here. Forward differences move a
//! quantity from integer to half positions of an axis, backward
//! differences move it back; every stepper references fields only through
//! these.

use super::grid::SimGrid;

/// `out[iz, ix] = (f[iz, ix+1] - f[iz, ix]) / dx`, landing on `(iz, ix + 1/2)`.
pub fn d_x_forward(grid: &SimGrid, f: &[f64], out: &mut [f64]) {
    let inv = 1.0 / grid.dx;
    for iz in 0..grid.npz {
        let row = iz * grid.npx;
        for ix in 0..grid.npx - 1 {
            out[row + ix] = (f[row + ix + 1] - f[row + ix]) * inv;
        }
        out[row + grid.npx - 1] = 0.0;
    }
}

/// `out[iz, ix] = (f[iz, ix] - f[iz, ix-1]) / dx`, landing back on `(iz, ix)`.
pub fn d_x_backward(grid: &SimGrid, f: &[f64], out: &mut [f64]) {
    let inv = 1.0 / grid.dx;
    for iz in 0..grid.npz {
        let row = iz * grid.npx;
        out[row] = 0.0;
        for ix in 1..grid.npx {
            out[row + ix] = (f[row + ix] - f[row + ix - 1]) * inv;
        }
    }
}

/// `out[iz, ix] = (f[iz+1, ix] - f[iz, ix]) / dz`, landing on `(iz + 1/2, ix)`.
pub fn d_z_forward(grid: &SimGrid, f: &[f64], out: &mut [f64]) {
    let inv = 1.0 / grid.dz;
    let npx = grid.npx;
    for iz in 0..grid.npz - 1 {
        let row = iz * npx;
        for ix in 0..npx {
            out[row + ix] = (f[row + npx + ix] - f[row + ix]) * inv;
        }
    }
    let last = (grid.npz - 1) * npx;
    out[last..last + npx].fill(0.0);
}

/// `out[iz, ix] = (f[iz, ix] - f[iz-1, ix]) / dz`, landing back on `(iz, ix)`.
pub fn d_z_backward(grid: &SimGrid, f: &[f64], out: &mut [f64]) {
    let inv = 1.0 / grid.dz;
    let npx = grid.npx;
    out[..npx].fill(0.0);
    for iz in 1..grid.npz {
        let row = iz * npx;
        for ix in 0..npx {
            out[row + ix] = (f[row + ix] - f[row - npx + ix]) * inv;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SimGrid {
        SimGrid::new(4, 4, 1, 2.0, 2.0)
    }

    #[test]
    fn test_forward_backward_ramp_x() {
        let g = grid();
        // f = x coordinate: unit slope everywhere.
        let f: Vec<f64> = (0..g.size()).map(|i| (i % g.npx) as f64 * g.dx).collect();
        let mut out = vec![f64::NAN; g.size()];

        d_x_forward(&g, &f, &mut out);
        for iz in 0..g.npz {
            for ix in 0..g.npx - 1 {
                assert!((out[g.idx(iz, ix)] - 1.0).abs() < 1e-12);
            }
            assert_eq!(out[g.idx(iz, g.npx - 1)], 0.0);
        }

        d_x_backward(&g, &f, &mut out);
        for iz in 0..g.npz {
            assert_eq!(out[g.idx(iz, 0)], 0.0);
            for ix in 1..g.npx {
                assert!((out[g.idx(iz, ix)] - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_forward_backward_ramp_z() {
        let g = grid();
        let f: Vec<f64> = (0..g.size()).map(|i| (i / g.npx) as f64 * g.dz).collect();
        let mut out = vec![f64::NAN; g.size()];

        d_z_forward(&g, &f, &mut out);
        for iz in 0..g.npz - 1 {
            for ix in 0..g.npx {
                assert!((out[g.idx(iz, ix)] - 1.0).abs() < 1e-12);
            }
        }

        d_z_backward(&g, &f, &mut out);
        for iz in 1..g.npz {
            for ix in 0..g.npx {
                assert!((out[g.idx(iz, ix)] - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_backward_inverts_forward_cumsum() {
        // Backward difference of a forward-difference ramp reproduces the
        // second difference: zero for linear fields.
        let g = grid();
        let f: Vec<f64> = (0..g.size())
            .map(|i| 3.0 * (i % g.npx) as f64 + 7.0)
            .collect();
        let mut mid = vec![0.0; g.size()];
        let mut out = vec![0.0; g.size()];
        d_x_forward(&g, &f, &mut mid);
        d_x_backward(&g, &mid, &mut out);
        for iz in 0..g.npz {
            for ix in 1..g.npx - 1 {
                assert!(out[g.idx(iz, ix)].abs() < 1e-12);
            }
        }
    }
}
