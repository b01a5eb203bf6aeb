//! Adjoint-state gradient accumulation.

use super::grid::SimGrid;

/// Per-shot gradient, illumination, and the temporal ring needed for the
/// second time derivative of the adjoint field.
///
/// The compressibility integrand is `p_fwd * d2/dt2 p_adj`, evaluated
/// with a three-point stencil over the last three reverse steps; the
/// inverse-density integrand correlates the pressure gradients of the two
/// fields averaged back onto the integer grid.
#[derive(Debug, Clone)]
pub struct ShotAccumulator {
    g_k_inv: Vec<f64>,
    g_rho_inv: Vec<f64>,
    illum: Vec<f64>,
    ring_adj: [Vec<f64>; 3],
    ring_fwd: [Vec<f64>; 3],
    write: usize,
    count: usize,
}

/// Finished per-shot buffers on the physical grid.
#[derive(Debug, Clone)]
pub struct ShotGradient {
    pub g_k_inv: Vec<f64>,
    pub g_rho_inv: Vec<f64>,
    pub illum: Vec<f64>,
}

impl ShotAccumulator {
    pub fn new(grid: &SimGrid) -> Self {
        let n = grid.size();
        Self {
            g_k_inv: vec![0.0; n],
            g_rho_inv: vec![0.0; n],
            illum: vec![0.0; n],
            ring_adj: [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            ring_fwd: [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            write: 0,
            count: 0,
        }
    }

    /// Push the current pair of fields and, once three reverse steps are
    /// buffered, accumulate the compressibility integrand at the middle
    /// step.
    pub fn record_pressure(&mut self, dt: f64, p_fwd: &[f64], p_adj: &[f64]) {
        self.ring_adj[self.write].copy_from_slice(p_adj);
        self.ring_fwd[self.write].copy_from_slice(p_fwd);
        let newest = self.write;
        self.write = (self.write + 1) % 3;
        self.count += 1;
        if self.count < 3 {
            return;
        }
        let middle = (newest + 2) % 3;
        let oldest = (newest + 1) % 3;
        let inv_dt = 1.0 / dt;
        for i in 0..self.g_k_inv.len() {
            let d2 = (self.ring_adj[newest][i] - 2.0 * self.ring_adj[middle][i]
                + self.ring_adj[oldest][i])
                * inv_dt;
            self.g_k_inv[i] += self.ring_fwd[middle][i] * d2;
        }
    }

    /// Accumulate the inverse-density integrand from the pressure
    /// gradients of both fields, averaged onto the integer grid.
    pub fn record_density(
        &mut self,
        grid: &SimGrid,
        dt: f64,
        dpdx_fwd: &[f64],
        dpdz_fwd: &[f64],
        dpdx_adj: &[f64],
        dpdz_adj: &[f64],
    ) {
        let npx = grid.npx;
        for iz in 1..grid.npz {
            for ix in 1..npx {
                let i = iz * npx + ix;
                let px = 0.5 * (dpdx_fwd[i] * dpdx_adj[i] + dpdx_fwd[i - 1] * dpdx_adj[i - 1]);
                let pz =
                    0.5 * (dpdz_fwd[i] * dpdz_adj[i] + dpdz_fwd[i - npx] * dpdz_adj[i - npx]);
                self.g_rho_inv[i] += (px + pz) * dt;
            }
        }
    }

    /// Accumulate source-side illumination `p^2`.
    pub fn record_illumination(&mut self, p_fwd: &[f64]) {
        for (acc, &p) in self.illum.iter_mut().zip(p_fwd.iter()) {
            *acc += p * p;
        }
    }

    /// Scale by the cell area and extract the physical interior.
    pub fn finish(self, grid: &SimGrid) -> ShotGradient {
        let area = grid.cell_area();
        let scale = |mut v: Vec<f64>| {
            for x in v.iter_mut() {
                *x *= area;
            }
            grid.extract_interior(&v)
        };
        ShotGradient {
            g_k_inv: scale(self.g_k_inv),
            g_rho_inv: scale(self.g_rho_inv),
            illum: grid.extract_interior(&self.illum),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_derivative_of_quadratic() {
        // adj(t) = t^2 sampled at dt=1 has a constant second derivative
        // of 2; with fwd = 1 the integrand accumulates 2 * dt per push.
        let grid = SimGrid::new(4, 4, 1, 1.0, 1.0);
        let n = grid.size();
        let mut acc = ShotAccumulator::new(&grid);
        let fwd = vec![1.0; n];
        for t in 0..5 {
            let adj = vec![(t * t) as f64; n];
            acc.record_pressure(1.0, &fwd, &adj);
        }
        // 5 pushes, 3 accumulations of 2.0 each.
        let out = acc.finish(&grid);
        assert!((out.g_k_inv[0] - 6.0).abs() < 1e-12, "{}", out.g_k_inv[0]);
    }

    #[test]
    fn test_no_accumulation_before_ring_fills() {
        let grid = SimGrid::new(4, 4, 1, 1.0, 1.0);
        let n = grid.size();
        let mut acc = ShotAccumulator::new(&grid);
        acc.record_pressure(1.0, &vec![1.0; n], &vec![1.0; n]);
        acc.record_pressure(1.0, &vec![1.0; n], &vec![2.0; n]);
        let out = acc.finish(&grid);
        assert!(out.g_k_inv.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_illumination_is_sum_of_squares() {
        let grid = SimGrid::new(4, 4, 1, 1.0, 1.0);
        let mut acc = ShotAccumulator::new(&grid);
        let p = vec![2.0; grid.size()];
        acc.record_illumination(&p);
        acc.record_illumination(&p);
        let out = acc.finish(&grid);
        assert!(out.illum.iter().all(|&v| (v - 8.0).abs() < 1e-12));
    }

    #[test]
    fn test_density_correlation_sign() {
        let grid = SimGrid::new(4, 4, 1, 1.0, 1.0);
        let n = grid.size();
        let mut acc = ShotAccumulator::new(&grid);
        // Aligned gradients accumulate a positive integrand.
        let gx = vec![1.0; n];
        let gz = vec![0.5; n];
        acc.record_density(&grid, 0.1, &gx, &gz, &gx, &gz);
        let out = acc.finish(&grid);
        assert!(out.g_rho_inv.iter().all(|&v| v > 0.0));
    }
}
