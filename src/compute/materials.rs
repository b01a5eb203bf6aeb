//! Padded material arrays and derived side parameters.

use crate::schema::{Medium, MediumReference};

use super::grid::SimGrid;

/// Material parameters resampled onto the padded grid, plus every derived
/// array the steppers read.
///
/// Padding is constant edge extension: each absorbing cell replicates the
/// nearest physical value. All side parameters (`k_inv`, `rho_inv`, the
/// staggered densities, `m`, `mu_xz`) are derived after padding so the
/// extension cannot introduce edge contrasts.
#[derive(Debug, Clone)]
pub struct PaddedMedium {
    /// Bulk modulus `K` on the padded grid.
    pub k: Vec<f64>,
    /// `1 / K`.
    pub k_inv: Vec<f64>,
    /// Density.
    pub rho: Vec<f64>,
    /// `1 / rho` on the integer grid.
    pub rho_inv: Vec<f64>,
    /// `1 / rho` averaged onto the vx grid `(iz, ix + 1/2)`.
    pub rho_inv_vx: Vec<f64>,
    /// `1 / rho` averaged onto the vz grid `(iz + 1/2, ix)`.
    pub rho_inv_vz: Vec<f64>,
    /// Lame lambda (elastic).
    pub lambda: Option<Vec<f64>>,
    /// Shear modulus on the integer grid (elastic).
    pub mu: Option<Vec<f64>>,
    /// `lambda + 2 mu` (elastic).
    pub m: Option<Vec<f64>>,
    /// Shear modulus averaged onto the txz grid `(iz + 1/2, ix + 1/2)`.
    pub mu_xz: Option<Vec<f64>>,
    /// Maximum P velocity, for the absorbing-boundary profiles.
    pub vp_max: f64,
    /// Physical-grid means kept for contrast-field conditioning.
    pub reference: MediumReference,
}

impl PaddedMedium {
    /// Pad the physical medium onto `grid` and derive side parameters.
    pub fn new(medium: &Medium, grid: &SimGrid) -> Self {
        let k = pad_edge(&medium.bulk_modulus, medium.nz(), medium.nx(), grid);
        let rho = pad_edge(&medium.density, medium.nz(), medium.nx(), grid);

        let k_inv: Vec<f64> = k.iter().map(|&v| 1.0 / v).collect();
        let rho_inv: Vec<f64> = rho.iter().map(|&v| 1.0 / v).collect();
        let rho_inv_vx = average_x(&rho_inv, grid);
        let rho_inv_vz = average_z(&rho_inv, grid);

        let lambda = medium
            .lame_lambda
            .as_ref()
            .map(|l| pad_edge(l, medium.nz(), medium.nx(), grid));
        let mu = medium
            .shear_modulus
            .as_ref()
            .map(|m| pad_edge(m, medium.nz(), medium.nx(), grid));
        let m = match (&lambda, &mu) {
            (Some(lambda), Some(mu)) => Some(
                lambda
                    .iter()
                    .zip(mu.iter())
                    .map(|(&l, &m)| l + 2.0 * m)
                    .collect(),
            ),
            _ => None,
        };
        let mu_xz = mu.as_ref().map(|mu| average_xz(mu, grid));

        Self {
            k,
            k_inv,
            rho,
            rho_inv,
            rho_inv_vx,
            rho_inv_vz,
            lambda,
            mu,
            m,
            mu_xz,
            vp_max: medium.vp_max(),
            reference: medium.reference(),
        }
    }
}

/// Constant edge extension of a physical array onto the padded grid.
fn pad_edge(phys: &[f64], nz: usize, nx: usize, grid: &SimGrid) -> Vec<f64> {
    let p = grid.npml;
    let mut out = vec![0.0; grid.size()];
    for iz in 0..grid.npz {
        let src_z = iz.saturating_sub(p).min(nz - 1);
        for ix in 0..grid.npx {
            let src_x = ix.saturating_sub(p).min(nx - 1);
            out[grid.idx(iz, ix)] = phys[src_z * nx + src_x];
        }
    }
    out
}

/// Two-point arithmetic average onto `(iz, ix + 1/2)` positions.
///
/// The last column keeps its own value; it sits in the outer boundary
/// where the Dirichlet wall zeroes the velocity anyway.
fn average_x(values: &[f64], grid: &SimGrid) -> Vec<f64> {
    let mut out = values.to_vec();
    for iz in 0..grid.npz {
        for ix in 0..grid.npx - 1 {
            let i = grid.idx(iz, ix);
            out[i] = 0.5 * (values[i] + values[i + 1]);
        }
    }
    out
}

/// Two-point arithmetic average onto `(iz + 1/2, ix)` positions.
fn average_z(values: &[f64], grid: &SimGrid) -> Vec<f64> {
    let mut out = values.to_vec();
    for iz in 0..grid.npz - 1 {
        for ix in 0..grid.npx {
            let i = grid.idx(iz, ix);
            out[i] = 0.5 * (values[i] + values[i + grid.npx]);
        }
    }
    out
}

/// Four-point arithmetic average onto `(iz + 1/2, ix + 1/2)` positions.
fn average_xz(values: &[f64], grid: &SimGrid) -> Vec<f64> {
    let mut out = values.to_vec();
    for iz in 0..grid.npz - 1 {
        for ix in 0..grid.npx - 1 {
            let i = grid.idx(iz, ix);
            out[i] = 0.25 * (values[i] + values[i + 1] + values[i + grid.npx] + values[i + grid.npx + 1]);
        }
    }
    out
}
