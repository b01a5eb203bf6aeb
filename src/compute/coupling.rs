//! Bilinear source/receiver coupling to the grid.

use crate::schema::{ConfigError, Position};

use super::grid::SimGrid;

/// Four-corner coupling of one world-coordinate point to the grid.
///
/// `cells` are flat padded-grid indices of the enclosing corners, `w`
/// the bilinear weights (summing to one). Injection scales by a per-cell
/// material coefficient and divides by the cell area so a unit source
/// integrates to one over the grid.
#[derive(Debug, Clone, Copy)]
pub struct CellWeights {
    pub cells: [usize; 4],
    pub w: [f64; 4],
}

impl CellWeights {
    /// Locate `position` on the physical grid.
    ///
    /// Errors when the enclosing cell touches the absorbing boundary or
    /// leaves the grid; `shot`, `kind` and `index` only label the error.
    pub fn locate(
        grid: &SimGrid,
        position: Position,
        shot: usize,
        kind: &'static str,
        index: usize,
    ) -> Result<Self, ConfigError> {
        let out_of_domain = || ConfigError::OutOfDomain {
            shot,
            kind,
            index,
            x: position.x,
            z: position.z,
        };

        let gx = position.x / grid.dx;
        let gz = position.z / grid.dz;
        if !gx.is_finite() || !gz.is_finite() || gx < 0.0 || gz < 0.0 {
            return Err(out_of_domain());
        }
        let ix0 = gx.floor() as usize;
        let iz0 = gz.floor() as usize;
        // The whole 2x2 stencil must stay inside the physical interior.
        if ix0 + 1 >= grid.nx() || iz0 + 1 >= grid.nz() {
            return Err(out_of_domain());
        }
        let tx = gx - ix0 as f64;
        let tz = gz - iz0 as f64;

        let p = grid.npml;
        let base = grid.idx(iz0 + p, ix0 + p);
        Ok(Self {
            cells: [base, base + 1, base + grid.npx, base + grid.npx + 1],
            w: [
                (1.0 - tx) * (1.0 - tz),
                tx * (1.0 - tz),
                (1.0 - tx) * tz,
                tx * tz,
            ],
        })
    }

    /// Spread `value` over the corners with spray scaling (injection).
    ///
    /// `material` is the per-cell coefficient of the target field's
    /// update (bulk modulus for pressure sources, staggered inverse
    /// density for velocity sources).
    #[inline]
    pub fn spray(&self, field: &mut [f64], material: &[f64], value: f64, cell_area: f64) {
        let scaled = value / cell_area;
        for (&cell, &w) in self.cells.iter().zip(self.w.iter()) {
            field[cell] += scaled * material[cell] * w;
        }
    }

    /// Read the field at the point by bilinear interpolation (receivers).
    #[inline]
    pub fn interp(&self, field: &[f64]) -> f64 {
        self.cells
            .iter()
            .zip(self.w.iter())
            .map(|(&cell, &w)| field[cell] * w)
            .sum()
    }
}
