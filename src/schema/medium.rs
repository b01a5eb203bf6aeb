//! Gridded material model supplied by the caller.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Material parameters on the physical grid.
///
/// All arrays are flat, row-major over `(iz, ix)` with `x` fastest, SI
/// units throughout (Pa, kg/m^3, meters). Acoustic runs need bulk modulus
/// and density; elastic runs additionally need the Lame parameter and the
/// shear modulus on the same grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medium {
    nz: usize,
    nx: usize,
    dz: f64,
    dx: f64,
    /// Bulk modulus `K` in Pa.
    pub bulk_modulus: Vec<f64>,
    /// Density `rho` in kg/m^3.
    pub density: Vec<f64>,
    /// Lame `lambda` in Pa (elastic only).
    pub lame_lambda: Option<Vec<f64>>,
    /// Shear modulus `mu` in Pa (elastic only).
    pub shear_modulus: Option<Vec<f64>>,
}

/// Spatial means of the material parameters over the physical grid.
///
/// Kept purely for nondimensionalization of contrast fields; never mixed
/// back into the user-visible medium.
#[derive(Debug, Clone, Copy)]
pub struct MediumReference {
    pub bulk_modulus: f64,
    pub density: f64,
}

impl Medium {
    /// Create a homogeneous acoustic medium from a P velocity and density.
    pub fn homogeneous(nz: usize, nx: usize, dz: f64, dx: f64, vp: f64, rho: f64) -> Self {
        let n = nz * nx;
        Self {
            nz,
            nx,
            dz,
            dx,
            bulk_modulus: vec![rho * vp * vp; n],
            density: vec![rho; n],
            lame_lambda: None,
            shear_modulus: None,
        }
    }

    /// Create a homogeneous elastic medium from P and S velocities.
    pub fn homogeneous_elastic(
        nz: usize,
        nx: usize,
        dz: f64,
        dx: f64,
        vp: f64,
        vs: f64,
        rho: f64,
    ) -> Self {
        let n = nz * nx;
        let mu = rho * vs * vs;
        let lambda = rho * vp * vp - 2.0 * mu;
        Self {
            nz,
            nx,
            dz,
            dx,
            bulk_modulus: vec![lambda + 2.0 * mu / 3.0; n],
            density: vec![rho; n],
            lame_lambda: Some(vec![lambda; n]),
            shear_modulus: Some(vec![mu; n]),
        }
    }

    /// Overwrite a band of rows with homogeneous acoustic parameters.
    ///
    /// `rows` is a half-open range of z indices on the physical grid.
    pub fn fill_rows(&mut self, rows: std::ops::Range<usize>, vp: f64, rho: f64) {
        let end = rows.end.min(self.nz);
        for iz in rows.start..end {
            for ix in 0..self.nx {
                let idx = iz * self.nx + ix;
                self.bulk_modulus[idx] = rho * vp * vp;
                self.density[idx] = rho;
            }
        }
    }

    /// Number of rows (z axis).
    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Number of columns (x axis).
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Row spacing in meters.
    #[inline]
    pub fn dz(&self) -> f64 {
        self.dz
    }

    /// Column spacing in meters.
    #[inline]
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Whether elastic parameters are present.
    #[inline]
    pub fn is_elastic(&self) -> bool {
        self.lame_lambda.is_some() && self.shear_modulus.is_some()
    }

    /// Maximum P velocity over the grid, used for the absorbing-boundary
    /// damping strength.
    pub fn vp_max(&self) -> f64 {
        let mut vmax = 0.0f64;
        match (&self.lame_lambda, &self.shear_modulus) {
            (Some(lambda), Some(mu)) => {
                for i in 0..self.bulk_modulus.len() {
                    let vp = ((lambda[i] + 2.0 * mu[i]) / self.density[i]).sqrt();
                    vmax = vmax.max(vp);
                }
            }
            _ => {
                for i in 0..self.bulk_modulus.len() {
                    let vp = (self.bulk_modulus[i] / self.density[i]).sqrt();
                    vmax = vmax.max(vp);
                }
            }
        }
        vmax
    }

    /// Spatial means over the physical grid.
    pub fn reference(&self) -> MediumReference {
        let n = self.bulk_modulus.len() as f64;
        MediumReference {
            bulk_modulus: self.bulk_modulus.iter().sum::<f64>() / n,
            density: self.density.iter().sum::<f64>() / n,
        }
    }

    /// Validate dimensions, shapes, positivity, and finiteness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nz == 0 || self.nx == 0 || !(self.dz > 0.0) || !(self.dx > 0.0) {
            return Err(ConfigError::InvalidDimensions);
        }
        let n = self.nz * self.nx;
        check_shape("bulk_modulus", &self.bulk_modulus, n)?;
        check_shape("density", &self.density, n)?;
        check_positive("bulk_modulus", &self.bulk_modulus)?;
        check_positive("density", &self.density)?;
        match (&self.lame_lambda, &self.shear_modulus) {
            (None, None) => {}
            (Some(lambda), Some(mu)) => {
                check_shape("lame_lambda", lambda, n)?;
                check_shape("shear_modulus", mu, n)?;
                check_non_negative("lame_lambda", lambda)?;
                check_non_negative("shear_modulus", mu)?;
            }
            _ => return Err(ConfigError::ElasticParamsIncomplete),
        }
        Ok(())
    }
}

fn check_shape(name: &'static str, values: &[f64], expected: usize) -> Result<(), ConfigError> {
    if values.len() != expected {
        return Err(ConfigError::MediumShapeMismatch {
            name,
            expected,
            got: values.len(),
        });
    }
    Ok(())
}

fn check_positive(name: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    for (cell, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(ConfigError::NonFiniteMaterial { name, cell });
        }
        if v <= 0.0 {
            return Err(ConfigError::NonPositiveMaterial { name, cell });
        }
    }
    Ok(())
}

fn check_non_negative(name: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    for (cell, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(ConfigError::NonFiniteMaterial { name, cell });
        }
        if v < 0.0 {
            return Err(ConfigError::NonPositiveMaterial { name, cell });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous_builder() {
        let medium = Medium::homogeneous(50, 60, 10.0, 10.0, 2000.0, 2000.0);
        assert_eq!(medium.bulk_modulus.len(), 50 * 60);
        assert!(medium.validate().is_ok());
        // K = rho * vp^2
        assert!((medium.bulk_modulus[0] - 8e9).abs() < 1e-3);
        assert!((medium.vp_max() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_rows_two_layer() {
        let mut medium = Medium::homogeneous(100, 100, 10.0, 10.0, 1500.0, 2000.0);
        medium.fill_rows(50..100, 2500.0, 2000.0);
        let top = medium.bulk_modulus[10 * 100];
        let bottom = medium.bulk_modulus[60 * 100];
        assert!(bottom > top, "lower layer should be stiffer");
        assert!((medium.vp_max() - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_density() {
        let mut medium = Medium::homogeneous(10, 10, 10.0, 10.0, 2000.0, 2000.0);
        medium.density[37] = 0.0;
        assert!(matches!(
            medium.validate(),
            Err(ConfigError::NonPositiveMaterial {
                name: "density",
                cell: 37
            })
        ));
    }

    #[test]
    fn test_rejects_nan_material() {
        let mut medium = Medium::homogeneous(10, 10, 10.0, 10.0, 2000.0, 2000.0);
        medium.bulk_modulus[3] = f64::NAN;
        assert!(matches!(
            medium.validate(),
            Err(ConfigError::NonFiniteMaterial { .. })
        ));
    }

    #[test]
    fn test_rejects_half_elastic() {
        let mut medium = Medium::homogeneous(10, 10, 10.0, 10.0, 2000.0, 2000.0);
        medium.lame_lambda = Some(vec![1e9; 100]);
        assert!(matches!(
            medium.validate(),
            Err(ConfigError::ElasticParamsIncomplete)
        ));
    }

    #[test]
    fn test_elastic_vp_max() {
        let medium = Medium::homogeneous_elastic(10, 10, 5.0, 5.0, 3000.0, 1500.0, 2200.0);
        assert!(medium.is_elastic());
        assert!((medium.vp_max() - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn test_reference_means() {
        let medium = Medium::homogeneous(4, 4, 1.0, 1.0, 1000.0, 1000.0);
        let reference = medium.reference();
        assert!((reference.density - 1000.0).abs() < 1e-9);
        assert!((reference.bulk_modulus - 1e9).abs() < 1.0);
    }
}
