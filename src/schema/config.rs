//! Simulation configuration types.

use serde::{Deserialize, Serialize};

/// Wave physics propagated by the engine.
///
/// Selected once per run; the stepper is dispatched at run start, not per
/// time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Physics {
    /// First-order acoustic system (pressure + particle velocities).
    Acoustic,
    /// Linearized (Born) acoustic scattering over a background medium.
    AcousticBorn,
    /// Isotropic elastic system (stress tensor + particle velocities).
    Elastic,
}

/// Top-level simulation configuration.
///
/// Grid geometry and material parameters come from the [`Medium`]; this
/// struct holds everything else: time discretization, absorbing-boundary
/// width and tuning, physics variant, and output options.
///
/// The caller is responsible for supplying a CFL-stable `dt` for the grid
/// and medium; the engine does not enforce it.
///
/// [`Medium`]: crate::schema::Medium
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Internal time step in seconds.
    pub dt: f64,
    /// Number of time steps per shot.
    pub nt: usize,
    /// Absorbing boundary thickness in cells (padding on every face).
    pub npml: usize,
    /// Physics variant.
    #[serde(default = "default_physics")]
    pub physics: Physics,
    /// Output sampling interval for gathers. `None` records at `dt`.
    #[serde(default)]
    pub dt_out: Option<f64>,
    /// Compute the adjoint-state gradient (requires observed data).
    #[serde(default)]
    pub gradient: bool,
    /// Accumulate source-side illumination alongside the gradient.
    #[serde(default)]
    pub illumination: bool,
    /// Normalize the stacked gradient by stacked illumination.
    #[serde(default)]
    pub illumination_normalize: bool,
    /// Time-step indices at which to capture interior pressure snapshots.
    #[serde(default)]
    pub snapshot_steps: Vec<usize>,
    /// Absorbing boundary tuning.
    #[serde(default)]
    pub cpml: CpmlConfig,
}

fn default_physics() -> Physics {
    Physics::Acoustic
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            nt: 1000,
            npml: 20,
            physics: Physics::Acoustic,
            dt_out: None,
            gradient: false,
            illumination: false,
            illumination_normalize: false,
            snapshot_steps: Vec::new(),
            cpml: CpmlConfig::default(),
        }
    }
}

/// Tuning knobs for the convolutional absorbing boundary.
///
/// The damping profile itself is derived from the medium's maximum
/// velocity and the boundary geometry; these knobs cover the remaining
/// free parameters of the standard formulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpmlConfig {
    /// Maximum coordinate-stretching factor. 1.0 disables stretching.
    pub kappa_max: f64,
    /// Dominant source frequency in Hz used for the low-frequency
    /// absorption term (alpha grading).
    pub alpha_freq: f64,
}

impl Default for CpmlConfig {
    fn default() -> Self {
        Self {
            kappa_max: 1.0,
            alpha_freq: 10.0,
        }
    }
}

impl SimulationConfig {
    /// Output sampling interval, defaulting to the internal step.
    #[inline]
    pub fn dt_out(&self) -> f64 {
        self.dt_out.unwrap_or(self.dt)
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ConfigError::NonPositiveTimeStep);
        }
        if self.nt == 0 {
            return Err(ConfigError::NonPositiveStepCount);
        }
        if self.npml == 0 {
            return Err(ConfigError::NonPositiveBoundaryWidth);
        }
        if let Some(dt_out) = self.dt_out {
            if !(dt_out >= self.dt) || !dt_out.is_finite() {
                return Err(ConfigError::InvalidOutputInterval {
                    dt_out,
                    dt: self.dt,
                });
            }
        }
        if self.cpml.kappa_max < 1.0 || !self.cpml.kappa_max.is_finite() {
            return Err(ConfigError::InvalidCpmlTuning);
        }
        if self.cpml.alpha_freq < 0.0 || !self.cpml.alpha_freq.is_finite() {
            return Err(ConfigError::InvalidCpmlTuning);
        }
        for &step in &self.snapshot_steps {
            if step >= self.nt {
                return Err(ConfigError::SnapshotStepOutOfRange { step, nt: self.nt });
            }
        }
        if (self.illumination && !self.gradient)
            || (self.illumination_normalize && !self.illumination)
        {
            return Err(ConfigError::InvalidIlluminationConfig);
        }
        Ok(())
    }
}

/// Configuration validation errors.
///
/// All of these are reported before any time stepping begins; a failed
/// update or run never leaves partially stepped state behind.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Time step must be positive and finite")]
    NonPositiveTimeStep,
    #[error("Step count must be non-zero")]
    NonPositiveStepCount,
    #[error("Absorbing boundary thickness must be non-zero")]
    NonPositiveBoundaryWidth,
    #[error("Output interval {dt_out} must be >= internal step {dt}")]
    InvalidOutputInterval { dt_out: f64, dt: f64 },
    #[error("CPML tuning parameters out of range")]
    InvalidCpmlTuning,
    #[error("Snapshot step {step} is outside the run of {nt} steps")]
    SnapshotStepOutOfRange { step: usize, nt: usize },
    #[error("Illumination accumulation requires gradient mode; normalization requires illumination")]
    InvalidIlluminationConfig,
    #[error("Medium dimensions must be non-zero with positive spacings")]
    InvalidDimensions,
    #[error("Medium array {name} has {got} cells, expected {expected}")]
    MediumShapeMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Medium parameter {name} is not positive at cell {cell}")]
    NonPositiveMaterial { name: &'static str, cell: usize },
    #[error("Medium parameter {name} is not finite at cell {cell}")]
    NonFiniteMaterial { name: &'static str, cell: usize },
    #[error("Elastic physics requires both lambda and shear modulus grids")]
    ElasticParamsIncomplete,
    #[error("Acquisition has no shots")]
    EmptyAcquisition,
    #[error("Shot {shot} has no {what}")]
    EmptyShot { shot: usize, what: &'static str },
    #[error(
        "{kind} {index} of shot {shot} at (x={x}, z={z}) lies in the absorbing \
         boundary or outside the grid"
    )]
    OutOfDomain {
        shot: usize,
        kind: &'static str,
        index: usize,
        x: f64,
        z: f64,
    },
    #[error("Wavelet table covers {got} shots, acquisition has {expected}")]
    WaveletShotMismatch { expected: usize, got: usize },
    #[error("Shot {shot}: wavelet table covers {got} sources, acquisition has {expected}")]
    WaveletSourceMismatch {
        shot: usize,
        expected: usize,
        got: usize,
    },
    #[error(
        "Shot {shot}, source {source_index}: wavelet provides {got} samples at the \
         simulation step, run needs {needed}"
    )]
    WaveletTooShort {
        shot: usize,
        source_index: usize,
        needed: usize,
        got: usize,
    },
    #[error("Wavelet sampling interval must be positive and finite")]
    NonPositiveWaveletInterval,
    #[error("Observed data covers {got} shots, acquisition has {expected}")]
    ObservedShotMismatch { expected: usize, got: usize },
    #[error("Observed data for shot {shot} has {got} samples, expected {expected}")]
    ObservedShapeMismatch {
        shot: usize,
        expected: usize,
        got: usize,
    },
    #[error("Gradient computation is defined for acoustic physics only")]
    GradientRequiresAcoustic,
    #[error("Gradient computation requires observed data")]
    GradientRequiresObserved,
    #[error("Born physics requires a perturbation medium")]
    BornRequiresPerturbation,
    #[error("Perturbation medium dimensions do not match the background")]
    PerturbationShapeMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_time_step() {
        let config = SimulationConfig {
            dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveTimeStep)
        ));
    }

    #[test]
    fn test_rejects_zero_boundary() {
        let config = SimulationConfig {
            npml: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveBoundaryWidth)
        ));
    }

    #[test]
    fn test_rejects_output_interval_below_dt() {
        let config = SimulationConfig {
            dt: 2e-3,
            dt_out: Some(1e-3),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOutputInterval { .. })
        ));
    }

    #[test]
    fn test_rejects_snapshot_past_end() {
        let config = SimulationConfig {
            nt: 100,
            snapshot_steps: vec![50, 100],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SnapshotStepOutOfRange { step: 100, .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig {
            physics: Physics::Elastic,
            snapshot_steps: vec![10, 20],
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.physics, Physics::Elastic);
        assert_eq!(back.snapshot_steps, vec![10, 20]);
        assert_eq!(back.npml, config.npml);
    }
}
