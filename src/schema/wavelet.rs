//! Source time series and resampling.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// A sampled source time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wavelet {
    /// Sampling interval in seconds.
    pub dt: f64,
    /// Samples starting at t = 0.
    pub samples: Vec<f64>,
}

impl Wavelet {
    pub fn new(dt: f64, samples: Vec<f64>) -> Self {
        Self { dt, samples }
    }

    /// Ricker wavelet with the given peak frequency, peaking at `t_peak`.
    ///
    /// `w(t) = (1 - 2 a) exp(-a)` with `a = (pi f (t - t_peak))^2`.
    pub fn ricker(peak_freq: f64, dt: f64, n: usize, t_peak: f64) -> Self {
        let samples = (0..n)
            .map(|i| {
                let arg = std::f64::consts::PI * peak_freq * (i as f64 * dt - t_peak);
                let a = arg * arg;
                (1.0 - 2.0 * a) * (-a).exp()
            })
            .collect();
        Self { dt, samples }
    }

    /// Duration covered by the samples.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.dt * self.samples.len().saturating_sub(1) as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ConfigError::NonPositiveWaveletInterval);
        }
        Ok(())
    }

    /// Resample to a new interval by linear interpolation.
    ///
    /// Produces `n_out` samples; times past the original duration are
    /// zero. Identical intervals copy (and zero-pad) directly.
    pub fn resample(&self, dt_out: f64, n_out: usize) -> Vec<f64> {
        let mut out = vec![0.0; n_out];
        if self.samples.is_empty() {
            return out;
        }
        if (dt_out - self.dt).abs() < 1e-12 * self.dt {
            let n = n_out.min(self.samples.len());
            out[..n].copy_from_slice(&self.samples[..n]);
            return out;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            let t = i as f64 * dt_out;
            let pos = t / self.dt;
            let i0 = pos.floor() as usize;
            if i0 + 1 < self.samples.len() {
                let frac = pos - i0 as f64;
                *slot = self.samples[i0] * (1.0 - frac) + self.samples[i0 + 1] * frac;
            } else if i0 < self.samples.len() {
                *slot = self.samples[i0];
            }
        }
        out
    }

    /// Cumulative time integral of the samples, same sampling.
    ///
    /// Used for sources whose wavelet is supplied as a time derivative.
    pub fn integrated(&self) -> Vec<f64> {
        let mut acc = 0.0;
        self.samples
            .iter()
            .map(|&s| {
                acc += s * self.dt;
                acc
            })
            .collect()
    }
}

/// Linear resampling of an already-gridded trace, shared by gather output.
pub(crate) fn resample_linear(samples: &[f64], dt_in: f64, dt_out: f64, n_out: usize) -> Vec<f64> {
    Wavelet::new(dt_in, samples.to_vec()).resample(dt_out, n_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ricker_peaks_at_t_peak() {
        let freq = 10.0;
        let dt = 1e-3;
        let t_peak = 0.1;
        let w = Wavelet::ricker(freq, dt, 400, t_peak);
        let (imax, _) = w
            .samples
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |(bi, bv), (i, &v)| {
                if v > bv { (i, v) } else { (bi, bv) }
            });
        assert_eq!(imax, 100, "Ricker maximum should sit at t_peak");
        assert!((w.samples[100] - 1.0).abs() < 1e-12, "unit peak amplitude");
    }

    #[test]
    fn test_ricker_zero_mean() {
        let w = Wavelet::ricker(10.0, 1e-3, 1000, 0.5);
        let sum: f64 = w.samples.iter().sum();
        assert!(
            sum.abs() < 1e-6,
            "Ricker should integrate to ~0, got {}",
            sum
        );
    }

    #[test]
    fn test_resample_identity() {
        let w = Wavelet::new(1e-3, vec![1.0, 2.0, 3.0]);
        let out = w.resample(1e-3, 5);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resample_halved_interval() {
        let w = Wavelet::new(2e-3, vec![0.0, 2.0, 4.0]);
        let out = w.resample(1e-3, 5);
        for (i, expected) in [0.0, 1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            assert!(
                (out[i] - expected).abs() < 1e-12,
                "sample {}: {} vs {}",
                i,
                out[i],
                expected
            );
        }
    }

    #[test]
    fn test_resample_past_end_is_zero() {
        let w = Wavelet::new(1e-3, vec![5.0, 5.0]);
        let out = w.resample(4e-3, 3);
        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_integrated_ramp() {
        let w = Wavelet::new(0.5, vec![2.0, 2.0, 2.0]);
        assert_eq!(w.integrated(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rejects_bad_interval() {
        let w = Wavelet::new(-1.0, vec![1.0]);
        assert!(matches!(
            w.validate(),
            Err(ConfigError::NonPositiveWaveletInterval)
        ));
    }
}
