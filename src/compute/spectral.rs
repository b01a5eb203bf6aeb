//! FFT-based trace analysis helpers.
//!
//! Used for measuring arrival-time lags between receiver traces; the
//! propagation core itself never leaves the time domain.

use num_complex::Complex;
use rustfft::FftPlanner;

/// Circular cross-correlation of two equal-length traces via FFT.
///
/// `out[lag]` correlates `a` against `b` delayed by `lag` samples; lags
/// wrap, so `out[n - k]` is a delay of `-k`.
pub fn cross_correlate(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len());
    let n = a.len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut fa: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let mut fb: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut fa);
    fft.process(&mut fb);

    let mut prod: Vec<Complex<f64>> = fa
        .iter()
        .zip(fb.iter())
        .map(|(x, y)| x.conj() * y)
        .collect();
    ifft.process(&mut prod);

    let scale = 1.0 / n as f64;
    prod.iter().map(|c| c.re * scale).collect()
}

/// Delay of `b` relative to `a`, in samples, by the cross-correlation
/// peak. Positive means `b` arrives later.
pub fn best_lag(a: &[f64], b: &[f64]) -> isize {
    let xc = cross_correlate(a, b);
    let n = xc.len();
    let (imax, _) = xc
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |(bi, bv), (i, &v)| {
            if v > bv { (i, v) } else { (bi, bv) }
        });
    if imax <= n / 2 {
        imax as isize
    } else {
        imax as isize - n as isize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(n: usize, center: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let d = i as f64 - center as f64;
                (-d * d / 8.0).exp()
            })
            .collect()
    }

    #[test]
    fn test_lag_of_shifted_pulse() {
        let a = pulse(256, 60);
        let b = pulse(256, 85);
        assert_eq!(best_lag(&a, &b), 25);
        assert_eq!(best_lag(&b, &a), -25);
    }

    #[test]
    fn test_zero_lag_for_identical_traces() {
        let a = pulse(128, 40);
        assert_eq!(best_lag(&a, &a), 0);
    }

    #[test]
    fn test_correlation_peak_value() {
        let a = pulse(128, 40);
        let xc = cross_correlate(&a, &a);
        let energy: f64 = a.iter().map(|&v| v * v).sum();
        assert!((xc[0] - energy).abs() < 1e-9, "zero-lag autocorrelation");
    }
}
