use std::f32::consts::{FRAC_1_SQRT_2, PI};

use log::warn;

use crate::error::ScopeError;

pub const DEFAULT_LOW_HZ: f32 = 0.5;
pub const DEFAULT_HIGH_HZ: f32 = 8.0;

const NORM_EPSILON: f32 = 1e-8;

/// Numeric collaborator seam: band-pass filtering plus robust normalization
/// over fixed-length arrays.
pub trait SignalFilter {
    fn bandpass(
        &self,
        samples: &[f32],
        low_hz: f32,
        high_hz: f32,
        sample_rate_hz: f64,
    ) -> Result<Vec<f32>, ScopeError>;

    /// Reduced-argument variant for collaborators that assume their own
    /// sampling rate.
    fn bandpass_unsampled(
        &self,
        samples: &[f32],
        low_hz: f32,
        high_hz: f32,
    ) -> Result<Vec<f32>, ScopeError>;

    fn normalize(&self, samples: &[f32]) -> Result<Vec<f32>, ScopeError>;
}

/// Applies band-pass + normalization with a tiered fallback policy: the full
/// collaborator call, then the reduced call, then a deterministic default.
/// Each downgrade is logged. Output length always equals input length.
pub struct Preprocessor {
    filter: Box<dyn SignalFilter>,
    low_hz: f32,
    high_hz: f32,
    sample_rate_hz: f64,
}

impl Preprocessor {
    pub fn new(
        filter: Box<dyn SignalFilter>,
        low_hz: f32,
        high_hz: f32,
        sample_rate_hz: f64,
    ) -> Self {
        Self {
            filter,
            low_hz,
            high_hz,
            sample_rate_hz,
        }
    }

    /// Built-in biquad collaborator over the default 0.5-8 Hz band.
    pub fn with_default_band(sample_rate_hz: f64) -> Self {
        Self::new(
            Box::new(BiquadBandpass::new(sample_rate_hz)),
            DEFAULT_LOW_HZ,
            DEFAULT_HIGH_HZ,
            sample_rate_hz,
        )
    }

    /// Filter then normalize. Collaborator failures never escape; the worst
    /// case is an unfiltered z-scored copy of the input.
    pub fn process(&self, values: &[f32]) -> Vec<f32> {
        let filtered = self.filtered(values);
        match checked_len(self.filter.normalize(&filtered), values.len()) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!("robust normalization failed ({err}); falling back to z-score");
                zscore(&filtered)
            }
        }
    }

    fn filtered(&self, values: &[f32]) -> Vec<f32> {
        match checked_len(
            self.filter
                .bandpass(values, self.low_hz, self.high_hz, self.sample_rate_hz),
            values.len(),
        ) {
            Ok(filtered) => return filtered,
            Err(err) => warn!("band-pass with sampling rate failed ({err}); retrying reduced call"),
        }
        match checked_len(
            self.filter
                .bandpass_unsampled(values, self.low_hz, self.high_hz),
            values.len(),
        ) {
            Ok(filtered) => filtered,
            Err(err) => {
                warn!("band-pass fallback failed ({err}); passing signal through unfiltered");
                values.to_vec()
            }
        }
    }
}

fn checked_len(
    result: Result<Vec<f32>, ScopeError>,
    expected: usize,
) -> Result<Vec<f32>, ScopeError> {
    let values = result?;
    if values.len() != expected {
        return Err(ScopeError::Filter(format!(
            "collaborator returned {} samples, expected {expected}",
            values.len()
        )));
    }
    Ok(values)
}

/// Mean/std rescaling, the deterministic last-resort normalization.
pub fn zscore(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
    let std = variance.sqrt();
    values
        .iter()
        .map(|v| (v - mean) / (std + NORM_EPSILON))
        .collect()
}

/// Default collaborator: a high-pass/low-pass biquad cascade with
/// median/IQR normalization. Stateless across calls; each call designs fresh
/// sections for the requested band.
pub struct BiquadBandpass {
    sample_rate_hz: f64,
}

impl BiquadBandpass {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self { sample_rate_hz }
    }

    fn run(&self, samples: &[f32], low_hz: f32, high_hz: f32, fs: f64) -> Vec<f32> {
        let fs = fs as f32;
        let nyquist = fs * 0.5;
        let low = clamp_to_nyquist(low_hz.min(high_hz), nyquist);
        let high = clamp_to_nyquist(low_hz.max(high_hz), nyquist);
        let mut highpass = Biquad::highpass(low, fs, FRAC_1_SQRT_2);
        let mut lowpass = Biquad::lowpass(high, fs, FRAC_1_SQRT_2);
        samples
            .iter()
            .map(|&v| lowpass.process(highpass.process(v)))
            .collect()
    }
}

impl SignalFilter for BiquadBandpass {
    fn bandpass(
        &self,
        samples: &[f32],
        low_hz: f32,
        high_hz: f32,
        sample_rate_hz: f64,
    ) -> Result<Vec<f32>, ScopeError> {
        if sample_rate_hz <= 0.0 {
            return Err(ScopeError::InvalidSampleRate);
        }
        Ok(self.run(samples, low_hz, high_hz, sample_rate_hz))
    }

    fn bandpass_unsampled(
        &self,
        samples: &[f32],
        low_hz: f32,
        high_hz: f32,
    ) -> Result<Vec<f32>, ScopeError> {
        self.bandpass(samples, low_hz, high_hz, self.sample_rate_hz)
    }

    fn normalize(&self, samples: &[f32]) -> Result<Vec<f32>, ScopeError> {
        Ok(robust_normalize(samples))
    }
}

/// Median/IQR rescaling; flat inputs divide by the epsilon alone, which keeps
/// the output finite.
pub fn robust_normalize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = percentile(&sorted, 0.5);
    let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);
    values
        .iter()
        .map(|v| (v - median) / (iqr + NORM_EPSILON))
        .collect()
}

fn percentile(sorted: &[f32], p: f32) -> f32 {
    let pos = p * (sorted.len() - 1) as f32;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn clamp_to_nyquist(freq_hz: f32, nyquist: f32) -> f32 {
    let upper = (nyquist - 0.01).max(0.01);
    freq_hz.clamp(0.01, upper)
}

/// Single biquad section, transposed direct form II.
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    fn lowpass(cutoff_hz: f32, sample_rate_hz: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate_hz;
        let alpha = (w0 / 2.0).sin() / (2.0 * q);
        let cos_w0 = w0.cos();
        let b0 = (1.0 - cos_w0) * 0.5;
        Self::normalized(b0, 1.0 - cos_w0, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    fn highpass(cutoff_hz: f32, sample_rate_hz: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate_hz;
        let alpha = (w0 / 2.0).sin() / (2.0 * q);
        let cos_w0 = w0.cos();
        let b0 = (1.0 + cos_w0) * 0.5;
        Self::normalized(
            b0,
            -(1.0 + cos_w0),
            b0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collaborator whose full-featured call always fails, for fallback tests.
    struct NoRateFilter;

    impl SignalFilter for NoRateFilter {
        fn bandpass(
            &self,
            _samples: &[f32],
            _low_hz: f32,
            _high_hz: f32,
            _sample_rate_hz: f64,
        ) -> Result<Vec<f32>, ScopeError> {
            Err(ScopeError::Filter("sampling rate not supported".into()))
        }

        fn bandpass_unsampled(
            &self,
            samples: &[f32],
            _low_hz: f32,
            _high_hz: f32,
        ) -> Result<Vec<f32>, ScopeError> {
            Ok(samples.iter().map(|v| v * 2.0).collect())
        }

        fn normalize(&self, _samples: &[f32]) -> Result<Vec<f32>, ScopeError> {
            Err(ScopeError::Filter("normalize unavailable".into()))
        }
    }

    /// Collaborator that fails every call.
    struct BrokenFilter;

    impl SignalFilter for BrokenFilter {
        fn bandpass(
            &self,
            _samples: &[f32],
            _low_hz: f32,
            _high_hz: f32,
            _sample_rate_hz: f64,
        ) -> Result<Vec<f32>, ScopeError> {
            Err(ScopeError::Filter("broken".into()))
        }

        fn bandpass_unsampled(
            &self,
            _samples: &[f32],
            _low_hz: f32,
            _high_hz: f32,
        ) -> Result<Vec<f32>, ScopeError> {
            Err(ScopeError::Filter("broken".into()))
        }

        fn normalize(&self, _samples: &[f32]) -> Result<Vec<f32>, ScopeError> {
            Err(ScopeError::Filter("broken".into()))
        }
    }

    /// Collaborator that returns the wrong number of samples.
    struct TruncatingFilter;

    impl SignalFilter for TruncatingFilter {
        fn bandpass(
            &self,
            samples: &[f32],
            _low_hz: f32,
            _high_hz: f32,
            _sample_rate_hz: f64,
        ) -> Result<Vec<f32>, ScopeError> {
            Ok(samples[..samples.len() / 2].to_vec())
        }

        fn bandpass_unsampled(
            &self,
            samples: &[f32],
            _low_hz: f32,
            _high_hz: f32,
        ) -> Result<Vec<f32>, ScopeError> {
            Ok(samples[..samples.len() / 2].to_vec())
        }

        fn normalize(&self, samples: &[f32]) -> Result<Vec<f32>, ScopeError> {
            Ok(samples.to_vec())
        }
    }

    #[test]
    fn default_preprocessor_preserves_length() {
        let preprocessor = Preprocessor::with_default_band(25.0);
        for n in [1usize, 3, 64, 250] {
            let input: Vec<f32> = (0..n).map(|i| (i as f32 * 0.3).sin()).collect();
            assert_eq!(preprocessor.process(&input).len(), n);
        }
    }

    #[test]
    fn reduced_call_used_when_rate_unsupported() {
        let preprocessor = Preprocessor::new(Box::new(NoRateFilter), 0.5, 8.0, 25.0);
        let input = vec![1.0, 2.0, 3.0, 4.0];
        // Filter tier doubles, normalize tier falls back to z-score of that.
        let expected = zscore(&[2.0, 4.0, 6.0, 8.0]);
        assert_eq!(preprocessor.process(&input), expected);
    }

    #[test]
    fn fully_broken_collaborator_yields_zscored_input() {
        let preprocessor = Preprocessor::new(Box::new(BrokenFilter), 0.5, 8.0, 25.0);
        let input = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(preprocessor.process(&input), zscore(&input));
    }

    #[test]
    fn length_mismatch_counts_as_failure() {
        let preprocessor = Preprocessor::new(Box::new(TruncatingFilter), 0.5, 8.0, 25.0);
        let input = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let output = preprocessor.process(&input);
        assert_eq!(output.len(), input.len());
    }

    #[test]
    fn zscore_of_flat_signal_is_finite() {
        let output = zscore(&[3.0; 16]);
        assert!(output.iter().all(|v| v.is_finite()));
        assert!(output.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn robust_normalize_of_flat_signal_is_finite() {
        let output = robust_normalize(&[7.5; 16]);
        assert!(output.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn robust_normalize_centers_on_median() {
        let output = robust_normalize(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        // The median element maps to zero regardless of the outlier.
        assert!(output[2].abs() < 1e-6);
        assert!(output[4] > output[3]);
    }

    #[test]
    fn biquad_bandpass_attenuates_dc() {
        let filter = BiquadBandpass::new(25.0);
        let flat = vec![5.0; 512];
        let filtered = filter.bandpass(&flat, 0.5, 8.0, 25.0).unwrap();
        // A high-pass stage drives a constant signal toward zero.
        let tail_mean: f32 = filtered[384..].iter().sum::<f32>() / 128.0;
        assert!(tail_mean.abs() < 0.5, "tail mean {tail_mean}");
    }

    #[test]
    fn biquad_rejects_bad_sample_rate() {
        let filter = BiquadBandpass::new(25.0);
        assert!(filter.bandpass(&[1.0], 0.5, 8.0, 0.0).is_err());
    }
}
