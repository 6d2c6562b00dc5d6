// Spectral buzzer detection over raw PCM frames
// Computes an FFT per frame and checks the dominant bin against the
// configured frequency band and magnitude threshold

use crate::constants::{
    BUZZER_FREQ_MAX_HZ, BUZZER_FREQ_MIN_HZ, BUZZER_MAGNITUDE_THRESHOLD, DEFAULT_SAMPLE_RATE,
    FFT_LEN,
};
use crate::trace;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Configuration for spectral buzzer detection
///
/// Frequency bounds and the magnitude threshold are deployment tuning, not
/// code: different buzzers and microphones need different calibration.
#[derive(Debug, Clone)]
pub struct SpectralConfig {
    /// Sample rate of incoming frames (Hz)
    pub sample_rate: u32,
    /// Transform length in samples; must be a power of two
    pub fft_len: usize,
    /// Lower bound of the target band (Hz)
    pub freq_min_hz: f64,
    /// Upper bound of the target band (Hz)
    pub freq_max_hz: f64,
    /// Squared-magnitude threshold a peak must exceed
    pub magnitude_threshold: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_len: FFT_LEN,
            freq_min_hz: BUZZER_FREQ_MIN_HZ,
            freq_max_hz: BUZZER_FREQ_MAX_HZ,
            magnitude_threshold: BUZZER_MAGNITUDE_THRESHOLD,
        }
    }
}

/// Dominant frequency component of one analyzed frame
///
/// Ephemeral: recomputed every frame, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    /// Frequency of the strongest bin (Hz)
    pub frequency_hz: f64,
    /// Squared magnitude (re² + im²) of that bin; no sqrt is taken
    pub magnitude_sq: f64,
}

/// Frequency-domain detector for the buzzer tone
///
/// Purely functional per frame: the only retained state is the cached FFT
/// plan, so the detector is trivially testable with synthetic waveforms.
pub struct SpectralDetector {
    config: SpectralConfig,
    fft: Arc<dyn Fft<f64>>,
}

impl SpectralDetector {
    /// Create a detector with default configuration
    pub fn new() -> Self {
        Self::with_config(SpectralConfig::default())
    }

    /// Create a detector with custom configuration
    pub fn with_config(config: SpectralConfig) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_len);
        Self { config, fft }
    }

    /// Get the configuration
    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    /// Width of one frequency bin (Hz)
    pub fn bin_width_hz(&self) -> f64 {
        self.config.sample_rate as f64 / self.config.fft_len as f64
    }

    /// Extract the dominant spectral peak of a frame
    ///
    /// The frame is zero-padded (or truncated) to the transform length, so a
    /// short read is never an error. Returns `None` for a silent frame where
    /// every bin has zero magnitude.
    pub fn analyze(&self, frame: &[i16]) -> Option<SpectralPeak> {
        let n = self.config.fft_len;
        let mut buf: Vec<Complex<f64>> = (0..n)
            .map(|i| {
                let sample = frame.get(i).copied().unwrap_or(0) as f64;
                Complex::new(sample, 0.0)
            })
            .collect();

        self.fft.process(&mut buf);

        // Only the first N/2 bins are meaningful for a real-valued input
        let mut max_mag = 0.0f64;
        let mut max_idx = 0usize;
        for (i, bin) in buf.iter().take(n / 2).enumerate() {
            let mag = bin.re * bin.re + bin.im * bin.im;
            if mag > max_mag {
                max_mag = mag;
                max_idx = i;
            }
        }

        if max_mag == 0.0 {
            return None;
        }

        let frequency_hz = max_idx as f64 * self.config.sample_rate as f64 / n as f64;
        trace!(
            "[spectral] peak {:.1} Hz, magnitude_sq {:.3e}",
            frequency_hz,
            max_mag
        );
        Some(SpectralPeak {
            frequency_hz,
            magnitude_sq: max_mag,
        })
    }

    /// Check whether a peak satisfies the detection predicate
    pub fn matches(&self, peak: &SpectralPeak) -> bool {
        peak.frequency_hz >= self.config.freq_min_hz
            && peak.frequency_hz <= self.config.freq_max_hz
            && peak.magnitude_sq > self.config.magnitude_threshold
    }

    /// Analyze a frame and report whether the buzzer tone is present
    pub fn detect(&self, frame: &[i16]) -> Option<SpectralPeak> {
        self.analyze(frame).filter(|peak| self.matches(peak))
    }
}

impl Default for SpectralDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate `len` samples of a pure sinusoid at `freq_hz`
    fn sine_frame(freq_hz: f64, amplitude: f64, sample_rate: u32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (amplitude * (2.0 * std::f64::consts::PI * freq_hz * t).sin()) as i16
            })
            .collect()
    }

    /// Deterministic low-amplitude pseudo-noise
    fn noise_frame(amplitude: i16, len: usize) -> Vec<i16> {
        let mut seed: u32 = 0x12345678;
        (0..len)
            .map(|_| {
                // xorshift32
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                ((seed % (2 * amplitude as u32 + 1)) as i32 - amplitude as i32) as i16
            })
            .collect()
    }

    #[test]
    fn test_in_band_sinusoid_detected_within_one_bin() {
        let detector = SpectralDetector::new();
        let freq = 2700.0;
        let frame = sine_frame(freq, 10_000.0, DEFAULT_SAMPLE_RATE, FFT_LEN);

        let peak = detector.detect(&frame).expect("tone should be detected");
        assert!(
            (peak.frequency_hz - freq).abs() <= detector.bin_width_hz(),
            "peak {} Hz more than one bin from {} Hz",
            peak.frequency_hz,
            freq
        );
    }

    #[test]
    fn test_band_edges_detected() {
        let detector = SpectralDetector::new();
        for freq in [2450.0, 2950.0] {
            let frame = sine_frame(freq, 10_000.0, DEFAULT_SAMPLE_RATE, FFT_LEN);
            assert!(detector.detect(&frame).is_some(), "{} Hz should match", freq);
        }
    }

    #[test]
    fn test_out_of_band_tone_rejected() {
        let detector = SpectralDetector::new();
        let frame = sine_frame(1000.0, 10_000.0, DEFAULT_SAMPLE_RATE, FFT_LEN);

        let peak = detector.analyze(&frame).unwrap();
        assert!(peak.magnitude_sq > BUZZER_MAGNITUDE_THRESHOLD);
        assert!(!detector.matches(&peak));
        assert!(detector.detect(&frame).is_none());
    }

    #[test]
    fn test_sub_threshold_noise_rejected() {
        let detector = SpectralDetector::new();
        let frame = noise_frame(3, FFT_LEN);
        assert!(detector.detect(&frame).is_none());
    }

    #[test]
    fn test_silent_frame_yields_no_peak() {
        let detector = SpectralDetector::new();
        let frame = vec![0i16; FFT_LEN];
        assert!(detector.analyze(&frame).is_none());
    }

    #[test]
    fn test_short_frame_is_zero_padded_not_an_error() {
        let detector = SpectralDetector::new();
        // Half a transform worth of in-band tone still dominates the spectrum
        let frame = sine_frame(2700.0, 10_000.0, DEFAULT_SAMPLE_RATE, FFT_LEN / 2);
        let peak = detector.detect(&frame).expect("padded frame should detect");
        assert!((peak.frequency_hz - 2700.0).abs() <= 2.0 * detector.bin_width_hz());
    }

    #[test]
    fn test_oversized_frame_is_truncated() {
        let detector = SpectralDetector::new();
        let frame = sine_frame(2700.0, 10_000.0, DEFAULT_SAMPLE_RATE, FFT_LEN * 2);
        assert!(detector.detect(&frame).is_some());
    }

    #[test]
    fn test_empty_frame_yields_no_peak() {
        let detector = SpectralDetector::new();
        assert!(detector.analyze(&[]).is_none());
    }

    #[test]
    fn test_custom_band_configuration() {
        let config = SpectralConfig {
            freq_min_hz: 900.0,
            freq_max_hz: 1100.0,
            ..Default::default()
        };
        let detector = SpectralDetector::with_config(config);
        let frame = sine_frame(1000.0, 10_000.0, DEFAULT_SAMPLE_RATE, FFT_LEN);
        assert!(detector.detect(&frame).is_some());
    }
}
