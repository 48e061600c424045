//! # Pitch Estimation Module
//!
//! This module provides the fundamental frequency estimator that feeds the
//! detection loop. The loop only depends on the [`PitchEstimator`] trait, so
//! any other estimator can be plugged in; [`YinEstimator`] is the default.
//!
//! ## Features
//! - YIN pitch detection with an absolute threshold
//! - Parabolic interpolation for sub-sample accuracy
//! - Optional spectrum refinement for improved precision

use crate::fft;

/// Default YIN absolute threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.15;

/// Anything that turns a frame of samples into a fundamental frequency.
pub trait PitchEstimator {
    /// Estimates the fundamental frequency of `samples` in Hz.
    ///
    /// Returns `None` when the frame has no clear pitch.
    fn estimate(&mut self, samples: &[f32], sample_rate: u32) -> Option<f32>;
}

/// YIN estimator tuned for the singing voice.
#[derive(Debug, Clone)]
pub struct YinEstimator {
    /// Absolute threshold on the normalised difference function.
    threshold: f32,
    /// Whether to polish the YIN estimate against the FFT spectrum.
    refine: bool,
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl YinEstimator {
    /// Creates an estimator with the given absolute threshold.
    ///
    /// Lower thresholds reject more frames but make fewer octave errors.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            refine: false,
        }
    }

    /// Enables spectrum refinement of each estimate.
    pub fn with_refinement(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, samples: &[f32], sample_rate: u32) -> Option<f32> {
        let rough = detect_pitch_yin(samples, sample_rate, self.threshold)?;
        if !self.refine {
            return Some(rough);
        }
        let spectrum = fft::magnitude_spectrum(samples);
        refine_from_spectrum(&spectrum, samples.len(), rough, sample_rate)
    }
}

/// An implementation of the YIN pitch detection algorithm.
///
/// # Arguments
/// * `signal` - Input audio signal
/// * `sample_rate` - Sample rate in Hz
/// * `threshold` - Absolute threshold on the normalised difference
///
/// # Returns
/// * `Some(frequency)` - Detected frequency in Hz
/// * `None` - No pitch detected (silence, noise, or invalid signal)
pub fn detect_pitch_yin(signal: &[f32], sample_rate: u32, threshold: f32) -> Option<f32> {
    let half = signal.len() / 2;
    if half < 3 || sample_rate == 0 {
        return None;
    }
    let mut yin_buffer = vec![0.0f32; half];

    // --- Step 1 & 2: Difference function ---
    for tau in 1..half {
        let mut diff = 0.0;
        for i in 0..half {
            let delta = signal[i] - signal[i + tau];
            diff += delta * delta;
        }
        yin_buffer[tau] = diff;
    }

    // --- Step 3: Cumulative mean normalized difference ---
    let mut running_sum = 0.0;
    yin_buffer[0] = 1.0;
    for tau in 1..half {
        running_sum += yin_buffer[tau];
        if running_sum != 0.0 {
            yin_buffer[tau] *= tau as f32 / running_sum;
        } else {
            yin_buffer[tau] = 1.0;
        }
    }

    // --- Step 4: Absolute threshold, then walk down to the local minimum ---
    let mut period = None;
    let mut tau = 2;
    while tau < half {
        if yin_buffer[tau] < threshold {
            while tau + 1 < half && yin_buffer[tau + 1] < yin_buffer[tau] {
                tau += 1;
            }
            period = Some(tau);
            break;
        }
        tau += 1;
    }
    let period = period?;

    // --- Step 5: Parabolic interpolation for better precision ---
    let period_float = if period + 1 < half {
        let y1 = yin_buffer[period - 1];
        let y2 = yin_buffer[period];
        let y3 = yin_buffer[period + 1];
        let denominator = 2.0 * (y1 - 2.0 * y2 + y3);
        if denominator != 0.0 {
            period as f32 + (y1 - y3) / denominator
        } else {
            period as f32
        }
    } else {
        period as f32
    };

    let frequency = sample_rate as f32 / period_float;

    if frequency.is_finite() && frequency > 20.0 {
        Some(frequency)
    } else {
        None
    }
}

/// Refines a frequency estimate using a pre-computed magnitude spectrum.
///
/// Looks for the strongest bin near the estimate and interpolates the
/// log magnitudes around it to get sub-bin accuracy.
///
/// # Arguments
/// * `spectrum_magnitudes` - Magnitude spectrum from FFT
/// * `frame_len` - Length of the frame the spectrum was taken from
/// * `rough_freq` - Initial frequency estimate in Hz
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// * `Some(refined_freq)` - Refined frequency estimate, or the rough one
///   when refinement is not possible
/// * `None` - The rough estimate was not a positive frequency
pub fn refine_from_spectrum(
    spectrum_magnitudes: &[f32],
    frame_len: usize,
    rough_freq: f32,
    sample_rate: u32,
) -> Option<f32> {
    if rough_freq <= 0.0 {
        return None;
    }
    // Odd frames have one more sample than twice the bin count.
    if spectrum_magnitudes.len() < 3 || frame_len / 2 != spectrum_magnitudes.len() || sample_rate == 0 {
        return Some(rough_freq);
    }
    let buffer_size = frame_len;
    let target_bin = (rough_freq * buffer_size as f32) / sample_rate as f32;
    let search_radius = 2.0;
    let start_bin = (target_bin - search_radius).max(0.0) as usize;
    let end_bin = (target_bin + search_radius).min((spectrum_magnitudes.len() - 1) as f32) as usize;
    if start_bin >= end_bin {
        return Some(rough_freq);
    }

    let peak_bin = match spectrum_magnitudes[start_bin..=end_bin]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        Some((offset, _)) => start_bin + offset,
        None => return Some(rough_freq),
    };

    if peak_bin == 0 || peak_bin >= spectrum_magnitudes.len() - 1 {
        return Some(rough_freq);
    }

    let y1 = spectrum_magnitudes[peak_bin - 1].ln();
    let y2 = spectrum_magnitudes[peak_bin].ln();
    let y3 = spectrum_magnitudes[peak_bin + 1].ln();

    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return Some(rough_freq);
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return Some(rough_freq);
    }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    let interpolated_bin = peak_bin as f32 + peak_shift;
    let final_freq = fft::bin_frequency(interpolated_bin, buffer_size, sample_rate);

    if final_freq.is_finite() && final_freq > 0.0 {
        Some(final_freq)
    } else {
        Some(rough_freq)
    }
}
