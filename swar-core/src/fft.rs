//! # Spectrum Module
//!
//! Magnitude spectra of voice frames, used to refine YIN estimates.
//! Frames of any length are accepted; each one is centred and Hann
//! windowed before the transform.

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;

/// Centres a frame on zero and tapers it with a Hann window.
fn prepare_frame(signal: &[f32]) -> Vec<Complex<f32>> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = signal.iter().sum::<f32>() / n as f32;
    let span = (n.max(2) - 1) as f32;
    signal
        .iter()
        .enumerate()
        .map(|(i, &sample)| {
            let window = if n < 2 { 1.0 } else { 0.5 * (1.0 - (2.0 * PI * i as f32 / span).cos()) };
            Complex::new((sample - mean) * window, 0.0)
        })
        .collect()
}

/// Forward FFT of a prepared frame. The spectrum has the input's length.
pub fn perform_fft(signal: &[f32]) -> Vec<Complex<f32>> {
    let mut buffer = prepare_frame(signal);
    if !buffer.is_empty() {
        FftPlanner::new().plan_fft_forward(buffer.len()).process(&mut buffer);
    }
    buffer
}

/// Magnitudes of the bins below Nyquist.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum[..spectrum.len() / 2].iter().copied().map(Complex::norm).collect()
}

/// Shorthand for `spectrum_to_magnitudes(&perform_fft(signal))`.
pub fn magnitude_spectrum(signal: &[f32]) -> Vec<f32> {
    spectrum_to_magnitudes(&perform_fft(signal))
}

/// Centre frequency of `bin` in a spectrum of a `frame_len` frame.
pub fn bin_frequency(bin: f32, frame_len: usize, sample_rate: u32) -> f32 {
    if frame_len == 0 {
        return 0.0;
    }
    bin * sample_rate as f32 / frame_len as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_bin_matches_tone() {
        let rate = 8_000;
        let len = 1024;
        // 500 Hz falls exactly on bin 64 at this rate and length.
        let signal: Vec<f32> = (0..len)
            .map(|i| (2.0 * PI * 500.0 * i as f32 / rate as f32).sin())
            .collect();
        let magnitudes = magnitude_spectrum(&signal);
        assert_eq!(magnitudes.len(), len / 2);
        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .expect("non-empty spectrum");
        assert_eq!(peak, 64);
        assert_eq!(bin_frequency(peak as f32, len, rate), 500.0);
    }

    #[test]
    fn dc_offset_does_not_reach_bin_zero() {
        let magnitudes = magnitude_spectrum(&[0.25; 256]);
        assert!(magnitudes[0] < 1e-3);
    }

    #[test]
    fn empty_signal_gives_empty_spectrum() {
        assert!(perform_fft(&[]).is_empty());
        assert!(magnitude_spectrum(&[]).is_empty());
    }
}
