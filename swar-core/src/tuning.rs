//! # Swar Tuning Module
//!
//! Maps frequencies onto the twelve Sargam degrees relative to a movable
//! Sa, measures the cents deviation from the nearest degree and grades it.
//!
//! ## Features
//! - Equal temperament semitone and cents calculations against any tonic
//! - Octave placement relative to the tonic octave
//! - Accuracy tiers and correction direction
//! - Degree to frequency conversion and scale generation
//! - MIDI conversions and display formatting
//!
//! Every function here is total: a non-positive frequency or tonic gives a
//! neutral result instead of an error, so a real-time loop never stalls on
//! a bad frame.

use crate::shruti::{self, ShrutiDegree, Variant};
use serde::Serialize;

/// Default Sa frequency (C4) in Hz.
pub const DEFAULT_SA_FREQUENCY: f64 = 261.63;

/// Maximum |cents| still graded as pure.
pub const PURE_CENTS: i32 = 10;

/// Maximum |cents| still graded as acceptable.
pub const ACCEPTABLE_CENTS: i32 = 25;

const CENTS_PER_OCTAVE: f64 = 1200.0;
const CENTS_PER_SEMITONE: f64 = 100.0;

/// How close a sung pitch is to its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    /// Within ±10 cents.
    Pure,
    /// Within ±25 cents.
    Acceptable,
    Off,
}

/// Which way the singer should move to reach the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Higher,
    Lower,
    Correct,
}

/// A frequency placed on the Sargam grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwarReading {
    /// Nearest degree, 0-11.
    pub semitone: u8,
    /// Octave relative to the tonic octave.
    pub octave: i32,
    /// Deviation from the nearest degree, in [-50, 50).
    pub cents: i32,
    pub accuracy: AccuracyTier,
    pub direction: Direction,
}

impl SwarReading {
    /// The reading used for invalid input.
    pub const NEUTRAL: SwarReading = SwarReading {
        semitone: 0,
        octave: 0,
        cents: 0,
        accuracy: AccuracyTier::Pure,
        direction: Direction::Correct,
    };

    pub fn degree(&self) -> &'static ShrutiDegree {
        shruti::degree(self.semitone as i32)
    }
}

/// A degree of a generated scale with its frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleNote {
    /// Semitone relative to Sa; may be negative or above 11.
    pub semitone: i32,
    /// Octave offset, `floor(semitone / 12)`.
    pub octave: i32,
    pub degree: &'static ShrutiDegree,
    pub frequency: f64,
}

/// Rounds halves towards positive infinity, so 2.5 -> 3 and -2.5 -> -2.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn is_valid(freq: f64) -> bool {
    freq.is_finite() && freq > 0.0
}

/// Cents above the tonic reduced into a single octave, [0, 1200).
fn cents_within_octave(freq: f64, tonic: f64) -> f64 {
    calculate_cents(freq, tonic).rem_euclid(CENTS_PER_OCTAVE)
}

/// Raw signed distance in cents from `reference` to `freq`.
pub fn calculate_cents(freq: f64, reference: f64) -> f64 {
    CENTS_PER_OCTAVE * (freq / reference).log2()
}

/// Whole cents above Sa within the octave, split into the nearest degree
/// and the signed deviation from it.
///
/// The distance is rounded once, and both halves come from that one
/// value, so the deviation always lies in [-50, 50) around the degree it
/// is reported against. A halfway pitch belongs to the upper degree.
fn grid_position(freq: f64, tonic: f64) -> (u8, i32) {
    let step = CENTS_PER_SEMITONE as i32;
    let rounded = round_half_up(cents_within_octave(freq, tonic)) as i32;
    let nearest = (rounded + step / 2).div_euclid(step);
    let deviation = rounded - nearest * step;
    (nearest.rem_euclid(12) as u8, deviation)
}

/// Nearest semitone above Sa, 0-11.
///
/// Anything that rounds to 1150 cents or more above Sa wraps back to Sa.
pub fn semitone_from_tonic(freq: f64, tonic: f64) -> u8 {
    if !is_valid(freq) || !is_valid(tonic) {
        return 0;
    }
    grid_position(freq, tonic).0
}

/// Signed deviation in cents from the degree [`semitone_from_tonic`]
/// reports, in [-50, 50).
pub fn cents_deviation(freq: f64, tonic: f64) -> i32 {
    if !is_valid(freq) || !is_valid(tonic) {
        return 0;
    }
    grid_position(freq, tonic).1
}

/// Grades a deviation: pure up to 10 cents, acceptable up to 25, else off.
pub fn accuracy_tier(cents: i32) -> AccuracyTier {
    let abs = cents.abs();
    if abs <= PURE_CENTS {
        AccuracyTier::Pure
    } else if abs <= ACCEPTABLE_CENTS {
        AccuracyTier::Acceptable
    } else {
        AccuracyTier::Off
    }
}

/// Correction hint for a deviation.
///
/// Negative cents means the voice sits below the reference, so the hint
/// is to sing higher.
pub fn direction(cents: i32) -> Direction {
    if cents.abs() <= PURE_CENTS {
        Direction::Correct
    } else if cents < 0 {
        Direction::Higher
    } else {
        Direction::Lower
    }
}

/// Octave of `freq` relative to the tonic octave.
///
/// Anything from half the tonic up to (but excluding) twice the tonic is
/// octave 0.
pub fn octave_from_tonic(freq: f64, tonic: f64) -> i32 {
    if !is_valid(freq) || !is_valid(tonic) {
        return 0;
    }
    let ratio = freq / tonic;
    if ratio >= 2.0 {
        ratio.log2().floor() as i32
    } else if ratio < 0.5 {
        -((1.0 / ratio).log2().ceil() as i32)
    } else {
        0
    }
}

/// Places a frequency on the Sargam grid of the given tonic.
pub fn classify(freq: f64, tonic: f64) -> SwarReading {
    if !is_valid(freq) || !is_valid(tonic) {
        return SwarReading::NEUTRAL;
    }
    let (semitone, cents) = grid_position(freq, tonic);
    SwarReading {
        semitone,
        octave: octave_from_tonic(freq, tonic),
        cents,
        accuracy: accuracy_tier(cents),
        direction: direction(cents),
    }
}

/// Equal-temperament frequency of a named degree.
///
/// The name is matched case-insensitively. An unknown (name, variant) pair
/// falls back to Sa in the requested octave.
pub fn frequency_for_degree(swar_name: &str, variant: Variant, octave: i32, tonic: f64) -> f64 {
    match shruti::find_by_name(swar_name, variant) {
        Some(degree) => frequency_for_semitone(degree.semitone as i32 + 12 * octave, tonic),
        None => tonic * 2f64.powi(octave),
    }
}

/// `tonic * 2^(semitone / 12)`, for any signed semitone offset.
pub fn frequency_for_semitone(semitone: i32, tonic: f64) -> f64 {
    tonic * 2f64.powf(semitone as f64 / 12.0)
}

/// Builds scale notes for a list of semitone offsets from Sa.
pub fn scale_notes(semitones: &[i32], tonic: f64) -> Vec<ScaleNote> {
    semitones
        .iter()
        .map(|&semitone| ScaleNote {
            semitone,
            octave: semitone.div_euclid(12),
            degree: shruti::degree(semitone),
            frequency: frequency_for_semitone(semitone, tonic),
        })
        .collect()
}

/// Semitones of the shuddha scale, Sa to upper Sa.
pub const SHUDDHA_SCALE: [i32; 8] = [0, 2, 4, 5, 7, 9, 11, 12];

/// Sa Re Ga Ma Pa Da Ni Sa on the given tonic.
pub fn shuddha_scale(tonic: f64) -> Vec<ScaleNote> {
    scale_notes(&SHUDDHA_SCALE, tonic)
}

/// Fractional MIDI note number of a frequency; 0 for non-positive input.
pub fn frequency_to_midi(freq: f64) -> f64 {
    if !is_valid(freq) {
        return 0.0;
    }
    12.0 * (freq / 440.0).log2() + 69.0
}

pub fn midi_to_frequency(midi: f64) -> f64 {
    440.0 * 2f64.powf((midi - 69.0) / 12.0)
}

/// "261.6 Hz", or "-- Hz" when nothing was detected.
pub fn format_frequency(freq: f64) -> String {
    if freq <= 0.0 || !freq.is_finite() {
        return "-- Hz".to_string();
    }
    format!("{freq:.1} Hz")
}

/// "शुद्ध (Perfect)" within 5 cents, otherwise a signed cents count.
pub fn format_cents(cents: i32) -> String {
    if cents.abs() <= 5 {
        return "शुद्ध (Perfect)".to_string();
    }
    format!("{cents:+} cents")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SA: f64 = DEFAULT_SA_FREQUENCY;

    fn cents_above(tonic: f64, cents: f64) -> f64 {
        tonic * 2f64.powf(cents / 1200.0)
    }

    #[test]
    fn tonic_maps_to_sa_with_no_deviation() {
        for tonic in [130.81, 220.0, SA, 392.0] {
            assert_eq!(semitone_from_tonic(tonic, tonic), 0);
            assert_eq!(cents_deviation(tonic, tonic), 0);
        }
    }

    #[test]
    fn semitone_class_ignores_octave() {
        for cents in [0.0, 130.0, 420.0, 701.0, 1090.0] {
            let f = cents_above(SA, cents);
            assert_eq!(
                semitone_from_tonic(f * 2.0, SA),
                semitone_from_tonic(f, SA),
                "octave changed the semitone at {cents} cents"
            );
            assert_eq!(semitone_from_tonic(f / 2.0, SA), semitone_from_tonic(f, SA));
        }
    }

    #[test]
    fn invalid_frequencies_give_neutral_values() {
        assert_eq!(semitone_from_tonic(0.0, SA), 0);
        assert_eq!(semitone_from_tonic(440.0, -1.0), 0);
        assert_eq!(cents_deviation(-5.0, SA), 0);
        assert_eq!(classify(0.0, SA), SwarReading::NEUTRAL);
        assert_eq!(classify(f64::NAN, SA), SwarReading::NEUTRAL);
    }

    #[test]
    fn near_octave_top_wraps_to_sa() {
        let f = cents_above(SA, 1160.0);
        assert_eq!(semitone_from_tonic(f, SA), 0);
        assert_eq!(cents_deviation(f, SA), -40);
        let f = cents_above(SA, 1140.0);
        assert_eq!(semitone_from_tonic(f, SA), 11);
        assert_eq!(cents_deviation(f, SA), 40);
    }

    #[test]
    fn halfway_belongs_to_upper_degree() {
        let f = cents_above(SA, 250.0);
        assert_eq!(semitone_from_tonic(f, SA), 3);
        assert_eq!(cents_deviation(f, SA), -50);
    }

    #[test]
    fn reading_just_below_halfway_names_the_upper_degree() {
        for (above, semitone) in [(249.6, 3), (749.7, 8), (1149.6, 0)] {
            let f = cents_above(SA, above);
            let reading = classify(f, SA);
            assert_eq!(reading.semitone, semitone, "wrong degree at {above} cents");
            assert_eq!(reading.cents, -50, "wrong deviation at {above} cents");
            assert_eq!(reading.direction, Direction::Higher);
            // The reading must place the pitch within half a cent of the truth.
            let placed = (semitone as f64 * 100.0 + reading.cents as f64).rem_euclid(1200.0);
            let actual = above.rem_euclid(1200.0);
            let error = (placed - actual + 600.0).rem_euclid(1200.0) - 600.0;
            assert!(error.abs() <= 0.5 + 1e-6, "reading misplaces {above} cents by {error}");
        }
    }

    #[test]
    fn reading_agrees_with_its_parts_across_the_octave() {
        let mut above = 0.0;
        while above < 1200.0 {
            let f = cents_above(SA, above);
            let reading = classify(f, SA);
            assert_eq!(reading.semitone, semitone_from_tonic(f, SA));
            assert_eq!(reading.cents, cents_deviation(f, SA));
            assert!((-50..50).contains(&reading.cents), "deviation escaped at {above}");
            let placed = (reading.semitone as f64 * 100.0 + reading.cents as f64).rem_euclid(1200.0);
            let error = (placed - above + 600.0).rem_euclid(1200.0) - 600.0;
            assert!(error.abs() <= 0.5 + 1e-6, "reading misplaces {above} cents by {error}");
            above += 7.3;
        }
    }

    #[test]
    fn deviation_sign_follows_pitch() {
        assert_eq!(cents_deviation(cents_above(SA, 712.0), SA), 12);
        assert_eq!(cents_deviation(cents_above(SA, 688.0), SA), -12);
        assert_eq!(semitone_from_tonic(cents_above(SA, 688.0), SA), 7);
    }

    #[test]
    fn accuracy_tier_boundaries() {
        assert_eq!(accuracy_tier(0), AccuracyTier::Pure);
        assert_eq!(accuracy_tier(10), AccuracyTier::Pure);
        assert_eq!(accuracy_tier(-10), AccuracyTier::Pure);
        assert_eq!(accuracy_tier(11), AccuracyTier::Acceptable);
        assert_eq!(accuracy_tier(25), AccuracyTier::Acceptable);
        assert_eq!(accuracy_tier(26), AccuracyTier::Off);
        assert_eq!(accuracy_tier(-49), AccuracyTier::Off);
    }

    #[test]
    fn direction_points_back_to_reference() {
        assert_eq!(direction(5), Direction::Correct);
        assert_eq!(direction(-5), Direction::Correct);
        assert_eq!(direction(-11), Direction::Higher);
        assert_eq!(direction(11), Direction::Lower);
    }

    #[test]
    fn octave_relative_to_tonic() {
        assert_eq!(octave_from_tonic(SA, SA), 0);
        assert_eq!(octave_from_tonic(SA * 1.9, SA), 0);
        assert_eq!(octave_from_tonic(SA * 0.6, SA), 0);
        assert_eq!(octave_from_tonic(SA * 2.0, SA), 1);
        assert_eq!(octave_from_tonic(SA * 4.5, SA), 2);
        assert_eq!(octave_from_tonic(SA * 0.4, SA), -2);
        assert_eq!(octave_from_tonic(SA * 0.26, SA), -2);
        assert_eq!(octave_from_tonic(SA * 0.2, SA), -3);
    }

    #[test]
    fn classify_combines_everything() {
        let reading = classify(cents_above(SA, 1200.0 + 418.0), SA);
        assert_eq!(reading.semitone, 4);
        assert_eq!(reading.octave, 1);
        assert_eq!(reading.cents, 18);
        assert_eq!(reading.accuracy, AccuracyTier::Acceptable);
        assert_eq!(reading.direction, Direction::Lower);
        assert_eq!(reading.degree().hindi, "ग");
    }

    #[test]
    fn every_degree_round_trips() {
        for degree in shruti::SHRUTI_TABLE.iter() {
            let f = frequency_for_degree(degree.swar.as_str(), degree.variant, 0, SA);
            assert_eq!(semitone_from_tonic(f, SA), degree.semitone, "{}", degree.full_name);
            assert_eq!(cents_deviation(f, SA), 0, "{}", degree.full_name);
        }
    }

    #[test]
    fn degree_frequency_respects_octave_and_fallback() {
        let upper_pa = frequency_for_degree("pa", Variant::Shuddha, 1, SA);
        assert!((upper_pa - SA * 3.0).abs() < 1.0, "upper Pa was {upper_pa}");
        let fallback = frequency_for_degree("Ga", Variant::Tivra, -1, SA);
        assert!((fallback - SA / 2.0).abs() < 1e-9);
        let unknown = frequency_for_degree("Xyz", Variant::Shuddha, 0, SA);
        assert!((unknown - SA).abs() < 1e-9);
    }

    #[test]
    fn scale_notes_carry_octave_and_label() {
        let notes = scale_notes(&[-1, 0, 12], SA);
        assert_eq!(notes[0].octave, -1);
        assert_eq!(notes[0].degree.full_name, "Shuddha Nishad");
        assert_eq!(notes[2].octave, 1);
        assert!((notes[2].frequency - SA * 2.0).abs() < 1e-9);
        assert_eq!(shuddha_scale(SA).len(), 8);
    }

    #[test]
    fn midi_conversions() {
        assert!((frequency_to_midi(440.0) - 69.0).abs() < 1e-9);
        assert!((frequency_to_midi(SA) - 60.0).abs() < 0.01);
        assert_eq!(frequency_to_midi(0.0), 0.0);
        assert!((midi_to_frequency(81.0) - 880.0).abs() < 1e-9);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_frequency(0.0), "-- Hz");
        assert_eq!(format_frequency(261.634), "261.6 Hz");
        assert_eq!(format_cents(-4), "शुद्ध (Perfect)");
        assert_eq!(format_cents(12), "+12 cents");
        assert_eq!(format_cents(-30), "-30 cents");
    }

    #[test]
    fn round_half_up_matches_browser_rounding() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
    }
}
