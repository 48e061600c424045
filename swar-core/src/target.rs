//! # Target Comparison Module
//!
//! Compares a detected frequency with an arbitrary target frequency,
//! ignoring the octave the singer happens to be in.

use crate::tuning::{self, AccuracyTier, Direction};
use serde::Serialize;

/// Maximum |cents| at which a pitch counts as matching its target.
pub const MATCH_CENTS: i32 = 25;

/// Result of comparing a detected pitch with a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetComparison {
    pub is_matching: bool,
    /// Octave-folded deviation in [-600, 600].
    pub cents: i32,
    /// `None` when either frequency was invalid.
    pub direction: Option<Direction>,
    pub accuracy: AccuracyTier,
}

impl TargetComparison {
    /// The comparison reported when there is nothing to compare.
    pub const NO_MATCH: TargetComparison = TargetComparison {
        is_matching: false,
        cents: 0,
        direction: None,
        accuracy: AccuracyTier::Off,
    };

    /// Matching with a pure or acceptable tier.
    pub fn is_accurate_match(&self) -> bool {
        self.is_matching && self.accuracy != AccuracyTier::Off
    }
}

/// Folds a cents distance into a single octave around zero, [-600, 600].
fn fold_octave(mut cents: f64) -> f64 {
    while cents > 600.0 {
        cents -= 1200.0;
    }
    while cents < -600.0 {
        cents += 1200.0;
    }
    cents
}

/// Compares `detected` against `target` regardless of octave.
///
/// A voice exactly one octave above or below the target is a perfect match.
pub fn compare_to_target(detected: f64, target: f64) -> TargetComparison {
    let valid = |f: f64| f.is_finite() && f > 0.0;
    if !valid(detected) || !valid(target) {
        return TargetComparison::NO_MATCH;
    }

    let cents = tuning::round_half_up(fold_octave(tuning::calculate_cents(detected, target))) as i32;

    TargetComparison {
        is_matching: cents.abs() <= MATCH_CENTS,
        cents,
        direction: Some(tuning::direction(cents)),
        accuracy: tuning::accuracy_tier(cents),
    }
}
