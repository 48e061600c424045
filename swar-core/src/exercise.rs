//! # Exercise Session Module
//!
//! Note-matching drills: a target swar is picked, the singer has to hold it
//! in tune for a while, and the session keeps score.
//!
//! Matching is octave-agnostic, so a singer may answer in any register.

use crate::detection::PitchRecord;
use crate::raga;
use crate::shruti::{self, ShrutiDegree};
use crate::target::{self, TargetComparison};
use crate::tuning;
use log::{debug, info};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Shuddha notes used when no raga is chosen.
const SWAR_MATCHING_NOTES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// What a session draws its targets from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExerciseKind {
    /// Any shuddha swar from Sa to Ni.
    SwarMatching,
    /// Exercise notes of the raga with this id.
    Raga(String),
}

impl ExerciseKind {
    /// `"swar-matching"` or a raga id.
    pub fn parse(name: &str) -> ExerciseKind {
        match name {
            "swar-matching" => ExerciseKind::SwarMatching,
            id => ExerciseKind::Raga(id.to_string()),
        }
    }
}

/// The note the singer is asked to sing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetNote {
    pub semitone: i32,
    pub frequency: f64,
    pub degree: &'static ShrutiDegree,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExerciseStats {
    pub exercise_count: u32,
    pub correct_count: u32,
    pub streak: u32,
    pub max_streak: u32,
}

/// Result of feeding one pitch to the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExerciseFeedback {
    pub comparison: TargetComparison,
    /// Fraction of the required hold achieved so far, 0 to 1.
    pub hold_progress: f32,
    /// The current target has been completed.
    pub completed: bool,
    /// This very pitch completed the target.
    pub just_completed: bool,
}

#[derive(Debug, Clone)]
pub struct ExerciseSession {
    kind: ExerciseKind,
    tonic: f64,
    required_match: Duration,
    target: Option<TargetNote>,
    match_started: Option<Instant>,
    completed: bool,
    stats: ExerciseStats,
}

impl ExerciseSession {
    pub fn new(kind: ExerciseKind, tonic: f64, required_match: Duration) -> Self {
        Self {
            kind,
            tonic,
            required_match,
            target: None,
            match_started: None,
            completed: false,
            stats: ExerciseStats::default(),
        }
    }

    pub fn kind(&self) -> &ExerciseKind {
        &self.kind
    }

    pub fn target(&self) -> Option<&TargetNote> {
        self.target.as_ref()
    }

    pub fn stats(&self) -> ExerciseStats {
        self.stats
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Moves Sa and retunes the current target with it.
    pub fn set_tonic(&mut self, tonic: f64) {
        if !(tonic.is_finite() && tonic > 0.0) {
            return;
        }
        self.tonic = tonic;
        if let Some(target) = &mut self.target {
            target.frequency = tuning::frequency_for_semitone(target.semitone, tonic);
        }
    }

    /// Picks the next target and resets the hold timer.
    ///
    /// Returns `None` when the session's raga is not in the catalog.
    pub fn next_target<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&TargetNote> {
        let semitone = match &self.kind {
            ExerciseKind::SwarMatching => *SWAR_MATCHING_NOTES.choose(rng)?,
            ExerciseKind::Raga(id) => raga::random_note(id, self.tonic, rng)?.semitone,
        };

        self.completed = false;
        self.match_started = None;
        self.stats.exercise_count += 1;

        let target = TargetNote {
            semitone,
            frequency: tuning::frequency_for_semitone(semitone, self.tonic),
            degree: shruti::degree(semitone),
        };
        debug!(
            "[EXERCISE] Target {} ({}) at {:.2} Hz",
            target.degree.hindi, target.degree.full_name, target.frequency
        );
        self.target = Some(target);
        self.target.as_ref()
    }

    /// Scores one detected pitch taken at `now` against the current target.
    pub fn on_pitch(&mut self, record: &PitchRecord, now: Instant) -> ExerciseFeedback {
        let Some(target) = &self.target else {
            return ExerciseFeedback {
                comparison: TargetComparison::NO_MATCH,
                hold_progress: 0.0,
                completed: false,
                just_completed: false,
            };
        };

        let comparison = target::compare_to_target(record.frequency, target.frequency);
        let mut just_completed = false;

        if comparison.is_accurate_match() {
            if !self.completed {
                match self.match_started {
                    None => self.match_started = Some(now),
                    Some(started) if now.saturating_duration_since(started) >= self.required_match => {
                        self.completed = true;
                        just_completed = true;
                        self.stats.correct_count += 1;
                        self.stats.streak += 1;
                        self.stats.max_streak = self.stats.max_streak.max(self.stats.streak);
                        info!(
                            "[EXERCISE] {} held in tune ({} correct of {})",
                            target.degree.hindi, self.stats.correct_count, self.stats.exercise_count
                        );
                    }
                    Some(_) => {}
                }
            }
        } else {
            self.match_started = None;
        }

        ExerciseFeedback {
            comparison,
            hold_progress: self.hold_progress(now),
            completed: self.completed,
            just_completed,
        }
    }

    fn hold_progress(&self, now: Instant) -> f32 {
        if self.completed {
            return 1.0;
        }
        match self.match_started {
            Some(_) if self.required_match.is_zero() => 1.0,
            Some(started) => {
                let held = now.saturating_duration_since(started).as_secs_f32();
                (held / self.required_match.as_secs_f32()).min(1.0)
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shruti::{SwarName, Variant};
    use crate::tuning::{AccuracyTier, Direction};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const SA: f64 = 261.63;

    fn record(frequency: f64) -> PitchRecord {
        PitchRecord {
            frequency,
            frequency_formatted: tuning::format_frequency(frequency),
            swar: SwarName::Sa,
            hindi: "सा",
            variant: Variant::Shuddha,
            full_name: "Shadja",
            semitone: 0,
            octave: 0,
            cents: 0,
            accuracy: AccuracyTier::Pure,
            direction: Direction::Correct,
            volume: 0.1,
            timestamp: 0,
        }
    }

    fn session(kind: ExerciseKind) -> ExerciseSession {
        ExerciseSession::new(kind, SA, Duration::from_millis(500))
    }

    #[test]
    fn swar_matching_targets_are_shuddha() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = session(ExerciseKind::SwarMatching);
        for _ in 0..50 {
            let target = session.next_target(&mut rng).expect("always has a target");
            assert!(SWAR_MATCHING_NOTES.contains(&target.semitone));
            assert_eq!(target.degree.variant, Variant::Shuddha);
        }
        assert_eq!(session.stats().exercise_count, 50);
    }

    #[test]
    fn unknown_raga_has_no_target() {
        let mut session = session(ExerciseKind::parse("malkauns"));
        assert!(session.next_target(&mut StdRng::seed_from_u64(1)).is_none());
        assert_eq!(session.stats().exercise_count, 0);
    }

    #[test]
    fn raga_targets_come_from_the_raga() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = session(ExerciseKind::parse("bhairav"));
        for _ in 0..30 {
            let target = session.next_target(&mut rng).expect("bhairav exists");
            assert!([0, 1, 4, 5, 7, 8, 11, 12].contains(&target.semitone));
        }
    }

    #[test]
    fn holding_the_note_completes_it() {
        let mut session = session(ExerciseKind::SwarMatching);
        let target = session
            .next_target(&mut StdRng::seed_from_u64(2))
            .expect("target")
            .frequency;
        let start = Instant::now();

        let first = session.on_pitch(&record(target), start);
        assert!(first.comparison.is_matching);
        assert!(!first.completed);
        assert_eq!(first.hold_progress, 0.0);

        let halfway = session.on_pitch(&record(target), start + Duration::from_millis(250));
        assert!(!halfway.completed);
        assert!((halfway.hold_progress - 0.5).abs() < 1e-3);

        let done = session.on_pitch(&record(target * 2.0), start + Duration::from_millis(500));
        assert!(done.completed && done.just_completed);

        let after = session.on_pitch(&record(target), start + Duration::from_millis(900));
        assert!(after.completed && !after.just_completed);

        let stats = session.stats();
        assert_eq!((stats.correct_count, stats.streak, stats.max_streak), (1, 1, 1));
    }

    #[test]
    fn wandering_off_resets_the_hold() {
        let mut session = session(ExerciseKind::SwarMatching);
        let target = session
            .next_target(&mut StdRng::seed_from_u64(4))
            .expect("target")
            .frequency;
        let start = Instant::now();
        session.on_pitch(&record(target), start);
        let off = session.on_pitch(&record(target * 1.1), start + Duration::from_millis(400));
        assert!(!off.comparison.is_matching);
        assert_eq!(off.hold_progress, 0.0);
        let resumed = session.on_pitch(&record(target), start + Duration::from_millis(600));
        assert!(!resumed.completed, "hold timer should restart after going off");
        assert_eq!(session.stats().correct_count, 0);
    }

    #[test]
    fn pitch_without_target_is_ignored() {
        let mut session = session(ExerciseKind::SwarMatching);
        let feedback = session.on_pitch(&record(SA), Instant::now());
        assert_eq!(feedback.comparison, TargetComparison::NO_MATCH);
        assert!(!feedback.completed);
    }

    #[test]
    fn streak_spans_targets() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut session = ExerciseSession::new(ExerciseKind::SwarMatching, SA, Duration::ZERO);
        let start = Instant::now();
        for round in 0..3u64 {
            let target = session.next_target(&mut rng).expect("target").frequency;
            let at = start + Duration::from_millis(round * 10);
            session.on_pitch(&record(target), at);
            let feedback = session.on_pitch(&record(target), at);
            assert!(feedback.just_completed);
        }
        let stats = session.stats();
        assert_eq!((stats.exercise_count, stats.correct_count, stats.max_streak), (3, 3, 3));
    }

    #[test]
    fn retuning_moves_the_target() {
        let mut session = session(ExerciseKind::SwarMatching);
        let semitone = session
            .next_target(&mut StdRng::seed_from_u64(6))
            .expect("target")
            .semitone;
        session.set_tonic(220.0);
        let target = session.target().expect("target kept");
        assert!((target.frequency - tuning::frequency_for_semitone(semitone, 220.0)).abs() < 1e-9);
    }
}
