//! # Main Display Module
//!
//! Text rendering of readings, target comparisons and catalog entries for
//! the terminal front end.

use super::cent_meter::CentMeter;
use log::debug;
use std::io::{self, Write};
use swar_core::exercise::{ExerciseFeedback, ExerciseStats, TargetNote};
use swar_core::raga::{PakadDisplay, Raga, RagaScale};
use swar_core::tuning::{self, Direction};
use swar_core::{DetectionListener, PitchRecord, TargetComparison, shruti};

/// Human hint for a correction direction.
pub fn direction_hint(direction: Option<Direction>) -> &'static str {
    match direction {
        Some(Direction::Higher) => "sing higher ↑",
        Some(Direction::Lower) => "sing lower ↓",
        Some(Direction::Correct) => "in tune ✓",
        None => "",
    }
}

fn octave_mark(octave: i32) -> String {
    match octave {
        0 => String::new(),
        o => format!(" (saptak {o:+})"),
    }
}

/// One status line for a detected pitch with no target.
pub fn reading_line(record: &PitchRecord) -> String {
    format!(
        "{:<4} {:<16}{:<14} {:>9}  {}  {:<16} {}",
        record.hindi,
        record.full_name,
        octave_mark(record.octave),
        record.frequency_formatted,
        CentMeter::new(Some(record.cents)).render(),
        tuning::format_cents(record.cents),
        direction_hint(Some(record.direction)),
    )
}

/// One status line for a detected pitch measured against a target.
pub fn target_line(record: &PitchRecord, comparison: &TargetComparison, target: &TargetNote) -> String {
    let verdict = if comparison.is_matching { "match" } else { "     " };
    format!(
        "target {:<4} you {:<4} {:>9}  {}  {:<16} {} {}",
        target.degree.hindi,
        record.hindi,
        record.frequency_formatted,
        CentMeter::new(Some(comparison.cents)).render(),
        tuning::format_cents(comparison.cents),
        verdict,
        direction_hint(comparison.direction),
    )
}

pub fn silence_line() -> String {
    format!("{:<4} {}", "--", "(silence)")
}

/// Clears the current terminal line and writes `line` in its place.
pub fn write_status<W: Write>(out: &mut W, line: &str) -> io::Result<()> {
    write!(out, "\r\x1b[2K{line}")?;
    out.flush()
}

/// Rewrites the current line on stdout.
pub fn show_status(line: &str) {
    if let Err(e) = write_status(&mut io::stdout().lock(), line) {
        debug!("[MAIN] Failed to update the status line: {}", e);
    }
}

pub fn exercise_line(
    record: &PitchRecord,
    feedback: &ExerciseFeedback,
    target: &TargetNote,
) -> String {
    let filled = (feedback.hold_progress * 10.0).round() as usize;
    format!(
        "{}  hold [{}{}]",
        target_line(record, &feedback.comparison, target),
        "#".repeat(filled),
        " ".repeat(10 - filled.min(10)),
    )
}

pub fn stats_line(stats: &ExerciseStats) -> String {
    format!(
        "correct {} / {}  streak {}  best streak {}",
        stats.correct_count, stats.exercise_count, stats.streak, stats.max_streak
    )
}

pub fn raga_summary(raga: &Raga) -> String {
    format!(
        "{:<9} {:<7} thaat {:<9} {:<26} {}",
        raga.id, raga.hindi, raga.thaat, raga.time_of_day, raga.mood
    )
}

fn semitone_labels(semitones: impl Iterator<Item = i32>) -> String {
    semitones
        .map(|s| shruti::degree(s).hindi)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn raga_details(raga: &Raga, pakad: Option<&PakadDisplay>) -> String {
    let vadi = shruti::degree(raga.vadi as i32);
    let samvadi = shruti::degree(raga.samvadi as i32);
    let mut text = format!(
        "{} ({})\n{}\n  aaroh   {}\n  avroh   {}\n  vadi    {} {}\n  samvadi {} {}\n",
        raga.name,
        raga.hindi,
        raga.description,
        semitone_labels(raga.aaroh.iter().copied()),
        semitone_labels(raga.avroh.iter().copied()),
        vadi.hindi,
        vadi.full_name,
        samvadi.hindi,
        samvadi.full_name,
    );
    if let Some(pakad) = pakad {
        text.push_str(&format!("  pakad   {} ({})\n", pakad.hindi, pakad.roman));
    }
    for alankar in raga.alankars {
        text.push_str(&format!(
            "  alankar {}: {}\n",
            alankar.name,
            semitone_labels(alankar.pattern.iter().copied())
        ));
    }
    text
}

pub fn scale_table(scale: &RagaScale) -> String {
    let mut text = format!("{} on Sa = {:.2} Hz\n", scale.raga.name, scale.tonic);
    for (title, notes) in [("aaroh", &scale.aaroh), ("avroh", &scale.avroh)] {
        text.push_str(title);
        text.push('\n');
        for note in notes.iter() {
            let degree = shruti::degree(note.semitone);
            text.push_str(&format!(
                "  {:>3}  {:<4} {:<16} {}\n",
                note.semitone,
                degree.hindi,
                degree.full_name,
                tuning::format_frequency(note.frequency)
            ));
        }
    }
    text
}

/// Listener that keeps a live status line on the terminal.
#[derive(Default)]
pub struct TerminalDisplay {
    /// Fixed target to compare against, if any.
    pub target: Option<TargetNote>,
}

impl DetectionListener for TerminalDisplay {
    fn on_pitch_detected(&mut self, record: &PitchRecord) {
        let line = match &self.target {
            Some(target) => {
                let comparison = swar_core::compare_to_target(record.frequency, target.frequency);
                target_line(record, &comparison, target)
            }
            None => reading_line(record),
        };
        show_status(&line);
    }

    fn on_silence(&mut self) {
        show_status(&silence_line());
    }
}
