//! # Cent Meter Widget
//!
//! A one-line text meter for the terminal. The needle sits at the centre
//! when the voice is in tune and moves left when flat, right when sharp.
//! The needle glyph follows the accuracy tier.

use swar_core::tuning::{self, AccuracyTier};

/// Maximum cent deviation range for the meter display.
/// The meter shows deviations from -50 to +50 cents.
const METER_RANGE: i32 = 50;

/// Default number of cells between the end markers.
pub const DEFAULT_WIDTH: usize = 41;

/// Cent meter widget for displaying tuning accuracy.
pub struct CentMeter {
    /// Current cent deviation (None if no pitch detected)
    cents: Option<i32>,
    width: usize,
}

impl CentMeter {
    pub fn new(cents: Option<i32>) -> Self {
        Self {
            cents,
            width: DEFAULT_WIDTH,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        // Odd widths keep a true centre cell.
        self.width = width.max(3) | 1;
        self
    }

    fn needle(tier: AccuracyTier) -> char {
        match tier {
            AccuracyTier::Pure => '●',
            AccuracyTier::Acceptable => '◆',
            AccuracyTier::Off => '▲',
        }
    }

    /// Renders the meter, e.g. `[-----|--◆-------]`.
    pub fn render(&self) -> String {
        let centre = self.width / 2;
        let mut cells: Vec<char> = (0..self.width)
            .map(|i| if i == centre { '|' } else { '-' })
            .collect();

        if let Some(c) = self.cents {
            let clamped = c.clamp(-METER_RANGE, METER_RANGE);
            let span = (self.width - 1) as f32;
            let pos = ((clamped + METER_RANGE) as f32 / (2 * METER_RANGE) as f32 * span).round() as usize;
            cells[pos.min(self.width - 1)] = Self::needle(tuning::accuracy_tier(c));
        }

        let mut line = String::with_capacity(self.width * 3 + 2);
        line.push('[');
        line.extend(cells);
        line.push(']');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needle_positions() {
        let meter = |c| CentMeter::new(Some(c)).with_width(11).render();
        assert_eq!(meter(0), "[-----●-----]");
        assert_eq!(meter(-50), "[▲----|-----]");
        assert_eq!(meter(400), "[-----|----▲]");
        assert_eq!(meter(20), "[-----|-◆---]");
    }

    #[test]
    fn empty_meter_shows_only_centre() {
        assert_eq!(CentMeter::new(None).with_width(5).render(), "[--|--]");
    }
}
