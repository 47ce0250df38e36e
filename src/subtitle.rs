//! Subtitle and track model.
//!
//! A track is an ordered sequence of timed lines for one language variant of
//! a video. Entries are kept sorted ascending by start time; overlapping
//! entries should not occur, but network payloads are untrusted, so lookup
//! tie-breaks deterministically on the first match in sequence order.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// One timed subtitle line. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtitle {
    pub text: String,
    /// Seconds from the start of the media.
    pub start: f64,
    /// Seconds the line stays on screen.
    pub duration: f64,
}

impl Subtitle {
    pub fn new(start: f64, duration: f64, text: &str) -> Self {
        Self {
            text: text.to_string(),
            start,
            duration,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether `t` falls within `[start, start + duration]`.
    pub fn covers(&self, t: f64) -> bool {
        t >= self.start && t <= self.end()
    }

    /// Numeric sanity check; payload shape is already enforced by serde.
    fn check_shape(&self) -> Result<()> {
        if !self.start.is_finite() || !self.duration.is_finite() {
            return Err(EngineError::MalformedData {
                message: format!(
                    "non-finite subtitle timing (start={}, duration={})",
                    self.start, self.duration
                ),
            });
        }
        if self.start < 0.0 || self.duration < 0.0 {
            return Err(EngineError::MalformedData {
                message: format!(
                    "negative subtitle timing (start={}, duration={})",
                    self.start, self.duration
                ),
            });
        }
        Ok(())
    }

    fn identity(&self) -> (u64, u64, &str) {
        (self.start.to_bits(), self.duration.to_bits(), &self.text)
    }
}

/// An ordered sequence of subtitle lines for one language variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Language/variant identifier, e.g. `"es"` or `"en"`.
    pub source: String,
    pub data: Vec<Subtitle>,
}

impl Track {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            data: Vec::new(),
        }
    }

    /// Build a track from an untrusted payload: validates each line and sorts
    /// ascending by start time.
    pub fn from_lines(source: &str, lines: Vec<Subtitle>) -> Result<Self> {
        let mut track = Track::new(source);
        track.merge(lines)?;
        Ok(track)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// The currently-active line at playhead `t`, with its index.
    ///
    /// Returns the first match in ascending start order, so overlapping
    /// (malformed) input still resolves deterministically.
    pub fn active_line(&self, t: f64) -> Option<(usize, &Subtitle)> {
        self.data
            .iter()
            .enumerate()
            .find(|(_, line)| line.covers(t))
    }

    /// The line whose start equals `start` exactly. Both tracks of a session
    /// derive from the same segmentation, so cross-track matching uses exact
    /// equality rather than a tolerance window.
    pub fn line_at_start(&self, start: f64) -> Option<&Subtitle> {
        self.data.iter().find(|line| line.start == start)
    }

    /// Merge incoming lines in timeline order, dropping exact
    /// `(start, duration, text)` duplicates. Re-merging an already-merged
    /// page is therefore a no-op.
    pub fn merge(&mut self, incoming: Vec<Subtitle>) -> Result<()> {
        for line in &incoming {
            line.check_shape()?;
        }
        self.data.extend(incoming);
        // Secondary keys keep identical triples adjacent for the dedup below.
        self.data.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then(a.duration.total_cmp(&b.duration))
                .then_with(|| a.text.cmp(&b.text))
        });
        self.data.dedup_by(|a, b| a.identity() == b.identity());
        Ok(())
    }

    /// Maximum `start + duration` across the track, or 0 if empty.
    pub fn covered_until(&self) -> f64 {
        self.data.iter().map(Subtitle::end).fold(0.0, f64::max)
    }
}

/// A line the learner bookmarked, forwarded to the study store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedLine {
    pub media_id: String,
    pub original: Subtitle,
    /// Absent when no translation line shares the original's start time.
    pub translation: Option<Subtitle>,
    /// Timeline position of the saved line; always the original's start.
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lines: &[(f64, f64, &str)]) -> Track {
        Track::from_lines(
            "en",
            lines
                .iter()
                .map(|(start, duration, text)| Subtitle::new(*start, *duration, text))
                .collect(),
        )
        .expect("test lines are well-formed")
    }

    #[test]
    fn covers_is_inclusive_on_both_ends() {
        let line = Subtitle::new(1.0, 2.0, "text");
        assert!(!line.covers(0.5));
        assert!(line.covers(1.0));
        assert!(line.covers(2.0));
        assert!(line.covers(3.0));
        assert!(!line.covers(3.5));
    }

    #[test]
    fn active_line_resolves_within_bounds() {
        let track = track(&[(0.0, 2.0, "intro"), (2.5, 2.0, "middle"), (5.0, 2.0, "end")]);
        assert_eq!(track.active_line(1.0).unwrap().1.text, "intro");
        assert_eq!(track.active_line(3.0).unwrap().1.text, "middle");
        assert_eq!(track.active_line(6.5).unwrap().1.text, "end");
        assert!(track.active_line(2.2).is_none(), "gap between lines");
        assert!(track.active_line(10.0).is_none(), "past the last line");
    }

    #[test]
    fn overlapping_lines_resolve_to_first_in_sequence() {
        // Overlap violates the ordering convention; input is untrusted.
        let track = track(&[(1.0, 5.0, "first"), (1.0, 2.0, "second"), (3.0, 2.0, "third")]);
        let (idx, line) = track.active_line(1.5).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(line.text, "first");
    }

    #[test]
    fn from_lines_sorts_by_start() {
        let track = track(&[(4.0, 1.0, "c"), (0.0, 1.0, "a"), (2.0, 1.0, "b")]);
        let texts: Vec<&str> = track.data.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_keeps_order_and_drops_duplicates() {
        // Existing track covers 0-120s; page 2 covers 120-180s with one
        // duplicate of the boundary line.
        let mut track = track(&[(0.0, 60.0, "p1-a"), (60.0, 60.0, "p1-b")]);
        track
            .merge(vec![
                Subtitle::new(150.0, 30.0, "p2-b"),
                Subtitle::new(120.0, 30.0, "p2-a"),
                Subtitle::new(60.0, 60.0, "p1-b"),
            ])
            .expect("merge should accept well-formed lines");

        let texts: Vec<&str> = track.data.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["p1-a", "p1-b", "p2-a", "p2-b"]);
        assert_eq!(track.covered_until(), 180.0);
    }

    #[test]
    fn merge_twice_is_idempotent() {
        let page: Vec<Subtitle> = vec![
            Subtitle::new(120.0, 30.0, "a"),
            Subtitle::new(150.0, 30.0, "b"),
        ];
        let mut track = Track::new("es");
        track.merge(page.clone()).unwrap();
        track.merge(page).unwrap();
        assert_eq!(track.len(), 2, "re-merging a page must not duplicate lines");
    }

    #[test]
    fn merge_rejects_non_finite_timing() {
        let mut track = Track::new("es");
        let err = track
            .merge(vec![Subtitle::new(f64::NAN, 1.0, "bad")])
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedData { .. }));
        assert!(track.is_empty(), "rejected payload must not be merged");
    }

    #[test]
    fn covered_until_is_zero_for_empty_track() {
        assert_eq!(Track::new("es").covered_until(), 0.0);
    }

    #[test]
    fn line_at_start_uses_exact_equality() {
        let track = track(&[(42.0, 3.0, "hola"), (45.5, 3.0, "mundo")]);
        assert_eq!(track.line_at_start(42.0).unwrap().text, "hola");
        assert!(track.line_at_start(42.001).is_none());
    }
}
