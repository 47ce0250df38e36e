use super::events::{Effect, TrackKind, ViewEvent};
use super::state::{AudioControl, SyncedTranscriptView, TranscriptState};
use crate::audio_cache::ContentKey;
use crate::subtitle::{SavedLine, Track};
use std::time::Instant;
use tracing::{debug, info, warn};

impl SyncedTranscriptView {
    /// Run one event through the reducer.
    ///
    /// `translation` is the pager-owned translation track, when one exists;
    /// the view never stores it, only resolves against it.
    pub fn handle(&mut self, event: ViewEvent, translation: Option<&Track>) -> Vec<Effect> {
        match event {
            ViewEvent::Tick {
                now,
                position,
                playing,
            } => self.on_tick(now, position, playing, translation),
            ViewEvent::ManualScroll { now } => self.on_manual_scroll(now),
            ViewEvent::LineClicked { track, index } => self.on_line_clicked(track, index, translation),
            ViewEvent::SaveRequested { index } => self.on_save_requested(index, translation),
            ViewEvent::PlayAudioRequested { index } => self.on_play_audio_requested(index),
            ViewEvent::AudioResolved {
                index,
                request_id,
                result,
            } => self.on_audio_resolved(index, request_id, result),
        }
    }

    fn on_tick(
        &mut self,
        now: Instant,
        position: f64,
        playing: bool,
        translation: Option<&Track>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        if playing {
            if let Some(last) = self.last_position {
                let delta = position - last;
                // Jumps larger than the tick gap are seeks, not watching.
                if delta > 0.0 && delta <= self.max_tick_gap_seconds {
                    self.watched_seconds += delta;
                }
            }
        }
        self.last_position = Some(position);

        if !self.completion_sent && self.original_state == TranscriptState::Ready {
            let extent = self.original.covered_until();
            if extent > 0.0 && self.watched_seconds / extent >= self.completion_threshold {
                self.completion_sent = true;
                info!(media_id = %self.media_id, watched = self.watched_seconds, "Lesson watched to completion");
                effects.push(Effect::MarkCompleted);
            }
        }

        if playing && self.translation_state == TranscriptState::Ready {
            effects.push(Effect::EnsureCoverage { playhead: position });
        }

        let new_original = if self.original_state == TranscriptState::Ready {
            self.original.active_line(position).map(|(idx, _)| idx)
        } else {
            None
        };
        let new_translation = if self.translation_state == TranscriptState::Ready {
            translation
                .and_then(|track| track.active_line(position))
                .map(|(idx, _)| idx)
        } else {
            None
        };

        let original_changed = new_original != self.active_original;
        let translation_changed = new_translation != self.active_translation;
        self.active_original = new_original;
        self.active_translation = new_translation;

        if playing && !self.scroll_suspended(now) {
            if original_changed {
                if let Some(index) = new_original {
                    effects.push(Effect::ScrollTo {
                        track: TrackKind::Original,
                        index,
                    });
                }
            }
            if translation_changed {
                if let Some(index) = new_translation {
                    effects.push(Effect::ScrollTo {
                        track: TrackKind::Translation,
                        index,
                    });
                }
            }
        }

        effects
    }

    fn on_manual_scroll(&mut self, now: Instant) -> Vec<Effect> {
        // Restart the window on every scroll event so auto-scroll never
        // fights the learner's reading position.
        self.scroll_suspended_until = Some(now + self.scroll_suspend);
        debug!("Manual scroll; auto-scroll suspended");
        Vec::new()
    }

    fn on_line_clicked(
        &mut self,
        track: TrackKind,
        index: usize,
        translation: Option<&Track>,
    ) -> Vec<Effect> {
        let start = match track {
            TrackKind::Original => self.original.data.get(index).map(|line| line.start),
            TrackKind::Translation => translation
                .and_then(|track| track.data.get(index))
                .map(|line| line.start),
        };
        match start {
            Some(seconds) => {
                debug!(?track, index, seconds, "Line clicked; seeking");
                vec![Effect::Seek { seconds }]
            }
            None => Vec::new(),
        }
    }

    fn on_save_requested(&mut self, index: usize, translation: Option<&Track>) -> Vec<Effect> {
        let Some(original) = self.original.data.get(index).cloned() else {
            return Vec::new();
        };
        // Both tracks derive from the same segmentation, so the counterpart
        // shares the exact start time. A missing counterpart is not an error.
        let translated = translation
            .and_then(|track| track.line_at_start(original.start))
            .cloned();
        let timestamp = original.start;
        info!(media_id = %self.media_id, timestamp, "Saving line");
        vec![Effect::SaveLine(SavedLine {
            media_id: self.media_id.clone(),
            original,
            translation: translated,
            timestamp,
        })]
    }

    fn on_play_audio_requested(&mut self, index: usize) -> Vec<Effect> {
        match self.audio {
            AudioControl::Playing { index: current } if current == index => {
                self.audio = AudioControl::Paused { index };
                vec![Effect::PausePlayback]
            }
            AudioControl::Paused { index: current } if current == index => {
                self.audio = AudioControl::Playing { index };
                vec![Effect::ResumePlayback]
            }
            AudioControl::Loading { index: current, .. } if current == index => {
                // A resolve for this line is already outstanding.
                Vec::new()
            }
            _ => {
                let mut effects = Vec::new();
                if matches!(
                    self.audio,
                    AudioControl::Playing { .. } | AudioControl::Paused { .. }
                ) {
                    effects.push(Effect::StopPlayback);
                }
                let Some(line) = self.original.data.get(index) else {
                    self.audio = AudioControl::Idle;
                    return effects;
                };
                let text = line.text.clone();
                let request_id = self.next_audio_request(index);
                debug!(index, request_id, "Resolving speech audio for line");
                effects.push(Effect::ResolveAudio {
                    index,
                    request_id,
                    text,
                    key: ContentKey::new(&self.media_id, index, &self.voice),
                });
                effects
            }
        }
    }

    fn on_audio_resolved(
        &mut self,
        index: usize,
        request_id: u64,
        result: Result<crate::audio_cache::AudioClip, crate::error::EngineError>,
    ) -> Vec<Effect> {
        match self.audio {
            AudioControl::Loading {
                request_id: current,
                ..
            } if current == request_id => match result {
                Ok(clip) => {
                    self.audio = AudioControl::Playing { index };
                    vec![Effect::StartPlayback { index, clip }]
                }
                Err(err) => {
                    // Reset the toggle so the control stays retryable.
                    warn!(index, "Audio resolve failed: {err}");
                    self.audio = AudioControl::Idle;
                    vec![Effect::Notify {
                        message: format!("Audio unavailable: {err}"),
                    }]
                }
            },
            _ => {
                debug!(request_id, "Ignoring stale audio resolve");
                Vec::new()
            }
        }
    }
}
