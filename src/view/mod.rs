//! Synchronized transcript view.
//!
//! A pure state machine in the shape of an event reducer: the host (or
//! [`crate::session::PlaybackSession`]) feeds [`ViewEvent`]s in, the view
//! mutates its state and returns [`Effect`]s describing the I/O and UI
//! commands to perform. Nothing in this module blocks or touches the
//! network, which keeps every policy (active-line resolution, auto-scroll
//! suspension, the play/pause toggle, completion tracking) testable with
//! plain fixtures.

mod events;
mod state;
mod update;

pub use events::{Effect, TrackKind, ViewEvent};
pub use state::{AudioControl, SyncedTranscriptView, TranscriptState};
