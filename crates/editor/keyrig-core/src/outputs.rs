//! Output contracts from the editing session.
//!
//! Events are semantic signals for the host UI (refresh the timeline, the selection panel,
//! playback buttons). Pose data itself goes to the renderer through [`crate::PoseRenderer`];
//! events only say that it happened.

use serde::{Deserialize, Serialize};

/// Discrete signals recorded by [`crate::EditorSession`], drained by the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub enum SessionEvent {
    /// Live pose pushed to the renderer.
    PoseApplied,
    TimeChanged {
        old_time: f64,
        new_time: f64,
    },
    /// Track store replaced; `bones` lists the bones that received or lost keys.
    KeyframesChanged {
        bones: Vec<String>,
    },
    SelectionChanged {
        bone: Option<String>,
    },
    PlaybackStarted {
        animation: String,
    },
    PlaybackPaused {
        time: f64,
    },
    PlaybackStopped,
    Imported {
        name: String,
        duration: f64,
        bones: usize,
        warning: Option<String>,
    },
}

/// Ordered event log of a session.
///
/// Consecutive `TimeChanged` events collapse into one spanning the first `old_time` to the
/// last `new_time`, so a host that drains rarely during playback sees a bounded log.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: SessionEvent) {
        if let SessionEvent::TimeChanged { new_time, .. } = event {
            if let Some(SessionEvent::TimeChanged {
                old_time,
                new_time: last,
            }) = self.events.last_mut()
            {
                if *old_time == new_time {
                    self.events.pop();
                } else {
                    *last = new_time;
                }
                return;
            }
        }
        self.events.push(event);
    }

    #[inline]
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
