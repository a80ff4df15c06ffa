//! Headless display sink.
//!
//! There is no window: each presented frame is serialized to JSON and
//! emitted at trace level, which is enough to replay a run from logs.

use brawl_combat::{DisplayHandle, FighterFrame};
use tracing::{debug, trace, warn};

/// Display handle that writes frames to the log.
#[derive(Debug)]
pub struct TraceDisplay {
    label: &'static str,
    enabled: bool,
    frames: u64,
}

impl TraceDisplay {
    /// Creates a sink for one side. With `enabled` false frames are only counted.
    #[must_use]
    pub fn new(label: &'static str, enabled: bool) -> Self {
        Self {
            label,
            enabled,
            frames: 0,
        }
    }
}

impl DisplayHandle for TraceDisplay {
    fn present(&mut self, frame: &FighterFrame) {
        self.frames += 1;
        if !self.enabled {
            return;
        }
        match serde_json::to_string(frame) {
            Ok(json) => trace!(side = self.label, frame = self.frames, "{json}"),
            Err(e) => warn!(side = self.label, "Failed to serialize frame: {e}"),
        }
    }

    fn release(&mut self) {
        debug!(side = self.label, frames = self.frames, "Display released");
    }
}
