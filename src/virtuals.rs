//! Virtuals: logical strips composed from physical device regions.
//!
//! A virtual owns an ordered segment list, an optional generator and
//! an active flag. Its pixel count is always derived from the segment
//! list; remapping the segments rebuilds the generator against the new
//! length instead of silently truncating its output.

use crate::audio::AudioFeatures;
use crate::effects::{create_effect, Effect, EffectSetup};
use crate::error::{EffectError, SegmentError};
use crate::events::{EventTx, PipelineEvent};
use crate::frame::PixelBuffer;
use crate::types::{Segment, VirtualConfig};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, warn};

struct ActiveEffect {
    setup: EffectSetup,
    renderer: Box<dyn Effect>,
}

pub struct Virtual {
    config: VirtualConfig,
    pixel_count: usize,
    active: bool,
    effect: Option<ActiveEffect>,
}

/// Validate a candidate segment list: every range must fit its device,
/// and no two segments may claim the same device pixels. `foreign` are
/// the segments of every other virtual; overlap with them violates the
/// exclusive-ownership invariant just as an internal overlap does.
pub fn validate_segments(
    segments: &[Segment],
    device_sizes: &HashMap<String, usize>,
    foreign: &[Segment],
) -> Result<(), SegmentError> {
    for segment in segments {
        let pixel_count = *device_sizes
            .get(&segment.device_id)
            .ok_or_else(|| SegmentError::UnknownDevice(segment.device_id.clone()))?;
        if segment.start > segment.end || segment.end >= pixel_count {
            return Err(SegmentError::OutOfRange {
                device_id: segment.device_id.clone(),
                start: segment.start,
                end: segment.end,
                pixel_count,
            });
        }
    }
    for (i, a) in segments.iter().enumerate() {
        for b in segments.iter().skip(i + 1).chain(foreign.iter()) {
            if a.overlaps(b) {
                return Err(SegmentError::Overlap {
                    device_id: a.device_id.clone(),
                    a_start: a.start,
                    a_end: a.end,
                    b_start: b.start,
                    b_end: b.end,
                });
            }
        }
    }
    Ok(())
}

impl Virtual {
    pub fn from_config(config: VirtualConfig) -> Self {
        let pixel_count = config.pixel_count();
        Self {
            config,
            pixel_count,
            active: true,
            effect: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &VirtualConfig {
        &self.config
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    pub fn segments(&self) -> &[Segment] {
        &self.config.segments
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn effect_setup(&self) -> Option<&EffectSetup> {
        self.effect.as_ref().map(|e| &e.setup)
    }

    /// Atomically replace the segment list. Validation runs against
    /// the proposed list first; on any failure the previous segments
    /// (and the bound generator) are left exactly as they were.
    pub fn update_segments(
        &mut self,
        new_segments: Vec<Segment>,
        device_sizes: &HashMap<String, usize>,
        foreign: &[Segment],
    ) -> Result<(), SegmentError> {
        validate_segments(&new_segments, device_sizes, foreign)?;
        self.config.segments = new_segments;
        self.rebind_effect();
        Ok(())
    }

    /// Drop segments that reference a destroyed device. The remaining
    /// list keeps its order; the generator is rebuilt for the new
    /// length.
    pub fn prune_device(&mut self, device_id: &str) {
        let before = self.config.segments.len();
        self.config.segments.retain(|s| s.device_id != device_id);
        if self.config.segments.len() != before {
            self.rebind_effect();
        }
    }

    /// Recompute the derived pixel count and re-initialize the active
    /// generator against it. A generator that cannot bind to the new
    /// length is cleared, never truncated.
    fn rebind_effect(&mut self) {
        self.pixel_count = self.config.pixel_count();
        if let Some(active) = self.effect.take() {
            match create_effect(&active.setup, self.pixel_count) {
                Ok(renderer) => {
                    self.effect = Some(ActiveEffect {
                        setup: active.setup,
                        renderer,
                    });
                }
                Err(e) => {
                    warn!(
                        virtual_id = %self.config.id,
                        error = %e,
                        "effect dropped after segment remap"
                    );
                }
            }
        }
    }

    /// Bind a generator. The generator is initialized against the
    /// current pixel count before being installed; failure leaves any
    /// previous effect running.
    pub fn set_effect(&mut self, setup: EffectSetup) -> Result<(), EffectError> {
        let renderer = create_effect(&setup, self.pixel_count)?;
        self.effect = Some(ActiveEffect { setup, renderer });
        Ok(())
    }

    /// Detach the generator. Subsequent ticks render all-black, so the
    /// mapped device regions go dark rather than holding the last
    /// frame.
    pub fn clear_effect(&mut self) {
        self.effect = None;
    }

    /// Live-apply a new generator configuration. The generator parses
    /// the payload first; only a config that parses is recorded on the
    /// setup, so scene capture never snapshots a value replay would
    /// reject.
    pub fn update_effect_config(&mut self, config: Value) {
        if let Some(active) = &mut self.effect {
            match active.renderer.update_config(config.clone()) {
                Ok(()) => active.setup.config = config,
                Err(e) => warn!(
                    virtual_id = %self.config.id,
                    error = %e,
                    "ignoring invalid effect config"
                ),
            }
        }
    }

    /// Produce this tick's frame. Paused or generator-less virtuals
    /// yield a blank buffer. A panicking generator is contained here:
    /// the effect is cleared, an event is emitted, and the scheduler
    /// keeps ticking every other virtual.
    pub fn tick(&mut self, audio: &AudioFeatures, paused: bool, events: &EventTx) -> PixelBuffer {
        let mut buffer = PixelBuffer::blank(self.pixel_count);
        if paused || !self.active {
            return buffer;
        }
        let Some(active) = &mut self.effect else {
            return buffer;
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            active.renderer.render(audio, buffer.as_bytes_mut());
        }));
        if outcome.is_err() {
            error!(
                virtual_id = %self.config.id,
                effect_type = %active.setup.effect_type,
                "effect panicked, clearing it"
            );
            self.effect = None;
            events.emit(PipelineEvent::EffectChanged {
                virtual_id: self.config.id.clone(),
            });
            return PixelBuffer::blank(self.pixel_count);
        }
        buffer
    }

    /// Split `buffer` into contiguous runs matching each segment's
    /// length, in segment order, and write each into the addressed
    /// device's output buffer. Reversed segments get their run
    /// reversed pixel-wise first.
    pub fn distribute(&self, buffer: &PixelBuffer, device_buffers: &mut HashMap<String, Vec<u8>>) {
        let mut cursor = 0;
        for segment in &self.config.segments {
            let len = segment.len();
            let run = buffer.run(cursor, len, segment.reversed);
            cursor += len;
            let Some(device_buffer) = device_buffers.get_mut(&segment.device_id) else {
                continue;
            };
            let dest = segment.start * 3..(segment.end + 1) * 3;
            if dest.end <= device_buffer.len() {
                device_buffer[dest].copy_from_slice(&run);
            }
        }
    }
}
