use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use tracing::warn;

/// Notifications the pipeline pushes out for the control layer.
///
/// Delivered over a bounded channel; if the consumer falls behind the
/// event is dropped rather than blocking a tick or a device worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    DeviceLost { device_id: String, reason: String },
    DeviceRestored { device_id: String },
    DevicesChanged,
    VirtualsChanged,
    EffectChanged { virtual_id: String },
    SceneActivated { scene_id: String },
    PlaybackChanged { paused: bool },
}

const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Clone)]
pub struct EventTx(SyncSender<PipelineEvent>);

impl EventTx {
    pub fn emit(&self, event: PipelineEvent) {
        match self.0.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event queue full, dropping");
            }
            // Consumer gone; the pipeline keeps running regardless.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

pub fn event_channel() -> (EventTx, Receiver<PipelineEvent>) {
    let (tx, rx) = sync_channel(EVENT_QUEUE_DEPTH);
    (EventTx(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_delivers_in_order() {
        let (tx, rx) = event_channel();
        tx.emit(PipelineEvent::DevicesChanged);
        tx.emit(PipelineEvent::PlaybackChanged { paused: true });
        assert_eq!(rx.recv().unwrap(), PipelineEvent::DevicesChanged);
        assert_eq!(
            rx.recv().unwrap(),
            PipelineEvent::PlaybackChanged { paused: true }
        );
    }

    #[test]
    fn emit_never_blocks_when_full() {
        let (tx, rx) = event_channel();
        for _ in 0..EVENT_QUEUE_DEPTH * 2 {
            tx.emit(PipelineEvent::VirtualsChanged);
        }
        assert_eq!(rx.try_iter().count(), EVENT_QUEUE_DEPTH);
    }

    #[test]
    fn emit_survives_dropped_receiver() {
        let (tx, rx) = event_channel();
        drop(rx);
        tx.emit(PipelineEvent::DevicesChanged);
    }
}
