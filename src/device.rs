//! Physical LED controllers and their flush workers.
//!
//! Every device owns one worker thread and the transport behind it.
//! The scheduler hands a finished RGB buffer to [`Device::flush`] and
//! moves on; encoding and the blocking write happen on the worker, so
//! a stalled controller can never delay the next tick or any other
//! device. One worker per device also serializes writes on a single
//! connection, which most controller firmwares require.

use crate::color::ColorOrder;
use crate::error::DeviceError;
use crate::events::{EventTx, PipelineEvent};
use crate::transport::{create_transport, Transport};
use crate::types::DeviceConfig;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Error,
}

enum FlushJob {
    Frame(Vec<u8>),
    Deactivate(mpsc::Sender<()>),
    Reconnect(mpsc::Sender<Result<(), DeviceError>>),
    Shutdown,
}

/// Runtime handle for one controller. Holds the worker thread; the
/// transport lives on the worker and is never touched from the
/// scheduler thread.
pub struct Device {
    config: DeviceConfig,
    state: Arc<Mutex<ConnectionState>>,
    jobs: SyncSender<FlushJob>,
    worker: Option<JoinHandle<()>>,
}

impl Device {
    /// Create the device and open its transport from the configured
    /// parameters. The open happens on the worker; a failing
    /// controller leaves the device in `Error` rather than failing
    /// creation.
    pub fn open(config: DeviceConfig, events: EventTx) -> Self {
        let timeout = Duration::from_millis(config.flush_timeout_ms);
        let transport = create_transport(&config.transport, timeout);
        Self::with_transport(config, transport, events)
    }

    /// Same as [`Device::open`] but with a caller-supplied transport.
    /// This is the seam tests use to run the full flush path in
    /// memory.
    pub fn with_transport(
        config: DeviceConfig,
        transport: Box<dyn Transport>,
        events: EventTx,
    ) -> Self {
        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));
        // Depth 2: one frame in flight, one queued. A slow worker
        // drops frames instead of building a backlog.
        let (jobs, jobs_rx) = mpsc::sync_channel(2);
        let worker_state = Arc::clone(&state);
        let worker_config = config.clone();
        let worker = thread::Builder::new()
            .name(format!("flush-{}", config.id))
            .spawn(move || worker_loop(worker_config, transport, worker_state, events, jobs_rx))
            .expect("failed to spawn device worker");
        Self {
            config,
            state,
            jobs,
            worker: Some(worker),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Queue one frame (flat RGB, device-sized) for the worker.
    /// Never blocks: if the worker is still busy with the previous
    /// frame the new one is dropped, trading latency for liveness.
    pub fn flush(&self, frame: Vec<u8>) {
        match self.jobs.try_send(FlushJob::Frame(frame)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(device_id = %self.config.id, "flush queue full, dropping frame");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Close the transport and go `Disconnected`. Segments pointing at
    /// this device stay configured; `reconnect` restores output
    /// without any remapping. Blocks until an in-flight flush, if any,
    /// has finished.
    pub fn deactivate(&self) {
        let (tx, rx) = mpsc::channel();
        if self.jobs.send(FlushJob::Deactivate(tx)).is_ok() {
            let _ = rx.recv();
        }
    }

    /// Re-open the transport. On success the device is `Connected`
    /// again and resumes flushing on the next tick.
    pub fn reconnect(&self) -> Result<(), DeviceError> {
        let (tx, rx) = mpsc::channel();
        self.jobs
            .send(FlushJob::Reconnect(tx))
            .map_err(|_| DeviceError::Deactivated)?;
        rx.recv().map_err(|_| DeviceError::Deactivated)?
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let _ = self.jobs.send(FlushJob::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    config: DeviceConfig,
    mut transport: Box<dyn Transport>,
    state: Arc<Mutex<ConnectionState>>,
    events: EventTx,
    jobs: Receiver<FlushJob>,
) {
    match transport.open() {
        Ok(()) => {
            *state.lock().unwrap() = ConnectionState::Connected;
            info!(device_id = %config.id, "device connected");
        }
        Err(e) => {
            *state.lock().unwrap() = ConnectionState::Error;
            warn!(device_id = %config.id, error = %e, "device failed to connect");
            events.emit(PipelineEvent::DeviceLost {
                device_id: config.id.clone(),
                reason: e.to_string(),
            });
        }
    }

    let mut sequence: u8 = 0;
    while let Ok(job) = jobs.recv() {
        match job {
            FlushJob::Frame(frame) => {
                if *state.lock().unwrap() != ConnectionState::Connected {
                    continue;
                }
                sequence = sequence.wrapping_add(1);
                if let Err(e) = write_frame(&config, transport.as_mut(), &frame, sequence) {
                    warn!(device_id = %config.id, error = %e, "flush failed");
                    transport.close();
                    *state.lock().unwrap() = ConnectionState::Error;
                    events.emit(PipelineEvent::DeviceLost {
                        device_id: config.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            FlushJob::Deactivate(done) => {
                transport.close();
                *state.lock().unwrap() = ConnectionState::Disconnected;
                info!(device_id = %config.id, "device deactivated");
                let _ = done.send(());
            }
            FlushJob::Reconnect(done) => {
                transport.close();
                let result = match transport.open() {
                    Ok(()) => {
                        *state.lock().unwrap() = ConnectionState::Connected;
                        info!(device_id = %config.id, "device reconnected");
                        events.emit(PipelineEvent::DeviceRestored {
                            device_id: config.id.clone(),
                        });
                        Ok(())
                    }
                    Err(e) => {
                        *state.lock().unwrap() = ConnectionState::Error;
                        Err(DeviceError::ConnectionLost(e.to_string()))
                    }
                };
                let _ = done.send(result);
            }
            FlushJob::Shutdown => break,
        }
    }
    transport.close();
}

/// Encode and write one frame: channel reorder, protocol framing, one
/// send per packet. A write that exceeds the configured window counts
/// as a timeout even if the OS call eventually returned.
fn write_frame(
    config: &DeviceConfig,
    transport: &mut dyn Transport,
    frame: &[u8],
    sequence: u8,
) -> Result<(), DeviceError> {
    let wire = apply_color_order(config.color_order, frame);
    let packets = config.protocol.encode(&wire, sequence);
    let deadline = Duration::from_millis(config.flush_timeout_ms);
    let started = Instant::now();
    for packet in &packets {
        transport.send(packet).map_err(|e| classify(e, config))?;
        if started.elapsed() > deadline {
            return Err(DeviceError::Timeout(config.flush_timeout_ms));
        }
    }
    Ok(())
}

fn apply_color_order(order: ColorOrder, frame: &[u8]) -> Vec<u8> {
    if order == ColorOrder::Rgb {
        return frame.to_vec();
    }
    order.apply(frame)
}

fn classify(e: io::Error, config: &DeviceConfig) -> DeviceError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            DeviceError::Timeout(config.flush_timeout_ms)
        }
        _ => DeviceError::ConnectionLost(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::packets::Protocol;
    use crate::types::TransportConfig;
    use std::sync::mpsc::Receiver as EventReceiver;

    /// Transport that records every packet, with switchable failure.
    pub(crate) struct RecordingTransport {
        pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
        pub fail_sends: Arc<Mutex<bool>>,
        pub open: bool,
    }

    impl Transport for RecordingTransport {
        fn open(&mut self) -> io::Result<()> {
            self.open = true;
            Ok(())
        }
        fn send(&mut self, packet: &[u8]) -> io::Result<()> {
            if *self.fail_sends.lock().unwrap() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire cut"));
            }
            self.sent.lock().unwrap().push(packet.to_vec());
            Ok(())
        }
        fn close(&mut self) {
            self.open = false;
        }
        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn test_device(
        color_order: ColorOrder,
    ) -> (Device, Arc<Mutex<Vec<Vec<u8>>>>, Arc<Mutex<bool>>, EventReceiver<PipelineEvent>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let fail_sends = Arc::new(Mutex::new(false));
        let transport = Box::new(RecordingTransport {
            sent: Arc::clone(&sent),
            fail_sends: Arc::clone(&fail_sends),
            open: false,
        });
        let config = DeviceConfig {
            id: "dev-a".into(),
            name: "test strip".into(),
            pixel_count: 4,
            protocol: Protocol::Adalight,
            color_order,
            transport: TransportConfig::Serial {
                path: "/dev/null".into(),
                baud_rate: 115200,
            },
            flush_timeout_ms: 500,
        };
        let (events, event_rx) = event_channel();
        let device = Device::with_transport(config, transport, events);
        (device, sent, fail_sends, event_rx)
    }

    fn wait_for<F: Fn() -> bool>(predicate: F) {
        for _ in 0..200 {
            if predicate() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    #[test]
    fn flush_encodes_with_color_order() {
        let (device, sent, _, _rx) = test_device(ColorOrder::Grb);
        wait_for(|| device.state() == ConnectionState::Connected);
        device.flush(vec![10, 20, 30, 40, 50, 60, 0, 0, 0, 0, 0, 0]);
        wait_for(|| !sent.lock().unwrap().is_empty());
        let packet = sent.lock().unwrap()[0].clone();
        assert_eq!(&packet[0..3], b"Ada");
        assert_eq!(&packet[6..12], &[20, 10, 30, 50, 40, 60]);
    }

    #[test]
    fn failed_flush_transitions_to_error_and_emits() {
        let (device, _, fail_sends, event_rx) = test_device(ColorOrder::Rgb);
        wait_for(|| device.state() == ConnectionState::Connected);
        *fail_sends.lock().unwrap() = true;
        device.flush(vec![0; 12]);
        wait_for(|| device.state() == ConnectionState::Error);
        let event = event_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, PipelineEvent::DeviceLost { ref device_id, .. } if device_id == "dev-a"));
    }

    #[test]
    fn deactivate_then_reconnect_restores_connection() {
        let (device, sent, _, event_rx) = test_device(ColorOrder::Rgb);
        wait_for(|| device.state() == ConnectionState::Connected);
        device.deactivate();
        assert_eq!(device.state(), ConnectionState::Disconnected);

        // Frames sent while deactivated are skipped.
        device.flush(vec![0; 12]);
        thread::sleep(Duration::from_millis(20));
        assert!(sent.lock().unwrap().is_empty());

        device.reconnect().unwrap();
        assert_eq!(device.state(), ConnectionState::Connected);
        let restored = event_rx
            .try_iter()
            .any(|e| matches!(e, PipelineEvent::DeviceRestored { ref device_id } if device_id == "dev-a"));
        assert!(restored);

        device.flush(vec![0; 12]);
        wait_for(|| !sent.lock().unwrap().is_empty());
    }
}
