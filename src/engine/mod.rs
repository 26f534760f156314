//! The frame scheduler and the registries it drives.
//!
//! One thread owns every virtual and device handle and advances time
//! for all of them: drain control messages, tick each active virtual
//! in a stable order, fan the results out to per-device buffers, then
//! hand each touched device exactly one flush. Blocking I/O never
//! happens here; it lives on the device workers.

mod commands;
mod handler;
mod state;

pub use commands::{EngineCommand, EngineError, EngineHandle, EngineRequest};
pub use state::{DeviceInfo, PlaybackState, VirtualInfo};

use crate::audio::SharedAudioFeatures;
use crate::device::{ConnectionState, Device};
use crate::events::{event_channel, EventTx, PipelineEvent};
use crate::scenes::Scene;
use crate::store::{load_engine_state, save_engine_state, EngineState};
use crate::virtuals::{validate_segments, Virtual};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Start the pipeline on its own thread.
///
/// Returns the control handle, the event stream for the control layer,
/// and the scheduler thread's join handle. Passing a `state_path`
/// enables persistence; `None` keeps everything in memory (tests).
pub fn spawn(
    initial: EngineState,
    state_path: Option<PathBuf>,
    audio: SharedAudioFeatures,
) -> (EngineHandle, Receiver<PipelineEvent>, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel();
    let (request_tx, request_rx) = mpsc::channel();
    let (events, event_rx) = event_channel();
    let thread = thread::Builder::new()
        .name("frame-scheduler".into())
        .spawn(move || run_engine(initial, state_path, audio, command_rx, request_rx, events))
        .expect("failed to spawn scheduler thread");
    (
        EngineHandle {
            commands: command_tx,
            requests: request_tx,
        },
        event_rx,
        thread,
    )
}

fn run_engine(
    initial: EngineState,
    state_path: Option<PathBuf>,
    audio: SharedAudioFeatures,
    command_rx: Receiver<EngineCommand>,
    request_rx: Receiver<EngineRequest>,
    events: EventTx,
) {
    let (mut devices, mut virtuals) = build_runtime(&initial, &events);
    let mut scenes = initial.scenes.clone();
    let mut target_fps = initial.target_fps.max(1);
    let mut target_frame_duration = frame_duration(target_fps);
    let mut is_paused = false;

    info!(
        devices = devices.len(),
        virtuals = virtuals.len(),
        fps = target_fps,
        "engine started"
    );

    loop {
        let frame_start = Instant::now();
        let mut should_save = false;
        let mut shutdown = false;

        while let Ok(request) = request_rx.try_recv() {
            match request {
                EngineRequest::GetVirtuals(responder) => {
                    let _ = responder.send(virtuals.values().map(virtual_info).collect());
                }
                EngineRequest::GetDevices(responder) => {
                    let _ = responder.send(devices.values().map(device_info).collect());
                }
                EngineRequest::GetScenes(responder) => {
                    let _ = responder.send(scenes.values().cloned().collect());
                }
                EngineRequest::GetPlaybackState(responder) => {
                    let _ = responder.send(PlaybackState {
                        is_paused,
                        target_fps,
                    });
                }
            }
        }

        while let Ok(command) = command_rx.try_recv() {
            match command {
                EngineCommand::Shutdown => {
                    shutdown = true;
                    break;
                }
                EngineCommand::SetTargetFps { fps } => {
                    if fps > 0 {
                        target_fps = fps;
                        target_frame_duration = frame_duration(fps);
                        should_save = true;
                    }
                }
                EngineCommand::ReloadState => {
                    let Some(path) = &state_path else {
                        warn!("reload requested without a state path");
                        continue;
                    };
                    match load_engine_state(path) {
                        Ok(state) => {
                            info!("reloading state from disk");
                            let (new_devices, new_virtuals) = build_runtime(&state, &events);
                            devices = new_devices;
                            virtuals = new_virtuals;
                            scenes = state.scenes;
                            target_fps = state.target_fps.max(1);
                            target_frame_duration = frame_duration(target_fps);
                            events.emit(PipelineEvent::DevicesChanged);
                            events.emit(PipelineEvent::VirtualsChanged);
                        }
                        Err(e) => warn!(error = %e, "reload failed, keeping current state"),
                    }
                }
                other => {
                    should_save |= handler::handle_command(
                        other,
                        &mut virtuals,
                        &mut devices,
                        &mut scenes,
                        &mut is_paused,
                        &events,
                    );
                }
            }
        }

        if should_save {
            if let Some(path) = &state_path {
                let state = snapshot_state(&devices, &virtuals, &scenes, target_fps);
                save_engine_state(path, &state);
            }
        }

        if shutdown {
            break;
        }

        render_tick(&mut virtuals, &devices, &audio, is_paused, &events);

        // Frame-dropping under overload: if the tick ran long there is
        // no sleep and no backlog of catch-up ticks.
        let elapsed = frame_start.elapsed();
        if let Some(sleep_duration) = target_frame_duration.checked_sub(elapsed) {
            thread::sleep(sleep_duration);
        }
    }

    info!("engine stopped");
    // Devices drop here, joining their flush workers.
}

/// One scheduler cycle: tick every virtual (stable id order), scatter
/// its frame across the device buffers, then flush each touched,
/// connected device exactly once.
fn render_tick(
    virtuals: &mut BTreeMap<String, Virtual>,
    devices: &BTreeMap<String, Device>,
    audio: &SharedAudioFeatures,
    is_paused: bool,
    events: &EventTx,
) {
    let features = audio.snapshot();
    let mut device_buffers: HashMap<String, Vec<u8>> = HashMap::new();

    // Inactive virtuals are ticked too: their blank frames keep
    // flushing so the mapped hardware goes dark instead of holding
    // the last lit frame.
    for virt in virtuals.values_mut() {
        for segment in virt.segments() {
            if let Some(device) = devices.get(&segment.device_id) {
                device_buffers
                    .entry(segment.device_id.clone())
                    .or_insert_with(|| vec![0; device.config().pixel_count * 3]);
            }
        }
        let buffer = virt.tick(&features, is_paused, events);
        virt.distribute(&buffer, &mut device_buffers);
    }

    // All writers for this tick are done before any buffer is handed
    // to a flush worker.
    for (device_id, device) in devices {
        let Some(buffer) = device_buffers.remove(device_id) else {
            continue;
        };
        if device.state() == ConnectionState::Connected {
            device.flush(buffer);
        }
    }
}

/// Build the runtime registries from persisted state. Devices open
/// their transports; virtuals are validated one by one against the
/// devices and each other, and a virtual whose mapping no longer holds
/// is kept with an empty segment list rather than dropped.
fn build_runtime(
    state: &EngineState,
    events: &EventTx,
) -> (BTreeMap<String, Device>, BTreeMap<String, Virtual>) {
    let mut devices = BTreeMap::new();
    for (id, config) in &state.devices {
        devices.insert(id.clone(), Device::open(config.clone(), events.clone()));
    }
    let sizes = handler::device_sizes(&devices);

    let mut virtuals: BTreeMap<String, Virtual> = BTreeMap::new();
    let sorted: BTreeMap<_, _> = state.virtuals.iter().collect();
    for (id, config) in sorted {
        let foreign = handler::foreign_segments(&virtuals, id);
        let mut config = config.clone();
        if let Err(e) = validate_segments(&config.segments, &sizes, &foreign) {
            warn!(virtual_id = %id, error = %e, "stored segments invalid, clearing mapping");
            config.segments.clear();
        }
        virtuals.insert(id.clone(), Virtual::from_config(config));
    }

    // Every device gets a 1:1 virtual unless one was stored already.
    for (device_id, device) in &devices {
        let virtual_id = handler::auto_virtual_id(device_id);
        let pixel_count = device.config().pixel_count;
        if pixel_count == 0 || virtuals.contains_key(&virtual_id) {
            continue;
        }
        let covered = virtuals
            .values()
            .flat_map(|v| v.segments())
            .any(|s| &s.device_id == device_id);
        if covered {
            continue;
        }
        virtuals.insert(
            virtual_id.clone(),
            Virtual::from_config(crate::types::VirtualConfig {
                id: virtual_id,
                name: device.config().name.clone(),
                segments: vec![crate::types::Segment {
                    device_id: device_id.clone(),
                    start: 0,
                    end: pixel_count - 1,
                    reversed: false,
                }],
                auto_generated: true,
            }),
        );
    }

    (devices, virtuals)
}

fn frame_duration(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

fn snapshot_state(
    devices: &BTreeMap<String, Device>,
    virtuals: &BTreeMap<String, Virtual>,
    scenes: &HashMap<String, Scene>,
    target_fps: u32,
) -> EngineState {
    EngineState {
        devices: devices
            .iter()
            .map(|(id, device)| (id.clone(), device.config().clone()))
            .collect(),
        virtuals: virtuals
            .iter()
            .map(|(id, virt)| (id.clone(), virt.config().clone()))
            .collect(),
        scenes: scenes.clone(),
        target_fps,
    }
}

fn virtual_info(virt: &Virtual) -> VirtualInfo {
    VirtualInfo {
        id: virt.config().id.clone(),
        name: virt.config().name.clone(),
        pixel_count: virt.pixel_count(),
        segments: virt.segments().to_vec(),
        active: virt.is_active(),
        auto_generated: virt.config().auto_generated,
        active_effect: virt.effect_setup().cloned(),
    }
}

fn device_info(device: &Device) -> DeviceInfo {
    DeviceInfo {
        id: device.config().id.clone(),
        name: device.config().name.clone(),
        pixel_count: device.config().pixel_count,
        protocol: device.config().protocol,
        connection_state: device.state(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_is_exact_and_never_zero() {
        assert_eq!(frame_duration(60), Duration::from_secs_f64(1.0 / 60.0));
        assert_eq!(frame_duration(0), Duration::from_secs(1));
        // High rates still get a nonzero period instead of a busy spin.
        assert!(frame_duration(2000) > Duration::ZERO);
    }
}
