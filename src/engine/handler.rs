use super::commands::{EngineCommand, EngineError};
use crate::device::Device;
use crate::events::{EventTx, PipelineEvent};
use crate::scenes::{self, Scene};
use crate::types::{Segment, VirtualConfig};
use crate::virtuals::Virtual;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

pub(super) fn device_sizes(devices: &BTreeMap<String, Device>) -> HashMap<String, usize> {
    devices
        .iter()
        .map(|(id, device)| (id.clone(), device.config().pixel_count))
        .collect()
}

/// Segments owned by every virtual except `except`; candidate segment
/// lists are validated against these so no device pixel ever has two
/// writers.
pub(super) fn foreign_segments(virtuals: &BTreeMap<String, Virtual>, except: &str) -> Vec<Segment> {
    virtuals
        .values()
        .filter(|v| v.id() != except)
        .flat_map(|v| v.segments().iter().cloned())
        .collect()
}

pub(super) fn auto_virtual_id(device_id: &str) -> String {
    format!("device-{}", device_id)
}

/// Apply one mutation between ticks. Returns true when the change
/// should be persisted.
pub(super) fn handle_command(
    command: EngineCommand,
    virtuals: &mut BTreeMap<String, Virtual>,
    devices: &mut BTreeMap<String, Device>,
    scenes: &mut HashMap<String, Scene>,
    is_paused: &mut bool,
    events: &EventTx,
) -> bool {
    let mut should_save = false;
    match command {
        EngineCommand::AddDevice { config } => {
            info!(device_id = %config.id, "adding device");
            let device_id = config.id.clone();
            let name = config.name.clone();
            let pixel_count = config.pixel_count;
            devices.insert(device_id.clone(), Device::open(config, events.clone()));
            let virtual_id = auto_virtual_id(&device_id);
            if pixel_count > 0 && !virtuals.contains_key(&virtual_id) {
                let device_virtual = VirtualConfig {
                    id: virtual_id.clone(),
                    name,
                    segments: vec![Segment {
                        device_id,
                        start: 0,
                        end: pixel_count - 1,
                        reversed: false,
                    }],
                    auto_generated: true,
                };
                virtuals.insert(virtual_id, Virtual::from_config(device_virtual));
            }
            events.emit(PipelineEvent::DevicesChanged);
            events.emit(PipelineEvent::VirtualsChanged);
            should_save = true;
        }
        EngineCommand::RemoveDevice { device_id } => {
            if devices.remove(&device_id).is_some() {
                info!(device_id = %device_id, "removing device");
                let virtual_id = auto_virtual_id(&device_id);
                if virtuals
                    .get(&virtual_id)
                    .is_some_and(|v| v.config().auto_generated)
                {
                    virtuals.remove(&virtual_id);
                }
                // Dangling segments are pruned; their virtuals shrink
                // and keep running on whatever devices remain.
                for virt in virtuals.values_mut() {
                    virt.prune_device(&device_id);
                }
                events.emit(PipelineEvent::DevicesChanged);
                events.emit(PipelineEvent::VirtualsChanged);
                should_save = true;
            }
        }
        EngineCommand::DeactivateDevice {
            device_id,
            responder,
        } => {
            let result = match devices.get(&device_id) {
                Some(device) => {
                    device.deactivate();
                    events.emit(PipelineEvent::DevicesChanged);
                    Ok(())
                }
                None => Err(EngineError::UnknownDevice(device_id)),
            };
            let _ = responder.send(result);
        }
        EngineCommand::ReconnectDevice {
            device_id,
            responder,
        } => {
            let result = match devices.get(&device_id) {
                Some(device) => device.reconnect().map_err(EngineError::from),
                None => Err(EngineError::UnknownDevice(device_id)),
            };
            let _ = responder.send(result);
        }
        EngineCommand::AddVirtual { config, responder } => {
            let foreign = foreign_segments(virtuals, &config.id);
            let result = crate::virtuals::validate_segments(
                &config.segments,
                &device_sizes(devices),
                &foreign,
            );
            let result = match result {
                Ok(()) => {
                    info!(virtual_id = %config.id, "adding virtual");
                    virtuals.insert(config.id.clone(), Virtual::from_config(config));
                    events.emit(PipelineEvent::VirtualsChanged);
                    should_save = true;
                    Ok(())
                }
                Err(e) => Err(EngineError::from(e)),
            };
            let _ = responder.send(result);
        }
        EngineCommand::RemoveVirtual { virtual_id } => {
            if virtuals.remove(&virtual_id).is_some() {
                info!(virtual_id = %virtual_id, "removing virtual");
                events.emit(PipelineEvent::VirtualsChanged);
                should_save = true;
            }
        }
        EngineCommand::UpdateSegments {
            virtual_id,
            segments,
            responder,
        } => {
            let sizes = device_sizes(devices);
            let foreign = foreign_segments(virtuals, &virtual_id);
            let result = match virtuals.get_mut(&virtual_id) {
                Some(virt) => match virt.update_segments(segments, &sizes, &foreign) {
                    Ok(()) => {
                        events.emit(PipelineEvent::VirtualsChanged);
                        should_save = true;
                        Ok(())
                    }
                    Err(e) => Err(EngineError::from(e)),
                },
                None => Err(EngineError::UnknownVirtual(virtual_id)),
            };
            let _ = responder.send(result);
        }
        EngineCommand::SetEffect {
            virtual_id,
            setup,
            responder,
        } => {
            let result = match virtuals.get_mut(&virtual_id) {
                Some(virt) => match virt.set_effect(setup) {
                    Ok(()) => {
                        events.emit(PipelineEvent::EffectChanged {
                            virtual_id: virtual_id.clone(),
                        });
                        Ok(())
                    }
                    Err(e) => Err(EngineError::from(e)),
                },
                None => Err(EngineError::UnknownVirtual(virtual_id)),
            };
            let _ = responder.send(result);
        }
        EngineCommand::ClearEffect { virtual_id } => {
            if let Some(virt) = virtuals.get_mut(&virtual_id) {
                virt.clear_effect();
                events.emit(PipelineEvent::EffectChanged { virtual_id });
            }
        }
        EngineCommand::UpdateEffectConfig { virtual_id, config } => {
            if let Some(virt) = virtuals.get_mut(&virtual_id) {
                virt.update_effect_config(config);
            }
        }
        EngineCommand::SetVirtualActive { virtual_id, active } => {
            if let Some(virt) = virtuals.get_mut(&virtual_id) {
                virt.set_active(active);
                events.emit(PipelineEvent::VirtualsChanged);
            }
        }
        EngineCommand::PauseAll => {
            if !*is_paused {
                *is_paused = true;
                info!("playback paused");
                events.emit(PipelineEvent::PlaybackChanged { paused: true });
            }
        }
        EngineCommand::ResumeAll => {
            if *is_paused {
                *is_paused = false;
                info!("playback resumed");
                events.emit(PipelineEvent::PlaybackChanged { paused: false });
            }
        }
        EngineCommand::CaptureScene {
            scene_id,
            name,
            virtual_ids,
            responder,
        } => {
            let scene = scenes::capture(scene_id.clone(), name, &virtual_ids, virtuals);
            scenes.insert(scene_id, scene.clone());
            should_save = true;
            let _ = responder.send(scene);
        }
        EngineCommand::ActivateScene {
            scene_id,
            responder,
        } => {
            let result = match scenes.get(&scene_id) {
                Some(scene) => {
                    let scene = scene.clone();
                    scenes::replay(&scene, virtuals, events);
                    Ok(())
                }
                None => Err(EngineError::UnknownScene(scene_id)),
            };
            let _ = responder.send(result);
        }
        EngineCommand::DeleteScene { scene_id } => {
            if scenes.remove(&scene_id).is_some() {
                should_save = true;
            }
        }
        // Handled in the scheduler loop.
        EngineCommand::SetTargetFps { .. }
        | EngineCommand::ReloadState
        | EngineCommand::Shutdown => {}
    }
    should_save
}
