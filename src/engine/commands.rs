use super::state::{DeviceInfo, PlaybackState, VirtualInfo};
use crate::effects::EffectSetup;
use crate::error::{DeviceError, EffectError, SegmentError};
use crate::scenes::Scene;
use crate::types::{DeviceConfig, Segment, VirtualConfig};
use serde_json::Value;
use std::sync::mpsc::{self, Sender};
use thiserror::Error;

/// Errors surfaced through [`EngineHandle`] calls.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown virtual '{0}'")]
    UnknownVirtual(String),
    #[error("unknown device '{0}'")]
    UnknownDevice(String),
    #[error("unknown scene '{0}'")]
    UnknownScene(String),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("engine is not running")]
    Stopped,
}

/// Mutations applied between ticks, on the scheduler thread. Failable
/// ones carry a responder so validation errors reach the caller
/// synchronously and are never partially applied.
pub enum EngineCommand {
    AddDevice {
        config: DeviceConfig,
    },
    RemoveDevice {
        device_id: String,
    },
    DeactivateDevice {
        device_id: String,
        responder: Sender<Result<(), EngineError>>,
    },
    ReconnectDevice {
        device_id: String,
        responder: Sender<Result<(), EngineError>>,
    },
    AddVirtual {
        config: VirtualConfig,
        responder: Sender<Result<(), EngineError>>,
    },
    RemoveVirtual {
        virtual_id: String,
    },
    UpdateSegments {
        virtual_id: String,
        segments: Vec<Segment>,
        responder: Sender<Result<(), EngineError>>,
    },
    SetEffect {
        virtual_id: String,
        setup: EffectSetup,
        responder: Sender<Result<(), EngineError>>,
    },
    ClearEffect {
        virtual_id: String,
    },
    UpdateEffectConfig {
        virtual_id: String,
        config: Value,
    },
    SetVirtualActive {
        virtual_id: String,
        active: bool,
    },
    PauseAll,
    ResumeAll,
    SetTargetFps {
        fps: u32,
    },
    CaptureScene {
        scene_id: String,
        name: String,
        virtual_ids: Vec<String>,
        responder: Sender<Scene>,
    },
    ActivateScene {
        scene_id: String,
        responder: Sender<Result<(), EngineError>>,
    },
    DeleteScene {
        scene_id: String,
    },
    ReloadState,
    Shutdown,
}

pub enum EngineRequest {
    GetVirtuals(Sender<Vec<VirtualInfo>>),
    GetDevices(Sender<Vec<DeviceInfo>>),
    GetScenes(Sender<Vec<Scene>>),
    GetPlaybackState(Sender<PlaybackState>),
}

/// Cloneable front door to a running engine. Everything the control
/// surface mutates or queries goes through these channels; the
/// pipeline state itself never leaves the scheduler thread.
#[derive(Clone)]
pub struct EngineHandle {
    pub(super) commands: Sender<EngineCommand>,
    pub(super) requests: Sender<EngineRequest>,
}

impl EngineHandle {
    fn command(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.commands.send(command).map_err(|_| EngineError::Stopped)
    }

    fn ack<T>(&self, command: EngineCommand, rx: mpsc::Receiver<T>) -> Result<T, EngineError> {
        self.command(command)?;
        rx.recv().map_err(|_| EngineError::Stopped)
    }

    pub fn add_device(&self, config: DeviceConfig) -> Result<(), EngineError> {
        self.command(EngineCommand::AddDevice { config })
    }

    pub fn remove_device(&self, device_id: &str) -> Result<(), EngineError> {
        self.command(EngineCommand::RemoveDevice {
            device_id: device_id.to_string(),
        })
    }

    pub fn deactivate_device(&self, device_id: &str) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(
            EngineCommand::DeactivateDevice {
                device_id: device_id.to_string(),
                responder: tx,
            },
            rx,
        )?
    }

    pub fn reconnect_device(&self, device_id: &str) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(
            EngineCommand::ReconnectDevice {
                device_id: device_id.to_string(),
                responder: tx,
            },
            rx,
        )?
    }

    pub fn add_virtual(&self, config: VirtualConfig) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(EngineCommand::AddVirtual { config, responder: tx }, rx)?
    }

    pub fn remove_virtual(&self, virtual_id: &str) -> Result<(), EngineError> {
        self.command(EngineCommand::RemoveVirtual {
            virtual_id: virtual_id.to_string(),
        })
    }

    pub fn update_segments(
        &self,
        virtual_id: &str,
        segments: Vec<Segment>,
    ) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(
            EngineCommand::UpdateSegments {
                virtual_id: virtual_id.to_string(),
                segments,
                responder: tx,
            },
            rx,
        )?
    }

    pub fn set_effect(&self, virtual_id: &str, setup: EffectSetup) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(
            EngineCommand::SetEffect {
                virtual_id: virtual_id.to_string(),
                setup,
                responder: tx,
            },
            rx,
        )?
    }

    pub fn clear_effect(&self, virtual_id: &str) -> Result<(), EngineError> {
        self.command(EngineCommand::ClearEffect {
            virtual_id: virtual_id.to_string(),
        })
    }

    pub fn update_effect_config(&self, virtual_id: &str, config: Value) -> Result<(), EngineError> {
        self.command(EngineCommand::UpdateEffectConfig {
            virtual_id: virtual_id.to_string(),
            config,
        })
    }

    pub fn set_virtual_active(&self, virtual_id: &str, active: bool) -> Result<(), EngineError> {
        self.command(EngineCommand::SetVirtualActive {
            virtual_id: virtual_id.to_string(),
            active,
        })
    }

    pub fn pause_all(&self) -> Result<(), EngineError> {
        self.command(EngineCommand::PauseAll)
    }

    pub fn resume_all(&self) -> Result<(), EngineError> {
        self.command(EngineCommand::ResumeAll)
    }

    pub fn set_target_fps(&self, fps: u32) -> Result<(), EngineError> {
        self.command(EngineCommand::SetTargetFps { fps })
    }

    pub fn capture_scene(
        &self,
        scene_id: &str,
        name: &str,
        virtual_ids: Vec<String>,
    ) -> Result<Scene, EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(
            EngineCommand::CaptureScene {
                scene_id: scene_id.to_string(),
                name: name.to_string(),
                virtual_ids,
                responder: tx,
            },
            rx,
        )
    }

    pub fn activate_scene(&self, scene_id: &str) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        self.ack(
            EngineCommand::ActivateScene {
                scene_id: scene_id.to_string(),
                responder: tx,
            },
            rx,
        )?
    }

    pub fn delete_scene(&self, scene_id: &str) -> Result<(), EngineError> {
        self.command(EngineCommand::DeleteScene {
            scene_id: scene_id.to_string(),
        })
    }

    pub fn reload_state(&self) -> Result<(), EngineError> {
        self.command(EngineCommand::ReloadState)
    }

    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.command(EngineCommand::Shutdown)
    }

    fn request<T>(
        &self,
        request: EngineRequest,
        rx: mpsc::Receiver<T>,
    ) -> Result<T, EngineError> {
        self.requests.send(request).map_err(|_| EngineError::Stopped)?;
        rx.recv().map_err(|_| EngineError::Stopped)
    }

    pub fn list_virtuals(&self) -> Result<Vec<VirtualInfo>, EngineError> {
        let (tx, rx) = mpsc::channel();
        self.request(EngineRequest::GetVirtuals(tx), rx)
    }

    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>, EngineError> {
        let (tx, rx) = mpsc::channel();
        self.request(EngineRequest::GetDevices(tx), rx)
    }

    pub fn list_scenes(&self) -> Result<Vec<Scene>, EngineError> {
        let (tx, rx) = mpsc::channel();
        self.request(EngineRequest::GetScenes(tx), rx)
    }

    pub fn playback_state(&self) -> Result<PlaybackState, EngineError> {
        let (tx, rx) = mpsc::channel();
        self.request(EngineRequest::GetPlaybackState(tx), rx)
    }
}
