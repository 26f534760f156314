//! Persisted pipeline state.
//!
//! The engine never reads ambient global config at runtime; it loads
//! one explicit state struct at startup (or on an explicit reload
//! command) and writes it back after validated mutations.

use crate::error::StoreError;
use crate::scenes::Scene;
use crate::types::{DeviceConfig, VirtualConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub devices: HashMap<String, DeviceConfig>,
    #[serde(default)]
    pub virtuals: HashMap<String, VirtualConfig>,
    #[serde(default)]
    pub scenes: HashMap<String, Scene>,
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            devices: HashMap::new(),
            virtuals: HashMap::new(),
            scenes: HashMap::new(),
            target_fps: default_target_fps(),
        }
    }
}

fn default_target_fps() -> u32 {
    60
}

/// Load state from `path`, falling back to defaults when the file does
/// not exist yet. A file that exists but fails to parse is an error;
/// silently discarding a user's mapping would be worse than refusing
/// to start.
pub fn load_engine_state(path: &Path) -> Result<EngineState, StoreError> {
    if !path.exists() {
        info!(path = %path.display(), "no state file, starting with defaults");
        return Ok(EngineState::default());
    }
    let content = fs::read_to_string(path)?;
    let state = serde_json::from_str(&content)?;
    Ok(state)
}

pub fn save_engine_state(path: &Path, state: &EngineState) {
    let json = match serde_json::to_string_pretty(state) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize engine state");
            return;
        }
    };
    if let Err(e) = fs::write(path, json) {
        warn!(path = %path.display(), error = %e, "failed to write engine state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorOrder;
    use crate::packets::Protocol;
    use crate::types::TransportConfig;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_engine_state(&dir.path().join("state.json")).unwrap();
        assert!(state.devices.is_empty());
        assert_eq!(state.target_fps, 60);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = EngineState::default();
        state.devices.insert(
            "dev-a".into(),
            DeviceConfig {
                id: "dev-a".into(),
                name: "bar".into(),
                pixel_count: 60,
                protocol: Protocol::Ddp,
                color_order: ColorOrder::Grb,
                transport: TransportConfig::Udp {
                    host: "10.0.0.7".into(),
                    port: 4048,
                },
                flush_timeout_ms: 500,
            },
        );
        state.target_fps = 30;
        save_engine_state(&path, &state);

        let loaded = load_engine_state(&path).unwrap();
        assert_eq!(loaded.target_fps, 30);
        assert_eq!(loaded.devices["dev-a"].color_order, ColorOrder::Grb);
        assert_eq!(loaded.devices["dev-a"].pixel_count, 60);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_engine_state(&path),
            Err(StoreError::Parse(_))
        ));
    }
}
