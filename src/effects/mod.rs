//! Pluggable pixel generators.
//!
//! The pipeline treats effects as a capability: a type identifier is
//! resolved through a closed constructor table exactly once when the
//! effect is bound to a virtual, never per frame. The boxed generator
//! is then driven by the scheduler through [`Effect::render`].

use crate::audio::AudioFeatures;
use crate::error::EffectError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod power;
mod scan;
mod single_color;

pub use power::Power;
pub use scan::Scan;
pub use single_color::SingleColor;

/// A generator bound to a fixed pixel count. `render` fills `frame`
/// (flat RGB, length = pixel_count * 3) for the current tick.
pub trait Effect: Send {
    fn render(&mut self, audio: &AudioFeatures, frame: &mut [u8]);

    /// Live-apply a new configuration. A payload that does not parse
    /// is rejected and the previous configuration stays in force.
    fn update_config(&mut self, config: Value) -> Result<(), serde_json::Error>;
}

/// The serializable identity of an active effect: what scene capture
/// records and replay feeds back into [`create_effect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSetup {
    pub effect_type: String,
    #[serde(default)]
    pub config: Value,
}

pub fn effect_types() -> &'static [&'static str] {
    &["single_color", "scan", "power"]
}

/// Resolve the effect type and initialize a generator against the
/// target length. Initialization happens before the effect is
/// installed on a virtual, so a failure here leaves the virtual's
/// previous state untouched.
pub fn create_effect(
    setup: &EffectSetup,
    pixel_count: usize,
) -> Result<Box<dyn Effect>, EffectError> {
    if pixel_count == 0 {
        return Err(EffectError::LengthMismatch {
            effect_type: setup.effect_type.clone(),
            pixel_count,
        });
    }
    let init_failed = |e: serde_json::Error| EffectError::InitFailed {
        effect_type: setup.effect_type.clone(),
        reason: e.to_string(),
    };
    match setup.effect_type.as_str() {
        "single_color" => {
            let config = serde_json::from_value(setup.config.clone()).map_err(init_failed)?;
            Ok(Box::new(SingleColor::new(config)))
        }
        "scan" => {
            let config = serde_json::from_value(setup.config.clone()).map_err(init_failed)?;
            Ok(Box::new(Scan::new(config)))
        }
        "power" => {
            let config = serde_json::from_value(setup.config.clone()).map_err(init_failed)?;
            Ok(Box::new(Power::new(config, pixel_count)))
        }
        other => Err(EffectError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_listed_type_constructs_with_defaults() {
        for effect_type in effect_types() {
            let setup = EffectSetup {
                effect_type: effect_type.to_string(),
                config: json!({}),
            };
            assert!(create_effect(&setup, 30).is_ok(), "{}", effect_type);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let setup = EffectSetup {
            effect_type: "strobe".into(),
            config: json!({}),
        };
        assert!(matches!(
            create_effect(&setup, 30),
            Err(EffectError::UnknownType(_))
        ));
    }

    #[test]
    fn zero_length_binding_is_a_length_mismatch() {
        let setup = EffectSetup {
            effect_type: "scan".into(),
            config: json!({}),
        };
        assert!(matches!(
            create_effect(&setup, 0),
            Err(EffectError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn malformed_config_fails_init() {
        let setup = EffectSetup {
            effect_type: "scan".into(),
            config: json!({ "speed": "fast" }),
        };
        assert!(matches!(
            create_effect(&setup, 30),
            Err(EffectError::InitFailed { .. })
        ));
    }
}
