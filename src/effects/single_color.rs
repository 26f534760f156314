use crate::audio::AudioFeatures;
use crate::effects::Effect;
use crate::utils::colors;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleColorConfig {
    pub color: String,
    pub brightness: f32,
}

impl Default for SingleColorConfig {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            brightness: 1.0,
        }
    }
}

/// Static fill; the simplest generator and the one used to sanity
/// check a new device mapping.
pub struct SingleColor {
    config: SingleColorConfig,
}

impl SingleColor {
    pub fn new(config: SingleColorConfig) -> Self {
        Self { config }
    }

    fn rgb(&self) -> [u8; 3] {
        let base = colors::parse_single_color(&self.config.color).unwrap_or([255, 255, 255]);
        let level = self.config.brightness.clamp(0.0, 1.0);
        [
            (base[0] as f32 * level) as u8,
            (base[1] as f32 * level) as u8,
            (base[2] as f32 * level) as u8,
        ]
    }
}

impl Effect for SingleColor {
    fn render(&mut self, _audio: &AudioFeatures, frame: &mut [u8]) {
        let rgb = self.rgb();
        for pixel in frame.chunks_mut(3) {
            pixel.copy_from_slice(&rgb);
        }
    }

    fn update_config(&mut self, config: Value) -> Result<(), serde_json::Error> {
        self.config = serde_json::from_value(config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_frame_with_scaled_color() {
        let mut effect = SingleColor::new(SingleColorConfig {
            color: "#ff0080".into(),
            brightness: 0.5,
        });
        let mut frame = vec![0u8; 9];
        effect.render(&AudioFeatures::default(), &mut frame);
        assert_eq!(frame, vec![127, 0, 64, 127, 0, 64, 127, 0, 64]);
    }
}
