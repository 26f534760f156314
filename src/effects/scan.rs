use crate::audio::AudioFeatures;
use crate::effects::Effect;
use crate::utils::colors;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub speed: f32,
    pub width: f32,
    pub gradient: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            width: 10.0,
            gradient: "linear-gradient(90deg, #ff0000 0%, #00ff00 100%)".to_string(),
        }
    }
}

/// A block of gradient-colored pixels sweeping along the strip,
/// wrapping at the end.
pub struct Scan {
    config: ScanConfig,
    gradient_palette: Vec<[u8; 3]>,
    position: f32,
}

impl Scan {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            gradient_palette: Vec::new(),
            position: 0.0,
        }
    }

    fn rebuild_palette(&mut self) {
        let palette_size = self.config.width.ceil().max(1.0) as usize;
        self.gradient_palette = colors::parse_gradient(&self.config.gradient, palette_size);
    }
}

impl Effect for Scan {
    fn render(&mut self, _audio: &AudioFeatures, frame: &mut [u8]) {
        let pixel_count = frame.len() / 3;
        if pixel_count == 0 {
            return;
        }

        let width = self.config.width.ceil().max(1.0) as usize;
        if self.gradient_palette.len() != width {
            self.rebuild_palette();
        }
        if self.gradient_palette.is_empty() {
            return;
        }

        self.position = (self.position + self.config.speed) % (pixel_count as f32);

        frame.fill(0);

        let start_pixel = self.position.floor() as usize;
        for i in 0..width {
            let pixel_index = (start_pixel + i) % pixel_count;
            let color = self.gradient_palette[i % self.gradient_palette.len()];
            let frame_index = pixel_index * 3;
            frame[frame_index..frame_index + 3].copy_from_slice(&color);
        }
    }

    fn update_config(&mut self, config: Value) -> Result<(), serde_json::Error> {
        self.config = serde_json::from_value(config)?;
        self.gradient_palette.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lights_exactly_width_pixels() {
        let mut effect = Scan::new(ScanConfig {
            speed: 0.0,
            width: 3.0,
            gradient: "#ffffff".into(),
        });
        let mut frame = vec![0u8; 10 * 3];
        effect.render(&AudioFeatures::default(), &mut frame);
        let lit = frame.chunks(3).filter(|p| p.iter().any(|&b| b > 0)).count();
        assert_eq!(lit, 3);
    }

    #[test]
    fn position_wraps_around_strip() {
        let mut effect = Scan::new(ScanConfig {
            speed: 4.0,
            width: 1.0,
            gradient: "#ffffff".into(),
        });
        let mut frame = vec![0u8; 5 * 3];
        for _ in 0..10 {
            effect.render(&AudioFeatures::default(), &mut frame);
        }
        assert!(effect.position < 5.0);
    }
}
