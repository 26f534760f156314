use crate::audio::{highs_power, lows_power, mids_power, AudioFeatures};
use crate::effects::Effect;
use crate::utils::colors::hsv_to_rgb;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyRange {
    #[default]
    Lows,
    Mids,
    Highs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub frequency_range: FrequencyRange,
    pub sensitivity: f32,
    pub decay: f32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            frequency_range: FrequencyRange::Lows,
            sensitivity: 1.0,
            decay: 0.1,
        }
    }
}

/// Audio-reactive bar: band energy drives how far a rainbow bar
/// extends from the start of the strip, with a decaying peak so the
/// bar falls back smoothly between beats.
pub struct Power {
    config: PowerConfig,
    hsv_array: Vec<(f32, f32)>,
    bar_level: f32,
}

impl Power {
    pub fn new(config: PowerConfig, pixel_count: usize) -> Self {
        let mut hsv_array = vec![(0.0, 1.0); pixel_count];
        for (i, hsv) in hsv_array.iter_mut().enumerate() {
            hsv.0 = i as f32 / pixel_count as f32;
        }
        Self {
            config,
            hsv_array,
            bar_level: 0.0,
        }
    }
}

impl Effect for Power {
    fn render(&mut self, audio: &AudioFeatures, frame: &mut [u8]) {
        let pixel_count = frame.len() / 3;
        if pixel_count == 0 {
            return;
        }

        let power = match self.config.frequency_range {
            FrequencyRange::Lows => lows_power(&audio.melbanks),
            FrequencyRange::Mids => mids_power(&audio.melbanks),
            FrequencyRange::Highs => highs_power(&audio.melbanks),
        };
        let level = (power * self.config.sensitivity).clamp(0.0, 1.0);
        self.bar_level = level.max(self.bar_level - self.config.decay.max(0.0));

        frame.fill(0);
        let lit = (self.bar_level * pixel_count as f32) as usize;
        for i in 0..lit.min(pixel_count) {
            let (hue, saturation) = self.hsv_array[i.min(self.hsv_array.len() - 1)];
            let rgb = hsv_to_rgb(hue * 360.0, saturation, 1.0);
            frame[i * 3..i * 3 + 3].copy_from_slice(&rgb);
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
    fn silence_renders_black_after_decay() {
        let mut effect = Power::new(
            PowerConfig {
                decay: 1.0,
                ..Default::default()
            },
            8,
        );
        let mut frame = vec![0u8; 8 * 3];
        effect.render(&AudioFeatures::new(128), &mut frame);
        assert!(frame.iter().all(|&b| b == 0));
    }

    #[test]
    fn full_band_energy_lights_the_whole_bar() {
        let mut effect = Power::new(PowerConfig::default(), 8);
        let audio = AudioFeatures {
            melbanks: vec![1.0; 128],
        };
        let mut frame = vec![0u8; 8 * 3];
        effect.render(&audio, &mut frame);
        let lit = frame.chunks(3).filter(|p| p.iter().any(|&b| b > 0)).count();
        assert_eq!(lit, 8);
    }
}
