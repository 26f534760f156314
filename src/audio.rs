//! Interface to the audio analysis stage.
//!
//! Capture and DSP live outside this crate; effects consume a
//! read-only snapshot of the latest band energies once per tick.

use std::sync::{Arc, Mutex};

/// Per-tick snapshot of the analysis output: one energy value per
/// melbank, normalized to roughly [0, 1].
#[derive(Debug, Default, Clone)]
pub struct AudioFeatures {
    pub melbanks: Vec<f32>,
}

impl AudioFeatures {
    pub fn new(num_bands: usize) -> Self {
        Self {
            melbanks: vec![0.0; num_bands],
        }
    }
}

/// Shared handle the external capture stage writes into and the
/// scheduler clones from at each tick boundary.
#[derive(Default, Clone)]
pub struct SharedAudioFeatures(pub Arc<Mutex<AudioFeatures>>);

impl SharedAudioFeatures {
    pub fn snapshot(&self) -> AudioFeatures {
        self.0.lock().unwrap().clone()
    }
}

const BASS_HIGH: usize = 15;
const MIDS_LOW: usize = 16;
const MIDS_HIGH: usize = 63;
const HIGHS_LOW: usize = 64;
const HIGHS_HIGH: usize = 127;

fn band_power(melbanks: &[f32], low: usize, high: usize) -> f32 {
    let high = high.min(melbanks.len().saturating_sub(1));
    let low = low.min(high);
    if melbanks.is_empty() {
        return 0.0;
    }
    let slice = &melbanks[low..=high];
    slice.iter().sum::<f32>() / slice.len() as f32
}

pub fn lows_power(melbanks: &[f32]) -> f32 {
    band_power(melbanks, 0, BASS_HIGH)
}

pub fn mids_power(melbanks: &[f32]) -> f32 {
    band_power(melbanks, MIDS_LOW, MIDS_HIGH)
}

pub fn highs_power(melbanks: &[f32]) -> f32 {
    band_power(melbanks, HIGHS_LOW, HIGHS_HIGH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_power_is_mean_of_range() {
        let mut melbanks = vec![0.0; 128];
        for v in melbanks.iter_mut().take(16) {
            *v = 1.0;
        }
        assert!((lows_power(&melbanks) - 1.0).abs() < 1e-6);
        assert!(mids_power(&melbanks).abs() < 1e-6);
    }

    #[test]
    fn empty_melbanks_yield_zero() {
        assert_eq!(lows_power(&[]), 0.0);
        assert_eq!(highs_power(&[]), 0.0);
    }
}
