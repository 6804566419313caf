//! Pitch-class (chroma) embedding backend
//!
//! Folds spectral energy into the 12 pitch classes regardless of octave,
//! averaged over overlapping windows and normalized to unit sum.

use rustfft::{num_complex::Complex, FftPlanner};

use super::{check_audio, EmbeddingBackend};
use crate::error::WorkerResult;

/// Window size: 4096 samples at 44.1kHz gives ~10.7 Hz resolution
const WINDOW_SIZE: usize = 4096;
const HOP_SIZE: usize = WINDOW_SIZE / 2;

/// Frequency range of interest: A0 (~27.5 Hz) to C8 (~4186 Hz)
const MIN_FREQ: f32 = 27.5;
const MAX_FREQ: f32 = 4186.0;

pub const CHROMA_MODEL_ID: &str = "chroma-v1";
pub const CHROMA_DIMENSIONS: usize = 12;

/// Chromagram backend, model `chroma-v1`
#[derive(Default)]
pub struct ChromaBackend;

impl ChromaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingBackend for ChromaBackend {
    fn model_id(&self) -> &'static str {
        CHROMA_MODEL_ID
    }

    fn dimensions(&self) -> usize {
        CHROMA_DIMENSIONS
    }

    fn embed(&self, samples: &[f32], sample_rate: u32) -> WorkerResult<Vec<f32>> {
        check_audio(samples, sample_rate)?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(WINDOW_SIZE);

        let hann: Vec<f32> = apodize::hanning_iter(WINDOW_SIZE)
            .map(|x| x as f32)
            .collect();

        let mut chromagram = [0.0f32; CHROMA_DIMENSIONS];
        let mut window_count = 0usize;

        // Pad clips shorter than one window instead of returning nothing
        let padded;
        let signal = if samples.len() < WINDOW_SIZE {
            let mut buf = samples.to_vec();
            buf.resize(WINDOW_SIZE, 0.0);
            padded = buf;
            &padded[..]
        } else {
            samples
        };

        let mut offset = 0;
        while offset + WINDOW_SIZE <= signal.len() {
            let mut buffer: Vec<Complex<f32>> = signal[offset..offset + WINDOW_SIZE]
                .iter()
                .zip(hann.iter())
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            fft.process(&mut buffer);

            let bin_width = sample_rate as f32 / WINDOW_SIZE as f32;
            for (bin, value) in buffer.iter().take(WINDOW_SIZE / 2).enumerate() {
                let freq = bin as f32 * bin_width;
                if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
                    continue;
                }
                let pitch_class = frequency_to_pitch_class(freq);
                chromagram[pitch_class] += value.norm();
            }

            window_count += 1;
            offset += HOP_SIZE;
        }

        if window_count > 0 {
            for value in chromagram.iter_mut() {
                *value /= window_count as f32;
            }
        }

        // Normalize to unit sum so loudness does not leak into the profile
        let total: f32 = chromagram.iter().sum();
        if total > f32::EPSILON {
            for value in chromagram.iter_mut() {
                *value /= total;
            }
        }

        Ok(chromagram.to_vec())
    }
}

/// Map a frequency to its pitch class (0 = C, ..., 11 = B)
fn frequency_to_pitch_class(freq: f32) -> usize {
    // MIDI note number relative to A4 = 440 Hz = note 69
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    (midi.round() as i32).rem_euclid(12) as usize
}
