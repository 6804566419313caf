//! FFT-based spectral embedding backend
//!
//! Frames the signal with a Hann window, takes the magnitude spectrum per
//! frame, and summarizes frame-level descriptors (centroid, flatness,
//! rolloff, flux, energy) into a fixed 8-dimensional vector.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use super::{check_audio, EmbeddingBackend};
use crate::error::{WorkerError, WorkerResult};

/// FFT frame size (2048 samples = ~46ms at 44.1kHz)
const FRAME_SIZE: usize = 2048;

/// Hop size between frames (75% overlap)
const HOP_SIZE: usize = 512;

/// Rolloff percentile used for the rolloff descriptor
const ROLLOFF_PERCENTILE: f32 = 0.85;

pub const SPECTRAL_MODEL_ID: &str = "spectral-v1";
pub const SPECTRAL_DIMENSIONS: usize = 8;

/// Spectral summary backend, model `spectral-v1`
pub struct SpectralBackend {
    fft: Arc<dyn RealToComplex<f32>>,
    /// Pre-computed Hann window coefficients
    window: Vec<f32>,
}

impl SpectralBackend {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FRAME_SIZE);
        let window: Vec<f32> = apodize::hanning_iter(FRAME_SIZE)
            .map(|x| x as f32)
            .collect();
        Self { fft, window }
    }

    /// Magnitude spectrum of one windowed frame
    fn spectrum(&self, frame: &[f32]) -> WorkerResult<Vec<f32>> {
        let mut input: Vec<f32> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| s * w)
            .collect();
        let mut output = vec![Complex::new(0.0f32, 0.0f32); FRAME_SIZE / 2 + 1];

        self.fft
            .process(&mut input, &mut output)
            .map_err(|e| WorkerError::Internal(format!("fft failed: {e}")))?;

        Ok(output
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt())
            .collect())
    }
}

impl Default for SpectralBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingBackend for SpectralBackend {
    fn model_id(&self) -> &'static str {
        SPECTRAL_MODEL_ID
    }

    fn dimensions(&self) -> usize {
        SPECTRAL_DIMENSIONS
    }

    fn embed(&self, samples: &[f32], sample_rate: u32) -> WorkerResult<Vec<f32>> {
        check_audio(samples, sample_rate)?;

        let bin_width = sample_rate as f32 / FRAME_SIZE as f32;

        let mut centroids = Vec::new();
        let mut flatnesses = Vec::new();
        let mut rolloffs = Vec::new();
        let mut fluxes = Vec::new();
        let mut energies = Vec::new();
        let mut prev_spectrum: Option<Vec<f32>> = None;

        let mut offset = 0;
        while offset + FRAME_SIZE <= samples.len() {
            let frame = &samples[offset..offset + FRAME_SIZE];
            let spectrum = self.spectrum(frame)?;

            centroids.push(spectral_centroid(&spectrum, bin_width));
            flatnesses.push(spectral_flatness(&spectrum));
            rolloffs.push(spectral_rolloff(&spectrum, bin_width, ROLLOFF_PERCENTILE));
            if let Some(prev) = &prev_spectrum {
                fluxes.push(spectral_flux(prev, &spectrum));
            }
            energies.push(rms(frame));

            prev_spectrum = Some(spectrum);
            offset += HOP_SIZE;
        }

        // Shorter than one frame: analyze a single zero-padded frame
        if centroids.is_empty() {
            let mut frame = samples.to_vec();
            frame.resize(FRAME_SIZE, 0.0);
            let spectrum = self.spectrum(&frame)?;
            centroids.push(spectral_centroid(&spectrum, bin_width));
            flatnesses.push(spectral_flatness(&spectrum));
            rolloffs.push(spectral_rolloff(&spectrum, bin_width, ROLLOFF_PERCENTILE));
            energies.push(rms(samples));
        }

        let nyquist = sample_rate as f32 / 2.0;
        let embedding = vec![
            mean(&centroids) / nyquist,
            std_dev(&centroids) / nyquist,
            mean(&flatnesses),
            mean(&rolloffs) / nyquist,
            mean(&fluxes),
            mean(&energies),
            std_dev(&energies),
            zero_crossing_rate(samples),
        ];

        debug_assert_eq!(embedding.len(), SPECTRAL_DIMENSIONS);
        Ok(embedding)
    }
}

/// Weighted mean of frequencies, weights are magnitudes. Returns Hz.
fn spectral_centroid(spectrum: &[f32], bin_width: f32) -> f32 {
    let mut weighted_sum = 0.0f32;
    let mut magnitude_sum = 0.0f32;

    for (i, &magnitude) in spectrum.iter().enumerate() {
        weighted_sum += i as f32 * bin_width * magnitude;
        magnitude_sum += magnitude;
    }

    if magnitude_sum > f32::EPSILON {
        weighted_sum / magnitude_sum
    } else {
        0.0
    }
}

/// Geometric over arithmetic mean: 0.0 for pure tones, 1.0 for white noise
fn spectral_flatness(spectrum: &[f32]) -> f32 {
    let valid: Vec<f32> = spectrum
        .iter()
        .copied()
        .filter(|&m| m > f32::EPSILON)
        .collect();
    if valid.is_empty() {
        return 0.0;
    }

    let n = valid.len() as f32;
    let geometric_mean = (valid.iter().map(|&m| m.ln()).sum::<f32>() / n).exp();
    let arithmetic_mean = valid.iter().sum::<f32>() / n;

    if arithmetic_mean > f32::EPSILON {
        (geometric_mean / arithmetic_mean).min(1.0)
    } else {
        0.0
    }
}

/// Frequency below which `percentile` of the spectral energy sits. Hz.
fn spectral_rolloff(spectrum: &[f32], bin_width: f32, percentile: f32) -> f32 {
    let total_energy: f32 = spectrum.iter().map(|&m| m * m).sum();
    if total_energy < f32::EPSILON {
        return 0.0;
    }

    let threshold = total_energy * percentile;
    let mut cumulative = 0.0f32;
    for (i, &magnitude) in spectrum.iter().enumerate() {
        cumulative += magnitude * magnitude;
        if cumulative >= threshold {
            return (i as f32 + 1.0) * bin_width;
        }
    }
    spectrum.len() as f32 * bin_width
}

/// Sum of positive magnitude differences between consecutive spectra
fn spectral_flux(prev: &[f32], curr: &[f32]) -> f32 {
    prev.iter()
        .zip(curr.iter())
        .map(|(&p, &c)| (c - p).max(0.0))
        .sum()
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Sign-change rate normalized to [0, 1]
fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|&v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    variance.sqrt()
}
