//! Audio Pipeline - turns raw PCM chunks into `AudioFeatures` snapshots
//!
//! The pipeline owns the stateful analyzers. `SharedFeatures` is the single
//! publish point between the audio tick and the render tick.

use super::beat::{BeatDetector, BeatStats};
use super::channel::ChannelProcessor;
use super::features::{AudioFeatures, BASS_RANGE, MID_RANGE, TREBLE_LOW};
use super::spectrum::{band_average, SpectrumAnalyzer};
use crate::config::{AudioSettings, BeatSettings, EngineConfig};
use crate::CoreError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Stateful chain: channel processing, spectrum, beat detection
pub struct AudioPipeline {
    channel: ChannelProcessor,
    spectrum: SpectrumAnalyzer,
    beat: BeatDetector,
    smoothed_spectrum: Vec<f32>,
    smoothing: f32,
    gain: f32,
    time: f64,
    chunks_processed: u64,
}

impl AudioPipeline {
    /// Create a pipeline from audio and beat settings
    pub fn new(audio: &AudioSettings, beat: BeatSettings) -> Result<Self, CoreError> {
        let spectrum = SpectrumAnalyzer::new(audio.fft_size, audio.sample_rate)?;
        debug!(
            "AudioPipeline created: buffer_size={}, fft_size={}, smoothing={}",
            audio.buffer_size, audio.fft_size, audio.smoothing
        );
        Ok(Self {
            channel: ChannelProcessor::new(audio.buffer_size, audio.low_pass_strength),
            smoothed_spectrum: vec![0.0; audio.fft_size / 2],
            spectrum,
            beat: BeatDetector::new(beat),
            smoothing: audio.smoothing.clamp(0.0, 0.99),
            gain: if audio.gain.is_finite() { audio.gain } else { 1.0 },
            time: 0.0,
            chunks_processed: 0,
        })
    }

    /// Create a pipeline from the full engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, CoreError> {
        Self::new(&config.audio, config.beat.clone())
    }

    /// Analyze one chunk of decoded PCM.
    ///
    /// An empty right channel means mono input. Empty input is silence.
    pub fn process(&mut self, left: &[f32], right: &[f32], sample_rate: u32) -> AudioFeatures {
        let right = if right.is_empty() { left } else { right };
        let prepare = |channel: &[f32]| -> Vec<f32> {
            channel
                .iter()
                .map(|&s| if s.is_finite() { s * self.gain } else { 0.0 })
                .collect()
        };
        let left = prepare(left);
        let right = prepare(right);
        let timestamp = self.time;

        let (rms, peak) = level(&left, &right);

        self.spectrum.set_sample_rate(sample_rate);
        let mono = ChannelProcessor::create_center_channel(&left, &right);
        let frame = self.spectrum.process(&mono, timestamp);
        let avs_spectrum = SpectrumAnalyzer::to_avs_spectrum(&frame);

        if self.smoothed_spectrum.len() != avs_spectrum.len() {
            self.smoothed_spectrum = vec![0.0; avs_spectrum.len()];
        }
        for (smoothed, value) in self.smoothed_spectrum.iter_mut().zip(avs_spectrum.iter()) {
            *smoothed = *smoothed * self.smoothing + value * (1.0 - self.smoothing);
        }

        let bass = band_average(&self.smoothed_spectrum, &frame.frequencies, BASS_RANGE.0, BASS_RANGE.1);
        let mid = band_average(&self.smoothed_spectrum, &frame.frequencies, MID_RANGE.0, MID_RANGE.1);
        let treble = band_average(
            &self.smoothed_spectrum,
            &frame.frequencies,
            TREBLE_LOW,
            frame.nyquist + 1.0,
        );

        let beat = self.beat.process(&left, &right, timestamp);
        let avs = self.channel.convert_to_avs_format(&left, &right, timestamp);

        if sample_rate > 0 {
            self.time += left.len() as f64 / sample_rate as f64;
        }
        self.chunks_processed += 1;
        if self.chunks_processed % 600 == 0 {
            trace!(
                "AudioPipeline: {} chunks, t={:.2}s, rms={:.4}, bpm={:.1}",
                self.chunks_processed,
                self.time,
                rms,
                beat.bpm
            );
        }

        AudioFeatures {
            waveform_left: avs.left,
            waveform_right: avs.right,
            waveform_center: avs.center,
            spectrum: self.smoothed_spectrum.clone(),
            frequencies: frame.frequencies,
            rms,
            peak,
            bass,
            mid,
            treble,
            bpm: beat.bpm,
            beat: beat.is_beat,
            beat_confidence: beat.confidence,
            time_seconds: timestamp,
        }
    }

    /// Beat detector counters
    pub fn beat_stats(&self) -> BeatStats {
        self.beat.stats()
    }

    /// Stream time of the next chunk in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Reset all analyzer state and the stream clock
    pub fn reset(&mut self) {
        self.beat.reset();
        self.smoothed_spectrum.fill(0.0);
        self.time = 0.0;
        self.chunks_processed = 0;
        debug!("AudioPipeline reset");
    }
}

/// RMS and peak over both channels
fn level(left: &[f32], right: &[f32]) -> (f32, f32) {
    let count = left.len() + right.len();
    if count == 0 {
        return (0.0, 0.0);
    }
    let (sum, peak) = left
        .iter()
        .chain(right.iter())
        .fold((0.0f32, 0.0f32), |(sum, peak), &s| (sum + s * s, peak.max(s.abs())));
    ((sum / count as f32).sqrt(), peak)
}

/// Latest published snapshot, shared between the audio and render ticks.
///
/// One coarse lock guards a reference swap; readers clone the `Arc` and
/// never hold the lock while rendering.
#[derive(Debug, Clone, Default)]
pub struct SharedFeatures {
    latest: Arc<Mutex<Arc<AudioFeatures>>>,
}

impl SharedFeatures {
    /// Create a handle holding a silent snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new snapshot
    pub fn publish(&self, features: AudioFeatures) {
        *self.latest.lock() = Arc::new(features);
    }

    /// The most recently published snapshot
    pub fn latest(&self) -> Arc<AudioFeatures> {
        Arc::clone(&self.latest.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::channel::AVS_BUFFER_SIZE;

    fn tone(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin() * amplitude)
            .collect()
    }

    #[test]
    fn test_silence_is_safe() {
        let mut pipeline = AudioPipeline::from_config(&EngineConfig::default()).unwrap();
        let features = pipeline.process(&[], &[], 44100);
        assert_eq!(features.waveform_left.len(), AVS_BUFFER_SIZE);
        assert_eq!(features.rms, 0.0);
        assert!(!features.beat);
        assert!(features.spectrum.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bass_tone_lands_in_bass_band() {
        let mut pipeline = AudioPipeline::from_config(&EngineConfig::default()).unwrap();
        let samples = tone(100.0, 1024, 0.5);
        let mut features = AudioFeatures::default();
        for _ in 0..10 {
            features = pipeline.process(&samples, &samples, 44100);
        }
        assert!(
            features.bass > features.treble,
            "bass {} treble {}",
            features.bass,
            features.treble
        );
        assert!((features.peak - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_clock_advances() {
        let mut pipeline = AudioPipeline::from_config(&EngineConfig::default()).unwrap();
        let first = pipeline.process(&[0.0; 441], &[], 44100);
        let second = pipeline.process(&[0.0; 441], &[], 44100);
        assert_eq!(first.time_seconds, 0.0);
        assert!((second.time_seconds - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_shared_features_publish() {
        let shared = SharedFeatures::new();
        assert_eq!(shared.latest().rms, 0.0);

        let reader = shared.clone();
        shared.publish(AudioFeatures {
            rms: 0.4,
            ..Default::default()
        });
        assert_eq!(reader.latest().rms, 0.4);
    }
}
