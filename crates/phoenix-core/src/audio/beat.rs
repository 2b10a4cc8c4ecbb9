//! Beat Detector - adaptive energy threshold with BPM tracking
//!
//! Each processed frame contributes one energy value. A beat fires when the
//! energy clearly rises above the rolling statistics of the recent past.

use crate::config::BeatSettings;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Energy used to seed the history after a reset
const SEED_ENERGY: f32 = 1e-4;

/// Energy must exceed the rolling average by this factor
const AVERAGE_MARGIN: f32 = 1.2;

/// A beat further than this fraction away from the expected period counts
/// as a false positive
const FALSE_POSITIVE_TOLERANCE: f64 = 0.5;

/// Intervals needed before a BPM estimate is produced
const MIN_INTERVALS_FOR_BPM: usize = 3;

/// Outcome of one processed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatResult {
    /// A beat fired on this frame
    pub is_beat: bool,
    /// Frame energy (RMS over both channels)
    pub energy: f32,
    /// Adaptive threshold used for this frame
    pub threshold: f32,
    /// Current tempo estimate (0.0 until enough beats were seen)
    pub bpm: f32,
    /// Temporal consistency of recent beats (0.0 - 1.0)
    pub confidence: f32,
}

/// Snapshot of detector counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatStats {
    /// Beats detected since the last reset
    pub total_beats_detected: u64,
    /// Beats that did not match the established tempo
    pub false_positives: u64,
    /// Current tempo estimate
    pub current_bpm: f32,
    /// Current confidence
    pub confidence: f32,
    /// Most recent adaptive threshold
    pub threshold: f32,
    /// Timestamp of the most recent beat
    pub last_beat_time: Option<f64>,
}

/// Adaptive-threshold beat detector
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: BeatSettings,

    /// Rolling frame energies, capacity `history_size`
    energy_history: VecDeque<f32>,

    /// Timestamps of recent beats, newest last
    beat_times: VecDeque<f64>,

    /// Valid inter-beat intervals in seconds
    intervals: VecDeque<f64>,

    /// True while the history only holds the reset baseline
    seeded: bool,

    current_bpm: f32,
    threshold: f32,
    confidence: f32,
    total_beats: u64,
    false_positives: u64,
    frames_processed: u64,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(BeatSettings::default())
    }
}

impl BeatDetector {
    /// Create a detector with the given settings
    pub fn new(config: BeatSettings) -> Self {
        let mut config = config;
        config.history_size = config.history_size.max(1);
        config.interval_history = config.interval_history.max(MIN_INTERVALS_FOR_BPM);
        if config.max_bpm <= config.min_bpm {
            config.max_bpm = config.min_bpm + 1.0;
        }

        let mut detector = Self {
            energy_history: VecDeque::with_capacity(config.history_size),
            beat_times: VecDeque::with_capacity(config.interval_history + 1),
            intervals: VecDeque::with_capacity(config.interval_history),
            seeded: true,
            current_bpm: 0.0,
            threshold: config.min_threshold,
            confidence: 0.0,
            total_beats: 0,
            false_positives: 0,
            frames_processed: 0,
            config,
        };
        detector.seed_history();
        detector
    }

    fn seed_history(&mut self) {
        self.energy_history.clear();
        self.energy_history
            .extend(std::iter::repeat(SEED_ENERGY).take(self.config.history_size));
        self.seeded = true;
    }

    /// RMS energy over both channels; empty input is silence
    pub fn frame_energy(left: &[f32], right: &[f32]) -> f32 {
        let count = left.len() + right.len();
        if count == 0 {
            return 0.0;
        }
        let sum: f32 = left
            .iter()
            .chain(right.iter())
            .map(|&s| if s.is_finite() { s * s } else { 0.0 })
            .sum();
        (sum / count as f32).sqrt()
    }

    /// Process one frame of stereo samples
    pub fn process(&mut self, left: &[f32], right: &[f32], timestamp: f64) -> BeatResult {
        self.process_energy(Self::frame_energy(left, right), timestamp)
    }

    /// Process one precomputed frame energy
    pub fn process_energy(&mut self, energy: f32, timestamp: f64) -> BeatResult {
        let energy = if energy.is_finite() { energy.max(0.0) } else { 0.0 };
        self.frames_processed += 1;

        if self.seeded {
            // First real frame replaces the baseline
            self.energy_history.iter_mut().for_each(|e| *e = energy);
            self.seeded = false;
        } else {
            self.energy_history.push_back(energy);
            while self.energy_history.len() > self.config.history_size {
                self.energy_history.pop_front();
            }
        }

        let count = self.energy_history.len() as f32;
        let average = self.energy_history.iter().sum::<f32>() / count;
        let variance = self
            .energy_history
            .iter()
            .map(|e| (e - average).powi(2))
            .sum::<f32>()
            / count;

        self.threshold = ((average + 0.5 * variance) * self.config.threshold_multiplier)
            .max(self.config.min_threshold);

        let cooldown = 60.0 / self.config.max_bpm as f64;
        let cooled_down = self
            .last_beat_time()
            .map_or(true, |last| timestamp - last >= cooldown);

        let is_beat =
            energy > self.threshold && cooled_down && energy >= average * AVERAGE_MARGIN;

        if is_beat {
            self.register_beat(timestamp);
        }

        if self.frames_processed % 600 == 0 {
            trace!(
                "BeatDetector: {} frames, {} beats, bpm={:.1}, threshold={:.5}",
                self.frames_processed,
                self.total_beats,
                self.current_bpm,
                self.threshold
            );
        }

        BeatResult {
            is_beat,
            energy,
            threshold: self.threshold,
            bpm: self.current_bpm,
            confidence: self.confidence,
        }
    }

    fn register_beat(&mut self, timestamp: f64) {
        self.total_beats += 1;

        if let Some(last) = self.last_beat_time() {
            let interval = timestamp - last;
            let min_interval = 60.0 / self.config.max_bpm as f64;
            let max_interval = 60.0 / self.config.min_bpm as f64;

            if self.current_bpm > 0.0 {
                let expected = 60.0 / self.current_bpm as f64;
                if ((interval - expected) / expected).abs() > FALSE_POSITIVE_TOLERANCE {
                    self.false_positives += 1;
                }
            }

            if (min_interval..=max_interval).contains(&interval) {
                self.intervals.push_back(interval);
                while self.intervals.len() > self.config.interval_history {
                    self.intervals.pop_front();
                }
                self.update_bpm();
            }
        }

        self.beat_times.push_back(timestamp);
        while self.beat_times.len() > self.config.interval_history + 1 {
            self.beat_times.pop_front();
        }
        self.update_confidence();
    }

    fn update_bpm(&mut self) {
        if self.intervals.len() < MIN_INTERVALS_FOR_BPM {
            return;
        }

        let mut sorted: Vec<f64> = self.intervals.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        if median <= 0.0 {
            return;
        }

        let estimate = (60.0 / median) as f32;
        self.current_bpm = if self.current_bpm > 0.0 {
            let weight = self.config.bpm_smoothing.clamp(0.0, 1.0);
            self.current_bpm * weight + estimate * (1.0 - weight)
        } else {
            estimate
        };

        debug!(
            "BPM estimate {:.1} (median interval {:.3}s over {} intervals)",
            self.current_bpm,
            median,
            self.intervals.len()
        );
    }

    fn update_confidence(&mut self) {
        if self.intervals.len() < 2 {
            self.confidence = 0.0;
            return;
        }

        let n = self.intervals.len() as f64;
        let mean = self.intervals.iter().sum::<f64>() / n;
        let variance = self.intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / n;
        let cv = if mean > 0.0 { variance.sqrt() / mean } else { 1.0 };

        let consistency = 1.0 / (1.0 + cv);
        let false_ratio = if self.total_beats > 0 {
            self.false_positives as f64 / self.total_beats as f64
        } else {
            0.0
        };

        self.confidence = (consistency * (1.0 - false_ratio)).clamp(0.0, 1.0) as f32;
    }

    /// Current tempo estimate (0.0 when unknown)
    pub fn bpm(&self) -> f32 {
        self.current_bpm
    }

    /// Current confidence (0.0 - 1.0)
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Timestamp of the most recent beat
    pub fn last_beat_time(&self) -> Option<f64> {
        self.beat_times.back().copied()
    }

    /// Recent beat timestamps, oldest first
    pub fn recent_beats(&self) -> impl Iterator<Item = f64> + '_ {
        self.beat_times.iter().copied()
    }

    /// Counter snapshot
    pub fn stats(&self) -> BeatStats {
        BeatStats {
            total_beats_detected: self.total_beats,
            false_positives: self.false_positives,
            current_bpm: self.current_bpm,
            confidence: self.confidence,
            threshold: self.threshold,
            last_beat_time: self.last_beat_time(),
        }
    }

    /// Clear all history and counters
    pub fn reset(&mut self) {
        self.seed_history();
        self.beat_times.clear();
        self.intervals.clear();
        self.current_bpm = 0.0;
        self.threshold = self.config.min_threshold;
        self.confidence = 0.0;
        self.total_beats = 0;
        self.false_positives = 0;
        self.frames_processed = 0;

        debug!("BeatDetector reset");
    }
}
