use num_complex::Complex;
use phoenix_core::audio::{fft_in_place, AudioPipeline, ChannelProcessor, SpectrumAnalyzer};
use phoenix_core::{BeatDetector, BeatSettings, EngineConfig};
use proptest::prelude::*;
use rustfft::FftPlanner;

const FRAME_SECS: f64 = 1.0 / 60.0;

fn create_test_samples(count: usize, freq: f32, sample_rate: f32) -> Vec<f32> {
    (0..count)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
        .collect()
}

#[test]
fn test_fft_matches_rustfft() {
    let size = 256;
    let input: Vec<Complex<f32>> = (0..size)
        .map(|i| {
            let t = i as f32;
            Complex::new((t * 0.3).sin() + 0.5 * (t * 1.7).cos(), 0.0)
        })
        .collect();

    let mut ours = input.clone();
    fft_in_place(&mut ours);

    let mut reference = input;
    FftPlanner::<f32>::new()
        .plan_fft_forward(size)
        .process(&mut reference);

    for (i, (a, b)) in ours.iter().zip(reference.iter()).enumerate() {
        assert!(
            (a - b).norm() < 1e-2,
            "bin {} differs: ours={} rustfft={}",
            i,
            a,
            b
        );
    }
}

#[test]
fn test_sine_peak_within_one_bin() {
    let sample_rate = 48000;
    let mut analyzer = SpectrumAnalyzer::new(2048, sample_rate).unwrap();
    for freq in [60.0f32, 440.0, 3520.0, 12000.0] {
        let frame = analyzer.process(&create_test_samples(2048, freq, sample_rate as f32), 0.0);
        let peak = frame.peak_bin().unwrap() as f32;
        let expected = freq / frame.frequency_resolution;
        assert!(
            (peak - expected).abs() <= 1.0,
            "{} Hz: peak bin {} expected {}",
            freq,
            peak,
            expected
        );
    }
}

#[test]
fn test_non_power_of_two_rejected() {
    for size in [6, 12, 500, 1536, 3000] {
        assert!(SpectrumAnalyzer::new(size, 44100).is_err(), "size {}", size);
    }
}

#[test]
fn test_pulse_train_bpm() {
    let mut detector = BeatDetector::new(BeatSettings::default());
    let loud = vec![0.8f32; 576];
    let quiet = vec![0.05f32; 576];

    let mut beats = 0;
    // 100 BPM at 60 frames per second: one pulse every 36 frames
    for frame in 0..1800 {
        let samples = if frame % 36 == 0 { &loud } else { &quiet };
        if detector
            .process(samples, samples, frame as f64 * FRAME_SECS)
            .is_beat
        {
            beats += 1;
        }
    }

    let stats = detector.stats();
    assert_eq!(stats.total_beats_detected, beats);
    assert!(
        (stats.current_bpm - 100.0).abs() < 2.0,
        "bpm was {}",
        stats.current_bpm
    );

    detector.reset();
    assert_eq!(detector.stats().total_beats_detected, 0);
}

#[test]
fn test_pipeline_beats_on_kick() {
    let mut pipeline = AudioPipeline::from_config(&EngineConfig::default()).unwrap();
    let quiet: Vec<f32> = create_test_samples(735, 440.0, 44100.0)
        .iter()
        .map(|s| s * 0.05)
        .collect();
    let kick: Vec<f32> = create_test_samples(735, 60.0, 44100.0)
        .iter()
        .map(|s| s * 0.9)
        .collect();

    let mut beat_frames = Vec::new();
    for frame in 0..200 {
        let chunk = if frame == 150 { &kick } else { &quiet };
        if pipeline.process(chunk, chunk, 44100).beat {
            beat_frames.push(frame);
        }
    }
    assert_eq!(beat_frames, vec![150]);
}

proptest! {
    #[test]
    fn prop_downsample_length_matches_target(
        data in prop::collection::vec(-1.0f32..1.0, 0..2048),
        target in 0usize..1200,
    ) {
        prop_assert_eq!(ChannelProcessor::downsample(&data, target).len(), target);
    }

    #[test]
    fn prop_downsample_identity(data in prop::collection::vec(-1.0f32..1.0, 1..1024)) {
        prop_assert_eq!(ChannelProcessor::downsample(&data, data.len()), data);
    }

    #[test]
    fn prop_normalize_bounds(data in prop::collection::vec(-10.0f32..10.0, 0..512)) {
        let out = ChannelProcessor::normalize(&data, 1.0);
        prop_assert_eq!(out.len(), data.len());
        prop_assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0 + 1e-5));
    }
}

#[test]
fn test_normalize_zeros() {
    assert_eq!(ChannelProcessor::normalize(&[0.0; 64], 1.0), vec![0.0; 64]);
}
