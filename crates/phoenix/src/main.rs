//! PhoenixFlow - headless AVS preset replay host
//!
//! Parses a preset on a background thread, feeds a synthetic audio signal
//! through the analysis pipeline on an audio thread and renders the effect
//! graph at 60 Hz on a render thread into a counting sink.

mod cli;
mod logging_setup;
mod stats;
mod synth;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use phoenix_core::{AudioTick, EngineConfig, FrameOrchestrator, RenderTick};
use phoenix_io::PresetLoader;
use stats::StatsSink;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use synth::SyntheticSource;
use tracing::{error, info, trace, warn};

const FRAME_RATE: u32 = 60;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file: {}", path.display()))
}

fn run_audio(
    mut tick: AudioTick,
    mut source: SyntheticSource,
    running: Arc<AtomicBool>,
) -> AudioTick {
    let block = (source.sample_rate() / FRAME_RATE) as usize;
    let block_time = Duration::from_secs_f64(block as f64 / source.sample_rate() as f64);
    let mut blocks = 0u64;

    while running.load(Ordering::Acquire) {
        let (left, right) = source.next_block(block);
        let features = tick.process(&left, &right, source.sample_rate());
        blocks += 1;
        if blocks % u64::from(FRAME_RATE) == 0 {
            trace!(
                "audio t={:.1}s rms={:.3} bpm={:.1} confidence={:.2}",
                features.time_seconds,
                features.rms,
                features.bpm,
                features.beat_confidence
            );
        }
        thread::sleep(block_time);
    }
    tick
}

fn run_render(mut tick: RenderTick, frames: u64) -> StatsSink {
    let ticker = crossbeam_channel::tick(Duration::from_secs(1) / FRAME_RATE);
    let mut stats = StatsSink::default();

    for _ in 0..frames {
        if ticker.recv().is_err() {
            warn!("Frame clock stopped");
            break;
        }
        match tick.tick(&mut stats) {
            Ok(report) => stats.record_report(&report),
            // Already logged; the fallback has been drawn
            Err(_) => stats.record_error(),
        }
    }
    stats
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    logging_setup::init(&config.logging)?;

    info!("Loading preset {}", cli.preset.display());
    let loader = PresetLoader::with_builtin_catalog().context("Failed to build preset parser")?;
    let preset = loader
        .spawn(cli.preset.clone())
        .recv_timeout(LOAD_TIMEOUT)
        .context("Preset loader did not answer")?
        .with_context(|| format!("Failed to load preset: {}", cli.preset.display()))?;
    info!(
        "Preset detected as {} ({:.0}% confidence): {} effects, {} scopes",
        preset.detection.file_type,
        preset.detection.confidence * 100.0,
        preset.effects.len(),
        preset.scopes.len()
    );
    for scope in preset.scopes.iter().filter(|s| !s.valid) {
        warn!(
            "Scope '{}' is invalid: {}",
            scope.name,
            scope.invalid_reason.as_deref().unwrap_or("unknown reason")
        );
    }

    if cli.dump {
        let json = serde_json::to_string_pretty(&preset).context("Failed to serialize preset")?;
        println!("{}", json);
    }

    let orchestrator = FrameOrchestrator::new(&config).context("Failed to create engine")?;
    if let Err(e) = orchestrator.load_preset(&preset) {
        error!("Preset could not be turned into an effect graph: {}", e);
    }
    let (audio_tick, render_tick, _stager) = orchestrator.split();

    let running = Arc::new(AtomicBool::new(true));
    let source = SyntheticSource::new(config.audio.sample_rate, cli.bpm);
    let audio = {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("phoenix-audio".to_string())
            .spawn(move || run_audio(audio_tick, source, running))
            .context("Failed to spawn audio thread")?
    };
    let frames = cli.frames;
    let render = thread::Builder::new()
        .name("phoenix-render".to_string())
        .spawn(move || run_render(render_tick, frames))
        .context("Failed to spawn render thread")?;

    let render_result = render.join();
    running.store(false, Ordering::Release);
    let audio_tick = audio.join().map_err(|_| anyhow!("Audio thread panicked"))?;
    let stats = render_result.map_err(|_| anyhow!("Render thread panicked"))?;

    let beat = audio_tick.pipeline().beat_stats();
    println!("{}", stats);
    println!(
        "beats: {} (false positives {}), bpm {:.1}, confidence {:.2}",
        beat.total_beats_detected, beat.false_positives, beat.current_bpm, beat.confidence
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_core::RenderMode;
    use std::io::Write;

    #[test]
    fn test_load_config_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_load_config_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[render]\nmode = \"round_robin\"\nrotate_interval_secs = 2.5\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.render.mode, RenderMode::RoundRobin);
        assert_eq!(config.render.rotate_interval_secs, 2.5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.audio.fft_size, 1024);
    }

    #[test]
    fn test_load_config_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render\nmode = 3").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
