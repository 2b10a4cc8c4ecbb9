use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "phoenix", about = "Headless AVS preset replay")]
pub struct Cli {
    /// Preset file (legacy binary or text)
    pub preset: PathBuf,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of frames to render at 60 Hz
    #[arg(short, long, default_value_t = 600)]
    pub frames: u64,

    /// Print the parsed preset as JSON
    #[arg(long)]
    pub dump: bool,

    /// Log level, overrides the config file
    #[arg(long)]
    pub log_level: Option<String>,

    /// Tempo of the synthetic audio source
    #[arg(long, default_value_t = 120.0)]
    pub bpm: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["phoenix", "wave.avs"]).unwrap();
        assert_eq!(cli.preset, PathBuf::from("wave.avs"));
        assert_eq!(cli.frames, 600);
        assert!(!cli.dump);
        assert_eq!(cli.bpm, 120.0);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "phoenix", "wave.avs", "--config", "engine.toml", "--frames", "30", "--dump",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("engine.toml")));
        assert_eq!(cli.frames, 30);
        assert!(cli.dump);
    }
}
