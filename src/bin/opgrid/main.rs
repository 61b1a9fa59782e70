//! opgrid - terminal FM operator grid
//!
//! Run with: cargo run -- --help

mod app;
mod ui;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::WrapErr;

use app::App;
use opgrid::{
    config::{MixMode, PlaybackMode},
    io::{list_output_devices, Player},
    synth::SynthEngine,
    EngineConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// FM operator grid; notes retune every carrier
    Grid,
    /// Harmonic rows at base * 2^row
    Additive,
}

/// Realtime FM operator grid synthesizer
#[derive(Parser, Debug)]
#[command(name = "opgrid")]
#[command(version)]
struct Args {
    /// Sample rate in Hz
    #[arg(long, default_value_t = opgrid::SAMPLE_RATE)]
    sample_rate: u32,

    /// Samples per rendered buffer
    #[arg(long, default_value_t = opgrid::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// Output channels (1 or 2)
    #[arg(long, default_value_t = 1)]
    channels: u16,

    /// Grid rows (voices)
    #[arg(long, default_value_t = 6)]
    rows: usize,

    /// Grid columns (operators per voice)
    #[arg(long, default_value_t = 6)]
    cols: usize,

    #[arg(long, value_enum, default_value_t = Mode::Grid)]
    mode: Mode,

    /// Base frequency for additive mode
    #[arg(long, default_value_t = 110.0)]
    base_frequency: f32,

    /// Keep playing when voice 0 is switched off
    #[arg(long)]
    continuous: bool,

    /// Output device name (see --list-devices)
    #[arg(long)]
    device: Option<String>,

    /// Print output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (error, warn, info, debug, trace). Logs go to stderr
    #[arg(long, default_value_t = log::Level::Warn)]
    log_level: log::Level,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            channels: self.channels,
            rows: self.rows,
            cols: self.cols,
            mode: match self.mode {
                Mode::Grid => MixMode::Grid,
                Mode::Additive => MixMode::Additive {
                    base_frequency: self.base_frequency,
                },
            },
            playback: if self.continuous {
                PlaybackMode::Continuous
            } else {
                PlaybackMode::SingleVoice
            },
            device: self.device.clone(),
            ..Default::default()
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.to_level_filter())
        .init()?;

    if args.list_devices {
        for name in list_output_devices().wrap_err("failed to enumerate output devices")? {
            println!("{name}");
        }
        return Ok(());
    }

    let config = args.engine_config();
    config.validate().wrap_err("invalid engine configuration")?;

    let (engine, handle) =
        SynthEngine::with_channels(&config).wrap_err("failed to build synth engine")?;
    let player = Player::new(config.clone(), engine).wrap_err("failed to set up playback")?;
    let mut app = App::new(config, player, handle);

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
