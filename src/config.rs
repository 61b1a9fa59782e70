#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::Error, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, SAMPLE_RATE};

/// How carriers in column 0 are tuned and mixed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixMode {
    /// FM operator grid. Note events retune every column-0 carrier.
    Grid,
    /// Harmonic series: row `k` plays `base_frequency * 2^k` at
    /// `master_volume / 2^k`.
    Additive { base_frequency: f32 },
}

/// What happens when the carrier at `(0, 0)` is switched off.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Playback ends when voice 0 stops.
    SingleVoice,
    /// Voices stop independently; playback continues until stopped.
    Continuous,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Samples per buffer. Every render produces exactly this many.
    pub block_size: usize,
    /// Output channels (1 or 2). Mono blocks are copied to each channel.
    pub channels: u16,
    pub rows: usize,
    pub cols: usize,
    pub mode: MixMode,
    pub playback: PlaybackMode,
    pub master_volume: f32,
    /// Output device name. `None` picks the host default.
    pub device: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            channels: 1,
            rows: 6,
            cols: 6,
            mode: MixMode::Grid,
            playback: PlaybackMode::SingleVoice,
            master_volume: 1.0,
            device: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be positive".into()));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidConfig(format!(
                "block size {} outside 1..={MAX_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(Error::InvalidConfig(format!(
                "{} channels requested, only mono or stereo supported",
                self.channels
            )));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::InvalidConfig(format!(
                "operator grid {}x{} is empty",
                self.rows, self.cols
            )));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(Error::InvalidConfig(format!(
                "master volume {} outside 0..=1",
                self.master_volume
            )));
        }
        if let MixMode::Additive { base_frequency } = self.mode {
            if !(base_frequency > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "additive base frequency {base_frequency} must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Wall-clock budget for rendering one buffer.
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}
