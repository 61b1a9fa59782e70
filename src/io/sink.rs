use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    error::Error,
    synth::engine::{BlockStatus, SynthEngine},
};

/// Push-based destination for rendered mono blocks.
pub trait AudioSink {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Deliver one mono block. Sinks with more than one channel copy it to
    /// every channel.
    fn write(&mut self, block: &[f32]) -> Result<(), Error>;
}

/// Sink that collects interleaved output in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    sample_rate: u32,
    channels: u16,
    pub samples: Vec<f32>,
}

impl BufferSink {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            samples: Vec::new(),
        }
    }

    /// Number of frames written so far.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Samples of one channel, de-interleaved.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }
}

impl AudioSink for BufferSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn write(&mut self, block: &[f32]) -> Result<(), Error> {
        let channels = self.channels as usize;
        self.samples.reserve(block.len() * channels);
        for &s in block {
            for _ in 0..channels {
                self.samples.push(s);
            }
        }
        Ok(())
    }
}

/// Drive `engine` in a push loop, writing up to `blocks` buffers to `sink`.
///
/// Stops early when the engine finishes. Returns the number of blocks
/// written.
pub fn render_to_sink(
    engine: &mut SynthEngine,
    sink: &mut impl AudioSink,
    blocks: usize,
) -> Result<usize, Error> {
    let mut block = vec![0.0f32; engine.block_size()];
    for written in 0..blocks {
        if engine.render_block(&mut block) == BlockStatus::Finished {
            log::info!("engine finished after {written} blocks");
            return Ok(written);
        }
        sink.write(&block)?;
    }
    Ok(blocks)
}

/// Serves device callbacks of any size from whole engine blocks.
///
/// The engine always renders exactly `block_size` samples. Devices ask for
/// whatever they like, so finished blocks are held here and handed out in
/// pieces. The stop flag is only looked at when a new block is due.
pub struct BlockAdapter {
    block: Vec<f32>,
    pos: usize,
    halted: bool,
}

impl BlockAdapter {
    pub fn new(block_size: usize) -> Self {
        Self {
            block: vec![0.0; block_size],
            pos: block_size,
            halted: false,
        }
    }

    /// True once a stop was observed or the engine finished. Everything
    /// after that point is silence.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Fill an interleaved device buffer with `channels` channels.
    pub fn fill(
        &mut self,
        engine: &mut SynthEngine,
        stop: &AtomicBool,
        out: &mut [f32],
        channels: usize,
    ) -> bool {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            if self.pos >= self.block.len() {
                self.next_block(engine, stop);
            }
            let s = self.block[self.pos];
            self.pos += 1;
            frame.fill(s);
        }
        self.halted
    }

    fn next_block(&mut self, engine: &mut SynthEngine, stop: &AtomicBool) {
        if !self.halted && stop.load(Ordering::Acquire) {
            self.halted = true;
        }
        if !self.halted && engine.render_block(&mut self.block) == BlockStatus::Finished {
            self.halted = true;
        }
        if self.halted {
            self.block.fill(0.0);
        }
        self.pos = 0;
    }
}
