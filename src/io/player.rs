use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, StreamConfig,
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::{config::EngineConfig, error::Error, io::sink::BlockAdapter, synth::SynthEngine};

/*
Player
======

Playback runs on a dedicated worker thread. The worker opens the output
device, builds the stream and owns it for its whole life. The device
callback is the realtime producer: it renders whole engine blocks and hands
them to the device.

    control thread          worker thread           device callback
    --------------          -------------           ---------------
    start() ----spawn----->  open device
            <---ready------  play stream  ........> render blocks
    request_stop() -- stop flag ------------------> observed at next block
                             <-------- halted ----  silence from here on
                             drop stream
    join()  <---engine-----  return

Stopping is cooperative. The control side only raises a flag; the callback
looks at it when a new block is due and from then on writes silence. The
worker closes the device after the callback has confirmed, never from inside
the callback.

The engine travels with the worker and comes back through `join`, which
drops it back into the idle slot so it can be inspected or started again.
*/

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STOP_GRACE: Duration = Duration::from_millis(250);

const PREFERRED_SAMPLE_FORMAT: cpal::SampleFormat = cpal::SampleFormat::F32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    /// Worker spawned, waiting for the device to open.
    Starting,
    Running,
    /// Stop flag raised; the worker has not returned yet.
    StoppingRequested,
}

type SharedEngine = Arc<Mutex<Option<SynthEngine>>>;

struct Worker {
    thread: JoinHandle<Option<SynthEngine>>,
    stop: Arc<AtomicBool>,
}

pub struct Player {
    config: EngineConfig,
    state: PlayerState,
    engine: Option<SynthEngine>,
    worker: Option<Worker>,
}

impl Player {
    /// Wrap an idle engine. The engine must have been built for a block
    /// size matching `config`, since the device buffer is sized from it.
    pub fn new(config: EngineConfig, engine: SynthEngine) -> Result<Self, Error> {
        config.validate()?;
        if engine.block_size() != config.block_size {
            return Err(Error::InvalidConfig(format!(
                "engine renders {} frame blocks, player configured for {}",
                engine.block_size(),
                config.block_size
            )));
        }
        Ok(Self {
            config,
            state: PlayerState::Stopped,
            engine: Some(engine),
            worker: None,
        })
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state != PlayerState::Stopped
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The idle engine. `None` while the worker owns it.
    pub fn engine(&self) -> Option<&SynthEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut SynthEngine> {
        self.engine.as_mut()
    }

    /// Apply queued control messages to the idle engine so its state tracks
    /// the control side between playback runs.
    pub fn sync(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.drain_messages();
        }
    }

    /// Open the output device and start rendering.
    ///
    /// Does nothing unless the player is stopped. When the device cannot be
    /// opened the error is returned and the engine goes back to the idle slot.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.state != PlayerState::Stopped {
            log::debug!("start ignored, player is {:?}", self.state);
            return Ok(());
        }
        let mut engine = self.engine.take().ok_or(Error::EngineUnavailable)?;
        engine.rearm();

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_send, ready_recv) = bounded(1);
        let thread = thread::Builder::new()
            .name("opgrid-audio".into())
            .spawn({
                let config = self.config.clone();
                let stop = Arc::clone(&stop);
                move || run_worker(engine, config, stop, ready_send)
            })
            .map_err(|err| Error::OutputDeviceError(Box::new(err)))?;

        self.state = PlayerState::Starting;
        let worker = Worker { thread, stop };

        match ready_recv.recv_timeout(READY_TIMEOUT) {
            Ok(Ok(())) => {
                log::info!("playback started");
                self.worker = Some(worker);
                self.state = PlayerState::Running;
                Ok(())
            }
            Ok(Err(err)) => {
                self.finish(worker)?;
                Err(err)
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("audio device did not open in time");
                worker.stop.store(true, Ordering::Release);
                self.worker = Some(worker);
                self.state = PlayerState::StoppingRequested;
                Err(Error::OutputDeviceError(
                    "timed out opening audio output".into(),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.finish(worker)?;
                Err(Error::EngineUnavailable)
            }
        }
    }

    /// Ask the producer to stop at its next buffer boundary. Returns
    /// immediately.
    pub fn request_stop(&mut self) {
        if let Some(worker) = &self.worker {
            if matches!(self.state, PlayerState::Starting | PlayerState::Running) {
                log::debug!("stop requested");
                worker.stop.store(true, Ordering::Release);
                self.state = PlayerState::StoppingRequested;
            }
        }
    }

    /// Wait for the worker to close the device and hand the engine back.
    pub fn join(&mut self) -> Result<(), Error> {
        self.request_stop();
        match self.worker.take() {
            Some(worker) => self.finish(worker),
            None => Ok(()),
        }
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        self.request_stop();
        self.join()
    }

    /// Reap a worker that returned on its own, e.g. after the engine
    /// finished. Returns true when the player went back to `Stopped`.
    pub fn poll(&mut self) -> Result<bool, Error> {
        let finished = self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.thread.is_finished());
        if !finished {
            return Ok(false);
        }
        self.join()?;
        Ok(true)
    }

    fn finish(&mut self, worker: Worker) -> Result<(), Error> {
        self.state = PlayerState::Stopped;
        match worker.thread.join() {
            Ok(Some(engine)) => {
                log::info!(
                    "playback stopped after {} blocks",
                    engine.blocks_rendered()
                );
                self.engine = Some(engine);
                Ok(())
            }
            Ok(None) => {
                log::error!("playback worker returned without the engine");
                Err(Error::EngineUnavailable)
            }
            Err(payload) => {
                let msg = panic_message::panic_message(&payload).to_string();
                log::error!("playback worker panicked: {msg}");
                Err(Error::WorkerPanicked(msg))
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("failed to stop playback: {err}");
        }
    }
}

/// Names of every output device on the default host.
pub fn list_output_devices() -> Result<Vec<String>, Error> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for device in host.output_devices()? {
        names.push(device.name()?);
    }
    Ok(names)
}

fn run_worker(
    engine: SynthEngine,
    config: EngineConfig,
    stop: Arc<AtomicBool>,
    ready: Sender<Result<(), Error>>,
) -> Option<SynthEngine> {
    let shared: SharedEngine = Arc::new(Mutex::new(Some(engine)));
    let (halted_send, halted_recv) = bounded(1);

    let stream = match open_stream(&config, &shared, &stop, &halted_send) {
        Ok(stream) => stream,
        Err(err) => {
            log::error!("failed to open audio output: {err}");
            let _ = ready.send(Err(err));
            return reclaim(&shared);
        }
    };
    let _ = ready.send(Ok(()));

    wait_for_halt(&halted_recv, &stop, config.block_duration() * 4 + STOP_GRACE);

    if let Err(err) = stream.pause() {
        log::debug!("failed to pause stream: {err}");
    }
    drop(stream);
    log::debug!("audio output closed");

    reclaim(&shared)
}

/// Block until the callback reports that it went silent. A callback that
/// never runs again (device unplugged) is given `grace` after a stop request.
fn wait_for_halt(halted: &Receiver<()>, stop: &AtomicBool, grace: Duration) {
    let mut stop_seen: Option<Instant> = None;
    loop {
        match halted.recv_timeout(POLL_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::Acquire) {
                    let since = *stop_seen.get_or_insert_with(Instant::now);
                    if since.elapsed() > grace {
                        log::warn!("output callback did not acknowledge stop, closing stream");
                        return;
                    }
                }
            }
        }
    }
}

fn reclaim(shared: &SharedEngine) -> Option<SynthEngine> {
    shared.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn open_stream(
    config: &EngineConfig,
    shared: &SharedEngine,
    stop: &Arc<AtomicBool>,
    halted: &Sender<()>,
) -> Result<cpal::Stream, Error> {
    let host = cpal::default_host();
    let device = match &config.device {
        Some(name) => find_output_device(&host, name)?,
        None => host
            .default_output_device()
            .ok_or(cpal::DefaultStreamConfigError::DeviceNotAvailable)?,
    };
    if let Ok(name) = device.name() {
        log::info!("using audio device: {name}");
    }

    let supported = preferred_output_config(&device, config)?;
    let channels = supported.channels() as usize;
    let make_callback = || StreamCallback {
        engine: Arc::clone(shared),
        adapter: BlockAdapter::new(config.block_size),
        stop: Arc::clone(stop),
        halted: halted.clone(),
        channels,
        reported: false,
    };

    let fixed = StreamConfig {
        buffer_size: BufferSize::Fixed(config.block_size as u32),
        ..supported.config()
    };
    log::info!("opening output stream: {fixed:?}");
    let stream = match build_stream(&device, &fixed, make_callback()) {
        Ok(stream) => stream,
        Err(err) => {
            // Some hosts refuse fixed buffer sizes; the adapter copes with any
            log::info!("fixed buffer size rejected ({err}), using device default");
            build_stream(&device, &supported.config(), make_callback())?
        }
    };
    stream.play()?;
    Ok(stream)
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut callback: StreamCallback,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    device.build_output_stream(
        config,
        move |output: &mut [f32], _| callback.write_samples(output),
        |err| log::error!("audio output error: {err}"),
        None,
    )
}

fn find_output_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, Error> {
    for device in host.output_devices()? {
        if device.name().is_ok_and(|n| n == name) {
            return Ok(device);
        }
    }
    Err(Error::OutputDeviceError(
        format!("output device '{name}' not found").into(),
    ))
}

/// Exact format match only: f32 at the engine rate with the engine channel
/// count. There is no resampling or format conversion downstream.
fn preferred_output_config(
    device: &cpal::Device,
    config: &EngineConfig,
) -> Result<cpal::SupportedStreamConfig, Error> {
    let rate = cpal::SampleRate(config.sample_rate);
    for s in device.supported_output_configs()? {
        let rates = s.min_sample_rate()..=s.max_sample_rate();
        if s.channels() == config.channels
            && s.sample_format() == PREFERRED_SAMPLE_FORMAT
            && rates.contains(&rate)
        {
            return Ok(s.with_sample_rate(rate));
        }
    }
    Err(Error::OutputDeviceError(
        format!(
            "device has no {}-channel f32 output at {} Hz",
            config.channels, config.sample_rate
        )
        .into(),
    ))
}

struct StreamCallback {
    engine: SharedEngine,
    adapter: BlockAdapter,
    stop: Arc<AtomicBool>,
    halted: Sender<()>,
    channels: usize,
    reported: bool,
}

impl StreamCallback {
    fn write_samples(&mut self, output: &mut [f32]) {
        // Uncontended while playing: nothing else locks until the worker
        // reclaims the engine after the stream is gone
        let Ok(mut guard) = self.engine.try_lock() else {
            output.fill(0.0);
            return;
        };
        let Some(engine) = guard.as_mut() else {
            output.fill(0.0);
            return;
        };
        if self.adapter.fill(engine, &self.stop, output, self.channels) && !self.reported {
            self.reported = true;
            let _ = self.halted.try_send(());
        }
    }
}
