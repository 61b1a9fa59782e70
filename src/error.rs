use std::{error, fmt};

use crate::graph::OperatorId;

/// Errors reported by opgrid.
#[derive(Debug)]
pub enum Error {
    /// Linking `source` as the modulator of `carrier` would close a loop.
    ModulationCycle {
        carrier: OperatorId,
        source: OperatorId,
    },
    /// An operator handle that does not belong to the graph.
    UnknownOperator(OperatorId),
    InvalidConfig(String),
    /// The control ring is full; the engine is not draining it.
    ControlQueueFull,
    OutputDeviceError(Box<dyn error::Error + Send + Sync>),
    WorkerPanicked(String),
    /// A previous playback run lost the engine, so there is nothing to play.
    EngineUnavailable,
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModulationCycle { carrier, source } => write!(
                f,
                "operator {source} cannot modulate operator {carrier}: modulation cycle"
            ),
            Self::UnknownOperator(id) => write!(f, "operator {id} not found"),
            Self::InvalidConfig(str) => write!(f, "Invalid config: {str}"),
            Self::ControlQueueFull => write!(f, "Control message queue is full"),
            Self::OutputDeviceError(err) => err.fmt(f),
            Self::WorkerPanicked(msg) => write!(f, "Playback worker panicked: {msg}"),
            Self::EngineUnavailable => write!(f, "Synth engine is not available"),
        }
    }
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(err: cpal::DefaultStreamConfigError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for Error {
    fn from(err: cpal::SupportedStreamConfigsError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(err: cpal::BuildStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(err: cpal::PlayStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::DevicesError> for Error {
    fn from(err: cpal::DevicesError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::PauseStreamError> for Error {
    fn from(err: cpal::PauseStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::DeviceNameError> for Error {
    fn from(err: cpal::DeviceNameError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}
