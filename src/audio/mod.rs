// Audio capture collaborator interface
//
// Hardware acquisition is not the core's job: the host injects an
// AudioSource and the listener thread drives it with blocking reads.

mod listener;

pub use listener::{BuzzerListener, ListenerConfig, ListenerError, ListenerEvent, ToneEvent};

use crate::constants::MIN_READ_BUFFER_SAMPLES;

/// Errors from the injected audio capture collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCaptureError {
    /// Microphone permission has not been granted
    PermissionDenied,
    /// No audio input device is available
    NoDeviceAvailable,
    /// Error with the audio device
    DeviceError(String),
    /// A single read failed; the listener treats this as transient
    ReadError(String),
}

impl std::fmt::Display for AudioCaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCaptureError::PermissionDenied => {
                write!(f, "Audio permission not granted")
            }
            AudioCaptureError::NoDeviceAvailable => write!(f, "No audio input device available"),
            AudioCaptureError::DeviceError(msg) => write!(f, "Audio device error: {}", msg),
            AudioCaptureError::ReadError(msg) => write!(f, "Audio read error: {}", msg),
        }
    }
}

impl std::error::Error for AudioCaptureError {}

/// Blocking microphone capture, provided by the host
///
/// Frames are raw mono 16-bit PCM at a fixed sample rate. The listener
/// thread owns the source for its lifetime and guarantees `stop` and
/// `release` run in one teardown path, reached from normal shutdown and
/// failure alike.
pub trait AudioSource: Send {
    /// Begin capturing; called once before the first read
    fn start(&mut self) -> Result<(), AudioCaptureError>;

    /// Blocking read into `buf`; returns the number of samples written
    ///
    /// A zero-length read is not an error, just a frame to skip.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioCaptureError>;

    /// Stop capturing; reads after this return zero or an error
    fn stop(&mut self) -> Result<(), AudioCaptureError>;

    /// Release the underlying handle; the source is unusable afterwards
    fn release(&mut self) -> Result<(), AudioCaptureError>;

    /// Platform minimum capture buffer size in samples
    fn min_buffer_size(&self) -> usize;
}

/// Negotiate the read buffer size against the platform minimum
pub fn negotiate_buffer_size(platform_min: usize) -> usize {
    platform_min.max(MIN_READ_BUFFER_SAMPLES)
}

/// Factory for audio sources
///
/// Listening restarts after `Suspended` re-acquire capture from scratch; no
/// sample state persists across that boundary, so every start gets a fresh
/// source.
pub type AudioSourceFactory =
    Box<dyn Fn() -> Result<Box<dyn AudioSource>, AudioCaptureError> + Send>;
