// Dedicated buzzer-listening thread
// Blocking reads from the audio source in a tight loop, one spectral
// analysis per frame, tone events handed off to the control context

use super::{AudioSource, negotiate_buffer_size};
use crate::detect::{SpectralConfig, SpectralDetector};
use crate::constants::TONE_DEBOUNCE_MS;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Edge-triggered signal that a frame matched the detection predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneEvent {
    /// Sequence number of the frame that produced the detection
    pub detected_at_frame: u64,
}

/// Events handed from the listener thread to the control context
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    /// The buzzer tone was detected
    Tone(ToneEvent),
    /// Capture failed and the listener thread has exited
    Unavailable(String),
}

/// Errors starting or stopping the listener
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListenerError {
    /// The listener thread is already running
    #[error("Listener is already running")]
    AlreadyRunning,
}

/// Configuration for the listening loop
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Spectral detection parameters
    pub spectral: SpectralConfig,
    /// Pause after an emitted tone event so the tail of the same physical
    /// buzz cannot re-trigger
    pub debounce: Duration,
    /// Consecutive read errors tolerated before giving up on the device
    pub max_consecutive_read_errors: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            spectral: SpectralConfig::default(),
            debounce: Duration::from_millis(TONE_DEBOUNCE_MS),
            max_consecutive_read_errors: 10,
        }
    }
}

/// Handle to the buzzer-listening thread
///
/// Spectral analysis is CPU-bound and must never share a thread with
/// UI-facing work, so the loop runs on its own thread. Cancellation is
/// cooperative: the loop checks a stop flag each iteration and funnels
/// every exit through one teardown path that stops and releases the source.
pub struct BuzzerListener {
    config: ListenerConfig,
    listen_thread: Option<JoinHandle<()>>,
    should_stop: Arc<AtomicBool>,
}

impl BuzzerListener {
    /// Create a listener with default configuration
    pub fn new() -> Self {
        Self::with_config(ListenerConfig::default())
    }

    /// Create a listener with custom configuration
    pub fn with_config(config: ListenerConfig) -> Self {
        Self {
            config,
            listen_thread: None,
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if the listening thread is currently running
    pub fn is_running(&self) -> bool {
        match &self.listen_thread {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }

    /// Start the listening loop on a dedicated thread
    ///
    /// Takes ownership of the audio source; it is started, read, stopped and
    /// released entirely on the listener thread. `on_event` is invoked from
    /// that thread and should do nothing more than post to the control
    /// context.
    pub fn start<F>(
        &mut self,
        source: Box<dyn AudioSource>,
        on_event: F,
    ) -> Result<(), ListenerError>
    where
        F: Fn(ListenerEvent) + Send + 'static,
    {
        // Reap a previously finished thread so restart after a device
        // failure works without an explicit stop() call
        if let Some(handle) = &self.listen_thread {
            if handle.is_finished() {
                if let Some(h) = self.listen_thread.take() {
                    let _ = h.join();
                }
            }
        }

        if self.is_running() {
            return Err(ListenerError::AlreadyRunning);
        }

        self.should_stop.store(false, Ordering::SeqCst);
        let should_stop = self.should_stop.clone();
        let detector = SpectralDetector::with_config(self.config.spectral.clone());
        let debounce = self.config.debounce;
        let max_read_errors = self.config.max_consecutive_read_errors;

        crate::info!("[listener] Starting buzzer listening thread");
        let handle = thread::spawn(move || {
            listen_loop(
                source,
                detector,
                should_stop,
                on_event,
                debounce,
                max_read_errors,
            );
        });
        self.listen_thread = Some(handle);
        Ok(())
    }

    /// Stop the listening loop and wait for teardown to complete
    pub fn stop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.listen_thread.take() {
            let _ = handle.join();
        }
        crate::debug!("[listener] Listening stopped");
    }
}

impl Default for BuzzerListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BuzzerListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Main listening loop
///
/// Every exit path falls through to `teardown`, so the audio handle is
/// stopped and released regardless of how the loop ends.
fn listen_loop<F>(
    mut source: Box<dyn AudioSource>,
    detector: SpectralDetector,
    should_stop: Arc<AtomicBool>,
    on_event: F,
    debounce: Duration,
    max_read_errors: u32,
) where
    F: Fn(ListenerEvent) + Send + 'static,
{
    if let Err(e) = source.start() {
        crate::error!("[listener] Failed to start audio capture: {}", e);
        on_event(ListenerEvent::Unavailable(e.to_string()));
        teardown(&mut source);
        return;
    }

    let buf_size = negotiate_buffer_size(source.min_buffer_size());
    let mut buf = vec![0i16; buf_size];
    let mut frame_seq: u64 = 0;
    let mut consecutive_read_errors: u32 = 0;
    crate::debug!("[listener] Capture started, read buffer {} samples", buf_size);

    while !should_stop.load(Ordering::SeqCst) {
        let read = match source.read(&mut buf) {
            Ok(n) => {
                consecutive_read_errors = 0;
                n
            }
            Err(e) => {
                // A single failed read is transient; a run of them means the
                // device is gone
                consecutive_read_errors += 1;
                if consecutive_read_errors >= max_read_errors {
                    crate::error!("[listener] Giving up after {} read errors: {}", consecutive_read_errors, e);
                    on_event(ListenerEvent::Unavailable(e.to_string()));
                    break;
                }
                crate::trace!("[listener] Transient read error: {}", e);
                continue;
            }
        };

        // Zero-length read: skip silently, not reported, not fatal
        if read == 0 {
            continue;
        }

        frame_seq += 1;
        if let Some(peak) = detector.detect(&buf[..read]) {
            crate::info!(
                "[listener] Tone detected at frame {}: {:.1} Hz, magnitude_sq {:.3e}",
                frame_seq,
                peak.frequency_hz,
                peak.magnitude_sq
            );
            on_event(ListenerEvent::Tone(ToneEvent {
                detected_at_frame: frame_seq,
            }));
            // Debounce the tail of this physical buzz; distinct from the
            // session-wide alert cooldown
            thread::sleep(debounce);
        }
    }

    teardown(&mut source);
    crate::debug!("[listener] Loop exited after {} frames", frame_seq);
}

/// Single teardown path: stop then release, failures logged, never propagated
fn teardown(source: &mut Box<dyn AudioSource>) {
    if let Err(e) = source.stop() {
        crate::warn!("[listener] Failed to stop audio source: {}", e);
    }
    if let Err(e) = source.release() {
        crate::warn!("[listener] Failed to release audio source: {}", e);
    }
}
