//! Centralized constants for the navigation assistant core.
//!
//! All tuning values are defined here with documentation explaining their
//! purpose and constraints. Components read these through their `*Config`
//! structs so deployments can recalibrate without touching detection code.

// =============================================================================
// SAMPLE RATE AND TRANSFORM
// =============================================================================

/// Sample rate of the microphone stream (Hz).
///
/// The buzzer band sits at 2.4-3.0 kHz, so anything at or above 8 kHz would
/// satisfy Nyquist; 44.1 kHz is what indoor handset microphones deliver
/// without resampling.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// FFT transform length (samples). Must be a power of two.
///
/// Frequency resolution is sample_rate / fft_len ≈ 2.7 Hz at 44.1 kHz,
/// far finer than the 600 Hz buzzer band requires. Frames shorter than
/// this are zero-padded, longer frames are truncated.
pub const FFT_LEN: usize = 16_384;

/// Minimum capture buffer size (samples of i16).
///
/// The platform reports its own minimum; we never go below this floor so a
/// single read spans enough of the tone to dominate the spectrum.
pub const MIN_READ_BUFFER_SAMPLES: usize = 16_384;

// =============================================================================
// BUZZER DETECTION
// =============================================================================

/// Lower bound of the buzzer frequency band (Hz).
pub const BUZZER_FREQ_MIN_HZ: f64 = 2_400.0;

/// Upper bound of the buzzer frequency band (Hz).
pub const BUZZER_FREQ_MAX_HZ: f64 = 3_000.0;

/// Squared-magnitude threshold for a detection.
///
/// Magnitudes are compared squared (re² + im²) to avoid a sqrt in the hot
/// loop. Raise this if a deployment sees false positives from ambient noise.
pub const BUZZER_MAGNITUDE_THRESHOLD: f64 = 1e6;

/// Debounce pause after an emitted tone event (milliseconds).
///
/// The listener thread sleeps this long after reporting a detection so the
/// tail of the same physical buzz cannot re-trigger. Distinct from the
/// alert cooldown, which spans the whole session.
pub const TONE_DEBOUNCE_MS: u64 = 800;

// =============================================================================
// ALERT GATING
// =============================================================================

/// Minimum interval between two accepted alerts (milliseconds).
///
/// One authoritative cooldown shared across every alert kind. Candidates
/// arriving inside the window are suppressed outright, never queued.
pub const ALERT_COOLDOWN_MS: u64 = 3_000;

/// Minimum confidence for an accepted classification outcome (0.0 - 1.0).
pub const CLASSIFICATION_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Label the classifier reports when it sees nothing actionable.
pub const CLASSIFICATION_NONE_LABEL: &str = "none";

/// Upper bound on a classification session's lifetime (milliseconds).
///
/// If no acceptable outcome arrives within this window the coordinator
/// tears the session down and returns to listening rather than hanging
/// in the awaiting state forever.
pub const CLASSIFICATION_TIMEOUT_MS: u64 = 5_000;

/// Delay between closing a session and resuming listening (milliseconds).
///
/// Gives the "turn" narration time to land before the resume prompt.
pub const RESUME_DELAY_MS: u64 = 600;

// =============================================================================
// NAVIGATION
// =============================================================================

/// Steps between two adjacent room numbers.
pub const STEPS_PER_ROOM: u32 = 15;

/// Remaining-step count at or below which the user is "near" (exclusive of 0).
pub const NEAR_DESTINATION_STEPS: u32 = 5;

/// Interval for "N steps away" milestone narrations.
pub const MILESTONE_INTERVAL: u32 = 10;
