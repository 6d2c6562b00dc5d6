// navassist core library
//
// Real-time obstacle-detection and response coordinator for an indoor
// navigation assistant. A dedicated thread runs continuous spectral analysis
// of a live audio stream to detect a buzzer tone; a serialized control loop
// gates exactly one camera classification cycle per detected event and
// narrates results through an injected speech synthesizer.
//
// Platform collaborators (microphone, camera, classifier, speech synthesis)
// are injected through traits; the core is host-agnostic and unit-testable
// without any platform present.

pub mod audio;
pub mod camera;
pub mod constants;
pub mod detect;
pub mod direction;
pub mod navigation;
pub mod obstacle;
pub mod speech;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

pub use audio::{AudioCaptureError, AudioSource};
pub use camera::{CameraError, ClassificationOutcome, Classifier, FrameSource};
pub use detect::{CooldownGate, SpectralConfig, SpectralDetector, SpectralPeak};
pub use navigation::{NavigationCounter, Narration};
pub use obstacle::{Coordinator, CoordinatorConfig, ObstacleState};
pub use speech::SpeechSynthesizer;
