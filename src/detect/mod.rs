// Detection module for buzzer tone recognition
// Provides SpectralDetector for frequency-domain peak extraction and
// CooldownGate for minimum-interval alert suppression

mod cooldown;
mod spectral;

pub use cooldown::CooldownGate;
pub use spectral::{SpectralConfig, SpectralDetector, SpectralPeak};
