// Camera and classification collaborator interfaces
// The host owns the camera pipeline; the core only binds an analyzer,
// consumes classification results, and unbinds

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// One camera frame delivered to an analyzer
///
/// Pixel layout is the host's concern; the core never inspects the bytes,
/// it only forwards them to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Errors from the camera collaborator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraError {
    /// Camera permission has not been granted
    #[error("Camera permission not granted")]
    PermissionDenied,
    /// The camera provider is not ready yet
    #[error("Camera not ready")]
    NotReady,
    /// Binding the analysis pipeline failed
    #[error("Camera bind failed: {0}")]
    BindFailed(String),
    /// Unbinding failed; teardown errors are logged, never propagated
    #[error("Camera unbind failed: {0}")]
    UnbindFailed(String),
}

/// Errors from the classification engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Receives camera frames on the host's camera execution context
pub trait FrameAnalyzer: Send + Sync {
    fn analyze(&self, frame: &CameraFrame);
}

/// Camera pipeline lifecycle, provided by the host
///
/// `bind` and `unbind` are only ever invoked from the control context.
/// Frame delivery must follow keep-latest backpressure: stale frames carry
/// no value for a single-shot classification.
pub trait FrameSource: Send + Sync {
    fn bind(&self, analyzer: std::sync::Arc<dyn FrameAnalyzer>) -> Result<(), CameraError>;
    fn unbind(&self) -> Result<(), CameraError>;
}

/// Image classification engine, stateless per call from the core's view
pub trait Classifier: Send + Sync {
    fn classify(&self, frame: &CameraFrame) -> Result<(String, f32), ClassifierError>;
}

/// Result of one accepted classification
///
/// Produced at most once per session and discarded after the state machine
/// consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    pub label: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl ClassificationOutcome {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            timestamp: Utc::now(),
        }
    }
}

/// Keep-latest slot for camera frames
///
/// When frames arrive faster than the consumer processes them, only the most
/// recent one is retained; older undelivered frames are dropped. Host camera
/// backends can use this to implement the required backpressure policy.
pub struct LatestFrame {
    slot: Mutex<Option<CameraFrame>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Publish a frame, replacing any undelivered predecessor
    pub fn publish(&self, frame: CameraFrame) {
        *self.slot.lock() = Some(frame);
    }

    /// Take the most recent frame, leaving the slot empty
    pub fn take(&self) -> Option<CameraFrame> {
        self.slot.lock().take()
    }
}

impl Default for LatestFrame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> CameraFrame {
        CameraFrame {
            width: 224,
            height: 224,
            data: vec![tag],
        }
    }

    #[test]
    fn test_latest_frame_starts_empty() {
        let slot = LatestFrame::new();
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_latest_frame_keeps_only_newest() {
        let slot = LatestFrame::new();
        slot.publish(frame(1));
        slot.publish(frame(2));
        slot.publish(frame(3));

        // Older undelivered frames were dropped
        assert_eq!(slot.take(), Some(frame(3)));
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_take_empties_the_slot() {
        let slot = LatestFrame::new();
        slot.publish(frame(7));
        assert_eq!(slot.take(), Some(frame(7)));
        assert!(slot.take().is_none());

        slot.publish(frame(8));
        assert_eq!(slot.take(), Some(frame(8)));
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = ClassificationOutcome::new("stairs", 0.9);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"label\":\"stairs\""));
        assert!(json.contains("\"confidence\":0.9"));
        assert!(json.contains("\"timestamp\""));
    }
}
