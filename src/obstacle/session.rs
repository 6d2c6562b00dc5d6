// One-shot classification session
// Accepts one frame stream, runs at most one successful classification,
// and always releases the camera pipeline on close

use crate::camera::{CameraFrame, ClassificationOutcome, Classifier, FrameSource};
use crate::constants::CLASSIFICATION_NONE_LABEL;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Bounded single-shot pipeline over camera frames
///
/// `on_frame` is called from the host's camera context while `close` runs on
/// the control thread, so the latch and the closed flag are the only state
/// and both are atomic. The latch is a hard guarantee: once one outcome is
/// produced, every later frame is ignored no matter how fast they arrive.
pub struct ClassificationSession {
    frame_source: Arc<dyn FrameSource>,
    classifier: Arc<dyn Classifier>,
    confidence_threshold: f32,
    did_run_once: AtomicBool,
    closed: AtomicBool,
}

impl ClassificationSession {
    /// Open a session over the given frame source and classifier
    ///
    /// Binding the camera pipeline is the caller's job; the session only
    /// guarantees the unbind on close.
    pub fn open(
        frame_source: Arc<dyn FrameSource>,
        classifier: Arc<dyn Classifier>,
        confidence_threshold: f32,
    ) -> Arc<Self> {
        Arc::new(Self {
            frame_source,
            classifier,
            confidence_threshold,
            did_run_once: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Process one camera frame
    ///
    /// Returns the outcome exactly once: for the first frame whose
    /// classification satisfies the acceptance predicate. Rejected frames
    /// keep the session open; classifier errors are skipped as transient.
    pub fn on_frame(&self, frame: &CameraFrame) -> Option<ClassificationOutcome> {
        if self.closed.load(Ordering::SeqCst) || self.did_run_once.load(Ordering::SeqCst) {
            return None;
        }

        let (label, confidence) = match self.classifier.classify(frame) {
            Ok(result) => result,
            Err(e) => {
                crate::warn!("[session] Classification failed on a frame: {}", e);
                return None;
            }
        };

        if label == CLASSIFICATION_NONE_LABEL || confidence <= self.confidence_threshold {
            crate::trace!("[session] Frame rejected: {} ({:.2})", label, confidence);
            return None;
        }

        // Hard single-shot: only the frame that wins this exchange may
        // produce the outcome, however many arrive concurrently
        if self
            .did_run_once
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        crate::info!("[session] Outcome accepted: {} ({:.2})", label, confidence);
        Some(ClassificationOutcome::new(label, confidence))
    }

    /// Whether an outcome has been produced
    pub fn did_run_once(&self) -> bool {
        self.did_run_once.load(Ordering::SeqCst)
    }

    /// Close the session and release the camera pipeline
    ///
    /// Idempotent, and reached from success and failure paths alike; an
    /// unbind failure is logged, never propagated.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.frame_source.unbind() {
            crate::warn!("[session] Failed to unbind camera pipeline: {}", e);
        }
        crate::debug!("[session] Closed");
    }
}

impl Drop for ClassificationSession {
    fn drop(&mut self) {
        self.close();
    }
}
