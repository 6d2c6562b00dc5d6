// Obstacle session state machine
// A single owned value transitioned only from the control thread; replaces
// the ad-hoc cross-thread boolean flags such a flow tends to accumulate

use crate::audio::ToneEvent;
use crate::camera::ClassificationOutcome;
use crate::constants::CLASSIFICATION_NONE_LABEL;
use crate::detect::CooldownGate;
use crate::speech::phrases;
use serde::Serialize;
use std::time::Duration;

/// State of the obstacle-response cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObstacleState {
    /// Initial; nothing running
    Idle,
    /// Audio thread active, every frame fed to the spectral detector
    Listening,
    /// One classification session is in flight; further tone events are
    /// dropped, not queued
    AwaitingClassification,
    /// Stopped by explicit request; audio released, re-enterable only via
    /// start_listening
    Suspended,
}

impl Default for ObstacleState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Errors from explicit state-machine operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObstacleStateError {
    /// Invalid state transition attempted
    InvalidTransition {
        from: ObstacleState,
        to: ObstacleState,
    },
}

impl std::fmt::Display for ObstacleStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObstacleStateError::InvalidTransition { from, to } => {
                write!(f, "Invalid state transition from {:?} to {:?}", from, to)
            }
        }
    }
}

impl std::error::Error for ObstacleStateError {}

/// Side effects the coordinator must perform after a transition
///
/// The state machine never touches collaborators itself; it hands back an
/// ordered list of intents, which keeps every transition unit-testable
/// without threads or hardware.
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleIntent {
    /// Acquire a fresh audio source and start the listener thread
    StartAudio,
    /// Stop the listener thread and release the audio handle
    ReleaseAudio,
    /// Speak a narration nothing waits on
    Speak(String),
    /// Choose a turn direction and speak it
    SpeakDirection,
    /// Open a classification session and bind the camera pipeline
    BeginClassification,
    /// Close the in-flight session and unbind the camera pipeline
    CloseSession,
    /// Post a resume message after the given delay
    ScheduleResume(Duration),
}

/// Owns the obstacle-response cycle: listening, single-flight gating of the
/// classification session, and the one authoritative alert cooldown
pub struct ObstacleStateMachine {
    state: ObstacleState,
    cooldown: CooldownGate,
    resume_delay: Duration,
    confidence_threshold: f32,
    /// Set between an accepted outcome and the delayed resume; while set,
    /// session-failure inputs are stale and ignored
    resume_pending: bool,
}

impl ObstacleStateMachine {
    pub fn new(cooldown: Duration, resume_delay: Duration, confidence_threshold: f32) -> Self {
        Self {
            state: ObstacleState::Idle,
            cooldown: CooldownGate::new(cooldown),
            resume_delay,
            confidence_threshold,
            resume_pending: false,
        }
    }

    /// Get the current state
    pub fn state(&self) -> ObstacleState {
        self.state
    }

    /// Begin (or resume after Suspended) buzzer listening
    ///
    /// No sample state persists across the Suspended boundary; the StartAudio
    /// intent acquires capture from scratch.
    #[must_use = "this returns a Result that should be handled"]
    pub fn start_listening(&mut self) -> Result<Vec<ObstacleIntent>, ObstacleStateError> {
        match self.state {
            ObstacleState::Idle | ObstacleState::Suspended => {
                self.state = ObstacleState::Listening;
                self.resume_pending = false;
                Ok(vec![
                    ObstacleIntent::StartAudio,
                    ObstacleIntent::Speak(phrases::LISTENING_STARTED.to_string()),
                ])
            }
            from => Err(ObstacleStateError::InvalidTransition {
                from,
                to: ObstacleState::Listening,
            }),
        }
    }

    /// Consume a tone event
    ///
    /// Edge-triggered and single-flight: an event arriving outside Listening
    /// or inside the cooldown window is dropped outright.
    pub fn on_tone(&mut self, event: ToneEvent) -> Vec<ObstacleIntent> {
        if self.state != ObstacleState::Listening {
            crate::debug!(
                "[obstacle] Tone at frame {} dropped in state {:?}",
                event.detected_at_frame,
                self.state
            );
            return Vec::new();
        }
        if !self.cooldown.check() {
            crate::debug!(
                "[obstacle] Tone at frame {} suppressed by cooldown",
                event.detected_at_frame
            );
            return Vec::new();
        }

        crate::info!(
            "[obstacle] Tone at frame {} accepted, opening classification",
            event.detected_at_frame
        );
        self.state = ObstacleState::AwaitingClassification;
        vec![
            ObstacleIntent::Speak(phrases::OBSTACLE_DETECTED.to_string()),
            ObstacleIntent::BeginClassification,
        ]
    }

    /// Consume a classification outcome
    ///
    /// An accepted outcome records the cooldown stamp and schedules the
    /// delayed resume; a rejected one reverts to Listening with no narration
    /// and leaves the cooldown untouched.
    pub fn on_outcome(&mut self, outcome: &ClassificationOutcome) -> Vec<ObstacleIntent> {
        if self.state != ObstacleState::AwaitingClassification || self.resume_pending {
            crate::debug!("[obstacle] Outcome ignored in state {:?}", self.state);
            return Vec::new();
        }

        if self.is_accepted(outcome) {
            crate::info!(
                "[obstacle] Outcome accepted: {} ({:.2})",
                outcome.label,
                outcome.confidence
            );
            self.cooldown.record();
            self.resume_pending = true;
            vec![
                ObstacleIntent::SpeakDirection,
                ObstacleIntent::CloseSession,
                ObstacleIntent::ScheduleResume(self.resume_delay),
            ]
        } else {
            crate::warn!(
                "[obstacle] Outcome rejected: {} ({:.2}), resuming listening",
                outcome.label,
                outcome.confidence
            );
            self.state = ObstacleState::Listening;
            vec![ObstacleIntent::CloseSession]
        }
    }

    /// The in-flight session failed (camera bind error, timeout)
    ///
    /// Reverts to Listening without narration; the failure is reported by
    /// the caller's logging, not spoken.
    pub fn on_session_failed(&mut self, reason: &str) -> Vec<ObstacleIntent> {
        if self.state != ObstacleState::AwaitingClassification || self.resume_pending {
            return Vec::new();
        }
        crate::warn!("[obstacle] Classification session failed: {}", reason);
        self.state = ObstacleState::Listening;
        vec![ObstacleIntent::CloseSession]
    }

    /// The post-alert resume delay elapsed
    pub fn on_resume(&mut self) -> Vec<ObstacleIntent> {
        if self.state != ObstacleState::AwaitingClassification || !self.resume_pending {
            return Vec::new();
        }
        self.resume_pending = false;
        self.state = ObstacleState::Listening;
        vec![ObstacleIntent::Speak(phrases::NEXT_BUZZER.to_string())]
    }

    /// Explicit stop; releases the audio source
    pub fn stop(&mut self) -> Vec<ObstacleIntent> {
        if self.state == ObstacleState::Suspended || self.state == ObstacleState::Idle {
            self.state = ObstacleState::Suspended;
            return Vec::new();
        }
        let mut intents = Vec::new();
        if self.state == ObstacleState::AwaitingClassification {
            intents.push(ObstacleIntent::CloseSession);
        }
        intents.push(ObstacleIntent::ReleaseAudio);
        self.state = ObstacleState::Suspended;
        self.resume_pending = false;
        intents
    }

    fn is_accepted(&self, outcome: &ClassificationOutcome) -> bool {
        outcome.label != CLASSIFICATION_NONE_LABEL
            && outcome.confidence > self.confidence_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn machine() -> ObstacleStateMachine {
        ObstacleStateMachine::new(Duration::from_millis(60), Duration::from_millis(10), 0.5)
    }

    fn tone(seq: u64) -> ToneEvent {
        ToneEvent {
            detected_at_frame: seq,
        }
    }

    fn listening_machine() -> ObstacleStateMachine {
        let mut sm = machine();
        sm.start_listening().unwrap();
        sm
    }

    #[test]
    fn test_initial_state_is_idle() {
        assert_eq!(machine().state(), ObstacleState::Idle);
    }

    #[test]
    fn test_start_listening_from_idle() {
        let mut sm = machine();
        let intents = sm.start_listening().unwrap();
        assert_eq!(sm.state(), ObstacleState::Listening);
        assert_eq!(intents[0], ObstacleIntent::StartAudio);
        assert!(matches!(intents[1], ObstacleIntent::Speak(_)));
    }

    #[test]
    fn test_start_listening_while_listening_rejected() {
        let mut sm = listening_machine();
        assert_eq!(
            sm.start_listening(),
            Err(ObstacleStateError::InvalidTransition {
                from: ObstacleState::Listening,
                to: ObstacleState::Listening,
            })
        );
    }

    #[test]
    fn test_tone_opens_classification() {
        let mut sm = listening_machine();
        let intents = sm.on_tone(tone(1));
        assert_eq!(sm.state(), ObstacleState::AwaitingClassification);
        assert_eq!(
            intents,
            vec![
                ObstacleIntent::Speak(phrases::OBSTACLE_DETECTED.to_string()),
                ObstacleIntent::BeginClassification,
            ]
        );
    }

    #[test]
    fn test_tone_dropped_while_awaiting() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        // Single-flight: second event is dropped, not queued
        assert!(sm.on_tone(tone(2)).is_empty());
        assert_eq!(sm.state(), ObstacleState::AwaitingClassification);
    }

    #[test]
    fn test_tone_dropped_when_idle_or_suspended() {
        let mut sm = machine();
        assert!(sm.on_tone(tone(1)).is_empty());
        sm.start_listening().unwrap();
        sm.stop();
        assert!(sm.on_tone(tone(2)).is_empty());
    }

    #[test]
    fn test_accepted_outcome_speaks_direction_and_schedules_resume() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        let intents = sm.on_outcome(&ClassificationOutcome::new("stairs", 0.9));
        assert_eq!(
            intents,
            vec![
                ObstacleIntent::SpeakDirection,
                ObstacleIntent::CloseSession,
                ObstacleIntent::ScheduleResume(Duration::from_millis(10)),
            ]
        );
        // Still awaiting until the resume delay elapses
        assert_eq!(sm.state(), ObstacleState::AwaitingClassification);

        let resume = sm.on_resume();
        assert_eq!(sm.state(), ObstacleState::Listening);
        assert_eq!(
            resume,
            vec![ObstacleIntent::Speak(phrases::NEXT_BUZZER.to_string())]
        );
    }

    #[test]
    fn test_rejected_outcome_resumes_without_narration() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        let intents = sm.on_outcome(&ClassificationOutcome::new("stairs", 0.3));
        assert_eq!(intents, vec![ObstacleIntent::CloseSession]);
        assert_eq!(sm.state(), ObstacleState::Listening);
    }

    #[test]
    fn test_none_label_rejected_regardless_of_confidence() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        let intents = sm.on_outcome(&ClassificationOutcome::new("none", 0.99));
        assert_eq!(intents, vec![ObstacleIntent::CloseSession]);
        assert_eq!(sm.state(), ObstacleState::Listening);
    }

    #[test]
    fn test_rejection_leaves_cooldown_untouched() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        sm.on_outcome(&ClassificationOutcome::new("stairs", 0.3));
        // Next tone passes the gate immediately: nothing was recorded
        assert!(!sm.on_tone(tone(2)).is_empty());
        assert_eq!(sm.state(), ObstacleState::AwaitingClassification);
    }

    #[test]
    fn test_cooldown_suppresses_next_cycle_after_accept() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        sm.on_outcome(&ClassificationOutcome::new("stairs", 0.9));
        sm.on_resume();
        assert_eq!(sm.state(), ObstacleState::Listening);

        // Inside the cooldown window: suppressed
        assert!(sm.on_tone(tone(2)).is_empty());
        assert_eq!(sm.state(), ObstacleState::Listening);

        thread::sleep(Duration::from_millis(80));
        assert!(!sm.on_tone(tone(3)).is_empty());
    }

    #[test]
    fn test_session_failure_reverts_to_listening() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        let intents = sm.on_session_failed("bind failed");
        assert_eq!(intents, vec![ObstacleIntent::CloseSession]);
        assert_eq!(sm.state(), ObstacleState::Listening);
    }

    #[test]
    fn test_stale_failure_after_accept_is_ignored() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        sm.on_outcome(&ClassificationOutcome::new("stairs", 0.9));
        // A timeout firing during the resume delay must not cancel the cycle
        assert!(sm.on_session_failed("timeout").is_empty());
        assert_eq!(sm.state(), ObstacleState::AwaitingClassification);
        assert!(!sm.on_resume().is_empty());
    }

    #[test]
    fn test_stop_from_awaiting_closes_session_and_releases_audio() {
        let mut sm = listening_machine();
        sm.on_tone(tone(1));
        let intents = sm.stop();
        assert_eq!(
            intents,
            vec![ObstacleIntent::CloseSession, ObstacleIntent::ReleaseAudio]
        );
        assert_eq!(sm.state(), ObstacleState::Suspended);
    }

    #[test]
    fn test_restart_after_suspend() {
        let mut sm = listening_machine();
        sm.stop();
        let intents = sm.start_listening().unwrap();
        assert_eq!(sm.state(), ObstacleState::Listening);
        assert_eq!(intents[0], ObstacleIntent::StartAudio);
    }

    #[test]
    fn test_outcome_ignored_outside_awaiting() {
        let mut sm = listening_machine();
        assert!(sm
            .on_outcome(&ClassificationOutcome::new("stairs", 0.9))
            .is_empty());
        assert_eq!(sm.state(), ObstacleState::Listening);
    }

    #[test]
    fn test_resume_ignored_without_pending() {
        let mut sm = listening_machine();
        assert!(sm.on_resume().is_empty());
        sm.on_tone(tone(1));
        // Awaiting but no accepted outcome yet
        assert!(sm.on_resume().is_empty());
    }
}
