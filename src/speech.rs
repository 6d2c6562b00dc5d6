// Spoken narration interface and the fixed phrase set
// The host renders speech; the core only decides what to say and when

use uuid::Uuid;

/// Fixed utterance ids for narrations whose completion gates control flow
pub mod utterance_ids {
    /// The "total steps" narration; buzzer listening starts only after the
    /// host reports this utterance complete
    pub const TOTAL_STEPS: &str = "UTT_TOTAL_STEPS";
}

/// Every phrase the core ever speaks
pub mod phrases {
    pub const LISTENING_STARTED: &str = "Listening for buzzer sound now.";
    pub const OBSTACLE_DETECTED: &str = "Obstacle detected. Turning on camera.";
    pub const NEXT_BUZZER: &str = "Listening for next buzzer.";
    pub const CAMERA_NOT_READY: &str = "Camera not ready.";
    pub const CAMERA_FAILED: &str = "Camera failed.";
    pub const MIC_UNAVAILABLE: &str =
        "Audio permission not granted. Please allow microphone permission.";
    pub const ROOMS_RETRY: &str =
        "Please say two room numbers clearly, for example three zero two to three zero seven.";
    pub const ARRIVED: &str = "You have reached the destination";
    pub const NEAR_DESTINATION: &str = "You are near the destination";

    /// Milestone narration for a remaining step count
    pub fn steps_away(steps: u32) -> String {
        format!("{} steps away", steps)
    }

    /// Route confirmation, spoken with the TOTAL_STEPS utterance id
    pub fn navigation_set(start_room: i32, dest_room: i32, total_steps: u32) -> String {
        format!(
            "Navigation set from {} to {}. Total {} steps.",
            start_room, dest_room, total_steps
        )
    }
}

/// Speech synthesis collaborator, provided by the host
///
/// `speak` must not block. The host signals rendering completion back to the
/// coordinator keyed by `utterance_id`; the core relies on that signal to
/// sequence narration against the audio thread.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, utterance_id: &str);
}

/// Fresh id for an utterance nothing waits on
pub fn random_utterance_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_set_phrase() {
        assert_eq!(
            phrases::navigation_set(302, 307, 75),
            "Navigation set from 302 to 307. Total 75 steps."
        );
    }

    #[test]
    fn test_steps_away_phrase() {
        assert_eq!(phrases::steps_away(70), "70 steps away");
    }

    #[test]
    fn test_random_utterance_ids_are_unique() {
        assert_ne!(random_utterance_id(), random_utterance_id());
    }
}
