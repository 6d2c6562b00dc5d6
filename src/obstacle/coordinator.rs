// Top-level coordinator
// One control thread owns the state machine, the navigation counter and the
// in-flight session; every input from hosts, timers and worker threads
// arrives as a ControlMessage on its channel

use crate::audio::{AudioSourceFactory, BuzzerListener, ListenerConfig, ListenerEvent, ToneEvent};
use crate::camera::{CameraError, CameraFrame, ClassificationOutcome, Classifier, FrameAnalyzer, FrameSource};
use crate::constants::{
    ALERT_COOLDOWN_MS, CLASSIFICATION_CONFIDENCE_THRESHOLD, CLASSIFICATION_TIMEOUT_MS,
    RESUME_DELAY_MS, STEPS_PER_ROOM,
};
use crate::direction::DirectionChooser;
use crate::navigation::{parse_rooms, NavigationCounter};
use crate::obstacle::session::ClassificationSession;
use crate::obstacle::state::{ObstacleIntent, ObstacleState, ObstacleStateMachine};
use crate::speech::{phrases, random_utterance_id, utterance_ids, SpeechSynthesizer};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Inputs to the control thread
///
/// Timer messages carry the generation current when they were scheduled; the
/// control thread drops any whose generation no longer matches, so a timer
/// from a finished cycle can never disturb the next one.
#[derive(Debug)]
pub enum ControlMessage {
    /// Recognized route speech, e.g. "302 to 307"
    RouteRecognized(String),
    /// The host finished rendering the utterance with this id
    UtteranceDone(String),
    /// Explicit request to start buzzer listening
    StartListening,
    /// The listener thread detected the buzzer tone
    Tone(ToneEvent),
    /// Audio capture failed and the listener thread exited
    AudioUnavailable(String),
    /// The in-flight session produced its outcome
    ClassificationResult(ClassificationOutcome),
    /// The per-session watchdog elapsed
    SessionTimeout { generation: u64 },
    /// The post-alert resume delay elapsed
    ResumeElapsed { generation: u64 },
    /// The host's step detector registered one step
    StepTaken,
    /// Explicit stop; audio released, session closed
    Stop,
    /// Reply with the current obstacle state
    QueryState(Sender<ObstacleState>),
    /// Reply with the remaining step count
    QueryStepsRemaining(Sender<u32>),
    /// Stop everything and exit the control thread
    Shutdown,
}

/// Errors from the coordinator handle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinatorError {
    /// The control thread has exited
    #[error("Coordinator control thread is not running")]
    Disconnected,
}

/// Timing and threshold knobs for the whole pipeline
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Buzzer listener parameters
    pub listener: ListenerConfig,
    /// Minimum spacing between accepted alerts
    pub cooldown: Duration,
    /// Pause between an accepted alert's narration and resumed listening
    pub resume_delay: Duration,
    /// Watchdog for a session that never produces an outcome
    pub session_timeout: Duration,
    /// Acceptance bar for classification confidence
    pub confidence_threshold: f32,
    /// Step calibration per room of corridor
    pub steps_per_room: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            cooldown: Duration::from_millis(ALERT_COOLDOWN_MS),
            resume_delay: Duration::from_millis(RESUME_DELAY_MS),
            session_timeout: Duration::from_millis(CLASSIFICATION_TIMEOUT_MS),
            confidence_threshold: CLASSIFICATION_CONFIDENCE_THRESHOLD,
            steps_per_room: STEPS_PER_ROOM,
        }
    }
}

/// Forwards camera frames into the in-flight session and posts the outcome
///
/// Lives on the host's camera context, so the channel sender sits behind a
/// mutex to satisfy the analyzer's Sync bound.
struct SessionAnalyzer {
    session: Arc<ClassificationSession>,
    tx: Mutex<Sender<ControlMessage>>,
}

impl FrameAnalyzer for SessionAnalyzer {
    fn analyze(&self, frame: &CameraFrame) {
        if let Some(outcome) = self.session.on_frame(frame) {
            let _ = self
                .tx
                .lock()
                .send(ControlMessage::ClassificationResult(outcome));
        }
    }
}

/// Handle to the running coordinator
///
/// Owns the control thread; dropping the handle shuts everything down.
/// All methods post messages and return immediately except the queries,
/// which wait for the control thread's reply.
pub struct Coordinator {
    tx: Sender<ControlMessage>,
    control_thread: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Spawn the control thread over the given collaborators
    pub fn new(
        audio_factory: AudioSourceFactory,
        camera: Arc<dyn FrameSource>,
        classifier: Arc<dyn Classifier>,
        speech: Arc<dyn SpeechSynthesizer>,
        direction: Arc<dyn DirectionChooser>,
        config: CoordinatorConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread_tx = tx.clone();

        crate::info!("[coordinator] Starting control thread");
        let control_thread = thread::spawn(move || {
            let mut ctl = ControlState {
                sm: ObstacleStateMachine::new(
                    config.cooldown,
                    config.resume_delay,
                    config.confidence_threshold,
                ),
                nav: NavigationCounter::with_steps_per_room(config.steps_per_room),
                listener: BuzzerListener::with_config(config.listener.clone()),
                session: None,
                generation: 0,
                audio_factory,
                camera,
                classifier,
                speech,
                direction,
                config,
                tx: thread_tx,
            };

            while let Ok(msg) = rx.recv() {
                if ctl.handle(msg) {
                    break;
                }
            }
            crate::debug!("[coordinator] Control thread exiting");
        });

        Self {
            tx,
            control_thread: Some(control_thread),
        }
    }

    /// Feed recognized route speech, e.g. "302 to 307"
    pub fn set_route_from_speech(&self, text: impl Into<String>) {
        self.post(ControlMessage::RouteRecognized(text.into()));
    }

    /// Report that the host finished rendering an utterance
    pub fn utterance_done(&self, utterance_id: impl Into<String>) {
        self.post(ControlMessage::UtteranceDone(utterance_id.into()));
    }

    /// Request buzzer listening to start now
    pub fn start_listening(&self) {
        self.post(ControlMessage::StartListening);
    }

    /// Report one step taken
    pub fn step_taken(&self) {
        self.post(ControlMessage::StepTaken);
    }

    /// Stop listening and close any in-flight session
    pub fn stop(&self) {
        self.post(ControlMessage::Stop);
    }

    /// Current obstacle state
    pub fn state(&self) -> Result<ObstacleState, CoordinatorError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(ControlMessage::QueryState(reply_tx))
            .map_err(|_| CoordinatorError::Disconnected)?;
        reply_rx.recv().map_err(|_| CoordinatorError::Disconnected)
    }

    /// Steps left to the destination
    pub fn steps_remaining(&self) -> Result<u32, CoordinatorError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(ControlMessage::QueryStepsRemaining(reply_tx))
            .map_err(|_| CoordinatorError::Disconnected)?;
        reply_rx.recv().map_err(|_| CoordinatorError::Disconnected)
    }

    fn post(&self, msg: ControlMessage) {
        if self.tx.send(msg).is_err() {
            crate::warn!("[coordinator] Control thread is gone, message dropped");
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let _ = self.tx.send(ControlMessage::Shutdown);
        if let Some(handle) = self.control_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Follow-up from executing one intent
enum Applied {
    /// Run these before the rest of the queue
    Continue(Vec<ObstacleIntent>),
    /// The plan the queue came from is void; drop it and run these instead
    Supersede(Vec<ObstacleIntent>),
}

/// Everything the control thread owns; never shared, never locked
struct ControlState {
    sm: ObstacleStateMachine,
    nav: NavigationCounter,
    listener: BuzzerListener,
    session: Option<Arc<ClassificationSession>>,
    /// Bumped per classification cycle; stale timer messages fail the match
    generation: u64,
    audio_factory: AudioSourceFactory,
    camera: Arc<dyn FrameSource>,
    classifier: Arc<dyn Classifier>,
    speech: Arc<dyn SpeechSynthesizer>,
    direction: Arc<dyn DirectionChooser>,
    config: CoordinatorConfig,
    tx: Sender<ControlMessage>,
}

impl ControlState {
    /// Handle one message; returns true when the thread should exit
    fn handle(&mut self, msg: ControlMessage) -> bool {
        match msg {
            ControlMessage::RouteRecognized(text) => self.on_route_recognized(&text),
            ControlMessage::UtteranceDone(id) => {
                if id == utterance_ids::TOTAL_STEPS {
                    self.begin_listening();
                }
            }
            ControlMessage::StartListening => self.begin_listening(),
            ControlMessage::Tone(event) => {
                let intents = self.sm.on_tone(event);
                self.apply(intents);
            }
            ControlMessage::AudioUnavailable(reason) => {
                crate::error!("[coordinator] Audio unavailable: {}", reason);
                self.speak(phrases::MIC_UNAVAILABLE);
                let intents = self.sm.stop();
                self.apply(intents);
            }
            ControlMessage::ClassificationResult(outcome) => {
                let intents = self.sm.on_outcome(&outcome);
                self.apply(intents);
            }
            ControlMessage::SessionTimeout { generation } => {
                if generation == self.generation && self.session.is_some() {
                    let intents = self.sm.on_session_failed("classification timed out");
                    self.apply(intents);
                }
            }
            ControlMessage::ResumeElapsed { generation } => {
                if generation == self.generation {
                    let intents = self.sm.on_resume();
                    self.apply(intents);
                }
            }
            ControlMessage::StepTaken => {
                if let Some(narration) = self.nav.advance() {
                    self.speak(&narration.phrase());
                }
            }
            ControlMessage::Stop => {
                let intents = self.sm.stop();
                self.apply(intents);
            }
            ControlMessage::QueryState(reply) => {
                let _ = reply.send(self.sm.state());
            }
            ControlMessage::QueryStepsRemaining(reply) => {
                let _ = reply.send(self.nav.steps_remaining());
            }
            ControlMessage::Shutdown => {
                let intents = self.sm.stop();
                self.apply(intents);
                return true;
            }
        }
        false
    }

    fn on_route_recognized(&mut self, text: &str) {
        match parse_rooms(text).and_then(|(start, dest)| {
            self.nav.set_route(start, dest).map(|total| (start, dest, total))
        }) {
            Some((start, dest, total)) => {
                // Listening starts only once the host reports this utterance
                // rendered, so the confirmation is never talked over
                self.speech.speak(
                    &phrases::navigation_set(start, dest, total),
                    utterance_ids::TOTAL_STEPS,
                );
            }
            None => {
                crate::warn!("[coordinator] No usable route in recognized speech: {:?}", text);
                self.speak(phrases::ROOMS_RETRY);
            }
        }
    }

    fn begin_listening(&mut self) {
        match self.sm.start_listening() {
            Ok(intents) => self.apply(intents),
            Err(e) => crate::debug!("[coordinator] Listening not started: {}", e),
        }
    }

    /// Execute intents in order; an intent that fails may queue follow-ups
    /// or void the rest of the plan it came from
    fn apply(&mut self, intents: Vec<ObstacleIntent>) {
        let mut queue: VecDeque<ObstacleIntent> = intents.into();
        while let Some(intent) = queue.pop_front() {
            match self.execute(intent) {
                Applied::Continue(follow_ups) => {
                    for follow_up in follow_ups.into_iter().rev() {
                        queue.push_front(follow_up);
                    }
                }
                Applied::Supersede(follow_ups) => {
                    queue.clear();
                    queue.extend(follow_ups);
                }
            }
        }
    }

    fn execute(&mut self, intent: ObstacleIntent) -> Applied {
        match intent {
            ObstacleIntent::StartAudio => self.start_audio(),
            ObstacleIntent::ReleaseAudio => {
                self.listener.stop();
                Applied::Continue(Vec::new())
            }
            ObstacleIntent::Speak(text) => {
                self.speak(&text);
                Applied::Continue(Vec::new())
            }
            ObstacleIntent::SpeakDirection => {
                let direction = self.direction.choose();
                crate::info!("[coordinator] Directing {:?}", direction);
                self.speak(direction.narration());
                Applied::Continue(Vec::new())
            }
            ObstacleIntent::BeginClassification => self.begin_classification(),
            ObstacleIntent::CloseSession => {
                if let Some(session) = self.session.take() {
                    session.close();
                }
                Applied::Continue(Vec::new())
            }
            ObstacleIntent::ScheduleResume(delay) => {
                self.schedule(delay, ControlMessage::ResumeElapsed {
                    generation: self.generation,
                });
                Applied::Continue(Vec::new())
            }
        }
    }

    fn start_audio(&mut self) -> Applied {
        let source = match (self.audio_factory)() {
            Ok(source) => source,
            Err(e) => {
                crate::error!("[coordinator] Audio source unavailable: {}", e);
                self.speak(phrases::MIC_UNAVAILABLE);
                // The listening-started narration queued behind this intent
                // must not play once the machine suspends
                return Applied::Supersede(self.sm.stop());
            }
        };

        let tx = self.tx.clone();
        let result = self.listener.start(source, move |event| {
            let msg = match event {
                ListenerEvent::Tone(tone) => ControlMessage::Tone(tone),
                ListenerEvent::Unavailable(reason) => ControlMessage::AudioUnavailable(reason),
            };
            let _ = tx.send(msg);
        });
        if let Err(e) = result {
            crate::warn!("[coordinator] Listener start rejected: {}", e);
        }
        Applied::Continue(Vec::new())
    }

    fn begin_classification(&mut self) -> Applied {
        self.generation += 1;
        let session = ClassificationSession::open(
            self.camera.clone(),
            self.classifier.clone(),
            self.config.confidence_threshold,
        );
        let analyzer = Arc::new(SessionAnalyzer {
            session: session.clone(),
            tx: Mutex::new(self.tx.clone()),
        });

        if let Err(e) = self.camera.bind(analyzer) {
            crate::error!("[coordinator] Camera bind failed: {}", e);
            match e {
                CameraError::NotReady => self.speak(phrases::CAMERA_NOT_READY),
                _ => self.speak(phrases::CAMERA_FAILED),
            }
            session.close();
            return Applied::Continue(self.sm.on_session_failed("camera bind failed"));
        }

        self.session = Some(session);
        self.schedule(self.config.session_timeout, ControlMessage::SessionTimeout {
            generation: self.generation,
        });
        Applied::Continue(Vec::new())
    }

    /// Post a message back to the control channel after a delay
    fn schedule(&self, delay: Duration, msg: ControlMessage) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(msg);
        });
    }

    fn speak(&self, text: &str) {
        self.speech.speak(text, &random_utterance_id());
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
