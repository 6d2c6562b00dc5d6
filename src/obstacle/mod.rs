// Obstacle detection and response module
// ObstacleStateMachine owns the session state and emits intents;
// ClassificationSession enforces the one-shot camera cycle;
// Coordinator serializes everything onto a single control thread

mod coordinator;
mod session;
mod state;

pub use coordinator::{ControlMessage, Coordinator, CoordinatorConfig, CoordinatorError};
pub use session::ClassificationSession;
pub use state::{ObstacleIntent, ObstacleState, ObstacleStateError, ObstacleStateMachine};
