//! Learning-path workflow: goal input, prompt construction, AI generation
//! with deterministic fallback, persistence, and in-memory plan state with
//! an on-device status mirror.

pub mod generate;
pub mod goal;
pub mod persistence;
pub mod session;
pub mod state;

pub use goal::LearningGoalInput;
pub use session::{Session, SessionError};
