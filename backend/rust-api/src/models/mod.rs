pub mod attempt;
pub mod pattern;
pub mod session;
pub mod user;

pub use attempt::{Attempt, AttemptRecord, AttemptScore, Verdict};
pub use level_test::{LessonDoc, LevelTestRecord, LevelTestResult, LevelTestSubmission};
pub use pattern::{PatternConquestState, PatternImpactRecord, PatternTrend};
pub use session::{Checkpoint, CheckpointRecord, Session, SessionItem, SessionStatus, SessionSummary};
pub use user::{UserProfile, UserProgressionState};
