//! Pure progress and scoring engine.
//!
//! Nothing in here performs I/O. Services load prior state, call into these
//! functions and persist what comes back.

pub mod calendar;
pub mod catalog;
pub mod patterns;
pub mod progression;
pub mod scoring;
pub mod summary;

pub use level_test::evaluate_level_test;
pub use patterns::{aggregate_pattern_conquests, impact_records};
pub use progression::{
    apply_level_test_result, apply_session_completion, apply_tutorial_completion,
};
pub use scoring::score_attempt;
pub use summary::summarize_session;
