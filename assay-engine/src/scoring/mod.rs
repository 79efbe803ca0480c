//! Answer grading and submission scoring

mod grader;
mod scorer;

pub use grader::{grade_answers, is_correct};
pub use scorer::SubmissionScorer;
