//! Performance aggregation and reporting

mod aggregator;
mod analytics;
mod insights;
mod report;
mod statistics;

pub use aggregator::{AttemptBreakdown, PerformanceAggregator};
pub use analytics::{AssessmentAnalytics, QuestionAnalytics};
pub use insights::{LearningInsights, LearningStyle, MasteryLevel, learning_style, mastery_level};
pub use report::{
    AnswerStats, BasicInfo, LetterGrade, PeerComparison, PerformanceReport, ScoreInfo, Standing,
    TimeInfo, recommendations,
};
pub use statistics::{
    QuestionOutcome, TrendDirection, discrimination_index, percentile, round2, trend,
};
