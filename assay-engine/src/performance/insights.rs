//! Learner-level insights derived from the proficiency context and recent
//! completed attempts. Read-only.

use serde::{Deserialize, Serialize};

use super::statistics::{TrendDirection, trend};
use crate::config::{ContextBands, InsightConfig, StatisticsConfig};
use crate::types::{Attempt, LearnerId, ProficiencyContext};

/// Pace inferred from average response time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    RapidResponder,
    Balanced,
    Deliberate,
    /// No completed attempts yet
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Novice,
    Developing,
    Proficient,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsights {
    pub learner_id: LearnerId,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub learning_style: LearningStyle,
    pub progress_trend: TrendDirection,
    pub mastery_level: MasteryLevel,
    pub total_attempts: u32,
    pub average_response_time_seconds: f64,
}

impl LearningInsights {
    /// Build insights; `recent` is newest first, completed attempts only
    pub fn build(
        context: &ProficiencyContext,
        recent: &[Attempt],
        bands: &ContextBands,
        insight: &InsightConfig,
        statistics: &StatisticsConfig,
    ) -> Self {
        let strengths: Vec<String> = context
            .topic_scores
            .iter()
            .filter(|(_, s)| **s >= bands.strong_from)
            .map(|(t, _)| t.clone())
            .collect();

        // Weakest first
        let mut weak: Vec<(&String, u32)> = context
            .topic_scores
            .iter()
            .filter(|(_, s)| **s < bands.weak_below)
            .map(|(t, s)| (t, *s))
            .collect();
        weak.sort_by_key(|(_, s)| *s);
        let weaknesses: Vec<String> = weak.iter().map(|(t, _)| (*t).clone()).collect();

        let learning_style = learning_style(context, insight);
        let mastery_level = mastery_level(context, insight);

        let series: Vec<f64> = recent
            .iter()
            .rev()
            .map(|a| f64::from(a.score.percentage))
            .collect();
        let progress_trend = trend(
            &series,
            statistics.trend_window,
            statistics.learner_trend_threshold,
        );

        let mut recommendations = Vec::new();
        if context.total_attempts == 0 {
            recommendations
                .push("Take a practice assessment to calibrate your profile".to_string());
        }
        for (topic, score) in &weak {
            recommendations.push(format!("Focus on {topic} (current score {score})"));
        }
        if progress_trend == TrendDirection::Declining {
            recommendations.push("Recent scores are slipping: revisit earlier material".to_string());
        }
        if learning_style == LearningStyle::RapidResponder {
            recommendations.push("Slow down and read each question fully".to_string());
        }
        if recommendations.is_empty() && mastery_level >= MasteryLevel::Proficient {
            recommendations.push("Switch to hard difficulty to keep progressing".to_string());
        }

        Self {
            learner_id: context.learner_id.clone(),
            strengths,
            weaknesses,
            recommendations,
            learning_style,
            progress_trend,
            mastery_level,
            total_attempts: context.total_attempts,
            average_response_time_seconds: context.average_response_time_seconds,
        }
    }
}

pub fn learning_style(context: &ProficiencyContext, config: &InsightConfig) -> LearningStyle {
    if context.total_attempts == 0 {
        return LearningStyle::Undetermined;
    }
    let t = context.average_response_time_seconds;
    if t < config.rapid_below_seconds {
        LearningStyle::RapidResponder
    } else if t > config.deliberate_above_seconds {
        LearningStyle::Deliberate
    } else {
        LearningStyle::Balanced
    }
}

/// Level from the mean topic score; novice before any assessment
pub fn mastery_level(context: &ProficiencyContext, config: &InsightConfig) -> MasteryLevel {
    match context.mean_score() {
        Some(m) if m >= config.expert_from => MasteryLevel::Expert,
        Some(m) if m >= config.proficient_from => MasteryLevel::Proficient,
        Some(m) if m >= config.developing_from => MasteryLevel::Developing,
        _ => MasteryLevel::Novice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdConfig;

    fn context(scores: &[(&str, f64)], attempts: u32, response: f64) -> ProficiencyContext {
        let mut ctx = ProficiencyContext::new(LearnerId::new("l1"));
        for (t, s) in scores {
            ctx.set_score(t, *s);
        }
        ctx.total_attempts = attempts;
        ctx.average_response_time_seconds = response;
        ctx
    }

    fn build(ctx: &ProficiencyContext) -> LearningInsights {
        LearningInsights::build(
            ctx,
            &[],
            &ThresholdConfig::default().context,
            &InsightConfig::default(),
            &StatisticsConfig::default(),
        )
    }

    #[test]
    fn test_new_learner() {
        let insights = build(&context(&[], 0, 0.0));
        assert_eq!(insights.learning_style, LearningStyle::Undetermined);
        assert_eq!(insights.mastery_level, MasteryLevel::Novice);
        assert_eq!(insights.progress_trend, TrendDirection::Stable);
        assert_eq!(insights.recommendations.len(), 1);
    }

    #[test]
    fn test_strengths_and_weaknesses_use_context_bands() {
        let insights = build(&context(
            &[("Arrays", 45.0), ("Graphs", 30.0), ("Lists", 70.0), ("Trees", 85.0)],
            3,
            45.0,
        ));
        assert_eq!(insights.strengths, vec!["Trees"]);
        assert_eq!(insights.weaknesses, vec!["Graphs", "Arrays"]);
        assert!(insights.recommendations[0].contains("Graphs"));
        assert_eq!(insights.learning_style, LearningStyle::Balanced);
        // mean 57.5
        assert_eq!(insights.mastery_level, MasteryLevel::Developing);
    }

    #[test]
    fn test_learning_style_bands() {
        let config = InsightConfig::default();
        assert_eq!(
            learning_style(&context(&[], 1, 12.0), &config),
            LearningStyle::RapidResponder
        );
        assert_eq!(
            learning_style(&context(&[], 1, 120.0), &config),
            LearningStyle::Deliberate
        );
    }

    #[test]
    fn test_expert_gets_harder_recommendation() {
        let insights = build(&context(&[("Arrays", 90.0), ("Trees", 85.0)], 5, 60.0));
        assert_eq!(insights.mastery_level, MasteryLevel::Expert);
        assert_eq!(insights.recommendations.len(), 1);
        assert!(insights.recommendations[0].contains("hard"));
    }
}
