//! Cross-attempt statistics: discrimination, percentile, trend

use serde::{Deserialize, Serialize};

/// One completed attempt's view of a single question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionOutcome {
    /// Attempt score percentage
    pub score: u32,
    /// Whether this attempt answered the question correctly
    pub correct: bool,
}

/// How well a question separates high scorers from low scorers.
///
/// Attempts are sorted by score descending; the top and bottom groups each
/// hold `floor(group_ratio * n)` attempts. Returns the fraction correct in the
/// top group minus the fraction correct in the bottom group, rounded to two
/// decimals, or 0 with fewer than `min_attempts` outcomes.
pub fn discrimination_index(
    outcomes: &[QuestionOutcome],
    group_ratio: f64,
    min_attempts: usize,
) -> f64 {
    let n = outcomes.len();
    if n < min_attempts {
        return 0.0;
    }
    let group = (group_ratio * n as f64).floor() as usize;
    if group == 0 {
        return 0.0;
    }

    let mut sorted = outcomes.to_vec();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    let fraction = |slice: &[QuestionOutcome]| {
        slice.iter().filter(|o| o.correct).count() as f64 / group as f64
    };
    let top = fraction(&sorted[..group]);
    let bottom = fraction(&sorted[n - group..]);

    round2(top - bottom)
}

/// Share of completed scores strictly below `score`, as a whole percentage.
///
/// `all_scores` includes `score` itself. `None` with fewer than
/// `min_attempts` scores.
pub fn percentile(score: u32, all_scores: &[u32], min_attempts: usize) -> Option<u32> {
    if all_scores.len() < min_attempts.max(1) {
        return None;
    }
    let below = all_scores.iter().filter(|s| **s < score).count();
    Some((100.0 * below as f64 / all_scores.len() as f64).round() as u32)
}

/// Direction of a score series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

/// Compare the mean of the last `window` values with the mean of the
/// `window` before them (or fewer).
///
/// `values` is oldest first. Stable when there is nothing to compare against
/// or the difference stays within `threshold`.
pub fn trend(values: &[f64], window: usize, threshold: f64) -> TrendDirection {
    let window = window.max(1);
    if values.len() <= window {
        return TrendDirection::Stable;
    }

    let split = values.len() - window;
    let recent = &values[split..];
    let previous = &values[split.saturating_sub(window)..split];

    let diff = mean(recent) - mean(previous);
    if diff > threshold {
        TrendDirection::Improving
    } else if diff < -threshold {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(pairs: &[(u32, bool)]) -> Vec<QuestionOutcome> {
        pairs
            .iter()
            .map(|&(score, correct)| QuestionOutcome { score, correct })
            .collect()
    }

    #[test]
    fn test_discrimination_perfect_separation() {
        // Ten attempts, top two correct, everyone else wrong
        let data = outcomes(&[
            (95, true),
            (90, true),
            (80, false),
            (70, false),
            (60, false),
            (50, false),
            (40, false),
            (30, false),
            (20, false),
            (10, false),
        ]);
        assert!((discrimination_index(&data, 0.27, 4) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_discrimination_needs_min_attempts() {
        let data = outcomes(&[(90, true), (10, false), (50, true)]);
        assert_eq!(discrimination_index(&data, 0.27, 4), 0.0);
    }

    #[test]
    fn test_discrimination_negative_when_reversed() {
        let data = outcomes(&[(90, false), (80, false), (20, true), (10, true)]);
        // group of floor(1.08) = 1
        assert!((discrimination_index(&data, 0.27, 4) + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_discrimination_rounds_to_two_decimals() {
        // 12 attempts, groups of 3: top 2/3 correct, bottom 0/3
        let mut pairs = vec![(90, true), (85, true), (80, false)];
        pairs.extend((0..6).map(|i| (60 - i, false)));
        pairs.extend([(20, false), (15, false), (10, false)]);
        let data = outcomes(&pairs);
        assert!((discrimination_index(&data, 0.27, 4) - 0.67).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_counts_strictly_lower() {
        let all = [40, 60, 60, 80];
        assert_eq!(percentile(60, &all, 2), Some(25));
        assert_eq!(percentile(80, &all, 2), Some(75));
        assert_eq!(percentile(40, &all, 2), Some(0));
    }

    #[test]
    fn test_percentile_needs_two_attempts() {
        assert_eq!(percentile(70, &[70], 2), None);
    }

    #[test]
    fn test_trend_directions() {
        assert_eq!(
            trend(&[50.0, 50.0, 50.0, 60.0, 60.0, 60.0], 3, 5.0),
            TrendDirection::Improving
        );
        assert_eq!(
            trend(&[70.0, 70.0, 70.0, 60.0, 60.0, 60.0], 3, 5.0),
            TrendDirection::Declining
        );
        assert_eq!(
            trend(&[60.0, 60.0, 60.0, 64.0, 64.0, 64.0], 3, 5.0),
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_trend_uses_fewer_previous_values() {
        // previous = [40], recent = [60, 60, 60]
        assert_eq!(
            trend(&[40.0, 60.0, 60.0, 60.0], 3, 5.0),
            TrendDirection::Improving
        );
    }

    #[test]
    fn test_trend_threshold_families() {
        // +8 is a learner-level improvement but stable at batch level
        let series = [50.0, 50.0, 50.0, 58.0, 58.0, 58.0];
        assert_eq!(trend(&series, 3, 5.0), TrendDirection::Improving);
        assert_eq!(trend(&series, 3, 10.0), TrendDirection::Stable);
    }

    #[test]
    fn test_trend_without_history_is_stable() {
        assert_eq!(trend(&[90.0, 10.0], 3, 5.0), TrendDirection::Stable);
        assert_eq!(trend(&[], 3, 5.0), TrendDirection::Stable);
    }
}
