//! Reporting commands: attempt reports, learner insights, assessment analytics

use anyhow::Result;
use assay_engine::performance::{AssessmentAnalytics, LearningInsights, PerformanceReport};
use assay_engine::{AssessmentId, AssessmentService, AttemptId, LearnerId, PerformanceStatus};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use super::print_json;

#[derive(Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommands,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Performance report for a completed attempt
    Attempt {
        #[arg(long)]
        learner: String,
        attempt: AttemptId,
    },
    /// Learner insights from the proficiency context
    Insights {
        #[arg(long)]
        learner: String,
    },
    /// Assessment-wide analytics
    Analytics { assessment: AssessmentId },
}

pub async fn run(args: ReportArgs, service: &AssessmentService) -> Result<()> {
    match args.command {
        ReportCommands::Attempt { learner, attempt } => {
            let report = service
                .performance_report(attempt, &LearnerId::new(learner))
                .await?;
            if args.json {
                print_json(&report)
            } else {
                print_report(&report);
                Ok(())
            }
        }
        ReportCommands::Insights { learner } => {
            let insights = service.learning_insights(&LearnerId::new(learner)).await?;
            if args.json {
                print_json(&insights)
            } else {
                print_insights(&insights);
                Ok(())
            }
        }
        ReportCommands::Analytics { assessment } => {
            let analytics = service.assessment_analytics(assessment).await?;
            if args.json {
                print_json(&analytics)
            } else {
                print_analytics(&analytics);
                Ok(())
            }
        }
    }
}

fn header(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        titles
            .iter()
            .map(|t| Cell::new(t).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

fn status_color(status: PerformanceStatus) -> Color {
    match status {
        PerformanceStatus::Strong => Color::Green,
        PerformanceStatus::Average => Color::Yellow,
        PerformanceStatus::Weak => Color::Red,
    }
}

fn print_report(report: &PerformanceReport) {
    println!(
        "{} (attempt #{})",
        report.basic.assessment_title, report.basic.attempt_number
    );
    println!(
        "  Score:    {}/{} ({}%) grade {} {}",
        report.score.obtained,
        report.score.total,
        report.score.percentage,
        report.score.grade,
        if report.score.is_passed { "PASSED" } else { "FAILED" }
    );
    println!(
        "  Answers:  {} answered, {} correct, {} unanswered, {} flagged ({}% accuracy)",
        report.answers.answered,
        report.answers.correct,
        report.answers.unanswered,
        report.answers.flagged,
        report.answers.accuracy
    );
    println!(
        "  Time:     {}s of {} min, {}s per question",
        report.time.time_taken_seconds,
        report.time.duration_minutes,
        report.time.average_time_per_question
    );
    match (report.peer_comparison.percentile, report.peer_comparison.standing) {
        (Some(percentile), Some(standing)) => println!(
            "  Peers:    {}th percentile ({}) of {} attempts",
            percentile,
            standing.as_str(),
            report.peer_comparison.completed_attempts
        ),
        _ => println!("  Peers:    not enough completed attempts yet"),
    }

    if !report.topic_performance.is_empty() {
        let mut table = header(&["Topic", "Attempted", "Correct", "Accuracy", "Avg time"]);
        for topic in &report.topic_performance {
            table.add_row(vec![
                Cell::new(&topic.topic).fg(status_color(topic.status)),
                Cell::new(topic.attempted),
                Cell::new(topic.correct),
                Cell::new(format!("{}%", topic.accuracy)),
                Cell::new(format!("{}s", topic.average_time_seconds)),
            ]);
        }
        println!("\n{table}");
    }

    let d = &report.difficulty_performance;
    let mut table = header(&["Difficulty", "Attempted", "Correct", "Accuracy"]);
    for (name, stats) in [("easy", d.easy), ("medium", d.medium), ("hard", d.hard)] {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(stats.attempted),
            Cell::new(stats.correct),
            Cell::new(format!("{}%", stats.accuracy)),
        ]);
    }
    println!("\n{table}");

    println!("\nRecommendations:");
    for r in &report.recommendations {
        println!("  - {}", r);
    }
}

fn print_insights(insights: &LearningInsights) {
    println!("Learner {}", insights.learner_id);
    println!("  Attempts:  {}", insights.total_attempts);
    println!("  Mastery:   {:?}", insights.mastery_level);
    println!("  Style:     {:?}", insights.learning_style);
    println!("  Progress:  {}", insights.progress_trend.as_str());
    println!(
        "  Pace:      {:.0}s per answer",
        insights.average_response_time_seconds
    );
    if !insights.strengths.is_empty() {
        println!("  Strengths: {}", insights.strengths.join(", "));
    }
    if !insights.weaknesses.is_empty() {
        println!("  Weak:      {}", insights.weaknesses.join(", "));
    }
    println!("\nRecommendations:");
    for r in &insights.recommendations {
        println!("  - {}", r);
    }
}

fn print_analytics(analytics: &AssessmentAnalytics) {
    println!("Assessment {}", analytics.assessment_id);
    println!("  Completed: {}", analytics.completed_attempts);
    if analytics.completed_attempts == 0 {
        return;
    }
    println!(
        "  Scores:    avg {:.2}%, high {}%, low {}%",
        analytics.average_percentage,
        analytics.highest_percentage.unwrap_or_default(),
        analytics.lowest_percentage.unwrap_or_default()
    );
    println!("  Pass rate: {:.0}%", analytics.pass_rate * 100.0);
    println!("  Trend:     {}", analytics.score_trend.as_str());

    let mut table = header(&["#", "Question", "Attempted", "Correct", "Facility", "Discrimination"]);
    for q in &analytics.questions {
        table.add_row(vec![
            Cell::new(q.order),
            Cell::new(q.question_id.as_str()),
            Cell::new(q.attempted),
            Cell::new(q.correct),
            Cell::new(format!("{:.2}", q.facility)),
            Cell::new(format!("{:.2}", q.discrimination_index)),
        ]);
    }
    println!("\n{table}");
}
