//! Assessment lifecycle commands

use anyhow::Result;
use assay_engine::{AssessmentId, AssessmentService, AssessmentStatus};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct AssessmentArgs {
    #[command(subcommand)]
    pub command: AssessmentCommands,
}

#[derive(Subcommand)]
pub enum AssessmentCommands {
    /// Show an assessment summary
    Show { id: AssessmentId },
    /// Move an assessment to another status
    Transition {
        id: AssessmentId,
        /// draft, published, ongoing, completed or archived
        to: AssessmentStatus,
    },
}

pub async fn run(args: AssessmentArgs, service: &AssessmentService) -> Result<()> {
    match args.command {
        AssessmentCommands::Show { id } => {
            let assessment = service.get_assessment(id).await?;
            println!("Assessment {}", assessment.id);
            println!("  Title:    {}", assessment.title);
            println!("  Course:   {}", assessment.course_id);
            println!("  Status:   {}", assessment.status.as_str());
            println!(
                "  Marks:    {} total, {} to pass",
                assessment.config.total_marks, assessment.config.passing_marks
            );
            println!(
                "  Attempts: {} scored, {} passed, best {}%",
                assessment.stats.attempt_count,
                assessment.stats.pass_count,
                assessment.stats.highest_percentage
            );
            if let Some(adaptive) = &assessment.adaptive {
                let mix = &adaptive.difficulty_distribution;
                println!("  Built for {}", adaptive.target_learner);
                println!(
                    "  Mix:      easy {}% / medium {}% / hard {}%",
                    mix.easy, mix.medium, mix.hard
                );
                println!("  Focus:    {}", adaptive.focus_topics.join(", "));
            }
            Ok(())
        }
        AssessmentCommands::Transition { id, to } => {
            let assessment = service.transition_assessment(id, to).await?;
            println!(
                "Assessment {} is now {}",
                assessment.id,
                assessment.status.as_str()
            );
            Ok(())
        }
    }
}
