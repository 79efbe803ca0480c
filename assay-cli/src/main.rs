use std::path::{Path, PathBuf};

use anyhow::Result;
use assay_engine::AssessmentService;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "assay", about = "Adaptive assessments with proficiency feedback")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra config file layered over user and project config
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage courses and questions
    Catalog(commands::catalog::CatalogArgs),
    /// Generate an adaptive assessment for a learner
    Generate(commands::generate::GenerateArgs),
    /// Start, submit, abandon or expire attempts
    Attempt(commands::attempt::AttemptArgs),
    /// Move an assessment through its lifecycle
    Assessment(commands::assessment::AssessmentArgs),
    /// Reports, insights and analytics
    Report(commands::report::ReportArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Catalog(args) => commands::catalog::run(args, &connect(explicit).await?).await,
        Commands::Generate(args) => commands::generate::run(args, &connect(explicit).await?).await,
        Commands::Attempt(args) => commands::attempt::run(args, &connect(explicit).await?).await,
        Commands::Assessment(args) => {
            commands::assessment::run(args, &connect(explicit).await?).await
        }
        Commands::Report(args) => commands::report::run(args, &connect(explicit).await?).await,
        Commands::Config(args) => commands::config::run(args, explicit),
    }
}

/// Load layered config and open the on-disk store
async fn connect(explicit: Option<&Path>) -> Result<AssessmentService> {
    let config = config::ConfigLoader::load(explicit)?;
    commands::open_service(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "assay",
            "generate",
            "--learner",
            "l1",
            "--course",
            "CS301",
            "--count",
            "5",
            "--focus",
            "Arrays",
            "--focus",
            "Trees",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.count, 5);
        assert_eq!(args.focus, vec!["Arrays", "Trees"]);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "assay",
            "config",
            "show",
            "--verbose",
            "--config",
            "/tmp/assay.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/assay.toml")));
    }

    #[test]
    fn test_attempt_id_must_be_uuid() {
        let result = Cli::try_parse_from([
            "assay",
            "attempt",
            "abandon",
            "--learner",
            "l1",
            "not-a-uuid",
        ]);
        assert!(result.is_err());
    }
}
