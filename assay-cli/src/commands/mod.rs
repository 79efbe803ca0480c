use std::sync::Arc;

use anyhow::Result;
use assay_engine::{AssayConfig, AssessmentService, CozoStore, Sampler, SystemClock};
use serde::Serialize;
use tracing::debug;

pub mod assessment;
pub mod attempt;
pub mod catalog;
pub mod config;
pub mod generate;
pub mod report;

/// Open the on-disk store and wire the service over it
pub async fn open_service(config: AssayConfig) -> Result<AssessmentService> {
    debug!(path = %config.db_path.display(), "Opening assay database");
    let store = CozoStore::open(&config.db_path).await?;
    Ok(AssessmentService::new(
        Arc::new(store),
        Arc::new(SystemClock),
        Arc::new(Sampler::from_entropy()),
        config,
    ))
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
