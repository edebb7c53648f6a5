//! Rehearse Command
//!
//! Runs tests through the full engine against a permissive scripted driver.
//! Composition, substitution and step preconditions are exercised for real;
//! assertions about text or absence can fail because the scripted UI is
//! empty.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use jsonui_test::{filter_by_tag, write_results, LoadedTest, RunnerConfig, ScriptedDriver, TestLoader, TestRunner};

use crate::output::{print_report, OutputFormat};

#[derive(Args)]
pub struct RehearseArgs {
    /// Test file or directory
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only tests carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Directory for test-results.json
    #[arg(long, default_value = "test-results")]
    pub output: PathBuf,
}

pub async fn execute(args: RehearseArgs, config: RunnerConfig, format: OutputFormat) -> Result<bool> {
    let loaded = TestLoader::load_path(&args.path)?;
    let tests: Vec<LoadedTest> = match &args.tag {
        Some(tag) => filter_by_tag(&loaded, tag).into_iter().cloned().collect(),
        None => loaded,
    };
    info!("Rehearsing {} test(s) as platform '{}'", tests.len(), config.platform);

    let runner = TestRunner::new(Arc::new(ScriptedDriver::permissive()), config);
    let report = runner.run_all(&tests).await;

    print_report(&report, format);
    write_results(&args.output, &report)?;
    Ok(report.all_passed())
}
