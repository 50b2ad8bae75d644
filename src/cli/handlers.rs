//! Command handlers; each returns the process exit code

use super::commands::{AnalyzeArgs, BuildArgs, PlanArgs, TargetArgs, TestResultsArgs};
use super::output::OutputFormatter;
use crate::analysis::Analyzer;
use crate::builder::{BuildRequest, Builder};
use crate::config::XambuildConfig;
use crate::fs::{FileSystem, RealFileSystem};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

pub fn handle_analyze(args: &AnalyzeArgs) -> i32 {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let graph = match Analyzer::new(fs).analyze(&args.path) {
        Ok(graph) => graph,
        Err(e) => {
            error!("Analysis failed: {}", e);
            return 1;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    emit(formatter.format_solution(graph.solution()), None)
}

pub fn handle_plan(args: &PlanArgs) -> i32 {
    let Some(config) = load_config() else {
        return 1;
    };
    let builder = match new_builder(&args.target, &config) {
        Ok(builder) => builder,
        Err(code) => return code,
    };

    let actions = match builder.plan() {
        Ok(actions) => actions,
        Err(e) => {
            error!("Planning failed: {}", e);
            return 1;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    emit(formatter.format_plan(&actions), None)
}

pub async fn handle_build(args: &BuildArgs) -> i32 {
    let Some(config) = load_config() else {
        return 1;
    };
    let mut builder = match new_builder(&args.target, &config) {
        Ok(builder) => builder,
        Err(code) => return code,
    };

    let retry_on_hang = config.retry_on_hang && !args.no_retry;
    debug!(retry_on_hang, "Starting build");

    let generated = match builder.build(retry_on_hang).await {
        Ok(generated) => generated,
        Err(e) => {
            error!("Build failed: {}", e);
            return 1;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    emit(
        formatter.format_generated_files(generated),
        args.output.as_deref(),
    )
}

pub fn handle_test_results(args: &TestResultsArgs) -> i32 {
    let formatter = OutputFormatter::new(args.format.into());

    match Builder::check_test_log(&RealFileSystem, &args.log) {
        Ok(summary) => emit(formatter.format_test_summary(&summary), None),
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

fn load_config() -> Option<XambuildConfig> {
    let config = XambuildConfig::default();
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your XAMBUILD_* environment variables.");
        return None;
    }
    debug!("{}", config);
    Some(config)
}

fn new_builder(target: &TargetArgs, config: &XambuildConfig) -> Result<Builder, i32> {
    let mut request = BuildRequest::new(
        target.path.clone(),
        target.configuration.clone(),
        target.platform.clone(),
    );
    if let Some(filter) = &target.filter {
        request = request.with_filter(filter.clone());
    }

    Builder::new(request, config, Arc::new(RealFileSystem)).map_err(|e| {
        error!("{}", e);
        1
    })
}

fn emit(rendered: anyhow::Result<String>, destination: Option<&Path>) -> i32 {
    let output = match rendered {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return 1;
        }
    };

    match destination {
        Some(path) => match fs::write(path, &output) {
            Ok(()) => {
                info!("Output written to {}", path.display());
                0
            }
            Err(e) => {
                error!("Failed to write output to {}: {}", path.display(), e);
                1
            }
        },
        None => {
            println!("{}", output);
            0
        }
    }
}
