use xambuild::cli::commands::{CliArgs, Commands};
use xambuild::cli::handlers::{handle_analyze, handle_build, handle_plan, handle_test_results};
use xambuild::util::{init_logging, LoggingConfig};
use xambuild::{NAME, VERSION};

use clap::Parser;
use std::process;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args),
        Commands::Plan(plan_args) => handle_plan(plan_args),
        Commands::Build(build_args) => handle_build(build_args).await,
        Commands::TestResults(test_args) => handle_test_results(test_args),
    };

    process::exit(exit_code);
}
