pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, BuildArgs, CliArgs, Commands, PlanArgs, TestResultsArgs};
pub use output::{OutputFormat, OutputFormatter};
