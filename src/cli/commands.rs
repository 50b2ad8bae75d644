use crate::analysis::Api;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Builds Xamarin solutions through mdtool and xbuild
#[derive(Parser, Debug)]
#[command(
    name = "xambuild",
    about = "Analyze, plan and run Xamarin solution builds",
    version,
    author,
    long_about = "xambuild reads a Visual Studio solution and its projects, works out which \
                  iOS and android applications a configuration produces, runs the build tools \
                  for them one at a time under hang supervision, and reports the generated \
                  .app, .xcarchive and .apk artifacts."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Show the projects and configuration mappings of a solution",
        long_about = "Parses a solution and every project it references.\n\n\
                      Examples:\n  \
                      xambuild analyze App.sln\n  \
                      xambuild analyze App.sln --format yaml"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Print the build actions for a configuration without running them",
        long_about = "Examples:\n  \
                      xambuild plan App.sln -c Release -p iPhone\n  \
                      xambuild plan App.sln -c Release -p \"Any CPU\" --filter android"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Build a configuration and report the generated files",
        long_about = "Runs every planned action in order, stopping at the first failure.\n\n\
                      Examples:\n  \
                      xambuild build App.sln -c Release -p iPhone\n  \
                      xambuild build App.sln -c Debug -p iPhoneSimulator --no-retry"
    )]
    Build(BuildArgs),

    #[command(
        about = "Summarize a test-runner log",
        long_about = "Reads the `Tests run:` lines of a log and exits non-zero unless \
                      no test failed.\n\n\
                      Examples:\n  \
                      xambuild test-results tests.log"
    )]
    TestResults(TestResultsArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "PATH", help = "Path to the .sln file")]
    pub path: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

/// Solution, configuration and project-type selection shared by `plan` and `build`
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(value_name = "PATH", help = "Path to the .sln file")]
    pub path: PathBuf,

    #[arg(short = 'c', long, value_name = "CONFIG", help = "Solution configuration, e.g. Release")]
    pub configuration: String,

    #[arg(short = 'p', long, value_name = "PLATFORM", help = "Solution platform, e.g. iPhone")]
    pub platform: String,

    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_api,
        help = "Project types to build: ios, android, uitest (default: ios,android)"
    )]
    pub filter: Option<Vec<Api>>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, help = "Do not re-run an action that hung")]
    pub no_retry: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the generated files report to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct TestResultsArgs {
    #[arg(value_name = "LOG", help = "Path to the test-runner log")]
    pub log: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_api(s: &str) -> Result<Api, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_analyze_command() {
        let args = CliArgs::parse_from(["xambuild", "analyze", "App.sln"]);
        match args.command {
            Commands::Analyze(analyze_args) => {
                assert_eq!(analyze_args.path, PathBuf::from("App.sln"));
                assert_eq!(analyze_args.format, OutputFormatArg::Human);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_plan_command() {
        let args = CliArgs::parse_from([
            "xambuild", "plan", "App.sln", "-c", "Release", "-p", "Any CPU", "--format", "json",
        ]);
        match args.command {
            Commands::Plan(plan_args) => {
                assert_eq!(plan_args.target.configuration, "Release");
                assert_eq!(plan_args.target.platform, "Any CPU");
                assert!(plan_args.target.filter.is_none());
                assert_eq!(plan_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_filter_list() {
        let args = CliArgs::parse_from([
            "xambuild", "build", "App.sln", "-c", "Release", "-p", "iPhone", "--filter",
            "ios,uitest", "--no-retry",
        ]);
        match args.command {
            Commands::Build(build_args) => {
                assert_eq!(build_args.target.filter, Some(vec![Api::Ios, Api::UiTest]));
                assert!(build_args.no_retry);
                assert!(build_args.output.is_none());
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let result = CliArgs::try_parse_from([
            "xambuild", "plan", "App.sln", "-c", "Release", "-p", "iPhone", "--filter", "mac",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_configuration_required() {
        let result = CliArgs::try_parse_from(["xambuild", "build", "App.sln", "-p", "iPhone"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_test_results_command() {
        let args = CliArgs::parse_from(["xambuild", "test-results", "tests.log"]);
        match args.command {
            Commands::TestResults(test_args) => {
                assert_eq!(test_args.log, PathBuf::from("tests.log"));
            }
            _ => panic!("Expected TestResults command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["xambuild", "-v", "analyze", "App.sln"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["xambuild", "--log-level", "debug", "analyze", "App.sln"]);
        assert_eq!(args.log_level, Some("debug".to_string()));

        assert!(CliArgs::try_parse_from(["xambuild", "-v", "-q", "analyze", "App.sln"]).is_err());
    }
}
