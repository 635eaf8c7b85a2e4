use std::hint::black_box;
use std::process;

use clap::{Parser, Subcommand};
use stacklens_core::backend::Backend;
use stacklens_core::{demangle, DefaultBackend, StackAnalyzer};
use stacklens_utils::{debug, info, init_logging_with, LogConfig, LogLevel};

/// Capture and symbolize call stacks.
#[derive(Parser, Debug)]
#[command(name = "stacklens")]
#[command(version)]
#[command(about = "Capture and symbolize call stacks", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Capture the stack after recursing a number of frames and print it
    Capture
    {
        /// Number of nested frames to create before capturing
        #[arg(short, long, default_value_t = 0)]
        depth: usize,
        /// Print the least recent call first
        #[arg(long, default_value_t = false)]
        reversed: bool,
        /// Only keep frames that are gone once the recursion has returned
        #[arg(long, default_value_t = false)]
        trim: bool,
    },
    /// Print the display name of mangled symbols
    Demangle
    {
        /// Symbol names, mangled or not
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show which capture backend this build uses
    Backend,
}

fn main()
{
    let cli = Cli::parse();

    let config = match LogConfig::from_env() {
        Ok(config) => config.with_level(cli.log_level),
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };
    // Keeps the log file writer alive until exit
    let _guard = match init_logging_with(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    run_command(cli.command);
}

fn run_command(command: Commands)
{
    match command {
        Commands::Capture { depth, reversed, trim } => {
            info!("Capturing at depth {} with the {} backend", depth, DefaultBackend::NAME);
            let mut analyzer = capture_at_depth(depth);
            if trim {
                analyzer.trim_to_current_stack_frame();
            }
            debug!("{} frames captured", analyzer.len());
            print_trace(&analyzer, reversed);
        }
        Commands::Demangle { names } => {
            for name in names {
                println!("{}", demangle(&name));
            }
        }
        Commands::Backend => println!("{}", DefaultBackend::NAME),
    }
}

#[inline(never)]
fn capture_at_depth(depth: usize) -> StackAnalyzer
{
    if depth == 0 {
        let mut analyzer = StackAnalyzer::new();
        analyzer.analyze();
        return analyzer;
    }

    let analyzer = capture_at_depth(depth - 1);
    black_box(depth);
    analyzer
}

fn print_trace(analyzer: &StackAnalyzer, reversed: bool)
{
    if analyzer.is_empty() {
        println!("(no frames captured)");
        return;
    }

    let mut index = 0usize;
    analyzer.get_symbols(
        |symbol| {
            println!("#{index:<3} {} {symbol}", symbol.address);
            index += 1;
        },
        reversed,
    );
}

#[cfg(test)]
mod tests
{
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid()
    {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_capture_arguments()
    {
        let cli = Cli::try_parse_from(["stacklens", "capture", "--depth", "12", "--reversed"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Capture {
                depth: 12,
                reversed: true,
                trim: false
            }
        ));
    }

    #[test]
    fn test_demangle_requires_a_name()
    {
        assert!(Cli::try_parse_from(["stacklens", "demangle"]).is_err());
    }

    #[test]
    fn test_log_level_is_global()
    {
        let cli = Cli::try_parse_from(["stacklens", "backend", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }
}
