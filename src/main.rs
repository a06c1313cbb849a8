use clap::{Parser, Subcommand};
use log::LevelFilter;
use specfront::{
    diagnostics, driver,
    language::{clauses::ClauseRegistry, typecheck::CheckOptions},
};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "specfront", version, about = "Checks specification clauses and state expressions")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and check source files.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Stop reporting a file after this many diagnostics.
        #[arg(long)]
        max_errors: Option<usize>,

        /// Accept clause bodies that are not boolean.
        #[arg(long)]
        allow_non_boolean: bool,
    },
    /// Print the registered clause keywords.
    Keywords,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = ClauseRegistry::standard();
    match cli.command {
        Command::Check {
            files,
            max_errors,
            allow_non_boolean,
        } => {
            let options = CheckOptions {
                boolean_clauses: !allow_non_boolean,
                max_errors,
            };
            run_check(&registry, &files, &options)
        }
        Command::Keywords => {
            print_keywords(&registry);
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn run_check(registry: &ClauseRegistry, files: &[PathBuf], options: &CheckOptions) -> ExitCode {
    let mut failed = false;
    for result in driver::check_files(registry, files, options) {
        match result {
            Ok(report) if report.is_clean() => println!("{}: ok", report.path.display()),
            Ok(report) => {
                diagnostics::emit_report(&report);
                println!(
                    "{}: {} error(s)",
                    report.path.display(),
                    report.error_count()
                );
                failed = true;
            }
            Err(err) => {
                diagnostics::report_driver_error(&err);
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_keywords(registry: &ClauseRegistry) {
    println!("{:<12} {:<30} {:<18} capabilities", "keyword", "kind", "arity");
    for descriptor in registry.iter() {
        let capabilities: Vec<_> = descriptor
            .capabilities
            .iter_names()
            .map(|(name, _)| name)
            .collect();
        let capabilities = if capabilities.is_empty() {
            "-".to_string()
        } else {
            capabilities.join(" | ")
        };
        println!(
            "{:<12} {:<30} {:<18} {}",
            descriptor.keyword,
            format!("{:?}", descriptor.kind),
            descriptor.arity.to_string(),
            capabilities
        );
    }
}
