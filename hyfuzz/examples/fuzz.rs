use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hyfuzz::prelude::*;
use log::LevelFilter;

/// Run a seeded equivalence-fuzzing campaign.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML run configuration; built-in defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the master seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the number of iterations
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Override the maximum tree depth
    #[arg(short = 'd', long)]
    max_depth: Option<usize>,

    /// Replay a single iteration seed instead of running the campaign
    #[arg(long)]
    replay: Option<u64>,

    /// Check every catalog entry once instead of generating random trees
    #[arg(long)]
    sweep: bool,

    /// Keep rows holding nulls in sweep predicates
    #[arg(long)]
    keep_nulls: bool,

    /// Print the trees generated from seeds 0..N before running
    #[arg(long, default_value_t = 0)]
    show: u64,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}: [{}] {}",
                record.level().to_string().to_lowercase(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr())
        .apply()
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logger(args.verbose) {
        eprintln!("failed to install logger: {e}");
    }

    let mut config = match &args.config {
        Some(path) => match FuzzConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => FuzzConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }

    let fuzzer = match Fuzzer::standard(config) {
        Ok(fuzzer) => fuzzer,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    for iteration in 0..args.show {
        let case = match fuzzer.generate_case(iteration, iteration) {
            Ok(case) => case,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        };
        println!("seed {iteration}:");
        if case.tree.pretty_print().is_err() {
            println!("{}", case.tree);
        }
        println!();
    }

    let result = match args.replay {
        Some(seed) => fuzzer.run_seed(seed, 0).map(|verdict| {
            println!("seed {seed}: {verdict:?}");
        }),
        None if args.sweep => {
            let filter_nulls = !args.keep_nulls;
            fuzzer.sweep_binaries(filter_nulls).and_then(|binaries| {
                println!("binaries: {binaries}");
                fuzzer
                    .sweep_binary_then_unary(filter_nulls)
                    .map(|composed| println!("binary then unary: {composed}"))
            })
        }
        None => fuzzer.run().map(|report| println!("{report}")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
