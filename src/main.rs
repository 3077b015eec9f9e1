//! RandQuik CLI: a thin composition of the `randquik` library plus
//! argument parsing, logging setup, and exit-code translation. No
//! pipeline logic lives here — see `src/pipeline/mod.rs`.

mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Args;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    std::process::exit(run(args));
}

fn run(args: Args) -> i32 {
    if args.benchmark {
        return run_benchmark_mode(&args);
    }

    let resolved = match args.resolve() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("randquik: {e}");
            return e.exit_code();
        }
    };

    let output_path = resolved.config.output_path.clone();
    let iseek = resolved.config.iseek;
    let oseek = resolved.config.oseek;
    let result = match randquik::run(resolved.config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("randquik: {e}");
            return e.exit_code();
        }
    };

    if !args.quiet {
        result.print_summary();
        if args.verbose >= 1 {
            eprintln!(
                "mode: {} threads, alg {}, output {}",
                args.threads,
                args.alg,
                output_path.as_deref().unwrap_or("stdout")
            );
        }
        if args.verbose >= 2 {
            result.print_worker_stats();
        }
    }

    if result.interrupted {
        let cmd = cli::continue_command(
            &resolved.seed,
            iseek,
            oseek,
            result.written,
            output_path.as_deref(),
            resolved.total,
        );
        eprintln!("resume with: {cmd}");
        return 1;
    }

    if resolved.seed_was_generated && !args.quiet {
        let cmd = cli::repeat_command(&resolved.seed, output_path.as_deref(), resolved.total);
        eprintln!("repeat with: {cmd}");
    }

    0
}

fn run_benchmark_mode(args: &Args) -> i32 {
    let config = randquik::bench::BenchConfig::default_matrix(args.alg.clone());
    match randquik::bench::run_benchmark(&config) {
        Ok(results) => {
            print!("{}", randquik::bench::format_results(&results));
            0
        }
        Err(e) => {
            eprintln!("randquik: {e}");
            e.exit_code()
        }
    }
}
