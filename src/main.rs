use clap::{Parser, Subcommand};

use swift_filter::{swift, swift_opt::FilterCliOptions};

#[derive(Parser)]
#[command(name = "swift-filter")]
#[command(about = "SWIFT q-gram filter - candidate windows for approximate pattern matches in DNA", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan haystack sequences for windows that may hold approximate pattern matches
    Filter(FilterCliOptions),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Filter(args) => {
            // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace)
            // to Rust log levels
            let log_level = match args.verbosity {
                v if v <= 1 => log::LevelFilter::Error,
                2 => log::LevelFilter::Warn,
                3 => log::LevelFilter::Info,
                4 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace, // 5+ = trace
            };

            env_logger::Builder::from_default_env()
                .filter_level(log_level)
                .format_timestamp(None) // Don't show timestamps
                .format_target(false) // Don't show module names
                .init();

            if args.local && args.min_length.is_none() {
                log::error!("--local requires --min-length");
                std::process::exit(1);
            }

            // Default to number of CPU cores if not specified
            let mut num_threads = args.threads.unwrap_or_else(num_cpus::get);
            if num_threads < 1 {
                log::warn!("Invalid thread count {}, using 1 thread", num_threads);
                num_threads = 1;
            }
            let max_threads = num_cpus::get() * 2;
            if num_threads > max_threads {
                log::warn!(
                    "Thread count {} exceeds recommended maximum {}, capping at {}",
                    num_threads,
                    max_threads,
                    max_threads
                );
                num_threads = max_threads;
            }

            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
            {
                Ok(_) => log::debug!("Built global Rayon thread pool with {} threads", num_threads),
                Err(e) => log::warn!(
                    "Failed to configure thread pool: {} (may already be initialized)",
                    e
                ),
            }
            log::info!(
                "Using {} {}",
                num_threads,
                if num_threads == 1 { "thread" } else { "threads" }
            );

            let mut opt = args.to_swift_opt();
            opt.threads = num_threads;

            if let Err(e) = swift::main_filter(
                &args.patterns,
                &args.haystack,
                args.output.as_deref(),
                &opt,
            ) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }
}
