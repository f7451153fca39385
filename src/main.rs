mod aggregate;
mod cache;
mod cli;
mod csv_processor;
mod error;
mod file_processing;
mod period;
mod progress;
mod utils;

/// Installs the stderr log subscriber. `--verbose` lowers the level to debug.
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main entry point of the application.
///
/// This function orchestrates the entire workflow:
/// 1. Parses command-line arguments.
/// 2. Resolves the input files and validates the output directory.
/// 3. Determines the number of threads to use.
/// 4. Loads every file through a shared content-addressed cache and
///    aggregates it for each requested period.
/// 5. Prints the tables or writes them as CSV files.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    file_processing::check_path(&args.input)?;
    let inputs = file_processing::collect_inputs(&args.input)?;
    if let Some(output) = &args.output {
        file_processing::ensure_dir_exist(output)?;
    }

    let effective_threads = match args.threads {
        Some(n) if n > 0 => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                tracing::warn!("Limiting thread count to {} (max available)", max_threads);
                max_threads
            } else { n }
        }
        Some(_) => return Err(anyhow::anyhow!("Number of threads must be a positive integer")),
        None => rayon::current_num_threads(),
    };
    tracing::info!(
        files = inputs.len(),
        threads = effective_threads,
        periods = ?args.periods,
        "starting"
    );

    let cache = cache::TableCache::new();
    let options = progress::RunOptions {
        periods: args.periods.clone(),
        strict: args.strict,
    };

    let reports = if args.threads.is_some() {
        let local_pool = utils::configure_thread_pool(effective_threads)?;
        local_pool.install(|| progress::process_files(&inputs, &options, &cache))?
    } else {
        progress::process_files(&inputs, &options, &cache)?
    };

    for report in &reports {
        match &args.output {
            Some(output) => {
                utils::write_report_csv(report, output)?;
            }
            None => utils::print_report(report),
        }
    }

    let stats = cache.stats();
    if !cache.is_empty() {
        tracing::info!(
            cached_tables = cache.len(),
            hits = stats.hits,
            misses = stats.misses,
            "table cache"
        );
    }
    println!(
        "✅ Processed {} file(s) in {:?} seconds",
        reports.len(),
        total_start.elapsed().as_secs_f64()
    );
    Ok(())
}
