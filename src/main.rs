//! Shapelet Search - Main Entry Point

use clap::Parser;
use shapelet_search::cli::{build_config, cmd_count, cmd_search, Cli, Commands, SearchOverrides};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shapelet_search=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            data,
            search,
            config,
            min_length,
            max_length,
            num_shapelets,
            seed,
            time_limit,
            proportion,
            max_iterations,
            top_k,
            output,
            trace,
        } => {
            let overrides = SearchOverrides {
                min_length,
                max_length,
                num_shapelets,
                seed,
                time_limit,
                proportion,
                max_iterations,
            };
            let config = build_config(config.as_deref(), &search, &overrides)?;
            cmd_search(&data, config, top_k, output.as_deref(), trace.as_deref())?;
        }
        Commands::Count { series, length, min, max } => {
            cmd_count(series, length, min, max)?;
        }
    }

    Ok(())
}
