//! Shapelet search CLI
//!
//! Runs a search strategy over a JSON dataset with the F-statistic evaluator,
//! and prints window-count budgets.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::Dataset;
use crate::quality::FStatEvaluator;
use crate::search::budget::{theoretical_shapelet_count, timed_cost};
use crate::search::{create_search, Candidate, SearchConfig, SearchStrategy, SearchType};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: impl std::fmt::Display) {
    println!("  {:<18} {}", muted(key), val.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "shapelet-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Shapelet search strategies for time series classification")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a dataset for shapelets
    Search {
        /// Dataset JSON file
        #[arg(short, long)]
        data: PathBuf,

        /// Strategy (full, fast-shapelets, genetic, random, local, magnify,
        /// timed-random, skipping, tabu, refined-random, importance-sampled,
        /// skewed, bayesian)
        #[arg(short, long, default_value = "full")]
        search: String,

        /// Search configuration JSON; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Shortest window length
        #[arg(long)]
        min_length: Option<usize>,

        /// Longest window length
        #[arg(long)]
        max_length: Option<usize>,

        /// Evaluation budget over the dataset
        #[arg(short, long)]
        num_shapelets: Option<u64>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Operation budget for the timed random search
        #[arg(long)]
        time_limit: Option<u64>,

        /// Fraction of series considered by subsampling strategies
        #[arg(long)]
        proportion: Option<f64>,

        /// Restarts, rounds or pre-assigned windows, depending on the strategy
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Best candidates to print
        #[arg(short = 'k', long, default_value = "10")]
        top_k: usize,

        /// Write every candidate found as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write every evaluator submission as JSON
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Print the window count and timed cost for a dataset shape
    Count {
        /// Number of series
        #[arg(short = 'n', long)]
        series: usize,

        /// Series length
        #[arg(short = 'm', long)]
        length: usize,

        /// Shortest window length
        #[arg(long, default_value = "3")]
        min: usize,

        /// Longest window length
        #[arg(long)]
        max: Option<usize>,
    },
}

/// Flag overrides applied on top of the loaded configuration
#[derive(Debug, Default, Clone)]
pub struct SearchOverrides {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub num_shapelets: Option<u64>,
    pub seed: Option<u64>,
    pub time_limit: Option<u64>,
    pub proportion: Option<f64>,
    pub max_iterations: Option<usize>,
}

impl SearchOverrides {
    /// Apply the set flags to `config`
    pub fn apply(&self, mut config: SearchConfig) -> SearchConfig {
        if let Some(v) = self.min_length {
            config.min_length = v;
        }
        if let Some(v) = self.max_length {
            config.max_length = v;
        }
        if let Some(v) = self.num_shapelets {
            config.num_shapelets = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.time_limit {
            config.time_limit = v;
        }
        if let Some(v) = self.proportion {
            config.proportion = v;
        }
        if let Some(v) = self.max_iterations {
            config.max_iterations = v;
        }
        config
    }
}

/// Build the search configuration from an optional file, the selector and flags.
pub fn build_config(
    path: Option<&Path>,
    search: &str,
    overrides: &SearchOverrides,
) -> anyhow::Result<SearchConfig> {
    let base = match path {
        Some(p) => SearchConfig::from_json_file(p)?,
        None => SearchConfig::default(),
    };
    let search_type: SearchType = search.parse()?;
    let config = overrides.apply(base.with_search_type(search_type));
    config.validate()?;
    Ok(config)
}

/// Best `k` candidates over all series, highest quality first
pub fn top_candidates(found: &[Vec<Candidate>], k: usize) -> Vec<Candidate> {
    let mut all: Vec<Candidate> = found.iter().flatten().cloned().collect();
    all.sort_by(|a, b| b.cmp_quality(a));
    all.truncate(k);
    all
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_search(
    data_path: &Path,
    config: SearchConfig,
    top_k: usize,
    output: Option<&Path>,
    trace: Option<&Path>,
) -> anyhow::Result<()> {
    section("Search");

    step_run("Loading data");
    let start = Instant::now();
    let dataset = Dataset::from_json_file(data_path)?;
    step_done(&format!(
        "{} series × {} samples in {:?}",
        dataset.len(),
        dataset.min_series_length(),
        start.elapsed()
    ));

    let config = config.with_record_visits(trace.is_some());
    let mut search = create_search(&config);
    let mut evaluator = FStatEvaluator::new(&dataset);

    step_run(&format!("Running {}", config.search_type.name().cyan()));
    let start = Instant::now();
    let found = search.search_dataset(&dataset, &mut evaluator)?;
    step_done(&format!("{:?}", start.elapsed()));

    let total: usize = found.iter().map(Vec::len).sum();
    println!();
    kv("Evaluations", evaluator.evaluations());
    kv("Candidates", total);
    kv(
        "Full space",
        theoretical_shapelet_count(
            dataset.len(),
            dataset.min_series_length(),
            config.min_length,
            config.max_length,
        ),
    );

    let best = top_candidates(&found, top_k);
    if !best.is_empty() {
        section(&format!("Top {}", best.len()));
        println!(
            "  {:<8} {:<6} {:<8} {:<8} {}",
            muted("series"),
            muted("dim"),
            muted("start"),
            muted("length"),
            muted("quality")
        );
        for c in &best {
            println!(
                "  {:<8} {:<6} {:<8} {:<8} {}",
                c.series_index,
                c.dimension,
                c.start,
                c.length,
                format!("{:.4}", c.quality).white().bold()
            );
        }
    }

    if let Some(path) = output {
        step_run(&format!("Saving → {}", path.display()));
        std::fs::write(path, serde_json::to_string_pretty(&found)?)?;
        step_done(&format!("{total} candidates"));
    }
    if let Some(path) = trace {
        step_run(&format!("Saving trace → {}", path.display()));
        std::fs::write(path, serde_json::to_string_pretty(search.visits())?)?;
        step_done(&format!("{} visits", search.visits().len()));
    }

    println!();
    Ok(())
}

pub fn cmd_count(series: usize, length: usize, min: usize, max: Option<usize>) -> anyhow::Result<()> {
    let max = max.unwrap_or(length);
    if min == 0 || min > max || max > length {
        anyhow::bail!("window lengths must satisfy 1 <= min <= max <= {length}, got {min}..={max}");
    }

    section("Count");
    kv("Windows", theoretical_shapelet_count(series, length, min, max));
    for l in [min, (min + max) / 2, max] {
        kv(&format!("Cost (length {l})"), timed_cost(length, l, series));
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "shapelet-search",
            "search",
            "--data",
            "d.json",
            "--search",
            "tabu",
            "--num-shapelets",
            "500",
            "-k",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { search, num_shapelets, top_k, .. } => {
                assert_eq!(search, "tabu");
                assert_eq!(num_shapelets, Some(500));
                assert_eq!(top_k, 3);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_build_config_applies_overrides() {
        let overrides = SearchOverrides {
            min_length: Some(4),
            max_length: Some(12),
            seed: Some(9),
            ..Default::default()
        };
        let config = build_config(None, "skipping", &overrides).unwrap();
        assert_eq!(config.search_type, SearchType::Skipping);
        assert_eq!((config.min_length, config.max_length, config.seed), (4, 12, 9));

        assert!(build_config(None, "no-such-search", &overrides).is_err());
        let bad = SearchOverrides {
            min_length: Some(10),
            max_length: Some(5),
            ..Default::default()
        };
        assert!(build_config(None, "full", &bad).is_err());
    }

    #[test]
    fn test_top_candidates() {
        let found = vec![
            vec![Candidate::new(0, 0, 0, 3, 1.0), Candidate::new(0, 0, 1, 3, 5.0)],
            vec![Candidate::new(1, 0, 0, 3, 3.0)],
        ];
        let best = top_candidates(&found, 2);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].quality, 5.0);
        assert_eq!(best[1].series_index, 1);
    }
}
