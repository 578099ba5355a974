// CLI entrypoint + option wiring.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::cli::args::{Cli, OutputFormat};
use crate::cli::output::{print_ranked, result_rows, write_results};
use crate::options::Options;

pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.list_operators {
        super::ops::print_operator_list();
        return Ok(());
    }

    let table = super::io::load_table(&cli).context("failed to load input table")?;
    let (target, dataset) = super::io::build_dataset(&table, &cli).context("failed to build dataset")?;

    let (registry, variables) = super::ops::build_registry(&cli, dataset.n_features)?;
    let mut options = Options::default();
    cli.options.apply_to(&mut options);
    validate_options(&options)?;

    let registry = Arc::new(registry);
    let result = crate::search(Arc::clone(&registry), &dataset, &options).context("search failed")?;
    if result.n_failed > 0 {
        log::warn!("{} of {} candidates could not be generated", result.n_failed, options.n_candidates);
    }

    let rows = result_rows(&result.ranked, &registry, options.decimals, options.topn);
    let legend: Vec<(String, String)> = variables.into_iter().zip(dataset.variable_names.iter().cloned()).collect();
    print_ranked(&target, &legend, &rows);

    if let Some(path) = &cli.output {
        write_results(path, cli.format, &target, &rows)
            .with_context(|| format!("failed to write output to {}", path.display()))?;
    } else if matches!(cli.format, Some(OutputFormat::Csv | OutputFormat::Json)) {
        log::warn!("--format given without --output; printing a table only");
    }

    Ok(())
}

fn validate_options(opt: &Options) -> anyhow::Result<()> {
    anyhow::ensure!(opt.n_candidates > 0, "n_candidates must be > 0");
    anyhow::ensure!(
        opt.min_height <= opt.max_height,
        "min_height ({}) must be <= max_height ({})",
        opt.min_height,
        opt.max_height
    );
    anyhow::ensure!(opt.n_split >= 2, "n_split must be >= 2");
    anyhow::ensure!(
        (0.0..=1.0).contains(&opt.terminal_ratio),
        "terminal_ratio must be in [0, 1]"
    );
    anyhow::ensure!(opt.train_weight >= 0.0, "train_weight must be >= 0");
    anyhow::ensure!(opt.topn > 0, "topn must be > 0");
    if let Some(p) = opt.complexity_penalty {
        anyhow::ensure!(p.is_finite() && p >= 0.0, "complexity_penalty must be a finite value >= 0");
    }
    Ok(())
}
