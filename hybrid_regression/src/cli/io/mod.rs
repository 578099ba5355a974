mod columns;
mod csv;
mod table;

use anyhow::{Context, bail};
use ndarray::{Array1, Array2};
pub use table::Table;

use crate::cli::args::Cli;

pub fn load_table(cli: &Cli) -> anyhow::Result<Table> {
    let path = cli
        .data
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("missing input dataset path"))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => csv::load_csv(path, !cli.no_header),
        _ => bail!("unsupported input extension {ext:?} (expected .csv)"),
    }
}

/// Target name plus the dataset with features in selection order.
pub fn build_dataset(table: &Table, cli: &Cli) -> anyhow::Result<(String, crate::Dataset)> {
    let parse_opts = columns::ColumnSelectorParseOpts {
        one_indexed: cli.one_indexed,
    };

    let y_raw = cli.y.as_deref().context("missing --y")?;
    let y_sel = columns::ColumnSelector::parse(y_raw, parse_opts).context("failed to parse --y")?;
    let y_index = table.column_index(&y_sel).context("failed to resolve --y")?;

    let weights_index = match &cli.weights {
        None => None,
        Some(w) => {
            let sel = columns::ColumnSelector::parse(w, parse_opts).context("failed to parse --weights")?;
            Some(table.column_index(&sel).context("failed to resolve --weights")?)
        }
    };

    let x_indices: Vec<usize> = match &cli.x {
        Some(xs) => {
            let selectors = xs
                .iter()
                .map(|s| columns::ColumnSelector::parse(s, parse_opts))
                .collect::<anyhow::Result<Vec<_>>>()
                .context("failed to parse --x selectors")?;
            selectors
                .iter()
                .map(|sel| table.column_index(sel))
                .collect::<anyhow::Result<Vec<_>>>()
                .context("failed to resolve --x selectors")?
        }
        None => (0..table.n_cols)
            .filter(|&i| i != y_index && weights_index != Some(i))
            .collect(),
    };

    if x_indices.is_empty() {
        bail!("no feature columns selected for X (use --x to specify explicitly)");
    }
    for &xi in &x_indices {
        if xi == y_index {
            bail!("X and y overlap at column index {xi}");
        }
        if weights_index == Some(xi) {
            bail!("X and weights overlap at column index {xi}");
        }
    }

    let mut x = Array2::<f64>::zeros((table.n_rows, x_indices.len()));
    for (j, &col_idx) in x_indices.iter().enumerate() {
        let col = table.column_by_index(col_idx)?;
        x.column_mut(j).assign(&Array1::from_iter(col.iter().copied()));
    }

    let weights = match weights_index {
        None => None,
        Some(wi) => Some(Array1::from_iter(table.column_by_index(wi)?.iter().copied())),
    };
    let y = Array1::from_iter(table.column_by_index(y_index)?.iter().copied());
    let variable_names: Vec<String> = x_indices.iter().map(|&i| table.headers[i].clone()).collect();

    let ds = crate::Dataset::with_weights_and_names(x, y, weights, variable_names)?;
    Ok((table.headers[y_index].clone(), ds))
}
