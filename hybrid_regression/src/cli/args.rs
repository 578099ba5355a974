// CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::options::cli_args::OptionsArgs;

#[rustfmt::skip]
#[derive(Parser, Debug, Clone)]
#[command(name = "hybrid-sr")]
#[command(about = "Typed symbolic regression with fitted constants")]
pub struct Cli {
    /// Input dataset path (.csv).
    #[arg(required_unless_present = "list_operators")]
    pub data: Option<PathBuf>,

    /// Treat input as having no header row.
    #[arg(long)]
    pub no_header: bool,

    /// Interpret integer column indices as 1-based (default: 0-based).
    #[arg(long)]
    pub one_indexed: bool,

    /// Input feature columns (comma-separated). Defaults to all columns except y/weights.
    #[arg(long, value_delimiter = ',')]
    pub x: Option<Vec<String>>,

    /// Target column.
    #[arg(long, required_unless_present = "list_operators")]
    pub y: Option<String>,

    /// Optional weights column (single column selector).
    #[arg(long)]
    pub weights: Option<String>,

    /// Operators to enable (comma-separated). Defaults to add,sub,mul,div.
    /// `+ - * /` are accepted as aliases.
    #[arg(long, value_delimiter = ',')]
    pub operators: Option<Vec<String>>,

    /// Root type of generated candidates.
    #[arg(long, value_enum, default_value_t = RootArg::Variable)]
    pub root: RootArg,

    /// List available builtin operators and exit.
    #[arg(long)]
    pub list_operators: bool,

    /// Output path for results (optional).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to inferring from --output extension).
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(flatten)]
    pub options: OptionsArgs,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum RootArg {
    Any,
    Variable,
    WeightedSum,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_operators_and_forwarded_options() {
        let cli = Cli::try_parse_from([
            "hybrid-sr",
            "data.csv",
            "--y",
            "target",
            "--operators",
            "+,*,sin",
            "--root",
            "weighted-sum",
            "--n-candidates",
            "8",
            "--metric",
            "rmse",
        ])
        .unwrap();
        assert_eq!(cli.operators.as_deref(), Some(&["+".to_string(), "*".into(), "sin".into()][..]));
        assert_eq!(cli.root, RootArg::WeightedSum);
        assert_eq!(cli.options.n_candidates, Some(8));
        assert_eq!(cli.options.metric, Some(crate::MetricKind::Rmse));
    }

    #[test]
    fn target_is_required_unless_listing() {
        assert!(Cli::try_parse_from(["hybrid-sr", "data.csv"]).is_err());
        assert!(Cli::try_parse_from(["hybrid-sr", "--list-operators"]).is_ok());
    }

    #[test]
    fn unknown_metrics_are_rejected() {
        assert!(Cli::try_parse_from(["hybrid-sr", "d.csv", "--y", "t", "--metric", "bogus"]).is_err());
    }
}
