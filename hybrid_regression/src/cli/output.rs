// CLI output formatting.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use typed_expressions::Registry;

use crate::cli::args::OutputFormat;
use crate::search::Candidate;

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub rank: usize,
    pub fitness: f64,
    pub tree: String,
    pub formula: String,
    pub latex: String,
    pub parameters: BTreeMap<String, f64>,
}

/// The best `topn` candidates with their expanded, substituted formulas.
pub fn result_rows(ranked: &[Candidate], registry: &Registry, decimals: u32, topn: usize) -> Vec<ResultRow> {
    ranked
        .iter()
        .take(topn)
        .enumerate()
        .map(|(i, c)| {
            let (formula, latex) = match c.tree.symbolic(registry, true, decimals) {
                Ok(e) => (e.to_string(), e.to_latex()),
                Err(err) => {
                    log::warn!("cannot expand {}: {err}", c.tree);
                    (c.tree.to_string(), String::new())
                }
            };
            ResultRow {
                rank: i + 1,
                fitness: c.fitness,
                tree: c.tree.to_string(),
                formula,
                latex,
                parameters: c.tree.parameters.clone(),
            }
        })
        .collect()
}

pub fn print_ranked(target: &str, legend: &[(String, String)], rows: &[ResultRow]) {
    println!("target: {target}");
    let legend: Vec<String> = legend.iter().map(|(var, col)| format!("{var}={col}")).collect();
    println!("variables: {}", legend.join(", "));
    println!("{:<6} {:<14} formula", "rank", "fitness");
    for r in rows {
        println!("{:<6} {:<14.6e} {}", r.rank, r.fitness, r.formula);
    }
    println!();
}

pub fn write_results(path: &Path, format: Option<OutputFormat>, target: &str, rows: &[ResultRow]) -> anyhow::Result<()> {
    let fmt = match format {
        Some(f) => f,
        None => infer_format(path),
    };

    match fmt {
        OutputFormat::Table => bail!("table output is only supported on stdout"),
        OutputFormat::Csv => write_csv(path, target, rows),
        OutputFormat::Json => write_json(path, target, rows),
    }
}

fn infer_format(path: &Path) -> OutputFormat {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Csv,
    }
}

fn write_csv(path: &Path, target: &str, rows: &[ResultRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
    wtr.write_record(["target", "rank", "fitness", "tree", "formula", "latex", "parameters"])?;
    for r in rows {
        let params = serde_json::to_string(&r.parameters)?;
        let rank = r.rank.to_string();
        let fitness = r.fitness.to_string();
        wtr.write_record([
            target,
            rank.as_str(),
            fitness.as_str(),
            r.tree.as_str(),
            r.formula.as_str(),
            r.latex.as_str(),
            params.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    target: &'a str,
    candidates: &'a [ResultRow],
}

fn write_json(path: &Path, target: &str, rows: &[ResultRow]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport {
        target,
        candidates: rows,
    })?;
    let mut f = std::fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use typed_expressions::{Node, Terminal, Tree, TypeTag};

    use super::*;

    fn ranked() -> (Registry, Vec<Candidate>) {
        let mut reg = Registry::new("out", TypeTag::Variable);
        let add = reg
            .register_builtin("add", vec![TypeTag::Constant, TypeTag::Variable], TypeTag::Variable)
            .unwrap();
        let x = reg.new_variable();
        let mut tree = Tree::new(vec![Node::from(add), Terminal::constant("c1").into(), Terminal::variable(x).into()]);
        tree.set_parameters(BTreeMap::from([("c1".to_string(), 0.12345)]));
        let cands = vec![
            Candidate { tree: tree.clone(), fitness: 0.5 },
            Candidate { tree, fitness: 0.75 },
        ];
        (reg, cands)
    }

    #[test]
    fn rows_carry_substituted_formulas() {
        let (reg, cands) = ranked();
        let x = reg.variables()[0].clone();
        let rows = result_rows(&cands, &reg, 2, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].formula, format!("{x} + 0.12"));
        assert_eq!(rows[0].tree, format!("add(c1, {x})"));
        assert_eq!(rows[0].parameters.get("c1"), Some(&0.12345));
    }

    #[test]
    fn json_report_round_trips_through_serde_json() {
        let (reg, cands) = ranked();
        let rows = result_rows(&cands, &reg, 3, 10);
        let path = std::env::temp_dir().join(format!("hybrid-sr-out-{}.json", std::process::id()));
        write_results(&path, None, "y", &rows).unwrap();
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["target"], "y");
        assert_eq!(v["candidates"].as_array().unwrap().len(), 2);
        assert_eq!(v["candidates"][1]["rank"], 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn table_format_is_stdout_only() {
        let path = std::env::temp_dir().join("never-written.txt");
        assert!(write_results(&path, Some(OutputFormat::Table), "y", &[]).is_err());
    }
}
