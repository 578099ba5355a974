// CLI operator list / registry construction.

use anyhow::{Context, bail};
use typed_expressions::builtin::{self, BUILTINS};
use typed_expressions::{Registry, TypeTag};

use crate::cli::args::{Cli, RootArg};

const DEFAULT_OPERATORS: [&str; 4] = ["add", "sub", "mul", "div"];

fn canonical_name(raw: &str) -> &str {
    match raw {
        "+" => "add",
        "-" => "sub",
        "*" => "mul",
        "/" => "div",
        "^" | "**" => "pow",
        other => other,
    }
}

/// Weighted registry rooted at the requested type, every operator typed
/// `Variable^arity -> Variable`, plus one minted variable per feature.
/// Returns the registry and the minted names in column order.
pub fn build_registry(cli: &Cli, n_features: usize) -> anyhow::Result<(Registry, Vec<String>)> {
    let names: Vec<&str> = match &cli.operators {
        None => DEFAULT_OPERATORS.to_vec(),
        Some(v) => v.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect(),
    };
    if names.is_empty() {
        bail!("no operators enabled (use --operators)");
    }

    let mut reg = Registry::weighted("hybrid-sr").with_ret(root_type(cli.root));
    for raw in names {
        let name = canonical_name(raw);
        let b = builtin::lookup(name).with_context(|| format!("unknown operator {raw:?} (see --list-operators)"))?;
        reg.register_builtin(b.name, vec![TypeTag::Variable; b.arity], TypeTag::Variable)
            .with_context(|| format!("failed to register operator {raw:?}"))?;
    }
    if cli.root == RootArg::Any {
        reg.add_ephemeral_constant();
    }

    let variables = (0..n_features).map(|_| reg.new_variable()).collect();
    Ok((reg, variables))
}

pub fn root_type(root: RootArg) -> TypeTag {
    match root {
        RootArg::Any => TypeTag::Any,
        RootArg::Variable => TypeTag::Variable,
        RootArg::WeightedSum => TypeTag::WeightedSum,
    }
}

pub fn print_operator_list() {
    for arity in 1..=2 {
        println!("arity {arity}:");
        let mut names: Vec<&str> = BUILTINS.iter().filter(|b| b.arity == arity).map(|b| b.name).collect();
        names.sort_unstable();
        for name in names {
            println!("  {name}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn aliases_resolve_to_builtins() {
        let cli = Cli::try_parse_from(["hybrid-sr", "d.csv", "--y", "t", "--operators", "+,*,cos"]).unwrap();
        let (reg, vars) = build_registry(&cli, 2).unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(reg.variables(), &vars[..]);
        assert!(reg.primitive("add").is_some());
        assert!(reg.primitive("mul").is_some());
        assert_eq!(reg.primitive("cos").unwrap().arity(), 1);
        assert!(reg.primitive("sub").is_none());
        assert_eq!(reg.ret(), TypeTag::Variable);
    }

    #[test]
    fn unknown_operators_fail_with_context() {
        let cli = Cli::try_parse_from(["hybrid-sr", "d.csv", "--y", "t", "--operators", "frobnicate"]).unwrap();
        let err = build_registry(&cli, 1).unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
    }
}
