use typed_expressions::{Registry, TypeTag};

/// Weighted registry with `add`, `mul`, `sub`, `div`, `sin` over
/// variables and `n_vars` freshly minted variables.
#[allow(dead_code)]
pub fn arithmetic_registry(n_vars: usize) -> Registry {
    let mut reg = Registry::weighted("arith");
    let sig = vec![TypeTag::Variable, TypeTag::Variable];
    for name in ["add", "mul", "sub", "div"] {
        reg.register_builtin(name, sig.clone(), TypeTag::Variable).unwrap();
    }
    reg.register_builtin("sin", vec![TypeTag::Variable], TypeTag::Variable)
        .unwrap();
    for _ in 0..n_vars {
        reg.new_variable();
    }
    reg
}

/// Max node depth, root at 0.
#[allow(dead_code)]
pub fn max_node_depth(nodes: &[typed_expressions::Node]) -> usize {
    typed_expressions::node_depths(nodes).into_iter().max().unwrap_or(0)
}
