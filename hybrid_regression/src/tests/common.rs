use ndarray::{Array1, Array2};
use typed_expressions::{Registry, TypeTag};

use crate::Dataset;

/// `wsum(wmul(c, x), c)` is the only tree a height-0 draw can produce.
pub fn affine_registry() -> Registry {
    let mut reg = Registry::weighted("affine").with_ret(TypeTag::WeightedSum);
    reg.new_variable();
    reg
}

/// Weighted registry with `add`, `mul` and `sin` over `n_vars` variables.
pub fn arithmetic_registry(n_vars: usize) -> Registry {
    let mut reg = Registry::weighted("arith");
    for name in ["add", "mul"] {
        reg.register_builtin(name, vec![TypeTag::Variable; 2], TypeTag::Variable)
            .unwrap();
    }
    reg.register_builtin("sin", vec![TypeTag::Variable], TypeTag::Variable)
        .unwrap();
    for _ in 0..n_vars {
        reg.new_variable();
    }
    reg
}

/// `y = f(x)` sampled on an even grid over `[-2, 2]`.
pub fn grid_dataset(n_rows: usize, f: impl Fn(f64) -> f64) -> Dataset {
    let xs: Vec<f64> = (0..n_rows)
        .map(|i| -2.0 + 4.0 * i as f64 / (n_rows - 1) as f64)
        .collect();
    let y: Vec<f64> = xs.iter().map(|&v| f(v)).collect();
    Dataset::new(Array2::from_shape_vec((n_rows, 1), xs).unwrap(), Array1::from_vec(y)).unwrap()
}
