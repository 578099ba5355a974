mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::arithmetic_registry;
use fastrand::Rng;
use ndarray::Array2;
use proptest::prelude::*;
use typed_expressions::{CompileError, Node, Terminal, Tree, TypeTag, compile, compile_str, generate_full};

#[test]
fn compiling_a_tree_uses_its_rendering() {
    let reg = arithmetic_registry(2);
    let x = reg.variables()[0].clone();
    let mul = reg.primitive("mul").unwrap().clone();
    let tree = Tree::new(vec![
        Node::from(mul),
        Terminal::constant("c5").into(),
        Terminal::variable(x.clone()).into(),
    ]);
    assert_eq!(tree.to_string(), format!("mul(c5, {x})"));

    let f = compile(&tree, &reg).unwrap();
    assert_eq!(f.constant_names(), &["c5".to_string()]);
    assert_eq!(f.variable_names(), reg.variables());
    assert_relative_eq!(f.call(&[1.5, 4.0, 100.0]), 6.0);
}

#[test]
fn helpers_resolve_inside_constant_subexpressions() {
    let mut reg = arithmetic_registry(1);
    reg.register_helper("half", 1, Arc::new(|a: &[f64]| 0.5 * a[0])).unwrap();
    let x = reg.variables()[0].clone();
    let f = compile_str(&format!("mul(half(c1), {x})"), &reg).unwrap();
    assert_relative_eq!(f.call(&[4.0, 3.0]), 6.0);
}

#[test]
fn unknown_identifiers_are_compile_errors() {
    let reg = arithmetic_registry(1);
    let err = compile_str("add(c1, y)", &reg).unwrap_err();
    assert_eq!(err, CompileError::UnknownName("y".into()));
    assert_eq!(err.to_string(), "unknown name \"y\"");
}

#[test]
fn predict_matches_pointwise_calls() {
    let reg = arithmetic_registry(2);
    let (a, b) = (reg.variables()[0].clone(), reg.variables()[1].clone());
    let f = compile_str(&format!("add(mul(c1, sin({a})), div({b}, c2))"), &reg).unwrap();
    let x = Array2::from_shape_fn((25, 2), |(i, j)| (i as f64 + 1.0) * 0.1 + j as f64);
    let consts = [0.7, 2.0];
    let y = f.predict(&consts, x.view());
    for (row, yi) in x.rows().into_iter().zip(y.iter()) {
        let expected = 0.7 * row[0].sin() + row[1] / 2.0;
        assert_relative_eq!(*yi, expected, epsilon = 1e-12);
    }
}

#[test]
fn non_finite_results_are_returned_not_raised() {
    let reg = arithmetic_registry(1);
    let x = reg.variables()[0].clone();
    let f = compile_str(&format!("div(c1, {x})"), &reg).unwrap();
    assert!(f.call(&[1.0, 0.0]).is_infinite());
    assert!(f.call(&[0.0, 0.0]).is_nan());
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]

    #[test]
    fn compile_is_deterministic(seed in any::<u64>(), h in 0usize..5) {
        let mut reg = arithmetic_registry(3);
        reg.add_ephemeral_constant();
        let mut rng = Rng::with_seed(seed);
        let tree = Tree::new(generate_full(&mut rng, &reg, h, h, Some(TypeTag::Variable)).unwrap());

        let a = compile(&tree, &reg).unwrap();
        let b = compile(&tree, &reg).unwrap();
        prop_assert_eq!(a.params(), b.params());

        let names = tree.constant_names();
        prop_assert_eq!(a.constant_names().iter().map(String::as_str).collect::<Vec<_>>(), names);

        let args: Vec<f64> = (0..a.params().len()).map(|i| 0.25 * i as f64 + 0.5).collect();
        let (ya, yb) = (a.call(&args), b.call(&args));
        prop_assert!(ya == yb || (ya.is_nan() && yb.is_nan()));
    }
}
