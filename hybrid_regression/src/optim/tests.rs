use approx::assert_relative_eq;

use super::bfgs::{bfgs_minimize, newton_1d_minimize};
use super::finite_diff::FiniteDiff;
use super::line_search::LineSearchInput;
use super::options::{BackTracking, EvalBudget, Objective, OptimOptions, Optimized};
use super::{Bfgs, Optimizer};

struct Quad2D;

impl Objective for Quad2D {
    fn f_only(&mut self, x: &[f64], budget: &mut EvalBudget) -> Option<f64> {
        budget.f_calls += 1;
        let t0 = x[0] - 1.0;
        let t1 = x[1] + 2.0;
        Some(t0 * t0 + 10.0 * t1 * t1)
    }

    fn fg(&mut self, x: &[f64], g_out: &mut [f64], budget: &mut EvalBudget) -> Option<f64> {
        let f = self.f_only(x, budget)?;
        g_out[0] = 2.0 * (x[0] - 1.0);
        g_out[1] = 20.0 * (x[1] + 2.0);
        Some(f)
    }
}

fn tight() -> OptimOptions {
    OptimOptions {
        iterations: 50,
        f_calls_limit: 0,
        g_abstol: 1e-10,
    }
}

#[test]
fn backtracking_satisfies_armijo_for_quadratic() {
    let ls = BackTracking::default();
    let mut x_new = [0.0];
    let mut phi_at = |xv: &[f64]| {
        let t = xv[0] - 3.0;
        Some(t * t)
    };
    let input = LineSearchInput {
        x: &[0.0],
        s: &[6.0],
        alpha0: 1.0,
        phi0: 9.0,
        dphi0: -36.0,
    };
    let (alpha, phi) = ls.search(input, &mut x_new, &mut phi_at).expect("line search failed");
    assert!(alpha > 0.0 && alpha < 1.0);
    assert!(phi <= 9.0 + ls.c1 * alpha * -36.0);
    assert_relative_eq!(x_new[0], 6.0 * alpha);
}

#[test]
fn backtracking_halves_past_non_finite_points() {
    let ls = BackTracking::default();
    let mut x_new = [0.0];
    let mut phi_at = |xv: &[f64]| if xv[0] > 1.0 { None } else { Some((xv[0] - 0.5).powi(2)) };
    let input = LineSearchInput {
        x: &[0.0],
        s: &[4.0],
        alpha0: 1.0,
        phi0: 0.25,
        dphi0: -4.0,
    };
    let (alpha, _) = ls.search(input, &mut x_new, &mut phi_at).unwrap();
    assert!(4.0 * alpha <= 1.0);
}

#[test]
fn bfgs_minimizes_simple_quadratic() {
    let res = bfgs_minimize(&[0.0, 0.0], &mut Quad2D, tight(), BackTracking::default()).unwrap();
    assert_relative_eq!(res.params[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(res.params[1], -2.0, epsilon = 1e-6);
    assert!(res.f_calls > 0);
}

#[test]
fn bfgs_respects_the_call_budget() {
    let opts = OptimOptions {
        f_calls_limit: 3,
        ..tight()
    };
    let res = bfgs_minimize(&[0.0, 0.0], &mut Quad2D, opts, BackTracking::default()).unwrap();
    assert!(res.f_calls <= 4, "used {}", res.f_calls);
}

#[test]
fn newton_1d_minimizes_with_differenced_gradients() {
    let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 1.0;
    let mut obj = FiniteDiff::new(&f);
    let res = newton_1d_minimize(0.0, &mut obj, tight(), BackTracking::default()).unwrap();
    assert_relative_eq!(res.params[0], 3.0, epsilon = 1e-5);
    assert_relative_eq!(res.value, 1.0, epsilon = 1e-9);
}

#[test]
fn finite_differences_reject_non_finite_neighbourhoods() {
    let f = |x: &[f64]| if x[0] > 0.0 { f64::NAN } else { x[0] * x[0] };
    let mut obj = FiniteDiff::new(&f);
    let mut g = [0.0];
    let mut budget = EvalBudget::default();
    assert_eq!(obj.fg(&[0.0], &mut g, &mut budget), None);
    assert_eq!(obj.fg(&[-1.0], &mut g, &mut budget), Some(1.0));
    assert_relative_eq!(g[0], -2.0, epsilon = 1e-6);
}

#[test]
fn bfgs_optimizer_recovers_linear_coefficients() {
    let xs: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
    let sse = |p: &[f64]| xs.iter().map(|&x| (p[0] * x + p[1] - (1.5 * x - 0.75)).powi(2)).sum::<f64>();
    let opt = Bfgs {
        seed: Some(7),
        ..Bfgs::default()
    };
    let out = opt.optimize(&sse, &[0.0, 0.0]);
    assert_relative_eq!(out.params[0], 1.5, epsilon = 1e-5);
    assert_relative_eq!(out.params[1], -0.75, epsilon = 1e-5);
    assert!(out.value < 1e-8);
}

#[test]
fn empty_guesses_only_evaluate_once() {
    let out = Bfgs::default().optimize(&|_: &[f64]| 4.0, &[]);
    assert_eq!(out, Optimized { params: vec![], value: 4.0, f_calls: 1 });
}

#[test]
fn a_hostile_objective_keeps_the_starting_point() {
    let out = Bfgs::default().optimize(&|_: &[f64]| f64::NAN, &[1.0, 2.0]);
    assert_eq!(out.params, vec![1.0, 2.0]);
    assert!(out.value.is_nan());
}

#[test]
fn closures_satisfy_the_optimizer_contract() {
    let fixed = |objective: &dyn Fn(&[f64]) -> f64, guess: &[f64]| {
        let params = vec![2.0; guess.len()];
        let value = objective(&params);
        Optimized::new(params, value)
    };
    let out = fixed.optimize(&|p: &[f64]| p.iter().sum(), &[0.0, 0.0, 0.0]);
    assert_eq!(out.params, vec![2.0; 3]);
    assert_relative_eq!(out.value, 6.0);
}
