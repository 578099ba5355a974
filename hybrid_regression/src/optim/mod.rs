//! Continuous optimizers for the constants of a compiled candidate.
//!
//! Evaluators only see the [`Optimizer`] contract: a scalar objective over a
//! parameter slice plus an initial guess in, [`Optimized`] out. [`Bfgs`] is
//! the built-in implementation.

mod bfgs;
mod finite_diff;
mod line_search;
mod linalg;
mod options;

use fastrand::Rng;

use crate::random::standard_normal;
use bfgs::{bfgs_minimize, newton_1d_minimize};
use finite_diff::FiniteDiff;
use options::{BackTracking, OptimOptions};
pub use options::Optimized;

/// Minimizes `objective` starting from `initial_guess`.
///
/// Implementations must return a parameter vector of the same length as the
/// guess. Extra inputs the objective needs are captured by the closure.
pub trait Optimizer: Send + Sync {
    fn optimize(&self, objective: &dyn Fn(&[f64]) -> f64, initial_guess: &[f64]) -> Optimized;
}

impl<F> Optimizer for F
where
    F: Fn(&dyn Fn(&[f64]) -> f64, &[f64]) -> Optimized + Send + Sync,
{
    fn optimize(&self, objective: &dyn Fn(&[f64]) -> f64, initial_guess: &[f64]) -> Optimized {
        self(objective, initial_guess)
    }
}

/// Quasi-Newton optimizer with finite-difference gradients.
///
/// One parameter uses a damped Newton iteration; more use BFGS. Restarts
/// jitter the starting point and keep the best result. The starting point
/// itself is kept when nothing improves on it.
#[derive(Clone, Debug)]
pub struct Bfgs {
    pub iterations: usize,
    /// Objective evaluations per local run; `0` means unlimited.
    pub f_calls_limit: usize,
    pub nrestarts: usize,
    pub seed: Option<u64>,
}

impl Default for Bfgs {
    fn default() -> Self {
        Self {
            iterations: 100,
            f_calls_limit: 0,
            nrestarts: 2,
            seed: None,
        }
    }
}

impl Bfgs {
    fn local(&self, objective: &dyn Fn(&[f64]) -> f64, start: &[f64]) -> Option<Optimized> {
        let opts = OptimOptions {
            iterations: self.iterations,
            f_calls_limit: self.f_calls_limit,
            ..OptimOptions::default()
        };
        let ls = BackTracking::default();
        let mut obj = FiniteDiff::new(objective);
        if start.len() == 1 {
            newton_1d_minimize(start[0], &mut obj, opts, ls)
        } else {
            bfgs_minimize(start, &mut obj, opts, ls)
        }
    }
}

impl Optimizer for Bfgs {
    fn optimize(&self, objective: &dyn Fn(&[f64]) -> f64, initial_guess: &[f64]) -> Optimized {
        let baseline = objective(initial_guess);
        let mut best = Optimized {
            params: initial_guess.to_vec(),
            value: if baseline.is_nan() { f64::INFINITY } else { baseline },
            f_calls: 1,
        };
        if initial_guess.is_empty() {
            best.value = baseline;
            return best;
        }

        let mut rng = self.seed.map_or_else(Rng::new, Rng::with_seed);
        let mut f_calls = best.f_calls;
        for restart in 0..=self.nrestarts {
            let start: Vec<f64> = if restart == 0 {
                initial_guess.to_vec()
            } else {
                initial_guess
                    .iter()
                    .map(|&v| v * (1.0 + 0.5 * standard_normal(&mut rng)) + 0.1 * standard_normal(&mut rng))
                    .collect()
            };
            let Some(run) = self.local(objective, &start) else {
                continue;
            };
            f_calls += run.f_calls;
            if run.value < best.value {
                log::trace!("restart {restart} improved objective to {}", run.value);
                best = run;
            }
        }

        if !best.value.is_finite() {
            best.value = baseline;
        }
        best.f_calls = f_calls;
        best
    }
}

#[cfg(test)]
mod tests;
