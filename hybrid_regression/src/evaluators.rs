//! Bi-level fitness: fit the constants of one tree, then score it.
//!
//! A fitness call moves through [`Compiled`] → [`Fitted`] → [`Scored`]; each
//! step consumes the previous state, so a tree's parameter map can only be
//! replaced by a finished evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;

use typed_expressions::{CompileError, CompiledFn, Registry, Tree, compile, is_valid_preorder};

use crate::dataset::{Dataset, DatasetError};
use crate::metrics::{Metric, MetricObject, NON_FINITE_SENTINEL, sanitize};
use crate::optim::Optimizer;

/// Single-objective fitness, lower is better.
pub type Fitness = (f64,);

/// A tree compiled against a registry, with its warm-start guess.
#[derive(Clone, Debug)]
pub struct Compiled {
    func: CompiledFn,
    guess: Vec<f64>,
}

impl Compiled {
    /// Compiles `tree` and reads the previous fit of every formal constant,
    /// `0.0` for names the tree has not been fitted with.
    pub fn new(tree: &Tree, registry: &Registry) -> Result<Self, CompileError> {
        if !is_valid_preorder(&tree.nodes) {
            return Err(CompileError::InvalidPreorder);
        }
        let func = compile(tree, registry)?;
        let guess = func
            .constant_names()
            .iter()
            .map(|name| tree.parameters.get(name).copied().unwrap_or(0.0))
            .collect();
        Ok(Self { func, guess })
    }

    pub fn func(&self) -> &CompiledFn {
        &self.func
    }

    pub fn initial_guess(&self) -> &[f64] {
        &self.guess
    }

    /// Minimizes `metric` on `data` over the constants.
    pub fn fit(self, optimizer: &dyn Optimizer, metric: &dyn Metric, data: &Dataset) -> Fitted {
        let func = &self.func;
        let objective = |params: &[f64]| metric.score(params, func, data);
        let out = optimizer.optimize(&objective, &self.guess);
        if out.params.len() != self.guess.len() {
            log::warn!(
                "optimizer returned {} parameters for {} constants",
                out.params.len(),
                self.guess.len()
            );
            return Fitted {
                value: NON_FINITE_SENTINEL,
                params: self.guess,
                func: self.func,
            };
        }
        Fitted {
            value: sanitize(out.value),
            params: out.params,
            func: self.func,
        }
    }
}

/// Constants fitted; the objective value at the fit is kept.
#[derive(Clone, Debug)]
pub struct Fitted {
    func: CompiledFn,
    params: Vec<f64>,
    value: f64,
}

impl Fitted {
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Re-evaluates `metric` at the fitted constants, without optimizing.
    pub fn rescore(&self, metric: &dyn Metric, data: &Dataset) -> f64 {
        sanitize(metric.score(&self.params, &self.func, data))
    }

    pub fn score(self, fitness: f64) -> Scored {
        let parameters = self
            .func
            .constant_names()
            .iter()
            .cloned()
            .zip(self.params)
            .collect();
        Scored {
            parameters,
            fitness: sanitize(fitness),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scored {
    parameters: BTreeMap<String, f64>,
    fitness: f64,
}

impl Scored {
    /// Replaces the tree's parameter map and yields the fitness tuple.
    pub fn apply(self, tree: &mut Tree) -> Fitness {
        tree.set_parameters(self.parameters);
        (self.fitness,)
    }
}

pub trait Evaluator: Send + Sync {
    /// Fits and scores `tree`, replacing its parameter map. Candidates that
    /// fail to compile score [`NON_FINITE_SENTINEL`] and keep their map.
    fn evaluate(&self, tree: &mut Tree) -> Fitness;
}

fn compile_or_warn(tree: &Tree, registry: &Registry) -> Option<Compiled> {
    match Compiled::new(tree, registry) {
        Ok(c) => Some(c),
        Err(err) => {
            log::warn!("scoring {tree} as unfit: {err}");
            None
        }
    }
}

/// Fits and reports on the same data; fitness is the optimizer's value.
#[derive(Clone)]
pub struct DirectEvaluator {
    pub registry: Arc<Registry>,
    pub data: Arc<Dataset>,
    pub metric: MetricObject,
    pub optimizer: Arc<dyn Optimizer>,
}

impl Evaluator for DirectEvaluator {
    fn evaluate(&self, tree: &mut Tree) -> Fitness {
        let Some(compiled) = compile_or_warn(tree, &self.registry) else {
            return (NON_FINITE_SENTINEL,);
        };
        let fitted = compiled.fit(self.optimizer.as_ref(), self.metric.as_ref(), &self.data);
        let value = fitted.value();
        log::debug!("{tree}: fitted {:?} -> {value}", fitted.params());
        fitted.score(value).apply(tree)
    }
}

/// Fits on a training split and reports the held-out score:
/// `held_out + train_weight * train + penalty * n_constants`.
#[derive(Clone)]
pub struct HoldoutEvaluator {
    pub registry: Arc<Registry>,
    pub train: Arc<Dataset>,
    pub test: Arc<Dataset>,
    pub metric: MetricObject,
    pub optimizer: Arc<dyn Optimizer>,
    pub train_weight: f64,
    pub complexity_penalty: Option<f64>,
}

impl HoldoutEvaluator {
    pub fn new(
        registry: Arc<Registry>,
        train: Dataset,
        test: Dataset,
        metric: MetricObject,
        optimizer: Arc<dyn Optimizer>,
    ) -> Self {
        Self {
            registry,
            train: Arc::new(train),
            test: Arc::new(test),
            metric,
            optimizer,
            train_weight: 0.0,
            complexity_penalty: None,
        }
    }

    /// Splits `data` into alternating blocks (see [`Dataset::train_test_split`]).
    pub fn from_blocks(
        registry: Arc<Registry>,
        data: &Dataset,
        n_split: usize,
        metric: MetricObject,
        optimizer: Arc<dyn Optimizer>,
    ) -> Result<Self, DatasetError> {
        let (train, test) = data.train_test_split(n_split)?;
        Ok(Self::new(registry, train, test, metric, optimizer))
    }

    pub fn with_train_weight(mut self, k: f64) -> Self {
        self.train_weight = k;
        self
    }

    pub fn with_complexity_penalty(mut self, penalty: f64) -> Self {
        self.complexity_penalty = Some(penalty);
        self
    }
}

impl Evaluator for HoldoutEvaluator {
    fn evaluate(&self, tree: &mut Tree) -> Fitness {
        let Some(compiled) = compile_or_warn(tree, &self.registry) else {
            return (NON_FINITE_SENTINEL,);
        };
        let n_constants = compiled.func().n_constants();
        let fitted = compiled.fit(self.optimizer.as_ref(), self.metric.as_ref(), &self.train);
        let train = fitted.value();
        let held_out = fitted.rescore(self.metric.as_ref(), &self.test);

        let mut fitness = held_out;
        if self.train_weight != 0.0 {
            fitness += self.train_weight * train;
        }
        if let Some(penalty) = self.complexity_penalty {
            fitness += penalty * n_constants as f64;
        }
        log::debug!("{tree}: train {train}, held-out {held_out} -> {fitness}");
        fitted.score(fitness).apply(tree)
    }
}
