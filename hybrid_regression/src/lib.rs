pub mod dataset;
pub mod evaluators;
pub mod metrics;
pub mod optim;
pub(crate) mod options;
pub mod prelude;
pub(crate) mod progress_bars;
pub(crate) mod random;
pub mod search;

#[cfg(feature = "cli")]
pub mod cli;

pub use dataset::{Dataset, DatasetError};
pub use evaluators::{Compiled, DirectEvaluator, Evaluator, Fitness, Fitted, HoldoutEvaluator, Scored};
pub use metrics::{
    MeanLoss, Metric, MetricKind, MetricObject, Mae, Mse, NON_FINITE_SENTINEL, Rmse, WeightedMetric, make_metric,
    nan_to_num,
};
pub use optim::{Bfgs, Optimized, Optimizer};
pub use options::Options;
pub use search::{Candidate, SearchError, SearchResult, generate_candidates, rank, score_candidates, search};

pub use typed_expressions;

#[cfg(test)]
mod tests;
