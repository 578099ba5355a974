//! Convenience re-exports for quickstarts.

pub use crate::dataset::Dataset;
pub use crate::evaluators::{DirectEvaluator, Evaluator, Fitness, HoldoutEvaluator};
pub use crate::metrics::{Metric, MetricKind, WeightedMetric, make_metric};
pub use crate::optim::{Bfgs, Optimized, Optimizer};
pub use crate::options::Options;
pub use crate::search::{SearchResult, search};

// Callers building registries and trees don't need a direct dependency.
pub use typed_expressions::{Node, Registry, Terminal, Tree, TypeTag, compile, generate_full, generate_grow};
