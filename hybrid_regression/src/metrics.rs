//! Scoring of a compiled candidate against a dataset.
//!
//! Every metric returns a finite value: non-finite scores become
//! [`NON_FINITE_SENTINEL`], so the optimizer and the ranking never see NaN.

use std::sync::Arc;

use ndarray::Array1;
use typed_expressions::CompiledFn;

use crate::dataset::Dataset;

/// Score assigned to candidates that fail to compile or evaluate.
pub const NON_FINITE_SENTINEL: f64 = 1e30;

pub trait Metric: Send + Sync {
    /// Lower is better. `params` holds one value per formal constant of `func`.
    fn score(&self, params: &[f64], func: &CompiledFn, data: &Dataset) -> f64;
}

impl<F> Metric for F
where
    F: Fn(&[f64], &CompiledFn, &Dataset) -> f64 + Send + Sync,
{
    fn score(&self, params: &[f64], func: &CompiledFn, data: &Dataset) -> f64 {
        self(params, func, data)
    }
}

pub type MetricObject = Arc<dyn Metric>;

pub fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v } else { NON_FINITE_SENTINEL }
}

/// NaN to zero, infinities to the largest finite value of the same sign.
pub fn nan_to_num(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else if v == f64::INFINITY {
        f64::MAX
    } else if v == f64::NEG_INFINITY {
        f64::MIN
    } else {
        v
    }
}

/// Predictions for every row, or `None` when the shapes disagree.
pub fn predictions(params: &[f64], func: &CompiledFn, data: &Dataset) -> Option<Array1<f64>> {
    if params.len() != func.n_constants() || data.n_features != func.variable_names().len() {
        log::debug!(
            "shape mismatch: {} constants for {}, {} columns for {}",
            params.len(),
            func.n_constants(),
            data.n_features,
            func.variable_names().len()
        );
        return None;
    }
    Some(func.predict(params, data.x.view()))
}

pub trait PointwiseLoss {
    fn point_loss(&self, yhat: f64, y: f64) -> f64;
}

/// Weighted mean of a pointwise loss over cleaned predictions. No rows,
/// or weights summing to zero, score [`NON_FINITE_SENTINEL`].
#[derive(Clone, Debug)]
pub struct MeanLoss<L>(pub L);

impl<L: PointwiseLoss> MeanLoss<L> {
    pub fn loss(&self, yhat: &[f64], y: &[f64], w: Option<&[f64]>) -> f64 {
        assert_eq!(yhat.len(), y.len());
        match w {
            None => {
                if y.is_empty() {
                    return NON_FINITE_SENTINEL;
                }
                let total: f64 = yhat
                    .iter()
                    .zip(y)
                    .map(|(&a, &b)| self.0.point_loss(nan_to_num(a), b))
                    .sum();
                total / y.len() as f64
            }
            Some(w) => {
                assert_eq!(w.len(), y.len());
                let sum_w: f64 = w.iter().sum();
                if sum_w == 0.0 {
                    return NON_FINITE_SENTINEL;
                }
                let total: f64 = yhat
                    .iter()
                    .zip(y)
                    .zip(w)
                    .map(|((&a, &b), &wi)| wi * self.0.point_loss(nan_to_num(a), b))
                    .sum();
                total / sum_w
            }
        }
    }
}

impl<L: PointwiseLoss + Send + Sync> Metric for MeanLoss<L> {
    fn score(&self, params: &[f64], func: &CompiledFn, data: &Dataset) -> f64 {
        let Some(yhat) = predictions(params, func, data) else {
            return NON_FINITE_SENTINEL;
        };
        let yhat = yhat.to_vec();
        let y = data.y.to_vec();
        sanitize(self.loss(&yhat, &y, data.weights_slice()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct SquaredLoss;

impl PointwiseLoss for SquaredLoss {
    fn point_loss(&self, yhat: f64, y: f64) -> f64 {
        let r = yhat - y;
        r * r
    }
}

#[derive(Clone, Debug, Default)]
pub struct AbsLoss;

impl PointwiseLoss for AbsLoss {
    fn point_loss(&self, yhat: f64, y: f64) -> f64 {
        (yhat - y).abs()
    }
}

#[derive(Clone, Debug)]
pub struct HuberLoss {
    pub delta: f64,
}

impl PointwiseLoss for HuberLoss {
    fn point_loss(&self, yhat: f64, y: f64) -> f64 {
        let r = yhat - y;
        if r.abs() <= self.delta {
            0.5 * r * r
        } else {
            self.delta * (r.abs() - 0.5 * self.delta)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogCoshLoss;

impl PointwiseLoss for LogCoshLoss {
    fn point_loss(&self, yhat: f64, y: f64) -> f64 {
        (yhat - y).cosh().ln()
    }
}

pub type Mse = MeanLoss<SquaredLoss>;
pub type Mae = MeanLoss<AbsLoss>;

#[derive(Clone, Debug, Default)]
pub struct Rmse;

impl Metric for Rmse {
    fn score(&self, params: &[f64], func: &CompiledFn, data: &Dataset) -> f64 {
        let mse = MeanLoss(SquaredLoss).score(params, func, data);
        if mse == NON_FINITE_SENTINEL { mse } else { sanitize(mse.sqrt()) }
    }
}

/// Sum of component metrics, each scaled by a weight fixed at construction.
#[derive(Clone)]
pub struct WeightedMetric {
    parts: Vec<(MetricObject, f64)>,
}

impl WeightedMetric {
    pub fn new(parts: Vec<(MetricObject, f64)>) -> Self {
        Self { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Metric for WeightedMetric {
    fn score(&self, params: &[f64], func: &CompiledFn, data: &Dataset) -> f64 {
        let total: f64 = self
            .parts
            .iter()
            .map(|(metric, weight)| weight * metric.score(params, func, data))
            .sum();
        sanitize(total)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MetricKind {
    Mse,
    Mae,
    Rmse,
    Huber { delta: f64 },
    LogCosh,
}

impl MetricKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mse" => Some(Self::Mse),
            "mae" => Some(Self::Mae),
            "rmse" => Some(Self::Rmse),
            "huber" => Some(Self::Huber { delta: 1.0 }),
            "logcosh" | "log-cosh" | "log_cosh" => Some(Self::LogCosh),
            _ => None,
        }
    }
}

pub fn make_metric(kind: MetricKind) -> MetricObject {
    match kind {
        MetricKind::Mse => Arc::new(MeanLoss(SquaredLoss)),
        MetricKind::Mae => Arc::new(MeanLoss(AbsLoss)),
        MetricKind::Rmse => Arc::new(Rmse),
        MetricKind::Huber { delta } => Arc::new(MeanLoss(HuberLoss { delta })),
        MetricKind::LogCosh => Arc::new(MeanLoss(LogCoshLoss)),
    }
}
