//! One round of the outer search: generate a batch of candidates, score
//! them in parallel, rank them.

use std::sync::Arc;

use fastrand::Rng;
use rayon::prelude::*;
use thiserror::Error;
use typed_expressions::{ContinuationPolicy, Full, GenerationError, Grow, Registry, Tree, generate};

use crate::dataset::{Dataset, DatasetError};
use crate::evaluators::{Evaluator, Fitness, HoldoutEvaluator};
use crate::metrics::make_metric;
use crate::options::Options;
use crate::progress_bars::ScoringProgress;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("no candidate could be generated: {0}")]
    Generation(GenerationError),
}

#[derive(Clone, Debug)]
pub struct Candidate {
    pub tree: Tree,
    pub fitness: f64,
}

pub struct SearchResult {
    /// Best first.
    pub ranked: Vec<Candidate>,
    /// Candidates requested but never produced.
    pub n_failed: usize,
}

impl SearchResult {
    pub fn best(&self) -> Option<&Candidate> {
        self.ranked.first()
    }
}

fn generate_one<P: ContinuationPolicy + ?Sized>(
    rng: &mut Rng,
    registry: &Registry,
    options: &Options,
    policy: &P,
) -> Result<Tree, GenerationError> {
    let mut last = None;
    for attempt in 0..=options.generation_retries {
        match generate(rng, registry, options.min_height, options.max_height, policy, None) {
            Ok(nodes) => return Ok(Tree::new(nodes)),
            Err(err @ GenerationError::InvalidHeights { .. }) => return Err(err),
            Err(err) => {
                log::debug!("generation attempt {attempt} failed: {err}");
                last = Some(err);
            }
        }
    }
    Err(last.unwrap_or(GenerationError::InvalidHeights {
        min: options.min_height,
        max: options.max_height,
    }))
}

/// Draws `options.n_candidates` trees, retrying failed draws up to
/// `options.generation_retries` times each. Candidates that never succeed
/// are skipped; the error is returned only when nothing was produced.
pub fn generate_candidates(
    rng: &mut Rng,
    registry: &Registry,
    options: &Options,
) -> Result<(Vec<Tree>, usize), GenerationError> {
    let grow = Grow {
        terminal_ratio: options.terminal_ratio,
    };
    let policy: &dyn ContinuationPolicy = if options.grow { &grow } else { &Full };

    let mut trees = Vec::with_capacity(options.n_candidates);
    let mut last_err = None;
    for _ in 0..options.n_candidates {
        match generate_one(rng, registry, options, policy) {
            Ok(tree) => trees.push(tree),
            Err(err) => {
                log::warn!("skipping candidate: {err}");
                last_err = Some(err);
            }
        }
    }
    let n_failed = options.n_candidates - trees.len();
    match last_err {
        Some(err) if trees.is_empty() => Err(err),
        _ => Ok((trees, n_failed)),
    }
}

/// Evaluates every tree on the rayon pool; each worker owns its tree.
pub fn score_candidates<E, F>(trees: &mut [Tree], evaluator: &E, on_scored: F) -> Vec<Fitness>
where
    E: Evaluator + ?Sized,
    F: Fn(f64) + Sync,
{
    trees
        .par_iter_mut()
        .map(|tree| {
            let fitness = evaluator.evaluate(tree);
            on_scored(fitness.0);
            fitness
        })
        .collect()
}

/// Sorts ascending by fitness.
pub fn rank(trees: Vec<Tree>, fitness: &[Fitness]) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = trees
        .into_iter()
        .zip(fitness)
        .map(|(tree, &(fitness,))| Candidate { tree, fitness })
        .collect();
    ranked.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    ranked
}

/// Generates, fits and ranks one batch of candidates against `data` with a
/// train/held-out evaluator built from `options`.
pub fn search(registry: Arc<Registry>, data: &Dataset, options: &Options) -> Result<SearchResult, SearchError> {
    let mut evaluator = HoldoutEvaluator::from_blocks(
        Arc::clone(&registry),
        data,
        options.n_split,
        make_metric(options.metric),
        Arc::new(options.optimizer()),
    )?
    .with_train_weight(options.train_weight);
    evaluator.complexity_penalty = options.complexity_penalty;

    let mut rng = Rng::with_seed(options.seed);
    let (mut trees, n_failed) =
        generate_candidates(&mut rng, &registry, options).map_err(SearchError::Generation)?;
    log::info!(
        "scoring {} candidates ({} train rows, {} held-out rows)",
        trees.len(),
        evaluator.train.n_rows,
        evaluator.test.n_rows
    );

    let progress = ScoringProgress::new(options, trees.len());
    let fitness = score_candidates(&mut trees, &evaluator, |f| progress.on_scored(f));
    progress.finish();

    let ranked = rank(trees, &fitness);
    if let Some(best) = ranked.first() {
        log::info!("best fitness {} for {}", best.fitness, best.tree);
    }
    Ok(SearchResult { ranked, n_failed })
}
