use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("{what} has {found} rows, expected {expected}")]
    RowMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("cannot split {n_rows} rows into {n_split} blocks")]
    InvalidSplit { n_rows: usize, n_split: usize },
    #[error("fraction must lie in (0, 1), got {0}")]
    InvalidFraction(f64),
}

#[derive(Clone, Debug)]
pub struct Dataset {
    /// Row-major contiguous data with shape `(n_rows, n_features)`.
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub n_features: usize,
    pub n_rows: usize,
    pub weights: Option<Array1<f64>>,
    pub variable_names: Vec<String>,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array1<f64>) -> Result<Self, DatasetError> {
        Self::with_weights_and_names(x, y, None, Vec::new())
    }

    pub fn with_weights_and_names(
        x: Array2<f64>,
        y: Array1<f64>,
        weights: Option<Array1<f64>>,
        variable_names: Vec<String>,
    ) -> Result<Self, DatasetError> {
        let x = x.as_standard_layout().to_owned();
        let (n_rows, n_features) = x.dim();
        if y.len() != n_rows {
            return Err(DatasetError::RowMismatch {
                what: "target",
                expected: n_rows,
                found: y.len(),
            });
        }
        if let Some(w) = &weights {
            if w.len() != n_rows {
                return Err(DatasetError::RowMismatch {
                    what: "weights",
                    expected: n_rows,
                    found: w.len(),
                });
            }
        }

        Ok(Self {
            x,
            y,
            n_features,
            n_rows,
            weights,
            variable_names,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Copy of the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select(Axis(0), rows),
            y: self.y.select(Axis(0), rows),
            n_features: self.n_features,
            n_rows: rows.len(),
            weights: self.weights.as_ref().map(|w| w.select(Axis(0), rows)),
            variable_names: self.variable_names.clone(),
        }
    }

    /// Alternating-block split: rows are cut into `n_split` blocks of
    /// `n_rows / n_split`; even blocks train, odd blocks are held out. Rows
    /// past the last full block are dropped.
    pub fn train_test_split(&self, n_split: usize) -> Result<(Dataset, Dataset), DatasetError> {
        if n_split < 2 || n_split > self.n_rows {
            return Err(DatasetError::InvalidSplit {
                n_rows: self.n_rows,
                n_split,
            });
        }
        let block = self.n_rows / n_split;
        let (mut train, mut test) = (Vec::new(), Vec::new());
        for b in 0..n_split {
            let rows = b * block..(b + 1) * block;
            if b % 2 == 0 {
                train.extend(rows);
            } else {
                test.extend(rows);
            }
        }
        Ok((self.select_rows(&train), self.select_rows(&test)))
    }

    /// Shuffled split keeping `round(n_rows * train_fraction)` rows for training.
    pub fn shuffled_split(
        &self,
        train_fraction: f64,
        rng: &mut impl Rng,
    ) -> Result<(Dataset, Dataset), DatasetError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(DatasetError::InvalidFraction(train_fraction));
        }
        let mut idx: Vec<usize> = (0..self.n_rows).collect();
        idx.shuffle(rng);
        let n_train = ((self.n_rows as f64) * train_fraction).round() as usize;
        let (train, test) = idx.split_at(n_train.min(self.n_rows));
        Ok((self.select_rows(train), self.select_rows(test)))
    }

    pub fn weights_slice(&self) -> Option<&[f64]> {
        self.weights.as_ref().and_then(|w| w.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2, array};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn ramp(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f64);
        let y = Array1::from_shape_fn(n, |i| i as f64);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let err = Dataset::new(Array2::zeros((3, 1)), array![1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::RowMismatch {
                what: "target",
                expected: 3,
                found: 2
            }
        );
        assert_eq!(err.to_string(), "target has 2 rows, expected 3");
    }

    #[test]
    fn alternating_blocks_drop_the_remainder() {
        let (train, test) = ramp(11).train_test_split(3).unwrap();
        assert_eq!(train.y.to_vec(), vec![0.0, 1.0, 2.0, 6.0, 7.0, 8.0]);
        assert_eq!(test.y.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(test.x.row(0).to_vec(), vec![30.0, 31.0]);
    }

    #[test]
    fn split_counts_are_validated() {
        assert!(ramp(4).train_test_split(1).is_err());
        assert!(ramp(4).train_test_split(5).is_err());
        assert!(ramp(4).train_test_split(4).is_ok());
    }

    #[test]
    fn shuffled_split_partitions_rows() {
        let data = ramp(20);
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = data.shuffled_split(0.75, &mut rng).unwrap();
        assert_eq!((train.n_rows, test.n_rows), (15, 5));
        let mut all: Vec<f64> = train.y.iter().chain(test.y.iter()).copied().collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, data.y.to_vec());
        assert!(data.shuffled_split(1.0, &mut rng).is_err());
    }

    #[test]
    fn selected_rows_carry_weights() {
        let data = Dataset::with_weights_and_names(
            Array2::zeros((3, 1)),
            array![1.0, 2.0, 3.0],
            Some(array![0.1, 0.2, 0.3]),
            vec!["a".into()],
        )
        .unwrap();
        let sub = data.select_rows(&[2, 0]);
        assert_eq!(sub.weights_slice(), Some(&[0.3, 0.1][..]));
        assert_eq!(sub.variable_names, vec!["a".to_string()]);
    }
}
