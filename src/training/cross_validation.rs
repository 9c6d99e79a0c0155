//! K-fold splitting for out-of-fold stacking

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{Result, StackcastError};

#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct KFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Shuffled fold assignment over `n` rows. Every row lands in exactly
    /// one test fold; folds differ in size by at most one row.
    pub fn split(&self, n: usize) -> Result<Vec<CvSplit>> {
        if self.n_splits < 2 {
            return Err(StackcastError::ValidationError(
                "k-fold needs at least 2 splits".to_string(),
            ));
        }
        if n < self.n_splits {
            return Err(StackcastError::ValidationError(format!(
                "cannot split {} rows into {} folds",
                n, self.n_splits
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let mut splits = Vec::with_capacity(self.n_splits);
        let base = n / self.n_splits;
        let remainder = n % self.n_splits;
        let mut start = 0;

        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < remainder);
            let test_indices: Vec<usize> = order[start..start + size].to_vec();
            let train_indices: Vec<usize> = order[..start]
                .iter()
                .chain(order[start + size..].iter())
                .copied()
                .collect();
            splits.push(CvSplit { train_indices, test_indices });
            start += size;
        }

        Ok(splits)
    }
}
