use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::store::FeatureRow;

/// Seam for the waiting-time regressor. The statistical model is an
/// opaque collaborator; the pipeline only needs fit and predict.
pub trait Regressor {
    /// Fit on feature rows and their waiting-time targets
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()>;

    /// Predicted maximum waiting time in hours for one feature vector
    fn predict(&self, features: &[f64]) -> f64;
}

/// Ordinary-least-squares baseline with an intercept, solved via the
/// normal equations. Good enough to exercise the full train/predict path;
/// a boosted model can replace it behind the same trait.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeastSquaresModel {
    /// One weight per feature, intercept last
    weights: Vec<f64>,
}

impl LeastSquaresModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.weights.is_empty()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        info!("saved model to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl Regressor for LeastSquaresModel {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(anyhow!(
                "training set mismatch: {} feature rows, {} targets",
                features.len(),
                targets.len()
            ));
        }

        let dims = features[0].len();
        if features.iter().any(|row| row.len() != dims) {
            return Err(anyhow!("inconsistent feature dimensions"));
        }

        // Augment with a constant column for the intercept
        let cols = dims + 1;
        let rows: Vec<Vec<f64>> = features
            .iter()
            .map(|row| {
                let mut augmented = row.clone();
                augmented.push(1.0);
                augmented
            })
            .collect();

        // Normal equations: (X^T X) w = X^T y
        let mut xtx = vec![vec![0.0; cols]; cols];
        let mut xty = vec![0.0; cols];
        for (row, &target) in rows.iter().zip(targets) {
            for i in 0..cols {
                xty[i] += row[i] * target;
                for j in 0..cols {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }

        self.weights = solve_linear_system(xtx, xty)
            .ok_or_else(|| anyhow!("singular normal equations, features are degenerate"))?;
        debug!(weights = ?self.weights, "fitted least-squares model");
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> f64 {
        if self.weights.len() != features.len() + 1 {
            return 0.0;
        }

        let dot: f64 = features
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum();
        (dot + self.weights[features.len()]).max(0.0)
    }
}

/// Assemble the training set from feature rows: followers are required,
/// weather defaults to zero, zero-target nights are excluded (no crowd
/// signal is not a zero-hour queue).
pub fn training_set(rows: &[FeatureRow]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut features = Vec::new();
    let mut targets = Vec::new();

    for row in rows {
        if row.max_waiting_time == 0.0 {
            continue;
        }
        let Some(followers) = row.followers else {
            continue;
        };

        features.push(vec![
            followers as f64,
            row.min_temp_c.unwrap_or(0.0),
            row.precip_mm.unwrap_or(0.0),
        ]);
        targets.push(row.max_waiting_time);
    }

    (features, targets)
}

/// Gaussian elimination with partial pivoting
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for k in (col + 1)..n {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }

    Some(x)
}
