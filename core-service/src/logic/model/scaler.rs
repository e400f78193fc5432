//! Standard scaler
//!
//! Fit once on the training partition, then applied unchanged to every
//! vector scored against the same registry.

use serde::{Deserialize, Serialize};

use crate::logic::error::{FusionError, FusionResult};

/// Per-column mean and population standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    pub fn fit(rows: &[Vec<f64>]) -> FusionResult<Self> {
        let first = rows
            .first()
            .ok_or_else(|| FusionError::Training("cannot fit scaler on zero rows".to_string()))?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&mean) {
                *acc += (v - m).powi(2);
            }
        }

        let std = var.into_iter().map(|v| (v / n).sqrt()).collect();

        Ok(Self { mean, std })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// `(x - mean) / std`. A constant column is only centered.
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| {
                let centered = x - m;
                if *s > 0.0 && s.is_finite() {
                    centered / s
                } else {
                    centered
                }
            })
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_mean_and_std() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = Scaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        assert_eq!(scaler.std, vec![1.0, 0.0]);
        assert_eq!(scaler.width(), 2);
    }

    #[test]
    fn test_zero_std_column_is_centered_only() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = Scaler::fit(&rows).unwrap();

        let out = scaler.transform(&[3.0, 7.0]);
        assert_eq!(out, vec![1.0, 2.0]);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transformed_training_set_is_standardized() {
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 * 3.0 + 7.0]).collect();
        let scaler = Scaler::fit(&rows).unwrap();
        let scaled = scaler.transform_all(&rows);

        let mean: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / 50.0;
        let var: f64 = scaled.iter().map(|r| r[0].powi(2)).sum::<f64>() / 50.0;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_empty_is_training_error() {
        assert!(matches!(Scaler::fit(&[]), Err(FusionError::Training(_))));
    }
}
