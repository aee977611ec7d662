//! Стандартизация признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};

use crate::error::{Result, SegmentationError};

/// Z-преобразование, обученное на одной выборке.
///
/// Создаётся заново при каждом вызове кластеризации и никуда не сохраняется.
#[derive(Debug, Clone)]
pub struct DataNormalizer {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl DataNormalizer {
    pub fn fit(X: &Array2<f64>) -> Result<Self> {
        if X.nrows() == 0 {
            return Err(SegmentationError::InsufficientData(
                "cannot standardize an empty matrix".to_string(),
            ));
        }

        // Среднее и стандартное отклонение (ddof = 0) по каждому признаку
        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| SegmentationError::InsufficientData("failed to compute mean".to_string()))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Постоянный признак оставляем без масштабирования
        for val in std.iter_mut() {
            if *val < 1e-10 {
                *val = 1.0;
            }
        }

        Ok(Self { mean, std })
    }

    pub fn transform(&self, X: &Array2<f64>) -> Array2<f64> {
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - self.mean[i]) / self.std[i];
            }
        }
        normalized
    }

    pub fn inverse_transform(&self, Z: &Array2<f64>) -> Array2<f64> {
        let mut restored = Z.clone();
        for mut row in restored.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = *val * self.std[i] + self.mean[i];
            }
        }
        restored
    }

    pub fn fit_transform(X: &Array2<f64>) -> Result<(Self, Array2<f64>)> {
        let normalizer = Self::fit(X)?;
        let transformed = normalizer.transform(X);
        Ok((normalizer, transformed))
    }
}
