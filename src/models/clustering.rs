//! Кластеризация клиентов KMeans

use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ClusteringConfig;
use crate::error::{Result, SegmentationError};
use crate::preprocessing::{DataNormalizer, OutlierFilter};
use crate::types::{
    ClusterAssignment, ClusterCenter, ClusteringResult, CustomerFeatureVector, FeatureColumn,
};

pub struct Clusterer;

impl Clusterer {
    /// Полный проход: отсев выбросов, стандартизация, KMeans, силуэт
    /// и центры кластеров в исходных единицах. Вход не изменяется.
    pub fn cluster(
        features: &[CustomerFeatureVector],
        config: &ClusteringConfig,
    ) -> Result<ClusteringResult> {
        let columns = config.validate()?;
        if features.is_empty() {
            return Err(SegmentationError::InsufficientData(
                "no customers to cluster".to_string(),
            ));
        }
        if config.k > features.len() {
            return Err(SegmentationError::ClusteringPrecondition(format!(
                "k = {} exceeds the number of customers ({})",
                config.k,
                features.len()
            )));
        }

        let candidates = if config.remove_outliers {
            OutlierFilter::filter(features, &columns)
        } else {
            features.to_vec()
        };
        if config.k > candidates.len() {
            return Err(SegmentationError::ClusteringPrecondition(format!(
                "k = {} exceeds the number of customers left after outlier removal ({})",
                config.k,
                candidates.len()
            )));
        }

        let raw = feature_matrix(&candidates, &columns);
        let (normalizer, x) = if config.scale {
            let (normalizer, scaled) = DataNormalizer::fit_transform(&raw)?;
            (Some(normalizer), scaled)
        } else {
            (None, raw)
        };

        tracing::debug!(
            "Clustering {} customers on {:?} (k = {}, scaled = {})",
            x.nrows(),
            columns,
            config.k,
            config.scale
        );

        let (labels, centroids) = fit_kmeans(&x, config)?;
        let centers = cluster_means(&x, &labels, &centroids);
        let inertia = compute_inertia(&x, &labels, &centers);
        let silhouette = silhouette_score(&x, &labels);

        let centers_real = match &normalizer {
            Some(normalizer) => normalizer.inverse_transform(&centers),
            None => centers,
        };

        let result = ClusteringResult {
            feature_columns: columns,
            assignments: candidates
                .into_iter()
                .zip(labels.iter())
                .map(|(features, &cluster_id)| ClusterAssignment { cluster_id, features })
                .collect(),
            centers: centers_real
                .outer_iter()
                .enumerate()
                .map(|(cluster_id, row)| ClusterCenter {
                    cluster_id,
                    values: row.to_vec(),
                })
                .collect(),
            silhouette,
            inertia,
            scaled: config.scale,
            outliers_removed: features.len() - labels.len(),
        };

        match result.silhouette {
            Some(score) => tracing::info!(
                "KMeans done: {} clusters, inertia {:.3}, silhouette {:.3}",
                config.k,
                inertia,
                score
            ),
            None => tracing::info!(
                "KMeans done: {} clusters, inertia {:.3}, silhouette undefined",
                config.k,
                inertia
            ),
        }

        Ok(result)
    }
}

/// Матрица (клиенты × колонки) в исходных единицах
pub fn feature_matrix(features: &[CustomerFeatureVector], columns: &[FeatureColumn]) -> Array2<f64> {
    Array2::from_shape_fn((features.len(), columns.len()), |(i, j)| {
        columns[j].value(&features[i])
    })
}

fn fit_kmeans(x: &Array2<f64>, config: &ClusteringConfig) -> Result<(Array1<usize>, Array2<f64>)> {
    let distinct = distinct_rows(x, config.k);
    if distinct.len() < config.k {
        tracing::warn!(
            "Only {} distinct points for k = {}, returning a degenerate partition",
            distinct.len(),
            config.k
        );
        return Ok(degenerate_partition(x, &distinct, config.k));
    }

    let dataset = DatasetBase::from(x.clone());
    let rng = StdRng::seed_from_u64(config.seed);
    let model = KMeans::params_with(config.k, rng, L2Dist)
        .n_runs(config.n_runs)
        .max_n_iterations(config.max_iterations)
        .tolerance(config.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(x);
    Ok((labels, model.centroids().clone()))
}

/// Индексы первых вхождений различных строк, не больше `limit`.
/// Если найдено меньше `limit`, список полный.
fn distinct_rows(x: &Array2<f64>, limit: usize) -> Vec<usize> {
    let mut representatives: Vec<usize> = Vec::with_capacity(limit);
    for (i, row) in x.outer_iter().enumerate() {
        if representatives.len() >= limit {
            break;
        }
        if !representatives.iter().any(|&r| x.row(r) == row) {
            representatives.push(i);
        }
    }
    representatives
}

/// Каждая различная точка - свой кластер; лишние центры повторяют первую точку
fn degenerate_partition(x: &Array2<f64>, distinct: &[usize], k: usize) -> (Array1<usize>, Array2<f64>) {
    let labels: Array1<usize> = x
        .outer_iter()
        .map(|row| {
            distinct
                .iter()
                .position(|&r| x.row(r) == row)
                .unwrap_or(0)
        })
        .collect();

    let mut centroids = Array2::zeros((k, x.ncols()));
    for c in 0..k {
        let source = distinct.get(c).or_else(|| distinct.first()).copied().unwrap_or(0);
        centroids.row_mut(c).assign(&x.row(source));
    }
    (labels, centroids)
}

/// Среднее точек каждого кластера; пустой кластер сохраняет центр модели
fn cluster_means(x: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(centroids.dim());
    let mut counts = vec![0usize; centroids.nrows()];
    for (row, &label) in x.outer_iter().zip(labels.iter()) {
        if label < counts.len() {
            counts[label] += 1;
            let mut target = sums.row_mut(label);
            target += &row;
        }
    }

    let mut means = centroids.clone();
    for (c, &count) in counts.iter().enumerate() {
        if count > 0 {
            means.row_mut(c).assign(&(&sums.row(c) / count as f64));
        }
    }
    means
}

/// Сумма квадратов расстояний до центров (inertia)
fn compute_inertia(x: &Array2<f64>, labels: &Array1<usize>, centers: &Array2<f64>) -> f64 {
    x.outer_iter()
        .zip(labels.iter())
        .filter(|(_, &label)| label < centers.nrows())
        .map(|(row, &label)| {
            let d = euclidean_distance(&row, &centers.row(label));
            d * d
        })
        .sum()
}

/// Средний коэффициент силуэта по всем точкам.
///
/// `None`, если непустых кластеров меньше двух или каждая точка в своём кластере.
pub fn silhouette_score(x: &Array2<f64>, labels: &Array1<usize>) -> Option<f64> {
    let n_samples = x.nrows();
    let n_clusters = labels.iter().copied().max()? + 1;

    let mut sizes = vec![0usize; n_clusters];
    for &label in labels.iter() {
        sizes[label] += 1;
    }
    let used = sizes.iter().filter(|&&s| s > 0).count();
    if used < 2 || used >= n_samples {
        return None;
    }

    let mut silhouette_sum = 0.0;
    for i in 0..n_samples {
        let own = labels[i];
        // точка-одиночка даёт 0
        if sizes[own] == 1 {
            continue;
        }

        let point = x.row(i);
        let mut distance_sums = vec![0.0; n_clusters];
        for j in 0..n_samples {
            if i != j {
                distance_sums[labels[j]] += euclidean_distance(&point, &x.row(j));
            }
        }

        let a_i = distance_sums[own] / (sizes[own] - 1) as f64;
        let b_i = (0..n_clusters)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| distance_sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denominator = a_i.max(b_i);
        if denominator > 0.0 {
            silhouette_sum += (b_i - a_i) / denominator;
        }
    }

    Some(silhouette_sum / n_samples as f64)
}

fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}
