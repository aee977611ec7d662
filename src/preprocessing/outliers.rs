//! Отсев выбросов по правилу IQR

use crate::types::{CustomerFeatureVector, FeatureColumn};

const IQR_MULTIPLIER: f64 = 1.5;

/// Квантиль с линейной интерполяцией между соседними порядковыми статистиками
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Допустимый интервал [Q1 - 1.5·IQR, Q3 + 1.5·IQR]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn fit(values: &[f64]) -> Option<Self> {
        let q1 = quantile(values, 0.25)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: q1 - IQR_MULTIPLIER * iqr,
            upper: q3 + IQR_MULTIPLIER * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

pub struct OutlierFilter;

impl OutlierFilter {
    /// Оставляет клиентов, попавших в границы по каждой из колонок.
    /// Границы считаются заново по всей переданной выборке; порядок строк сохраняется.
    pub fn filter(
        features: &[CustomerFeatureVector],
        columns: &[FeatureColumn],
    ) -> Vec<CustomerFeatureVector> {
        let bounds: Vec<(FeatureColumn, IqrBounds)> = columns
            .iter()
            .filter_map(|column| {
                let values: Vec<f64> = features.iter().map(|f| column.value(f)).collect();
                IqrBounds::fit(&values).map(|b| (*column, b))
            })
            .collect();

        let retained: Vec<CustomerFeatureVector> = features
            .iter()
            .filter(|customer| {
                bounds
                    .iter()
                    .all(|(column, b)| b.contains(column.value(customer)))
            })
            .cloned()
            .collect();

        tracing::debug!(
            "Outlier filter kept {} of {} customers over {} columns",
            retained.len(),
            features.len(),
            columns.len()
        );

        retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn customer(id: &str, frequency: usize, monetary: f64) -> CustomerFeatureVector {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        CustomerFeatureVector {
            customer_id: id.to_string(),
            first_purchase: date,
            last_purchase: date,
            frequency,
            monetary,
            total_qty: 1.0,
            unique_skus: 1,
            unique_categories: 1,
            recency_days: 1,
            customer_tenure_days: 0,
            coupon_orders: 0,
            coupon_rate: 0.0,
            avg_days_between: 0.0,
            favorite_category: "home".to_string(),
        }
    }

    fn population() -> Vec<CustomerFeatureVector> {
        vec![
            customer("a", 1, 10.0),
            customer("b", 2, 20.0),
            customer("c", 3, 30.0),
            customer("d", 4, 40.0),
            customer("e", 5, 50.0),
            customer("f", 6, 60.0),
            customer("g", 7, 70.0),
            customer("h", 8, 80.0),
            customer("i", 9, 1000.0),
        ]
    }

    #[test]
    fn test_quantile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.75), Some(3.25));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_single_feature_violation_excludes_row() {
        let columns = [FeatureColumn::Frequency, FeatureColumn::Monetary];
        let kept = OutlierFilter::filter(&population(), &columns);
        // monetary: Q1=30, Q3=70, IQR=40 -> верхняя граница 130
        assert_eq!(kept.len(), 8);
        assert!(kept.iter().all(|c| c.customer_id != "i"));
        // порядок сохранён
        let ids: Vec<&str> = kept.iter().map(|c| c.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);
    }

    #[test]
    fn test_filter_is_idempotent_on_filtered_population() {
        let columns = [FeatureColumn::Frequency, FeatureColumn::Monetary];
        let once = OutlierFilter::filter(&population(), &columns);
        let twice = OutlierFilter::filter(&once, &columns);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_constant_column_keeps_everyone() {
        let columns = [FeatureColumn::UniqueSkus];
        let population = population();
        assert_eq!(OutlierFilter::filter(&population, &columns), population);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let population = population();
        let snapshot = population.clone();
        let _ = OutlierFilter::filter(&population, &[FeatureColumn::Monetary]);
        assert_eq!(population, snapshot);
    }
}
