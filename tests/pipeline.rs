//! Интеграционные тесты конвейера сегментации

use chrono::{Duration, NaiveDate, NaiveDateTime};
use customer_segmentation::{
    ClusteringConfig, FeatureBuilder, RfmScorer, SegmentationError, SegmentationPipeline,
    TransactionRecord,
};

fn base_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// 12 обычных клиентов с 1-4 заказами и один крупный покупатель "W"
fn transactions() -> Vec<TransactionRecord> {
    let categories = ["home", "beauty", "sport"];
    let mut records = Vec::new();

    for i in 0..12usize {
        let n_orders = 1 + i % 4;
        for j in 0..n_orders {
            records.push(TransactionRecord {
                customer_id: format!("C{:02}", i),
                order_id: format!("O{:02}-{}", i, j),
                order_date: base_date() + Duration::days((i * 3 + j * 10) as i64),
                sku: format!("S{}", (i + j) % 5),
                category_level1: categories[(i + j) % 3].to_string(),
                unit_revenue: 20.0 + 5.0 * i as f64 + j as f64,
                quantity: (1 + j % 2) as f64,
                discount_description: None,
            });
        }
    }

    for j in 0..3usize {
        records.push(TransactionRecord {
            customer_id: "W".to_string(),
            order_id: format!("OW-{}", j),
            order_date: base_date() + Duration::days(5 + j as i64 * 7),
            sku: "S1".to_string(),
            category_level1: "home".to_string(),
            unit_revenue: 50_000.0,
            quantity: 500.0,
            discount_description: None,
        });
    }

    records
}

#[test]
fn test_end_to_end_segmentation() {
    let config = ClusteringConfig {
        k: 3,
        ..ClusteringConfig::default()
    };
    let report = SegmentationPipeline::run(&transactions(), None, &config).unwrap();

    // все клиенты получают RFM, включая отсеянного как выброс
    assert_eq!(report.customers.len(), 13);
    assert!(report.customers.iter().any(|c| c.features.customer_id == "W"));

    let clustering = &report.clustering;
    assert_eq!(clustering.outliers_removed, 1);
    assert_eq!(clustering.assignments.len(), 12);
    assert!(clustering
        .assignments
        .iter()
        .all(|a| a.features.customer_id != "W" && a.cluster_id < 3));
    assert_eq!(clustering.centers.len(), 3);
    assert_eq!(clustering.cluster_sizes().iter().sum::<usize>(), 12);
    if let Some(score) = clustering.silhouette {
        assert!((-1.0..=1.0).contains(&score));
    }

    let total: usize = report.summary.segments.iter().map(|s| s.count).sum();
    assert_eq!(total, 13);
    assert_eq!(report.summary.total_customers, 13);

    assert_eq!(report.frequency_report.one_time.len(), 3);
    assert_eq!(report.frequency_report.two_time.len(), 3);
    assert_eq!(report.frequency_report.three_to_five.len(), 7);

    assert_eq!(report.coupon_report.with_coupon_count, 0);
    assert_eq!(report.coupon_report.without_coupon_count, 13);
}

#[test]
fn test_feature_invariants() {
    let features = FeatureBuilder::build(&transactions(), None).unwrap();
    assert!(features.iter().all(|f| f.frequency >= 1 && f.unique_skus >= 1));
    assert!(features.iter().all(|f| f.recency_days >= 1));
    assert!(features.iter().all(|f| f.first_purchase <= f.last_purchase));

    let latest = features.iter().max_by_key(|f| f.last_purchase).unwrap();
    let min_recency = features.iter().map(|f| f.recency_days).min().unwrap();
    assert_eq!(latest.recency_days, min_recency);

    let scored = RfmScorer::score(&features).unwrap();
    assert_eq!(scored.len(), features.len());
    assert!(scored.iter().all(|s| (3..=15).contains(&s.rfm.rfm_sum)));
}

#[test]
fn test_pipeline_is_deterministic() {
    let config = ClusteringConfig::default();
    let first = SegmentationPipeline::run(&transactions(), None, &config).unwrap();
    let second = SegmentationPipeline::run(&transactions(), None, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_too_many_clusters_for_population() {
    let records: Vec<TransactionRecord> = transactions()
        .into_iter()
        .filter(|t| t.customer_id == "C00" || t.customer_id == "C01")
        .collect();
    let config = ClusteringConfig {
        k: 3,
        ..ClusteringConfig::default()
    };
    let result = SegmentationPipeline::run(&records, None, &config);
    assert!(matches!(
        result,
        Err(SegmentationError::ClusteringPrecondition(_))
    ));

    // RFM по тем же профилям остаётся доступен отдельно
    let features = FeatureBuilder::build(&records, None).unwrap();
    let scored = RfmScorer::score(&features).unwrap();
    assert_eq!(scored.len(), 2);
}

#[test]
fn test_invalid_config_fails_before_feature_build() {
    let config = ClusteringConfig::new(2, &["favorite_category"], true, true);
    let result = SegmentationPipeline::run(&transactions(), None, &config);
    assert!(matches!(result, Err(SegmentationError::DataShape(_))));
}
