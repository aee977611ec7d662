/// Типы данных для сегментации клиентов

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::ClusteringConfig;
use crate::error::SegmentationError;
use crate::preprocessing::feature_engineering::RawTransaction;

/// Каноническая строка транзакции (одна позиция заказа)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransaction")]
pub struct TransactionRecord {
    pub customer_id: String,
    pub order_id: String,
    pub order_date: NaiveDateTime,
    pub sku: String,
    pub category_level1: String,
    pub unit_revenue: f64,
    pub quantity: f64,
    pub discount_description: Option<String>,
}

/// Профиль клиента, агрегированный по всем его транзакциям
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatureVector {
    pub customer_id: String,
    pub first_purchase: NaiveDateTime,
    pub last_purchase: NaiveDateTime,
    pub frequency: usize,
    pub monetary: f64,
    pub total_qty: f64,
    pub unique_skus: usize,
    pub unique_categories: usize,
    pub recency_days: i64,
    pub customer_tenure_days: i64,
    pub coupon_orders: usize,
    pub coupon_rate: f64,
    pub avg_days_between: f64,
    pub favorite_category: String,
}

/// Числовые колонки профиля, доступные для кластеризации и фильтрации выбросов
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    RecencyDays,
    Frequency,
    Monetary,
    TotalQty,
    UniqueSkus,
    UniqueCategories,
    CustomerTenureDays,
    CouponOrders,
    CouponRate,
    AvgDaysBetween,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 10] = [
        FeatureColumn::RecencyDays,
        FeatureColumn::Frequency,
        FeatureColumn::Monetary,
        FeatureColumn::TotalQty,
        FeatureColumn::UniqueSkus,
        FeatureColumn::UniqueCategories,
        FeatureColumn::CustomerTenureDays,
        FeatureColumn::CouponOrders,
        FeatureColumn::CouponRate,
        FeatureColumn::AvgDaysBetween,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::RecencyDays => "recency_days",
            FeatureColumn::Frequency => "frequency",
            FeatureColumn::Monetary => "monetary",
            FeatureColumn::TotalQty => "total_qty",
            FeatureColumn::UniqueSkus => "unique_skus",
            FeatureColumn::UniqueCategories => "unique_categories",
            FeatureColumn::CustomerTenureDays => "customer_tenure_days",
            FeatureColumn::CouponOrders => "coupon_orders",
            FeatureColumn::CouponRate => "coupon_rate",
            FeatureColumn::AvgDaysBetween => "avg_days_between",
        }
    }

    /// Значение колонки для клиента в исходных единицах
    pub fn value(&self, customer: &CustomerFeatureVector) -> f64 {
        match self {
            FeatureColumn::RecencyDays => customer.recency_days as f64,
            FeatureColumn::Frequency => customer.frequency as f64,
            FeatureColumn::Monetary => customer.monetary,
            FeatureColumn::TotalQty => customer.total_qty,
            FeatureColumn::UniqueSkus => customer.unique_skus as f64,
            FeatureColumn::UniqueCategories => customer.unique_categories as f64,
            FeatureColumn::CustomerTenureDays => customer.customer_tenure_days as f64,
            FeatureColumn::CouponOrders => customer.coupon_orders as f64,
            FeatureColumn::CouponRate => customer.coupon_rate,
            FeatureColumn::AvgDaysBetween => customer.avg_days_between,
        }
    }

    /// Разбор упорядоченного списка имён колонок
    pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<FeatureColumn>, SegmentationError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for FeatureColumn {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Some(column) = FeatureColumn::ALL.iter().find(|c| c.name() == name) {
            return Ok(*column);
        }
        match name {
            "customer_id" | "favorite_category" | "first_purchase" | "last_purchase" => {
                Err(SegmentationError::DataShape(format!(
                    "column '{}' is not numeric",
                    name
                )))
            }
            _ => Err(SegmentationError::DataShape(format!(
                "unknown feature column '{}'",
                name
            ))),
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Категория RFM, в порядке убывания ценности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RfmSegment {
    Champion,
    Loyal,
    Potential,
    #[serde(rename = "At Risk")]
    AtRisk,
    Hibernating,
}

impl RfmSegment {
    pub const LADDER: [RfmSegment; 5] = [
        RfmSegment::Champion,
        RfmSegment::Loyal,
        RfmSegment::Potential,
        RfmSegment::AtRisk,
        RfmSegment::Hibernating,
    ];

    /// Пороговая лестница по сумме рангов, первое совпадение сверху вниз
    pub fn from_sum(rfm_sum: u8) -> Self {
        match rfm_sum {
            13.. => RfmSegment::Champion,
            10..=12 => RfmSegment::Loyal,
            7..=9 => RfmSegment::Potential,
            4..=6 => RfmSegment::AtRisk,
            _ => RfmSegment::Hibernating,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RfmSegment::Champion => "Champion",
            RfmSegment::Loyal => "Loyal",
            RfmSegment::Potential => "Potential",
            RfmSegment::AtRisk => "At Risk",
            RfmSegment::Hibernating => "Hibernating",
        }
    }
}

impl fmt::Display for RfmSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfmScore {
    pub r_rank: u8,
    pub f_rank: u8,
    pub m_rank: u8,
    pub rfm_sum: u8,
    pub rfm_segment: RfmSegment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCustomer {
    #[serde(flatten)]
    pub features: CustomerFeatureVector,
    #[serde(flatten)]
    pub rfm: RfmScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster_id: usize,
    #[serde(flatten)]
    pub features: CustomerFeatureVector,
}

/// Центр кластера в исходных единицах, значения в порядке `feature_columns`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCenter {
    pub cluster_id: usize,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub feature_columns: Vec<FeatureColumn>,
    pub assignments: Vec<ClusterAssignment>,
    pub centers: Vec<ClusterCenter>,
    /// Средний силуэт; `None`, если он не определён
    pub silhouette: Option<f64>,
    /// Сумма квадратов расстояний до центров в пространстве кластеризации
    pub inertia: f64,
    pub scaled: bool,
    pub outliers_removed: usize,
}

impl ClusteringResult {
    pub fn n_clusters(&self) -> usize {
        self.centers.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for assignment in &self.assignments {
            if assignment.cluster_id < sizes.len() {
                sizes[assignment.cluster_id] += 1;
            }
        }
        sizes
    }

    /// Число непустых кластеров
    pub fn clusters_used(&self) -> usize {
        self.cluster_sizes().iter().filter(|&&s| s > 0).count()
    }

    pub fn center_value(&self, cluster_id: usize, column: FeatureColumn) -> Option<f64> {
        let idx = self.feature_columns.iter().position(|c| *c == column)?;
        self.centers
            .iter()
            .find(|c| c.cluster_id == cluster_id)
            .and_then(|c| c.values.get(idx).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCount {
    pub segment: RfmSegment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub total_customers: usize,
    pub segments: Vec<SegmentCount>,
    pub clusters_used: usize,
    pub silhouette: Option<f64>,
}

/// Клиенты по числу заказов: 1, 2 и 3-5
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyReport {
    pub one_time: Vec<String>,
    pub two_time: Vec<String>,
    pub three_to_five: Vec<String>,
}

/// Клиенты, хотя бы раз использовавшие купон, и все остальные
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouponReport {
    pub with_coupon_count: usize,
    pub without_coupon_count: usize,
    pub with_coupon: Vec<String>,
    pub without_coupon: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub customers: Vec<ScoredCustomer>,
    pub clustering: ClusteringResult,
    pub summary: SegmentSummary,
    pub frequency_report: FrequencyReport,
    pub coupon_report: CouponReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub transactions: Vec<TransactionRecord>,
    #[serde(default)]
    pub reference_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub transactions: Vec<TransactionRecord>,
    #[serde(default)]
    pub reference_date: Option<NaiveDateTime>,
    /// Без настроек используются настройки сервера по умолчанию
    #[serde(default)]
    pub clustering: Option<ClusteringConfig>,
}
