//! Построение профилей клиентов из транзакций

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, SegmentationError};
use crate::types::{CustomerFeatureVector, TransactionRecord};

const REVENUE_FIELD: &str = "unit_revenue";
const QUANTITY_FIELDS: [&str; 2] = ["quantity", "Sum of QtyFinal"];

/// Транзакция в том виде, в каком она приходит из выгрузки:
/// идентификаторы могут быть числами, выручка и количество лежат
/// в колонках с произвольными именами.
#[derive(Debug, Deserialize)]
pub struct RawTransaction {
    #[serde(alias = "CustomerId", deserialize_with = "identifier")]
    customer_id: String,
    #[serde(alias = "OrderId", deserialize_with = "identifier")]
    order_id: String,
    order_date: NaiveDateTime,
    #[serde(deserialize_with = "identifier")]
    sku: String,
    #[serde(alias = "Category Level1", deserialize_with = "identifier")]
    category_level1: String,
    #[serde(default, alias = "DiscountDescription")]
    discount_description: Option<Value>,
    #[serde(flatten)]
    columns: BTreeMap<String, Value>,
}

fn identifier<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

/// Колонка с выручкой: `unit_revenue`, иначе первая колонка,
/// в имени которой есть "price" (в том числе `FinalPrice`)
pub fn revenue_column(columns: &BTreeMap<String, Value>) -> Option<&str> {
    if columns.contains_key(REVENUE_FIELD) {
        return Some(REVENUE_FIELD);
    }
    columns
        .keys()
        .find(|name| name.to_lowercase().contains("price"))
        .map(String::as_str)
}

pub fn quantity_column(columns: &BTreeMap<String, Value>) -> Option<&str> {
    QUANTITY_FIELDS
        .iter()
        .copied()
        .find(|name| columns.contains_key(*name))
}

/// Число или числовая строка; всё остальное превращается в 0
pub fn coerce_numeric(cell: Option<&Value>) -> f64 {
    let value = match cell {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    value.map(finite_or_zero).unwrap_or(0.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl From<RawTransaction> for TransactionRecord {
    fn from(raw: RawTransaction) -> Self {
        let unit_revenue = coerce_numeric(revenue_column(&raw.columns).and_then(|c| raw.columns.get(c)));
        let quantity = coerce_numeric(quantity_column(&raw.columns).and_then(|c| raw.columns.get(c)));

        let discount_description = match raw.discount_description {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        TransactionRecord {
            customer_id: raw.customer_id,
            order_id: raw.order_id,
            order_date: raw.order_date,
            sku: raw.sku,
            category_level1: raw.category_level1,
            unit_revenue,
            quantity,
            discount_description,
        }
    }
}

/// Агрегаты одного клиента, накапливаемые за один проход
struct CustomerAccumulator<'a> {
    first_purchase: NaiveDateTime,
    last_purchase: NaiveDateTime,
    orders: HashSet<&'a str>,
    skus: HashSet<&'a str>,
    category_counts: BTreeMap<&'a str, usize>,
    purchase_dates: BTreeSet<NaiveDateTime>,
    monetary: f64,
    total_qty: f64,
    coupon_orders: usize,
}

impl<'a> CustomerAccumulator<'a> {
    fn new(order_date: NaiveDateTime) -> Self {
        Self {
            first_purchase: order_date,
            last_purchase: order_date,
            orders: HashSet::new(),
            skus: HashSet::new(),
            category_counts: BTreeMap::new(),
            purchase_dates: BTreeSet::new(),
            monetary: 0.0,
            total_qty: 0.0,
            coupon_orders: 0,
        }
    }

    fn push(&mut self, tx: &'a TransactionRecord) {
        self.first_purchase = self.first_purchase.min(tx.order_date);
        self.last_purchase = self.last_purchase.max(tx.order_date);
        self.orders.insert(tx.order_id.as_str());
        self.skus.insert(tx.sku.as_str());
        *self.category_counts.entry(tx.category_level1.as_str()).or_insert(0) += 1;
        self.purchase_dates.insert(tx.order_date);
        self.monetary += finite_or_zero(tx.unit_revenue);
        self.total_qty += finite_or_zero(tx.quantity);
        if tx.discount_description.is_some() {
            self.coupon_orders += 1;
        }
    }

    /// Самая частая категория; при равенстве побеждает меньшая лексикографически
    fn favorite_category(&self) -> String {
        let mut best: Option<(&str, usize)> = None;
        for (&category, &count) in &self.category_counts {
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((category, count)),
            }
        }
        best.map(|(c, _)| c.to_string()).unwrap_or_default()
    }

    fn avg_days_between(&self) -> f64 {
        let dates: Vec<&NaiveDateTime> = self.purchase_dates.iter().collect();
        if dates.len() < 2 {
            return 0.0;
        }
        let total: i64 = dates.windows(2).map(|w| (*w[1] - *w[0]).num_days()).sum();
        total as f64 / (dates.len() - 1) as f64
    }

    fn finish(self, customer_id: &str, reference_date: NaiveDateTime) -> CustomerFeatureVector {
        let frequency = self.orders.len();
        let coupon_rate = if frequency > 0 {
            self.coupon_orders as f64 / frequency as f64
        } else {
            0.0
        };

        CustomerFeatureVector {
            customer_id: customer_id.to_string(),
            first_purchase: self.first_purchase,
            last_purchase: self.last_purchase,
            frequency,
            monetary: self.monetary,
            total_qty: self.total_qty,
            unique_skus: self.skus.len(),
            unique_categories: self.category_counts.len(),
            recency_days: (reference_date - self.last_purchase).num_days(),
            customer_tenure_days: (self.last_purchase - self.first_purchase).num_days(),
            coupon_orders: self.coupon_orders,
            coupon_rate,
            avg_days_between: self.avg_days_between(),
            favorite_category: self.favorite_category(),
        }
    }
}

pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Один профиль на каждого клиента, упорядочено по `customer_id`.
    ///
    /// Без `reference_date` точкой отсчёта давности служит последняя покупка
    /// по всем клиентам плюс один день.
    pub fn build(
        transactions: &[TransactionRecord],
        reference_date: Option<NaiveDateTime>,
    ) -> Result<Vec<CustomerFeatureVector>> {
        let mut groups: BTreeMap<&str, CustomerAccumulator> = BTreeMap::new();
        for tx in transactions {
            groups
                .entry(tx.customer_id.as_str())
                .or_insert_with(|| CustomerAccumulator::new(tx.order_date))
                .push(tx);
        }

        let latest = match groups.values().map(|acc| acc.last_purchase).max() {
            Some(latest) => latest,
            None => {
                tracing::debug!("No transactions, feature table is empty");
                return Ok(Vec::new());
            }
        };

        let reference_date = match reference_date {
            Some(reference) if reference < latest => {
                return Err(SegmentationError::DataShape(format!(
                    "reference date {} precedes latest purchase {}",
                    reference, latest
                )));
            }
            Some(reference) => reference,
            None => latest + Duration::days(1),
        };

        let features: Vec<CustomerFeatureVector> = groups
            .into_iter()
            .map(|(customer_id, acc)| acc.finish(customer_id, reference_date))
            .collect();

        tracing::info!(
            "Built features for {} customers from {} transactions (reference {})",
            features.len(),
            transactions.len(),
            reference_date
        );

        Ok(features)
    }
}
