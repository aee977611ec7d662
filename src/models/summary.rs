//! Сводка по сегментам, отчёты по частоте покупок и по купонам

use crate::types::{
    ClusteringResult, CouponReport, FrequencyReport, RfmSegment, ScoredCustomer, SegmentCount,
    SegmentSummary,
};

pub fn summarize(customers: &[ScoredCustomer], clustering: &ClusteringResult) -> SegmentSummary {
    let segments = RfmSegment::LADDER
        .iter()
        .map(|&segment| SegmentCount {
            segment,
            count: customers
                .iter()
                .filter(|c| c.rfm.rfm_segment == segment)
                .count(),
        })
        .collect();

    SegmentSummary {
        total_customers: customers.len(),
        segments,
        clusters_used: clustering.clusters_used(),
        silhouette: clustering.silhouette,
    }
}

/// Разбивка клиентов на купивших 1, 2 и 3-5 раз; остальные в отчёт не попадают
pub fn frequency_report(customers: &[ScoredCustomer]) -> FrequencyReport {
    let mut report = FrequencyReport::default();
    for customer in customers {
        let id = customer.features.customer_id.clone();
        match customer.features.frequency {
            1 => report.one_time.push(id),
            2 => report.two_time.push(id),
            3..=5 => report.three_to_five.push(id),
            _ => {}
        }
    }
    report
}

pub fn coupon_report(customers: &[ScoredCustomer]) -> CouponReport {
    let mut report = CouponReport::default();
    for customer in customers {
        let id = customer.features.customer_id.clone();
        if customer.features.coupon_orders > 0 {
            report.with_coupon.push(id);
        } else {
            report.without_coupon.push(id);
        }
    }
    report.with_coupon_count = report.with_coupon.len();
    report.without_coupon_count = report.without_coupon.len();
    report
}
