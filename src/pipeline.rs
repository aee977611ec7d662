//! Конвейер: транзакции -> профили -> RFM и кластеры

use chrono::NaiveDateTime;

use crate::config::ClusteringConfig;
use crate::error::Result;
use crate::models::summary::{coupon_report, frequency_report, summarize};
use crate::models::{Clusterer, RfmScorer};
use crate::preprocessing::FeatureBuilder;
use crate::types::{SegmentationReport, TransactionRecord};

pub struct SegmentationPipeline;

impl SegmentationPipeline {
    /// RFM-скоринг и кластеризация работают по одной и той же таблице профилей
    /// независимо друг от друга: клиенты, отсеянные как выбросы, сохраняют RFM.
    ///
    /// Отчёт собирается целиком или не собирается вовсе: если кластеризация
    /// отклонена (например, `k` больше числа клиентов), `run` возвращает ошибку
    /// без RFM-результатов. Чтобы получить только RFM, используйте
    /// `FeatureBuilder::build` и `RfmScorer::score` напрямую.
    pub fn run(
        transactions: &[TransactionRecord],
        reference_date: Option<NaiveDateTime>,
        config: &ClusteringConfig,
    ) -> Result<SegmentationReport> {
        // предусловия проверяем до построения признаков
        config.validate()?;

        let features = FeatureBuilder::build(transactions, reference_date)?;
        let customers = RfmScorer::score(&features)?;
        let clustering = Clusterer::cluster(&features, config)?;

        let summary = summarize(&customers, &clustering);
        let frequency_report = frequency_report(&customers);
        let coupon_report = coupon_report(&customers);

        Ok(SegmentationReport {
            customers,
            clustering,
            summary,
            frequency_report,
            coupon_report,
        })
    }
}
